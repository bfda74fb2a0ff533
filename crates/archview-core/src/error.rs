//! Error types for the text codec and the registry.
//!
//! Resolution never fails: missing references and cycles are logged and the
//! offending subtree is left out of the view. Only the codec and registry
//! loading report hard errors.

pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised while parsing or serializing the architecture text format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Empty architecture definition")]
    Empty,

    #[error("Architecture definition must have contents")]
    NoContents,

    #[error(
        "line {line}: architecture definition must start with a name followed by a colon, found `{content}`"
    )]
    MissingHeader { line: usize, content: String },

    #[error("line {line}: architecture `{name}` has no entries")]
    EmptyArchitecture { line: usize, name: String },

    #[error("line {line}: expected a quoted reference title ending in `:`, found `{content}`")]
    MalformedReference { line: usize, content: String },

    #[error("line {line}: expected `key: value` inside properties, found `{content}`")]
    MalformedProperty { line: usize, content: String },

    #[error("Invalid architecture object: {0}")]
    InvalidStructure(String),
}

/// Errors raised while loading templates into a [`Registry`](crate::registry::Registry).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{kind} name `{name}` ends in `_<digits>`, which is reserved for repeated instances")]
    ReservedSuffix { kind: &'static str, name: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

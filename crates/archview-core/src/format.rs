//! Document formatting pipeline: parse → emit.
//!
//! Normalizes indentation, quoting and numeric spelling of an architecture
//! document. Consumed by `archview fmt` and the WASM bridge.

use crate::emitter::serialize_document;
use crate::error::Result;
use crate::parser::parse_document;

// ─── Config ───────────────────────────────────────────────────────────────

/// Output layout for the emitter. Parsing accepts any indent width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatConfig {
    /// Spaces per nesting level. Default: **4**.
    pub indent_width: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self { indent_width: 4 }
    }
}

// ─── Pipeline ─────────────────────────────────────────────────────────────

/// Parse an architecture document and re-emit it in canonical form.
///
/// The output is idempotent: `format_document(format_document(s, c), c) == format_document(s, c)`.
///
/// # Errors
/// Any `CodecError` raised while parsing or emitting.
pub fn format_document(text: &str, config: &FormatConfig) -> Result<String> {
    let archs = parse_document(text)?;
    serialize_document(&archs, config)
}

// ─── Tests ────────────────────────────────────────────────────────────────

pub mod emitter;
pub mod error;
pub mod format;
pub mod id;
pub mod lint;
pub mod model;
pub mod parser;
pub mod properties;
pub mod registry;
pub mod resolve;
pub mod store;
pub mod view;

pub use emitter::{serialize_architecture, serialize_document};
pub use error::{CodecError, RegistryError};
pub use format::{FormatConfig, format_document};
pub use id::{ItemId, has_reserved_suffix, template_key};
pub use lint::{LintDiagnostic, LintSeverity, lint_registry};
pub use model::*;
pub use parser::{Architectures, parse_document};
pub use properties::{fill_placeholders, fill_view_placeholders};
pub use registry::Registry;
pub use resolve::Resolver;
pub use store::{NavigationTree, ViewStore};
pub use view::View;

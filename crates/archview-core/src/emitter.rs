//! Emitter: `ArchitectureTemplate` → architecture text format.
//!
//! Produces output that round-trips through the parser. Entries are written
//! in map order; floats always carry a decimal point and strings are quoted
//! and escaped so property types survive re-parsing.

use crate::error::{CodecError, Result};
use crate::format::FormatConfig;
use crate::model::{ArchitectureTemplate, OverrideEntry, OverrideMap, Properties, PropertyValue, Reference};
use crate::parser::Architectures;
use serde_json::Value;
use std::fmt::Write;

/// Emit one architecture as a text block.
///
/// # Errors
/// `CodecError::InvalidStructure` if the template holds something the text
/// format cannot express (a `settings` section, or a reserved section under
/// the wrong key).
pub fn serialize_architecture(
    name: &str,
    arch: &ArchitectureTemplate,
    config: &FormatConfig,
) -> Result<String> {
    if arch.entries.is_empty() {
        return Err(CodecError::InvalidStructure(format!(
            "architecture `{name}` has no entries"
        )));
    }
    let mut emitter = Emitter {
        out: String::with_capacity(256),
        width: config.indent_width.max(1),
    };
    let _ = writeln!(emitter.out, "{name}:");
    emitter.block(&arch.entries, emitter.width)?;
    Ok(emitter.out)
}

/// Emit every architecture, separated by blank lines.
pub fn serialize_document(archs: &Architectures, config: &FormatConfig) -> Result<String> {
    let mut out = String::new();
    for (idx, (name, arch)) in archs.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(&serialize_architecture(name, arch, config)?);
    }
    Ok(out)
}

struct Emitter {
    out: String,
    width: usize,
}

impl Emitter {
    fn line(&mut self, depth: usize, text: std::fmt::Arguments<'_>) {
        for _ in 0..depth {
            self.out.push(' ');
        }
        let _ = self.out.write_fmt(text);
        self.out.push('\n');
    }

    fn block(&mut self, map: &OverrideMap, depth: usize) -> Result<()> {
        for (key, entry) in map {
            match entry {
                OverrideEntry::Default => self.line(depth, format_args!("{key}")),
                OverrideEntry::Nested(children) => {
                    self.line(depth, format_args!("{key}:"));
                    self.block(children, depth + self.width)?;
                }
                OverrideEntry::Swap(swap) => {
                    self.line(depth, format_args!("{key}: {}", swap.replacement));
                    if let Some(children) = &swap.overrides {
                        if children.is_empty() {
                            log::debug!("empty overrides for `{key}` emitted as a plain swap");
                        }
                        self.block(children, depth + self.width)?;
                    }
                }
                OverrideEntry::References(refs) => {
                    expect_key(key, "references")?;
                    self.line(depth, format_args!("references:"));
                    self.references(refs, depth + self.width);
                }
                OverrideEntry::Properties(props) => {
                    expect_key(key, "properties")?;
                    self.line(depth, format_args!("properties:"));
                    self.properties(props, depth + self.width);
                }
                OverrideEntry::Settings(_) => {
                    return Err(CodecError::InvalidStructure(format!(
                        "`{key}`: settings cannot be written in the text format"
                    )));
                }
            }
        }
        Ok(())
    }

    fn references(&mut self, refs: &[Reference], depth: usize) {
        let inner = depth + self.width;
        for reference in refs {
            if reference.title.is_empty() {
                log::warn!("skipping reference without a title");
                continue;
            }
            self.line(depth, format_args!("\"{}\":", reference.title));

            if !reference.authors.is_empty() {
                self.line(inner, format_args!("authors:"));
                for author in &reference.authors {
                    self.line(inner + self.width, format_args!("{author}"));
                }
            }
            let known = [
                ("link", &reference.link),
                ("info", &reference.info),
                ("refType", &reference.ref_type),
            ];
            for (key, value) in known {
                if let Some(value) = value {
                    self.line(inner, format_args!("{key}: \"{}\"", escape(value)));
                }
            }
            for (key, value) in &reference.extra {
                match value {
                    Value::String(s) => self.line(inner, format_args!("{key}: \"{}\"", escape(s))),
                    other => self.line(inner, format_args!("{key}: {other}")),
                }
            }
        }
    }

    fn properties(&mut self, props: &Properties, depth: usize) {
        for (key, value) in props {
            match value {
                PropertyValue::Int(n) => self.line(depth, format_args!("{key}: {n}")),
                PropertyValue::Float(f) => {
                    self.line(depth, format_args!("{key}: {}", float_literal(*f)));
                }
                PropertyValue::Text(s) => self.line(depth, format_args!("{key}: \"{}\"", escape(s))),
            }
        }
    }
}

/// `{:?}` spelling with a guaranteed `.` so the value re-parses as a float
/// (`1e16` becomes `1.0e16`).
fn float_literal(f: f64) -> String {
    let text = format!("{f:?}");
    if text.contains('.') || !f.is_finite() {
        return text;
    }
    match text.find('e') {
        Some(exp) => format!("{}.0{}", &text[..exp], &text[exp..]),
        None => format!("{text}.0"),
    }
}

fn expect_key(key: &str, section: &str) -> Result<()> {
    if key == section {
        Ok(())
    } else {
        Err(CodecError::InvalidStructure(format!(
            "{section} section stored under `{key}`"
        )))
    }
}

/// Inverse of the parser's unescape.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────

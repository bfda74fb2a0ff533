//! Parser for the architecture text format → `ArchitectureTemplate`s.
//!
//! The format is indentation-significant. Lines are pre-split, blank lines
//! dropped, and each architecture block is parsed by recursive descent over
//! the line list: a block owns every following line indented deeper than
//! its header. Per-line tokenizing (`key: value`, numeric literals) is done
//! with `winnow`.
//!
//! ```text
//! llama2:
//!     properties:
//!         layers: 32
//!     tokenizer
//!     decoder:
//!         attention: mha
//!             normalization: layernorm
//!         feedforward: gated
//! ```

use crate::error::{CodecError, Result};
use crate::model::{
    ArchitectureTemplate, OverrideEntry, OverrideMap, Properties, PropertyValue, Reference,
    SwapOverride,
};
use indexmap::IndexMap;
use serde_json::Value;
use winnow::ascii::{digit0, digit1};
use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::{one_of, take_till};

/// Architectures by name, in document order.
pub type Architectures = IndexMap<String, ArchitectureTemplate>;

/// Parse an architecture document.
///
/// Nesting is relative: any deeper indentation opens a child block, so the
/// indent width of the source does not matter.
#[must_use = "parsing result should be used"]
pub fn parse_document(input: &str) -> Result<Architectures> {
    let lines: Vec<Line<'_>> = input
        .split('\n')
        .enumerate()
        .filter_map(|(idx, raw)| Line::new(idx + 1, raw))
        .collect();

    match lines.len() {
        0 => return Err(CodecError::Empty),
        1 => return Err(CodecError::NoContents),
        _ => {}
    }

    let starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(idx, line)| line.content.ends_with(':') && (*idx == 0 || line.indent == 0))
        .map(|(idx, _)| idx)
        .collect();

    if starts.first() != Some(&0) {
        let first = lines[0];
        return Err(CodecError::MissingHeader {
            line: first.number,
            content: first.content.to_string(),
        });
    }

    let mut result = Architectures::new();
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(lines.len());
        let header = lines[start];
        let name = header.content[..header.content.len() - 1].trim().to_string();

        let mut cursor = Cursor {
            lines: &lines[start + 1..end],
            pos: 0,
        };
        let entries = cursor.block(None)?;
        if entries.is_empty() {
            return Err(CodecError::EmptyArchitecture {
                line: header.number,
                name,
            });
        }
        log::trace!("parsed architecture {name} ({} entries)", entries.len());
        result.insert(name, ArchitectureTemplate { entries });
    }

    Ok(result)
}

// ─── Lines ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    /// 1-based line number in the source.
    number: usize,
    /// Leading space count.
    indent: usize,
    /// Trimmed content, never empty.
    content: &'a str,
}

impl<'a> Line<'a> {
    fn new(number: usize, raw: &'a str) -> Option<Self> {
        let raw = raw.trim_end();
        let content = raw.trim();
        if content.is_empty() {
            return None;
        }
        Some(Self {
            number,
            indent: raw.bytes().take_while(|b| *b == b' ').count(),
            content,
        })
    }
}

struct Cursor<'l, 'a> {
    lines: &'l [Line<'a>],
    pos: usize,
}

impl<'a> Cursor<'_, 'a> {
    fn peek(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    /// Next line, if it is indented deeper than `parent`.
    fn next_within(&mut self, parent: Option<usize>) -> Option<Line<'a>> {
        let line = self.peek()?;
        if parent.is_some_and(|p| line.indent <= p) {
            return None;
        }
        self.pos += 1;
        Some(line)
    }

    // ─── Component blocks ────────────────────────────────────────────────

    fn block(&mut self, parent: Option<usize>) -> Result<OverrideMap> {
        let mut map = OverrideMap::new();

        while let Some(line) = self.next_within(parent) {
            let (key, entry) = match line.content {
                "references:" => (
                    "references".to_string(),
                    OverrideEntry::References(self.references(line.indent)?),
                ),
                "properties:" => (
                    "properties".to_string(),
                    OverrideEntry::Properties(self.properties(line.indent)?),
                ),
                content => {
                    if let Some(name) = content.strip_suffix(':') {
                        let children = self.block(Some(line.indent))?;
                        (name.trim().to_string(), OverrideEntry::Nested(children))
                    } else if let Some((class, replacement)) = split_key_value(content) {
                        let has_children =
                            self.peek().is_some_and(|next| next.indent > line.indent);
                        let overrides = if has_children {
                            Some(self.block(Some(line.indent))?)
                        } else {
                            None
                        };
                        (
                            class.to_string(),
                            OverrideEntry::Swap(SwapOverride {
                                replacement: replacement.to_string(),
                                overrides,
                            }),
                        )
                    } else {
                        (content.to_string(), OverrideEntry::Default)
                    }
                }
            };
            map.insert(key, entry);
        }

        Ok(map)
    }

    // ─── properties: ─────────────────────────────────────────────────────

    fn properties(&mut self, section_indent: usize) -> Result<Properties> {
        let mut props = Properties::new();
        while let Some(line) = self.next_within(Some(section_indent)) {
            let (key, raw) =
                split_key_value(line.content).ok_or_else(|| CodecError::MalformedProperty {
                    line: line.number,
                    content: line.content.to_string(),
                })?;
            props.insert(key.to_string(), coerce_property(raw));
        }
        Ok(props)
    }

    // ─── references: ─────────────────────────────────────────────────────

    fn references(&mut self, section_indent: usize) -> Result<Vec<Reference>> {
        // Titles sit at the level of the first line under `references:`.
        let title_indent = self.peek().map(|line| line.indent);
        let mut refs = Vec::new();

        while let Some(line) = self.next_within(Some(section_indent)) {
            let title = (Some(line.indent) == title_indent)
                .then(|| line.content.strip_suffix(':'))
                .flatten()
                .ok_or_else(|| CodecError::MalformedReference {
                    line: line.number,
                    content: line.content.to_string(),
                })?
                .trim();
            let title = unquote(title).unwrap_or(title).to_string();

            let mut reference = self.reference_body(line.indent)?;
            reference.title = title;
            refs.push(reference);
        }

        Ok(refs)
    }

    fn reference_body(&mut self, title_indent: usize) -> Result<Reference> {
        let mut reference = Reference::default();
        // Indent of an open `authors:` line; deeper bare lines are authors.
        let mut authors_at: Option<usize> = None;

        while let Some(line) = self.next_within(Some(title_indent)) {
            if let Some(level) = authors_at {
                if line.indent > level {
                    reference.authors.push(line.content.to_string());
                    continue;
                }
                authors_at = None;
            }

            let Some((key, raw)) = split_key_value(line.content) else {
                return Err(CodecError::MalformedReference {
                    line: line.number,
                    content: line.content.to_string(),
                });
            };

            if key == "authors" {
                reference.authors.clear();
                match unquote(raw) {
                    Some(inner) => reference.authors.push(unescape(inner)),
                    None if !raw.is_empty() => reference.authors.push(raw.to_string()),
                    None => authors_at = Some(line.indent),
                }
                continue;
            }

            let value = match unquote(raw) {
                Some(inner) => {
                    let mut text = inner.to_string();
                    while let Some(next) = self.next_within(Some(line.indent)) {
                        text.push('\n');
                        text.push_str(next.content);
                    }
                    unescape(&text)
                }
                None => raw.to_string(),
            };

            match key {
                "title" => {}
                "link" => reference.link = Some(value),
                "info" => reference.info = Some(value),
                "refType" => reference.ref_type = Some(value),
                other => {
                    reference
                        .extra
                        .insert(other.to_string(), Value::String(value));
                }
            }
        }

        Ok(reference)
    }
}

// ─── Low-level tokenizers ────────────────────────────────────────────────

fn key_value<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    let key: &str = take_till(0.., ':').parse_next(input)?;
    let _ = ':'.parse_next(input)?;
    let value: &'a str = *input;
    Ok((key.trim(), value.trim()))
}

/// Split `key: value` at the first colon.
fn split_key_value(content: &str) -> Option<(&str, &str)> {
    let mut rest = content;
    key_value.parse_next(&mut rest).ok()
}

fn numeric_literal<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        opt(one_of(['+', '-'])),
        alt(((digit1, opt(('.', digit0))).void(), ('.', digit1).void())),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)
}

/// Whole-string numeric check.
fn as_numeric(value: &str) -> Option<&str> {
    let mut rest = value;
    let literal = numeric_literal.parse_next(&mut rest).ok()?;
    rest.is_empty().then_some(literal)
}

/// Numbers become ints unless they contain `.` (`1e3` is an int, `1e-3`
/// is not integral and stays a float). Quoted strings are unescaped,
/// anything else is kept verbatim.
fn coerce_property(raw: &str) -> PropertyValue {
    if let Some(literal) = as_numeric(raw) {
        if !literal.contains('.') {
            if let Ok(n) = literal.parse::<i64>() {
                return PropertyValue::Int(n);
            }
        }
        if let Ok(f) = literal.parse::<f64>() {
            if !literal.contains('.') && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                return PropertyValue::Int(f as i64);
            }
            return PropertyValue::Float(f);
        }
    }
    match unquote(raw) {
        Some(inner) => PropertyValue::Text(unescape(inner)),
        None => PropertyValue::Text(raw.to_string()),
    }
}

fn unquote(s: &str) -> Option<&str> {
    (s.len() >= 2 && s.starts_with('"') && s.ends_with('"')).then(|| &s[1..s.len() - 1])
}

/// Evaluate `\n \t \r \" \' \\`. Unknown escapes are kept as written.
pub(crate) fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────

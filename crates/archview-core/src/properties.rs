//! `{{key}}` placeholder substitution from architecture properties.
//!
//! A text descriptor opts into a property by setting a truthy field of the
//! same name (`"layers": true`). Substitution targets `latexText` when
//! present, otherwise `text`.

use crate::model::{Properties, TextSpec, is_truthy};
use crate::view::View;
use serde_json::Value;
use winnow::combinator::delimited;
use winnow::prelude::*;
use winnow::token::take_while;

/// Fill the placeholders of one text descriptor.
///
/// If no property applied and the descriptor carries a `default`, every
/// remaining `{{...}}` placeholder is replaced with it.
pub fn fill_placeholders(text: &mut TextSpec, properties: &Properties) {
    let mut found = false;
    for (key, value) in properties {
        if !text.extra.get(key).is_some_and(is_truthy) {
            continue;
        }
        let placeholder = format!("{{{{{key}}}}}");
        let replacement = value.to_string();
        if let Some(target) = target_mut(text) {
            *target = target.replace(&placeholder, &replacement);
        }
        found = true;
    }

    if found {
        return;
    }
    let Some(default) = text.default.as_ref().map(default_text) else {
        return;
    };
    if let Some(target) = target_mut(text) {
        *target = replace_placeholders(target, &default);
    }
}

/// Fill every text descriptor in the view: item labels, arrow labels and
/// arrow segment labels.
pub fn fill_view_placeholders(view: &mut View) {
    let properties = &view.properties;
    for item in view.content.values_mut() {
        for text in item.texts_mut() {
            fill_placeholders(text, properties);
        }
        for arrow in item.arrows_mut() {
            for text in arrow.texts_mut() {
                fill_placeholders(text, properties);
            }
        }
    }
}

fn target_mut(text: &mut TextSpec) -> Option<&mut String> {
    match text.latex_text {
        Some(ref mut latex) => Some(latex),
        None => text.text.as_mut(),
    }
}

fn default_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `{{name}}` with a non-empty name free of `}`.
fn placeholder<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    delimited("{{", take_while(1.., |c: char| c != '}'), "}}").parse_next(input)
}

/// Replace every `{{...}}` placeholder in `s` with `with`.
fn replace_placeholders(s: &str, with: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let mut cursor = &rest[start..];
        if placeholder.parse_next(&mut cursor).is_ok() {
            out.push_str(with);
            rest = cursor;
        } else {
            out.push('{');
            rest = &rest[start + 1..];
        }
    }
    out.push_str(rest);
    out
}

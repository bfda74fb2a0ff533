//! Template data model for architecture diagrams.
//!
//! Components and details are reusable templates whose `content` is an
//! ordered map of either leaf items (shapes with text and arrows) or
//! references to other components. Architectures are ordered maps of
//! component instances, each optionally carrying swap overrides for the
//! classed slots inside it. Leaf items keep any renderer field the core
//! does not interpret in `extra`, so nothing is lost on the way to the view.

use crate::error::CodecError;
use crate::id::ItemId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── Settings & References ───────────────────────────────────────────────

/// A user-facing toggle or dropdown contributed by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    /// Deduplication key within a view.
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Item/text flag hidden while this setting is enabled (e.g. `hideText`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SettingKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_redraw: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Toggle,
    Dropdown,
}

/// A citation. `title` is the deduplication key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_type: Option<String>,
    /// Any other `key: value` pair attached to the reference.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

// ─── Properties ──────────────────────────────────────────────────────────

/// A free-form architecture property, substituted into `{{key}}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Int(n) => write!(f, "{n}"),
            PropertyValue::Float(n) => write!(f, "{n}"),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

pub type Properties = IndexMap<String, PropertyValue>;

// ─── Leaf items ──────────────────────────────────────────────────────────

/// A JSON field that may hold a single object or an array of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::Many(items) => items.iter(),
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
        }
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        match self {
            OneOrMany::Many(items) => items.iter_mut(),
            OneOrMany::One(item) => std::slice::from_mut(item).iter_mut(),
        }
    }
}

/// An arrow drawn into an item. Its `previous` may name a different anchor
/// than the item's own.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Arrow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<OneOrMany<TextSpec>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<ArrowSegment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Arrow {
    /// Labels on the arrow itself, then on each segment in order.
    pub fn texts_mut(&mut self) -> impl Iterator<Item = &mut TextSpec> {
        let own = self.text.iter_mut().flat_map(OneOrMany::iter_mut);
        let segments = self
            .segments
            .iter_mut()
            .flat_map(|segment| segment.text.iter_mut().flat_map(OneOrMany::iter_mut));
        own.chain(segments)
    }
}

/// One leg of a segmented arrow. Direction and length stay in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArrowSegment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<OneOrMany<TextSpec>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A text label attached to an item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex_text: Option<String>,
    /// Fallback for `{{...}}` placeholders no property filled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A positioned leaf element. Layout (`x`, `y`, `width`, ...) is left to
/// the renderer and travels in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Anchor this item is laid out against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<ItemId>,
    /// Drill-down view opened from this item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrow: Option<OneOrMany<Arrow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<OneOrMany<TextSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn arrows(&self) -> impl Iterator<Item = &Arrow> {
        self.arrow.iter().flat_map(OneOrMany::iter)
    }

    pub fn arrows_mut(&mut self) -> impl Iterator<Item = &mut Arrow> {
        self.arrow.iter_mut().flat_map(OneOrMany::iter_mut)
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextSpec> {
        self.text.iter().flat_map(OneOrMany::iter)
    }

    pub fn texts_mut(&mut self) -> impl Iterator<Item = &mut TextSpec> {
        self.text.iter_mut().flat_map(OneOrMany::iter_mut)
    }

    /// Whether the renderer-facing flag `name` is set (JavaScript truthiness).
    pub fn flag(&self, name: &str) -> bool {
        self.extra.get(name).is_some_and(is_truthy)
    }
}

/// JavaScript truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ─── Templates ───────────────────────────────────────────────────────────

/// Reference to another component inside a template's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub component: String,
    /// Slot name an architecture can override with a swap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

/// One entry of a template's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentEntry {
    Component(ComponentRef),
    Leaf(Item),
}

/// A reusable component (or detail) definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentTemplate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<Setting>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    /// Detail view attached to every leaf of this component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, ContentEntry>,
}

/// Details share the component shape; they are reached through `details` links.
pub type DetailTemplate = ComponentTemplate;

// ─── Architectures & overrides ───────────────────────────────────────────

pub type OverrideMap = IndexMap<String, OverrideEntry>;

/// Replace a classed slot with `replacement`, threading `overrides` into it.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapOverride {
    pub replacement: String,
    pub overrides: Option<OverrideMap>,
}

/// One value in an architecture or override map.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideEntry {
    /// Bare name: use the component as defined.
    Default,
    /// `name:` followed by an indented block.
    Nested(OverrideMap),
    /// `class: replacement`, optionally followed by an indented block.
    Swap(SwapOverride),
    References(Vec<Reference>),
    Properties(Properties),
    Settings(Vec<Setting>),
}

impl OverrideEntry {
    pub fn as_swap(&self) -> Option<&SwapOverride> {
        match self {
            OverrideEntry::Swap(swap) => Some(swap),
            _ => None,
        }
    }

    /// Convert from the registry's dynamic JSON shape: `null`, `{...}`,
    /// `[name, overrides | null]`, or a section under a reserved key.
    pub fn from_json(key: &str, value: &Value) -> Result<Self, CodecError> {
        let invalid = |what: &str| CodecError::InvalidStructure(format!("entry `{key}` {what}"));
        match key {
            "references" => Ok(OverrideEntry::References(section(key, value)?)),
            "properties" => Ok(OverrideEntry::Properties(section(key, value)?)),
            "settings" => Ok(OverrideEntry::Settings(section(key, value)?)),
            _ => match value {
                Value::Null => Ok(OverrideEntry::Default),
                Value::Object(map) => Ok(OverrideEntry::Nested(override_map_from_json(map)?)),
                Value::Array(pair) => {
                    let replacement = pair
                        .first()
                        .and_then(Value::as_str)
                        .ok_or_else(|| invalid("must start with a component name"))?;
                    let overrides = match pair.get(1) {
                        None | Some(Value::Null) => None,
                        Some(Value::Object(map)) => Some(override_map_from_json(map)?),
                        Some(_) => return Err(invalid("has non-object overrides")),
                    };
                    Ok(OverrideEntry::Swap(SwapOverride {
                        replacement: replacement.to_string(),
                        overrides,
                    }))
                }
                _ => Err(invalid(
                    "must be null, an object, or a [component, overrides] pair",
                )),
            },
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            OverrideEntry::Default => Value::Null,
            OverrideEntry::Nested(map) => Value::Object(override_map_to_json(map)),
            OverrideEntry::Swap(swap) => Value::Array(vec![
                Value::String(swap.replacement.clone()),
                swap.overrides
                    .as_ref()
                    .map_or(Value::Null, |map| Value::Object(override_map_to_json(map))),
            ]),
            OverrideEntry::References(refs) => serde_json::to_value(refs).unwrap_or_default(),
            OverrideEntry::Properties(props) => serde_json::to_value(props).unwrap_or_default(),
            OverrideEntry::Settings(settings) => {
                serde_json::to_value(settings).unwrap_or_default()
            }
        }
    }
}

fn section<T: serde::de::DeserializeOwned + Default>(
    key: &str,
    value: &Value,
) -> Result<T, CodecError> {
    if value.is_null() {
        return Ok(T::default());
    }
    T::deserialize(value).map_err(|e| CodecError::InvalidStructure(format!("`{key}`: {e}")))
}

pub fn override_map_from_json(map: &Map<String, Value>) -> Result<OverrideMap, CodecError> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), OverrideEntry::from_json(key, value)?)))
        .collect()
}

pub fn override_map_to_json(map: &OverrideMap) -> Map<String, Value> {
    map.iter()
        .map(|(key, entry)| (key.clone(), entry.to_json()))
        .collect()
}

/// A top-level architecture: component instances in declaration order,
/// interleaved with `settings`, `references` and `properties` sections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ArchitectureTemplate {
    pub entries: OverrideMap,
}

impl TryFrom<Value> for ArchitectureTemplate {
    type Error = CodecError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self {
                entries: override_map_from_json(&map)?,
            }),
            other => Err(CodecError::InvalidStructure(format!(
                "expected an object, found {other}"
            ))),
        }
    }
}

impl From<ArchitectureTemplate> for Value {
    fn from(arch: ArchitectureTemplate) -> Self {
        Value::Object(override_map_to_json(&arch.entries))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn content_entries_distinguish_refs_from_leaves() {
        let template: ComponentTemplate = serde_json::from_value(json!({
            "content": {
                "box": { "shape": "box", "width": 200, "previous": "other" },
                "slot": { "component": "mha", "class": "attention" }
            }
        }))
        .unwrap();

        match &template.content["box"] {
            ContentEntry::Leaf(item) => {
                assert_eq!(item.shape.as_deref(), Some("box"));
                assert_eq!(item.previous, Some(ItemId::intern("other")));
                assert_eq!(item.extra["width"], json!(200));
            }
            other => panic!("expected leaf, got {other:?}"),
        }
        assert_eq!(
            template.content["slot"],
            ContentEntry::Component(ComponentRef {
                component: "mha".into(),
                class: Some("attention".into()),
            })
        );
    }

    #[test]
    fn arrows_accept_single_or_many() {
        let single: Item = serde_json::from_value(json!({ "arrow": { "previous": "a" } })).unwrap();
        let many: Item = serde_json::from_value(json!({
            "arrow": [{}, { "previous": "b", "segments": [{ "direction": "up" }] }]
        }))
        .unwrap();

        assert_eq!(single.arrows().count(), 1);
        assert_eq!(many.arrows().count(), 2);
        assert_eq!(
            many.arrows().nth(1).and_then(|a| a.previous),
            Some(ItemId::intern("b"))
        );
        assert_eq!(many.arrows().nth(1).map(|a| a.segments.len()), Some(1));
        // Shape survives re-serialization
        assert!(serde_json::to_value(&single).unwrap()["arrow"].is_object());
        assert!(serde_json::to_value(&many).unwrap()["arrow"].is_array());
    }

    #[test]
    fn architecture_json_conversion() {
        let value = json!({
            "references": [{ "title": "Paper", "authors": ["A. Author"] }],
            "input": null,
            "decoder": {
                "attention": ["mha", { "norm": ["rms", null] }],
                "feedforward": ["swish", null]
            },
            "properties": { "layers": 32, "ratio": 2.5, "name": "llama" }
        });
        let arch: ArchitectureTemplate = serde_json::from_value(value.clone()).unwrap();

        let keys: Vec<_> = arch.entries.keys().map(String::as_str).collect();
        assert_eq!(keys, ["references", "input", "decoder", "properties"]);
        assert_eq!(arch.entries["input"], OverrideEntry::Default);

        let OverrideEntry::Nested(decoder) = &arch.entries["decoder"] else {
            panic!("expected nested decoder");
        };
        let swap = decoder["attention"].as_swap().unwrap();
        assert_eq!(swap.replacement, "mha");
        assert!(swap.overrides.as_ref().unwrap()["norm"].as_swap().is_some());

        let OverrideEntry::Properties(props) = &arch.entries["properties"] else {
            panic!("expected properties");
        };
        assert_eq!(props["layers"], PropertyValue::Int(32));
        assert_eq!(props["ratio"], PropertyValue::Float(2.5));
        assert_eq!(props["name"], PropertyValue::Text("llama".into()));

        assert_eq!(Value::from(arch), value);
    }

    #[test]
    fn architecture_rejects_non_object() {
        let err = ArchitectureTemplate::try_from(json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, CodecError::InvalidStructure(_)));

        let err = ArchitectureTemplate::try_from(json!({ "decoder": 3 })).unwrap_err();
        assert!(err.to_string().contains("decoder"));
    }

    #[test]
    fn truthiness_matches_javascript() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
    }
}

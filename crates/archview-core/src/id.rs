use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for item IDs.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A lightweight, interned identifier for items in a view or template.
/// Internally a `Spur` index: 4 bytes, Copy, O(1) Eq and Hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(Spur);

impl ItemId {
    /// Intern a new string as an ItemId, or return existing if already interned.
    pub fn intern(s: &str) -> Self {
        ItemId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice. Interned strings live for the
    /// whole program.
    pub fn as_str(&self) -> &'static str {
        INTERNER.resolve(&self.0)
    }

    /// Namespaced id of a leaf placed by component instance `instance`:
    /// `decoder` + `norm` → `decoder_norm`.
    pub fn namespaced(instance: &str, item: &str) -> Self {
        Self::intern(&format!("{instance}_{item}"))
    }

    /// Disambiguated id for the `n`-th repeated placement: `decoder_2_norm`.
    pub fn numbered(instance: &str, n: usize, item: &str) -> Self {
        Self::intern(&format!("{instance}_{n}_{item}"))
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ItemId::intern(&s))
    }
}

// ─── Instance ids ────────────────────────────────────────────────────────

/// Map an instance id to the template it instantiates by stripping one
/// trailing `_<digits>` suffix: `decoder_2` → `decoder`, `rms` → `rms`.
///
/// This lets the same component appear several times in one architecture
/// (`decoder`, `decoder_1`, ...). The price is that template names may not
/// themselves end in `_<digits>`; see [`has_reserved_suffix`].
pub fn template_key(instance: &str) -> &str {
    match split_suffix(instance) {
        Some((base, _)) => base,
        None => instance,
    }
}

/// True if `name` ends in `_<digits>` and therefore cannot be used as a
/// template name (lookups would strip the suffix).
pub fn has_reserved_suffix(name: &str) -> bool {
    split_suffix(name).is_some()
}

fn split_suffix(name: &str) -> Option<(&str, &str)> {
    let (base, digits) = name.rsplit_once('_')?;
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some((base, digits))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ItemId::intern("decoder_norm");
        let b = ItemId::intern("decoder_norm");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "decoder_norm");
    }

    #[test]
    fn namespaced_and_numbered_ids() {
        assert_eq!(ItemId::namespaced("mha", "box").as_str(), "mha_box");
        assert_eq!(ItemId::numbered("mha", 2, "box").as_str(), "mha_2_box");
    }

    #[test]
    fn template_key_strips_one_numeric_suffix() {
        assert_eq!(template_key("decoder_1"), "decoder");
        assert_eq!(template_key("decoder_12"), "decoder");
        assert_eq!(template_key("decoder"), "decoder");
        assert_eq!(template_key("rms_abstract"), "rms_abstract");
        assert_eq!(template_key("layer_1_2"), "layer_1");
        assert_eq!(template_key("trailing_"), "trailing_");
    }

    #[test]
    fn reserved_suffix_detection() {
        assert!(has_reserved_suffix("block_3"));
        assert!(!has_reserved_suffix("block"));
        assert!(!has_reserved_suffix("block_a3"));
        assert!(!has_reserved_suffix("_"));
    }
}

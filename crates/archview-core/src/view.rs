//! The flattened, render-ready output of resolution.

use crate::id::ItemId;
use crate::model::{Item, Properties, Reference, Setting};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A flat view: uniquely-keyed leaf items plus aggregated metadata.
///
/// Every `previous` pointer (on an item or its arrows) is either absent or
/// names a key of `content`. No entry is a component reference.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct View {
    #[serde(default)]
    pub settings: Vec<Setting>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub content: IndexMap<ItemId, Item>,
}

impl View {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.content.get(&ItemId::intern(id))
    }

    /// Append settings not already present (by `id`). First seen wins.
    pub fn merge_settings<'s>(&mut self, settings: impl IntoIterator<Item = &'s Setting>) {
        for setting in settings {
            if !self.settings.iter().any(|s| s.id == setting.id) {
                self.settings.push(setting.clone());
            }
        }
    }

    /// Append references not already present (by `title`). First seen wins.
    pub fn merge_references<'r>(&mut self, references: impl IntoIterator<Item = &'r Reference>) {
        for reference in references {
            if !self.references.iter().any(|r| r.title == reference.title) {
                self.references.push(reference.clone());
            }
        }
    }

    /// Items to draw given the ids of enabled settings, in content order.
    ///
    /// An item is hidden when it sets the flag named by the `property` of an
    /// enabled setting (e.g. `hideText`), or when its `previous` anchor is
    /// not in the view.
    pub fn visible_items<'v>(
        &'v self,
        enabled: &[&str],
    ) -> impl Iterator<Item = (&'v ItemId, &'v Item)> + 'v {
        let hidden: Vec<&str> = self
            .settings
            .iter()
            .filter(|s| enabled.contains(&s.id.as_str()))
            .filter_map(|s| s.property.as_deref())
            .collect();

        self.content.iter().filter(move |(_, item)| {
            if hidden.iter().any(|flag| item.flag(flag)) {
                return false;
            }
            item.previous
                .is_none_or(|prev| self.content.contains_key(&prev))
        })
    }
}

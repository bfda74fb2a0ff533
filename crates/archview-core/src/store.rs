//! Session cache of resolved views and the drill-down navigation tree.

use crate::view::View;
use indexmap::IndexMap;
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Resolved views by name. A detail is resolved at most once per session
/// unless invalidated.
#[derive(Debug, Default)]
pub struct ViewStore {
    views: HashMap<String, View>,
    navigation: NavigationTree,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, view: View) {
        self.views.insert(name.into(), view);
    }

    /// Drop a cached view so the next request rebuilds it.
    pub fn invalidate(&mut self, name: &str) -> Option<View> {
        self.navigation.remove(name);
        self.views.remove(name)
    }

    pub fn clear(&mut self) {
        self.views.clear();
        self.navigation = NavigationTree::default();
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn navigation(&self) -> &NavigationTree {
        &self.navigation
    }

    pub(crate) fn navigation_mut(&mut self) -> &mut NavigationTree {
        &mut self.navigation
    }
}

// ─── Navigation tree ─────────────────────────────────────────────────────

/// View name → child views reached through `details` links, in the order
/// they were first referenced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NavigationTree {
    children: IndexMap<String, SmallVec<[String; 4]>>,
}

impl NavigationTree {
    /// Start (or restart) the entry for `view` with no children.
    pub fn reset(&mut self, view: &str) {
        self.children.insert(view.to_string(), SmallVec::new());
    }

    /// Record `child` under `parent`. Repeat links are ignored.
    pub fn link(&mut self, parent: &str, child: &str) {
        let entry = self.children.entry(parent.to_string()).or_default();
        if !entry.iter().any(|c| c == child) {
            entry.push(child.to_string());
        }
    }

    pub fn remove(&mut self, view: &str) {
        self.children.shift_remove(view);
    }

    pub fn children(&self, view: &str) -> &[String] {
        self.children
            .get(view)
            .map(|c| c.as_slice())
            .unwrap_or_default()
    }

    pub fn contains(&self, view: &str) -> bool {
        self.children.contains_key(view)
    }

    /// Views that are not the child of any other view.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.children
            .keys()
            .filter(|name| !self.children.values().any(|c| c.contains(*name)))
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.children.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn link_dedups_children() {
        let mut tree = NavigationTree::default();
        tree.reset("llama");
        tree.link("llama", "attention");
        tree.link("llama", "ffn");
        tree.link("llama", "attention");
        tree.link("attention", "softmax");

        assert_eq!(tree.children("llama"), ["attention", "ffn"]);
        assert!(tree.children("softmax").is_empty());
        assert_eq!(tree.roots().collect::<Vec<_>>(), ["llama"]);
    }

    #[test]
    fn reset_clears_only_one_entry() {
        let mut tree = NavigationTree::default();
        tree.link("a", "x");
        tree.link("b", "y");
        tree.reset("a");
        assert!(tree.children("a").is_empty());
        assert_eq!(tree.children("b"), ["y"]);
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut tree = NavigationTree::default();
        tree.link("llama", "attention");
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json, serde_json::json!({ "llama": ["attention"] }));
    }

    #[test]
    fn store_invalidate_and_clear() {
        let mut store = ViewStore::new();
        store.insert("a", View::default());
        store.insert("b", View::default());
        store.navigation_mut().link("a", "b");

        assert!(store.invalidate("a").is_some());
        assert!(!store.contains("a"));
        assert!(!store.navigation().contains("a"));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }
}

//! Resolver: flattens architecture and detail templates into `View`s.
//!
//! Component references are expanded recursively into namespaced leaf items
//! (`{instance}_{item}`, or `{instance}_{n}_{item}` for repeat placements).
//! Classed slots can be swapped by the architecture, and swaps thread down
//! through nested components. `previous` pointers are rewritten into the
//! flat namespace so every anchor names a key of the same view.
//!
//! Resolution is best-effort: a missing template or a cyclic reference is
//! logged and that subtree is left out; the rest of the view still builds.

use crate::id::{ItemId, template_key};
use crate::model::{ComponentTemplate, ContentEntry, OverrideEntry, OverrideMap, Properties};
use crate::registry::Registry;
use crate::store::ViewStore;
use crate::view::View;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

// ─── Resolver ────────────────────────────────────────────────────────────

/// Resolution context for one session: the read-only registry plus the
/// mutable view cache and navigation tree.
pub struct Resolver<'a> {
    registry: &'a Registry,
    store: &'a mut ViewStore,
    /// Details currently being built, so a detail reached from itself stops.
    in_progress: HashSet<String>,
    /// Properties of the architecture being resolved, inherited by details.
    properties: Properties,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry, store: &'a mut ViewStore) -> Self {
        Self {
            registry,
            store,
            in_progress: HashSet::new(),
            properties: Properties::new(),
        }
    }

    /// Flatten the architecture `name`. Details reached along the way are
    /// built and cached in the store.
    ///
    /// An unknown name is logged and yields an empty view.
    pub fn resolve_architecture(&mut self, name: &str) -> View {
        let registry = self.registry;
        let Some(arch) = registry.architecture(name) else {
            log::error!("architecture `{name}` not found");
            return View::default();
        };
        log::debug!("building view {name}");

        self.store.navigation_mut().reset(name);
        self.properties = match arch.entries.get("properties") {
            Some(OverrideEntry::Properties(props)) => props.clone(),
            _ => Properties::new(),
        };

        let mut view = View::default();
        for (key, entry) in &arch.entries {
            match entry {
                OverrideEntry::Settings(settings) => view.settings.extend(settings.iter().cloned()),
                OverrideEntry::References(refs) => view.references.extend(refs.iter().cloned()),
                OverrideEntry::Properties(props) => view.properties = props.clone(),
                OverrideEntry::Default => self.expand_component(key, &mut view, name, &[], None),
                OverrideEntry::Nested(swaps) => {
                    self.expand_component(key, &mut view, name, &[], Some(swaps));
                }
                OverrideEntry::Swap(swap) => self.expand_component(
                    &swap.replacement,
                    &mut view,
                    name,
                    &[],
                    swap.overrides.as_ref(),
                ),
            }
        }
        view
    }

    /// Flatten the detail `name`, threading `overrides` into its swap points.
    ///
    /// Falls back to a component of the same name. An unknown name is logged
    /// and yields `None`.
    pub fn resolve_detail(&mut self, name: &str, overrides: Option<&OverrideMap>) -> Option<View> {
        self.build_detail(name, &[], overrides)
    }

    /// The cached view for `name`, resolving it (as an architecture, else as
    /// a detail) on first access.
    pub fn open(&mut self, name: &str) -> Option<&View> {
        if !self.store.contains(name) {
            let view = if self.registry.architecture(name).is_some() {
                self.resolve_architecture(name)
            } else {
                self.resolve_detail(name, None)?
            };
            self.store.insert(name, view);
        }
        self.store.get(name)
    }

    // ─── Details ─────────────────────────────────────────────────────────

    fn build_detail(
        &mut self,
        name: &str,
        chain: &[String],
        overrides: Option<&OverrideMap>,
    ) -> Option<View> {
        let registry = self.registry;
        let Some(template) = registry.detail(template_key(name)) else {
            log::error!("detail `{name}` not found");
            return None;
        };
        log::debug!("building view {name}");

        self.in_progress.insert(name.to_string());
        self.store.navigation_mut().reset(name);

        let mut view = View {
            properties: self.properties.clone(),
            ..View::default()
        };
        self.expand_template(name, template, &mut view, name, chain, overrides);

        self.in_progress.remove(name);
        Some(view)
    }

    /// Make sure the detail `name` is built and linked under `parent`.
    fn attach_detail(
        &mut self,
        name: &str,
        parent: &str,
        chain: &[String],
        swaps: Option<&OverrideMap>,
    ) {
        let available = if self.store.contains(name) || self.in_progress.contains(name) {
            true
        } else if let Some(view) = self.build_detail(name, chain, swaps) {
            self.store.insert(name, view);
            true
        } else {
            false
        };

        if available && name != parent {
            self.store.navigation_mut().link(parent, name);
        }
    }

    // ─── Components ──────────────────────────────────────────────────────

    fn expand_component(
        &mut self,
        id: &str,
        target: &mut View,
        view_name: &str,
        chain: &[String],
        swaps: Option<&OverrideMap>,
    ) {
        let registry = self.registry;
        let Some(template) = registry.component(template_key(id)) else {
            log::error!("component `{id}` not found");
            return;
        };
        self.expand_template(id, template, target, view_name, chain, swaps);
    }

    /// Expand `template`, instantiated as `id`, into `target`.
    fn expand_template(
        &mut self,
        id: &str,
        template: &ComponentTemplate,
        target: &mut View,
        view_name: &str,
        parent_chain: &[String],
        swaps: Option<&OverrideMap>,
    ) {
        log::trace!("building component {id}");

        if parent_chain.iter().any(|ancestor| ancestor == id) {
            log::error!("cyclical reference detected in component `{id}`");
            return;
        }
        let mut chain = parent_chain.to_vec();
        chain.push(id.to_string());

        if let Some(detail) = &template.details {
            self.attach_detail(detail, view_name, parent_chain, swaps);
        }

        // Template key → id placed in `target` by this expansion.
        let mut id_map: HashMap<&str, ItemId> = HashMap::new();

        for (index, (key, entry)) in template.content.iter().enumerate() {
            let item = match entry {
                ContentEntry::Component(reference) => {
                    let swap = match (reference.class.as_deref(), swaps) {
                        (Some(class), Some(swaps)) => match swaps.get(class) {
                            Some(OverrideEntry::Swap(swap)) => Some((class, swap)),
                            Some(OverrideEntry::Default) | None => None,
                            Some(_) => {
                                log::warn!(
                                    "override for class `{class}` in `{id}` is not a swap, ignoring it"
                                );
                                None
                            }
                        },
                        _ => None,
                    };

                    match swap {
                        Some((class, swap)) => {
                            log::debug!(
                                "swapping internal component {key} with class {class} to {}",
                                swap.replacement
                            );
                            self.expand_component(
                                &swap.replacement,
                                target,
                                view_name,
                                &chain,
                                swap.overrides.as_ref(),
                            );
                        }
                        None => {
                            self.expand_component(
                                &reference.component,
                                target,
                                view_name,
                                &chain,
                                swaps,
                            );
                        }
                    }
                    continue;
                }
                ContentEntry::Leaf(item) => item,
            };

            let mut new_id = ItemId::namespaced(id, key);
            let mut n = 1;
            while target.content.contains_key(&new_id) {
                new_id = ItemId::numbered(id, n, key);
                n += 1;
            }
            id_map.insert(key.as_str(), new_id);

            let mut placed = item.clone();

            if index == 0 && !target.content.is_empty() {
                if let Some(prev) = placed.previous {
                    log::warn!("first item {new_id} in {id} had a previous element {prev}");
                }
                placed.previous = target.content.keys().last().copied();
            } else if let Some(prev) = placed.previous {
                placed.previous = id_map.get(prev.as_str()).copied();
            }

            for arrow in placed.arrows_mut() {
                if let Some(prev) = arrow.previous {
                    arrow.previous = id_map.get(prev.as_str()).copied();
                }
            }

            if placed.details.is_none() {
                placed.details.clone_from(&template.details);
            }
            if placed.info.is_none() {
                placed.info.clone_from(&template.info);
            }

            let links: SmallVec<[String; 2]> = placed
                .details
                .iter()
                .chain(placed.arrows().filter_map(|arrow| arrow.details.as_ref()))
                .cloned()
                .collect();

            target.content.insert(new_id, placed);

            for detail in &links {
                self.attach_detail(detail, view_name, parent_chain, swaps);
            }
        }

        target.merge_settings(&template.settings);
        target.merge_references(&template.references);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────

//! WASM bridge for archview: exposes the resolution engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web` and loaded by the diagram
//! viewer. Everything crossing the boundary is a JSON string shaped
//! `{"ok":true,...}` or `{"ok":false,"error":"..."}`.

use archview_core::{
    FormatConfig, Registry, Resolver, ViewStore, fill_view_placeholders, format_document,
    parse_document, serialize_architecture,
};
use serde_json::{Value, json};
use wasm_bindgen::prelude::*;

/// Session state for the viewer: the template registry plus every view
/// resolved so far.
#[wasm_bindgen]
pub struct ArchViewer {
    registry: Registry,
    store: ViewStore,
}

#[wasm_bindgen]
impl ArchViewer {
    /// Create a viewer from a registry document
    /// (`{"components":{...},"details":{...},"architectures":{...}}`).
    #[wasm_bindgen(constructor)]
    pub fn new(registry_json: &str) -> Result<ArchViewer, String> {
        console_error_panic_hook_setup();
        let registry = Registry::from_json(registry_json).map_err(|e| e.to_string())?;
        Ok(Self {
            registry,
            store: ViewStore::new(),
        })
    }

    /// Parse architecture text and add its architectures, replacing any of
    /// the same name. Returns `{"ok":true,"names":[...]}`.
    pub fn load_architectures(&mut self, text: &str) -> String {
        match parse_document(text) {
            Ok(parsed) => {
                let names: Vec<String> = parsed.keys().cloned().collect();
                for name in &names {
                    self.store.invalidate(name);
                }
                self.registry.merge_architectures(parsed);
                log::debug!("loaded {} architectures", names.len());
                ok(json!({ "names": names }))
            }
            Err(e) => error(e),
        }
    }

    /// The flattened view for an architecture or detail, with placeholders
    /// filled. Returns `{"ok":true,"view":{...}}`.
    pub fn view_json(&mut self, name: &str) -> String {
        let mut resolver = Resolver::new(&self.registry, &mut self.store);
        let Some(view) = resolver.open(name) else {
            return error(format!("no architecture or detail named '{name}'"));
        };
        let mut view = view.clone();
        fill_view_placeholders(&mut view);
        match serde_json::to_value(&view) {
            Ok(value) => ok(json!({ "view": value })),
            Err(e) => error(format!("Serialization error: {e}")),
        }
    }

    /// The drill-down tree of views resolved so far.
    /// Returns `{"ok":true,"navigation":{...},"roots":[...]}`.
    pub fn navigation_json(&self) -> String {
        let nav = self.store.navigation();
        let roots: Vec<&str> = nav.roots().collect();
        ok(json!({ "navigation": nav, "roots": roots }))
    }

    /// Write an architecture back out in the text format.
    /// Returns `{"ok":true,"text":"..."}`.
    pub fn serialize_architecture(&self, name: &str) -> String {
        let Some(arch) = self.registry.architecture(name) else {
            return error(format!("no architecture named '{name}'"));
        };
        match serialize_architecture(name, arch, &FormatConfig::default()) {
            Ok(text) => ok(json!({ "text": text })),
            Err(e) => error(e),
        }
    }

    /// Drop a cached view so the next request rebuilds it.
    pub fn invalidate(&mut self, name: &str) -> bool {
        self.store.invalidate(name).is_some()
    }
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("archview WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no viewer needed) ─────────────────────────────

/// Parse architecture text into the registry's JSON shape.
/// Returns `{"ok":true,"architectures":{...}}`.
#[wasm_bindgen]
pub fn parse_architectures(text: &str) -> String {
    match parse_document(text) {
        Ok(parsed) => {
            let archs: serde_json::Map<String, Value> = parsed
                .into_iter()
                .map(|(name, arch)| (name, Value::from(arch)))
                .collect();
            ok(json!({ "architectures": archs }))
        }
        Err(e) => error(e),
    }
}

/// Canonically re-indent architecture text.
/// Returns `{"ok":true,"text":"..."}`.
#[wasm_bindgen]
pub fn format_architectures(text: &str) -> String {
    match format_document(text, &FormatConfig::default()) {
        Ok(text) => ok(json!({ "text": text })),
        Err(e) => error(e),
    }
}

fn ok(payload: Value) -> String {
    let mut obj = json!({ "ok": true });
    if let (Value::Object(target), Value::Object(fields)) = (&mut obj, payload) {
        target.extend(fields);
    }
    obj.to_string()
}

fn error(e: impl std::fmt::Display) -> String {
    json!({ "ok": false, "error": e.to_string() }).to_string()
}

//! Integration tests: registry JSON + architecture text → flattened views.

use archview_core::{
    ItemId, Registry, Resolver, View, ViewStore, fill_view_placeholders, lint_registry,
    parse_document,
};
use pretty_assertions::assert_eq;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn registry() -> Registry {
    let mut registry =
        Registry::from_json(include_str!("fixtures/registry.json")).expect("registry fixture");
    registry.merge_architectures(
        parse_document(include_str!("fixtures/llama.arch")).expect("architecture fixture"),
    );
    registry
}

fn keys(view: &View) -> Vec<&'static str> {
    view.content.keys().map(ItemId::as_str).collect()
}

fn previous(view: &View, id: &str) -> Option<&'static str> {
    view.item(id).and_then(|item| item.previous).map(|p| p.as_str())
}

/// Every key unique (by construction) and every anchor resolvable.
fn assert_well_formed(view: &View) {
    for (id, item) in &view.content {
        let anchors = item
            .previous
            .iter()
            .chain(item.arrows().filter_map(|a| a.previous.as_ref()));
        for anchor in anchors {
            assert!(view.content.contains_key(anchor), "{id} → missing {anchor}");
        }
    }
    let mut ids: Vec<_> = view.settings.iter().map(|s| &s.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), view.settings.len(), "duplicate settings");
    let mut titles: Vec<_> = view.references.iter().map(|r| &r.title).collect();
    titles.sort();
    titles.dedup();
    assert_eq!(titles.len(), view.references.len(), "duplicate references");
}

// ─── Architectures ───────────────────────────────────────────────────────

#[test]
fn llama_architecture_flattens_in_order() {
    let registry = registry();
    let mut store = ViewStore::new();
    let view = Resolver::new(&registry, &mut store).resolve_architecture("llama2_7B");

    assert_eq!(
        keys(&view),
        [
            "input_box",
            "tokenization_abstract_box",
            "embedding_abstract_box",
            "decoder_abstract_box",
            "rms_abstract_box",
            "unembedding_abstract_box",
            "output_box",
        ]
    );
    let chained: Vec<_> = view.content.keys().skip(1).map(|id| previous(&view, id.as_str())).collect();
    let expected: Vec<_> = view.content.keys().take(6).map(|id| Some(id.as_str())).collect();
    assert_eq!(chained, expected);
    assert_well_formed(&view);

    // Architecture references first, then component references.
    let titles: Vec<_> = view.references.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(
        titles,
        [
            "Llama 2: Open Foundation and Fine-Tuned Chat Models",
            "Root Mean Square Layer Normalization"
        ]
    );
    assert_eq!(view.settings.len(), 1);
    assert_eq!(view.settings[0].id, "hide-counts");
}

#[test]
fn llama_details_and_navigation() {
    let registry = registry();
    let mut store = ViewStore::new();
    Resolver::new(&registry, &mut store).resolve_architecture("llama2_7B");

    let nav = store.navigation();
    assert_eq!(
        nav.children("llama2_7B"),
        ["tokenization", "embedding", "decoder", "rms", "unembedding", "sampling"]
    );
    assert_eq!(nav.children("decoder"), ["rms"]);
    assert_eq!(nav.roots().collect::<Vec<_>>(), ["llama2_7B"]);

    let decoder = store.get("decoder").expect("decoder detail cached");
    assert_eq!(
        keys(decoder),
        [
            "decoder_hidden_box",
            "decoder_residual_split",
            "rms_abstract_box",
            "mha_box",
            "rms_abstract_1_box",
            "swish_abstract_box",
        ]
    );
    assert_eq!(previous(decoder, "decoder_residual_split"), Some("decoder_hidden_box"));
    assert_eq!(previous(decoder, "rms_abstract_1_box"), Some("mha_box"));
    assert_eq!(
        decoder.item("mha_box").and_then(|i| i.info.as_deref()),
        Some("Multi-head attention")
    );
    assert_well_formed(decoder);
}

#[test]
fn swapped_architecture_uses_replacements() {
    let registry = registry();
    let mut store = ViewStore::new();
    let view = Resolver::new(&registry, &mut store).resolve_architecture("llama2_gqa");

    assert_eq!(
        keys(&view),
        [
            "input_box",
            "decoder_hidden_box",
            "decoder_residual_split",
            "rms_abstract_box",
            "gqa_box",
            "rms_abstract_1_box",
            "swish_abstract_box",
            "output_box",
        ]
    );
    assert_eq!(previous(&view, "decoder_hidden_box"), Some("input_box"));
    assert_eq!(previous(&view, "gqa_box"), Some("rms_abstract_box"));
    assert_eq!(
        view.item("gqa_box").and_then(|i| i.info.as_deref()),
        Some("Grouped-query attention")
    );
    assert_well_formed(&view);
}

#[test]
fn placeholders_use_architecture_properties() {
    let registry = registry();
    let mut store = ViewStore::new();
    let mut view = Resolver::new(&registry, &mut store).resolve_architecture("llama2_7B");
    fill_view_placeholders(&mut view);

    let texts: Vec<_> = view
        .item("decoder_abstract_box")
        .unwrap()
        .texts()
        .filter_map(|t| t.text.as_deref())
        .collect();
    assert_eq!(texts, ["decoder", "×32"]);
}

// ─── Details & session cache ─────────────────────────────────────────────

#[test]
fn open_standalone_detail() {
    let registry = registry();
    let mut store = ViewStore::new();
    let mut resolver = Resolver::new(&registry, &mut store);

    let view = resolver.open("attention_scores").expect("detail resolves");
    assert_eq!(keys(view), ["attention_scores_scores", "attention_scores_softmax"]);
    assert_eq!(
        previous(view, "attention_scores_softmax"),
        Some("attention_scores_scores")
    );
    let arrow = view.item("attention_scores_softmax").unwrap().arrows().next().unwrap();
    assert_eq!(arrow.previous, Some(ItemId::intern("attention_scores_scores")));
}

#[test]
fn reresolving_after_invalidate_rebuilds() {
    let registry = registry();
    let mut store = ViewStore::new();
    Resolver::new(&registry, &mut store).open("llama2_gqa");
    assert!(store.contains("llama2_gqa"));

    store.invalidate("llama2_gqa");
    assert!(!store.contains("llama2_gqa"));

    let len = Resolver::new(&registry, &mut store)
        .open("llama2_gqa")
        .map(|v| v.content.len());
    assert_eq!(len, Some(8));
    // Children are linked again even though their views stayed cached.
    assert_eq!(store.navigation().children("llama2_gqa"), ["rms", "sampling"]);
}

#[test]
fn view_serializes_for_renderer() {
    let registry = registry();
    let mut store = ViewStore::new();
    let view = Resolver::new(&registry, &mut store).resolve_architecture("tiny");

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["content"]["input_box"]["shape"], "box");
    assert_eq!(json["content"]["output_box"]["previous"], "input_box");
    assert_eq!(json["content"]["output_box"]["arrow"]["details"], "sampling");
}

#[test]
fn fixture_registry_is_lint_clean() {
    let diags = lint_registry(&registry());
    assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
}

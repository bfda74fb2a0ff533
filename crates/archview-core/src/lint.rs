//! Lint diagnostics for template registries.
//!
//! Reports authoring mistakes that resolution would otherwise tolerate
//! silently (missing templates, cycles, anchors that get dropped).
//! Nothing is modified.

use crate::id::template_key;
use crate::model::{ComponentTemplate, ContentEntry, OverrideEntry, OverrideMap};
use crate::registry::Registry;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Should be fixed; part of the diagram will be missing.
    Warning,
    /// Informational: resolution overrides what was written.
    Info,
}

/// A single lint diagnostic.
#[derive(Debug, Clone)]
pub struct LintDiagnostic {
    /// Template or architecture the finding belongs to.
    pub subject: String,
    /// Human-readable message.
    pub message: String,
    /// Severity level.
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "missing-component", "component-cycle").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules over the registry and return diagnostics.
#[must_use]
pub fn lint_registry(registry: &Registry) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    for (name, template) in registry.components().chain(registry.details()) {
        lint_references(registry, name, template, &mut diags);
        lint_anchors(name, template, &mut diags);
    }
    for (name, arch) in registry.architectures() {
        lint_overrides(registry, name, &arch.entries, true, &mut diags);
    }
    lint_component_cycles(registry, &mut diags);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

fn missing_component(subject: &str, component: &str) -> LintDiagnostic {
    LintDiagnostic {
        subject: subject.to_string(),
        message: format!("Component `{component}` is not defined."),
        severity: LintSeverity::Warning,
        rule: "missing-component",
    }
}

/// Warn on component refs and `details` links that name no template.
fn lint_references(
    registry: &Registry,
    name: &str,
    template: &ComponentTemplate,
    diags: &mut Vec<LintDiagnostic>,
) {
    let mut details: Vec<&str> = template.details.iter().map(String::as_str).collect();

    for entry in template.content.values() {
        match entry {
            ContentEntry::Component(reference) => {
                if registry.component(template_key(&reference.component)).is_none() {
                    diags.push(missing_component(name, &reference.component));
                }
            }
            ContentEntry::Leaf(item) => {
                details.extend(item.details.as_deref());
                details.extend(item.arrows().filter_map(|a| a.details.as_deref()));
            }
        }
    }

    let mut seen = HashSet::new();
    for detail in details {
        if seen.insert(detail) && registry.detail(template_key(detail)).is_none() {
            diags.push(LintDiagnostic {
                subject: name.to_string(),
                message: format!("Detail `{detail}` is not defined."),
                severity: LintSeverity::Warning,
                rule: "missing-detail",
            });
        }
    }
}

/// `previous` may only name a leaf declared earlier in the same template;
/// anything else is dropped during resolution.
fn lint_anchors(name: &str, template: &ComponentTemplate, diags: &mut Vec<LintDiagnostic>) {
    let mut earlier: HashSet<&str> = HashSet::new();

    for (index, (key, entry)) in template.content.iter().enumerate() {
        let ContentEntry::Leaf(item) = entry else {
            continue;
        };

        if index == 0 {
            if let Some(prev) = item.previous {
                diags.push(LintDiagnostic {
                    subject: name.to_string(),
                    message: format!(
                        "First item `{key}` declares previous `{prev}`; it is replaced by the preceding placement."
                    ),
                    severity: LintSeverity::Info,
                    rule: "first-item-previous",
                });
            }
        } else if let Some(prev) = item.previous {
            if !earlier.contains(prev.as_str()) {
                diags.push(dangling(name, key, prev.as_str()));
            }
        }

        // Arrows may point at the item itself.
        earlier.insert(key.as_str());
        for prev in item.arrows().filter_map(|a| a.previous) {
            if !earlier.contains(prev.as_str()) {
                diags.push(dangling(name, key, prev.as_str()));
            }
        }
    }
}

fn dangling(name: &str, key: &str, prev: &str) -> LintDiagnostic {
    LintDiagnostic {
        subject: name.to_string(),
        message: format!(
            "`{key}` points at `{prev}`, which is not an earlier item of `{name}`; the link is dropped."
        ),
        severity: LintSeverity::Warning,
        rule: "dangling-previous",
    }
}

/// Check every component an architecture (or swap) names.
fn lint_overrides(
    registry: &Registry,
    arch: &str,
    map: &OverrideMap,
    top_level: bool,
    diags: &mut Vec<LintDiagnostic>,
) {
    for (key, entry) in map {
        match entry {
            OverrideEntry::Default | OverrideEntry::Nested(_) if top_level => {
                if registry.component(template_key(key)).is_none() {
                    diags.push(missing_component(arch, key));
                }
                if let OverrideEntry::Nested(children) = entry {
                    lint_overrides(registry, arch, children, false, diags);
                }
            }
            OverrideEntry::Swap(swap) => {
                if registry.component(template_key(&swap.replacement)).is_none() {
                    diags.push(missing_component(arch, &swap.replacement));
                }
                if let Some(children) = &swap.overrides {
                    lint_overrides(registry, arch, children, false, diags);
                }
            }
            _ => {}
        }
    }
}

/// Warn once per strongly connected group of components that reference
/// each other (including self references).
fn lint_component_cycles(registry: &Registry, diags: &mut Vec<LintDiagnostic>) {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for (name, _) in registry.components() {
        nodes.insert(name, graph.add_node(name));
    }
    for (name, template) in registry.components() {
        let from = nodes[name];
        for entry in template.content.values() {
            if let ContentEntry::Component(reference) = entry {
                if let Some(&to) = nodes.get(template_key(&reference.component)) {
                    graph.update_edge(from, to, ());
                }
            }
        }
    }

    for scc in tarjan_scc(&graph) {
        let cyclic = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
        if !cyclic {
            continue;
        }
        let mut members: Vec<&str> = scc.iter().map(|&idx| graph[idx]).collect();
        members.sort_unstable();
        diags.push(LintDiagnostic {
            subject: members[0].to_string(),
            message: format!(
                "Components {} reference each other; the repeated branch is skipped.",
                members.join(" → ")
            ),
            severity: LintSeverity::Warning,
            rule: "component-cycle",
        });
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lint(value: serde_json::Value) -> Vec<LintDiagnostic> {
        lint_registry(&Registry::from_json(&value.to_string()).unwrap())
    }

    fn rules(diags: &[LintDiagnostic]) -> Vec<&'static str> {
        diags.iter().map(|d| d.rule).collect()
    }

    #[test]
    fn lint_missing_component() {
        let diags = lint(json!({
            "components": { "a": { "content": { "x": { "component": "ghost" } } } },
            "architectures": { "arch": {
                "a": { "slot": ["phantom", { "inner": ["spectre", null] }] },
                "missing": null
            }}
        }));
        let missing: Vec<_> = diags
            .iter()
            .filter(|d| d.rule == "missing-component")
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(missing.len(), 4, "{missing:?}");
        assert!(missing.iter().any(|m| m.contains("`spectre`")));
    }

    #[test]
    fn lint_missing_detail() {
        let diags = lint(json!({
            "components": { "a": {
                "details": "nowhere",
                "content": { "x": { "details": "nowhere", "arrow": [{ "details": "gone" }] } }
            }},
            "details": { "exists": { "content": {} } }
        }));
        assert_eq!(rules(&diags), ["missing-detail", "missing-detail"]);
    }

    #[test]
    fn lint_component_cycle() {
        let diags = lint(json!({
            "components": {
                "a": { "content": { "b": { "component": "b" } } },
                "b": { "content": { "a": { "component": "a_1" } } },
                "selfish": { "content": { "me": { "component": "selfish" } } },
                "fine": { "content": { "a": { "component": "a" } } }
            }
        }));
        let cycles: Vec<_> = diags.iter().filter(|d| d.rule == "component-cycle").collect();
        assert_eq!(cycles.len(), 2);
        assert!(cycles.iter().any(|d| d.subject == "a" && d.message.contains("a → b")));
        assert!(cycles.iter().any(|d| d.subject == "selfish"));
    }

    #[test]
    fn lint_previous_pointers() {
        let diags = lint(json!({
            "components": { "c": { "content": {
                "first": { "previous": "x" },
                "second": { "previous": "first", "arrow": { "previous": "second" } },
                "third": { "previous": "later" },
                "later": { "arrow": [{ "previous": "nowhere" }] }
            }}}
        }));
        assert_eq!(
            rules(&diags),
            ["first-item-previous", "dangling-previous", "dangling-previous"]
        );
    }

    #[test]
    fn lint_clean_registry_no_diags() {
        let diags = lint(json!({
            "components": {
                "block": { "details": "block_math", "content": {
                    "in": {},
                    "out": { "previous": "in" },
                    "slot": { "component": "mha", "class": "attention" }
                }},
                "mha": { "content": { "box": {} } },
                "gqa": { "content": { "box": {} } }
            },
            "details": { "block_math": { "content": {} } },
            "architectures": { "arch": {
                "references": [{ "title": "Paper" }],
                "block": { "attention": ["gqa", null] },
                "block_1": null
            }}
        }));
        assert!(diags.is_empty(), "clean registry should have no diagnostics: {diags:?}");
    }
}

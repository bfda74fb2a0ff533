//! Template catalogs: components, details and architectures by name.
//!
//! A registry is read-only during resolution. It is loaded once from a JSON
//! document and may later absorb architectures parsed from user text.

use crate::error::RegistryError;
use crate::id::has_reserved_suffix;
use crate::model::{ArchitectureTemplate, ComponentTemplate, DetailTemplate};
use crate::parser::Architectures;
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    components: IndexMap<String, ComponentTemplate>,
    details: IndexMap<String, DetailTemplate>,
    architectures: IndexMap<String, ArchitectureTemplate>,
}

/// On-disk shape of a registry document.
#[derive(Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    components: IndexMap<String, ComponentTemplate>,
    #[serde(default)]
    details: IndexMap<String, DetailTemplate>,
    #[serde(default)]
    architectures: IndexMap<String, ArchitectureTemplate>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{ "components": {...}, "details": {...}, "architectures": {...} }`.
    ///
    /// # Errors
    /// `RegistryError::Json` for malformed input, `ReservedSuffix` if a
    /// component or detail name ends in `_<digits>`.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let doc: RegistryDocument = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for (name, template) in doc.components {
            registry.insert_component(name, template)?;
        }
        for (name, template) in doc.details {
            registry.insert_detail(name, template)?;
        }
        registry.architectures = doc.architectures;
        log::debug!(
            "loaded registry: {} components, {} details, {} architectures",
            registry.components.len(),
            registry.details.len(),
            registry.architectures.len()
        );
        Ok(registry)
    }

    pub fn insert_component(
        &mut self,
        name: impl Into<String>,
        template: ComponentTemplate,
    ) -> Result<(), RegistryError> {
        let name = checked_name("component", name.into())?;
        self.components.insert(name, template);
        Ok(())
    }

    pub fn insert_detail(
        &mut self,
        name: impl Into<String>,
        template: DetailTemplate,
    ) -> Result<(), RegistryError> {
        let name = checked_name("detail", name.into())?;
        self.details.insert(name, template);
        Ok(())
    }

    pub fn insert_architecture(&mut self, name: impl Into<String>, arch: ArchitectureTemplate) {
        self.architectures.insert(name.into(), arch);
    }

    /// Add architectures parsed from text. Existing names are replaced.
    pub fn merge_architectures(&mut self, parsed: Architectures) {
        for (name, arch) in parsed {
            if self.architectures.insert(name.clone(), arch).is_some() {
                log::debug!("architecture `{name}` replaced by parsed definition");
            }
        }
    }

    pub fn component(&self, name: &str) -> Option<&ComponentTemplate> {
        self.components.get(name)
    }

    /// Detail lookup, falling back to the component catalog.
    pub fn detail(&self, name: &str) -> Option<&DetailTemplate> {
        self.details.get(name).or_else(|| self.components.get(name))
    }

    pub fn architecture(&self, name: &str) -> Option<&ArchitectureTemplate> {
        self.architectures.get(name)
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &ComponentTemplate)> {
        self.components.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn details(&self) -> impl Iterator<Item = (&str, &DetailTemplate)> {
        self.details.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn architectures(&self) -> &IndexMap<String, ArchitectureTemplate> {
        &self.architectures
    }
}

fn checked_name(kind: &'static str, name: String) -> Result<String, RegistryError> {
    if has_reserved_suffix(&name) {
        return Err(RegistryError::ReservedSuffix { kind, name });
    }
    Ok(name)
}

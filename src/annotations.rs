use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CustomResource {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub apiversion: String,
}

/// Human-authored documentation for one pod template.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnnotationEntry {
    pub ns: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub crd: Vec<CustomResource>,
    #[serde(default)]
    pub install: String,
}

impl AnnotationEntry {
    /// Render the custom resources as `Kind (apiversion)` lines.
    pub fn custom_resources_text(&self) -> String {
        self.crd
            .iter()
            .filter(|cr| !cr.kind.is_empty())
            .map(|cr| {
                if cr.apiversion.is_empty() {
                    cr.kind.clone()
                } else {
                    format!("{} ({})", cr.kind, cr.apiversion)
                }
            })
            .collect::<Vec<_>>()
            .join(",\n")
    }
}

#[derive(Debug, Deserialize)]
struct DescriptionFile {
    #[serde(default)]
    descriptions: Vec<AnnotationEntry>,
}

/// Lookup of annotation entries by (namespace, normalized pod name).
#[derive(Debug, Default)]
pub struct AnnotationStore {
    entries: HashMap<(String, String), AnnotationEntry>,
    empty: AnnotationEntry,
}

impl AnnotationStore {
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let file: DescriptionFile =
            serde_yaml::from_str(content).context("Invalid description YAML")?;
        let entries = file
            .descriptions
            .into_iter()
            .map(|entry| ((entry.ns.clone(), entry.name.clone()), entry))
            .collect();
        Ok(Self {
            entries,
            empty: AnnotationEntry::default(),
        })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to load {}", path.display()))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Missing entries yield an entry with every field empty.
    pub fn lookup(&self, namespace: &str, name: &str) -> &AnnotationEntry {
        self.entries
            .get(&(namespace.to_string(), name.to_string()))
            .unwrap_or(&self.empty)
    }
}

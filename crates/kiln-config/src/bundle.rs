//! Bundle declarations (`[[bundles]]` in kiln.toml)

use serde::{Deserialize, Serialize};

/// A user-declared group of components shipped together as one module.
///
/// The tag list is an unordered set: two declarations that name the same
/// tags in a different order or casing describe the same bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct BundleDeclaration {
    /// Component tag names
    pub components: Vec<String>,
}

impl BundleDeclaration {
    /// Create a declaration from tag names
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Tag names as declared
    pub fn tags(&self) -> &[String] {
        &self.components
    }

    /// Lower-cased, sorted and deduplicated tag names
    pub fn canonical_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .components
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Human-readable tag list used to label diagnostics
    pub fn label(&self) -> String {
        self.canonical_tags().join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

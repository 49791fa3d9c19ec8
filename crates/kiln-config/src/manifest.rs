//! Component Manifest
//!
//! Handles the component metadata produced by the collection compiler
//! (`components.json`).

use crate::variant::ComponentVariants;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Metadata for one reusable component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ComponentMetadata {
    /// Custom element tag (case-insensitive identity)
    #[serde(rename = "tag")]
    pub tag_name: String,

    /// Exported class implementing the component
    pub component_class: String,

    /// Compiled module exporting the class
    pub component_path: PathBuf,

    /// Variant flags (e.g., `{"small": true}`)
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, bool>,
}

impl ComponentMetadata {
    /// Create component metadata
    pub fn new(
        tag_name: impl Into<String>,
        component_class: impl Into<String>,
        component_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tag_name: tag_name.into(),
            component_class: component_class.into(),
            component_path: component_path.into(),
            variants: BTreeMap::new(),
        }
    }

    /// Set a variant flag
    pub fn with_variant(mut self, flag: impl Into<String>, enabled: bool) -> Self {
        self.variants.insert(flag.into(), enabled);
        self
    }

    /// Whether this component answers to the given tag
    pub fn matches_tag(&self, tag: &str) -> bool {
        self.tag_name.to_lowercase() == tag.trim().to_lowercase()
    }

    /// File stem of the compiled module (`badge` for `/x/badge.js`)
    pub fn module_stem(&self) -> Option<&str> {
        self.component_path.file_stem().and_then(|s| s.to_str())
    }

    /// Resolved variant per axis
    pub fn resolved_variants(&self) -> ComponentVariants {
        ComponentVariants::from_flags(&self.variants)
    }
}

/// Component manifest (components.json)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ComponentManifest {
    /// Components in declaration order
    #[serde(default)]
    pub components: Vec<ComponentMetadata>,
}

impl ComponentManifest {
    /// Create a manifest from components
    pub fn new(components: Vec<ComponentMetadata>) -> Self {
        Self { components }
    }

    /// Parse a manifest from JSON
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Load a manifest from file
    ///
    /// Relative component paths are resolved against the manifest's directory.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let mut manifest = Self::from_str(&content).map_err(|e| ConfigError::JsonParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        if let Some(base) = path.parent() {
            manifest.resolve_paths(base);
        }

        manifest.validate()?;
        Ok(manifest)
    }

    /// Make every relative component path absolute against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        for component in &mut self.components {
            if component.component_path.is_relative() {
                component.component_path = base.join(&component.component_path);
            }
        }
    }

    /// Validate the manifest
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();

        for component in &self.components {
            let tag = component.tag_name.trim();
            if tag.is_empty() || !tag.contains('-') {
                return Err(ConfigError::InvalidValue {
                    field: "tag".to_string(),
                    reason: format!("'{}' is not a valid custom element tag", tag),
                });
            }

            if component.component_class.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.componentClass", tag),
                    reason: "class name cannot be empty".to_string(),
                });
            }

            if !seen.insert(tag.to_lowercase()) {
                return Err(ConfigError::DuplicateComponent(tag.to_string()));
            }
        }

        Ok(())
    }

    /// Find a component by tag, ignoring case
    pub fn find(&self, tag: &str) -> Option<&ComponentMetadata> {
        self.components.iter().find(|c| c.matches_tag(tag))
    }

    pub fn components(&self) -> &[ComponentMetadata] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let json = r#"{
  "components": [
    { "tag": "ion-badge", "componentClass": "Badge", "componentPath": "badge/badge.js" },
    { "tag": "ion-card", "componentClass": "Card", "componentPath": "card/card.js",
      "variants": { "outline": true } }
  ]
}"#;
        let manifest = ComponentManifest::from_str(json).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.components[1].variants.get("outline"), Some(&true));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let manifest =
            ComponentManifest::new(vec![ComponentMetadata::new("Ion-Badge", "Badge", "/b.js")]);
        assert!(manifest.find("ion-badge").is_some());
        assert!(manifest.find("ION-BADGE").is_some());
        assert!(manifest.find("ion-card").is_none());
    }

    #[test]
    fn test_find_folds_non_ascii_tags() {
        let manifest =
            ComponentManifest::new(vec![ComponentMetadata::new("x-Ä", "Umlaut", "/u.js")]);
        assert!(manifest.find("x-ä").is_some());
        assert!(manifest.find("X-Ä").is_some());
    }

    #[test]
    fn test_duplicate_tags_rejected() {
        let manifest = ComponentManifest::new(vec![
            ComponentMetadata::new("ion-badge", "Badge", "/a.js"),
            ComponentMetadata::new("ION-BADGE", "Badge2", "/b.js"),
        ]);
        assert!(matches!(
            manifest.validate(),
            Err(ConfigError::DuplicateComponent(_))
        ));
    }

    #[test]
    fn test_tag_without_hyphen_rejected() {
        let manifest = ComponentManifest::new(vec![ComponentMetadata::new("badge", "Badge", "/a.js")]);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_module_stem() {
        let component = ComponentMetadata::new("ion-badge", "Badge", "/x/components/badge.js");
        assert_eq!(component.module_stem(), Some("badge"));
    }

    #[test]
    fn test_resolve_paths() {
        let mut manifest = ComponentManifest::new(vec![
            ComponentMetadata::new("x-rel", "Rel", "rel/rel.js"),
            ComponentMetadata::new("x-abs", "Abs", "/abs/abs.js"),
        ]);
        manifest.resolve_paths(Path::new("/project"));
        assert_eq!(
            manifest.components[0].component_path,
            PathBuf::from("/project/rel/rel.js")
        );
        assert_eq!(
            manifest.components[1].component_path,
            PathBuf::from("/abs/abs.js")
        );
    }
}

//! Project Configuration (kiln.toml)
//!
//! Handles project-level configuration stored in `kiln.toml` at the project root.

use crate::bundle::BundleDeclaration;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default output directory for bundles
pub const DEFAULT_BUILD_DIR: &str = "www/build";

/// Default root of the compiled component modules
pub const DEFAULT_SOURCE_DIR: &str = "src";

/// Default component manifest file
pub const DEFAULT_MANIFEST: &str = "components.json";

/// Default length of content-hashed file names
pub const DEFAULT_HASHED_FILE_NAME_LENGTH: usize = 8;

/// Default cap for tag-derived file names
pub const DEFAULT_MAX_FILE_NAME_LENGTH: usize = 50;

/// Project configuration from kiln.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSection>,

    /// Build configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSection>,

    /// Bundle declarations
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bundles: Vec<BundleDeclaration>,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    /// Namespace of the component library (e.g., "App")
    pub namespace: String,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Output directory (default: "www/build")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,

    /// Compiled module directory (default: "src")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,

    /// Component manifest (default: "components.json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,

    /// Name bundle files after a hash of their content (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_file_names: Option<bool>,

    /// Length of hashed file names (default: 8)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashed_file_name_length: Option<usize>,

    /// Maximum length of tag-derived file names (default: 50)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_name_length: Option<usize>,

    /// Minify bundle output (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(project) = &self.project {
            if !is_valid_namespace(&project.namespace) {
                return Err(ConfigError::InvalidValue {
                    field: "project.namespace".to_string(),
                    reason: format!(
                        "'{}' must be non-empty and contain only letters, digits, '_' or '$'",
                        project.namespace
                    ),
                });
            }
        }

        if let Some(build) = &self.build {
            if let Some(length) = build.hashed_file_name_length {
                if !(4..=64).contains(&length) {
                    return Err(ConfigError::InvalidValue {
                        field: "build.hashed_file_name_length".to_string(),
                        reason: format!("{} is outside the range 4..=64", length),
                    });
                }
            }

            if build.max_file_name_length == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: "build.max_file_name_length".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        for (index, bundle) in self.bundles.iter().enumerate() {
            if bundle.canonical_tags().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "bundle #{} does not list any components",
                    index + 1
                )));
            }
            if bundle.tags().iter().any(|tag| tag.trim().is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "bundle #{} lists a blank component tag",
                    index + 1
                )));
            }
        }

        Ok(())
    }

    /// Get the namespace, if present
    pub fn namespace(&self) -> Option<&str> {
        self.project.as_ref().map(|p| p.namespace.as_str())
    }

    /// Output directory relative to the project root
    pub fn build_dir(&self) -> PathBuf {
        self.build
            .as_ref()
            .and_then(|b| b.build_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR))
    }

    /// Compiled module directory relative to the project root
    pub fn source_dir(&self) -> PathBuf {
        self.build
            .as_ref()
            .and_then(|b| b.source_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR))
    }

    /// Component manifest path relative to the project root
    pub fn manifest(&self) -> PathBuf {
        self.build
            .as_ref()
            .and_then(|b| b.manifest.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST))
    }

    pub fn hash_file_names(&self) -> bool {
        self.build
            .as_ref()
            .and_then(|b| b.hash_file_names)
            .unwrap_or(true)
    }

    pub fn hashed_file_name_length(&self) -> usize {
        self.build
            .as_ref()
            .and_then(|b| b.hashed_file_name_length)
            .unwrap_or(DEFAULT_HASHED_FILE_NAME_LENGTH)
    }

    pub fn max_file_name_length(&self) -> usize {
        self.build
            .as_ref()
            .and_then(|b| b.max_file_name_length)
            .unwrap_or(DEFAULT_MAX_FILE_NAME_LENGTH)
    }

    pub fn minify(&self) -> bool {
        self.build.as_ref().and_then(|b| b.minify).unwrap_or(false)
    }

    /// Mutable access to the build section, creating it if absent
    pub fn build_mut(&mut self) -> &mut BuildSection {
        self.build.get_or_insert_with(BuildSection::default)
    }
}

/// Check that a namespace can be used as a JavaScript global identifier
fn is_valid_namespace(namespace: &str) -> bool {
    let mut chars = namespace.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

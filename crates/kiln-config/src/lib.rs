//! Kiln Configuration System
//!
//! Provides configuration management for Kiln projects including:
//! - Project configuration (kiln.toml)
//! - Bundle declarations (`[[bundles]]`)
//! - Component manifests (components.json)
//! - Component variant selection
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Project config (./kiln.toml)
//! 3. Environment variables (KILN_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use kiln_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! ```

pub mod bundle;
pub mod loader;
pub mod manifest;
pub mod project;
pub mod variant;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid JSON syntax in {file}: {error}")]
    JsonParseError {
        file: PathBuf,
        error: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate component tag '{0}' in manifest")]
    DuplicateComponent(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use bundle::BundleDeclaration;
pub use loader::{Config, ConfigLoader};
pub use manifest::{ComponentManifest, ComponentMetadata};
pub use project::ProjectConfig;
pub use variant::{ComponentVariants, Display, Shape, Size, Style, VariantAxis};

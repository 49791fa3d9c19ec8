//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::bundle::BundleDeclaration;
use crate::project::ProjectConfig;
use crate::ConfigResult;
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const CONFIG_FILE_NAME: &str = "kiln.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Project config (./kiln.toml) - overrides built-in defaults
/// 2. Environment variables (KILN_*) - overrides project
/// 3. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Apply KILN_* environment overrides
    use_env: bool,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Project root directory (where kiln.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { use_env: true }
    }

    /// Disable environment variable overrides
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find kiln.toml.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config); a missing kiln.toml yields the default config
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Apply environment variable overrides to project config
    ///
    /// Recognized: KILN_NAMESPACE, KILN_BUILD_DIR, KILN_HASH_FILE_NAMES, KILN_MINIFY
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if !self.use_env {
            return Ok(config);
        }

        if let Ok(namespace) = env::var("KILN_NAMESPACE") {
            match config.project.as_mut() {
                Some(project) => project.namespace = namespace,
                None => {
                    config.project = Some(crate::project::ProjectSection { namespace });
                }
            }
        }

        if let Ok(build_dir) = env::var("KILN_BUILD_DIR") {
            config.build_mut().build_dir = Some(PathBuf::from(build_dir));
        }

        if let Ok(hash) = env::var("KILN_HASH_FILE_NAMES") {
            config.build_mut().hash_file_names = Some(is_truthy(&hash));
        }

        if let Ok(minify) = env::var("KILN_MINIFY") {
            config.build_mut().minify = Some(is_truthy(&minify));
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl Config {
    /// Create a config rooted at the given directory
    pub fn new(project: ProjectConfig, project_root: impl Into<PathBuf>) -> Self {
        Self {
            project,
            project_root: Some(project_root.into()),
        }
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has kiln.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Namespace, defaulting to "App"
    pub fn namespace(&self) -> &str {
        self.project.namespace().unwrap_or("App")
    }

    /// Absolute output directory
    pub fn build_dir(&self) -> PathBuf {
        self.resolve(self.project.build_dir())
    }

    /// Absolute compiled module directory
    pub fn source_dir(&self) -> PathBuf {
        self.resolve(self.project.source_dir())
    }

    /// Absolute component manifest path
    pub fn manifest_path(&self) -> PathBuf {
        self.resolve(self.project.manifest())
    }

    /// Absolute path of kiln.toml, if this is a project
    pub fn config_path(&self) -> Option<PathBuf> {
        self.project_root.as_ref().map(|root| root.join(CONFIG_FILE_NAME))
    }

    pub fn bundles(&self) -> &[BundleDeclaration] {
        &self.project.bundles
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        match &self.project_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

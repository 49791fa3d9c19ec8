//! Configuration loading, validation and environment override tests

use kiln_config::{ConfigError, ConfigLoader, ProjectConfig};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join("kiln.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

const FULL_CONFIG: &str = r#"
[project]
namespace = "Ionic"

[build]
build_dir = "dist/build"
source_dir = "dist/collection"
manifest = "dist/components.json"
hash_file_names = false
hashed_file_name_length = 12
max_file_name_length = 40
minify = true

[[bundles]]
components = ["ion-badge", "ion-card"]

[[bundles]]
components = ["ion-list"]
"#;

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_full_config() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), FULL_CONFIG);

    let config = ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(config.is_project());
    assert_eq!(config.namespace(), "Ionic");
    assert_eq!(config.build_dir(), temp_dir.path().join("dist/build"));
    assert_eq!(config.source_dir(), temp_dir.path().join("dist/collection"));
    assert_eq!(
        config.manifest_path(),
        temp_dir.path().join("dist/components.json")
    );
    assert!(!config.project.hash_file_names());
    assert_eq!(config.project.hashed_file_name_length(), 12);
    assert_eq!(config.project.max_file_name_length(), 40);
    assert!(config.project.minify());
    assert_eq!(config.bundles().len(), 2);
    assert_eq!(config.bundles()[0].tags(), ["ion-badge", "ion-card"]);
}

#[test]
fn test_defaults_for_minimal_config() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "[[bundles]]\ncomponents = [\"x-a\"]\n");

    let config = ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert_eq!(config.namespace(), "App");
    assert_eq!(config.build_dir(), temp_dir.path().join("www/build"));
    assert_eq!(config.source_dir(), temp_dir.path().join("src"));
    assert_eq!(config.manifest_path(), temp_dir.path().join("components.json"));
    assert!(config.project.hash_file_names());
    assert_eq!(config.project.hashed_file_name_length(), 8);
    assert_eq!(config.project.max_file_name_length(), 50);
    assert!(!config.project.minify());
}

#[test]
fn test_load_when_no_config_exists() {
    let temp_dir = TempDir::new().unwrap();

    let config = ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path())
        .unwrap();

    assert!(!config.is_project());
    assert!(config.bundles().is_empty());
    assert_eq!(config.config_path(), None);
}

#[test]
fn test_load_from_subdirectory_finds_parent() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), FULL_CONFIG);
    let nested = temp_dir.path().join("src/components/badge");
    fs::create_dir_all(&nested).unwrap();

    let config = ConfigLoader::new()
        .without_env()
        .load_from_directory(&nested)
        .unwrap();

    assert_eq!(config.project_root(), Some(temp_dir.path()));
    assert_eq!(config.config_path(), Some(temp_dir.path().join("kiln.toml")));
}

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), FULL_CONFIG);

    let config = ConfigLoader::new().without_env().load_from_file(&path).unwrap();

    assert_eq!(config.project_root(), Some(temp_dir.path()));
    assert_eq!(config.namespace(), "Ionic");
}

#[test]
fn test_missing_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let result = ProjectConfig::load_from_file(&temp_dir.path().join("kiln.toml"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

// ============================================================================
// Validation
// ============================================================================

#[rstest]
#[case("[project]\nnamespace = \"\"\n", "project.namespace")]
#[case("[project]\nnamespace = \"my-app\"\n", "project.namespace")]
#[case("[build]\nhashed_file_name_length = 2\n", "build.hashed_file_name_length")]
#[case("[build]\nhashed_file_name_length = 65\n", "build.hashed_file_name_length")]
#[case("[build]\nmax_file_name_length = 0\n", "build.max_file_name_length")]
fn test_invalid_values_rejected(#[case] content: &str, #[case] expected_field: &str) {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), content);

    match ProjectConfig::load_from_file(&path) {
        Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected_field),
        other => panic!("expected an invalid value, got {:?}", other),
    }
}

#[rstest]
#[case::only_blank("[[bundles]]\ncomponents = [\" \"]\n", "does not list any components")]
#[case::blank_beside_real(
    "[[bundles]]\ncomponents = [\"\", \"x-a\"]\n",
    "lists a blank component tag"
)]
fn test_blank_bundle_tags_rejected(#[case] content: &str, #[case] reason: &str) {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), content);

    match ProjectConfig::load_from_file(&path) {
        Err(ConfigError::ValidationError(message)) => {
            assert_eq!(message, format!("bundle #1 {}", reason))
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_unknown_fields_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[build]\nout_dir = \"x\"\n");

    assert!(matches!(
        ProjectConfig::load_from_file(&path),
        Err(ConfigError::TomlParseError { .. })
    ));
}

// ============================================================================
// Environment overrides
// ============================================================================

fn clear_env() {
    for key in [
        "KILN_NAMESPACE",
        "KILN_BUILD_DIR",
        "KILN_HASH_FILE_NAMES",
        "KILN_MINIFY",
    ] {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), FULL_CONFIG);

    env::set_var("KILN_NAMESPACE", "Override");
    env::set_var("KILN_BUILD_DIR", "out");
    env::set_var("KILN_HASH_FILE_NAMES", "yes");
    env::set_var("KILN_MINIFY", "0");

    let config = ConfigLoader::new()
        .load_from_directory(temp_dir.path())
        .unwrap();
    clear_env();

    assert_eq!(config.namespace(), "Override");
    assert_eq!(config.build_dir(), temp_dir.path().join("out"));
    assert!(config.project.hash_file_names());
    assert!(!config.project.minify());
}

#[test]
#[serial]
fn test_env_override_is_validated() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), FULL_CONFIG);

    env::set_var("KILN_NAMESPACE", "not valid");
    let result = ConfigLoader::new().load_from_directory(temp_dir.path());
    clear_env();

    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
#[serial]
fn test_without_env_ignores_overrides() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), FULL_CONFIG);

    env::set_var("KILN_NAMESPACE", "Override");
    let config = ConfigLoader::new()
        .without_env()
        .load_from_directory(temp_dir.path())
        .unwrap();
    clear_env();

    assert_eq!(config.namespace(), "Ionic");
}

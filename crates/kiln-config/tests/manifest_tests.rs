//! Component manifest loading tests

use kiln_config::{ComponentManifest, ConfigError, Size, Style};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn write_manifest(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("components.json");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_resolves_paths_against_manifest_dir() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_manifest(
        &temp_dir,
        r#"{
  "components": [
    { "tag": "ion-badge", "componentClass": "Badge", "componentPath": "collection/badge.js" },
    {
      "tag": "ion-button",
      "componentClass": "Button",
      "componentPath": "collection/button.js",
      "variants": { "small": true, "large": true, "outline": true }
    }
  ]
}"#,
    );

    let manifest = ComponentManifest::load_from_file(&path).unwrap();

    assert_eq!(manifest.len(), 2);
    let badge = manifest.find("ION-BADGE").unwrap();
    assert_eq!(
        badge.component_path,
        temp_dir.path().join("collection/badge.js")
    );
    assert_eq!(badge.module_stem(), Some("badge"));

    let variants = manifest.find("ion-button").unwrap().resolved_variants();
    assert_eq!(variants.size, Size::Large);
    assert_eq!(variants.style, Style::Outline);
}

#[test]
fn test_missing_manifest_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let result = ComponentManifest::load_from_file(&temp_dir.path().join("components.json"));
    assert!(matches!(result, Err(ConfigError::NotFound(_))));
}

#[test]
fn test_malformed_manifest_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_manifest(&temp_dir, r#"{ "components": [ { "tag": "x-a" } ] }"#);

    assert!(matches!(
        ComponentManifest::load_from_file(&path),
        Err(ConfigError::JsonParseError { .. })
    ));
}

#[test]
fn test_duplicate_tags_rejected_case_insensitively() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_manifest(
        &temp_dir,
        r#"{ "components": [
  { "tag": "x-card", "componentClass": "Card", "componentPath": "card.js" },
  { "tag": "X-Card", "componentClass": "Card2", "componentPath": "card2.js" }
] }"#,
    );

    assert!(matches!(
        ComponentManifest::load_from_file(&path),
        Err(ConfigError::DuplicateComponent(_))
    ));
}

#[test]
fn test_tag_without_hyphen_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_manifest(
        &temp_dir,
        r#"{ "components": [ { "tag": "card", "componentClass": "Card", "componentPath": "card.js" } ] }"#,
    );

    assert!(ComponentManifest::load_from_file(&path).is_err());
}

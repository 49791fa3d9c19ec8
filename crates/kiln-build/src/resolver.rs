//! Component resolution
//!
//! Maps the tags of a bundle declaration onto manifest entries. A missing
//! tag is reported and skipped; the bundle keeps whatever did resolve.

use crate::diagnostic::{codes, Diagnostic};
use kiln_config::{ComponentManifest, ComponentMetadata};
use std::collections::HashSet;

/// Result of resolving one bundle's tags
#[derive(Debug, Default)]
pub struct Resolution<'a> {
    /// Resolved components, in declaration order
    pub components: Vec<&'a ComponentMetadata>,
    /// Resolution errors
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution<'_> {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Resolve tag names against the manifest
///
/// Lookup ignores case. A tag repeated within one declaration resolves once.
/// A blank tag matches nothing and is reported like any other missing tag.
/// When nothing resolves, a separate "No components found to bundle" error
/// is added after the per-tag errors.
pub fn resolve_components<'a, S: AsRef<str>>(
    tags: &[S],
    manifest: &'a ComponentManifest,
) -> Resolution<'a> {
    let mut resolution = Resolution::default();
    let mut seen = HashSet::new();

    for tag in tags {
        let tag = tag.as_ref().trim();
        if !seen.insert(tag.to_lowercase()) {
            continue;
        }

        match manifest.find(tag) {
            Some(component) => resolution.components.push(component),
            None => resolution.diagnostics.push(Diagnostic::error_with_code(
                codes::UNRESOLVED_COMPONENT,
                format!(
                    "Unable to find component \"{}\" in available config and collection.",
                    tag
                ),
            )),
        }
    }

    if resolution.components.is_empty() {
        resolution.diagnostics.push(Diagnostic::error_with_code(
            codes::EMPTY_BUNDLE,
            "No components found to bundle",
        ));
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> ComponentManifest {
        ComponentManifest::new(vec![
            ComponentMetadata::new("ion-badge", "Badge", "/c/badge.js"),
            ComponentMetadata::new("Ion-Card", "Card", "/c/card.js"),
        ])
    }

    #[test]
    fn test_all_tags_resolve() {
        let manifest = manifest();
        let resolution = resolve_components(&["ion-badge", "ion-card"], &manifest);
        assert_eq!(resolution.components.len(), 2);
        assert!(resolution.diagnostics.is_empty());
    }

    #[test]
    fn test_lookup_ignores_case_and_keeps_manifest_casing() {
        let manifest = manifest();
        let resolution = resolve_components(&["ION-CARD"], &manifest);
        assert_eq!(resolution.components[0].tag_name, "Ion-Card");
    }

    #[test]
    fn test_partial_miss_keeps_resolved() {
        let manifest = manifest();
        let resolution = resolve_components(&["ion-badge", "ion-missing"], &manifest);
        assert_eq!(resolution.components.len(), 1);
        assert_eq!(resolution.diagnostics.len(), 1);
        assert_eq!(
            resolution.diagnostics[0].message,
            "Unable to find component \"ion-missing\" in available config and collection."
        );
    }

    #[test]
    fn test_nothing_resolves() {
        let manifest = manifest();
        let resolution = resolve_components(&["x-one", "x-two"], &manifest);
        assert!(resolution.is_empty());
        assert_eq!(resolution.diagnostics.len(), 3);
        assert_eq!(
            resolution.diagnostics[2].message,
            "No components found to bundle"
        );
        assert_eq!(resolution.diagnostics[2].code, codes::EMPTY_BUNDLE);
    }

    #[test]
    fn test_repeated_tag_resolves_once() {
        let manifest = manifest();
        let resolution = resolve_components(&["ion-badge", "ION-BADGE"], &manifest);
        assert_eq!(resolution.components.len(), 1);
    }

    #[test]
    fn test_blank_tag_reported_as_unresolved() {
        let manifest = manifest();
        let resolution = resolve_components(&["", "ion-badge", "   "], &manifest);
        assert_eq!(resolution.components.len(), 1);
        assert_eq!(resolution.diagnostics.len(), 1);
        assert_eq!(resolution.diagnostics[0].code, codes::UNRESOLVED_COMPONENT);
        assert_eq!(
            resolution.diagnostics[0].message,
            "Unable to find component \"\" in available config and collection."
        );
    }

    #[test]
    fn test_lookup_folds_non_ascii_case() {
        let manifest = ComponentManifest::new(vec![ComponentMetadata::new(
            "x-ä", "Umlaut", "/c/umlaut.js",
        )]);
        let resolution = resolve_components(&["X-Ä"], &manifest);
        assert_eq!(resolution.components.len(), 1);
        assert!(resolution.diagnostics.is_empty());
    }
}

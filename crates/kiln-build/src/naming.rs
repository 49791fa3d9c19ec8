//! Bundle identifiers and output file names

use kiln_config::project::{DEFAULT_HASHED_FILE_NAME_LENGTH, DEFAULT_MAX_FILE_NAME_LENGTH};
use kiln_config::BundleDeclaration;
use sha2::{Digest, Sha256};

/// Placeholder the bundled code may use to refer to its own output name
pub const BUNDLE_ID_PLACEHOLDER: &str = "__KILN_BUNDLE_ID__";

/// Length of bundle identifiers
pub const BUNDLE_IDENTIFIER_LENGTH: usize = 16;

/// Content hash function
pub trait ContentHasher: Send + Sync {
    /// Hash `content` into a string of at most `length` characters
    ///
    /// Must be deterministic for identical input.
    fn hash(&self, content: &str, length: usize) -> String;
}

/// Lowercase hex SHA-256, truncated
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hash(&self, content: &str, length: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let digest = hasher.finalize();

        let mut hex: String = digest.iter().map(|byte| format!("{:02x}", byte)).collect();
        hex.truncate(length);
        hex
    }
}

/// Output naming settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingOptions {
    /// Name files after a hash of their content
    pub hash_file_names: bool,
    /// Length of hashed names
    pub hashed_length: usize,
    /// Cap for tag-derived names
    pub max_length: usize,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            hash_file_names: true,
            hashed_length: DEFAULT_HASHED_FILE_NAME_LENGTH,
            max_length: DEFAULT_MAX_FILE_NAME_LENGTH,
        }
    }
}

/// Derive the cache key of a bundle from its tag set
///
/// Only the canonical tag list is hashed, so order, case and repeats in the
/// declaration do not matter.
pub fn bundle_identifier(hasher: &dyn ContentHasher, declaration: &BundleDeclaration) -> String {
    let canonical = declaration.canonical_tags().join("\n");
    hasher.hash(&canonical, BUNDLE_IDENTIFIER_LENGTH)
}

/// Derive the output file name (without extension) of a bundle
///
/// Tag-derived names are cut at `max_length` characters; two bundles sharing
/// that prefix get the same name.
pub fn output_name(
    hasher: &dyn ContentHasher,
    content: &str,
    declaration: &BundleDeclaration,
    options: &NamingOptions,
) -> String {
    if options.hash_file_names {
        return hasher.hash(content, options.hashed_length);
    }

    let joined = declaration.canonical_tags().join(".");
    match joined.char_indices().nth(options.max_length) {
        Some((cut, _)) => joined[..cut].to_string(),
        None => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_sha256_hasher_known_value() {
        // sha256("abc")
        assert_eq!(Sha256Hasher.hash("abc", 8), "ba7816bf");
        assert_eq!(Sha256Hasher.hash("abc", 64).len(), 64);
        assert_eq!(Sha256Hasher.hash("abc", 100).len(), 64);
    }

    #[rstest]
    #[case(&["x-a", "x-b"], &["x-b", "x-a"])]
    #[case(&["X-A", "x-b"], &["x-b", "x-a"])]
    #[case(&["x-a", "x-a", "x-b"], &["x-b", "x-a"])]
    fn test_identifier_is_order_independent(#[case] left: &[&str], #[case] right: &[&str]) {
        let left = BundleDeclaration::new(left.iter().copied());
        let right = BundleDeclaration::new(right.iter().copied());
        assert_eq!(
            bundle_identifier(&Sha256Hasher, &left),
            bundle_identifier(&Sha256Hasher, &right)
        );
    }

    #[test]
    fn test_identifier_differs_per_set() {
        let left = BundleDeclaration::new(["x-a", "x-b"]);
        let right = BundleDeclaration::new(["x-c"]);
        assert_ne!(
            bundle_identifier(&Sha256Hasher, &left),
            bundle_identifier(&Sha256Hasher, &right)
        );
        assert_eq!(bundle_identifier(&Sha256Hasher, &left).len(), BUNDLE_IDENTIFIER_LENGTH);
    }

    #[test]
    fn test_hashed_name_follows_content() {
        let declaration = BundleDeclaration::new(["x-a"]);
        let options = NamingOptions::default();
        let first = output_name(&Sha256Hasher, "code", &declaration, &options);
        assert_eq!(first.len(), 8);
        assert_eq!(first, output_name(&Sha256Hasher, "code", &declaration, &options));
        assert_ne!(first, output_name(&Sha256Hasher, "other", &declaration, &options));
    }

    #[test]
    fn test_tag_name_sorted_and_dot_joined() {
        let declaration = BundleDeclaration::new(["ion-card", "ION-BADGE"]);
        let options = NamingOptions {
            hash_file_names: false,
            ..Default::default()
        };
        assert_eq!(
            output_name(&Sha256Hasher, "", &declaration, &options),
            "ion-badge.ion-card"
        );
    }

    #[test]
    fn test_tag_name_truncated_to_exactly_max_length() {
        let declaration = BundleDeclaration::new([
            "ion-action-sheet-controller",
            "ion-alert-controller",
            "ion-loading-controller",
        ]);
        let options = NamingOptions {
            hash_file_names: false,
            ..Default::default()
        };
        let joined = declaration.canonical_tags().join(".");
        assert!(joined.len() > 50);

        let name = output_name(&Sha256Hasher, "", &declaration, &options);
        assert_eq!(name.len(), 50);
        assert_eq!(name, joined[..50]);
    }
}

//! Virtual entry module generation

use kiln_config::ComponentMetadata;
use std::fmt::Write;

/// Module id of the synthetic entry; never backed by a file
pub const ENTRY_KEY: &str = "\0kiln:entry";

/// Generate the entry module for a set of resolved components
///
/// Components are sorted by tag, ignoring case, so the text only depends on
/// the component set. Each component contributes one import of its class
/// and one export keyed by the upper-cased tag.
pub fn generate_entry(components: &[&ComponentMetadata]) -> String {
    let mut sorted = components.to_vec();
    sorted.sort_by(|a, b| {
        a.tag_name
            .to_lowercase()
            .cmp(&b.tag_name.to_lowercase())
            .then_with(|| a.tag_name.cmp(&b.tag_name))
    });

    let mut entry = String::new();
    for component in sorted {
        let module_path = component.component_path.to_string_lossy().replace('\\', "/");
        // Writing to a String cannot fail
        let _ = writeln!(
            entry,
            "import {{ {} }} from \"{}\";",
            component.component_class, module_path
        );
        let _ = writeln!(
            entry,
            "exports[\"{}\"] = {};",
            component.tag_name.to_uppercase(),
            component.component_class
        );
    }
    entry
}

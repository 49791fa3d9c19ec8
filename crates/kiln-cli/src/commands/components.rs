//! Components command - list manifest components and their variants

use super::load_project;
use anyhow::{Context, Result};
use kiln_config::ComponentManifest;
use std::path::PathBuf;

pub fn run(project_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_project(project_dir.as_deref())?;
    let manifest_path = config.manifest_path();
    let manifest = ComponentManifest::load_from_file(&manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;

    if json {
        let components: Vec<_> = manifest
            .components()
            .iter()
            .map(|c| {
                let variants = c.resolved_variants();
                serde_json::json!({
                    "tag": c.tag_name,
                    "componentClass": c.component_class,
                    "componentPath": c.component_path,
                    "variants": {
                        "size": variants.size,
                        "style": variants.style,
                        "shape": variants.shape,
                        "display": variants.display,
                    },
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&components)?);
        return Ok(());
    }

    let root = config.project_root().unwrap_or(&manifest_path);
    let width = manifest
        .components()
        .iter()
        .map(|c| c.tag_name.len())
        .max()
        .unwrap_or(0);

    for component in manifest.components() {
        let module = component
            .component_path
            .strip_prefix(root)
            .unwrap_or(&component.component_path);
        println!(
            "{:width$}  {}  {}  {}",
            component.tag_name,
            component.component_class,
            module.display(),
            component.resolved_variants(),
            width = width
        );
    }
    println!("\n{} component(s)", manifest.len());

    Ok(())
}

//! One bundle build: resolve, check the cache, bundle, post-process

use crate::builder::Builder;
use crate::bundler::WarningSink;
use crate::cache::CachedBundleOutput;
use crate::context::BuildPass;
use crate::diagnostic::{codes, Diagnostic, WarningDeduplicator};
use crate::entry::{generate_entry, ENTRY_KEY};
use crate::error::BuildResult;
use crate::module_resolver::ModuleResolutionBridge;
use crate::naming::{output_name, BUNDLE_ID_PLACEHOLDER};
use crate::resolver::resolve_components;
use kiln_config::BundleDeclaration;
use std::path::PathBuf;
use tracing::{debug, warn};

/// How a task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TaskStatus {
    /// Bundled in this pass; the builder queues the content
    Built {
        output_name: String,
        path: PathBuf,
        content: String,
    },
    /// Previous output reused
    Reused { output_name: String },
    /// Resolution or bundling failed; no output
    Failed,
}

#[derive(Debug)]
pub(crate) struct TaskOutcome {
    pub identifier: String,
    pub status: TaskStatus,
}

/// Forwards bundler warnings as diagnostics, once per message
struct TaskWarnings {
    label: String,
    dedup: WarningDeduplicator,
    diagnostics: Vec<Diagnostic>,
}

impl WarningSink for TaskWarnings {
    fn warn(&mut self, message: String) {
        if self.dedup.observe(&message) {
            self.diagnostics.push(
                Diagnostic::warning_with_code(codes::BUNDLER_WARNING, message)
                    .with_bundle(self.label.clone()),
            );
        }
    }
}

pub(crate) struct BundleTask<'a> {
    pub builder: &'a Builder,
    pub pass: &'a BuildPass,
    pub identifier: &'a str,
    pub declaration: &'a BundleDeclaration,
}

impl BundleTask<'_> {
    /// Run the task
    ///
    /// Recoverable problems end up in the returned diagnostics; only
    /// failures of shared state are returned as errors.
    pub fn run(&self) -> BuildResult<(TaskOutcome, Vec<Diagnostic>)> {
        let label = self.declaration.label();
        let mut diagnostics = Vec::new();

        let resolution = resolve_components(self.declaration.tags(), self.builder.manifest());
        diagnostics.extend(
            resolution
                .diagnostics
                .into_iter()
                .map(|d| d.with_bundle(label.clone())),
        );

        if resolution.components.is_empty() {
            return Ok((self.outcome(TaskStatus::Failed), diagnostics));
        }

        let decision = self.builder.cache().decide(
            self.identifier,
            self.pass.is_change_build,
            &self.pass.change_set,
            &resolution.components,
        )?;

        if decision.is_skip() {
            if let Some(cached) = self.builder.cache().get(self.identifier)? {
                debug!(bundle = %label, output = %cached.output_name, "reusing cached bundle");
                let status = TaskStatus::Reused {
                    output_name: cached.output_name,
                };
                return Ok((self.outcome(status), diagnostics));
            }
        }

        let entry = generate_entry(&resolution.components);
        let bridge = ModuleResolutionBridge::new(
            self.builder.registry(),
            self.builder.source(),
            &entry,
        );
        let mut warnings = TaskWarnings {
            label: label.clone(),
            dedup: WarningDeduplicator::new(),
            diagnostics: Vec::new(),
        };

        let bundled = self.builder.bundler().bundle(ENTRY_KEY, &bridge, &mut warnings);
        let bundled = match bundled {
            Ok(bundled) => bundled,
            Err(e) => {
                warn!(bundle = %label, error = %e, "bundling failed");
                diagnostics.extend(warnings.diagnostics);
                diagnostics.push(
                    Diagnostic::error_with_code(
                        codes::BUNDLER_FAILURE,
                        format!("Failed to bundle [{}]: {}", label, e),
                    )
                    .with_bundle(label.clone()),
                );
                return Ok((self.outcome(TaskStatus::Failed), diagnostics));
            }
        };

        for message in bundled.warnings {
            warnings.warn(message);
        }
        diagnostics.extend(warnings.diagnostics);

        let mut content = wrap_bundle(&bundled.code);

        if self.builder.config().minify {
            let minified = self.builder.minifier().minify(&content);
            for message in minified.diagnostics {
                warn!(bundle = %label, "minifier: {}", message);
                diagnostics.push(
                    Diagnostic::error_with_code(codes::MINIFY_FAILURE, message)
                        .with_bundle(label.clone()),
                );
            }
            if let Some(output) = minified.output {
                content = output;
            }
        }

        let name = output_name(
            self.builder.hasher(),
            &content,
            self.declaration,
            &self.builder.config().naming_options(),
        );
        let content = content.replace(BUNDLE_ID_PLACEHOLDER, &name);

        self.builder.cache().put(CachedBundleOutput {
            identifier: self.identifier.to_string(),
            content: content.clone(),
            output_name: name.clone(),
            produced_fresh: true,
        })?;

        let path = self.builder.config().bundle_path(&name);
        self.pass.record_bundle();

        debug!(bundle = %label, ?decision, path = %path.display(), "bundle built");
        let status = TaskStatus::Built {
            output_name: name,
            path,
            content,
        };
        Ok((self.outcome(status), diagnostics))
    }

    fn outcome(&self, status: TaskStatus) -> TaskOutcome {
        TaskOutcome {
            identifier: self.identifier.to_string(),
            status,
        }
    }
}

/// Wrap bundled code into the injectable component function
pub(crate) fn wrap_bundle(code: &str) -> String {
    let mut wrapped = String::with_capacity(code.len() + 64);
    wrapped.push_str("function importComponent(exports, h, t, Ionic) {\n");
    wrapped.push_str(code);
    if !code.ends_with('\n') {
        wrapped.push('\n');
    }
    wrapped.push_str("}\n");
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_bundle() {
        assert_eq!(
            wrap_bundle("var a = 1;"),
            "function importComponent(exports, h, t, Ionic) {\nvar a = 1;\n}\n"
        );
    }

    #[test]
    fn test_task_warnings_deduplicate() {
        let mut warnings = TaskWarnings {
            label: "x-a".to_string(),
            dedup: WarningDeduplicator::new(),
            diagnostics: Vec::new(),
        };
        warnings.warn("same".to_string());
        warnings.warn("same".to_string());
        warnings.warn("other".to_string());
        assert_eq!(warnings.diagnostics.len(), 2);
        assert_eq!(warnings.diagnostics[0].bundle.as_deref(), Some("x-a"));
    }
}

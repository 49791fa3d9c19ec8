//! Build orchestration: one parallel task per declared bundle
use crate::bundler::{LineMinifier, Minifier, ModuleBundler, ModuleLinker};
use crate::cache::IncrementalCache;
use crate::context::BuildPass;
use crate::diagnostic::{codes, sort_diagnostics, Diagnostic, DiagnosticsSink};
use crate::error::{BuildError, BuildResult};
use crate::module_resolver::{DiskSource, ModuleRegistry, SourceProvider};
use crate::naming::{bundle_identifier, ContentHasher, NamingOptions, Sha256Hasher};
use crate::task::{BundleTask, TaskOutcome, TaskStatus};

use kiln_config::{BundleDeclaration, ComponentManifest, Config};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Build configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Project namespace; its lowercase form names the output directory
    pub namespace: String,
    /// Root of the build output
    pub build_dir: PathBuf,
    /// Name outputs by content hash
    pub hash_file_names: bool,
    /// Length of hashed output names
    pub hashed_file_name_length: usize,
    /// Maximum length of tag-derived output names
    pub max_file_name_length: usize,
    /// Run the minifier over every bundle
    pub minify: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let naming = NamingOptions::default();
        Self {
            namespace: "App".to_string(),
            build_dir: PathBuf::from(kiln_config::project::DEFAULT_BUILD_DIR),
            hash_file_names: naming.hash_file_names,
            hashed_file_name_length: naming.hashed_length,
            max_file_name_length: naming.max_length,
            minify: false,
        }
    }
}

impl BuildConfig {
    /// Build configuration of a loaded project
    pub fn from_project(config: &Config) -> Self {
        Self {
            namespace: config.namespace().to_string(),
            build_dir: config.build_dir(),
            hash_file_names: config.project.hash_file_names(),
            hashed_file_name_length: config.project.hashed_file_name_length(),
            max_file_name_length: config.project.max_file_name_length(),
            minify: config.project.minify(),
        }
    }

    pub fn naming_options(&self) -> NamingOptions {
        NamingOptions {
            hash_file_names: self.hash_file_names,
            hashed_length: self.hashed_file_name_length,
            max_length: self.max_file_name_length,
        }
    }

    /// Directory receiving the bundles: `<build_dir>/<namespace lower>`
    pub fn bundle_dir(&self) -> PathBuf {
        self.build_dir.join(self.namespace.to_lowercase())
    }

    /// Output path of a bundle
    pub fn bundle_path(&self, output_name: &str) -> PathBuf {
        self.bundle_dir().join(format!("{}.js", output_name))
    }
}

/// Statistics of one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Distinct bundles in the pass
    pub total: usize,
    /// Bundles produced in this pass
    pub rebuilt: usize,
    /// Bundles whose previous output was reused
    pub reused: usize,
    /// Bundles that produced no output
    pub failed: usize,
    /// Files queued for writing
    pub written: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Result of a pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Bundle identifier to output name, for every bundle with output
    pub bundles: BTreeMap<String, String>,
    /// Errors first, then warnings
    pub diagnostics: Vec<Diagnostic>,
    pub stats: BuildStats,
}

impl BuildReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }
}

/// Main builder for bundle passes
///
/// Owns the incremental cache and module registry, so one builder serves a
/// whole watch session.
pub struct Builder {
    config: BuildConfig,
    manifest: ComponentManifest,
    bundles: Vec<BundleDeclaration>,
    cache: IncrementalCache,
    registry: ModuleRegistry,
    hasher: Box<dyn ContentHasher>,
    minifier: Box<dyn Minifier>,
    bundler: Box<dyn ModuleBundler>,
    source: Box<dyn SourceProvider>,
}

impl Builder {
    /// Create a builder with the default collaborators
    pub fn new(
        config: BuildConfig,
        manifest: ComponentManifest,
        bundles: Vec<BundleDeclaration>,
    ) -> Self {
        Self {
            config,
            manifest,
            bundles,
            cache: IncrementalCache::new(),
            registry: ModuleRegistry::new(),
            hasher: Box::new(Sha256Hasher),
            minifier: Box::new(LineMinifier),
            bundler: Box::new(ModuleLinker::new()),
            source: Box::new(DiskSource),
        }
    }

    /// Create a builder for a loaded project
    ///
    /// Loads the component manifest and preloads the compiled modules of
    /// the source directory into the registry.
    pub fn from_project(config: &Config) -> BuildResult<Self> {
        let manifest_path = config.manifest_path();
        let manifest = ComponentManifest::load_from_file(&manifest_path)
            .map_err(|e| BuildError::manifest_read(&manifest_path, e))?;
        let builder = Self::new(
            BuildConfig::from_project(config),
            manifest,
            config.bundles().to_vec(),
        );

        let source_dir = config.source_dir();
        if source_dir.is_dir() {
            builder.registry.preload_dir(&source_dir)?;
        } else {
            debug!(dir = %source_dir.display(), "source directory missing, skipping preload");
        }

        Ok(builder)
    }

    pub fn with_hasher(mut self, hasher: impl ContentHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn with_minifier(mut self, minifier: impl Minifier + 'static) -> Self {
        self.minifier = Box::new(minifier);
        self
    }

    pub fn with_bundler(mut self, bundler: impl ModuleBundler + 'static) -> Self {
        self.bundler = Box::new(bundler);
        self
    }

    pub fn with_source(mut self, source: impl SourceProvider + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Continue with the cache of a previous builder
    pub fn with_cache(mut self, cache: IncrementalCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn manifest(&self) -> &ComponentManifest {
        &self.manifest
    }

    pub fn bundles(&self) -> &[BundleDeclaration] {
        &self.bundles
    }

    pub fn cache(&self) -> &IncrementalCache {
        &self.cache
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Give up the builder, keeping its cache for the next one
    pub fn into_cache(self) -> IncrementalCache {
        self.cache
    }

    pub(crate) fn hasher(&self) -> &dyn ContentHasher {
        self.hasher.as_ref()
    }

    pub(crate) fn minifier(&self) -> &dyn Minifier {
        self.minifier.as_ref()
    }

    pub(crate) fn bundler(&self) -> &dyn ModuleBundler {
        self.bundler.as_ref()
    }

    pub(crate) fn source(&self) -> &dyn SourceProvider {
        self.source.as_ref()
    }

    /// Run one pass over every declared bundle
    ///
    /// Bundles build in parallel. Resolution, bundling and minification
    /// problems are reported as diagnostics; the pass fails only when a
    /// task panics or shared state becomes unusable.
    pub fn build(&self, pass: &BuildPass) -> BuildResult<BuildReport> {
        let start = Instant::now();
        let sink = DiagnosticsSink::new();

        let unique = self.unique_bundles(&sink)?;

        let results: Vec<BuildResult<TaskOutcome>> = unique
            .par_iter()
            .map(|(identifier, declaration)| {
                let task = BundleTask {
                    builder: self,
                    pass,
                    identifier,
                    declaration,
                };
                let (outcome, diagnostics) = panic::catch_unwind(AssertUnwindSafe(|| task.run()))
                    .map_err(|payload| BuildError::task_panicked(declaration.label(), &*payload))??;
                sink.extend(diagnostics)?;
                Ok(outcome)
            })
            .collect();
        let outcomes = results.into_iter().collect::<BuildResult<Vec<_>>>()?;

        let mut report = BuildReport {
            stats: BuildStats {
                total: unique.len(),
                ..BuildStats::default()
            },
            ..BuildReport::default()
        };

        // Outcomes follow declaration order, so the first bundle to claim an
        // output name owns the file when truncated names collide
        let mut claimed = HashSet::new();
        for outcome in outcomes {
            match outcome.status {
                TaskStatus::Built {
                    output_name,
                    path,
                    content,
                } => {
                    report.stats.rebuilt += 1;
                    if claimed.insert(output_name.clone()) {
                        pass.write_queue().queue(path, content)?;
                    } else {
                        debug!(bundle = %outcome.identifier, "output file already claimed");
                    }
                    report.bundles.insert(outcome.identifier, output_name);
                }
                TaskStatus::Reused { output_name } => {
                    report.stats.reused += 1;
                    claimed.insert(output_name.clone());
                    report.bundles.insert(outcome.identifier, output_name);
                }
                TaskStatus::Failed => report.stats.failed += 1,
            }
        }

        sink.extend(self.collisions(&unique, &report.bundles))?;

        report.diagnostics = sink.into_inner()?;
        sort_diagnostics(&mut report.diagnostics);
        report.stats.written = pass.write_queue().len()?;
        report.stats.elapsed = start.elapsed();

        info!(
            bundles = report.stats.total,
            rebuilt = report.stats.rebuilt,
            reused = report.stats.reused,
            failed = report.stats.failed,
            errors = report.error_count(),
            warnings = report.warning_count(),
            elapsed_ms = report.stats.elapsed.as_millis() as u64,
            "build pass finished"
        );

        Ok(report)
    }

    /// Declared bundles keyed by identifier, first declaration wins
    fn unique_bundles(
        &self,
        sink: &DiagnosticsSink,
    ) -> BuildResult<Vec<(String, &BundleDeclaration)>> {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(self.bundles.len());

        for declaration in &self.bundles {
            let identifier = bundle_identifier(self.hasher(), declaration);
            if seen.insert(identifier.clone()) {
                unique.push((identifier, declaration));
            } else {
                let label = declaration.label();
                sink.push(
                    Diagnostic::warning_with_code(
                        codes::DUPLICATE_BUNDLE,
                        format!("Bundle [{}] is declared more than once", label),
                    )
                    .with_bundle(label)
                    .with_note("the duplicate declaration is built once"),
                )?;
            }
        }

        Ok(unique)
    }

    /// Warnings for distinct bundles sharing an output file
    fn collisions(
        &self,
        unique: &[(String, &BundleDeclaration)],
        outputs: &BTreeMap<String, String>,
    ) -> Vec<Diagnostic> {
        let mut by_name: BTreeMap<&str, Vec<&BundleDeclaration>> = BTreeMap::new();
        for (identifier, declaration) in unique {
            if let Some(name) = outputs.get(identifier) {
                by_name.entry(name.as_str()).or_default().push(declaration);
            }
        }

        by_name
            .into_iter()
            .filter(|(_, declarations)| declarations.len() > 1)
            .map(|(name, declarations)| {
                let labels: Vec<String> = declarations
                    .iter()
                    .map(|d| format!("[{}]", d.label()))
                    .collect();
                let path = self.config.bundle_path(name);
                Diagnostic::warning_with_code(
                    codes::OUTPUT_NAME_COLLISION,
                    format!(
                        "Bundles {} share the output file {}",
                        labels.join(" and "),
                        path.display()
                    ),
                )
                .with_note("raise max_file_name_length or enable hash_file_names")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{BundledCode, BundlerError, WarningSink};
    use crate::cache::ChangeSet;
    use crate::module_resolver::ModuleHost;
    use kiln_config::ComponentMetadata;

    /// Returns the entry text as the bundle
    struct EchoBundler;

    impl ModuleBundler for EchoBundler {
        fn bundle(
            &self,
            entry_id: &str,
            host: &dyn ModuleHost,
            _warnings: &mut dyn WarningSink,
        ) -> Result<BundledCode, BundlerError> {
            let code = host.load(entry_id)?.unwrap_or_default();
            Ok(BundledCode {
                code,
                warnings: Vec::new(),
            })
        }
    }

    fn builder(bundles: Vec<BundleDeclaration>) -> Builder {
        let manifest = ComponentManifest::new(vec![
            ComponentMetadata::new("x-a", "A", "/dist/a.js"),
            ComponentMetadata::new("x-b", "B", "/dist/b.js"),
        ]);
        Builder::new(BuildConfig::default(), manifest, bundles).with_bundler(EchoBundler)
    }

    #[test]
    fn test_bundle_path() {
        let config = BuildConfig {
            namespace: "MyApp".to_string(),
            build_dir: PathBuf::from("/www/build"),
            ..BuildConfig::default()
        };
        assert_eq!(
            config.bundle_path("abc"),
            PathBuf::from("/www/build/myapp/abc.js")
        );
    }

    #[test]
    fn test_duplicate_declarations_build_once() {
        let builder = builder(vec![
            BundleDeclaration::new(["x-a", "x-b"]),
            BundleDeclaration::new(["x-b", "X-A"]),
        ]);
        let pass = BuildPass::full();
        let report = builder.build(&pass).unwrap();

        assert_eq!(report.stats.total, 1);
        assert_eq!(report.bundles.len(), 1);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(report.diagnostics[0].code, codes::DUPLICATE_BUNDLE);
        assert_eq!(pass.module_bundle_count(), 1);
    }

    #[test]
    fn test_unhashed_collision_warns() {
        let mut builder = builder(vec![
            BundleDeclaration::new(["x-a"]),
            BundleDeclaration::new(["x-a", "x-b"]),
        ]);
        builder.config.hash_file_names = false;
        builder.config.max_file_name_length = 3;

        let pass = BuildPass::full();
        let report = builder.build(&pass).unwrap();
        assert_eq!(report.bundles.len(), 2);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.code == codes::OUTPUT_NAME_COLLISION));
        assert_eq!(report.stats.written, 1);
    }

    #[test]
    fn test_collision_keeps_first_declared_content() {
        for _ in 0..16 {
            let mut builder = builder(vec![
                BundleDeclaration::new(["x-b"]),
                BundleDeclaration::new(["x-a", "x-b"]),
            ]);
            builder.config.hash_file_names = false;
            builder.config.max_file_name_length = 1;

            let pass = BuildPass::full();
            builder.build(&pass).unwrap();

            let paths = pass.write_queue().paths().unwrap();
            assert_eq!(paths.len(), 1);
            let content = pass.write_queue().get(&paths[0]).unwrap().unwrap();
            assert!(content.contains("exports[\"X-B\"]"), "{}", content);
            assert!(!content.contains("exports[\"X-A\"]"), "{}", content);
        }
    }

    #[test]
    fn test_incremental_pass_reuses_cache() {
        let builder = builder(vec![BundleDeclaration::new(["x-a"])]);
        let first = builder.build(&BuildPass::full()).unwrap();

        let pass = BuildPass::incremental(ChangeSet::new());
        let second = builder.build(&pass).unwrap();

        assert_eq!(second.stats.reused, 1);
        assert_eq!(second.stats.written, 0);
        assert_eq!(first.bundles, second.bundles);
    }

    #[test]
    fn test_report_serializes_elapsed_millis() {
        let report = BuildReport {
            stats: BuildStats {
                elapsed: Duration::from_millis(12),
                ..BuildStats::default()
            },
            ..BuildReport::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["elapsed_ms"], 12);
    }
}

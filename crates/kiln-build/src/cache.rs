//! Incremental bundle cache
//!
//! Keeps the last output of every bundle for the lifetime of a build or
//! watch session and decides, per pass, whether that output can be reused.
//! Staleness is never judged by timestamps, only by the change set of the
//! pass.

use crate::error::{BuildError, BuildResult};
use kiln_config::ComponentMetadata;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Files changed since the previous pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Changed file paths
    pub changed_file_paths: BTreeSet<PathBuf>,
    /// Some changed file is a component module
    pub has_component_module_changes: bool,
    /// Some changed file is a module that is not a component
    pub has_non_component_module_changes: bool,
}

impl ChangeSet {
    /// An empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed component module
    pub fn with_component_change(mut self, path: impl Into<PathBuf>) -> Self {
        self.changed_file_paths.insert(path.into());
        self.has_component_module_changes = true;
        self
    }

    /// Record a changed non-component module
    pub fn with_non_component_change(mut self, path: impl Into<PathBuf>) -> Self {
        self.changed_file_paths.insert(path.into());
        self.has_non_component_module_changes = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changed_file_paths.is_empty()
            && !self.has_component_module_changes
            && !self.has_non_component_module_changes
    }

    /// Stems of the changed files (`foo` for `src/foo.tsx`)
    pub fn changed_stems(&self) -> BTreeSet<&str> {
        self.changed_file_paths
            .iter()
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()))
            .collect()
    }

    /// Whether any changed file shares its stem with one of the components
    pub fn correlates_with(&self, components: &[&ComponentMetadata]) -> bool {
        let stems = self.changed_stems();
        components
            .iter()
            .filter_map(|component| component.module_stem())
            .any(|stem| stems.contains(stem))
    }
}

/// Last output produced for a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBundleOutput {
    /// Bundle identifier
    pub identifier: String,
    /// Final bundle text
    pub content: String,
    /// Output file name (without extension)
    pub output_name: String,
    /// Produced by the current pass rather than reused
    pub produced_fresh: bool,
}

/// Why a bundle has to be rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    /// Not an incremental pass
    FullBuild,
    /// No previous output
    NotCached,
    /// A non-component module changed
    NonComponentChange,
    /// A changed file correlates with one of the bundle's components
    ComponentChange,
}

/// Cache decision for one bundle in one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Nothing changed at all
    FastSkip,
    /// Only component modules changed, none of them in this bundle
    CorrelatedSkip,
    Rebuild(RebuildReason),
}

impl CacheDecision {
    pub fn is_skip(&self) -> bool {
        !matches!(self, CacheDecision::Rebuild(_))
    }
}

/// Session-lifetime map from bundle identifier to last output
#[derive(Debug, Default)]
pub struct IncrementalCache {
    entries: RwLock<HashMap<String, CachedBundleOutput>>,
}

impl IncrementalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identifier: &str) -> BuildResult<Option<CachedBundleOutput>> {
        Ok(self.read()?.get(identifier).cloned())
    }

    /// Store (or overwrite) the output of a bundle
    pub fn put(&self, output: CachedBundleOutput) -> BuildResult<()> {
        self.write()?.insert(output.identifier.clone(), output);
        Ok(())
    }

    pub fn contains(&self, identifier: &str) -> BuildResult<bool> {
        Ok(self.read()?.contains_key(identifier))
    }

    pub fn len(&self) -> BuildResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> BuildResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Decide whether the bundle's previous output is still valid
    pub fn decide(
        &self,
        identifier: &str,
        is_change_build: bool,
        change_set: &ChangeSet,
        components: &[&ComponentMetadata],
    ) -> BuildResult<CacheDecision> {
        let decision = evaluate(
            is_change_build,
            change_set,
            components,
            self.contains(identifier)?,
        );
        debug!(bundle = identifier, ?decision, "cache decision");
        Ok(decision)
    }

    fn read(&self) -> BuildResult<RwLockReadGuard<'_, HashMap<String, CachedBundleOutput>>> {
        self.entries
            .read()
            .map_err(|_| BuildError::LockPoisoned("incremental cache"))
    }

    fn write(&self) -> BuildResult<RwLockWriteGuard<'_, HashMap<String, CachedBundleOutput>>> {
        self.entries
            .write()
            .map_err(|_| BuildError::LockPoisoned("incremental cache"))
    }
}

/// Freshness rules, independent of storage
fn evaluate(
    is_change_build: bool,
    change_set: &ChangeSet,
    components: &[&ComponentMetadata],
    cached: bool,
) -> CacheDecision {
    if !is_change_build {
        return CacheDecision::Rebuild(RebuildReason::FullBuild);
    }
    if change_set.has_non_component_module_changes {
        return CacheDecision::Rebuild(RebuildReason::NonComponentChange);
    }
    if change_set.has_component_module_changes && change_set.correlates_with(components) {
        return CacheDecision::Rebuild(RebuildReason::ComponentChange);
    }
    if !cached {
        return CacheDecision::Rebuild(RebuildReason::NotCached);
    }

    if change_set.has_component_module_changes {
        CacheDecision::CorrelatedSkip
    } else {
        CacheDecision::FastSkip
    }
}

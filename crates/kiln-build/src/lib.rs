//! Kiln bundling engine
//!
//! Turns user-declared groups of components into self-contained JavaScript
//! modules:
//! - Component resolution against the manifest
//! - Virtual entry generation in canonical order
//! - Module resolution bridge over the in-memory transpiled module cache
//! - Incremental reuse of previous bundle output across watch passes
//! - Parallel bundle tasks with merged diagnostics
//! - Deterministic bundle identifiers and output file names

pub mod builder;
pub mod bundler;
pub mod cache;
pub mod context;
pub mod diagnostic;
pub mod entry;
pub mod error;
pub mod module_resolver;
pub mod naming;
pub mod resolver;
mod task;

// Re-export main types
pub use builder::{BuildConfig, BuildReport, BuildStats, Builder};
pub use bundler::{
    BundledCode, BundlerError, LineMinifier, Minifier, MinifyOutput, ModuleBundler, ModuleLinker,
    WarningSink,
};
pub use cache::{CacheDecision, CachedBundleOutput, ChangeSet, IncrementalCache, RebuildReason};
pub use context::{BuildPass, WriteQueue};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticsSink, WarningDeduplicator};
pub use entry::{generate_entry, ENTRY_KEY};
pub use error::{BuildError, BuildResult};
pub use module_resolver::{
    DiskSource, ModuleHost, ModuleRegistry, ModuleResolutionBridge, SourceProvider,
};
pub use naming::{
    bundle_identifier, output_name, ContentHasher, NamingOptions, Sha256Hasher,
    BUNDLE_ID_PLACEHOLDER,
};
pub use resolver::{resolve_components, Resolution};

// Re-export kiln-config types for convenience
pub use kiln_config::{BundleDeclaration, ComponentManifest, ComponentMetadata};

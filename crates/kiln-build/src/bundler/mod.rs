//! Bundler and minifier collaborators
//!
//! The engine drives these through traits only. [`ModuleLinker`] and
//! [`LineMinifier`] are the implementations used by default.

mod linker;
mod minify;

pub use linker::ModuleLinker;
pub use minify::LineMinifier;

use crate::error::BuildError;
use crate::module_resolver::ModuleHost;
use thiserror::Error;

/// Receives warnings while a bundle is being combined
pub trait WarningSink {
    fn warn(&mut self, message: String);
}

impl WarningSink for Vec<String> {
    fn warn(&mut self, message: String) {
        self.push(message);
    }
}

/// Combined module text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundledCode {
    /// Bundled code, without the invocation wrapper
    pub code: String,
    /// Warnings not already sent to the sink
    pub warnings: Vec<String>,
}

/// Failure while combining modules
#[derive(Debug, Error)]
pub enum BundlerError {
    #[error("Could not load '{id}'")]
    MissingModule { id: String },

    #[error("Could not resolve '{importee}' from {importer}")]
    Unresolved { importee: String, importer: String },

    #[error("Syntax error in {module}: {message}")]
    Syntax { module: String, message: String },

    #[error(transparent)]
    Host(#[from] BuildError),

    #[error("{0}")]
    Failed(String),
}

/// Module-combining service
pub trait ModuleBundler: Send + Sync {
    /// Combine the module graph reachable from `entry_id` into one text
    ///
    /// All resolution and loading goes through `host`.
    fn bundle(
        &self,
        entry_id: &str,
        host: &dyn ModuleHost,
        warnings: &mut dyn WarningSink,
    ) -> Result<BundledCode, BundlerError>;
}

/// Minifier result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinifyOutput {
    /// Minified text; `None` keeps the input unchanged
    pub output: Option<String>,
    /// Problems reported by the minifier
    pub diagnostics: Vec<String>,
}

/// Source minifier
pub trait Minifier: Send + Sync {
    fn minify(&self, source: &str) -> MinifyOutput;
}

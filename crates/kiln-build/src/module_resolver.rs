//! Module resolution over the transpiled module cache
//!
//! The bundler never touches the filesystem directly. It asks a
//! [`ModuleHost`] to resolve and load modules; the
//! [`ModuleResolutionBridge`] answers from the in-memory [`ModuleRegistry`]
//! first and only reads from disk for modules it has not seen yet, recording
//! them so later bundles of the same session find them in memory.

use crate::entry::ENTRY_KEY;
use crate::error::{BuildError, BuildResult};
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use walkdir::WalkDir;

/// Extensions treated as compiled modules
const MODULE_EXTENSIONS: &[&str] = &["js", "mjs"];

/// Resolve/load capability handed to the bundler
pub trait ModuleHost {
    /// Resolve an import to a module id
    ///
    /// `None` defers to the bundler's own resolution.
    fn resolve_id(&self, importee: &str, importer: Option<&str>) -> Option<String>;

    /// Load the source of a module id
    ///
    /// `Ok(None)` defers to the bundler's own loading.
    fn load(&self, id: &str) -> BuildResult<Option<String>>;
}

/// Source of module text not yet in the registry
pub trait SourceProvider: Send + Sync {
    fn read_source(&self, path: &Path) -> io::Result<String>;
}

/// Reads modules from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSource;

impl SourceProvider for DiskSource {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// In-memory cache of transpiled module text, keyed by absolute path
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<PathBuf, String>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a module
    pub fn insert(&self, path: impl Into<PathBuf>, source: impl Into<String>) -> BuildResult<()> {
        self.write()?.insert(path.into(), source.into());
        Ok(())
    }

    pub fn get(&self, path: &Path) -> BuildResult<Option<String>> {
        Ok(self.read()?.get(path).cloned())
    }

    pub fn contains(&self, path: &Path) -> BuildResult<bool> {
        Ok(self.read()?.contains_key(path))
    }

    pub fn len(&self) -> usize {
        self.modules.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register every compiled module under `dir`
    pub fn preload_dir(&self, dir: &Path) -> BuildResult<usize> {
        let mut loaded = Vec::new();

        for entry in WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() || !is_module_file(entry.path()) {
                continue;
            }
            let path = entry.path();
            let source =
                std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
            loaded.push((normalize_path(path), source));
        }

        let count = loaded.len();
        self.write()?.extend(loaded);
        debug!(dir = %dir.display(), modules = count, "preloaded module registry");
        Ok(count)
    }

    /// Drop modules affected by changed files
    ///
    /// A module is dropped when its path equals a changed path, or when it
    /// sits in the same directory with the same stem (`badge.tsx` drops
    /// `badge.js`). Returns the number of dropped modules.
    pub fn invalidate<P: AsRef<Path>>(&self, changed: &[P]) -> BuildResult<usize> {
        let mut modules = self.write()?;
        let before = modules.len();

        modules.retain(|path, _| {
            !changed.iter().any(|changed| {
                let changed = changed.as_ref();
                path == changed
                    || (path.parent() == changed.parent()
                        && path.file_stem().is_some()
                        && path.file_stem() == changed.file_stem())
            })
        });

        Ok(before - modules.len())
    }

    fn read(&self) -> BuildResult<RwLockReadGuard<'_, HashMap<PathBuf, String>>> {
        self.modules
            .read()
            .map_err(|_| BuildError::LockPoisoned("module registry"))
    }

    fn write(&self) -> BuildResult<RwLockWriteGuard<'_, HashMap<PathBuf, String>>> {
        self.modules
            .write()
            .map_err(|_| BuildError::LockPoisoned("module registry"))
    }
}

/// Two-tier module host for one bundle invocation
///
/// Serves the synthetic entry, then the registry, then the source provider.
pub struct ModuleResolutionBridge<'a> {
    registry: &'a ModuleRegistry,
    source: &'a dyn SourceProvider,
    entry_text: &'a str,
}

impl<'a> ModuleResolutionBridge<'a> {
    pub fn new(
        registry: &'a ModuleRegistry,
        source: &'a dyn SourceProvider,
        entry_text: &'a str,
    ) -> Self {
        Self {
            registry,
            source,
            entry_text,
        }
    }
}

impl ModuleHost for ModuleResolutionBridge<'_> {
    fn resolve_id(&self, importee: &str, importer: Option<&str>) -> Option<String> {
        if importee == ENTRY_KEY {
            return Some(ENTRY_KEY.to_string());
        }

        let path = normalize_module_path(importee, importer);
        match self.registry.contains(&path) {
            Ok(true) => Some(path.to_string_lossy().into_owned()),
            _ => None,
        }
    }

    fn load(&self, id: &str) -> BuildResult<Option<String>> {
        if id == ENTRY_KEY {
            return Ok(Some(self.entry_text.to_string()));
        }

        let path = Path::new(id);
        if let Some(source) = self.registry.get(path)? {
            return Ok(Some(source));
        }

        debug!(module = %path.display(), "module not in registry, reading from disk");
        let source = self
            .source
            .read_source(path)
            .map_err(|e| BuildError::io(path, e))?;
        self.registry.insert(path, source.clone())?;
        Ok(Some(source))
    }
}

/// Resolve an import specifier against the importing module's directory
///
/// Appends `.js` when the specifier has no extension. The synthetic entry
/// has no directory, so its imports are taken as written.
pub fn normalize_module_path(importee: &str, importer: Option<&str>) -> PathBuf {
    let importee_path = Path::new(importee);

    let joined = if importee_path.is_absolute() {
        importee_path.to_path_buf()
    } else {
        match importer
            .filter(|importer| *importer != ENTRY_KEY)
            .and_then(|importer| Path::new(importer).parent())
        {
            Some(dir) => dir.join(importee_path),
            None => importee_path.to_path_buf(),
        }
    };

    let mut normalized = normalize_path(&joined);
    if normalized.extension().is_none() {
        normalized.set_extension("js");
    }
    normalized
}

/// Lexically remove `.` and `..` components
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn is_module_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MODULE_EXTENSIONS.contains(&ext))
}

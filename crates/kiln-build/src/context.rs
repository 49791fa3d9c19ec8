//! Per-pass build context

use crate::cache::ChangeSet;
use crate::error::{BuildError, BuildResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Files queued for writing, keyed by output path
#[derive(Debug, Default)]
pub struct WriteQueue {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a file, returning the content previously queued for the path
    pub fn queue(&self, path: impl Into<PathBuf>, content: String) -> BuildResult<Option<String>> {
        Ok(self.lock()?.insert(path.into(), content))
    }

    pub fn get(&self, path: &Path) -> BuildResult<Option<String>> {
        Ok(self.lock()?.get(path).cloned())
    }

    /// Queued paths, sorted
    pub fn paths(&self) -> BuildResult<Vec<PathBuf>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    pub fn len(&self) -> BuildResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> BuildResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Write every queued file, creating directories as needed
    ///
    /// The queue is empty afterwards. Returns the number of files written.
    pub fn flush(&self) -> BuildResult<usize> {
        let files = std::mem::take(&mut *self.lock()?);

        for (path, content) in &files {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
            }
            fs::write(path, content).map_err(|e| BuildError::io(path, e))?;
        }

        Ok(files.len())
    }

    fn lock(&self) -> BuildResult<MutexGuard<'_, BTreeMap<PathBuf, String>>> {
        self.files
            .lock()
            .map_err(|_| BuildError::LockPoisoned("write queue"))
    }
}

/// State of one build pass
///
/// Created by the caller for every pass; the builder records queued files
/// and the number of bundles produced.
#[derive(Debug, Default)]
pub struct BuildPass {
    /// Incremental pass (watch rebuild) rather than a full build
    pub is_change_build: bool,
    /// Changes since the previous pass
    pub change_set: ChangeSet,
    module_bundle_count: AtomicUsize,
    write_queue: WriteQueue,
}

impl BuildPass {
    /// A full, non-incremental pass
    pub fn full() -> Self {
        Self::default()
    }

    /// An incremental pass over the given changes
    pub fn incremental(change_set: ChangeSet) -> Self {
        Self {
            is_change_build: true,
            change_set,
            ..Default::default()
        }
    }

    /// Bundles produced (not reused) in this pass
    pub fn module_bundle_count(&self) -> usize {
        self.module_bundle_count.load(Ordering::SeqCst)
    }

    pub(crate) fn record_bundle(&self) {
        self.module_bundle_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn write_queue(&self) -> &WriteQueue {
        &self.write_queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_reports_replaced_content() {
        let queue = WriteQueue::new();
        assert_eq!(queue.queue("/out/a.js", "one".to_string()).unwrap(), None);
        assert_eq!(
            queue.queue("/out/a.js", "two".to_string()).unwrap(),
            Some("one".to_string())
        );
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn test_flush_writes_and_empties() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build/app/bundle.js");

        let queue = WriteQueue::new();
        queue.queue(&path, "content".to_string()).unwrap();
        assert_eq!(queue.flush().unwrap(), 1);

        assert_eq!(fs::read_to_string(&path).unwrap(), "content");
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn test_poisoned_queue_reports_error() {
        let queue = WriteQueue::new();
        queue.queue("/out/a.js", "one".to_string()).unwrap();

        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = queue.files.lock().unwrap();
                panic!("poison the write queue");
            })
            .join()
        });

        assert!(matches!(queue.len(), Err(BuildError::LockPoisoned("write queue"))));
        assert!(matches!(queue.is_empty(), Err(BuildError::LockPoisoned(_))));
    }

    #[test]
    fn test_pass_constructors() {
        assert!(!BuildPass::full().is_change_build);
        let pass = BuildPass::incremental(ChangeSet::new());
        assert!(pass.is_change_build);
        pass.record_bundle();
        assert_eq!(pass.module_bundle_count(), 1);
    }
}

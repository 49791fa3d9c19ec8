/// Build engine error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to load component manifest at {path}: {error}")]
    ManifestReadError { path: PathBuf, error: String },

    #[error("Bundle task for [{bundle}] panicked: {message}")]
    TaskPanicked { bundle: String, message: String },

    #[error("Shared build state is poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl BuildError {
    /// Create a manifest read error
    pub fn manifest_read(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::ManifestReadError {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a task panic error from a caught panic payload
    pub fn task_panicked(bundle: impl Into<String>, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());

        Self::TaskPanicked {
            bundle: bundle.into(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_panicked_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        let err = BuildError::task_panicked("x-a, x-b", payload.as_ref());
        assert_eq!(err.to_string(), "Bundle task for [x-a, x-b] panicked: boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        let err = BuildError::task_panicked("x-a", payload.as_ref());
        assert!(err.to_string().ends_with("owned"));
    }

    #[test]
    fn test_io_error_keeps_path() {
        let err = BuildError::io(
            "/tmp/out.js",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/out.js"));
    }

    #[test]
    fn test_manifest_read_message() {
        let err = BuildError::manifest_read("/app/components.json", "missing field `tag`");
        assert_eq!(
            err.to_string(),
            "Failed to load component manifest at /app/components.json: missing field `tag`"
        );
    }
}

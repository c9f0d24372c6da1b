//! Generalized path error types.

use std::io;
use thiserror::Error;

/// Generalized path error type.
#[derive(Debug, Error)]
pub enum PathError {
    /// No registered backend supports the path.
    #[error("no backend supports the path: {0:?}")]
    UnsupportedPath(String),

    /// The value cannot be presented as a path string.
    #[error("not a usable path value: {0}")]
    InvalidPathType(String),

    /// The object key cannot be addressed exactly as written.
    #[error("invalid object key: {0}")]
    InvalidObjectKey(String),

    /// A backend's client library was not compiled in.
    #[error("missing optional dependency {dependency} (hint: {hint})")]
    MissingDependency {
        /// What is missing.
        dependency: &'static str,
        /// How to get it.
        hint: &'static str,
    },

    /// Malformed mode string, or a mode that does not allow the operation.
    #[error("invalid mode: {0}")]
    InvalidMode(String),

    /// A valid mode this backend cannot stream.
    #[error("mode {mode:?} is not supported by the {backend} backend")]
    UnsupportedMode {
        /// The requested mode.
        mode: String,
        /// The backend name.
        backend: &'static str,
    },

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Object store error.
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
}

impl PathError {
    /// Create an UnsupportedPath error.
    pub fn unsupported_path(path: impl Into<String>) -> Self {
        Self::UnsupportedPath(path.into())
    }

    /// Create an InvalidMode error.
    pub fn invalid_mode(msg: impl Into<String>) -> Self {
        Self::InvalidMode(msg.into())
    }

    /// Create an UnsupportedMode error.
    pub fn unsupported_mode(mode: impl Into<String>, backend: &'static str) -> Self {
        Self::UnsupportedMode {
            mode: mode.into(),
            backend,
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True if this error means the target does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            PathError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            PathError::ObjectStore(object_store::Error::NotFound { .. }) => true,
            _ => false,
        }
    }
}

/// Convert PathError to std::io::Error for compatibility.
impl From<PathError> for io::Error {
    fn from(e: PathError) -> Self {
        match e {
            PathError::UnsupportedPath(path) => io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no backend supports the path: {path:?}"),
            ),
            PathError::InvalidPathType(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            PathError::InvalidObjectKey(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            e @ PathError::MissingDependency { .. } => io::Error::new(io::ErrorKind::Unsupported, e.to_string()),
            PathError::InvalidMode(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            e @ PathError::UnsupportedMode { .. } => {
                io::Error::new(io::ErrorKind::Unsupported, e.to_string())
            }
            PathError::Config(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
            PathError::Io(e) => e,
            PathError::ObjectStore(object_store::Error::NotFound { path, .. }) => {
                io::Error::new(io::ErrorKind::NotFound, path)
            }
            PathError::ObjectStore(e) => io::Error::other(e),
        }
    }
}

/// Generalized path result type.
pub type PathResult<T> = Result<T, PathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let io_err = PathError::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(io_err.is_not_found());

        let store_err = PathError::from(object_store::Error::NotFound {
            path: "bucket/key".into(),
            source: "missing".into(),
        });
        assert!(store_err.is_not_found());

        assert!(!PathError::unsupported_path("http://x").is_not_found());
    }

    #[test]
    fn test_into_io_error_kinds() {
        let e: io::Error = PathError::unsupported_path("").into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidInput);

        let e: io::Error = PathError::MissingDependency {
            dependency: "object_store/gcp",
            hint: "rebuild with --features gcs",
        }
        .into();
        assert_eq!(e.kind(), io::ErrorKind::Unsupported);
        assert!(e.to_string().contains("--features gcs"));
    }
}

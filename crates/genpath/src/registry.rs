//! Backend registry with first-match dispatch.
//!
//! Backends are consulted in registration order and the first one whose
//! [`Backend::supports`] predicate accepts the path string wins. Register
//! the most specific backends first.

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::backends::{GcsBackend, LocalBackend};
use crate::config::Config;
use crate::error::{PathError, PathResult};
use crate::handle::{GenPath, PathInput};
use crate::ops::Backend;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// An append-only, ordered list of backends.
pub struct Registry {
    backends: RwLock<Vec<Arc<dyn Backend>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("backends", &self.backends())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(Vec::new()),
        }
    }

    /// Create a registry with the built-in backends: remote first, then local.
    pub fn with_defaults(config: &Config) -> Self {
        let registry = Self::new();
        registry.register(GcsBackend::new(config));
        registry.register(LocalBackend::new());
        registry
    }

    /// Append a backend.
    pub fn register(&self, backend: impl Backend + 'static) {
        self.register_arc(Arc::new(backend));
    }

    /// Append a backend (already wrapped in Arc).
    pub fn register_arc(&self, backend: Arc<dyn Backend>) {
        tracing::debug!(backend = backend.name(), "registering backend");
        self.backends.write().push(backend);
    }

    /// Names of the registered backends, in dispatch order.
    pub fn backends(&self) -> Vec<&'static str> {
        self.backends.read().iter().map(|b| b.name()).collect()
    }

    /// Resolve a path-like value to a handle.
    ///
    /// Handles are returned unchanged. Filesystem paths must be valid UTF-8.
    pub fn resolve(&self, input: impl Into<PathInput>) -> PathResult<GenPath> {
        let raw = match input.into() {
            PathInput::Handle(handle) => return Ok(handle),
            PathInput::Raw(raw) => raw,
            PathInput::Local(path) => path.into_os_string().into_string().map_err(|os| {
                PathError::InvalidPathType(format!("{:?} is not valid UTF-8", os))
            })?,
        };

        let backend = self
            .backends
            .read()
            .iter()
            .find(|b| b.supports(&raw))
            .cloned()
            .ok_or_else(|| PathError::unsupported_path(&raw))?;

        tracing::debug!(backend = backend.name(), path = %raw, "resolved path");
        Ok(GenPath::new(backend, raw))
    }
}

/// The process-wide registry.
///
/// Built on first use from [`Config::discover`] unless one was installed
/// with [`install`].
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(|| {
        let config = Config::discover().unwrap_or_else(|e| {
            tracing::warn!("ignoring unreadable config, using defaults: {}", e);
            Config::default()
        });
        Registry::with_defaults(&config)
    })
}

/// Install the process-wide registry.
///
/// Fails, handing the registry back, if the global registry already exists.
pub fn install(registry: Registry) -> Result<(), Registry> {
    GLOBAL.set(registry)
}

/// Resolve a path-like value with the process-wide registry.
pub fn resolve(input: impl Into<PathInput>) -> PathResult<GenPath> {
    global().resolve(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::GcsClient;
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};

    fn setup() -> Registry {
        let registry = Registry::new();
        registry.register(GcsBackend::with_client(GcsClient::in_memory()));
        registry.register(LocalBackend::new());
        registry
    }

    #[test]
    fn test_dispatch() {
        let registry = setup();
        assert_eq!(registry.backends(), vec!["gcs", "local"]);

        assert_eq!(registry.resolve("README.md").unwrap().backend_name(), "local");
        assert_eq!(registry.resolve("/tmp/path/mydata").unwrap().backend_name(), "local");
        assert_eq!(registry.resolve(Path::new("/tmp/x")).unwrap().backend_name(), "local");
        assert_eq!(registry.resolve("gs://gcs-bucket/path").unwrap().backend_name(), "gcs");
        assert_eq!(
            registry.resolve(String::from("gs://b/k")).unwrap().as_str(),
            "gs://b/k"
        );
    }

    #[test]
    fn test_unsupported() {
        let registry = setup();
        for raw in ["http://host/x", "gs://", "gs://bucket", "gxs://gcs-bucket", "bugs://x", "", " padded"] {
            let err = registry.resolve(raw).unwrap_err();
            assert!(matches!(err, PathError::UnsupportedPath(ref p) if p == raw), "{raw:?}: {err}");
        }
    }

    #[test]
    fn test_uri_heuristic_boundaries() {
        let registry = setup();
        assert_eq!(registry.resolve("dir/a://b").unwrap().backend_name(), "local");
        assert_eq!(registry.resolve("x:\\windows.txt").unwrap().backend_name(), "local");
        assert_eq!(registry.resolve("C:/data/file").unwrap().backend_name(), "local");
    }

    #[test]
    fn test_first_match_wins() {
        let registry = Registry::new();
        registry.register(LocalBackend::new());
        registry.register(GcsBackend::with_client(GcsClient::in_memory()));
        // local never claims URIs, so order only matters for overlapping grammars
        assert_eq!(registry.resolve("gs://b/k").unwrap().backend_name(), "gcs");

        let empty = Registry::new();
        assert!(empty.resolve("README.md").is_err());
    }

    #[test]
    fn test_handle_identity() {
        let registry = setup();
        let path = registry.resolve("gs://b/k").unwrap();
        let again = registry.resolve(&path).unwrap();
        assert!(GenPath::ptr_eq(&path, &again));
        let owned = registry.resolve(path.clone()).unwrap();
        assert!(GenPath::ptr_eq(&path, &owned));

        let fresh = registry.resolve("gs://b/k").unwrap();
        assert_eq!(path, fresh);
        assert!(!GenPath::ptr_eq(&path, &fresh));
    }

    #[test]
    fn test_equality_and_hash() {
        let registry = setup();
        let mut set = HashSet::new();
        set.insert(registry.resolve("a.txt").unwrap());
        set.insert(registry.resolve("a.txt").unwrap());
        set.insert(registry.resolve(PathBuf::from("a.txt")).unwrap());
        set.insert(registry.resolve("b.txt").unwrap());
        assert_eq!(set.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let registry = setup();
        let path = PathBuf::from(OsStr::from_bytes(b"bad\xffname"));
        let err = registry.resolve(path).unwrap_err();
        assert!(matches!(err, PathError::InvalidPathType(_)));
    }

    #[test]
    fn test_with_defaults_order() {
        let registry = Registry::with_defaults(&Config::default());
        assert_eq!(registry.backends(), vec!["gcs", "local"]);
    }
}

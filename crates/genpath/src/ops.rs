//! Backend operations trait.
//!
//! Primitive operations take the raw path string the handle was resolved
//! from. Composite operations (`proxy`, `read`, `write`) take the handle
//! itself, since staging needs to call back into the primitives.

use async_trait::async_trait;
use std::path::Path;

use crate::config::StagingConfig;
use crate::error::PathResult;
use crate::handle::GenPath;
use crate::mode::{OpenMode, ProxyMode};
use crate::proxy::{self, ProxySession};
use crate::stream::{Contents, ObjectStream};

/// A storage backend for one class of path strings.
///
/// Backends are stateless with respect to individual paths and are shared
/// by every handle they resolve.
#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Short backend name, e.g. `"local"`.
    fn name(&self) -> &'static str;

    /// Pure predicate: does this backend own `raw`? Must not do I/O.
    fn supports(&self, raw: &str) -> bool;

    /// Check whether an object exists at `raw`.
    async fn exists(&self, raw: &str) -> PathResult<bool>;

    /// Open a stream, mimicking a conventional file open.
    async fn open(&self, raw: &str, mode: OpenMode) -> PathResult<Box<dyn ObjectStream>>;

    /// Copy the object at `raw` to a local file.
    async fn copy_to(&self, raw: &str, local: &Path) -> PathResult<()>;

    /// Replace the object at `raw` with the contents of a local file.
    async fn copy_from(&self, raw: &str, local: &Path) -> PathResult<()>;

    /// Where staged proxy sessions put their files.
    fn staging(&self) -> StagingConfig {
        StagingConfig::default()
    }

    // ========================================================================
    // Composite operations (default implementations)
    // ========================================================================

    /// Acquire a proxy session.
    ///
    /// The default stages the object through a private temporary directory.
    async fn proxy(&self, target: &GenPath, mode: ProxyMode) -> PathResult<ProxySession> {
        ProxySession::staged(target.clone(), mode, &self.staging()).await
    }

    /// Read up to `size` units (characters or bytes, per `mode`).
    async fn read(&self, target: &GenPath, mode: OpenMode, size: Option<usize>) -> PathResult<Contents> {
        proxy::read_via_proxy(target, mode, size).await
    }

    /// Write `data` in `mode`.
    async fn write(&self, target: &GenPath, data: &[u8], mode: OpenMode) -> PathResult<()> {
        proxy::write_via_proxy(target, data, mode).await
    }
}

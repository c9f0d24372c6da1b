//! Local filesystem backend.
//!
//! Accepts most strings as local paths, as long as they don't look like a
//! URI (`scheme://...`). Proxy sessions are pass-through: the caller gets
//! the real path, no staging.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;

use crate::error::PathResult;
use crate::handle::GenPath;
use crate::mode::{OpenMode, ProxyMode};
use crate::ops::Backend;
use crate::proxy::ProxySession;
use crate::stream::ObjectStream;

/// Strings starting like `scheme://` are never local paths.
static URI_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://").expect("static regex"));

/// Local filesystem backend.
///
/// Relative paths resolve against `base` when set, otherwise against the
/// process working directory.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    base: Option<PathBuf>,
}

impl LocalBackend {
    /// Create a backend resolving relative paths against the working directory.
    pub fn new() -> Self {
        Self { base: None }
    }

    /// Create a backend resolving relative paths against `base`.
    pub fn rooted(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    /// Get the base directory, if any.
    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// Resolve a raw path string to the path used for I/O.
    fn resolve(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Copy a file; a directory destination receives a file of the same name.
async fn copy_file(src: &Path, dst: &Path) -> PathResult<()> {
    let dst = match src.file_name() {
        Some(name) if fs::metadata(dst).await.is_ok_and(|m| m.is_dir()) => dst.join(name),
        _ => dst.to_path_buf(),
    };
    fs::copy(src, &dst).await?;
    Ok(())
}

#[async_trait]
impl Backend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn supports(&self, raw: &str) -> bool {
        !raw.is_empty() && raw == raw.trim() && !URI_LIKE.is_match(raw)
    }

    async fn exists(&self, raw: &str) -> PathResult<bool> {
        Ok(fs::try_exists(self.resolve(raw)).await?)
    }

    async fn open(&self, raw: &str, mode: OpenMode) -> PathResult<Box<dyn ObjectStream>> {
        let file = mode.open_options().open(self.resolve(raw)).await?;
        Ok(Box::new(file))
    }

    async fn copy_to(&self, raw: &str, local: &Path) -> PathResult<()> {
        copy_file(&self.resolve(raw), local).await
    }

    async fn copy_from(&self, raw: &str, local: &Path) -> PathResult<()> {
        copy_file(local, &self.resolve(raw)).await
    }

    async fn proxy(&self, target: &GenPath, mode: ProxyMode) -> PathResult<ProxySession> {
        Ok(ProxySession::direct(target.clone(), self.resolve(target.as_str()), mode))
    }
}

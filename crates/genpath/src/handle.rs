//! Generalized path handles.

use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{PathError, PathResult};
use crate::mode::{OpenMode, ProxyMode};
use crate::ops::Backend;
use crate::proxy::ProxySession;
use crate::stream::{Contents, ObjectStream};

/// Anything that can be resolved into a [`GenPath`].
#[derive(Debug, Clone)]
pub enum PathInput {
    /// A raw path string.
    Raw(String),
    /// A filesystem path value; converted to its string form.
    Local(PathBuf),
    /// An already resolved handle; returned unchanged.
    Handle(GenPath),
}

impl From<&str> for PathInput {
    fn from(s: &str) -> Self {
        PathInput::Raw(s.to_string())
    }
}

impl From<String> for PathInput {
    fn from(s: String) -> Self {
        PathInput::Raw(s)
    }
}

impl From<&String> for PathInput {
    fn from(s: &String) -> Self {
        PathInput::Raw(s.clone())
    }
}

impl From<&Path> for PathInput {
    fn from(p: &Path) -> Self {
        PathInput::Local(p.to_path_buf())
    }
}

impl From<PathBuf> for PathInput {
    fn from(p: PathBuf) -> Self {
        PathInput::Local(p)
    }
}

impl From<&PathBuf> for PathInput {
    fn from(p: &PathBuf) -> Self {
        PathInput::Local(p.clone())
    }
}

impl From<GenPath> for PathInput {
    fn from(h: GenPath) -> Self {
        PathInput::Handle(h)
    }
}

impl From<&GenPath> for PathInput {
    fn from(h: &GenPath) -> Self {
        PathInput::Handle(h.clone())
    }
}

struct Inner {
    backend: Arc<dyn Backend>,
    raw: String,
}

/// A path bound to the backend that owns it.
///
/// Immutable after construction and cheap to clone. Equality compares the
/// backend name and the raw string; [`GenPath::ptr_eq`] compares identity.
#[derive(Clone)]
pub struct GenPath {
    inner: Arc<Inner>,
}

impl GenPath {
    pub(crate) fn new(backend: Arc<dyn Backend>, raw: String) -> Self {
        Self {
            inner: Arc::new(Inner { backend, raw }),
        }
    }

    /// The raw path string.
    pub fn as_str(&self) -> &str {
        &self.inner.raw
    }

    /// Name of the owning backend.
    pub fn backend_name(&self) -> &'static str {
        self.inner.backend.name()
    }

    /// The owning backend.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    /// True if both handles are the same allocation.
    pub fn ptr_eq(a: &GenPath, b: &GenPath) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Check whether the object exists.
    pub async fn exists(&self) -> PathResult<bool> {
        self.inner.backend.exists(self.as_str()).await
    }

    /// Open a stream in a conventional mode string (`"r"`, `"wb"`, ...).
    pub async fn open(&self, mode: &str) -> PathResult<Box<dyn ObjectStream>> {
        let mode = OpenMode::parse(mode)?;
        self.inner.backend.open(self.as_str(), mode).await
    }

    /// Read up to `size` units: characters in text modes, bytes in binary
    /// modes. `None` reads everything.
    pub async fn read(&self, mode: &str, size: Option<usize>) -> PathResult<Contents> {
        let mode = OpenMode::parse(mode)?;
        self.inner.backend.read(self, mode, size).await
    }

    /// Read all content as bytes.
    pub async fn read_bytes(&self) -> PathResult<Vec<u8>> {
        let contents = self.inner.backend.read(self, OpenMode::READ_BINARY, None).await?;
        Ok(contents.into_bytes())
    }

    /// Read all content as UTF-8 text.
    pub async fn read_text(&self) -> PathResult<String> {
        match self.inner.backend.read(self, OpenMode::READ, None).await? {
            Contents::Text(s) => Ok(s),
            Contents::Binary(b) => Ok(String::from_utf8(b)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?),
        }
    }

    /// Write `data` in a conventional mode string (`"w"`, `"a"`, `"wb"`, ...).
    pub async fn write(&self, data: impl AsRef<[u8]>, mode: &str) -> PathResult<()> {
        let mode = OpenMode::parse(mode)?;
        self.inner.backend.write(self, data.as_ref(), mode).await
    }

    /// Copy the object to a concrete local path.
    pub async fn copy_to(&self, local: impl AsRef<Path>) -> PathResult<()> {
        self.inner.backend.copy_to(self.as_str(), local.as_ref()).await
    }

    /// Replace the object with the contents of a concrete local path.
    pub async fn copy_from(&self, local: impl AsRef<Path>) -> PathResult<()> {
        self.inner.backend.copy_from(self.as_str(), local.as_ref()).await
    }

    /// Acquire a proxy session in `mode`.
    pub async fn proxy(&self, mode: ProxyMode) -> PathResult<ProxySession> {
        self.inner.backend.proxy(self, mode).await
    }

    /// A read-only local copy. Local changes are discarded.
    pub async fn read_proxy(&self) -> PathResult<ProxySession> {
        self.proxy(ProxyMode::Read).await
    }

    /// A fresh local path, copied to the target on commit.
    pub async fn write_proxy(&self) -> PathResult<ProxySession> {
        self.proxy(ProxyMode::Write).await
    }

    /// A local copy, copied back to the target on commit.
    pub async fn read_write_proxy(&self) -> PathResult<ProxySession> {
        self.proxy(ProxyMode::ReadWrite).await
    }

    /// Run `f` against a proxy session.
    ///
    /// Commits (writing back in `w`/`rw` modes) when `f` succeeds and
    /// discards when it fails. The staged file is removed either way.
    pub async fn with_proxy<F, Fut, T, E>(&self, mode: ProxyMode, f: F) -> Result<T, E>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<PathError>,
    {
        let session = self.proxy(mode).await?;
        match f(session.path().to_path_buf()).await {
            Ok(value) => {
                session.commit().await?;
                Ok(value)
            }
            Err(e) => {
                session.discard();
                Err(e)
            }
        }
    }
}

impl PartialEq for GenPath {
    fn eq(&self, other: &Self) -> bool {
        self.backend_name() == other.backend_name() && self.as_str() == other.as_str()
    }
}

impl Eq for GenPath {}

impl Hash for GenPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.backend_name().hash(state);
        self.as_str().hash(state);
    }
}

impl fmt::Debug for GenPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenPath")
            .field("backend", &self.backend_name())
            .field("path", &self.as_str())
            .finish()
    }
}

impl fmt::Display for GenPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for GenPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

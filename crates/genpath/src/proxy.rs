//! Proxy sessions: scoped local-file materialization of a generalized path.
//!
//! A staged session owns a private temporary directory. Depending on the
//! [`ProxyMode`] it is pre-populated from the target on entry and copied
//! back on [`ProxySession::commit`]. The directory is removed on every exit
//! path: commit, discard, or drop. Removal failures are logged, never
//! returned.
//!
//! Write-back only happens on an explicit commit. A session dropped while
//! unwinding an error leaves the target untouched.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::StagingConfig;
use crate::error::PathResult;
use crate::handle::GenPath;
use crate::mode::{Access, OpenMode, ProxyMode};
use crate::stream::{self, Contents};

const FALLBACK_STAGED_NAME: &str = "object";

/// A local path standing in for a generalized path.
#[derive(Debug)]
pub struct ProxySession {
    target: GenPath,
    mode: ProxyMode,
    local: PathBuf,
    /// `None` for pass-through sessions and after release.
    staging: Option<TempDir>,
}

impl ProxySession {
    /// Stage `target` through a fresh temporary directory.
    ///
    /// In `r` and `rw` modes the object is copied in first. In `w` mode the
    /// local path does not exist yet.
    #[tracing::instrument(skip(target, staging), fields(path = %target), name = "proxy.stage")]
    pub async fn staged(target: GenPath, mode: ProxyMode, staging: &StagingConfig) -> PathResult<Self> {
        let dir = staging.tempdir()?;
        let local = dir.path().join(staged_file_name(target.as_str()));
        let session = Self {
            target,
            mode,
            local,
            staging: Some(dir),
        };

        if mode.reads() {
            session.target.copy_to(&session.local).await?;
        }

        tracing::debug!(local = %session.local.display(), "staged proxy");
        Ok(session)
    }

    /// A session that hands out an existing local path unchanged.
    pub fn direct(target: GenPath, local: PathBuf, mode: ProxyMode) -> Self {
        Self {
            target,
            mode,
            local,
            staging: None,
        }
    }

    /// The local path to operate on.
    pub fn path(&self) -> &Path {
        &self.local
    }

    /// The generalized path this session stands in for.
    pub fn target(&self) -> &GenPath {
        &self.target
    }

    /// The session's mode.
    pub fn mode(&self) -> ProxyMode {
        self.mode
    }

    /// True if the session stages through a temporary copy.
    pub fn is_staged(&self) -> bool {
        self.staging.is_some()
    }

    /// Finish the session, copying the staged file back in `w`/`rw` modes.
    ///
    /// The staged file is removed even if the copy fails.
    #[tracing::instrument(skip(self), fields(path = %self.target, mode = %self.mode), name = "proxy.commit")]
    pub async fn commit(mut self) -> PathResult<()> {
        let result = if self.mode.writes() && self.staging.is_some() {
            tracing::debug!("writing back proxy");
            self.target.copy_from(&self.local).await
        } else {
            Ok(())
        };
        self.release();
        result
    }

    /// Finish the session without writing back.
    pub fn discard(mut self) {
        self.release();
    }

    fn release(&mut self) {
        let Some(dir) = self.staging.take() else {
            return;
        };
        let dir_path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            tracing::warn!(
                path = %dir_path.display(),
                "proxy staging directory was not deleted: {}",
                e
            );
        }
    }
}

impl Drop for ProxySession {
    fn drop(&mut self) {
        if self.staging.is_some() && self.mode.writes() {
            tracing::debug!(path = %self.target, "discarding uncommitted proxy");
        }
        self.release();
    }
}

/// Name for the staged file: the target's last segment, so tools that sniff
/// extensions still work.
fn staged_file_name(raw: &str) -> &str {
    Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(FALLBACK_STAGED_NAME)
}

/// Read through a read proxy.
pub(crate) async fn read_via_proxy(target: &GenPath, mode: OpenMode, size: Option<usize>) -> PathResult<Contents> {
    mode.require_readable()?;
    let session = target.read_proxy().await?;
    let result = stream::read_local(session.path(), mode, size).await;
    session.discard();
    result
}

/// Write through a write proxy, or a read-write proxy when `mode` keeps
/// existing content and there is content to keep.
pub(crate) async fn write_via_proxy(target: &GenPath, data: &[u8], mode: OpenMode) -> PathResult<()> {
    mode.require_writable()?;
    let exists = target.exists().await?;
    if exists && mode.access() == Access::CreateNew {
        return Err(io::Error::new(io::ErrorKind::AlreadyExists, target.to_string()).into());
    }
    let proxy_mode = if exists && mode.preserves_content() {
        ProxyMode::ReadWrite
    } else {
        ProxyMode::Write
    };

    target
        .with_proxy(proxy_mode, |local| async move {
            stream::write_local(&local, data, mode).await
        })
        .await
}

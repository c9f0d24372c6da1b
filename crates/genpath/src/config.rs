//! Configuration.
//!
//! Configuration only tunes how backends stage files and build clients.
//! It never changes which backend a path dispatches to.
//!
//! ```toml
//! [staging]
//! dir = "/var/tmp"
//! prefix = "genpath-"
//!
//! [gcs]
//! service_account_path = "/etc/keys/sa.json"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tempfile::TempDir;

use crate::error::{PathError, PathResult};

/// Environment variable naming a config file for [`Config::discover`].
pub const CONFIG_ENV: &str = "GENPATH_CONFIG";

const DEFAULT_STAGING_PREFIX: &str = "genpath-";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Proxy staging settings.
    pub staging: StagingConfig,
    /// Google Cloud Storage client settings.
    pub gcs: GcsConfig,
}

/// Where staged proxy sessions place their temporary files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StagingConfig {
    /// Parent directory for staging directories (default: OS temp dir).
    pub dir: Option<PathBuf>,
    /// Name prefix of each staging directory.
    pub prefix: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            prefix: DEFAULT_STAGING_PREFIX.to_string(),
        }
    }
}

impl StagingConfig {
    /// Create a fresh, private staging directory.
    pub fn tempdir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.prefix);
        match &self.dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
    }
}

/// Google Cloud Storage client settings.
///
/// Credentials not given here are taken from the environment
/// (`GOOGLE_SERVICE_ACCOUNT`, `GOOGLE_APPLICATION_CREDENTIALS`, or the
/// metadata server).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GcsConfig {
    /// Path to a service account JSON key.
    pub service_account_path: Option<PathBuf>,
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> PathResult<Self> {
        toml::from_str(text).map_err(|e| PathError::config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> PathResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PathError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Load the file named by `GENPATH_CONFIG`, or return defaults.
    pub fn discover() -> PathResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                tracing::debug!(path = ?path, "loading config");
                Self::load(PathBuf::from(path))
            }
            None => Ok(Self::default()),
        }
    }
}

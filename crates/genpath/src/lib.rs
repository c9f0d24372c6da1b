//! Generalized paths: one handle type for local files and cloud objects.
//!
//! A path string is resolved to a [`GenPath`] by the first registered
//! [`Backend`] that claims it. The handle offers the same operations on every
//! backend: existence checks, streams, whole-object reads and writes, copies,
//! and proxy sessions that expose the object as a plain local file.
//!
//! ```no_run
//! # async fn demo() -> genpath::PathResult<()> {
//! let scene = genpath::resolve("gs://landsat/LC08/index.csv")?;
//! let head = scene.read("rb", Some(1024)).await?;
//!
//! let out = genpath::resolve("/tmp/out.txt")?;
//! out.with_proxy(genpath::ProxyMode::Write, |local| async move {
//!     tokio::fs::write(&local, head.as_bytes()).await?;
//!     Ok::<_, genpath::PathError>(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod cache;
pub mod config;
pub mod error;
pub mod handle;
pub mod io;
pub mod mode;
pub mod ops;
pub mod proxy;
pub mod registry;
pub mod stream;

pub use backends::{GcsBackend, GcsClient, LocalBackend};
pub use cache::ProcessLocal;
pub use config::{Config, GcsConfig, StagingConfig};
pub use error::{PathError, PathResult};
pub use handle::{GenPath, PathInput};
pub use mode::{Access, OpenMode, ProxyMode};
pub use ops::Backend;
pub use proxy::ProxySession;
pub use registry::{Registry, resolve};
pub use stream::{Contents, ObjectStream};

//! Google Cloud Storage backend.
//!
//! Owns `gs://<bucket>/<key>` URIs. Objects are reached through
//! [`object_store`]; the Google transport itself is behind the `gcs` cargo
//! feature. Proxy sessions stage objects through a temporary local file.
//!
//! The client is cached once per process and rebuilt after a fork (see
//! [`ProcessLocal`]).

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::{StreamExt, TryStreamExt};
use object_store::buffered::BufWriter;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload};
use regex::Regex;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::cache::ProcessLocal;
use crate::config::{Config, GcsConfig, StagingConfig};
use crate::error::{PathError, PathResult};
use crate::handle::GenPath;
use crate::mode::{Access, OpenMode};
use crate::ops::Backend;
use crate::proxy;
use crate::stream::{self, Contents, ObjectStream, RemoteStream};

/// URI scheme owned by this backend.
pub const GCS_SCHEME: &str = "gs";

static GS_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^gs://([^/]+)/(.+)$").expect("static regex"));

/// Split a `gs://bucket/key` URI into bucket and key.
pub fn parse_uri(raw: &str) -> Option<(&str, &str)> {
    let caps = GS_URI.captures(raw)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

type BucketOpener = dyn Fn(&str) -> PathResult<Arc<dyn ObjectStore>> + Send + Sync;

/// A handle to the storage service, handing out one store per bucket.
#[derive(Clone)]
pub struct GcsClient {
    buckets: Arc<DashMap<String, Arc<dyn ObjectStore>>>,
    open_bucket: Arc<BucketOpener>,
}

impl fmt::Debug for GcsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsClient")
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

impl GcsClient {
    /// Connect to Google Cloud Storage using the environment and `config`.
    ///
    /// Fails with [`PathError::MissingDependency`] when built without the
    /// `gcs` feature.
    #[cfg(feature = "gcs")]
    pub fn connect(config: &GcsConfig) -> PathResult<Self> {
        use object_store::gcp::GoogleCloudStorageBuilder;

        let config = config.clone();
        Ok(Self::from_fn(move |bucket| {
            let mut builder = GoogleCloudStorageBuilder::from_env().with_bucket_name(bucket);
            if let Some(path) = &config.service_account_path {
                builder = builder.with_service_account_path(path.to_string_lossy());
            }
            let store: Arc<dyn ObjectStore> = Arc::new(builder.build()?);
            Ok(store)
        }))
    }

    /// Connect to Google Cloud Storage using the environment and `config`.
    ///
    /// Fails with [`PathError::MissingDependency`] when built without the
    /// `gcs` feature.
    #[cfg(not(feature = "gcs"))]
    pub fn connect(_config: &GcsConfig) -> PathResult<Self> {
        Err(PathError::MissingDependency {
            dependency: "object_store/gcp",
            hint: "rebuild genpath with `--features gcs`",
        })
    }

    /// A client whose buckets live in memory.
    pub fn in_memory() -> Self {
        Self::from_fn(|_| {
            let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
            Ok(store)
        })
    }

    /// A client that opens each bucket with `open_bucket`.
    pub fn from_fn(
        open_bucket: impl Fn(&str) -> PathResult<Arc<dyn ObjectStore>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            open_bucket: Arc::new(open_bucket),
        }
    }

    /// Get the store for `bucket`, opening it on first use.
    pub fn bucket(&self, bucket: &str) -> PathResult<Arc<dyn ObjectStore>> {
        if let Some(store) = self.buckets.get(bucket) {
            return Ok(Arc::clone(store.value()));
        }
        let store = (self.open_bucket)(bucket)?;
        let entry = self.buckets.entry(bucket.to_string()).or_insert(store);
        Ok(Arc::clone(entry.value()))
    }
}

type Connector = dyn Fn() -> PathResult<GcsClient> + Send + Sync;

/// Google Cloud Storage backend.
pub struct GcsBackend {
    client: ProcessLocal<GcsClient>,
    connect: Arc<Connector>,
    staging: StagingConfig,
}

impl fmt::Debug for GcsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsBackend")
            .field("client", &self.client)
            .field("staging", &self.staging)
            .finish()
    }
}

impl GcsBackend {
    /// Create a backend that connects with [`GcsClient::connect`] on first use.
    pub fn new(config: &Config) -> Self {
        let gcs = config.gcs.clone();
        Self::with_connector(move || GcsClient::connect(&gcs)).with_staging(config.staging.clone())
    }

    /// Create a backend that builds its client with `connect`.
    pub fn with_connector(connect: impl Fn() -> PathResult<GcsClient> + Send + Sync + 'static) -> Self {
        Self {
            client: ProcessLocal::new(),
            connect: Arc::new(connect),
            staging: StagingConfig::default(),
        }
    }

    /// Create a backend that always uses `client`.
    pub fn with_client(client: GcsClient) -> Self {
        Self::with_connector(move || Ok(client.clone()))
    }

    /// Set where proxy sessions stage files.
    pub fn with_staging(mut self, staging: StagingConfig) -> Self {
        self.staging = staging;
        self
    }

    /// Replace the process id source of the client cache.
    pub fn with_pid_source(mut self, pid: impl Fn() -> u32 + Send + Sync + 'static) -> Self {
        self.client = ProcessLocal::with_pid_source(pid);
        self
    }

    /// The client for the current process, connecting if needed.
    pub fn client(&self) -> PathResult<Arc<GcsClient>> {
        self.client.get_or_try_init(|| {
            tracing::debug!("connecting storage client");
            (self.connect)()
        })
    }

    /// Install a client for the current process.
    pub fn install_client(&self, client: GcsClient) {
        self.client.set(client);
    }

    fn locate(&self, raw: &str) -> PathResult<(Arc<dyn ObjectStore>, ObjectPath)> {
        let (bucket, key) = parse_uri(raw).ok_or_else(|| PathError::unsupported_path(raw))?;
        let key = object_key(key)?;
        Ok((self.client()?.bucket(bucket)?, key))
    }
}

/// Parse a key verbatim. Keys the store would normalize into a different
/// object (empty segments, `.`, `..`) are rejected.
fn object_key(key: &str) -> PathResult<ObjectPath> {
    if key.split('/').any(str::is_empty) {
        return Err(PathError::InvalidObjectKey(format!("{key:?} has an empty segment")));
    }
    ObjectPath::parse(key).map_err(|e| PathError::InvalidObjectKey(e.to_string()))
}

fn to_io(e: object_store::Error) -> io::Error {
    match e {
        object_store::Error::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, e),
        e => io::Error::other(e),
    }
}

#[async_trait]
impl Backend for GcsBackend {
    fn name(&self) -> &'static str {
        "gcs"
    }

    fn supports(&self, raw: &str) -> bool {
        GS_URI.is_match(raw)
    }

    async fn exists(&self, raw: &str) -> PathResult<bool> {
        let (store, key) = self.locate(raw)?;
        match store.head(&key).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, raw: &str, mode: OpenMode) -> PathResult<Box<dyn ObjectStream>> {
        let (store, key) = self.locate(raw)?;
        match (mode.access(), mode.is_update()) {
            (Access::Read, false) => {
                let stream = store.get(&key).await?.into_stream().map_err(to_io).boxed();
                Ok(Box::new(RemoteStream::reader(stream)))
            }
            (Access::Write, false) => Ok(Box::new(RemoteStream::writer(BufWriter::new(store, key)))),
            _ => Err(PathError::unsupported_mode(mode.to_string(), self.name())),
        }
    }

    async fn copy_to(&self, raw: &str, local: &Path) -> PathResult<()> {
        let (store, key) = self.locate(raw)?;
        let mut stream = store.get(&key).await?.into_stream();
        let mut file = fs::File::create(local).await?;
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn copy_from(&self, raw: &str, local: &Path) -> PathResult<()> {
        let (store, key) = self.locate(raw)?;
        let mut file = fs::File::open(local).await?;
        let mut writer = BufWriter::new(store, key);
        tokio::io::copy(&mut file, &mut writer).await?;
        writer.shutdown().await?;
        Ok(())
    }

    fn staging(&self) -> StagingConfig {
        self.staging.clone()
    }

    /// Reads directly, without staging. Sized reads fetch only a prefix of
    /// the object.
    async fn read(&self, target: &GenPath, mode: OpenMode, size: Option<usize>) -> PathResult<Contents> {
        mode.require_readable()?;
        let (store, key) = self.locate(target.as_str())?;

        let data = match size {
            Some(n) => {
                // A UTF-8 character is at most four bytes.
                let limit = if mode.is_binary() { n } else { n.saturating_mul(4) };
                let meta = store.head(&key).await?;
                let end = limit.min(meta.size);
                let mut data = if end == 0 {
                    Vec::new()
                } else {
                    store.get_range(&key, 0..end).await?.to_vec()
                };
                if !mode.is_binary() {
                    stream::trim_partial_char(&mut data);
                }
                data
            }
            None => store.get(&key).await?.bytes().await?.to_vec(),
        };

        Contents::decode(data, mode, size)
    }

    /// Uploads the whole payload in one request. Modes that keep existing
    /// content go through a read-write proxy instead.
    async fn write(&self, target: &GenPath, data: &[u8], mode: OpenMode) -> PathResult<()> {
        mode.require_writable()?;
        if mode.preserves_content() {
            return proxy::write_via_proxy(target, data, mode).await;
        }

        let (store, key) = self.locate(target.as_str())?;
        let put_mode = match mode.access() {
            Access::CreateNew => PutMode::Create,
            _ => PutMode::Overwrite,
        };
        let opts = PutOptions {
            mode: put_mode,
            ..Default::default()
        };
        store.put_opts(&key, PutPayload::from(data.to_vec()), opts).await?;
        Ok(())
    }
}

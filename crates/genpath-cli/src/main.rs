//! genpath command-line tool.
//!
//! Usage:
//!   genpath cat gs://bucket/scene/MTL.txt --bytes 512
//!   genpath cp gs://bucket/scene/B4.TIF ./B4.TIF
//!   echo hello | genpath put /tmp/greeting.txt --append
//!   genpath exists gs://bucket/missing && echo present
//!
//! Logging goes to stderr; set `RUST_LOG=genpath=debug` for detail.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing_subscriber::{EnvFilter, fmt};

use genpath::{Config, Registry};

/// Read, write and copy local files and cloud objects by path.
#[derive(Parser, Debug)]
#[command(name = "genpath")]
#[command(about = "Read, write and copy local files and cloud objects")]
struct Args {
    /// TOML config file (overrides GENPATH_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an object's contents
    Cat {
        path: String,
        /// Only print the first N bytes
        #[arg(long)]
        bytes: Option<usize>,
    },
    /// Exit 0 if the object exists, 1 otherwise
    Exists { path: String },
    /// Copy an object to another path
    Cp { src: String, dst: String },
    /// Write stdin to a path
    Put {
        path: String,
        /// Append instead of replacing
        #[arg(long)]
        append: bool,
    },
    /// Print the backend that owns a path
    Backend { path: String },
}

/// Install a global registry built from `config`. Without a file the
/// registry is built lazily from `GENPATH_CONFIG`.
fn configure(config: Option<&Path>) -> Result<()> {
    let Some(path) = config else {
        return Ok(());
    };
    let config = Config::load(path).with_context(|| format!("loading {}", path.display()))?;
    genpath::registry::install(Registry::with_defaults(&config))
        .map_err(|_| anyhow!("registry already initialized"))
}

async fn cat<W: AsyncWrite + Unpin>(registry: &Registry, path: &str, bytes: Option<usize>, out: &mut W) -> Result<()> {
    let contents = registry
        .resolve(path)?
        .read("rb", bytes)
        .await
        .with_context(|| format!("reading {path}"))?;
    out.write_all(contents.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

async fn exists(registry: &Registry, path: &str) -> Result<bool> {
    let found = registry
        .resolve(path)?
        .exists()
        .await
        .with_context(|| format!("checking {path}"))?;
    Ok(found)
}

/// Stage `src` locally, then upload the staged file to `dst`.
async fn cp(registry: &Registry, src: &str, dst: &str) -> Result<()> {
    let src_path = registry.resolve(src)?;
    let dst_path = registry.resolve(dst)?;
    let session = src_path
        .read_proxy()
        .await
        .with_context(|| format!("reading {src}"))?;
    let result = dst_path.copy_from(session.path()).await;
    session.discard();
    result.with_context(|| format!("writing {dst}"))?;
    tracing::info!(src = %src_path, dst = %dst_path, "copied");
    Ok(())
}

async fn put<R: AsyncRead + Unpin>(registry: &Registry, path: &str, append: bool, input: &mut R) -> Result<()> {
    let mut data = Vec::new();
    input.read_to_end(&mut data).await?;
    let mode = if append { "ab" } else { "wb" };
    registry
        .resolve(path)?
        .write(&data, mode)
        .await
        .with_context(|| format!("writing {path}"))?;
    Ok(())
}

/// Run one subcommand. Returns `false` when the command should exit
/// unsuccessfully without an error (a missing object for `exists`).
async fn run<R, W>(registry: &Registry, command: Command, input: &mut R, out: &mut W) -> Result<bool>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match command {
        Command::Cat { path, bytes } => cat(registry, &path, bytes, out).await?,
        Command::Exists { path } => return exists(registry, &path).await,
        Command::Cp { src, dst } => cp(registry, &src, &dst).await?,
        Command::Put { path, append } => put(registry, &path, append, input).await?,
        Command::Backend { path } => {
            let name = registry.resolve(path.as_str())?.backend_name();
            out.write_all(format!("{name}\n").as_bytes()).await?;
            out.flush().await?;
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    configure(args.config.as_deref())?;

    let ok = run(
        genpath::registry::global(),
        args.command,
        &mut tokio::io::stdin(),
        &mut tokio::io::stdout(),
    )
    .await?;

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[cfg(test)]
mod tests {
    use super::*;
    use genpath::{GcsBackend, GcsClient, LocalBackend};
    use tempfile::TempDir;

    fn registry() -> Registry {
        let registry = Registry::new();
        registry.register(GcsBackend::with_client(GcsClient::in_memory()));
        registry.register(LocalBackend::new());
        registry
    }

    async fn run_with(registry: &Registry, command: Command, input: &[u8]) -> (bool, Vec<u8>) {
        let mut input = input;
        let mut out = Vec::new();
        let ok = run(registry, command, &mut input, &mut out).await.unwrap();
        (ok, out)
    }

    fn local(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["genpath", "cat", "gs://b/k", "--bytes", "16"]).unwrap();
        assert!(matches!(args.command, Command::Cat { bytes: Some(16), .. }));

        let args = Args::try_parse_from(["genpath", "put", "/tmp/x", "--append", "--config", "c.toml"]).unwrap();
        assert!(matches!(args.command, Command::Put { append: true, .. }));
        assert_eq!(args.config.as_deref(), Some(Path::new("c.toml")));

        assert!(Args::try_parse_from(["genpath", "cp", "only-one"]).is_err());
    }

    #[tokio::test]
    async fn test_exists_status() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let path = local(&dir, "maybe.txt");

        let (ok, _) = run_with(&registry, Command::Exists { path: path.clone() }, b"").await;
        assert!(!ok);

        std::fs::write(&path, "here").unwrap();
        let (ok, _) = run_with(&registry, Command::Exists { path }, b"").await;
        assert!(ok);

        let (ok, _) = run_with(&registry, Command::Exists { path: "gs://b/none".into() }, b"").await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_put_and_cat() {
        let registry = registry();
        let path = "gs://b/log.txt".to_string();

        run_with(&registry, Command::Put { path: path.clone(), append: false }, b"first\n").await;
        run_with(&registry, Command::Put { path: path.clone(), append: true }, b"second\n").await;

        let (ok, out) = run_with(&registry, Command::Cat { path: path.clone(), bytes: None }, b"").await;
        assert!(ok);
        assert_eq!(out, b"first\nsecond\n");

        let (_, out) = run_with(&registry, Command::Cat { path: path.clone(), bytes: Some(5) }, b"").await;
        assert_eq!(out, b"first");

        run_with(&registry, Command::Put { path: path.clone(), append: false }, b"reset").await;
        let (_, out) = run_with(&registry, Command::Cat { path, bytes: None }, b"").await;
        assert_eq!(out, b"reset");
    }

    #[tokio::test]
    async fn test_cp_across_backends() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let src = local(&dir, "scene.txt");
        std::fs::write(&src, "GROUP = L1_METADATA_FILE").unwrap();

        let remote = "gs://b/scenes/scene.txt".to_string();
        run_with(&registry, Command::Cp { src, dst: remote.clone() }, b"").await;

        let back = local(&dir, "back.txt");
        run_with(&registry, Command::Cp { src: remote, dst: back.clone() }, b"").await;
        assert_eq!(std::fs::read_to_string(back).unwrap(), "GROUP = L1_METADATA_FILE");
    }

    #[tokio::test]
    async fn test_cp_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        let mut input: &[u8] = b"";
        let mut out = Vec::new();

        let command = Command::Cp {
            src: "gs://b/absent".into(),
            dst: local(&dir, "out.txt"),
        };
        let err = run(&registry, command, &mut input, &mut out).await.unwrap_err();
        assert!(err.to_string().contains("reading gs://b/absent"));
        assert!(!dir.path().join("out.txt").exists());
    }

    #[tokio::test]
    async fn test_backend_names() {
        let registry = registry();
        let (_, out) = run_with(&registry, Command::Backend { path: "gs://b/k".into() }, b"").await;
        assert_eq!(out, b"gcs\n");
        let (_, out) = run_with(&registry, Command::Backend { path: "README.md".into() }, b"").await;
        assert_eq!(out, b"local\n");
    }

    #[test]
    fn test_configure_installs_global_registry() {
        use genpath::Backend as _;

        let dir = TempDir::new().unwrap();
        assert!(configure(None).is_ok());

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[staging]\nfolder = 1\n").unwrap();
        let err = configure(Some(&broken)).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));

        let staging = dir.path().join("stage");
        std::fs::create_dir(&staging).unwrap();
        let config = dir.path().join("genpath.toml");
        std::fs::write(&config, format!("[staging]\ndir = {:?}\n", staging.to_string_lossy())).unwrap();
        configure(Some(&config)).unwrap();

        let global = genpath::registry::global();
        assert_eq!(global.backends(), vec!["gcs", "local"]);
        let remote = global.resolve("gs://b/k").unwrap();
        assert_eq!(remote.backend().staging().dir.as_deref(), Some(staging.as_path()));

        let err = configure(Some(&config)).unwrap_err();
        assert!(err.to_string().contains("already initialized"));
    }
}

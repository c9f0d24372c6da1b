//! Whole-object convenience helpers on the process-wide registry.

use std::io;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PathResult;
use crate::handle::PathInput;
use crate::registry;

/// Read up to `size` bytes, or everything.
pub async fn read_bytes(path: impl Into<PathInput>, size: Option<usize>) -> PathResult<Vec<u8>> {
    let path = registry::resolve(path)?;
    Ok(path.read("rb", size).await?.into_bytes())
}

/// Replace the object with `data`.
pub async fn write_bytes(data: impl AsRef<[u8]>, path: impl Into<PathInput>) -> PathResult<()> {
    registry::resolve(path)?.write(data, "wb").await
}

/// Read trimmed, non-empty lines. With `ignore_comments`, lines starting
/// with `#` are skipped too.
pub async fn read_lines(path: impl Into<PathInput>, ignore_comments: bool) -> PathResult<Vec<String>> {
    let text = registry::resolve(path)?.read_text().await?;
    Ok(parse_lines(&text, ignore_comments))
}

fn parse_lines(text: &str, ignore_comments: bool) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !(ignore_comments && line.starts_with('#')))
        .map(String::from)
        .collect()
}

/// Deserialize a JSON document.
pub async fn load_json<T: DeserializeOwned>(path: impl Into<PathInput>) -> PathResult<T> {
    let data = read_bytes(path, None).await?;
    let value = serde_json::from_slice(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(value)
}

/// Serialize `value` as pretty-printed JSON with a trailing newline.
pub async fn dump_json<T: Serialize + ?Sized>(value: &T, path: impl Into<PathInput>) -> PathResult<()> {
    let mut data = serde_json::to_vec_pretty(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    data.push(b'\n');
    write_bytes(data, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathError;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Scene {
        id: String,
        cloud_cover: f64,
        bands: Vec<u32>,
    }

    #[test]
    fn test_parse_lines() {
        let text = "  # header\nfirst\n\n   \n second \n#skip\n";
        assert_eq!(parse_lines(text, false), vec!["# header", "first", "second", "#skip"]);
        assert_eq!(parse_lines(text, true), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_bytes_round_trip() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.bin");

        write_bytes(b"\x00abc\xff", &file).await.unwrap();
        assert_eq!(read_bytes(&file, None).await.unwrap(), b"\x00abc\xff");
        assert_eq!(read_bytes(&file, Some(2)).await.unwrap(), b"\x00a");

        write_bytes(b"short", &file).await.unwrap();
        assert_eq!(read_bytes(&file, None).await.unwrap(), b"short");
    }

    #[tokio::test]
    async fn test_read_lines() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("scenes.txt");
        std::fs::write(&file, "# scene list\nLC08_A\n\nLC08_B\n").unwrap();

        assert_eq!(read_lines(&file, true).await.unwrap(), vec!["LC08_A", "LC08_B"]);
        assert_eq!(read_lines(&file, false).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_json() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("scene.json");
        let scene = Scene {
            id: "LC08_044034".into(),
            cloud_cover: 12.5,
            bands: vec![2, 3, 4],
        };

        dump_json(&scene, &file).await.unwrap();
        let text = std::fs::read_to_string(&file).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\n  \"id\""));

        let loaded: Scene = load_json(&file).await.unwrap();
        assert_eq!(loaded, scene);
    }

    #[tokio::test]
    async fn test_load_json_invalid() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("broken.json");
        std::fs::write(&file, "{ nope").unwrap();

        let err = load_json::<Scene>(&file).await.unwrap_err();
        match err {
            PathError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("unexpected error: {other}"),
        }
    }
}

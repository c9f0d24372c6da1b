//! Streams and whole-file contents.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::BoxStream;
use object_store::buffered::BufWriter;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio_util::io::StreamReader;

use crate::error::PathResult;
use crate::mode::OpenMode;

/// A stream returned by `open`.
///
/// Writers must be shut down (`AsyncWriteExt::shutdown`) to guarantee the
/// data reaches the backend; remote uploads complete only then.
pub trait ObjectStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ObjectStream for T {}

/// Contents returned by `read`: text in text modes, bytes in binary modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    /// Decoded UTF-8 text.
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
}

impl Contents {
    /// Borrow as bytes, whichever variant.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Contents::Text(s) => s.as_bytes(),
            Contents::Binary(b) => b,
        }
    }

    /// Borrow as text, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Contents::Text(s) => Some(s),
            Contents::Binary(_) => None,
        }
    }

    /// Take the bytes, whichever variant.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Contents::Text(s) => s.into_bytes(),
            Contents::Binary(b) => b,
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// True if there is no content.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build contents from raw bytes according to `mode`.
    ///
    /// In text mode the bytes must be UTF-8 and `size` counts characters;
    /// in binary mode `size` counts bytes.
    pub fn decode(mut data: Vec<u8>, mode: OpenMode, size: Option<usize>) -> PathResult<Self> {
        if mode.is_binary() {
            if let Some(n) = size {
                data.truncate(n);
            }
            return Ok(Contents::Binary(data));
        }

        let mut text = String::from_utf8(data)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if let Some(n) = size {
            if let Some((idx, _)) = text.char_indices().nth(n) {
                text.truncate(idx);
            }
        }
        Ok(Contents::Text(text))
    }
}

impl PartialEq<str> for Contents {
    fn eq(&self, other: &str) -> bool {
        self.as_text() == Some(other)
    }
}

impl PartialEq<&str> for Contents {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

impl PartialEq<[u8]> for Contents {
    fn eq(&self, other: &[u8]) -> bool {
        matches!(self, Contents::Binary(b) if b.as_slice() == other)
    }
}

/// Read a local file in `mode`, up to `size` units.
pub(crate) async fn read_local(path: &Path, mode: OpenMode, size: Option<usize>) -> PathResult<Contents> {
    mode.require_readable()?;
    let mut file = mode.open_options().open(path).await?;

    let mut data = Vec::new();
    match size {
        Some(n) if mode.is_binary() => {
            (&mut file).take(n as u64).read_to_end(&mut data).await?;
        }
        // A UTF-8 character is at most four bytes.
        Some(n) => {
            (&mut file)
                .take((n as u64).saturating_mul(4))
                .read_to_end(&mut data)
                .await?;
            trim_partial_char(&mut data);
        }
        None => {
            file.read_to_end(&mut data).await?;
        }
    }

    Contents::decode(data, mode, size)
}

/// Write `data` to a local file in `mode`.
pub(crate) async fn write_local(path: &Path, data: &[u8], mode: OpenMode) -> PathResult<()> {
    mode.require_writable()?;
    let mut file = mode.open_options().open(path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(())
}

/// Drop a trailing incomplete UTF-8 sequence left by a byte-limited read.
pub(crate) fn trim_partial_char(data: &mut Vec<u8>) {
    if let Err(e) = std::str::from_utf8(data) {
        if e.error_len().is_none() {
            data.truncate(e.valid_up_to());
        }
    }
}

/// A remote object opened for either reading or writing.
pub(crate) enum RemoteStream {
    Reader(Pin<Box<StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>>>),
    Writer(Pin<Box<BufWriter>>),
}

impl RemoteStream {
    pub(crate) fn reader(stream: BoxStream<'static, io::Result<Bytes>>) -> Self {
        RemoteStream::Reader(Box::pin(StreamReader::new(stream)))
    }

    pub(crate) fn writer(writer: BufWriter) -> Self {
        RemoteStream::Writer(Box::pin(writer))
    }
}

fn wrong_direction(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("remote stream not opened for {what}"),
    )
}

impl AsyncRead for RemoteStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            RemoteStream::Reader(r) => r.as_mut().poll_read(cx, buf),
            RemoteStream::Writer(_) => Poll::Ready(Err(wrong_direction("reading"))),
        }
    }
}

impl AsyncWrite for RemoteStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            RemoteStream::Writer(w) => w.as_mut().poll_write(cx, buf),
            RemoteStream::Reader(_) => Poll::Ready(Err(wrong_direction("writing"))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            RemoteStream::Writer(w) => w.as_mut().poll_flush(cx),
            RemoteStream::Reader(_) => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            RemoteStream::Writer(w) => w.as_mut().poll_shutdown(cx),
            RemoteStream::Reader(_) => Poll::Ready(Ok(())),
        }
    }
}

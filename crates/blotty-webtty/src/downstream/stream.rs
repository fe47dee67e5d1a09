//! Adapters from plain byte streams to the downstream traits.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use super::{closed, DownstreamReader, DownstreamWriter};
use crate::protocol::{self, RequestType, ResponseType};

/// Largest request a [`StreamReader`] accepts in one read.
const READ_BUFFER_SIZE: usize = 1024;

/// Reads requests from a byte stream, one `read` call per message.
///
/// Only suitable for transports that preserve message boundaries per read
/// (datagram-like pipes, test doubles).
pub struct StreamReader<R> {
    inner: Mutex<R>,
}

impl<R> StreamReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: Mutex::new(reader),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> DownstreamReader for StreamReader<R> {
    async fn read_message(&self) -> io::Result<(RequestType, Vec<u8>)> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let n = self
            .inner
            .lock()
            .await
            .read(&mut buffer)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "stream downstream read failed");
                closed()
            })?;
        let (kind, payload) = protocol::decode(&buffer[..n]).ok_or_else(closed)?;
        Ok((kind, payload.to_vec()))
    }
}

/// Decoration applied around each encoded frame by a [`StreamWriter`].
///
/// Rendered as `[<unix-nanos> ][<tag> ]<frame>[\n]`. With `newline` set,
/// line breaks and backslashes inside the frame are backslash-escaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineFormat {
    pub newline: bool,
    pub timestamp: bool,
    pub tag: Option<String>,
}

impl LineFormat {
    /// Undecorated frames.
    pub fn raw() -> Self {
        Self::default()
    }

    /// One frame per line.
    pub fn lines() -> Self {
        Self {
            newline: true,
            ..Self::default()
        }
    }

    /// One frame per line, prefixed with the write time.
    pub fn timestamped() -> Self {
        Self {
            newline: true,
            timestamp: true,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    fn render(&self, frame: Vec<u8>) -> Vec<u8> {
        if !self.newline && !self.timestamp && self.tag.is_none() {
            return frame;
        }
        let mut line = Vec::with_capacity(frame.len() + 32);
        if self.timestamp {
            let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
            line.extend_from_slice(format!("{nanos} ").as_bytes());
        }
        if let Some(tag) = &self.tag {
            line.extend_from_slice(tag.as_bytes());
            line.push(b' ');
        }
        if self.newline {
            escape_line_breaks(&frame, &mut line);
            line.push(b'\n');
        } else {
            line.extend_from_slice(&frame);
        }
        line
    }
}

/// Append `frame` to `out` with `\\`, `\n` and `\r` backslash-escaped, so a
/// newline-framed frame always stays on one line.
fn escape_line_breaks(frame: &[u8], out: &mut Vec<u8>) {
    for &byte in frame {
        match byte {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(byte),
        }
    }
}

/// Undo [`escape_line_breaks`]. Unknown escapes are kept as written.
pub(crate) fn unescape_line_breaks(line: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    let mut bytes = line.iter().copied();
    while let Some(byte) = bytes.next() {
        if byte != b'\\' {
            out.push(byte);
            continue;
        }
        match bytes.next() {
            Some(b'n') => out.push(b'\n'),
            Some(b'r') => out.push(b'\r'),
            Some(b'\\') => out.push(b'\\'),
            Some(other) => out.extend_from_slice(&[b'\\', other]),
            None => out.push(b'\\'),
        }
    }
    out
}

/// Writes encoded responses to a byte stream.
pub struct StreamWriter<W> {
    inner: Mutex<W>,
    format: LineFormat,
}

impl<W> StreamWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_format(writer, LineFormat::raw())
    }

    pub fn with_format(writer: W, format: LineFormat) -> Self {
        Self {
            inner: Mutex::new(writer),
            format,
        }
    }

    /// Give back the wrapped stream.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> DownstreamWriter for StreamWriter<W> {
    async fn write_message(&self, kind: ResponseType, data: &[u8]) -> io::Result<()> {
        let line = self.format.render(protocol::encode(kind.as_byte(), data));
        let mut inner = self.inner.lock().await;
        inner.write_all(&line).await?;
        inner.flush().await
    }
}

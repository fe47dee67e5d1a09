//! Session recordings: every response frame on its own timestamped line.
//!
//! A recording line is `<unix-nanos> <tag><payload>\n`. Output payloads
//! are base64; other payloads have their line breaks escaped, so every
//! frame stays on one line.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};

use super::stream::{unescape_line_breaks, LineFormat, StreamWriter};
use crate::protocol::ResponseType;

/// Create a new recording file in `dir` and a writer that appends to it.
pub async fn create_recording(dir: &Path) -> io::Result<(PathBuf, StreamWriter<File>)> {
    tokio::fs::create_dir_all(dir).await?;
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.9f");
    let path = dir.join(format!("blotty-{stamp}.log"));
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;
    tracing::info!(path = %path.display(), "recording session");
    Ok((path, StreamWriter::with_format(file, LineFormat::timestamped())))
}

/// One parsed recording line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFrame {
    /// Write time in unix nanoseconds, when the line carries one.
    pub at: Option<i64>,
    pub kind: ResponseType,
    pub payload: Vec<u8>,
}

/// Parse a recording line (without its trailing newline).
///
/// Lines without a timestamp prefix are accepted so plain newline-framed
/// captures replay too. A timestamp is a number of at least two digits
/// followed by a space; a lone tag byte followed by a space is a frame.
/// Returns `None` for blank lines.
pub fn parse_line(line: &str) -> Option<RecordedFrame> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return None;
    }
    let (at, frame) = match line.split_once(' ') {
        Some((stamp, rest)) if stamp.len() > 1 => match stamp.parse::<i64>() {
            Ok(at) => (Some(at), rest),
            Err(_) => (None, line),
        },
        _ => (None, line),
    };
    let frame = unescape_line_breaks(frame.as_bytes());
    let (&tag, payload) = frame.split_first()?;
    Some(RecordedFrame {
        at,
        kind: ResponseType::from_byte(tag),
        payload: payload.to_vec(),
    })
}

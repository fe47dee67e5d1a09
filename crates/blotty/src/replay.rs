//! `blotty replay`: play a session recording back to a terminal.

use std::path::Path;
use std::time::Duration;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use blotty_common::BlottyError;
use blotty_webtty::downstream::recording::parse_line;
use blotty_webtty::ResponseType;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Playback options.
#[derive(Debug, Clone, Copy)]
pub struct ReplayOptions {
    /// Multiplier applied to recorded timing; 2.0 plays twice as fast.
    pub speed: f64,
    pub no_delay: bool,
}

/// Replay the recording at `path` into `out`. Returns the number of
/// frames written.
pub async fn replay<W>(path: &Path, out: &mut W, options: ReplayOptions) -> Result<usize, BlottyError>
where
    W: AsyncWrite + Unpin,
{
    if !options.speed.is_finite() || options.speed <= 0.0 {
        return Err(BlottyError::Replay(format!(
            "speed must be a positive number, got {}",
            options.speed
        )));
    }

    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut previous: Option<i64> = None;
    let mut played = 0;
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let Some(frame) = parse_line(&line) else {
            continue;
        };

        if let (Some(at), Some(prev)) = (frame.at, previous) {
            let gap = at.saturating_sub(prev);
            if !options.no_delay && gap > 0 {
                let nanos = gap as f64 / options.speed;
                tokio::time::sleep(Duration::from_nanos(nanos as u64)).await;
            }
        }
        if frame.at.is_some() {
            previous = frame.at;
        }

        match frame.kind {
            ResponseType::Output => {
                let data = BASE64_STANDARD.decode(&frame.payload).map_err(|e| {
                    BlottyError::Replay(format!("line {line_no}: bad output payload: {e}"))
                })?;
                out.write_all(&data).await?;
            }
            ResponseType::SetWindowTitle => {
                out.write_all(b"\x1b]0;").await?;
                out.write_all(&frame.payload).await?;
                out.write_all(b"\x07").await?;
            }
            other => {
                tracing::debug!(line = line_no, kind = ?other, "skipping frame");
                continue;
            }
        }
        out.flush().await?;
        played += 1;
    }

    tracing::debug!(frames = played, path = %path.display(), "replay finished");
    Ok(played)
}

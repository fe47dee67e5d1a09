//! PTY I/O: the `Upstream` implementation plus process lifecycle.

use std::io::{self, Write};

use async_trait::async_trait;
use blotty_webtty::Upstream;
use portable_pty::{ExitStatus, PtySize};

use super::types::PtyUpstream;

fn poisoned() -> io::Error {
    io::Error::other("PTY lock poisoned")
}

// =============================================================================
// UPSTREAM
// =============================================================================

#[async_trait]
impl Upstream for PtyUpstream {
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut output = self.output.lock().await;
        if output.offset >= output.pending.len() {
            match output.rx.recv().await {
                Some(chunk) => {
                    output.pending = chunk;
                    output.offset = 0;
                }
                // Reader thread hit EOF: the process is gone.
                None => return Ok(0),
            }
        }
        let start = output.offset;
        let n = buf.len().min(output.pending.len() - start);
        buf[..n].copy_from_slice(&output.pending[start..start + n]);
        output.offset += n;
        Ok(n)
    }

    async fn write(&self, data: &[u8]) -> io::Result<usize> {
        let mut writer = self.writer.lock().map_err(|_| poisoned())?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(data.len())
    }

    async fn resize_terminal(&self, columns: u16, rows: u16) {
        let new_size = PtySize {
            rows,
            cols: columns,
            pixel_width: 0,
            pixel_height: 0,
        };
        let Ok(master) = self.master.lock() else {
            tracing::warn!("PTY master lock poisoned, skipping resize");
            return;
        };
        match master.resize(new_size) {
            Ok(()) => {
                if let Ok(mut size) = self.size.lock() {
                    *size = new_size;
                }
            }
            Err(e) => tracing::warn!(columns, rows, "PTY resize failed: {e}"),
        }
    }
}

// =============================================================================
// LIFECYCLE
// =============================================================================

impl PtyUpstream {
    /// Current terminal size as `(cols, rows)`.
    pub fn size(&self) -> (u16, u16) {
        self.size
            .lock()
            .map(|size| (size.cols, size.rows))
            .unwrap_or_default()
    }

    /// Kill the child process.
    pub fn kill(&self) {
        match self.child.lock() {
            Ok(mut child) => {
                if let Err(e) = child.kill() {
                    tracing::debug!("PTY kill error (may already be dead): {e}");
                }
            }
            Err(_) => tracing::warn!("PTY child lock poisoned, cannot kill"),
        }
    }

    /// Exit status if the child has already exited.
    pub fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        self.child.lock().map_err(|_| poisoned())?.try_wait()
    }

    /// Process id of the child, when the platform reports one.
    pub fn process_id(&self) -> Option<u32> {
        self.child.lock().ok()?.process_id()
    }
}

// =============================================================================
// TESTS
// =============================================================================

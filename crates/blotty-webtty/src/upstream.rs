//! The terminal side of the bridge.

use std::io;

use async_trait::async_trait;

/// A terminal process, usually the master side of a PTY.
///
/// `read` runs on one task while `write` and `resize_terminal` run on
/// another, so implementations must tolerate that concurrency.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Read terminal output into `buf`. `Ok(0)` means the terminal closed.
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Send input to the terminal.
    async fn write(&self, data: &[u8]) -> io::Result<usize>;

    /// Apply a new window size. Failures are the implementation's to report.
    async fn resize_terminal(&self, columns: u16, rows: u16);
}

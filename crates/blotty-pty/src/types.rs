//! PTY upstream types and errors.

use std::io::Write;
use std::sync::Mutex as StdMutex;

use portable_pty::{Child, MasterPty, PtySize};
use tokio::sync::{mpsc, Mutex};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Bytes read from the PTY master per chunk, matching the bridge buffer.
pub const PTY_READ_CHUNK: usize = 1_024;

/// Chunks buffered between the reader thread and the bridge.
pub(crate) const PTY_CHANNEL_DEPTH: usize = 64;

/// Default terminal columns.
pub const DEFAULT_COLS: u16 = 80;

/// Default terminal rows.
pub const DEFAULT_ROWS: u16 = 24;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors originating from PTY setup.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("failed to open PTY: {0}")]
    OpenFailed(String),

    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

// =============================================================================
// PTY UPSTREAM
// =============================================================================

/// Output chunks from the reader thread plus the unread tail of the last one.
pub(crate) struct OutputState {
    pub(crate) rx: mpsc::Receiver<Vec<u8>>,
    pub(crate) pending: Vec<u8>,
    pub(crate) offset: usize,
}

/// A command running in a PTY, usable as a bridge upstream.
///
/// Owns the master side of the pair. The caller decides when the process
/// dies: call [`PtyUpstream::kill`] to end the session, which closes the
/// output channel and releases a bridge blocked in `read`.
pub struct PtyUpstream {
    pub(crate) output: Mutex<OutputState>,
    /// Writer to send input bytes to the PTY.
    pub(crate) writer: StdMutex<Box<dyn Write + Send>>,
    /// Master PTY handle (for resize).
    pub(crate) master: StdMutex<Box<dyn MasterPty + Send>>,
    /// Child process handle (for wait / kill).
    pub(crate) child: StdMutex<Box<dyn Child + Send + Sync>>,
    pub(crate) size: StdMutex<PtySize>,
}

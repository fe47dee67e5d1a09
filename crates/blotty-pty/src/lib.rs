//! PTY upstream for the WebTTY bridge.
//!
//! Uses `portable-pty` to run a command inside a pseudo-terminal. A
//! background thread drains the master side into a channel so the bridge
//! can await output without blocking the runtime.

mod io;
mod spawn;
mod types;

pub use spawn::{build_command, spawn_command};
pub use types::{PtyError, PtyUpstream, DEFAULT_COLS, DEFAULT_ROWS, PTY_READ_CHUNK};

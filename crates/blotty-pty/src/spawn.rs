//! PTY spawn logic: run a command in a fresh PTY and start its reader thread.

use std::io::Read;
use std::sync::Mutex as StdMutex;
use std::thread;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use tokio::sync::{mpsc, Mutex};

use super::types::{OutputState, PtyError, PtyUpstream, PTY_CHANNEL_DEPTH, PTY_READ_CHUNK};

// =============================================================================
// ENVIRONMENT SANITIZATION
// =============================================================================

/// Environment variables the command inherits.
///
/// Everything else is dropped so server-side secrets never reach a shell
/// that a remote client may be typing into.
const ALLOWED_ENV_VARS: &[&str] = &[
    "HOME",
    "USER",
    "LOGNAME",
    "SHELL",
    "PATH",
    "LANG",
    "LC_ALL",
    "LC_CTYPE",
    "TMPDIR",
    "TZ",
    // Windows-specific
    "USERPROFILE",
    "SYSTEMROOT",
    "COMSPEC",
];

/// Build a sanitized `CommandBuilder` for `command` with `args`.
pub fn build_command(command: &str, args: &[String]) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(command);
    cmd.args(args);

    cmd.env_clear();
    for key in ALLOWED_ENV_VARS {
        if let Ok(val) = std::env::var(key) {
            cmd.env(key, val);
        }
    }
    cmd.env("TERM", "xterm-256color");

    if let Ok(cwd) = std::env::current_dir() {
        cmd.cwd(cwd);
    }

    cmd
}

// =============================================================================
// SPAWN
// =============================================================================

/// Run `command` in a new PTY of the given size.
pub fn spawn_command(
    command: &str,
    args: &[String],
    cols: u16,
    rows: u16,
) -> Result<PtyUpstream, PtyError> {
    let pty_system = native_pty_system();

    let size = PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    };

    let pair = pty_system
        .openpty(size)
        .map_err(|e| PtyError::OpenFailed(e.to_string()))?;

    let child = pair
        .slave
        .spawn_command(build_command(command, args))
        .map_err(|e| PtyError::SpawnFailed(format!("'{command}': {e}")))?;

    // Only the master is needed from here on.
    drop(pair.slave);

    let writer = pair
        .master
        .take_writer()
        .map_err(|e| PtyError::OpenFailed(format!("failed to take PTY writer: {e}")))?;

    let mut reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| PtyError::OpenFailed(format!("failed to clone PTY reader: {e}")))?;

    let (tx, rx) = mpsc::channel::<Vec<u8>>(PTY_CHANNEL_DEPTH);

    thread::Builder::new()
        .name("pty-reader".to_string())
        .spawn(move || {
            let mut buf = [0u8; PTY_READ_CHUNK];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break, // EOF
                    Ok(n) => {
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break; // upstream dropped
                        }
                    }
                    Err(e) => {
                        tracing::debug!("PTY reader error: {e}");
                        break;
                    }
                }
            }
        })?;

    tracing::info!(command, ?args, cols, rows, "spawned PTY command");

    Ok(PtyUpstream {
        output: Mutex::new(OutputState {
            rx,
            pending: Vec::new(),
            offset: 0,
        }),
        writer: StdMutex::new(writer),
        master: StdMutex::new(pair.master),
        child: StdMutex::new(child),
        size: StdMutex::new(size),
    })
}

// =============================================================================
// TESTS
// =============================================================================

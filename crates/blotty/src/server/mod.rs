//! `blotty serve`: accept websocket clients and bridge each to its own PTY.

mod connection;
mod downstream;

use std::path::PathBuf;
use std::sync::Arc;

use blotty_common::BlottyError;
use blotty_config::ServerConfig;
use blotty_pty::{DEFAULT_COLS, DEFAULT_ROWS};
use blotty_webtty::BridgeConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::title::{render_title, TitleVariables};

/// Everything a connection needs to start a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub command: String,
    pub args: Vec<String>,
    pub bridge: BridgeConfig,
    pub record_dir: Option<PathBuf>,
}

impl SessionSettings {
    pub fn new(config: &ServerConfig, command: &str, args: &[String]) -> Result<Self, BlottyError> {
        let title = render_title(
            &config.title_format,
            &TitleVariables::for_command(command, args),
        );

        let mut bridge = BridgeConfig::default()
            .with_permit_write(config.permit_write)
            .with_fixed_columns(config.width)
            .with_fixed_rows(config.height)
            .with_reconnect(config.reconnect_seconds())
            .with_window_title(title);
        if let Some(preferences) = config.preferences_json() {
            bridge = bridge
                .with_master_preferences(&preferences)
                .map_err(|e| BlottyError::Other(format!("invalid preferences: {e}")))?;
        }

        Ok(Self {
            command: command.to_string(),
            args: args.to_vec(),
            bridge,
            record_dir: config.record_dir.clone(),
        })
    }

    /// PTY size before the client sends its first resize.
    pub fn initial_size(&self) -> (u16, u16) {
        let columns = match self.bridge.fixed_columns {
            0 => DEFAULT_COLS,
            n => n,
        };
        let rows = match self.bridge.fixed_rows {
            0 => DEFAULT_ROWS,
            n => n,
        };
        (columns, rows)
    }
}

/// Accept connections until `graceful` or `force` fires, then wait for the
/// running sessions. `force` is handed down to every session.
pub async fn serve(
    listener: TcpListener,
    settings: Arc<SessionSettings>,
    graceful: CancellationToken,
    force: CancellationToken,
) {
    let tracker = TaskTracker::new();

    loop {
        tokio::select! {
            () = graceful.cancelled() => break,
            () = force.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(peer = %peer, "accepted TCP connection");
                    tracker.spawn(connection::handle_connection(
                        stream,
                        peer,
                        Arc::clone(&settings),
                        force.child_token(),
                    ));
                }
                Err(e) => tracing::warn!(error = %e, "TCP accept error"),
            },
        }
    }

    drop(listener);
    tracker.close();
    if !tracker.is_empty() {
        tracing::info!(sessions = tracker.len(), "waiting for sessions to finish");
    }
    tracker.wait().await;
    tracing::info!("server stopped");
}

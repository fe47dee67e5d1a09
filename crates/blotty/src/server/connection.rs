//! Per-connection handler: upgrade, spawn the PTY, run the bridge, clean up.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use blotty_pty::spawn_command;
use blotty_webtty::downstream::recording::create_recording;
use blotty_webtty::{
    CoalescingWriter, DownstreamReader, DownstreamWriter, Upstream, WebTty, PROTOCOLS,
};
use tokio::net::TcpStream;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, SEC_WEBSOCKET_PROTOCOL};
use tokio_util::sync::CancellationToken;

use super::downstream::WebSocketDownstream;
use super::SessionSettings;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pick the first subprotocol offered by the client that we speak.
///
/// Each header value may list several protocols separated by commas.
pub fn select_subprotocol<'a>(offered: impl IntoIterator<Item = &'a str>) -> Option<&'static str> {
    offered
        .into_iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .find_map(|name| PROTOCOLS.iter().copied().find(|known| *known == name))
}

fn negotiate(request: &Request, mut response: Response) -> Result<Response, ErrorResponse> {
    let offered = request
        .headers()
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok());
    match select_subprotocol(offered) {
        Some(protocol) => {
            response
                .headers_mut()
                .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(protocol));
        }
        None => tracing::debug!("client offered no known subprotocol"),
    }
    Ok(response)
}

/// Handle a single client from TCP accept to teardown.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    settings: Arc<SessionSettings>,
    cancel: CancellationToken,
) {
    let ws = match accept_hdr_async(stream, negotiate).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "WS handshake failed");
            return;
        }
    };
    let downstream = Arc::new(WebSocketDownstream::new(ws));

    let (columns, rows) = settings.initial_size();
    let pty = match spawn_command(&settings.command, &settings.args, columns, rows) {
        Ok(pty) => Arc::new(pty),
        Err(e) => {
            tracing::error!(peer = %peer, error = %e, "failed to start command");
            close(&downstream).await;
            return;
        }
    };

    let writer: Arc<dyn DownstreamWriter> = match &settings.record_dir {
        Some(dir) => match create_recording(dir).await {
            Ok((_, recording)) => {
                let writers: Vec<Box<dyn DownstreamWriter>> =
                    vec![Box::new(Arc::clone(&downstream)), Box::new(recording)];
                Arc::new(CoalescingWriter::new(writers))
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "recording disabled");
                downstream.clone()
            }
        },
        None => downstream.clone(),
    };
    let reader: Arc<dyn DownstreamReader> = downstream.clone();
    let upstream: Arc<dyn Upstream> = pty.clone();

    tracing::info!(peer = %peer, pid = ?pty.process_id(), "session started");

    let tty = WebTty::with_split(upstream, reader, writer, settings.bridge.clone());
    let cause = tty.run(cancel).await;
    if cause.is_disconnect() {
        tracing::info!(peer = %peer, "session closed: {cause}");
    } else {
        tracing::warn!(peer = %peer, "session failed: {cause}");
    }

    // Closing both transports releases whichever pump is still blocked.
    close(&downstream).await;
    pty.kill();
    match pty.try_wait() {
        Ok(Some(status)) => tracing::debug!(peer = %peer, ?status, "command exited"),
        Ok(None) => tracing::debug!(peer = %peer, "command still exiting"),
        Err(e) => tracing::debug!(peer = %peer, error = %e, "could not query command status"),
    }
}

async fn close<S>(downstream: &WebSocketDownstream<S>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    if tokio::time::timeout(CLOSE_TIMEOUT, downstream.close())
        .await
        .is_err()
    {
        tracing::debug!("websocket close timed out");
    }
}

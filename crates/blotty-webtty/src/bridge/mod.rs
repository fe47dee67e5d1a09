//! The bridge orchestrator: handshake, then two pumps until one fails.
//!
//! `run` writes the initialization frames, spawns one task draining the
//! upstream into `Output` frames and one task dispatching client requests,
//! and returns the first terminal cause. The losing pump keeps running
//! until its transport is closed by the caller; `WebTty` never closes the
//! upstream or downstream.

mod handshake;
mod pump;

#[cfg(test)]
mod tests;

use std::io;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::downstream::{Downstream, DownstreamReader, DownstreamWriter};
use crate::error::BridgeError;
use crate::protocol::ResponseType;
use crate::upstream::Upstream;

/// Funnels every downstream write through one lock so frames never
/// interleave.
struct SerializedWriter {
    inner: Arc<dyn DownstreamWriter>,
    lock: Mutex<()>,
}

impl SerializedWriter {
    async fn write(&self, kind: ResponseType, data: &[u8]) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        self.inner.write_message(kind, data).await
    }
}

/// State shared by both pumps.
struct Session {
    upstream: Arc<dyn Upstream>,
    writer: SerializedWriter,
    config: BridgeConfig,
}

/// Bridges one upstream terminal and one downstream client.
pub struct WebTty {
    session: Arc<Session>,
    reader: Arc<dyn DownstreamReader>,
}

impl WebTty {
    /// Bridge `upstream` with a downstream that both reads and writes.
    pub fn new<D: Downstream + 'static>(
        upstream: Arc<dyn Upstream>,
        downstream: Arc<D>,
        config: BridgeConfig,
    ) -> Self {
        let reader: Arc<dyn DownstreamReader> = downstream.clone();
        let writer: Arc<dyn DownstreamWriter> = downstream;
        Self::with_split(upstream, reader, writer, config)
    }

    /// Bridge `upstream` with separate downstream halves.
    pub fn with_split(
        upstream: Arc<dyn Upstream>,
        reader: Arc<dyn DownstreamReader>,
        writer: Arc<dyn DownstreamWriter>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            session: Arc::new(Session {
                upstream,
                writer: SerializedWriter {
                    inner: writer,
                    lock: Mutex::new(()),
                },
                config,
            }),
            reader,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.session.config
    }

    /// Run the session until `cancel` fires or either pump fails.
    ///
    /// Always returns the terminal cause. Cancellation does not interrupt a
    /// pump blocked in a read; close the transports to release it.
    pub async fn run(&self, cancel: CancellationToken) -> BridgeError {
        if let Err(e) = self.session.send_initialize_message().await {
            return e;
        }

        let (errs_tx, mut errs_rx) = mpsc::channel::<BridgeError>(2);

        let session = Arc::clone(&self.session);
        let tx = errs_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(session.pump_upstream().await).await;
        });

        let session = Arc::clone(&self.session);
        let reader = Arc::clone(&self.reader);
        tokio::spawn(async move {
            let _ = errs_tx.send(session.pump_downstream(reader).await).await;
        });

        let cause = tokio::select! {
            () = cancel.cancelled() => BridgeError::Cancelled,
            Some(err) = errs_rx.recv() => err,
        };
        tracing::debug!(cause = %cause, "bridge session finished");
        cause
    }
}

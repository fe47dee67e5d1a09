//! The two long-lived pump loops and request dispatch.

use std::io;
use std::sync::Arc;

use base64::prelude::{Engine as _, BASE64_STANDARD};

use super::Session;
use crate::downstream::DownstreamReader;
use crate::error::{BridgeError, WriteTarget};
use crate::protocol::{RequestType, ResizeRequest, ResponseType};

impl Session {
    /// Drain the upstream into base64 `Output` frames.
    pub(super) async fn pump_upstream(&self) -> BridgeError {
        let mut buffer = vec![0u8; self.config.buffer_size];
        loop {
            let n = match self.upstream.read(&mut buffer).await {
                Ok(0) => return BridgeError::UpstreamClosed,
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(error = %e, "upstream read failed");
                    return BridgeError::UpstreamClosed;
                }
            };

            let safe_message = BASE64_STANDARD.encode(&buffer[..n]);
            if let Err(source) = self
                .writer
                .write(ResponseType::Output, safe_message.as_bytes())
                .await
            {
                return BridgeError::WriteFailed {
                    target: WriteTarget::Downstream,
                    source,
                };
            }
        }
    }

    /// Read client requests and act on them.
    pub(super) async fn pump_downstream(&self, reader: Arc<dyn DownstreamReader>) -> BridgeError {
        loop {
            let (kind, data) = match reader.read_message().await {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(error = %e, "downstream read failed");
                    return BridgeError::DownstreamClosed;
                }
            };

            if let Err(e) = self.handle_request(kind, &data).await {
                return e;
            }
        }
    }

    async fn handle_request(&self, kind: RequestType, data: &[u8]) -> Result<(), BridgeError> {
        match kind {
            RequestType::Input => self.handle_input(data).await,
            RequestType::Ping => self
                .writer
                .write(ResponseType::Pong, &[])
                .await
                .map_err(|source| BridgeError::WriteFailed {
                    target: WriteTarget::Downstream,
                    source,
                }),
            RequestType::ResizeTerminal => {
                let args =
                    ResizeRequest::parse(data).map_err(BridgeError::MalformedResizePayload)?;
                let (columns, rows) = self.config.effective_size(args.columns, args.rows);
                tracing::debug!(columns, rows, "resizing terminal");
                self.upstream.resize_terminal(columns, rows).await;
                Ok(())
            }
            RequestType::Unrecognized => Err(BridgeError::UnrecognizedRequestType(kind)),
        }
    }

    async fn handle_input(&self, data: &[u8]) -> Result<(), BridgeError> {
        if !self.config.permit_write {
            return Ok(());
        }
        let mut remaining = data;
        while !remaining.is_empty() {
            let written = match self.upstream.write(remaining).await {
                Ok(0) => Err(io::Error::from(io::ErrorKind::WriteZero)),
                other => other,
            }
            .map_err(|source| BridgeError::WriteFailed {
                target: WriteTarget::Upstream,
                source,
            })?;
            remaining = &remaining[written.min(remaining.len())..];
        }
        Ok(())
    }
}

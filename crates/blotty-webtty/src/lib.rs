//! WebTTY bridge between a terminal upstream and a framed downstream.
//!
//! The bridge speaks a small tag-prefixed protocol over the downstream:
//! terminal output travels base64-encoded in `Output` frames, and the
//! client drives input, keep-alive and resizing with request frames.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! # async fn demo(
//! #     upstream: std::sync::Arc<dyn blotty_webtty::Upstream>,
//! #     downstream: std::sync::Arc<impl blotty_webtty::Downstream + 'static>,
//! # ) {
//! use blotty_webtty::{BridgeConfig, WebTty};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = BridgeConfig::default()
//!     .with_permit_write(true)
//!     .with_window_title("bash@host");
//! let tty = WebTty::new(upstream, downstream, config);
//! let cause = tty.run(CancellationToken::new()).await;
//! tracing::info!("session ended: {cause}");
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod downstream;
pub mod error;
pub mod protocol;
pub mod upstream;

pub use bridge::WebTty;
pub use config::{BridgeConfig, DEFAULT_BUFFER_SIZE};
pub use downstream::{
    CoalescingWriter, Downstream, DownstreamReader, DownstreamWriter, LineFormat, StreamReader,
    StreamWriter,
};
pub use error::{BridgeError, HandshakeStep, WriteTarget};
pub use protocol::{RequestType, ResizeRequest, ResponseType, PROTOCOLS};
pub use upstream::Upstream;

//! The client side of the bridge, usually a websocket connection.
//!
//! Besides the capability traits this module carries the adapters the
//! binary composes: byte-stream readers and writers, a fan-out writer for
//! recording sessions, and the recording file itself.

mod coalescing;
pub mod recording;
mod stream;

use std::io;
use std::sync::Arc;

use async_trait::async_trait;

use crate::protocol::{RequestType, ResponseType};

pub use coalescing::CoalescingWriter;
pub use stream::{LineFormat, StreamReader, StreamWriter};

/// Receives framed requests from the client.
#[async_trait]
pub trait DownstreamReader: Send + Sync {
    /// Read one request. An error means the transport is gone.
    async fn read_message(&self) -> io::Result<(RequestType, Vec<u8>)>;
}

/// Sends framed responses to the client.
#[async_trait]
pub trait DownstreamWriter: Send + Sync {
    async fn write_message(&self, kind: ResponseType, data: &[u8]) -> io::Result<()>;
}

/// Both halves of a client connection.
pub trait Downstream: DownstreamReader + DownstreamWriter {}

impl<T: DownstreamReader + DownstreamWriter> Downstream for T {}

#[async_trait]
impl<T: DownstreamWriter + ?Sized> DownstreamWriter for Arc<T> {
    async fn write_message(&self, kind: ResponseType, data: &[u8]) -> io::Result<()> {
        (**self).write_message(kind, data).await
    }
}

/// Error returned by adapters once their transport has closed.
pub(crate) fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "downstream closed")
}

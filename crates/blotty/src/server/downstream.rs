//! Websocket downstream: one websocket message per protocol frame.

use std::io;

use async_trait::async_trait;
use blotty_webtty::protocol::{self, RequestType, ResponseType};
use blotty_webtty::{DownstreamReader, DownstreamWriter};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "websocket closed")
}

/// A websocket connection split into independently locked halves, so the
/// bridge can read and write from different tasks.
pub struct WebSocketDownstream<S> {
    sink: Mutex<SplitSink<WebSocketStream<S>, Message>>,
    stream: Mutex<SplitStream<WebSocketStream<S>>>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> WebSocketDownstream<S> {
    pub fn new(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }

    /// Send a close frame. A reader blocked on this connection wakes up
    /// once the peer answers or the socket drops.
    pub async fn close(&self) {
        if let Err(e) = self.sink.lock().await.close().await {
            tracing::debug!(error = %e, "websocket close failed");
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> DownstreamReader for WebSocketDownstream<S> {
    async fn read_message(&self) -> io::Result<(RequestType, Vec<u8>)> {
        let mut stream = self.stream.lock().await;
        loop {
            let data = match stream.next().await {
                Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(Message::Binary(data))) => data.to_vec(),
                Some(Ok(Message::Close(_))) | None => return Err(closed()),
                // Control frames are answered by tungstenite itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "websocket read error");
                    return Err(closed());
                }
            };
            let (kind, payload) = protocol::decode(&data).ok_or_else(closed)?;
            return Ok((kind, payload.to_vec()));
        }
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Unpin + Send> DownstreamWriter for WebSocketDownstream<S> {
    async fn write_message(&self, kind: ResponseType, data: &[u8]) -> io::Result<()> {
        let frame = protocol::encode(kind.as_byte(), data);
        // Output is base64 and titles are usually UTF-8; anything else
        // travels as a binary message.
        let message = match String::from_utf8(frame) {
            Ok(text) => Message::Text(text.into()),
            Err(e) => Message::Binary(e.into_bytes().into()),
        };
        self.sink
            .lock()
            .await
            .send(message)
            .await
            .map_err(io::Error::other)
    }
}

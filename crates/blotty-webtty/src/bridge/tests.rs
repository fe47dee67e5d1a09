//! Bridge behavior against in-memory upstream and downstream doubles.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::error::{HandshakeStep, WriteTarget};
use crate::protocol::RequestType;

const WAIT: Duration = Duration::from_secs(5);

// =============================================================================
// DOUBLES
// =============================================================================

struct MockUpstream {
    output: Mutex<mpsc::UnboundedReceiver<io::Result<Vec<u8>>>>,
    written: StdMutex<Vec<u8>>,
    resizes: StdMutex<Vec<(u16, u16)>>,
    fail_writes: bool,
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self.output.lock().await.recv().await {
            Some(Ok(chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            None => Ok(0),
        }
    }

    async fn write(&self, data: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pty gone"));
        }
        self.written.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    async fn resize_terminal(&self, columns: u16, rows: u16) {
        self.resizes.lock().unwrap().push((columns, rows));
    }
}

struct MockDownstream {
    incoming: Mutex<mpsc::UnboundedReceiver<(RequestType, Vec<u8>)>>,
    frames: mpsc::UnboundedSender<(ResponseType, Vec<u8>)>,
    /// Every frame as `tag payload \n`, written in two steps so that
    /// unserialized writers would interleave.
    wire: StdMutex<Vec<u8>>,
    writes: AtomicUsize,
    fail_after: Option<usize>,
}

#[async_trait]
impl DownstreamReader for MockDownstream {
    async fn read_message(&self) -> io::Result<(RequestType, Vec<u8>)> {
        self.incoming
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
    }
}

#[async_trait]
impl DownstreamWriter for MockDownstream {
    async fn write_message(&self, kind: ResponseType, data: &[u8]) -> io::Result<()> {
        let count = self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| count >= limit) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "socket gone"));
        }
        self.wire.lock().unwrap().push(kind.as_byte());
        tokio::task::yield_now().await;
        {
            let mut wire = self.wire.lock().unwrap();
            wire.extend_from_slice(data);
            wire.push(b'\n');
        }
        let _ = self.frames.send((kind, data.to_vec()));
        Ok(())
    }
}

struct Harness {
    upstream_tx: Option<mpsc::UnboundedSender<io::Result<Vec<u8>>>>,
    client_tx: Option<mpsc::UnboundedSender<(RequestType, Vec<u8>)>>,
    frames_rx: mpsc::UnboundedReceiver<(ResponseType, Vec<u8>)>,
    upstream: Arc<MockUpstream>,
    downstream: Arc<MockDownstream>,
    cancel: CancellationToken,
}

fn harness_with(fail_upstream_writes: bool, fail_downstream_after: Option<usize>) -> Harness {
    let (upstream_tx, upstream_rx) = mpsc::unbounded_channel();
    let (client_tx, client_rx) = mpsc::unbounded_channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    Harness {
        upstream_tx: Some(upstream_tx),
        client_tx: Some(client_tx),
        frames_rx,
        upstream: Arc::new(MockUpstream {
            output: Mutex::new(upstream_rx),
            written: StdMutex::new(Vec::new()),
            resizes: StdMutex::new(Vec::new()),
            fail_writes: fail_upstream_writes,
        }),
        downstream: Arc::new(MockDownstream {
            incoming: Mutex::new(client_rx),
            frames: frames_tx,
            wire: StdMutex::new(Vec::new()),
            writes: AtomicUsize::new(0),
            fail_after: fail_downstream_after,
        }),
        cancel: CancellationToken::new(),
    }
}

fn harness() -> Harness {
    harness_with(false, None)
}

impl Harness {
    fn start(&self, config: BridgeConfig) -> JoinHandle<BridgeError> {
        let tty = WebTty::new(self.upstream.clone(), self.downstream.clone(), config);
        let cancel = self.cancel.clone();
        tokio::spawn(async move { tty.run(cancel).await })
    }

    fn terminal_output(&self, bytes: &[u8]) {
        self.upstream_tx
            .as_ref()
            .unwrap()
            .send(Ok(bytes.to_vec()))
            .unwrap();
    }

    fn client_sends(&self, kind: RequestType, payload: &[u8]) {
        self.client_tx
            .as_ref()
            .unwrap()
            .send((kind, payload.to_vec()))
            .unwrap();
    }

    async fn next_frame(&mut self) -> (ResponseType, Vec<u8>) {
        tokio::time::timeout(WAIT, self.frames_rx.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("frame channel closed")
    }

    /// Round-trip a ping so every earlier request has been handled.
    async fn sync(&mut self) {
        self.client_sends(RequestType::Ping, &[]);
        loop {
            if self.next_frame().await.0 == ResponseType::Pong {
                return;
            }
        }
    }
}

async fn finish(handle: JoinHandle<BridgeError>) -> BridgeError {
    tokio::time::timeout(WAIT, handle)
        .await
        .expect("run did not finish")
        .expect("run panicked")
}

fn title(text: &str) -> (ResponseType, Vec<u8>) {
    (ResponseType::SetWindowTitle, text.as_bytes().to_vec())
}

// =============================================================================
// HANDSHAKE
// =============================================================================

#[tokio::test]
async fn handshake_sends_only_title_by_default() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default().with_window_title("sess1"));

    assert_eq!(h.next_frame().await, title("sess1"));

    h.upstream_tx = None;
    assert!(matches!(finish(handle).await, BridgeError::UpstreamClosed));
    assert!(h.frames_rx.try_recv().is_err());
}

#[tokio::test]
async fn handshake_sends_empty_title() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default());

    assert_eq!(h.next_frame().await, title(""));
    h.cancel.cancel();
    assert!(matches!(finish(handle).await, BridgeError::Cancelled));
}

#[tokio::test]
async fn handshake_orders_title_reconnect_preferences() {
    let mut h = harness();
    h.terminal_output(b"$ ");
    let config = BridgeConfig::default()
        .with_window_title("sess1")
        .with_reconnect(5)
        .with_master_preferences(&serde_json::json!({"font-size": 14}))
        .unwrap();
    let handle = h.start(config);

    assert_eq!(h.next_frame().await, title("sess1"));
    assert_eq!(
        h.next_frame().await,
        (ResponseType::SetReconnect, b"5".to_vec())
    );
    assert_eq!(
        h.next_frame().await,
        (ResponseType::SetPreferences, br#"{"font-size":14}"#.to_vec())
    );
    let (kind, payload) = h.next_frame().await;
    assert_eq!(kind, ResponseType::Output);
    assert_eq!(BASE64_STANDARD.decode(payload).unwrap(), b"$ ");

    h.cancel.cancel();
    finish(handle).await;
}

#[tokio::test]
async fn handshake_failure_never_starts_pumps() {
    let h = harness_with(false, Some(0));
    h.terminal_output(b"pending");
    let handle = h.start(BridgeConfig::default());

    match finish(handle).await {
        BridgeError::HandshakeWriteFailed { step, .. } => {
            assert_eq!(step, HandshakeStep::WindowTitle);
        }
        other => panic!("unexpected cause: {other}"),
    }
    // The upstream was never read.
    assert!(h.upstream.output.lock().await.try_recv().is_ok());
}

#[tokio::test]
async fn handshake_failure_reports_reconnect_step() {
    let h = harness_with(false, Some(1));
    let handle = h.start(BridgeConfig::default().with_reconnect(3));

    match finish(handle).await {
        BridgeError::HandshakeWriteFailed { step, .. } => {
            assert_eq!(step, HandshakeStep::Reconnect);
        }
        other => panic!("unexpected cause: {other}"),
    }
}

#[tokio::test]
async fn handshake_failure_reports_preferences_step() {
    let prefs = serde_json::json!({"font-size": 14});

    // Title and reconnect go out, preferences fail.
    let h = harness_with(false, Some(2));
    let config = BridgeConfig::default()
        .with_reconnect(3)
        .with_master_preferences(&prefs)
        .unwrap();
    match finish(h.start(config)).await {
        BridgeError::HandshakeWriteFailed { step, .. } => {
            assert_eq!(step, HandshakeStep::Preferences);
        }
        other => panic!("unexpected cause: {other}"),
    }

    // Without a reconnect frame, preferences are the second write.
    let h = harness_with(false, Some(1));
    let config = BridgeConfig::default()
        .with_master_preferences(&prefs)
        .unwrap();
    match finish(h.start(config)).await {
        BridgeError::HandshakeWriteFailed { step, .. } => {
            assert_eq!(step, HandshakeStep::Preferences);
        }
        other => panic!("unexpected cause: {other}"),
    }
}

// =============================================================================
// UPSTREAM -> DOWNSTREAM
// =============================================================================

#[tokio::test]
async fn output_is_base64_encoded() {
    let mut h = harness();
    let raw = [0u8, 0xff, b'h', b'i', 0x1b, b'['];
    let handle = h.start(BridgeConfig::default());
    h.next_frame().await;

    h.terminal_output(&raw);
    let (kind, payload) = h.next_frame().await;
    assert_eq!(kind, ResponseType::Output);
    assert_eq!(payload, BASE64_STANDARD.encode(raw).into_bytes());
    assert_eq!(BASE64_STANDARD.decode(&payload).unwrap(), raw);

    h.cancel.cancel();
    finish(handle).await;
}

#[tokio::test]
async fn upstream_read_error_ends_session() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default());
    h.next_frame().await;

    h.upstream_tx
        .as_ref()
        .unwrap()
        .send(Err(io::Error::new(io::ErrorKind::Other, "EIO")))
        .unwrap();
    assert!(matches!(finish(handle).await, BridgeError::UpstreamClosed));
}

#[tokio::test]
async fn downstream_write_failure_ends_session() {
    let h = harness_with(false, Some(1));
    let handle = h.start(BridgeConfig::default());

    h.terminal_output(b"output");
    match finish(handle).await {
        BridgeError::WriteFailed { target, .. } => assert_eq!(target, WriteTarget::Downstream),
        other => panic!("unexpected cause: {other}"),
    }
}

#[tokio::test]
async fn upstream_closure_leaves_downstream_pump_running() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default());
    h.next_frame().await;

    h.upstream_tx = None;
    assert!(matches!(finish(handle).await, BridgeError::UpstreamClosed));

    // Nobody stopped the request pump; it still answers pings.
    h.client_sends(RequestType::Ping, &[]);
    assert_eq!(h.next_frame().await, (ResponseType::Pong, Vec::new()));

    // Closing the transport is what finally releases it.
    h.client_tx = None;
}

// =============================================================================
// DOWNSTREAM -> UPSTREAM
// =============================================================================

#[tokio::test]
async fn input_is_discarded_without_permit_write() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default());
    h.next_frame().await;

    h.client_sends(RequestType::Input, b"rm -rf /\r");
    h.sync().await;

    assert!(h.upstream.written.lock().unwrap().is_empty());
    h.cancel.cancel();
    assert!(matches!(finish(handle).await, BridgeError::Cancelled));
}

#[tokio::test]
async fn input_is_forwarded_with_permit_write() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default().with_permit_write(true));
    h.next_frame().await;

    h.client_sends(RequestType::Input, b"ls -la\r");
    h.client_sends(RequestType::Input, b"");
    h.client_sends(RequestType::Input, b"\x03");
    h.sync().await;

    assert_eq!(h.upstream.written.lock().unwrap().as_slice(), b"ls -la\r\x03");
    h.cancel.cancel();
    finish(handle).await;
}

#[tokio::test]
async fn upstream_write_failure_ends_session() {
    let h = harness_with(true, None);
    let handle = h.start(BridgeConfig::default().with_permit_write(true));

    h.client_sends(RequestType::Input, b"x");
    match finish(handle).await {
        BridgeError::WriteFailed { target, .. } => assert_eq!(target, WriteTarget::Upstream),
        other => panic!("unexpected cause: {other}"),
    }
}

#[tokio::test]
async fn ping_gets_empty_pong() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default());
    h.next_frame().await;

    for _ in 0..3 {
        h.client_sends(RequestType::Ping, &[]);
        assert_eq!(h.next_frame().await, (ResponseType::Pong, Vec::new()));
    }
    h.cancel.cancel();
    finish(handle).await;
}

#[tokio::test]
async fn resize_uses_client_dimensions() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default());
    h.next_frame().await;

    h.client_sends(RequestType::ResizeTerminal, br#"{"Columns":80,"Rows":24}"#);
    h.client_sends(RequestType::ResizeTerminal, br#"{"columns":100.6,"rows":30.2}"#);
    h.sync().await;

    assert_eq!(
        h.upstream.resizes.lock().unwrap().as_slice(),
        &[(80, 24), (100, 30)]
    );
    h.cancel.cancel();
    finish(handle).await;
}

#[tokio::test]
async fn resize_prefers_fixed_columns() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default().with_fixed_columns(132));
    h.next_frame().await;

    h.client_sends(RequestType::ResizeTerminal, br#"{"Columns":80,"Rows":24}"#);
    h.sync().await;

    assert_eq!(h.upstream.resizes.lock().unwrap().as_slice(), &[(132, 24)]);
    h.cancel.cancel();
    finish(handle).await;
}

#[tokio::test]
async fn resize_has_no_acknowledgment() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default());
    h.next_frame().await;

    h.client_sends(RequestType::ResizeTerminal, br#"{"Columns":80,"Rows":24}"#);
    h.sync().await;
    assert!(h.frames_rx.try_recv().is_err());

    h.cancel.cancel();
    finish(handle).await;
}

#[tokio::test]
async fn malformed_resize_is_fatal() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default());
    h.next_frame().await;

    h.client_sends(RequestType::ResizeTerminal, b"80x24");
    assert!(matches!(
        finish(handle).await,
        BridgeError::MalformedResizePayload(_)
    ));
    assert!(h.upstream.resizes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unrecognized_request_is_fatal() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default());
    h.next_frame().await;

    h.client_sends(RequestType::Unrecognized, b"?");
    assert!(matches!(
        finish(handle).await,
        BridgeError::UnrecognizedRequestType(RequestType::Unrecognized)
    ));
}

#[tokio::test]
async fn downstream_closure_ends_session() {
    let mut h = harness();
    let handle = h.start(BridgeConfig::default());
    h.next_frame().await;

    h.client_tx = None;
    assert!(matches!(finish(handle).await, BridgeError::DownstreamClosed));
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_never_interleave() {
    const CHUNKS: usize = 200;

    let mut h = harness();
    let handle = h.start(BridgeConfig::default().with_window_title("race"));

    for i in 0..CHUNKS {
        h.terminal_output(format!("chunk-{i}").as_bytes());
        h.client_sends(RequestType::Ping, &[]);
    }
    // title + every output + every pong
    for _ in 0..(1 + 2 * CHUNKS) {
        h.next_frame().await;
    }
    h.cancel.cancel();
    finish(handle).await;

    let wire = h.downstream.wire.lock().unwrap().clone();
    let mut outputs = Vec::new();
    let mut pongs = 0;
    let lines: Vec<&[u8]> = wire.split(|&b| b == b'\n').filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 1 + 2 * CHUNKS);
    assert_eq!(lines[0], b"3race");
    for line in &lines[1..] {
        let (&tag, payload) = line.split_first().unwrap();
        match ResponseType::from_byte(tag) {
            ResponseType::Output => {
                let raw = BASE64_STANDARD.decode(payload).expect("frame was split");
                outputs.push(String::from_utf8(raw).unwrap());
            }
            ResponseType::Pong => {
                assert!(payload.is_empty(), "pong carried {payload:?}");
                pongs += 1;
            }
            other => panic!("corrupt frame tag {other:?}"),
        }
    }

    assert_eq!(pongs, CHUNKS);
    let expected: Vec<String> = (0..CHUNKS).map(|i| format!("chunk-{i}")).collect();
    assert_eq!(outputs, expected);
}

#[tokio::test]
async fn split_reader_and_writer() {
    let h = harness();
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
    let (_unused_tx, unused_rx) = mpsc::unbounded_channel();
    let writer = Arc::new(MockDownstream {
        incoming: Mutex::new(unused_rx),
        frames: frames_tx,
        wire: StdMutex::new(Vec::new()),
        writes: AtomicUsize::new(0),
        fail_after: None,
    });

    let tty = WebTty::with_split(
        h.upstream.clone(),
        h.downstream.clone(),
        writer,
        BridgeConfig::default().with_window_title("split"),
    );
    assert_eq!(tty.config().window_title, b"split");
    let cancel = h.cancel.clone();
    let handle = tokio::spawn(async move { tty.run(cancel).await });

    h.client_sends(RequestType::Ping, &[]);
    let first = tokio::time::timeout(WAIT, frames_rx.recv()).await.unwrap();
    assert_eq!(first, Some(title("split")));
    let second = tokio::time::timeout(WAIT, frames_rx.recv()).await.unwrap();
    assert_eq!(second, Some((ResponseType::Pong, Vec::new())));

    h.cancel.cancel();
    finish(handle).await;
}

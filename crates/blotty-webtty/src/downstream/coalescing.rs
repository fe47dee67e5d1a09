use std::io;

use async_trait::async_trait;

use super::DownstreamWriter;
use crate::protocol::ResponseType;

/// Forwards every frame to each inner writer, in order.
///
/// The first failing writer aborts the frame; later writers do not see it.
pub struct CoalescingWriter {
    writers: Vec<Box<dyn DownstreamWriter>>,
}

impl CoalescingWriter {
    pub fn new(writers: Vec<Box<dyn DownstreamWriter>>) -> Self {
        Self { writers }
    }

    pub fn push(&mut self, writer: Box<dyn DownstreamWriter>) {
        self.writers.push(writer);
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

#[async_trait]
impl DownstreamWriter for CoalescingWriter {
    async fn write_message(&self, kind: ResponseType, data: &[u8]) -> io::Result<()> {
        for writer in &self.writers {
            writer.write_message(kind, data).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Capture {
        frames: Mutex<Vec<(ResponseType, Vec<u8>)>>,
        fail: bool,
    }

    #[async_trait]
    impl DownstreamWriter for Capture {
        async fn write_message(&self, kind: ResponseType, data: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "capture failed"));
            }
            self.frames.lock().unwrap().push((kind, data.to_vec()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn forwards_to_every_writer() {
        let a = Arc::new(Capture::default());
        let b = Arc::new(Capture::default());
        let writer = CoalescingWriter::new(vec![Box::new(a.clone()), Box::new(b.clone())]);
        assert_eq!(writer.len(), 2);

        writer
            .write_message(ResponseType::SetWindowTitle, b"t")
            .await
            .unwrap();

        for capture in [&a, &b] {
            let frames = capture.frames.lock().unwrap();
            assert_eq!(frames.as_slice(), &[(ResponseType::SetWindowTitle, b"t".to_vec())]);
        }
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let failing = Arc::new(Capture {
            fail: true,
            ..Capture::default()
        });
        let after = Arc::new(Capture::default());
        let mut writer = CoalescingWriter::new(Vec::new());
        assert!(writer.is_empty());
        writer.push(Box::new(failing));
        writer.push(Box::new(after.clone()));

        let result = writer.write_message(ResponseType::Pong, &[]).await;
        assert!(result.is_err());
        assert!(after.frames.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_writer_accepts_frames() {
        let writer = CoalescingWriter::new(Vec::new());
        assert!(writer.write_message(ResponseType::Pong, &[]).await.is_ok());
    }
}

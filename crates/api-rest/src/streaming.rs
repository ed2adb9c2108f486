//! Bridges between async bodies and blocking storage I/O.
//!
//! Downloads: a producer runs on the blocking pool and writes into a [`ChannelWriter`]; each
//! write becomes one body chunk. If the producer fails, an error chunk is sent and the response
//! is aborted mid-stream.
//!
//! Uploads: the handler pushes request chunks into a channel and the blocking store reads them
//! back through a [`ChannelReader`].
//!
//! Both channels are bounded, so the slower side stalls the faster one instead of buffering the
//! whole payload.

use axum::body::{Body, Bytes};
use std::fmt::Display;
use std::io::{self, Read, Write};
use tokio::sync::mpsc;

/// Chunks in flight between the producer and the response body.
const CHANNEL_CAPACITY: usize = 16;

type Chunk = io::Result<Bytes>;

/// `io::Write` end of the body channel. Must only be used off the async runtime.
pub(crate) struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `produce` on the blocking pool and returns a body streaming what it writes.
pub(crate) fn blocking_body<F, E>(produce: F) -> Body
where
    F: FnOnce(ChannelWriter) -> Result<(), E> + Send + 'static,
    E: Display,
{
    let (tx, rx) = mpsc::channel::<Chunk>(CHANNEL_CAPACITY);
    let failure_tx = tx.clone();

    tokio::task::spawn_blocking(move || {
        if let Err(err) = produce(ChannelWriter { tx }) {
            tracing::warn!("Aborting streamed response: {}", err);
            let _ = failure_tx.blocking_send(Err(io::Error::other(err.to_string())));
        }
    });

    Body::from_stream(futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }))
}

/// `io::Read` end of an upload channel. Must only be used off the async runtime.
///
/// An `Err` chunk fails the read; a closed channel is end of input.
pub(crate) struct ChannelReader {
    rx: mpsc::Receiver<Chunk>,
    pending: Bytes,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.pending = chunk,
                Some(Err(err)) => return Err(err),
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending.split_to(n));
        Ok(n)
    }
}

/// Creates an upload channel: the async sender and the blocking reader.
pub(crate) fn upload_channel() -> (mpsc::Sender<Chunk>, ChannelReader) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (
        tx,
        ChannelReader {
            rx,
            pending: Bytes::new(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_body_carries_every_write() {
        let body = blocking_body(|mut sink| {
            sink.write_all(b"hello ")?;
            sink.write_all(b"world")?;
            Ok::<_, io::Error>(())
        });

        let bytes = body.collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello world");
    }

    #[tokio::test]
    async fn test_producer_failure_aborts_body() {
        let body = blocking_body(|mut sink| {
            sink.write_all(b"partial")?;
            Err(io::Error::new(io::ErrorKind::NotFound, "missing"))
        });

        assert!(body.collect().await.is_err());
    }

    #[tokio::test]
    async fn test_reader_reassembles_chunks() {
        let (tx, mut reader) = upload_channel();
        let reading = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            let mut small = [0u8; 3];
            loop {
                let n = reader.read(&mut small)?;
                if n == 0 {
                    return Ok::<_, io::Error>(out);
                }
                out.extend_from_slice(&small[..n]);
            }
        });

        for chunk in ["hel", "lo w", "", "orld"] {
            tx.send(Ok(Bytes::from(chunk))).await.unwrap();
        }
        drop(tx);

        assert_eq!(reading.await.unwrap().unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_reader_surfaces_sender_error() {
        let (tx, mut reader) = upload_channel();
        let reading = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            reader.read_to_end(&mut out).map_err(|e| e.kind())
        });

        tx.send(Ok(Bytes::from_static(b"part"))).await.unwrap();
        tx.send(Err(io::Error::new(io::ErrorKind::InvalidData, "limit")))
            .await
            .unwrap();

        assert_eq!(
            reading.await.unwrap(),
            Err(io::ErrorKind::InvalidData)
        );
    }

    #[tokio::test]
    async fn test_write_after_receiver_dropped_is_broken_pipe() {
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let body = blocking_body(move |mut sink| {
            let mut result = Ok(());
            for _ in 0..(CHANNEL_CAPACITY * 4) {
                if let Err(err) = sink.write_all(b"chunk") {
                    result = Err(err);
                    break;
                }
            }
            let _ = done_tx.send(result.as_ref().map_err(|e| e.kind()).copied());
            result
        });
        drop(body);

        assert_eq!(done_rx.await.unwrap(), Err(io::ErrorKind::BrokenPipe));
    }
}

//! Local transport: an in-process room backed by tokio channels.
//!
//! Stands in for a real-time media room: the test suite and `lookout replay`
//! open byte streams and publish data packets on it exactly as a remote
//! client would.

use async_trait::async_trait;
use bytes::Bytes;
use lookout_core::error::TransportError;
use lookout_core::transport::{
    ByteStreamReader, DataHandler, ParticipantId, StreamHandler, StreamInfo, Transport,
};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Chunks buffered per stream before `write` waits for the reader.
const STREAM_BUFFER: usize = 16;

/// An in-process transport.
pub struct LocalTransport {
    stream_handlers: RwLock<HashMap<String, StreamHandler>>,
    data_handlers: RwLock<HashMap<String, DataHandler>>,
    next_stream: AtomicU64,
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalTransport {
    pub fn new() -> Self {
        Self {
            stream_handlers: RwLock::new(HashMap::new()),
            data_handlers: RwLock::new(HashMap::new()),
            next_stream: AtomicU64::new(1),
        }
    }

    /// Whether a byte-stream handler is registered for `topic`.
    pub fn has_stream_handler(&self, topic: &str) -> bool {
        self.stream_handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(topic)
    }

    /// Whether a data handler is registered for `topic`.
    pub fn has_data_handler(&self, topic: &str) -> bool {
        self.data_handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(topic)
    }

    /// Open a byte stream on `topic` as `participant`.
    ///
    /// The registered handler is invoked before this returns; the returned
    /// writer feeds the reader that handler received.
    pub fn open_stream(
        &self,
        topic: &str,
        name: &str,
        participant: &ParticipantId,
    ) -> Result<LocalStreamWriter, TransportError> {
        let handler = self
            .stream_handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
            .cloned()
            .ok_or_else(|| TransportError::NoHandler(topic.to_string()))?;

        let id = format!("stream-{}", self.next_stream.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let reader = LocalStreamReader {
            info: StreamInfo {
                id: id.clone(),
                name: name.to_string(),
                topic: topic.to_string(),
                mime_type: None,
                total_length: None,
            },
            rx,
        };

        debug!(stream = %id, topic, participant = %participant, "Opening local stream");
        handler(Box::new(reader), participant.clone());

        Ok(LocalStreamWriter { stream_id: id, tx })
    }

    /// Send a whole payload as one stream, split into `chunk_size` pieces.
    pub async fn send_bytes(
        &self,
        topic: &str,
        name: &str,
        participant: &ParticipantId,
        payload: &[u8],
        chunk_size: usize,
    ) -> Result<String, TransportError> {
        let writer = self.open_stream(topic, name, participant)?;
        let id = writer.id().to_string();
        for chunk in payload.chunks(chunk_size.max(1)) {
            writer.write(Bytes::copy_from_slice(chunk)).await?;
        }
        writer.finish();
        Ok(id)
    }

    /// Deliver one data packet to the handler registered for `topic`.
    pub fn publish_data(
        &self,
        topic: &str,
        payload: impl Into<Bytes>,
        participant: &ParticipantId,
    ) -> Result<(), TransportError> {
        let handler = self
            .data_handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
            .cloned()
            .ok_or_else(|| TransportError::NoHandler(topic.to_string()))?;

        handler(payload.into(), participant.clone());
        Ok(())
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn name(&self) -> &str {
        "local"
    }

    fn register_byte_stream_handler(
        &self,
        topic: &str,
        handler: StreamHandler,
    ) -> Result<(), TransportError> {
        let mut handlers = self
            .stream_handlers
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if handlers.contains_key(topic) {
            return Err(TransportError::HandlerExists(topic.to_string()));
        }
        handlers.insert(topic.to_string(), handler);
        info!(topic, "Registered byte stream handler");
        Ok(())
    }

    fn unregister_byte_stream_handler(&self, topic: &str) {
        self.stream_handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(topic);
    }

    fn register_data_handler(
        &self,
        topic: &str,
        handler: DataHandler,
    ) -> Result<(), TransportError> {
        let mut handlers = self
            .data_handlers
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if handlers.contains_key(topic) {
            return Err(TransportError::HandlerExists(topic.to_string()));
        }
        handlers.insert(topic.to_string(), handler);
        info!(topic, "Registered data handler");
        Ok(())
    }

    fn unregister_data_handler(&self, topic: &str) {
        self.data_handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(topic);
    }
}

/// Reader half handed to the stream handler.
pub struct LocalStreamReader {
    info: StreamInfo,
    rx: mpsc::Receiver<Result<Bytes, TransportError>>,
}

#[async_trait]
impl ByteStreamReader for LocalStreamReader {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    async fn next_chunk(&mut self) -> Option<Result<Bytes, TransportError>> {
        self.rx.recv().await
    }
}

/// Sender half of a local stream.
///
/// Dropping the writer (or calling [`finish`](Self::finish)) ends the stream
/// cleanly.
pub struct LocalStreamWriter {
    stream_id: String,
    tx: mpsc::Sender<Result<Bytes, TransportError>>,
}

impl LocalStreamWriter {
    pub fn id(&self) -> &str {
        &self.stream_id
    }

    /// Write one chunk. Fails once the reader has gone away.
    pub async fn write(&self, chunk: impl Into<Bytes>) -> Result<(), TransportError> {
        self.tx
            .send(Ok(chunk.into()))
            .await
            .map_err(|_| TransportError::Closed(self.stream_id.clone()))
    }

    /// End the stream.
    pub fn finish(self) {}

    /// Abort the stream with a read error on the receiving side.
    pub async fn fail(self, reason: impl Into<String>) {
        let err = TransportError::ReadFailed {
            stream: self.stream_id.clone(),
            reason: reason.into(),
        };
        // Reader may already be gone
        let _ = self.tx.send(Err(err)).await;
    }
}

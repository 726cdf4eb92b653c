//! Transport trait: the abstraction over the room/channel frames arrive on.
//!
//! The core never opens streams. It registers handlers by topic and the
//! transport invokes them: byte-stream handlers once per incoming stream,
//! data handlers once per small packet (location updates).

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::TransportError;

/// Identity of a remote participant in the room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata describing an incoming byte stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Transport-assigned stream identifier
    pub id: String,

    /// Sender-supplied name (e.g. a file name)
    pub name: String,

    /// Topic the stream was opened on
    pub topic: String,

    /// Declared MIME type, if the sender supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Declared total length, if known up front
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_length: Option<u64>,
}

/// Reader half of one incoming byte stream.
///
/// Chunks are yielded in the order the sender wrote them. `None` marks a
/// clean end of stream; `Some(Err(_))` is a read failure after which the
/// stream must be abandoned.
#[async_trait]
pub trait ByteStreamReader: Send {
    fn info(&self) -> &StreamInfo;

    async fn next_chunk(&mut self) -> Option<Result<Bytes, TransportError>>;
}

/// Invoked once per stream opened on a registered topic.
pub type StreamHandler = Arc<dyn Fn(Box<dyn ByteStreamReader>, ParticipantId) + Send + Sync>;

/// Invoked once per data packet received on a registered topic.
pub type DataHandler = Arc<dyn Fn(Bytes, ParticipantId) + Send + Sync>;

/// The core Transport trait.
///
/// Handlers are plain callbacks and must not block; anything long-running is
/// spawned by the handler itself.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name (e.g., "livekit", "local").
    fn name(&self) -> &str;

    /// Register the handler for byte streams on `topic`.
    fn register_byte_stream_handler(
        &self,
        topic: &str,
        handler: StreamHandler,
    ) -> Result<(), TransportError>;

    /// Remove the byte-stream handler for `topic`, if any.
    fn unregister_byte_stream_handler(&self, topic: &str);

    /// Register the handler for data packets on `topic`.
    fn register_data_handler(&self, topic: &str, handler: DataHandler)
    -> Result<(), TransportError>;

    /// Remove the data handler for `topic`, if any.
    fn unregister_data_handler(&self, topic: &str);

    /// Health check: is the transport connected?
    async fn health_check(&self) -> Result<bool, TransportError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_id_displays_inner() {
        let id = ParticipantId::new("user-k3x9q");
        assert_eq!(id.to_string(), "user-k3x9q");
    }

    #[test]
    fn stream_info_skips_absent_fields() {
        let info = StreamInfo {
            id: "s1".into(),
            name: "frame.jpg".into(),
            topic: "camera-frame".into(),
            mime_type: None,
            total_length: None,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("camera-frame"));
        assert!(!json.contains("mime_type"));
    }
}

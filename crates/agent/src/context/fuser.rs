//! Context fuser: turns a reassembled camera frame into an image turn.
//!
//! The frame is sniffed for its image format, inlined as a base64 `data:` URI
//! and appended to the store as a user turn. Failures are logged and the
//! frame is dropped; nothing here ever surfaces an error to the ingestion
//! task that called it.

use base64::Engine as _;
use lookout_core::error::FusionError;
use lookout_core::message::{ConversationContext, ConversationTurn, ImageContent};
use lookout_core::transport::ParticipantId;
use std::sync::Arc;
use tracing::{info, warn};

use super::store::ContextStore;

pub struct ContextFuser {
    store: Arc<ContextStore>,
    max_frame_bytes: usize,
}

impl ContextFuser {
    pub fn new(store: Arc<ContextStore>, max_frame_bytes: usize) -> Self {
        Self {
            store,
            max_frame_bytes,
        }
    }

    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Append `buffer` as an image turn from `participant`.
    ///
    /// Returns the installed context, or `None` if the frame was dropped.
    pub fn fuse_image(
        &self,
        buffer: &[u8],
        participant: &ParticipantId,
    ) -> Option<ConversationContext> {
        match encode_image(buffer, self.max_frame_bytes) {
            Ok(image) => {
                let bytes = image.byte_len;
                let ctx = self
                    .store
                    .append(ConversationTurn::user_image(image, participant.0.clone()));
                info!(
                    participant = %participant,
                    bytes,
                    version = ctx.version(),
                    "Image added to conversation context"
                );
                Some(ctx)
            }
            Err(e) => {
                warn!(participant = %participant, error = %e, "Dropping frame");
                None
            }
        }
    }
}

/// Identify an image format from its leading bytes.
pub fn sniff_mime(buffer: &[u8]) -> Option<&'static str> {
    match buffer {
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

/// Inline a frame as `data:<mime>;base64,<payload>`.
pub fn encode_image(buffer: &[u8], max_bytes: usize) -> Result<ImageContent, FusionError> {
    if buffer.is_empty() {
        return Err(FusionError::EmptyFrame);
    }
    if buffer.len() > max_bytes {
        return Err(FusionError::TooLarge {
            size: buffer.len(),
            limit: max_bytes,
        });
    }

    let mime_type = sniff_mime(buffer).ok_or_else(|| {
        let head: Vec<String> = buffer.iter().take(4).map(|b| format!("{b:02x}")).collect();
        FusionError::UnsupportedFormat(head.join(" "))
    })?;

    let payload = base64::engine::general_purpose::STANDARD.encode(buffer);
    Ok(ImageContent {
        data_uri: format!("data:{mime_type};base64,{payload}"),
        mime_type: mime_type.to_string(),
        byte_len: buffer.len(),
    })
}

//! Conversation turn and context domain types.
//!
//! These are the value objects shared between frame ingestion and the
//! response engine: a frame arrives → it becomes an image turn → the engine
//! reads the context that contains it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// The role of a turn's author in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (speech transcripts and camera frames)
    User,
    /// The assistant
    Assistant,
    /// Standing instructions
    System,
}

/// An image inlined as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    /// `data:<mime>;base64,<payload>`
    pub data_uri: String,

    /// Sniffed MIME type (e.g. "image/jpeg")
    pub mime_type: String,

    /// Size of the decoded frame in bytes
    pub byte_len: usize,
}

/// The content of a single turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    Text { text: String },
    Image { image: ImageContent },
}

/// A single entry in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique turn ID
    pub id: String,

    /// Who authored this turn
    pub role: Role,

    pub content: TurnContent,

    /// Originating participant, for turns that came in over the transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    fn new(role: Role, content: TurnContent, participant: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            participant,
            timestamp: Utc::now(),
        }
    }

    /// Create a user text turn (a speech transcript).
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, TurnContent::Text { text: text.into() }, None)
    }

    /// Create an assistant text turn.
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, TurnContent::Text { text: text.into() }, None)
    }

    /// Create a system instructions turn.
    pub fn system_text(text: impl Into<String>) -> Self {
        Self::new(Role::System, TurnContent::Text { text: text.into() }, None)
    }

    /// Create a user turn carrying a camera frame.
    pub fn user_image(image: ImageContent, participant: impl Into<String>) -> Self {
        Self::new(
            Role::User,
            TurnContent::Image { image },
            Some(participant.into()),
        )
    }

    pub fn is_image(&self) -> bool {
        matches!(self.content, TurnContent::Image { .. })
    }

    /// The text of a text turn.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text { text } => Some(text),
            TurnContent::Image { .. } => None,
        }
    }
}

/// An immutable, versioned snapshot of the conversation.
///
/// Cloning is cheap (the turns are shared). A new context is built with
/// [`ConversationContext::with_turn`]; the receiver is never modified, so a
/// reader holding a snapshot is unaffected by later installations.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    version: u64,
    turns: Arc<Vec<ConversationTurn>>,
}

impl ConversationContext {
    /// Create an empty context at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from existing turns at the given version.
    pub fn from_turns(version: u64, turns: Vec<ConversationTurn>) -> Self {
        Self {
            version,
            turns: Arc::new(turns),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// Number of image turns in the context.
    pub fn image_count(&self) -> usize {
        self.turns.iter().filter(|t| t.is_image()).count()
    }

    /// Copy this context and append one turn. The copy is one version ahead.
    pub fn with_turn(&self, turn: ConversationTurn) -> Self {
        let mut turns = Vec::with_capacity(self.turns.len() + 1);
        turns.extend(self.turns.iter().cloned());
        turns.push(turn);
        Self {
            version: self.version + 1,
            turns: Arc::new(turns),
        }
    }

    /// Copy this context with the turns replaced, one version ahead.
    pub fn with_turns(&self, turns: Vec<ConversationTurn>) -> Self {
        Self {
            version: self.version + 1,
            turns: Arc::new(turns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> ImageContent {
        ImageContent {
            data_uri: "data:image/png;base64,iVBORw0KGgo=".into(),
            mime_type: "image/png".into(),
            byte_len: 8,
        }
    }

    #[test]
    fn create_user_image_turn() {
        let turn = ConversationTurn::user_image(sample_image(), "user-abc");
        assert_eq!(turn.role, Role::User);
        assert!(turn.is_image());
        assert_eq!(turn.participant.as_deref(), Some("user-abc"));
        assert!(turn.text().is_none());
    }

    #[test]
    fn with_turn_leaves_original_untouched() {
        let base = ConversationContext::new().with_turn(ConversationTurn::system_text("rules"));
        let next = base.with_turn(ConversationTurn::user_text("where am I?"));

        assert_eq!(base.len(), 1);
        assert_eq!(base.version(), 1);
        assert_eq!(next.len(), 2);
        assert_eq!(next.version(), 2);
        assert_eq!(next.last().and_then(|t| t.text()), Some("where am I?"));
    }

    #[test]
    fn image_count_ignores_text_turns() {
        let ctx = ConversationContext::new()
            .with_turn(ConversationTurn::system_text("rules"))
            .with_turn(ConversationTurn::user_image(sample_image(), "p1"))
            .with_turn(ConversationTurn::assistant_text("Clear ahead."))
            .with_turn(ConversationTurn::user_image(sample_image(), "p1"));
        assert_eq!(ctx.image_count(), 2);
    }

    #[test]
    fn turn_content_is_tagged() {
        let turn = ConversationTurn::user_image(sample_image(), "p1");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"]["type"], "image");
        assert_eq!(json["content"]["image"]["mime_type"], "image/png");
    }
}

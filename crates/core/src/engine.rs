//! Response engine and speech output traits.
//!
//! The engine (an external realtime model) decides on its own when to read
//! the conversation and what to say. The core only asks it for replies on
//! demand and gates whatever it wants to speak before it reaches a
//! [`SpeechSink`].

use async_trait::async_trait;

use crate::error::EngineError;

#[async_trait]
pub trait ResponseEngine: Send + Sync {
    /// Engine name (e.g., "gemini-realtime").
    fn name(&self) -> &str;

    /// Ask the engine to produce a reply following `instructions`.
    async fn generate_reply(&self, instructions: &str) -> Result<(), EngineError>;
}

/// Final hop to the user's ears (text-to-speech).
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), EngineError>;
}

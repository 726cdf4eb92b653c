//! Error types for the LookOut domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all LookOut operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Directions errors ---
    #[error("Directions error: {0}")]
    Directions(#[from] DirectionsError),

    // --- Transport errors ---
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // --- Frame fusion errors ---
    #[error("Fusion error: {0}")]
    Fusion(#[from] FusionError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Response engine errors ---
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum DirectionsError {
    #[error("Directions API error: {message} (status: {status})")]
    Api { status: String, message: String },

    #[error("Directions request failed with HTTP {status_code}: {message}")]
    Http { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Malformed directions response: {0}")]
    Malformed(String),

    #[error("Directions provider not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Stream read failed on {stream}: {reason}")]
    ReadFailed { stream: String, reason: String },

    #[error("A handler is already registered for topic '{0}'")]
    HandlerExists(String),

    #[error("No handler registered for topic '{0}'")]
    NoHandler(String),

    #[error("Stream closed: {0}")]
    Closed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FusionError {
    #[error("Frame is empty")]
    EmptyFrame,

    #[error("Frame of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Unrecognised image format (leading bytes {0})")]
    UnsupportedFormat(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Response engine unavailable: {0}")]
    Unavailable(String),

    #[error("Reply generation failed: {0}")]
    GenerationFailed(String),

    #[error("Speech output failed: {0}")]
    SpeechFailed(String),
}

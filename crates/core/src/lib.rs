//! # LookOut Core
//!
//! Domain types, traits, and error definitions for the LookOut vision
//! assistant. This crate has **no framework dependencies**: it defines the
//! model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (frame transport, response engine, speech
//! output, routing provider) is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping collaborators per session without global state
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod directions;
pub mod engine;
pub mod error;
pub mod event;
pub mod location;
pub mod message;
pub mod tool;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use directions::{DirectionsProvider, DirectionsRequest, DirectionsResult, Route};
pub use engine::{ResponseEngine, SpeechSink};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use location::{LocationCell, UserLocation};
pub use message::{ConversationContext, ConversationTurn, ImageContent, Role, TurnContent};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
pub use transport::{ByteStreamReader, ParticipantId, StreamInfo, Transport};

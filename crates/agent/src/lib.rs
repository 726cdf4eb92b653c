//! The LookOut session core.
//!
//! Camera frames arrive as byte streams on a transport. Each stream gets a
//! supervised ingestion task that reassembles the frame and fuses it into the
//! conversation as an image turn. The external response engine reads that
//! conversation, calls tools, and proposes speech, which an output gate
//! filters before anything reaches the user.
//!
//! ```text
//! transport ──► IngestionPool ──► ContextFuser ──► ContextStore ◄── engine
//!                                                                    │
//!                      ToolRegistry (get_directions) ◄───────────────┤
//!                                                                    ▼
//!                                      OutputGate ──► SpeechSink
//! ```

pub mod context;
pub mod gate;
pub mod ingest;
pub mod persona;
pub mod session;

pub use context::{ContextFuser, ContextStore, StaleContext};
pub use gate::{
    Candidate, GateDecision, GatePolicy, GatedSpeech, OutputGate, SceneSignals, SuppressReason,
    UtteranceKind,
};
pub use ingest::{IngestionOutcome, IngestionPool, IngestionState, IngestionTask};
pub use session::{Session, SessionState};

#[cfg(test)]
pub(crate) mod test_helpers;

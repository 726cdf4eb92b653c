//! The conversation context store.
//!
//! Holds the one "current" [`ConversationContext`] reference for a session.
//! Every mutation is copy-modify-replace inside a single critical section:
//! the new sequence is built from the current one and installed before the
//! lock is released, so a reader sees either the old or the new context and
//! concurrent appends can never drop each other's turns.

use lookout_core::message::{ConversationContext, ConversationTurn};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

/// A replace was built from a snapshot that is no longer current.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stale context: replace built on version {expected}, current is {current}")]
pub struct StaleContext {
    pub expected: u64,
    pub current: u64,
}

pub struct ContextStore {
    current: Mutex<ConversationContext>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    /// Create a store holding an empty context.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(ConversationContext::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConversationContext> {
        // The guarded value is only ever swapped whole, so a poisoned lock
        // still holds a complete context.
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A stable snapshot of the current context.
    pub fn snapshot(&self) -> ConversationContext {
        self.lock().clone()
    }

    /// Append one turn and return the context that was installed.
    pub fn append(&self, turn: ConversationTurn) -> ConversationContext {
        let mut current = self.lock();
        let next = current.with_turn(turn);
        *current = next.clone();
        debug!(version = next.version(), turns = next.len(), "Installed context");
        next
    }

    /// Replace the turns wholesale, provided nothing was installed since the
    /// snapshot at `expected_version` was taken.
    pub fn replace(
        &self,
        expected_version: u64,
        turns: Vec<ConversationTurn>,
    ) -> Result<ConversationContext, StaleContext> {
        let mut current = self.lock();
        if current.version() != expected_version {
            return Err(StaleContext {
                expected: expected_version,
                current: current.version(),
            });
        }
        let next = current.with_turns(turns);
        *current = next.clone();
        debug!(version = next.version(), turns = next.len(), "Replaced context");
        Ok(next)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn version(&self) -> u64 {
        self.lock().version()
    }
}

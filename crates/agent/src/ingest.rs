//! Frame ingestion pool: one supervised task per incoming camera stream.
//!
//! Each stream opened on the frame topic gets its own task that drains the
//! reader in chunk order, enforces the frame size limit and hands the
//! reassembled buffer to the [`ContextFuser`]. Task handles live in an arena
//! keyed by stream id; finished entries are reaped whenever a new stream
//! opens, and teardown cancels and joins whatever is left.
//!
//! A task never touches the context until its stream has ended cleanly, so a
//! failed or cancelled transfer cannot leave a partial image behind.

use bytes::Bytes;
use chrono::Utc;
use lookout_core::error::FusionError;
use lookout_core::event::{DomainEvent, EventBus};
use lookout_core::transport::{ByteStreamReader, ParticipantId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::ContextFuser;

/// Lifecycle of a single frame transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionState {
    Receiving,
    Completed,
    Failed,
    Cancelled,
}

/// Accumulation state for one stream.
#[derive(Debug)]
pub struct IngestionTask {
    pub stream_id: String,
    pub participant: ParticipantId,
    chunks: Vec<Bytes>,
    received: usize,
    state: IngestionState,
}

impl IngestionTask {
    pub fn new(stream_id: impl Into<String>, participant: ParticipantId) -> Self {
        Self {
            stream_id: stream_id.into(),
            participant,
            chunks: Vec::new(),
            received: 0,
            state: IngestionState::Receiving,
        }
    }

    /// Buffer one chunk, failing the task if it would exceed `limit` bytes.
    pub fn push(&mut self, chunk: Bytes, limit: usize) -> Result<(), FusionError> {
        let size = self.received + chunk.len();
        if size > limit {
            self.state = IngestionState::Failed;
            return Err(FusionError::TooLarge { size, limit });
        }
        self.received = size;
        self.chunks.push(chunk);
        Ok(())
    }

    pub fn state(&self) -> IngestionState {
        self.state
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn set_state(&mut self, state: IngestionState) {
        self.state = state;
    }

    /// Concatenate the chunks in arrival order.
    pub fn into_buffer(self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.received);
        for chunk in &self.chunks {
            buffer.extend_from_slice(chunk);
        }
        buffer
    }
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionOutcome {
    /// An image turn was installed at this context version
    Fused { context_version: u64 },
    /// The stream completed but the bytes were not a usable image
    Dropped { reason: String },
    /// The stream failed to read or exceeded the size limit
    Failed { reason: String },
    /// Session teardown stopped the task
    Cancelled,
}

/// The supervised set of ingestion tasks for one session.
pub struct IngestionPool {
    fuser: Arc<ContextFuser>,
    events: Arc<EventBus>,
    tasks: Mutex<HashMap<String, JoinHandle<IngestionOutcome>>>,
    cancel: CancellationToken,
    max_active: usize,
    max_frame_bytes: usize,
    runtime: Option<Handle>,
}

impl IngestionPool {
    /// Create a pool. Tasks are spawned on the runtime current at construction,
    /// falling back to whichever runtime is current when a stream opens.
    pub fn new(
        fuser: Arc<ContextFuser>,
        events: Arc<EventBus>,
        max_active: usize,
        max_frame_bytes: usize,
    ) -> Self {
        Self {
            fuser,
            events,
            tasks: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
            max_active: max_active.max(1),
            max_frame_bytes,
            runtime: Handle::try_current().ok(),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<IngestionOutcome>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn dropped(&self, stream_id: &str, reason: impl Into<String>) {
        self.events.publish(DomainEvent::FrameDropped {
            stream_id: stream_id.to_string(),
            reason: reason.into(),
            timestamp: Utc::now(),
        });
    }

    /// Accept a newly opened stream.
    ///
    /// Returns the key the task was registered under, or `None` if the stream
    /// was refused (pool full, pool cancelled, no runtime).
    pub fn on_stream_opened(
        &self,
        reader: Box<dyn ByteStreamReader>,
        participant: ParticipantId,
    ) -> Option<String> {
        let stream_id = reader.info().id.clone();

        if self.cancel.is_cancelled() {
            debug!(stream = %stream_id, "Pool is shut down, ignoring stream");
            self.dropped(&stream_id, "session torn down");
            return None;
        }

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            error!(stream = %stream_id, "No tokio runtime available, dropping stream");
            self.dropped(&stream_id, "no runtime");
            return None;
        };

        let mut tasks = self.tasks();
        tasks.retain(|_, handle| !handle.is_finished());

        if tasks.len() >= self.max_active {
            warn!(
                stream = %stream_id,
                active = tasks.len(),
                limit = self.max_active,
                "Ingestion pool full, dropping stream"
            );
            self.dropped(&stream_id, "ingestion pool full");
            return None;
        }

        let mut key = stream_id.clone();
        let mut suffix = 1;
        while tasks.contains_key(&key) {
            key = format!("{stream_id}#{suffix}");
            suffix += 1;
        }

        info!(stream = %key, participant = %participant, "Receiving frame");
        self.events.publish(DomainEvent::FrameReceived {
            stream_id: key.clone(),
            participant: participant.0.clone(),
            timestamp: Utc::now(),
        });

        let handle = runtime.spawn(ingest_stream(
            reader,
            IngestionTask::new(key.clone(), participant),
            self.fuser.clone(),
            self.events.clone(),
            self.cancel.child_token(),
            self.max_frame_bytes,
        ));
        tasks.insert(key.clone(), handle);
        Some(key)
    }

    /// Number of tasks still running.
    pub fn active_count(&self) -> usize {
        let mut tasks = self.tasks();
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.len()
    }

    /// Await every task currently in the pool.
    pub async fn join_all(&self) -> Vec<IngestionOutcome> {
        let handles: Vec<_> = self.tasks().drain().collect();
        let mut outcomes = Vec::with_capacity(handles.len());
        for (key, handle) in handles {
            outcomes.push(join_outcome(&key, handle.await));
        }
        outcomes
    }

    /// Cancel every task and wait up to `timeout` for them to stop.
    /// Stragglers are aborted.
    pub async fn shutdown(&self, timeout: Duration) -> Vec<IngestionOutcome> {
        self.cancel.cancel();

        let handles: Vec<_> = self.tasks().drain().collect();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut outcomes = Vec::with_capacity(handles.len());
        for (key, mut handle) in handles {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(joined) => outcomes.push(join_outcome(&key, joined)),
                Err(_) => {
                    warn!(stream = %key, "Ingestion task did not stop in time, aborting");
                    handle.abort();
                    outcomes.push(IngestionOutcome::Cancelled);
                }
            }
        }
        info!(tasks = outcomes.len(), "Ingestion pool shut down");
        outcomes
    }

    /// Cancel without waiting. Used where awaiting is not possible.
    pub fn cancel_all(&self) {
        self.cancel.cancel();
        for (_, handle) in self.tasks().drain() {
            handle.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

fn join_outcome(
    key: &str,
    joined: Result<IngestionOutcome, tokio::task::JoinError>,
) -> IngestionOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_cancelled() => IngestionOutcome::Cancelled,
        Err(e) => {
            error!(stream = %key, error = %e, "Ingestion task panicked");
            IngestionOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

async fn ingest_stream(
    mut reader: Box<dyn ByteStreamReader>,
    mut task: IngestionTask,
    fuser: Arc<ContextFuser>,
    events: Arc<EventBus>,
    cancel: CancellationToken,
    max_frame_bytes: usize,
) -> IngestionOutcome {
    let stream_id = task.stream_id.clone();
    let dropped = |reason: String| {
        events.publish(DomainEvent::FrameDropped {
            stream_id: stream_id.clone(),
            reason,
            timestamp: Utc::now(),
        });
    };

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            next = reader.next_chunk() => Some(next),
        };

        match next {
            None => {
                task.set_state(IngestionState::Cancelled);
                debug!(stream = %stream_id, received = task.received(), "Ingestion cancelled");
                dropped("cancelled".into());
                return IngestionOutcome::Cancelled;
            }
            Some(Some(Ok(chunk))) => {
                if let Err(e) = task.push(chunk, max_frame_bytes) {
                    warn!(stream = %stream_id, error = %e, "Frame rejected");
                    dropped(e.to_string());
                    return IngestionOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
            }
            Some(Some(Err(e))) => {
                task.set_state(IngestionState::Failed);
                warn!(stream = %stream_id, error = %e, "Frame stream read failed");
                dropped(e.to_string());
                return IngestionOutcome::Failed {
                    reason: e.to_string(),
                };
            }
            Some(None) => break,
        }
    }

    // The stream may have ended in the same instant teardown began
    if cancel.is_cancelled() {
        task.set_state(IngestionState::Cancelled);
        dropped("cancelled".into());
        return IngestionOutcome::Cancelled;
    }

    task.set_state(IngestionState::Completed);
    debug!(stream = %stream_id, bytes = task.received(), chunks = task.chunk_count(), "Frame complete");

    let participant = task.participant.clone();
    let buffer = task.into_buffer();
    match fuser.fuse_image(&buffer, &participant) {
        Some(ctx) => {
            events.publish(DomainEvent::FrameFused {
                stream_id: stream_id.clone(),
                participant: participant.0,
                bytes: buffer.len(),
                context_version: ctx.version(),
                timestamp: Utc::now(),
            });
            IngestionOutcome::Fused {
                context_version: ctx.version(),
            }
        }
        None => {
            dropped("undecodable image".into());
            IngestionOutcome::Dropped {
                reason: "undecodable image".into(),
            }
        }
    }
}

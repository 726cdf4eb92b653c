//! Session controller: owns everything one connected user needs.
//!
//! A [`Session`] wires the transport to the ingestion pool and the location
//! slot, seeds the conversation with the standing instructions, and asks the
//! engine for the opening greeting. Nothing is global: two sessions in one
//! process share no state.
//!
//! Lifecycle: `Created` → [`start`](Session::start) → `Active` →
//! [`teardown`](Session::teardown) → `TornDown`.

use bytes::Bytes;
use chrono::Utc;
use lookout_config::{AppConfig, SessionConfig};
use lookout_core::directions::DirectionsProvider;
use lookout_core::engine::{ResponseEngine, SpeechSink};
use lookout_core::error::{Error, Result};
use lookout_core::event::{DomainEvent, EventBus};
use lookout_core::location::{LocationCell, LocationPacket};
use lookout_core::message::ConversationTurn;
use lookout_core::tool::{ToolCall, ToolDefinition, ToolRegistry, ToolResult};
use lookout_core::transport::{ByteStreamReader, ParticipantId, Transport};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::context::{ContextFuser, ContextStore};
use crate::gate::{GatePolicy, GatedSpeech, OutputGate};
use crate::ingest::{IngestionOutcome, IngestionPool};
use crate::persona;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Active,
    TornDown,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::TornDown => "torn_down",
        }
    }
}

pub struct Session {
    id: String,
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    engine: Arc<dyn ResponseEngine>,
    store: Arc<ContextStore>,
    pool: Arc<IngestionPool>,
    tools: Arc<ToolRegistry>,
    location: LocationCell,
    gate: Arc<OutputGate>,
    events: Arc<EventBus>,
    state: Mutex<SessionState>,
}

impl Session {
    /// Build a session. Ingestion tasks run on the tokio runtime current here.
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        engine: Arc<dyn ResponseEngine>,
        directions: Arc<dyn DirectionsProvider>,
        events: Arc<EventBus>,
    ) -> Self {
        let session = &config.session;
        let store = Arc::new(ContextStore::new());
        let fuser = Arc::new(ContextFuser::new(store.clone(), session.max_frame_bytes));
        let pool = Arc::new(IngestionPool::new(
            fuser,
            events.clone(),
            session.max_active_streams,
            session.max_frame_bytes,
        ));
        let location = LocationCell::new();
        let tools = Arc::new(lookout_tools::default_registry(directions, location.clone()));

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            config: session.clone(),
            transport,
            engine,
            store,
            pool,
            tools,
            location,
            gate: Arc::new(OutputGate::new(GatePolicy::from(&config.output))),
            events,
            state: Mutex::new(SessionState::Created),
        }
    }

    fn state_guard(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: SessionState) {
        *self.state_guard() = state;
        info!(session = %self.id, state = state.as_str(), "Session state changed");
        self.events.publish(DomainEvent::SessionStateChanged {
            session_id: self.id.clone(),
            state: state.as_str().into(),
            timestamp: Utc::now(),
        });
    }

    /// Seed the instructions, register handlers and request the greeting.
    ///
    /// A greeting failure is logged; the session still goes active.
    pub async fn start(&self) -> Result<()> {
        let state = self.state();
        if state != SessionState::Created {
            return Err(Error::Internal(format!(
                "session {} cannot start from state {}",
                self.id,
                state.as_str()
            )));
        }

        if self.store.is_empty() {
            self.store
                .append(ConversationTurn::system_text(persona::INSTRUCTIONS));
        }

        let pool = self.pool.clone();
        self.transport.register_byte_stream_handler(
            &self.config.frame_topic,
            Arc::new(move |reader: Box<dyn ByteStreamReader>, participant: ParticipantId| {
                pool.on_stream_opened(reader, participant);
            }),
        )?;

        let location = self.location.clone();
        let events = self.events.clone();
        let registered = self.transport.register_data_handler(
            &self.config.location_topic,
            Arc::new(move |payload: Bytes, participant: ParticipantId| {
                apply_location_update(&location, &events, &payload, &participant);
            }),
        );
        if let Err(e) = registered {
            self.transport
                .unregister_byte_stream_handler(&self.config.frame_topic);
            return Err(e.into());
        }

        self.set_state(SessionState::Active);

        let greeting = persona::greeting_instruction(&self.config.greeting);
        if let Err(e) = self.engine.generate_reply(&greeting).await {
            warn!(session = %self.id, engine = self.engine.name(), error = %e, "Opening greeting failed");
        }
        Ok(())
    }

    /// Stop accepting input and cancel every in-flight frame.
    ///
    /// Returns the outcomes of the tasks that were still in the pool.
    pub async fn teardown(&self) -> Vec<IngestionOutcome> {
        if self.state() == SessionState::TornDown {
            return Vec::new();
        }

        self.transport
            .unregister_byte_stream_handler(&self.config.frame_topic);
        self.transport
            .unregister_data_handler(&self.config.location_topic);

        let outcomes = self
            .pool
            .shutdown(Duration::from_secs(self.config.teardown_timeout_secs))
            .await;
        self.location.clear();
        self.set_state(SessionState::TornDown);
        outcomes
    }

    /// Run a tool call from the engine. Always yields a result.
    pub async fn invoke_tool(&self, call: &ToolCall) -> ToolResult {
        let started = Instant::now();
        let result = self.tools.dispatch(call).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        debug!(tool = %call.name, success = result.success, duration_ms, "Tool executed");
        self.events.publish(DomainEvent::ToolExecuted {
            tool_name: call.name.clone(),
            success: result.success,
            duration_ms,
            timestamp: Utc::now(),
        });
        result
    }

    /// Tools the engine may call.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    /// A gated speech front for `sink`, sharing this session's gate.
    pub fn speech(&self, sink: Arc<dyn SpeechSink>) -> GatedSpeech {
        GatedSpeech::new(self.gate.clone(), sink, self.events.clone())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state_guard()
    }

    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    pub fn pool(&self) -> &Arc<IngestionPool> {
        &self.pool
    }

    pub fn location(&self) -> &LocationCell {
        &self.location
    }

    pub fn gate(&self) -> &Arc<OutputGate> {
        &self.gate
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.state() == SessionState::Active {
            self.transport
                .unregister_byte_stream_handler(&self.config.frame_topic);
            self.transport
                .unregister_data_handler(&self.config.location_topic);
            self.pool.cancel_all();
        }
    }
}

/// Apply one location packet to `location`. Returns whether it was stored.
pub fn apply_location_update(
    location: &LocationCell,
    events: &EventBus,
    payload: &[u8],
    participant: &ParticipantId,
) -> bool {
    match LocationPacket::parse(payload) {
        Ok(LocationPacket::Location { data }) if data.is_valid() => {
            location.set(data);
            debug!(participant = %participant, lat = data.lat, lng = data.lng, "Location updated");
            events.publish(DomainEvent::LocationUpdated {
                participant: participant.0.clone(),
                timestamp: Utc::now(),
            });
            true
        }
        Ok(LocationPacket::Location { data }) => {
            warn!(participant = %participant, lat = data.lat, lng = data.lng, "Ignoring out-of-range location");
            false
        }
        Err(e) => {
            warn!(participant = %participant, error = %e, "Ignoring data packet");
            false
        }
    }
}

//! Output gate: decides whether a candidate utterance reaches the user.
//!
//! The engine proposes every utterance together with the [`SceneSignals`] it
//! derived from the latest frames. The gate itself does no scene analysis.
//!
//! Rules, in order:
//!
//! 1. Blank text is never spoken.
//! 2. Nothing is spoken while the user is talking.
//! 3. Answers to a user question always pass.
//! 4. Anything else needs a hazard or a material scene change.
//! 5. Heartbeats are cut to the configured word cap.
//! 6. A repeat of the last emitted utterance is dropped, unless it warns of
//!    a hazard.

use async_trait::async_trait;
use chrono::Utc;
use lookout_config::OutputConfig;
use lookout_core::engine::SpeechSink;
use lookout_core::error::EngineError;
use lookout_core::event::{DomainEvent, EventBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// What the engine observed about the scene behind a candidate utterance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneSignals {
    pub material_change: bool,
    pub hazard: bool,
}

impl SceneSignals {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn changed() -> Self {
        Self {
            material_change: true,
            hazard: false,
        }
    }

    pub fn hazard() -> Self {
        Self {
            material_change: true,
            hazard: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceKind {
    /// Periodic "still clear" style update
    Heartbeat,
    /// Unprompted scene guidance
    Guidance,
    /// Reply to something the user asked
    Answer,
}

/// An utterance the engine would like to speak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub kind: UtteranceKind,
    pub signals: SceneSignals,
}

impl Candidate {
    pub fn heartbeat(text: impl Into<String>, signals: SceneSignals) -> Self {
        Self {
            text: text.into(),
            kind: UtteranceKind::Heartbeat,
            signals,
        }
    }

    pub fn guidance(text: impl Into<String>, signals: SceneSignals) -> Self {
        Self {
            text: text.into(),
            kind: UtteranceKind::Guidance,
            signals,
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: UtteranceKind::Answer,
            signals: SceneSignals::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    Empty,
    UserSpeaking,
    NoMaterialChange,
    Repeat,
}

impl SuppressReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::UserSpeaking => "user_speaking",
            Self::NoMaterialChange => "no_material_change",
            Self::Repeat => "repeat",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Speak this text (possibly shortened)
    Emit(String),
    Suppress(SuppressReason),
}

impl GateDecision {
    pub fn is_emit(&self) -> bool {
        matches!(self, Self::Emit(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    pub heartbeat_max_words: usize,
    pub suppress_repeats: bool,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            heartbeat_max_words: 9,
            suppress_repeats: true,
        }
    }
}

impl From<&OutputConfig> for GatePolicy {
    fn from(config: &OutputConfig) -> Self {
        Self {
            heartbeat_max_words: config.heartbeat_max_words,
            suppress_repeats: config.suppress_repeats,
        }
    }
}

pub struct OutputGate {
    policy: GatePolicy,
    user_speaking: AtomicBool,
    last_emitted: Mutex<Option<String>>,
}

impl OutputGate {
    pub fn new(policy: GatePolicy) -> Self {
        Self {
            policy,
            user_speaking: AtomicBool::new(false),
            last_emitted: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    pub fn user_started_speaking(&self) {
        self.user_speaking.store(true, Ordering::SeqCst);
    }

    pub fn user_stopped_speaking(&self) {
        self.user_speaking.store(false, Ordering::SeqCst);
    }

    pub fn is_user_speaking(&self) -> bool {
        self.user_speaking.load(Ordering::SeqCst)
    }

    /// Decide on `candidate` without recording anything.
    pub fn evaluate(&self, candidate: &Candidate) -> GateDecision {
        let last = self.last_emitted.lock().unwrap_or_else(|e| e.into_inner());
        self.decide(candidate, last.as_deref())
    }

    /// Decide on `candidate` and remember it if it is emitted.
    pub fn admit(&self, candidate: &Candidate) -> GateDecision {
        let mut last = self.last_emitted.lock().unwrap_or_else(|e| e.into_inner());
        let decision = self.decide(candidate, last.as_deref());
        if let GateDecision::Emit(text) = &decision {
            *last = Some(text.clone());
        }
        drop(last);
        debug!(kind = ?candidate.kind, ?decision, "Gate decision");
        decision
    }

    fn decide(&self, candidate: &Candidate, last: Option<&str>) -> GateDecision {
        let text = candidate.text.trim();
        if text.is_empty() {
            return GateDecision::Suppress(SuppressReason::Empty);
        }
        if self.is_user_speaking() {
            return GateDecision::Suppress(SuppressReason::UserSpeaking);
        }
        if candidate.kind == UtteranceKind::Answer {
            return GateDecision::Emit(text.to_string());
        }

        let signals = candidate.signals;
        if !signals.hazard && !signals.material_change {
            return GateDecision::Suppress(SuppressReason::NoMaterialChange);
        }

        let text = match candidate.kind {
            UtteranceKind::Heartbeat => cap_words(text, self.policy.heartbeat_max_words),
            _ => text.to_string(),
        };

        // A hazard is spoken every time it is detected
        let repeat = last.is_some_and(|last| normalize(last) == normalize(&text));
        if self.policy.suppress_repeats && !signals.hazard && repeat {
            return GateDecision::Suppress(SuppressReason::Repeat);
        }
        GateDecision::Emit(text)
    }
}

impl Default for OutputGate {
    fn default() -> Self {
        Self::new(GatePolicy::default())
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn cap_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words.max(1))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A [`SpeechSink`] front that runs every utterance through an [`OutputGate`].
pub struct GatedSpeech {
    gate: Arc<OutputGate>,
    sink: Arc<dyn SpeechSink>,
    events: Arc<EventBus>,
}

impl GatedSpeech {
    pub fn new(gate: Arc<OutputGate>, sink: Arc<dyn SpeechSink>, events: Arc<EventBus>) -> Self {
        Self { gate, sink, events }
    }

    /// Gate `candidate` and speak it if admitted.
    pub async fn offer(&self, candidate: &Candidate) -> Result<GateDecision, EngineError> {
        let decision = self.gate.admit(candidate);
        let reason = match &decision {
            GateDecision::Emit(text) => {
                self.sink.speak(text).await?;
                "emitted"
            }
            GateDecision::Suppress(reason) => reason.as_str(),
        };
        self.events.publish(DomainEvent::OutputGated {
            emitted: decision.is_emit(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        Ok(decision)
    }
}

#[async_trait]
impl SpeechSink for GatedSpeech {
    /// Plain text arriving here is treated as an answer to the user.
    async fn speak(&self, text: &str) -> Result<(), EngineError> {
        self.offer(&Candidate::answer(text)).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingSink;

    #[test]
    fn unchanged_scene_stays_quiet() {
        let gate = OutputGate::default();
        let decision = gate.admit(&Candidate::guidance("Path is clear.", SceneSignals::unchanged()));
        assert_eq!(decision, GateDecision::Suppress(SuppressReason::NoMaterialChange));
    }

    #[test]
    fn hazard_and_change_are_spoken() {
        let gate = OutputGate::default();
        assert!(gate
            .admit(&Candidate::guidance("Stop. Car approaching from 2 o'clock.", SceneSignals::hazard()))
            .is_emit());
        assert!(gate
            .admit(&Candidate::guidance("Door ahead at 12 o'clock.", SceneSignals::changed()))
            .is_emit());
    }

    #[test]
    fn answers_pass_without_scene_change() {
        let gate = OutputGate::default();
        let answer = Candidate::answer("The sign says Exit.");
        assert_eq!(gate.admit(&answer), GateDecision::Emit("The sign says Exit.".into()));
        // Repeating an answer is allowed
        assert!(gate.admit(&answer).is_emit());
    }

    #[test]
    fn heartbeat_capped_at_nine_words() {
        let gate = OutputGate::default();
        let long = "Path ahead is clear and the sidewalk continues straight for a while";
        match gate.admit(&Candidate::heartbeat(long, SceneSignals::changed())) {
            GateDecision::Emit(text) => {
                assert_eq!(text.split_whitespace().count(), 9);
                assert!(text.starts_with("Path ahead is clear"));
            }
            other => panic!("expected emit, got {other:?}"),
        }
    }

    #[test]
    fn guidance_is_not_capped() {
        let gate = OutputGate::default();
        let long = "Stop, there is a cyclist coming fast from your left at nine o'clock";
        assert_eq!(
            gate.admit(&Candidate::guidance(long, SceneSignals::hazard())),
            GateDecision::Emit(long.into())
        );
    }

    #[test]
    fn silent_while_user_speaks() {
        let gate = OutputGate::default();
        gate.user_started_speaking();
        assert_eq!(
            gate.admit(&Candidate::guidance("Stop.", SceneSignals::hazard())),
            GateDecision::Suppress(SuppressReason::UserSpeaking)
        );
        assert_eq!(
            gate.admit(&Candidate::answer("Yes.")),
            GateDecision::Suppress(SuppressReason::UserSpeaking)
        );

        gate.user_stopped_speaking();
        assert!(gate.admit(&Candidate::answer("Yes.")).is_emit());
    }

    #[test]
    fn repeats_are_dropped() {
        let gate = OutputGate::default();
        let c = Candidate::guidance("Stairs ahead at 12 o'clock.", SceneSignals::changed());
        assert!(gate.admit(&c).is_emit());
        let again = Candidate::guidance("stairs ahead at 12 o'clock", SceneSignals::changed());
        assert_eq!(gate.admit(&again), GateDecision::Suppress(SuppressReason::Repeat));

        let relaxed = OutputGate::new(GatePolicy {
            suppress_repeats: false,
            ..GatePolicy::default()
        });
        assert!(relaxed.admit(&c).is_emit());
        assert!(relaxed.admit(&c).is_emit());
    }

    #[test]
    fn repeated_hazard_is_spoken_again() {
        let gate = OutputGate::default();
        let warning = Candidate::guidance("Stop. Car approaching at 2 o'clock.", SceneSignals::hazard());
        assert!(gate.admit(&warning).is_emit());
        assert_eq!(
            gate.admit(&warning),
            GateDecision::Emit("Stop. Car approaching at 2 o'clock.".into())
        );

        // A hazard does not reset repeat suppression for ordinary guidance
        let clear = Candidate::guidance("Car has passed.", SceneSignals::changed());
        assert!(gate.admit(&clear).is_emit());
        assert_eq!(gate.admit(&clear), GateDecision::Suppress(SuppressReason::Repeat));
    }

    #[test]
    fn concurrent_admits_emit_a_repeat_once() {
        for _ in 0..50 {
            let gate = Arc::new(OutputGate::default());
            let barrier = Arc::new(std::sync::Barrier::new(8));
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let gate = gate.clone();
                    let barrier = barrier.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        gate.admit(&Candidate::guidance("Bus stop on your left.", SceneSignals::changed()))
                    })
                })
                .collect();

            let emitted = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(GateDecision::is_emit)
                .count();
            assert_eq!(emitted, 1);
        }
    }

    #[test]
    fn blank_text_suppressed() {
        let gate = OutputGate::default();
        assert_eq!(
            gate.admit(&Candidate::answer("   ")),
            GateDecision::Suppress(SuppressReason::Empty)
        );
    }

    #[test]
    fn evaluate_does_not_record() {
        let gate = OutputGate::default();
        let c = Candidate::guidance("Bench on your right.", SceneSignals::changed());
        assert!(gate.evaluate(&c).is_emit());
        assert!(gate.evaluate(&c).is_emit());
    }

    #[tokio::test]
    async fn gated_speech_only_reaches_sink_when_admitted() {
        let sink = Arc::new(RecordingSink::default());
        let events = Arc::new(EventBus::default());
        let mut rx = events.subscribe();
        let speech = GatedSpeech::new(Arc::new(OutputGate::default()), sink.clone(), events);

        speech
            .offer(&Candidate::heartbeat("All clear.", SceneSignals::unchanged()))
            .await
            .unwrap();
        speech
            .offer(&Candidate::guidance("Curb ahead.", SceneSignals::changed()))
            .await
            .unwrap();

        assert_eq!(sink.spoken(), vec!["Curb ahead.".to_string()]);

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first.as_ref(),
            DomainEvent::OutputGated { emitted: false, reason, .. } if reason == "no_material_change"
        ));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second.as_ref(), DomainEvent::OutputGated { emitted: true, .. }));
    }
}

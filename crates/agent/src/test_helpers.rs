//! Shared test helpers for session-core tests.

use async_trait::async_trait;
use lookout_core::directions::{DirectionsProvider, DirectionsRequest, Leg, Route, Step, TextValue};
use lookout_core::engine::{ResponseEngine, SpeechSink};
use lookout_core::error::{DirectionsError, EngineError};
use std::sync::Mutex;

/// Smallest valid-looking PNG header plus a little payload.
pub const PNG_FRAME: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01";

/// JPEG SOI + APP0 marker.
pub const JPEG_FRAME: &[u8] = b"\xff\xd8\xff\xe0\x00\x10JFIF\x00\x01\x01\x00";

/// A response engine that records every instruction it is given.
#[derive(Default)]
pub struct RecordingEngine {
    pub instructions: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingEngine {
    pub fn failing() -> Self {
        Self {
            instructions: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn generate_reply(&self, instructions: &str) -> Result<(), EngineError> {
        self.instructions.lock().unwrap().push(instructions.to_string());
        if self.fail {
            return Err(EngineError::Unavailable("engine offline".into()));
        }
        Ok(())
    }
}

/// A speech sink that keeps everything it was asked to say.
#[derive(Default)]
pub struct RecordingSink {
    pub spoken: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSink for RecordingSink {
    async fn speak(&self, text: &str) -> Result<(), EngineError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// A directions provider that always returns one short walking route.
pub struct FixedDirections {
    pub requests: Mutex<Vec<DirectionsRequest>>,
}

impl FixedDirections {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DirectionsProvider for FixedDirections {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn directions(&self, request: &DirectionsRequest) -> Result<Vec<Route>, DirectionsError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(vec![Route {
            legs: vec![Leg {
                distance: TextValue::new("500 m"),
                duration: TextValue::new("6 mins"),
                steps: vec![Step {
                    instruction_text: "Head north on Main St".into(),
                }],
            }],
        }])
    }
}

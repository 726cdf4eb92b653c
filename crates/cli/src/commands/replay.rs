//! `lookout replay`: Stream a directory of frames through a local session.
//!
//! Frames are sent over the in-process transport exactly as a phone client
//! would send them, so this exercises ingestion, fusion and teardown without
//! a media room or a model.

use async_trait::async_trait;
use lookout_agent::Session;
use lookout_channels::LocalTransport;
use lookout_config::AppConfig;
use lookout_core::directions::{DirectionsProvider, DirectionsRequest, Route};
use lookout_core::engine::ResponseEngine;
use lookout_core::error::{DirectionsError, EngineError};
use lookout_core::event::{DomainEvent, EventBus};
use lookout_core::transport::ParticipantId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

/// Frame payloads are sent in pieces of this size.
const CHUNK_SIZE: usize = 16 * 1024;

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Engine stand-in that only logs what it was asked to do.
struct LoggingEngine;

#[async_trait]
impl ResponseEngine for LoggingEngine {
    fn name(&self) -> &str {
        "log"
    }

    async fn generate_reply(&self, instructions: &str) -> Result<(), EngineError> {
        info!(instructions, "Engine asked for a reply");
        Ok(())
    }
}

/// Used when no Maps key is configured; replay never calls it.
struct Unconfigured(String);

#[async_trait]
impl DirectionsProvider for Unconfigured {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn directions(&self, _request: &DirectionsRequest) -> Result<Vec<Route>, DirectionsError> {
        Err(DirectionsError::NotConfigured(self.0.clone()))
    }
}

/// Image files in `dir`, sorted by name.
pub fn frame_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

pub async fn run(dir: PathBuf, interval_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let files = frame_files(&dir)?;
    if files.is_empty() {
        return Err(format!("No image frames found in {}", dir.display()).into());
    }

    let directions: Arc<dyn DirectionsProvider> = match lookout_providers::build_from_config(&config)
    {
        Ok(provider) => provider,
        Err(e) => Arc::new(Unconfigured(e.to_string())),
    };

    let transport = Arc::new(LocalTransport::new());
    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    let session = Session::new(
        &config,
        transport.clone(),
        Arc::new(LoggingEngine),
        directions,
        events.clone(),
    );
    session.start().await?;

    println!("▶️  Replaying {} frame(s) from {}\n", files.len(), dir.display());

    let participant = ParticipantId::new("replay");
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable frame");
                continue;
            }
        };
        if let Err(e) = transport
            .send_bytes(&config.session.frame_topic, &name, &participant, &bytes, CHUNK_SIZE)
            .await
        {
            warn!(file = %name, error = %e, "Frame was not delivered");
        }
        tokio::time::sleep(Duration::from_millis(interval_ms)).await;
    }

    session.pool().join_all().await;
    let ctx = session.store().snapshot();
    session.teardown().await;

    let mut fused = 0;
    let mut dropped = 0;
    loop {
        let event = match rx.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Replay summary missed events");
                continue;
            }
            Err(_) => break,
        };
        match event.as_ref() {
            DomainEvent::FrameFused { .. } => fused += 1,
            DomainEvent::FrameDropped { stream_id, reason, .. } => {
                dropped += 1;
                println!("  ⚠️  {stream_id}: {reason}");
            }
            _ => {}
        }
    }

    println!("\n📊 Replay summary");
    println!("  Frames sent:     {}", files.len());
    println!("  Frames fused:    {fused}");
    println!("  Frames dropped:  {dropped}");
    println!("  Context turns:   {} (version {})", ctx.len(), ctx.version());
    println!("  Image turns:     {}", ctx.image_count());

    Ok(())
}

//! Selftest command - replay a simulation against the mock device

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

use passthru_sim::simulation::load_simulation;
use passthru_sim::{
    MockPassThruDevice, PlaybackEngine, PlaybackEvent, PlaybackState, PresetTable,
    SimulationPreset,
};
use passthru_types::codec::format_data;

use crate::output::{OutputContext, SelftestRow};

/// Shortest wait for one pair to be answered
const MIN_PAIR_WAIT: Duration = Duration::from_secs(1);

/// What happened to one injected stimulus
enum Outcome {
    Sent { simulation_channel: u32 },
    Matched,
    Failed(String),
    TimedOut,
}

/// Inject every recorded stimulus and report how each was answered
pub async fn selftest(
    path: &Path,
    preset: Option<&str>,
    no_responses: bool,
    ctx: &OutputContext,
) -> Result<()> {
    let loaded = load_simulation(path)
        .with_context(|| format!("Failed to load simulation file: {}", path.display()))?;
    if loaded.skipped > 0 {
        ctx.warn(&format!("Skipped {} unreadable channel entries", loaded.skipped));
    }
    let Some(first) = loaded.channels.first() else {
        bail!("No channels in {}", path.display());
    };

    let presets = PresetTable::builtin().context("Failed to load bundled presets")?;
    let config = match preset {
        Some(name) => presets.resolve(name)?.to_config(),
        None => presets
            .by_protocol(first.protocol)
            .map(SimulationPreset::to_config)
            .unwrap_or_default(),
    };
    let pair_wait = config.reader_timeout().saturating_mul(10).max(MIN_PAIR_WAIT);

    let device = Arc::new(MockPassThruDevice::new());
    let engine = PlaybackEngine::with_config(device.clone(), config)
        .context("Invalid playback config")?;
    let report = engine.load_channels(loaded.channels.clone());
    engine.set_responses_enabled(!no_responses);
    ctx.info(&format!(
        "Loaded {} channels ({} skipped)",
        report.loaded, report.skipped
    ));

    let mut events = engine.subscribe();
    engine.initialize().await.context("Failed to initialize reader")?;
    engine.start().await.context("Failed to start playback")?;

    let mut rows = Vec::new();
    for channel in &loaded.channels {
        for (index, pair) in channel.message_pairs.iter().enumerate() {
            let result = if pair.message_responses.is_empty() {
                "no responses".to_string()
            } else {
                device.inject_incoming(pair.message_read.clone());
                match next_outcome(&mut events, pair_wait).await {
                    Outcome::Sent { simulation_channel } if simulation_channel == channel.channel_id => {
                        "sent".to_string()
                    }
                    Outcome::Sent { simulation_channel } => {
                        format!("sent by channel {}", simulation_channel)
                    }
                    Outcome::Matched => "matched".to_string(),
                    Outcome::Failed(message) => format!("failed: {}", message),
                    Outcome::TimedOut => "timed out".to_string(),
                }
            };
            rows.push(SelftestRow {
                channel: channel.channel_id,
                pair: index,
                request: format_data(&pair.message_read.data_bytes),
                responses: pair.message_responses.len(),
                result,
            });
        }
    }

    if engine.state() == PlaybackState::Reading {
        engine.stop().await.context("Failed to stop playback")?;
    }

    let sent = device.written().len();
    ctx.print(&rows);
    ctx.success(&format!(
        "Replayed {} pairs, {} response messages written",
        rows.len(),
        sent
    ));
    Ok(())
}

async fn next_outcome(events: &mut broadcast::Receiver<PlaybackEvent>, wait: Duration) -> Outcome {
    let outcome = tokio::time::timeout(wait, async {
        loop {
            match events.recv().await {
                Ok(PlaybackEvent::MessageProcessed {
                    simulation_channel,
                    sent: true,
                    ..
                }) => return Outcome::Sent { simulation_channel },
                Ok(PlaybackEvent::MessageProcessed { sent: false, .. }) => {
                    // A failed write is followed by its loop error
                    if let Ok(PlaybackEvent::LoopError { message, .. }) =
                        tokio::time::timeout(Duration::from_millis(50), events.recv())
                            .await
                            .unwrap_or(Err(RecvError::Closed))
                    {
                        return Outcome::Failed(message);
                    }
                    return Outcome::Matched;
                }
                Ok(PlaybackEvent::LoopError { kind, message }) if kind.is_fatal() => {
                    return Outcome::Failed(message);
                }
                Ok(PlaybackEvent::ReaderStopped) | Err(RecvError::Closed) => {
                    return Outcome::Failed("reader stopped".to_string());
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
    })
    .await;
    outcome.unwrap_or(Outcome::TimedOut)
}

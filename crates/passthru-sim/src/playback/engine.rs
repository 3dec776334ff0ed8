//! Playback engine
//!
//! Keeps a reader channel open on the device, matches what the tester sends
//! against recorded stimuli and answers on a channel rebuilt from the
//! recording. The reader is restored after every answer.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use passthru_types::PassThruMsg;

use super::events::{LoopErrorKind, PlaybackEvent};
use crate::config::PlaybackConfig;
use crate::device::{DeviceError, PassThruDevice};
use crate::error::SimResult;
use crate::simulation::{self, SimulationChannel, SimulationMessagePair};

const EVENT_CAPACITY: usize = 256;

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Connected,
    Reading,
    Stopped,
}

/// Errors returned to callers of the engine
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Reader is not initialized")]
    NotInitialized,

    #[error("Reader is already running")]
    AlreadyReading,

    #[error("Reader is not running")]
    NotReading,

    #[error("Invalid playback config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Outcome of loading channels into the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Failure inside one loop iteration
struct LoopFailure {
    kind: LoopErrorKind,
    message: String,
}

impl LoopFailure {
    fn new(kind: LoopErrorKind, error: impl std::fmt::Display) -> Self {
        Self {
            kind,
            message: error.to_string(),
        }
    }
}

struct EngineInner {
    device: Arc<dyn PassThruDevice>,
    config: RwLock<PlaybackConfig>,
    channels: RwLock<Vec<SimulationChannel>>,
    /// Device channel currently connected, reader or response
    live_channel: RwLock<Option<u32>>,
    responses_enabled: AtomicBool,
    state: RwLock<PlaybackState>,
    events: broadcast::Sender<PlaybackEvent>,
}

/// Replays simulation channels against a PassThru device
pub struct PlaybackEngine {
    inner: Arc<EngineInner>,
    reader_task: Mutex<Option<(JoinHandle<()>, CancellationToken)>>,
}

impl PlaybackEngine {
    pub fn new(device: Arc<dyn PassThruDevice>) -> Self {
        Self::build(device, PlaybackConfig::default())
    }

    /// Fails on a config with a zero read count or zero response attempts
    pub fn with_config(device: Arc<dyn PassThruDevice>, config: PlaybackConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self::build(device, config))
    }

    fn build(device: Arc<dyn PassThruDevice>, config: PlaybackConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(EngineInner {
                device,
                config: RwLock::new(config),
                channels: RwLock::new(Vec::new()),
                live_channel: RwLock::new(None),
                responses_enabled: AtomicBool::new(true),
                state: RwLock::new(PlaybackState::Idle),
                events,
            }),
            reader_task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PlaybackState {
        *self.inner.state.read()
    }

    /// Snapshot of the loaded channels
    pub fn channels(&self) -> Vec<SimulationChannel> {
        self.inner.channels.read().clone()
    }

    pub fn config(&self) -> PlaybackConfig {
        self.inner.config.read().clone()
    }

    /// Device channel currently connected
    pub fn live_channel(&self) -> Option<u32> {
        *self.inner.live_channel.read()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.events.subscribe()
    }

    pub fn responses_enabled(&self) -> bool {
        self.inner.responses_enabled.load(Ordering::SeqCst)
    }

    /// With responses disabled matches are reported but nothing is sent
    pub fn set_responses_enabled(&self, enabled: bool) {
        self.inner.responses_enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "Playback responses toggled");
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Load every channel of a simulation file
    pub fn load_simulation(&self, path: impl AsRef<Path>) -> SimResult<LoadReport> {
        let loaded = simulation::load_simulation(path)?;
        let mut report = self.load_channels(loaded.channels);
        report.skipped += loaded.skipped;
        Ok(report)
    }

    /// Add channels, skipping ones without pairs and ids already loaded
    pub fn load_channels(&self, channels: impl IntoIterator<Item = SimulationChannel>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut loaded = self.inner.channels.write();

        for channel in channels {
            if channel.message_pairs.is_empty() {
                warn!(channel_id = channel.channel_id, "Skipping channel without message pairs");
                report.skipped += 1;
            } else if loaded.iter().any(|c| c.channel_id == channel.channel_id) {
                warn!(channel_id = channel.channel_id, "Skipping duplicate channel");
                report.skipped += 1;
            } else {
                loaded.push(channel);
                report.loaded += 1;
            }
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            total = loaded.len(),
            "Loaded simulation channels"
        );
        report
    }

    pub fn add_channel(&self, channel: SimulationChannel) {
        debug!(channel_id = channel.channel_id, "Adding simulation channel");
        self.inner.channels.write().push(channel);
    }

    /// Remove every channel with this id
    pub fn remove_channel(&self, channel_id: u32) -> bool {
        let mut channels = self.inner.channels.write();
        let before = channels.len();
        channels.retain(|c| c.channel_id != channel_id);
        before != channels.len()
    }

    /// Remove the first channel equal to `channel`
    pub fn remove_channel_ref(&self, channel: &SimulationChannel) -> bool {
        let mut channels = self.inner.channels.write();
        match channels.iter().position(|c| c == channel) {
            Some(index) => {
                channels.remove(index);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Reader lifecycle
    // =========================================================================

    /// Replace the reader defaults.
    ///
    /// Filters and configs are pushed to the live channel at once; with no
    /// live channel they are applied on the next initialize.
    pub async fn set_defaults(&self, config: PlaybackConfig) -> Result<(), PlaybackError> {
        config
            .validate()
            .map_err(|e| PlaybackError::InvalidConfig(e.to_string()))?;
        *self.inner.config.write() = config.clone();

        let Some(channel_id) = self.live_channel() else {
            debug!("Reader defaults staged");
            return Ok(());
        };

        let device = &self.inner.device;
        if !config.configs.is_empty() {
            device.set_config(channel_id, &config.configs).await?;
        }
        for filter in &config.filters {
            device.start_filter(channel_id, filter).await?;
        }
        info!(
            channel_id,
            filters = config.filters.len(),
            configs = config.configs.len(),
            "Reader defaults applied"
        );
        Ok(())
    }

    /// Open the device if needed and connect the reader channel
    pub async fn initialize(&self) -> Result<(), PlaybackError> {
        if self.state() == PlaybackState::Reading {
            return Err(PlaybackError::AlreadyReading);
        }
        self.inner.setup_reader().await?;
        *self.inner.state.write() = PlaybackState::Connected;
        Ok(())
    }

    /// Start the replay loop
    pub async fn start(&self) -> Result<(), PlaybackError> {
        let mut task = self.reader_task.lock().await;
        match self.state() {
            PlaybackState::Reading => return Err(PlaybackError::AlreadyReading),
            PlaybackState::Connected => {}
            PlaybackState::Idle | PlaybackState::Stopped => return Err(PlaybackError::NotInitialized),
        }

        let cancel = CancellationToken::new();
        *self.inner.state.write() = PlaybackState::Reading;
        let handle = tokio::spawn(self.inner.clone().run(cancel.clone()));
        *task = Some((handle, cancel));
        info!(channels = self.inner.channels.read().len(), "Playback started");
        Ok(())
    }

    /// Stop the replay loop and disconnect the live channel
    pub async fn stop(&self) -> Result<(), PlaybackError> {
        let mut task = self.reader_task.lock().await;
        if self.state() != PlaybackState::Reading {
            return Err(PlaybackError::NotReading);
        }

        if let Some((handle, cancel)) = task.take() {
            cancel.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "Replay loop ended abnormally");
            }
        }

        self.inner.disconnect_live().await;
        *self.inner.state.write() = PlaybackState::Stopped;
        info!("Playback stopped");
        Ok(())
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        if let Some((handle, cancel)) = self.reader_task.get_mut().take() {
            cancel.cancel();
            handle.abort();
        }
    }
}

impl EngineInner {
    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.send(event);
    }

    async fn disconnect_live(&self) {
        let live = self.live_channel.write().take();
        if let Some(channel_id) = live {
            if let Err(e) = self.device.disconnect(channel_id).await {
                warn!(channel_id, error = %e, "Failed to disconnect channel");
            }
        }
    }

    /// Connect the reader channel with the current defaults
    async fn setup_reader(&self) -> Result<u32, DeviceError> {
        if !self.device.is_open().await {
            self.device.open().await?;
        }
        self.disconnect_live().await;

        let config = self.config.read().clone();
        let connection = config.connection();
        let channel_id = self
            .device
            .connect(connection.protocol, connection.connect_flags, connection.baud_rate)
            .await?;
        *self.live_channel.write() = Some(channel_id);

        if !config.configs.is_empty() {
            self.device.set_config(channel_id, &config.configs).await?;
        }
        for filter in &config.filters {
            self.device.start_filter(channel_id, filter).await?;
        }
        self.device.clear_tx_buffer(channel_id).await?;
        self.device.clear_rx_buffer(channel_id).await?;

        debug!(
            channel_id,
            protocol = %connection.protocol,
            baud_rate = %connection.baud_rate,
            filters = config.filters.len(),
            "Reader channel ready"
        );
        Ok(channel_id)
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!("Replay loop started");
        while !cancel.is_cancelled() {
            if let Err(failure) = self.iteration().await {
                self.emit(PlaybackEvent::LoopError {
                    kind: failure.kind,
                    message: failure.message.clone(),
                });
                if failure.kind.is_fatal() {
                    error!(kind = %failure.kind, error = %failure.message, "Replay loop failed");
                    self.disconnect_live().await;
                    *self.state.write() = PlaybackState::Stopped;
                    break;
                }
                warn!(kind = %failure.kind, error = %failure.message, "Replay loop error");
            }
        }
        self.emit(PlaybackEvent::ReaderStopped);
        info!("Replay loop exited");
    }

    async fn iteration(&self) -> Result<(), LoopFailure> {
        let config = self.config.read().clone();
        let reader = (*self.live_channel.read())
            .ok_or_else(|| LoopFailure::new(LoopErrorKind::SetupReader, "no reader channel"))?;

        let messages = match self
            .device
            .read_messages(reader, config.reader_message_count, config.reader_timeout())
            .await
        {
            Ok(messages) => messages,
            Err(e) if e.is_timeout() => Vec::new(),
            Err(e) => {
                warn!(channel_id = reader, error = %e, "Read failed, treating as empty");
                tokio::time::sleep(config.reader_timeout()).await;
                Vec::new()
            }
        };
        if messages.is_empty() {
            tokio::task::yield_now().await;
            return Ok(());
        }

        self.clear_buffers(reader)
            .await
            .map_err(|e| LoopFailure::new(LoopErrorKind::SetupReader, e))?;

        let channels = self.channels.read().clone();
        for message in messages.iter().filter(|m| !m.is_echo()) {
            self.answer(&config, &channels, message).await?;
        }
        Ok(())
    }

    async fn answer(
        &self,
        config: &PlaybackConfig,
        channels: &[SimulationChannel],
        message: &PassThruMsg,
    ) -> Result<(), LoopFailure> {
        let Some((channel, pair)) = find_match(channels, message) else {
            debug!(data = %message.data_hex(), "No recorded pair for message");
            return Ok(());
        };
        if pair.message_responses.is_empty() {
            debug!(
                channel_id = channel.channel_id,
                data = %message.data_hex(),
                "Recorded pair has no responses"
            );
            return Ok(());
        }

        let response_channel = self
            .open_response_channel(channel, pair)
            .await
            .map_err(|e| LoopFailure::new(LoopErrorKind::GenerateResponseChannel, e))?;

        let outcome = if self.responses_enabled.load(Ordering::SeqCst) {
            self.send_responses(config, response_channel, pair).await
        } else {
            debug!(channel_id = channel.channel_id, "Responses disabled");
            Ok(false)
        };
        let sent = *outcome.as_ref().unwrap_or(&false);

        self.emit(PlaybackEvent::MessageProcessed {
            simulation_channel: channel.channel_id,
            request: message.clone(),
            responses: pair.message_responses.len(),
            sent,
        });

        self.setup_reader()
            .await
            .map_err(|e| LoopFailure::new(LoopErrorKind::SetupReader, e))?;
        outcome.map(|_| ())
    }

    /// Swap the live channel for one connected like the recorded channel
    async fn open_response_channel(
        &self,
        channel: &SimulationChannel,
        pair: &SimulationMessagePair,
    ) -> Result<u32, DeviceError> {
        self.disconnect_live().await;
        let device_channel = self
            .device
            .connect(channel.protocol, channel.connect_flags, channel.baud_rate)
            .await?;
        *self.live_channel.write() = Some(device_channel);

        for filter in channel.filters_for(pair) {
            if let Err(e) = self.device.start_filter(device_channel, filter).await {
                warn!(device_channel, error = %e, "Skipping filter on response channel");
            }
        }

        self.emit(PlaybackEvent::ChannelChanged {
            simulation_channel: channel.channel_id,
            device_channel,
        });
        debug!(
            simulation_channel = channel.channel_id,
            device_channel,
            protocol = %channel.protocol,
            "Response channel ready"
        );
        Ok(device_channel)
    }

    async fn send_responses(
        &self,
        config: &PlaybackConfig,
        channel_id: u32,
        pair: &SimulationMessagePair,
    ) -> Result<bool, LoopFailure> {
        let responses = &pair.message_responses;
        let mut written = 0;
        let mut last_error = None;
        for attempt in 1..=config.response_attempts {
            match self
                .device
                .write_messages(channel_id, &responses[written..], config.response_timeout())
                .await
            {
                Ok(sent) => {
                    written = (written + sent).min(responses.len());
                    debug!(channel_id, sent, written, attempt, "Responses written");
                    if written == responses.len() {
                        return Ok(true);
                    }
                }
                Err(e) => {
                    debug!(channel_id, attempt, error = %e, "Response write failed");
                    last_error = Some(e.to_string());
                }
            }
        }
        let message = last_error
            .unwrap_or_else(|| format!("wrote {} of {} responses", written, responses.len()));
        Err(LoopFailure::new(LoopErrorKind::MessageResponse, message))
    }

    async fn clear_buffers(&self, channel_id: u32) -> Result<(), DeviceError> {
        self.device.clear_tx_buffer(channel_id).await?;
        self.device.clear_rx_buffer(channel_id).await
    }
}

/// First channel and pair, in stored order, whose stimulus occurs in `message`
fn find_match<'a>(
    channels: &'a [SimulationChannel],
    message: &PassThruMsg,
) -> Option<(&'a SimulationChannel, &'a SimulationMessagePair)> {
    channels
        .iter()
        .find_map(|channel| channel.find_pair(message).map(|pair| (channel, pair)))
}

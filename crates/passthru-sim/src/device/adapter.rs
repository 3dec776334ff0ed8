//! PassThru device trait

use std::time::Duration;

use async_trait::async_trait;

use passthru_types::{BaudRate, ConfigParam, ConfigParamId, MessageFilter, PassThruMsg, ProtocolId};

use super::DeviceError;

/// Interface to a J2534 PassThru device
///
/// The playback engine drives the device through this trait only, so a
/// native driver binding and the in-memory mock are interchangeable.
/// Timeouts passed to read and write calls are enforced by the device.
#[async_trait]
pub trait PassThruDevice: Send + Sync {
    /// Open the device
    async fn open(&self) -> Result<(), DeviceError>;

    /// Close the device and every channel on it
    async fn close(&self) -> Result<(), DeviceError>;

    /// Check if the device is open
    async fn is_open(&self) -> bool;

    /// Connect a channel and return its id
    async fn connect(
        &self,
        protocol: ProtocolId,
        flags: u32,
        baud_rate: BaudRate,
    ) -> Result<u32, DeviceError>;

    async fn disconnect(&self, channel_id: u32) -> Result<(), DeviceError>;

    /// Read up to `count` messages, waiting at most `timeout`
    async fn read_messages(
        &self,
        channel_id: u32,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<PassThruMsg>, DeviceError>;

    /// Write messages and return how many were sent
    async fn write_messages(
        &self,
        channel_id: u32,
        messages: &[PassThruMsg],
        timeout: Duration,
    ) -> Result<usize, DeviceError>;

    /// Start a filter and return its id
    async fn start_filter(&self, channel_id: u32, filter: &MessageFilter) -> Result<u32, DeviceError>;

    async fn stop_filter(&self, channel_id: u32, filter_id: u32) -> Result<(), DeviceError>;

    /// IOCTL SET_CONFIG
    async fn set_config(&self, channel_id: u32, params: &[ConfigParam]) -> Result<(), DeviceError>;

    /// IOCTL GET_CONFIG
    async fn get_config(&self, channel_id: u32, id: ConfigParamId) -> Result<u32, DeviceError>;

    async fn clear_tx_buffer(&self, channel_id: u32) -> Result<(), DeviceError>;

    async fn clear_rx_buffer(&self, channel_id: u32) -> Result<(), DeviceError>;
}

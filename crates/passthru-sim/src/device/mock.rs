//! Mock PassThru device for testing and self tests

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use passthru_types::{BaudRate, ConfigParam, ConfigParamId, MessageFilter, PassThruMsg, ProtocolId};

use super::{DeviceError, PassThruDevice};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Open,
    Connect,
    Read,
    Write,
    StartFilter,
    SetConfig,
}

/// Calls recorded by the mock, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Open,
    Close,
    Connect {
        protocol: ProtocolId,
        flags: u32,
        baud_rate: BaudRate,
    },
    Disconnect(u32),
    Write(Vec<PassThruMsg>),
    StartFilter(MessageFilter),
    StopFilter(u32),
    SetConfig(Vec<ConfigParam>),
    ClearTx(u32),
    ClearRx(u32),
}

#[derive(Debug)]
struct MockChannel {
    filters: BTreeMap<u32, MessageFilter>,
    configs: HashMap<ConfigParamId, u32>,
}

#[derive(Debug, Default)]
struct MockState {
    next_channel_id: u32,
    next_filter_id: u32,
    channels: BTreeMap<u32, MockChannel>,
    calls: Vec<DeviceCall>,
    written: Vec<PassThruMsg>,
    failures: HashMap<MockOp, DeviceError>,
    write_limit: Option<usize>,
}

/// In-memory PassThru device
///
/// Injected messages queue up until a channel reads them. Clearing the RX
/// buffer does not drop injected traffic.
pub struct MockPassThruDevice {
    open: AtomicBool,
    inbound: Mutex<VecDeque<PassThruMsg>>,
    inbound_ready: Notify,
    state: Mutex<MockState>,
}

impl Default for MockPassThruDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPassThruDevice {
    pub fn new() -> Self {
        Self {
            open: AtomicBool::new(false),
            inbound: Mutex::new(VecDeque::new()),
            inbound_ready: Notify::new(),
            state: Mutex::new(MockState {
                next_channel_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Queue a message as if the tester had sent it
    pub fn inject_incoming(&self, msg: PassThruMsg) {
        self.inbound.lock().push_back(msg);
        self.inbound_ready.notify_one();
    }

    /// Make every later call of `op` fail with `error`
    pub fn fail(&self, op: MockOp, error: DeviceError) {
        self.state.lock().failures.insert(op, error);
    }

    pub fn clear_failure(&self, op: MockOp) {
        self.state.lock().failures.remove(&op);
    }

    /// Accept at most `limit` messages per write, `None` for no limit
    pub fn limit_writes(&self, limit: Option<usize>) {
        self.state.lock().write_limit = limit;
    }

    /// Every message written so far
    pub fn written(&self) -> Vec<PassThruMsg> {
        self.state.lock().written.clone()
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().calls.clone()
    }

    /// Ids of the channels currently connected
    pub fn connected_channels(&self) -> Vec<u32> {
        self.state.lock().channels.keys().copied().collect()
    }

    /// Filters started on a connected channel
    pub fn filters(&self, channel_id: u32) -> Vec<MessageFilter> {
        self.state
            .lock()
            .channels
            .get(&channel_id)
            .map(|c| c.filters.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check(&self, op: MockOp) -> Result<(), DeviceError> {
        match self.state.lock().failures.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn check_open(&self) -> Result<(), DeviceError> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DeviceError::NotOpen)
        }
    }

    fn with_channel<T>(
        &self,
        channel_id: u32,
        call: Option<DeviceCall>,
        f: impl FnOnce(&mut MockChannel) -> T,
    ) -> Result<T, DeviceError> {
        self.check_open()?;
        let mut state = self.state.lock();
        let channel = state
            .channels
            .get_mut(&channel_id)
            .ok_or(DeviceError::InvalidChannel(channel_id))?;
        let result = f(channel);
        if let Some(call) = call {
            state.calls.push(call);
        }
        Ok(result)
    }

    fn pop_inbound(&self, count: usize) -> Vec<PassThruMsg> {
        let mut inbound = self.inbound.lock();
        let n = count.min(inbound.len());
        inbound.drain(..n).collect()
    }
}

#[async_trait]
impl PassThruDevice for MockPassThruDevice {
    async fn open(&self) -> Result<(), DeviceError> {
        self.check(MockOp::Open)?;
        self.open.store(true, Ordering::SeqCst);
        self.state.lock().calls.push(DeviceCall::Open);
        Ok(())
    }

    async fn close(&self) -> Result<(), DeviceError> {
        self.open.store(false, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.channels.clear();
        state.calls.push(DeviceCall::Close);
        Ok(())
    }

    async fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn connect(
        &self,
        protocol: ProtocolId,
        flags: u32,
        baud_rate: BaudRate,
    ) -> Result<u32, DeviceError> {
        self.check_open()?;
        self.check(MockOp::Connect)?;

        let mut state = self.state.lock();
        let channel_id = state.next_channel_id;
        state.next_channel_id += 1;
        state.channels.insert(
            channel_id,
            MockChannel {
                filters: BTreeMap::new(),
                configs: HashMap::new(),
            },
        );
        state.calls.push(DeviceCall::Connect {
            protocol,
            flags,
            baud_rate,
        });
        tracing::debug!(channel_id, %protocol, %baud_rate, "Mock device: connected");
        Ok(channel_id)
    }

    async fn disconnect(&self, channel_id: u32) -> Result<(), DeviceError> {
        self.check_open()?;
        let mut state = self.state.lock();
        state
            .channels
            .remove(&channel_id)
            .ok_or(DeviceError::InvalidChannel(channel_id))?;
        state.calls.push(DeviceCall::Disconnect(channel_id));
        Ok(())
    }

    async fn read_messages(
        &self,
        channel_id: u32,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<PassThruMsg>, DeviceError> {
        self.with_channel(channel_id, None, |_| ())?;
        self.check(MockOp::Read)?;

        let messages = self.pop_inbound(count);
        if !messages.is_empty() {
            return Ok(messages);
        }

        let _ = tokio::time::timeout(timeout, self.inbound_ready.notified()).await;
        let messages = self.pop_inbound(count);
        if messages.is_empty() {
            return Err(DeviceError::Timeout(format!(
                "no messages within {}ms",
                timeout.as_millis()
            )));
        }
        Ok(messages)
    }

    async fn write_messages(
        &self,
        channel_id: u32,
        messages: &[PassThruMsg],
        _timeout: Duration,
    ) -> Result<usize, DeviceError> {
        self.check(MockOp::Write)?;
        let accepted = {
            let state = self.state.lock();
            state.write_limit.map_or(messages.len(), |limit| limit.min(messages.len()))
        };
        let messages = &messages[..accepted];
        self.with_channel(channel_id, Some(DeviceCall::Write(messages.to_vec())), |_| ())?;
        self.state.lock().written.extend_from_slice(messages);
        tracing::debug!(channel_id, count = messages.len(), "Mock device: wrote messages");
        Ok(messages.len())
    }

    async fn start_filter(&self, channel_id: u32, filter: &MessageFilter) -> Result<u32, DeviceError> {
        self.check(MockOp::StartFilter)?;
        let filter_id = {
            let mut state = self.state.lock();
            let id = state.next_filter_id;
            state.next_filter_id += 1;
            id
        };
        self.with_channel(channel_id, Some(DeviceCall::StartFilter(filter.clone())), |channel| {
            channel.filters.insert(filter_id, filter.clone());
        })?;
        Ok(filter_id)
    }

    async fn stop_filter(&self, channel_id: u32, filter_id: u32) -> Result<(), DeviceError> {
        self.with_channel(channel_id, Some(DeviceCall::StopFilter(filter_id)), |channel| {
            channel.filters.remove(&filter_id)
        })?
        .map(|_| ())
        .ok_or(DeviceError::InvalidFilter(filter_id))
    }

    async fn set_config(&self, channel_id: u32, params: &[ConfigParam]) -> Result<(), DeviceError> {
        self.check(MockOp::SetConfig)?;
        self.with_channel(channel_id, Some(DeviceCall::SetConfig(params.to_vec())), |channel| {
            for param in params {
                channel.configs.insert(param.id, param.value);
            }
        })
    }

    async fn get_config(&self, channel_id: u32, id: ConfigParamId) -> Result<u32, DeviceError> {
        self.with_channel(channel_id, None, |channel| {
            channel.configs.get(&id).copied().unwrap_or_default()
        })
    }

    async fn clear_tx_buffer(&self, channel_id: u32) -> Result<(), DeviceError> {
        self.with_channel(channel_id, Some(DeviceCall::ClearTx(channel_id)), |_| ())
    }

    async fn clear_rx_buffer(&self, channel_id: u32) -> Result<(), DeviceError> {
        self.with_channel(channel_id, Some(DeviceCall::ClearRx(channel_id)), |_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn msg(data: &[u8]) -> PassThruMsg {
        PassThruMsg::new(ProtocolId::Iso15765, data.to_vec())
    }

    #[tokio::test]
    async fn test_requires_open() {
        let device = MockPassThruDevice::new();
        let err = device
            .connect(ProtocolId::Can, 0, BaudRate::Can_500000)
            .await
            .unwrap_err();
        assert_eq!(err, DeviceError::NotOpen);
    }

    #[tokio::test]
    async fn test_connect_assigns_ids() {
        let device = MockPassThruDevice::new();
        device.open().await.unwrap();
        let first = device.connect(ProtocolId::Can, 0, BaudRate::Can_500000).await.unwrap();
        let second = device.connect(ProtocolId::Can, 0, BaudRate::Can_500000).await.unwrap();
        assert_eq!((first, second), (1, 2));

        device.disconnect(first).await.unwrap();
        assert_eq!(device.connected_channels(), vec![2]);
        assert_eq!(device.disconnect(first).await.unwrap_err(), DeviceError::InvalidChannel(1));
    }

    #[tokio::test]
    async fn test_read_injected_and_timeout() {
        let device = MockPassThruDevice::new();
        device.open().await.unwrap();
        let channel = device.connect(ProtocolId::Iso15765, 0, BaudRate::Iso15765_500000).await.unwrap();

        device.inject_incoming(msg(&[0x01]));
        device.inject_incoming(msg(&[0x02]));
        let read = device.read_messages(channel, 1, Duration::from_millis(10)).await.unwrap();
        assert_eq!(read, vec![msg(&[0x01])]);
        let read = device.read_messages(channel, 10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(read, vec![msg(&[0x02])]);

        let err = device
            .read_messages(channel, 10, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let device = MockPassThruDevice::new();
        device.open().await.unwrap();
        let channel = device.connect(ProtocolId::Iso15765, 0, BaudRate::Iso15765_500000).await.unwrap();

        device.fail(MockOp::Write, DeviceError::ConnectionFailed("bus off".into()));
        assert!(device.write_messages(channel, &[msg(&[0x01])], Duration::ZERO).await.is_err());
        device.clear_failure(MockOp::Write);
        assert_eq!(device.write_messages(channel, &[msg(&[0x01])], Duration::ZERO).await.unwrap(), 1);
        assert_eq!(device.written(), vec![msg(&[0x01])]);
    }

    #[tokio::test]
    async fn test_write_limit() {
        let device = MockPassThruDevice::new();
        device.open().await.unwrap();
        let channel = device.connect(ProtocolId::Can, 0, BaudRate::Can_500000).await.unwrap();

        device.limit_writes(Some(1));
        let sent = device
            .write_messages(channel, &[msg(&[0x01]), msg(&[0x02])], Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(sent, 1);
        assert_eq!(device.written(), vec![msg(&[0x01])]);
    }

    #[tokio::test]
    async fn test_filters_and_config() {
        let device = MockPassThruDevice::new();
        device.open().await.unwrap();
        let channel = device.connect(ProtocolId::Can, 0, BaudRate::Can_500000).await.unwrap();

        let filter = MessageFilter::pass(vec![0x00], vec![0x00]);
        let id = device.start_filter(channel, &filter).await.unwrap();
        assert_eq!(device.filters(channel), vec![filter]);
        device.stop_filter(channel, id).await.unwrap();
        assert!(device.filters(channel).is_empty());
        assert_eq!(device.stop_filter(channel, id).await.unwrap_err(), DeviceError::InvalidFilter(id));

        device
            .set_config(channel, &[ConfigParam::new(ConfigParamId::Loopback, 1)])
            .await
            .unwrap();
        assert_eq!(device.get_config(channel, ConfigParamId::Loopback).await.unwrap(), 1);
    }
}

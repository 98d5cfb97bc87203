//! Mock radio and board adapters for integration tests.
//!
//! Record every port call so tests can assert on the full command
//! history without a radio stack or real ADC/timer registers.

use std::collections::VecDeque;

use sensorbeacon::app::events::AppEvent;
use sensorbeacon::app::ports::{
    AdvKind, AdvertisingPort, AnalogPort, CharacteristicId, ConnHandle, EventSink, Flash,
    GattPort, Indication, IndicatorPort, LinkPort, TimerPort, WatchdogPort,
};
use sensorbeacon::config::AdvParams;
use sensorbeacon::error::{AdvError, BondError, LinkError, NotifyError, SensorError, SetValueError};
use sensorbeacon::sensors::AnalogChannel;

// ── Radio call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCall {
    Configure { payload: Vec<u8>, params: AdvParams },
    Start(AdvKind),
    Stop,
    Notify { peer: ConnHandle, characteristic: CharacteristicId, data: Vec<u8> },
    SetValue { characteristic: CharacteristicId, data: Vec<u8> },
    RequestSecurity(ConnHandle),
    Disconnect(ConnHandle),
    DeleteBonds,
    CollectGarbage,
}

// ── MockRadio ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockRadio {
    pub calls: Vec<RadioCall>,
    /// Results handed out by `start`, front first; `Ok` once empty.
    pub start_results: VecDeque<Result<(), AdvError>>,
    pub fail_all_starts: bool,
    pub notify_error: Option<NotifyError>,
    pub security_error: Option<LinkError>,
    pub delete_bonds_error: Option<BondError>,
    pub gc_results: VecDeque<Result<(), BondError>>,
}

#[allow(dead_code)]
impl MockRadio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn starts(&self) -> Vec<AdvKind> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RadioCall::Start(k) => Some(*k),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<(ConnHandle, Vec<u8>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RadioCall::Notify { peer, data, .. } => Some((*peer, data.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn last_payload(&self) -> Option<Vec<u8>> {
        self.calls.iter().rev().find_map(|c| match c {
            RadioCall::Configure { payload, .. } => Some(payload.clone()),
            _ => None,
        })
    }

    pub fn count(&self, want: &RadioCall) -> usize {
        self.calls.iter().filter(|c| *c == want).count()
    }
}

impl AdvertisingPort for MockRadio {
    fn configure(&mut self, payload: &[u8], params: &AdvParams) -> Result<(), AdvError> {
        self.calls.push(RadioCall::Configure {
            payload: payload.to_vec(),
            params: *params,
        });
        Ok(())
    }

    fn start(&mut self, kind: AdvKind) -> Result<(), AdvError> {
        self.calls.push(RadioCall::Start(kind));
        if self.fail_all_starts {
            return Err(AdvError::Busy);
        }
        self.start_results.pop_front().unwrap_or(Ok(()))
    }

    fn stop(&mut self) -> Result<(), AdvError> {
        self.calls.push(RadioCall::Stop);
        Ok(())
    }
}

impl GattPort for MockRadio {
    fn notify(
        &mut self,
        peer: ConnHandle,
        characteristic: CharacteristicId,
        data: &[u8],
    ) -> Result<(), NotifyError> {
        self.calls.push(RadioCall::Notify {
            peer,
            characteristic,
            data: data.to_vec(),
        });
        self.notify_error.map_or(Ok(()), Err)
    }

    fn set_value(
        &mut self,
        characteristic: CharacteristicId,
        data: &[u8],
    ) -> Result<(), SetValueError> {
        self.calls.push(RadioCall::SetValue {
            characteristic,
            data: data.to_vec(),
        });
        Ok(())
    }
}

impl LinkPort for MockRadio {
    fn request_security(&mut self, peer: ConnHandle) -> Result<(), LinkError> {
        self.calls.push(RadioCall::RequestSecurity(peer));
        self.security_error.map_or(Ok(()), Err)
    }

    fn disconnect(&mut self, peer: ConnHandle) -> Result<(), LinkError> {
        self.calls.push(RadioCall::Disconnect(peer));
        Ok(())
    }

    fn delete_bonds(&mut self) -> Result<(), BondError> {
        self.calls.push(RadioCall::DeleteBonds);
        self.delete_bonds_error.map_or(Ok(()), Err)
    }

    fn collect_garbage(&mut self) -> Result<(), BondError> {
        self.calls.push(RadioCall::CollectGarbage);
        self.gc_results.pop_front().unwrap_or(Ok(()))
    }
}

// ── MockBoard ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardCall {
    Feed,
    Sample(AnalogChannel),
    Schedule(u32),
}

pub struct MockBoard {
    pub calls: Vec<BoardCall>,
    /// LED traffic is kept apart from `calls`; it is not part of the tick order.
    pub indications: Vec<Indication>,
    pub flashes: Vec<Flash>,
    pub battery_raw: Result<u16, SensorError>,
    pub ntc_raw: Result<u16, SensorError>,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            indications: Vec::new(),
            flashes: Vec::new(),
            // 3600 mV battery, ~52 °C NTC with the default calibration.
            battery_raw: Ok(512),
            ntc_raw: Ok(100),
        }
    }

    pub fn clear(&mut self) {
        self.calls.clear();
        self.indications.clear();
        self.flashes.clear();
    }

    pub fn feeds(&self) -> usize {
        self.calls.iter().filter(|c| **c == BoardCall::Feed).count()
    }

    pub fn samples(&self) -> Vec<AnalogChannel> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BoardCall::Sample(ch) => Some(*ch),
                _ => None,
            })
            .collect()
    }

    pub fn last_schedule(&self) -> Option<u32> {
        self.calls.iter().rev().find_map(|c| match c {
            BoardCall::Schedule(ms) => Some(*ms),
            _ => None,
        })
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogPort for MockBoard {
    fn sample_blocking(&mut self, channel: AnalogChannel) -> Result<u16, SensorError> {
        self.calls.push(BoardCall::Sample(channel));
        match channel {
            AnalogChannel::Battery => self.battery_raw,
            AnalogChannel::Temperature => self.ntc_raw,
        }
    }
}

impl WatchdogPort for MockBoard {
    fn feed(&mut self) {
        self.calls.push(BoardCall::Feed);
    }
}

impl TimerPort for MockBoard {
    fn schedule_once(&mut self, delay_ms: u32) {
        self.calls.push(BoardCall::Schedule(delay_ms));
    }
}

impl IndicatorPort for MockBoard {
    fn indicate(&mut self, indication: Indication) {
        self.indications.push(indication);
    }

    fn flash(&mut self, flash: Flash) {
        self.flashes.push(flash);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, e: &AppEvent) -> bool {
        self.events.contains(e)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

use sensorbeacon::app::service::AppService;
use sensorbeacon::config::SystemConfig;
use sensorbeacon::error::Result as CoreResult;
use sensorbeacon::events::{Event, SecurityOutcome, WritePayload};

/// A started service wired to fresh mocks.
pub struct Rig {
    pub app: AppService,
    pub radio: MockRadio,
    pub board: MockBoard,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    pub fn with_config(config: SystemConfig) -> Self {
        let mut rig = Self::unstarted(config);
        rig.app
            .start(&mut rig.radio, &mut rig.board, &mut rig.sink)
            .expect("start");
        rig
    }

    pub fn unstarted(config: SystemConfig) -> Self {
        Self {
            app: AppService::new(config).expect("valid config"),
            radio: MockRadio::new(),
            board: MockBoard::new(),
            sink: RecordingSink::new(),
        }
    }

    pub fn event(&mut self, event: Event) -> CoreResult<()> {
        self.app
            .handle_event(event, &mut self.radio, &mut self.board, &mut self.sink)
    }

    pub fn tick(&mut self) -> CoreResult<()> {
        self.event(Event::Tick)
    }

    /// Connect `handle` and complete pairing.
    pub fn connect_secured(&mut self, handle: u16) {
        let handle = ConnHandle(handle);
        self.event(Event::Connected { handle }).expect("connect");
        self.event(Event::SecurityResult {
            handle,
            outcome: SecurityOutcome::Success,
        })
        .expect("security");
    }

    pub fn write(&mut self, handle: u16, characteristic: CharacteristicId, data: &[u8]) -> CoreResult<()> {
        self.event(Event::CharacteristicWrite {
            handle: ConnHandle(handle),
            characteristic,
            data: WritePayload::from_slice(data).expect("fits"),
        })
    }

    pub fn clear(&mut self) {
        self.radio.clear();
        self.board.clear();
        self.sink.events.clear();
    }
}

//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (radio stack, ADC, watchdog, timer, event sinks)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! Two bundle traits group the ports by the physical component that
//! provides them: [`RadioPort`] (the BLE stack) and [`BoardPort`] (ADC,
//! watchdog, timer, status LED).  Both are blanket-implemented.

use crate::config::AdvParams;
use crate::error::{AdvError, BondError, LinkError, NotifyError, SensorError, SetValueError};
use crate::sensors::AnalogChannel;

// ───────────────────────────────────────────────────────────────
// Shared identifiers
// ───────────────────────────────────────────────────────────────

/// Opaque identifier of a live link, assigned by the radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnHandle(pub u16);

impl core::fmt::Display for ConnHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Characteristics of the sensor service.  Each holds at most
/// [`CharacteristicId::MAX_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CharacteristicId {
    /// Notify-only data channel; every push goes here.
    Data = 0xFFE1,
    /// Write-only command channel.
    Command = 0xFFE2,
    /// Latest battery millivolts (i16 LE), read-only.
    Battery = 0xFFE3,
    /// Latest temperature centi-degrees (i16 LE), read-only.
    Temperature = 0xFFE4,
}

impl CharacteristicId {
    /// Declared value length of every characteristic.
    pub const MAX_LEN: usize = 20;

    pub const ALL: [Self; 4] = [Self::Data, Self::Command, Self::Battery, Self::Temperature];

    pub fn uuid16(self) -> u16 {
        self as u16
    }

    pub fn from_uuid16(uuid: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid16() == uuid)
    }
}

/// Requested advertising cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvKind {
    Fast,
    Slow,
}

// ───────────────────────────────────────────────────────────────
// Radio ports (driven adapter: domain → BLE stack)
// ───────────────────────────────────────────────────────────────

/// The advertising service of the radio stack.
pub trait AdvertisingPort {
    /// Replace the advertising payload and parameters.
    fn configure(&mut self, payload: &[u8], params: &AdvParams) -> Result<(), AdvError>;

    /// Start advertising with the last configured payload.
    fn start(&mut self, kind: AdvKind) -> Result<(), AdvError>;

    /// Stop advertising.  Stopping a non-running advertisement is `Ok`.
    fn stop(&mut self) -> Result<(), AdvError>;
}

/// GATT server primitives for the sensor service.
pub trait GattPort {
    /// Push `data` to `peer` on `characteristic`.
    fn notify(
        &mut self,
        peer: ConnHandle,
        characteristic: CharacteristicId,
        data: &[u8],
    ) -> Result<(), NotifyError>;

    /// Update the stored value so a peer read returns it.
    fn set_value(&mut self, characteristic: CharacteristicId, data: &[u8])
    -> Result<(), SetValueError>;
}

/// Link-layer and peer-manager operations.
pub trait LinkPort {
    /// Ask the peer to authenticate / encrypt the link.
    fn request_security(&mut self, peer: ConnHandle) -> Result<(), LinkError>;

    /// Tear the link down.  Completion arrives as a `Disconnected` event.
    fn disconnect(&mut self, peer: ConnHandle) -> Result<(), LinkError>;

    /// Purge all bonding material.  Completion arrives as `BondsDeleted`.
    fn delete_bonds(&mut self) -> Result<(), BondError>;

    /// Compact bond storage after a `BondStorageFull` report.
    fn collect_garbage(&mut self) -> Result<(), BondError>;
}

/// Everything the core needs from the radio stack.
pub trait RadioPort: AdvertisingPort + GattPort + LinkPort {}
impl<T: AdvertisingPort + GattPort + LinkPort> RadioPort for T {}

// ───────────────────────────────────────────────────────────────
// Board ports (driven adapter: domain → SoC peripherals)
// ───────────────────────────────────────────────────────────────

/// One blocking analog conversion.  Bounded latency; the caller brackets
/// it with watchdog feeds.
pub trait AnalogPort {
    fn sample_blocking(&mut self, channel: AnalogChannel) -> Result<u16, SensorError>;
}

/// Hardware watchdog.  Infallible from the caller's perspective.
pub trait WatchdogPort {
    fn feed(&mut self);
}

/// Single-shot timer driving the Tick Scheduler.
pub trait TimerPort {
    /// (Re-)arm the timer; a pending expiry is replaced.
    fn schedule_once(&mut self, delay_ms: u32);
}

/// Steady status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indication {
    Off,
    Advertising,
    Connected,
}

/// Short overlay acknowledging a button gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    /// Short press: LED on briefly.
    Press,
    /// Long press accepted: LED off briefly.
    FastConfirm,
}

/// Status LED.  Animation runs in the adapter; the core only states what
/// to show.
pub trait IndicatorPort {
    fn indicate(&mut self, indication: Indication);
    fn flash(&mut self, flash: Flash);
}

/// Everything the core needs from the board.
pub trait BoardPort: AnalogPort + WatchdogPort + TimerPort + IndicatorPort {}
impl<T: AnalogPort + WatchdogPort + TimerPort + IndicatorPort> BoardPort for T {}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, test recorder, ...).

use crate::fsm::LinkStateId;
use crate::fsm::advertising::AdvMode;
use crate::sensors::SensorReading;

use super::ports::ConnHandle;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has started advertising.
    Started,

    /// The link state machine moved.
    LinkChanged { from: LinkStateId, to: LinkStateId },

    /// Advertising (re)started in the given mode.
    AdvertisingStarted(AdvMode),

    /// Advertising stopped for a connection.
    AdvertisingStopped,

    /// A peer subscribed to / lost the notification push.
    Subscribed(ConnHandle),
    Unsubscribed(ConnHandle),

    /// Pairing failed; `purged` says whether bonds are being deleted.
    SecurityFailed { peer: ConnHandle, purged: bool },

    /// A sample completed.
    Sampled(SensorReading),
}

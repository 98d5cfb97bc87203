//! The single owned application state.
//!
//! `AppState` is the "blackboard" every handler reads from and writes
//! to: link state, advertising session, latest sensor reading,
//! notification subscription, tick bookkeeping and counters.  It is
//! owned by [`AppService`](crate::app::service::AppService) and passed by
//! `&mut` into the event and tick paths, so there is exactly one writer
//! at a time.

use crate::app::notify::NotificationChannel;
use crate::app::ports::{ConnHandle, Indication};
use crate::config::SystemConfig;
use crate::diagnostics::RuntimeMetrics;
use crate::fsm::LinkFsm;
use crate::fsm::advertising::{AdvMode, AdvertisingSession};
use crate::scheduler::TickScheduler;
use crate::sensors::SensorSampler;

/// The sole notification target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub peer: ConnHandle,
}

pub struct AppState {
    // -- Configuration --
    pub config: SystemConfig,

    // -- Connection --
    pub link: LinkFsm,
    /// Consecutive failed pairings since the last purge.
    pub security_failures: u8,
    /// A bond purge was requested and has not completed yet.
    pub bond_purge_pending: bool,

    // -- Advertising --
    pub adv: AdvertisingSession,

    // -- Sampling --
    pub sensors: SensorSampler,
    pub scheduler: TickScheduler,

    // -- Notification --
    pub notify: NotificationChannel,

    // -- User indication --
    /// Last steady indication handed to the board.
    pub indication: Option<Indication>,

    // -- Diagnostics --
    pub metrics: RuntimeMetrics,
}

impl AppState {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            link: LinkFsm::new(),
            security_failures: 0,
            bond_purge_pending: false,
            adv: AdvertisingSession::new(config.fast_mode_ticks()),
            sensors: SensorSampler::new(&config),
            scheduler: TickScheduler::new(
                config.tick_interval_ms,
                config.reconnect_tick_delay_ms,
                config.sampling_enabled,
            ),
            notify: NotificationChannel::new(),
            indication: None,
            metrics: RuntimeMetrics::default(),
            config,
        }
    }

    /// Whether a peer link is up (securing or secured).
    pub fn is_connected(&self) -> bool {
        self.link.state().handle().is_some()
    }

    /// What the status LED should show for the current link and mode.
    pub fn wanted_indication(&self) -> Indication {
        if self.is_connected() {
            Indication::Connected
        } else if self.adv.mode() != AdvMode::Idle {
            Indication::Advertising
        } else {
            Indication::Off
        }
    }
}

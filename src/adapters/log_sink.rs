//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production, stderr on host).

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] as one line.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | advertising"),
            AppEvent::LinkChanged { from, to } => info!("LINK  | {:?} -> {:?}", from, to),
            AppEvent::AdvertisingStarted(mode) => info!("ADV   | started {:?}", mode),
            AppEvent::AdvertisingStopped => info!("ADV   | stopped"),
            AppEvent::Subscribed(peer) => info!("NOTIFY| {} subscribed", peer),
            AppEvent::Unsubscribed(peer) => info!("NOTIFY| {} unsubscribed", peer),
            AppEvent::SecurityFailed { peer, purged } => {
                info!("SEC   | {} failed, bonds purged={}", peer, purged);
            }
            AppEvent::Sampled(r) => {
                info!(
                    "SENSE | batt={}mV temp={}.{:02}\u{00b0}C",
                    r.battery_mv,
                    r.temperature_centi / 100,
                    (r.temperature_centi % 100).unsigned_abs()
                );
            }
        }
    }
}

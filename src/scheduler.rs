//! Tick Scheduler bookkeeping.
//!
//! The scheduler owns the tick counter and the re-arm policy of the
//! single-shot tick timer.  It knows nothing about sensors or the radio;
//! [`AppService::tick`](crate::app::service::AppService::tick) sequences
//! the actual work and asks the scheduler what this tick is for.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  timer fires ─▶ Event::Tick ─▶ AppService::tick              │
//! │                                   │                          │
//! │                    begin() ◀──────┤  plan: channel, parity   │
//! │                                   │  feed · sample · feed    │
//! │                                   │  advertise / notify      │
//! │                    finish() ◀─────┘  count++, re-arm         │
//! │                                                              │
//! │  disconnect ─▶ rearm_soon()  (short delay, same count)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The timer is single-shot and re-armed on every tick, so the next
//! delay can change at any point without touching timer state.

use log::debug;

use crate::app::ports::TimerPort;
use crate::sensors::AnalogChannel;

/// What the current tick should do, derived from the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    /// Tick number (wraps).
    pub number: u32,
    /// Channel to sample, or `None` when sampling is disabled.
    pub channel: Option<AnalogChannel>,
    /// Odd ticks refresh a Slow advertisement.
    pub readvertise_slot: bool,
}

pub struct TickScheduler {
    count: u32,
    interval_ms: u32,
    reconnect_delay_ms: u32,
    sampling_enabled: bool,
}

impl TickScheduler {
    pub fn new(interval_ms: u32, reconnect_delay_ms: u32, sampling_enabled: bool) -> Self {
        Self {
            count: 0,
            interval_ms,
            reconnect_delay_ms,
            sampling_enabled,
        }
    }

    /// Ticks completed so far.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Plan the tick about to run.
    pub fn begin(&self) -> TickPlan {
        TickPlan {
            number: self.count,
            channel: self
                .sampling_enabled
                .then(|| AnalogChannel::for_tick(self.count)),
            readvertise_slot: self.count % 2 == 1,
        }
    }

    /// Close the tick and arm the next one at the regular interval.
    pub fn finish(&mut self, timer: &mut impl TimerPort) {
        self.count = self.count.wrapping_add(1);
        timer.schedule_once(self.interval_ms);
        debug!("Tick {} done, next in {} ms", self.count, self.interval_ms);
    }

    /// Arm the first tick after boot.
    pub fn arm(&self, timer: &mut impl TimerPort) {
        timer.schedule_once(self.interval_ms);
    }

    /// Replace the pending tick with one after the short reconnect delay.
    pub fn rearm_soon(&self, timer: &mut impl TimerPort) {
        timer.schedule_once(self.reconnect_delay_ms);
        debug!("Tick re-armed in {} ms", self.reconnect_delay_ms);
    }
}

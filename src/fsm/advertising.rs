//! Advertising session: the mode tag and its bookkeeping.
//!
//! ```text
//!            FastModeTrigger (disconnected)
//!   ┌──────┐ ───────────────────────────▶ ┌────────────────┐
//!   │ Slow │                              │ Fast{remaining}│
//!   └──────┘ ◀─────────────────────────── └────────────────┘
//!      ▲  │     remaining reaches 0              │
//!      │  │ connect                      connect │
//!      │  ▼                                      ▼
//!   disconnect ◀──────────── ┌──────┐ ◀──────────┘
//!                            │ Idle │
//!                            └──────┘
//! ```
//!
//! Fast mode is bounded in ticks, never in wall-clock time, so watchdog
//! stalls can't stretch it.

/// Current advertising mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvMode {
    /// Not advertising (a peer is connected).
    Idle,
    /// Short interval, bounded duration.
    Fast { remaining_ticks: u32 },
    /// Long interval, unbounded.
    Slow,
}

impl AdvMode {
    pub fn is_fast(&self) -> bool {
        matches!(self, Self::Fast { .. })
    }
}

/// Result of advancing the Fast countdown by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    /// Not in Fast mode; nothing to count.
    Inactive,
    /// Still in Fast mode.
    Running(u32),
    /// The window just ran out; mode is now Slow.
    Expired,
}

/// The single advertising session.
#[derive(Debug, Clone, Copy)]
pub struct AdvertisingSession {
    mode: AdvMode,
    /// Upper bound on `remaining_ticks`.
    fast_ticks: u32,
    /// Restart the advertisement at the next opportunity.
    pub pending_restart: bool,
    /// A Fast request arrived while connected; honour it on disconnect.
    pub fast_requested: bool,
    /// Consecutive failed start attempts.
    pub consecutive_failures: u8,
}

impl AdvertisingSession {
    pub fn new(fast_ticks: u32) -> Self {
        Self {
            mode: AdvMode::Idle,
            fast_ticks,
            pending_restart: false,
            fast_requested: false,
            consecutive_failures: 0,
        }
    }

    pub fn mode(&self) -> AdvMode {
        self.mode
    }

    pub fn fast_ticks(&self) -> u32 {
        self.fast_ticks
    }

    /// Enter a fresh Fast window.
    pub fn enter_fast(&mut self) {
        self.mode = AdvMode::Fast {
            remaining_ticks: self.fast_ticks,
        };
        self.fast_requested = false;
    }

    pub fn enter_slow(&mut self) {
        self.mode = AdvMode::Slow;
    }

    /// Stop advertising bookkeeping for a connection.
    pub fn enter_idle(&mut self) {
        self.mode = AdvMode::Idle;
        self.pending_restart = false;
    }

    /// Advance the Fast window by one tick; degrades to Slow at expiry.
    pub fn countdown(&mut self) -> Countdown {
        let AdvMode::Fast { remaining_ticks } = self.mode else {
            return Countdown::Inactive;
        };
        let remaining = remaining_ticks.saturating_sub(1);
        if remaining == 0 {
            self.mode = AdvMode::Slow;
            Countdown::Expired
        } else {
            self.mode = AdvMode::Fast {
                remaining_ticks: remaining,
            };
            Countdown::Running(remaining)
        }
    }
}

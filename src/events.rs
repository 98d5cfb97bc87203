//! Callback-driven event system.
//!
//! Events are produced by:
//! - BLE stack callbacks (connect, disconnect, security, writes, advertising)
//! - The single-shot tick timer
//! - The button driver (long press)
//!
//! Events are consumed by the main control loop, which hands them to
//! [`AppService::handle_event`](crate::app::service::AppService::handle_event)
//! one at a time, in arrival order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ BLE stack   │────▶│  Event Queue │────▶│              │
//! │ Button      │────▶│  (bounded)   │     │  Main Loop   │
//! │ Tick timer  │────▶│ TICK_PENDING │────▶│  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Queued events may be dropped when the queue is full (counted, see
//! [`take_dropped`]).  Ticks bypass the queue and are never lost.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::app::ports::{CharacteristicId, ConnHandle};

/// Maximum number of pending events.
const EVENT_QUEUE_CAP: usize = 16;

/// Bytes of a single characteristic write carried by an event.
pub type WritePayload = heapless::Vec<u8, { CharacteristicId::MAX_LEN }>;

/// Outcome of a pairing / encryption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityOutcome {
    Success,
    Failed,
}

/// Everything that can happen to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // ── Radio stack ───────────────────────────────────────
    /// A peer connected.
    Connected { handle: ConnHandle },
    /// The link went down (stack reason code).
    Disconnected { handle: ConnHandle, reason: u8 },
    /// Pairing / encryption finished.
    SecurityResult {
        handle: ConnHandle,
        outcome: SecurityOutcome,
    },
    /// The peer wrote a characteristic.  Oversized writes are dropped
    /// by the stack adapter before they get here.
    CharacteristicWrite {
        handle: ConnHandle,
        characteristic: CharacteristicId,
        data: WritePayload,
    },
    /// A bounded advertising window ran out without a connection.
    AdvertisingIdle,

    // ── Peer manager ──────────────────────────────────────
    /// All bonds were purged.
    BondsDeleted,
    /// Bond storage ran out of space while persisting a bond.
    BondStorageFull,
    /// Unexpected internal stack error.
    StackError(i32),

    // ── User input ────────────────────────────────────────
    /// Long press: enter Fast advertising.
    FastModeTrigger,
    /// Short press; flashes the status LED.
    ButtonPress,

    // ── Timer ─────────────────────────────────────────────
    /// The single-shot tick timer fired.
    Tick,
}

// ── Bounded MPSC queue ────────────────────────────────────────
//
// Stack callbacks, the timer task and the button ISR deferral all push;
// the main loop is the only consumer.

static EVENT_QUEUE: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP> = Channel::new();
static DROPPED: AtomicU32 = AtomicU32::new(0);

// The tick never competes for a queue slot: a lost tick would leave the
// single-shot timer un-armed for good.
static TICK_PENDING: AtomicBool = AtomicBool::new(false);

/// Flag a timer expiry.  Repeated expiries before the next drain coalesce
/// into one tick.
pub fn signal_tick() {
    TICK_PENDING.store(true, Ordering::Release);
}

fn take_tick() -> bool {
    TICK_PENDING.swap(false, Ordering::AcqRel)
}

/// Push an event into the queue.
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let sent = EVENT_QUEUE.try_send(event).is_ok();
    if !sent {
        DROPPED.fetch_add(1, Ordering::Relaxed);
    }
    sent
}

/// Events dropped on a full queue since the last call.
pub fn take_dropped() -> u32 {
    DROPPED.swap(0, Ordering::Relaxed)
}

/// Pop the next event from the queue.
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    EVENT_QUEUE.try_receive().ok()
}

/// Drain all pending events into a callback.
/// Processes queued events in FIFO order, then a pending tick.  Stops
/// early if the handler returns an error, leaving the rest pending.
pub fn drain_events<E>(mut handler: impl FnMut(Event) -> Result<(), E>) -> Result<(), E> {
    while let Some(event) = pop_event() {
        handler(event)?;
    }
    if take_tick() {
        handler(Event::Tick)?;
    }
    Ok(())
}

/// Check if the event queue is empty.
pub fn queue_is_empty() -> bool {
    EVENT_QUEUE.is_empty()
}

/// Number of pending events.
pub fn queue_len() -> usize {
    EVENT_QUEUE.len()
}

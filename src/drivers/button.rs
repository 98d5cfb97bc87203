//! ISR-debounced button driver with short and long press detection.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up. The GPIO fires on the
//! falling edge; the ISR records the raw timestamp into an atomic, and
//! [`ButtonDriver::tick`] (called from the main loop) runs the debounce
//! and gesture state machine.
//!
//! ## Gesture detection
//!
//! | Gesture     | Condition                 | Event                    |
//! |-------------|---------------------------|--------------------------|
//! | Short press | Released before 1 s       | `Event::ButtonPress`     |
//! | Long press  | Held for 1 s              | `Event::FastModeTrigger` |

use core::sync::atomic::{AtomicU32, Ordering};

use crate::events::Event;

const DEBOUNCE_MS: u32 = 50;
const LONG_PRESS_MS: u32 = 1000;

/// Raw ISR timestamp (milliseconds since boot, truncated to u32).
static BUTTON_ISR_TIMESTAMP: AtomicU32 = AtomicU32::new(0);

#[cfg(not(target_os = "espidf"))]
static SIM_BUTTON_DOWN: core::sync::atomic::AtomicBool = core::sync::atomic::AtomicBool::new(false);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    DebounceWait { since_ms: u32 },
    Pressed { since_ms: u32 },
    /// Long press already reported; wait for release.
    Held,
}

pub struct ButtonDriver {
    state: GestureState,
    last_isr_ms: u32,
}

impl Default for ButtonDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ButtonDriver {
    pub fn new() -> Self {
        Self {
            state: GestureState::Idle,
            last_isr_ms: 0,
        }
    }

    /// Advance the gesture machine.  Returns the event to queue, if any.
    pub fn tick(&mut self, now_ms: u32) -> Option<Event> {
        let isr_ms = BUTTON_ISR_TIMESTAMP.load(Ordering::Acquire);
        let new_press = isr_ms != self.last_isr_ms && isr_ms != 0;

        match self.state {
            GestureState::Idle => {
                if new_press {
                    self.last_isr_ms = isr_ms;
                    self.state = GestureState::DebounceWait { since_ms: now_ms };
                }
                None
            }

            GestureState::DebounceWait { since_ms } => {
                if now_ms.wrapping_sub(since_ms) >= DEBOUNCE_MS {
                    // Bounce that never settled low.
                    self.state = if is_pressed_hw() {
                        GestureState::Pressed { since_ms }
                    } else {
                        GestureState::Idle
                    };
                }
                None
            }

            GestureState::Pressed { since_ms } => {
                if now_ms.wrapping_sub(since_ms) >= LONG_PRESS_MS {
                    self.state = GestureState::Held;
                    return Some(Event::FastModeTrigger);
                }
                if !is_pressed_hw() {
                    self.state = GestureState::Idle;
                    return Some(Event::ButtonPress);
                }
                None
            }

            GestureState::Held => {
                if !is_pressed_hw() {
                    // Edges seen while held belong to this press.
                    self.last_isr_ms = isr_ms;
                    self.state = GestureState::Idle;
                }
                None
            }
        }
    }
}

#[cfg(target_os = "espidf")]
fn is_pressed_hw() -> bool {
    !crate::drivers::hw_init::gpio_read(crate::pins::BUTTON_GPIO)
}

#[cfg(not(target_os = "espidf"))]
fn is_pressed_hw() -> bool {
    SIM_BUTTON_DOWN.load(Ordering::Relaxed)
}

/// Simulate the switch level; pressing also fires the edge ISR.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_pressed(down: bool, now_ms: u32) {
    SIM_BUTTON_DOWN.store(down, Ordering::Relaxed);
    if down {
        button_isr_handler(now_ms);
    }
}

/// ISR handler for the button falling edge.  Lock-free atomic store.
pub fn button_isr_handler(now_ms: u32) {
    BUTTON_ISR_TIMESTAMP.store(now_ms, Ordering::Release);
}

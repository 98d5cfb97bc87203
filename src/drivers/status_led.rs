//! Single-colour status LED with a small pattern engine.
//!
//! The main loop calls [`StatusLed::tick`] every poll period; the engine
//! works out the level and drives the GPIO only when it changes.
//!
//! ## Priority (highest first)
//!
//! 1. **Flash**: gesture acknowledgement, held for [`FLASH_MS`]
//! 2. **Steady**: the indication chosen by the core
//!
//! | Indication  | Pattern                        |
//! |-------------|--------------------------------|
//! | Off         | dark                           |
//! | Advertising | 200 ms on, 1800 ms off         |
//! | Connected   | solid                          |
//!
//! On ESP-IDF the level goes to [`pins::STATUS_LED_GPIO`]; on host the
//! GPIO write is a no-op and the level is tracked in memory only.

use crate::app::ports::{Flash, Indication};
use crate::drivers::hw_init;
use crate::pins;

/// How long a gesture flash overrides the steady pattern.
pub const FLASH_MS: u32 = 200;

const BLINK_ON_MS: u32 = 200;
const BLINK_PERIOD_MS: u32 = 2000;

#[derive(Debug, Clone, Copy)]
struct ActiveFlash {
    lit: bool,
    remaining_ms: u32,
}

pub struct StatusLed {
    steady: Indication,
    flash: Option<ActiveFlash>,
    phase_ms: u32,
    lit: bool,
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLed {
    pub fn new() -> Self {
        Self {
            steady: Indication::Off,
            flash: None,
            phase_ms: 0,
            lit: false,
        }
    }

    /// Switch the steady pattern.  A new pattern starts at phase 0.
    pub fn show(&mut self, indication: Indication) {
        if indication != self.steady {
            self.steady = indication;
            self.phase_ms = 0;
        }
    }

    /// Override the steady pattern for [`FLASH_MS`].
    pub fn flash(&mut self, flash: Flash) {
        self.flash = Some(ActiveFlash {
            lit: matches!(flash, Flash::Press),
            remaining_ms: FLASH_MS,
        });
    }

    /// Advance by `delta_ms` and drive the pin.  Returns the new level.
    pub fn tick(&mut self, delta_ms: u32) -> bool {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms) % BLINK_PERIOD_MS;

        let level = match self.flash.as_mut() {
            Some(f) => {
                let lit = f.lit;
                f.remaining_ms = f.remaining_ms.saturating_sub(delta_ms);
                if f.remaining_ms == 0 {
                    self.flash = None;
                }
                lit
            }
            None => self.steady_level(),
        };

        if level != self.lit {
            hw_init::gpio_write(pins::STATUS_LED_GPIO, level);
            self.lit = level;
        }
        level
    }

    fn steady_level(&self) -> bool {
        match self.steady {
            Indication::Off => false,
            Indication::Connected => true,
            Indication::Advertising => self.phase_ms < BLINK_ON_MS,
        }
    }

    pub fn indication(&self) -> Indication {
        self.steady
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}

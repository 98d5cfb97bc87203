//! Board adapter — bridges the SoC peripherals to the board port traits.
//!
//! Owns the task watchdog, the tick timer and the status LED and reads the
//! ADC through [`hw_init`](crate::drivers::hw_init), exposing them through
//! [`AnalogPort`], [`WatchdogPort`], [`TimerPort`] and [`IndicatorPort`].
//! On non-espidf targets the underlying drivers use cfg-gated simulation
//! stubs.

use log::debug;

use crate::app::ports::{AnalogPort, Flash, Indication, IndicatorPort, TimerPort, WatchdogPort};
use crate::drivers::hw_init;
use crate::drivers::hw_timer::TickTimer;
use crate::drivers::status_led::StatusLed;
use crate::drivers::watchdog::Watchdog;
use crate::error::SensorError;
use crate::pins;
use crate::sensors::AnalogChannel;

/// Concrete adapter that combines the board hardware behind port traits.
pub struct BoardAdapter {
    watchdog: Watchdog,
    timer: TickTimer,
    led: StatusLed,
    ntc_settle_us: u32,
}

impl BoardAdapter {
    pub fn new(watchdog: Watchdog, timer: TickTimer, ntc_settle_us: u32) -> Self {
        Self {
            watchdog,
            timer,
            led: StatusLed::new(),
            ntc_settle_us,
        }
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn timer_mut(&mut self) -> &mut TickTimer {
        &mut self.timer
    }

    pub fn led(&self) -> &StatusLed {
        &self.led
    }

    /// Advance the LED pattern; called once per main-loop poll.
    pub fn tick_indicator(&mut self, delta_ms: u32) {
        self.led.tick(delta_ms);
    }
}

// ── AnalogPort implementation ─────────────────────────────────

impl AnalogPort for BoardAdapter {
    fn sample_blocking(&mut self, channel: AnalogChannel) -> Result<u16, SensorError> {
        let raw = match channel {
            AnalogChannel::Battery => hw_init::adc1_read(pins::BATTERY_ADC_CHANNEL),
            AnalogChannel::Temperature => {
                // Divider draws current; power it only for the conversion.
                hw_init::gpio_write(pins::NTC_ENABLE_GPIO, true);
                hw_init::delay_us(self.ntc_settle_us);
                let raw = hw_init::adc1_read(pins::NTC_ADC_CHANNEL);
                hw_init::gpio_write(pins::NTC_ENABLE_GPIO, false);
                raw
            }
        };
        debug!("ADC {:?} raw={:?}", channel, raw);
        raw.ok_or(SensorError::AdcReadFailed)
    }
}

// ── WatchdogPort / TimerPort implementation ──────────────────

impl WatchdogPort for BoardAdapter {
    fn feed(&mut self) {
        self.watchdog.feed();
    }
}

impl TimerPort for BoardAdapter {
    fn schedule_once(&mut self, delay_ms: u32) {
        self.timer.arm(delay_ms);
    }
}

// ── IndicatorPort implementation ─────────────────────────────

impl IndicatorPort for BoardAdapter {
    fn indicate(&mut self, indication: Indication) {
        self.led.show(indication);
    }

    fn flash(&mut self, flash: Flash) {
        self.led.flash(flash);
    }
}

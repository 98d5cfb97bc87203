//! GPIO / ADC assignments for the sensor beacon board.
//!
//! Every driver references this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Analog inputs (ADC1, oneshot)
// ---------------------------------------------------------------------------

/// Battery sense line behind the 1:2 resistor divider.
pub const BATTERY_ADC_CHANNEL: u32 = 2;

/// NTC thermistor divider tap.
pub const NTC_ADC_CHANNEL: u32 = 3;

// ---------------------------------------------------------------------------
// Digital outputs
// ---------------------------------------------------------------------------

/// Powers the NTC divider.  Driven HIGH only while the temperature channel
/// is being sampled.
pub const NTC_ENABLE_GPIO: i32 = 5;

/// Status LED, active-high.
pub const STATUS_LED_GPIO: i32 = 8;

// ---------------------------------------------------------------------------
// User button (active-low with internal pull-up)
// ---------------------------------------------------------------------------

pub const BUTTON_GPIO: i32 = 9;

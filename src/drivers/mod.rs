//! Hardware drivers and peripheral helpers.

pub mod button;
pub mod hw_init;
pub mod hw_timer;
pub mod status_led;
pub mod watchdog;

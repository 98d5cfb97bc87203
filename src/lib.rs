//! Sensor beacon firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod fsm;
pub mod scheduler;
pub mod sensors;
pub mod watchdog;

pub mod pins;

// The ESP-IDF implementations are guarded by cfg attributes inside;
// host builds get the simulation twins.
pub mod adapters;
pub mod drivers;

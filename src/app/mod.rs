//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the behaviour of the SensorBeacon peripheral:
//! connection lifecycle, advertising control, the per-tick sampling and
//! notification work, and peer command handling.  All interaction with
//! the radio and the board happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod advertising;
pub mod commands;
pub mod events;
pub mod lifecycle;
pub mod notify;
pub mod ports;
pub mod service;

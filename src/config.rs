//! System configuration parameters
//!
//! All tunable parameters for the SensorBeacon peripheral.  The defaults
//! reproduce the shipping firmware constants; a build can override them
//! by deserialising a `SystemConfig` before constructing the service.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest legacy advertising PDU payload.
pub const MAX_ADV_PAYLOAD: usize = 31;

/// What to do with bonding material after a failed pairing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairPolicy {
    /// Purge all bonds so the next attempt can pair from scratch.
    AutoRepair,
    /// Keep bonds; the user must clear them explicitly.
    RequireExplicitRepair,
}

/// Advertising parameters for one mode.
///
/// `interval` is in 0.625 ms units, `duration` in 10 ms units
/// (0 = advertise until connected).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvParams {
    pub interval: u16,
    pub duration: u16,
}

impl AdvParams {
    /// Interval in milliseconds (rounded down).
    pub fn interval_ms(&self) -> u32 {
        u32::from(self.interval) * 625 / 1000
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Identity ---
    /// Complete local name placed in the advertising payload.
    pub device_name: heapless::String<16>,
    /// Bluetooth SIG company identifier for the manufacturer data.
    pub company_id: u16,
    /// 16-bit UUID of the sensor service.
    pub service_uuid16: u16,
    /// Advertised TX power level (dBm).
    pub adv_tx_power_dbm: i8,

    // --- Timing ---
    /// Tick Scheduler interval (milliseconds).
    pub tick_interval_ms: u32,
    /// Delay of the first tick after a disconnect (milliseconds).
    pub reconnect_tick_delay_ms: u32,
    /// Fast-mode window after a user wake action (seconds).
    pub fast_mode_duration_secs: u32,
    /// Hardware watchdog timeout (milliseconds).
    pub watchdog_timeout_ms: u32,

    // --- Advertising ---
    pub fast_adv_interval: u16,
    pub fast_adv_duration: u16,
    pub slow_adv_interval: u16,
    pub slow_adv_duration: u16,
    /// Consecutive failed advertising starts tolerated before escalating.
    pub adv_start_retry_limit: u8,

    // --- Security ---
    /// Request authentication as soon as a peer connects.
    pub pairing_enabled: bool,
    pub repair_policy: RepairPolicy,
    /// Failed pairings before bonds are purged (AutoRepair only).
    pub security_failures_before_purge: u8,

    // --- Sampling ---
    pub sampling_enabled: bool,
    /// ADC internal reference (millivolts).
    pub adc_reference_mv: u32,
    pub adc_resolution_bits: u8,
    /// Input attenuation compensation applied after the reference scale.
    pub adc_prescale: u32,
    /// External resistor divider on the battery sense line.
    pub battery_divider_ratio: u32,

    // --- Thermistor ---
    pub ntc_r25_ohms: f32,
    pub ntc_beta: f32,
    pub ntc_series_ohms: f32,
    /// Settle time between powering the divider and sampling (µs).
    pub ntc_settle_us: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        // "Bbear" always fits in 16 bytes.
        let _ = device_name.push_str("Bbear");

        Self {
            device_name,
            company_id: 0xF1F1,
            service_uuid16: 0xFFE0,
            adv_tx_power_dbm: 4,

            tick_interval_ms: 5000,
            reconnect_tick_delay_ms: 1000,
            fast_mode_duration_secs: 60,
            watchdog_timeout_ms: 2000,

            fast_adv_interval: 500,  // 312.5 ms
            fast_adv_duration: 6000, // 60 s
            slow_adv_interval: 4000, // 2.5 s
            slow_adv_duration: 0,
            adv_start_retry_limit: 1,

            pairing_enabled: true,
            repair_policy: RepairPolicy::AutoRepair,
            security_failures_before_purge: 1,

            sampling_enabled: true,
            adc_reference_mv: 600,
            adc_resolution_bits: 10,
            adc_prescale: 6,
            battery_divider_ratio: 2,

            ntc_r25_ohms: 10_000.0,
            ntc_beta: 3950.0,
            ntc_series_ohms: 30_900.0,
            ntc_settle_us: 50,
        }
    }
}

impl SystemConfig {
    /// Number of ticks a Fast advertising window lasts.
    pub fn fast_mode_ticks(&self) -> u32 {
        self.fast_mode_duration_secs.saturating_mul(1000) / self.tick_interval_ms
    }

    pub fn fast_params(&self) -> AdvParams {
        AdvParams {
            interval: self.fast_adv_interval,
            duration: self.fast_adv_duration,
        }
    }

    pub fn slow_params(&self) -> AdvParams {
        AdvParams {
            interval: self.slow_adv_interval,
            duration: self.slow_adv_duration,
        }
    }

    pub fn tick_interval(&self) -> core::time::Duration {
        core::time::Duration::from_millis(u64::from(self.tick_interval_ms))
    }

    /// Reject configurations the core cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick interval must be non-zero"));
        }
        if self.reconnect_tick_delay_ms == 0 || self.reconnect_tick_delay_ms > self.tick_interval_ms
        {
            return Err(Error::Config("reconnect delay must be in 1..=tick interval"));
        }
        if self.fast_mode_ticks() == 0 {
            return Err(Error::Config("fast mode shorter than one tick"));
        }
        // One conversion plus the NTC settle time must fit well inside the window.
        if self.watchdog_timeout_ms <= 1 + self.ntc_settle_us / 1000 {
            return Err(Error::Config("watchdog timeout too short for a conversion"));
        }
        if self.adc_resolution_bits == 0 || self.adc_resolution_bits > 16 {
            return Err(Error::Config("ADC resolution must be 1..=16 bits"));
        }
        if self.adc_reference_mv == 0 || self.adc_prescale == 0 || self.battery_divider_ratio == 0 {
            return Err(Error::Config("ADC scale factors must be non-zero"));
        }
        if self.ntc_r25_ohms <= 0.0 || self.ntc_beta <= 0.0 || self.ntc_series_ohms <= 0.0 {
            return Err(Error::Config("thermistor parameters must be positive"));
        }
        if self.fast_adv_interval == 0 || self.slow_adv_interval == 0 {
            return Err(Error::Config("advertising interval must be non-zero"));
        }
        if crate::app::advertising::payload_len(self) > MAX_ADV_PAYLOAD {
            return Err(Error::Config("advertising payload exceeds 31 bytes"));
        }
        Ok(())
    }
}

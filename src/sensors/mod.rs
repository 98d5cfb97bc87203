//! Sensor subsystem — the two analog channels and the [`SensorSampler`].
//!
//! Battery and temperature are sampled on alternating ticks, never in the
//! same tick, so a tick blocks for at most one conversion.  Each channel
//! keeps its last good value; a failed or implausible conversion leaves
//! the previous value in place.

pub mod battery;
pub mod temperature;

use log::{debug, warn};

use crate::app::ports::AnalogPort;
use crate::config::SystemConfig;
use crate::error::SensorError;

use battery::AdcCalibration;
use temperature::NtcParams;

/// Analog input channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogChannel {
    /// Battery sense line (behind the resistor divider).
    Battery,
    /// NTC thermistor divider; powered only while sampling.
    Temperature,
}

impl AnalogChannel {
    /// Channel sampled on tick number `tick` (even: battery, odd: temperature).
    pub fn for_tick(tick: u32) -> Self {
        if tick % 2 == 0 {
            Self::Battery
        } else {
            Self::Temperature
        }
    }
}

/// Latest engineering-unit values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorReading {
    /// Battery voltage (mV).
    pub battery_mv: i16,
    /// Temperature (0.01 °C).
    pub temperature_centi: i16,
}

/// Converts raw samples and remembers the last good reading.
pub struct SensorSampler {
    calibration: AdcCalibration,
    ntc: NtcParams,
    reading: SensorReading,
}

impl SensorSampler {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            calibration: AdcCalibration::from_config(config),
            ntc: NtcParams::from_config(config),
            reading: SensorReading::default(),
        }
    }

    pub fn reading(&self) -> SensorReading {
        self.reading
    }

    /// Run one blocking conversion on `channel` and update the reading.
    ///
    /// Returns the new engineering value.  On error the previous value is
    /// kept.
    pub fn sample(
        &mut self,
        channel: AnalogChannel,
        adc: &mut impl AnalogPort,
    ) -> Result<i16, SensorError> {
        let raw = adc.sample_blocking(channel).inspect_err(|e| {
            warn!("Sampling {:?} failed: {}", channel, e);
        })?;

        let value = match channel {
            AnalogChannel::Battery => battery::battery_mv(raw, &self.calibration),
            AnalogChannel::Temperature => temperature::centi_degrees(
                raw,
                i32::from(self.reading.battery_mv),
                &self.calibration,
                &self.ntc,
            ),
        }
        .inspect_err(|e| warn!("{:?} raw={} rejected: {}", channel, raw, e))?;

        match channel {
            AnalogChannel::Battery => self.reading.battery_mv = value,
            AnalogChannel::Temperature => self.reading.temperature_centi = value,
        }
        debug!("{:?}: raw={} value={}", channel, raw, value);
        Ok(value)
    }
}

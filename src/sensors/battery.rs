//! Battery voltage conversion.
//!
//! The battery sense line sits behind a resistor divider and the ADC input
//! is attenuated, so the raw count is scaled three times:
//! reference → attenuation → divider.  Checked integer arithmetic
//! throughout, truncating after the reference scale.

use crate::config::SystemConfig;
use crate::error::SensorError;

/// ADC scale factors shared by both channels.
#[derive(Debug, Clone, Copy)]
pub struct AdcCalibration {
    pub reference_mv: u32,
    pub resolution_bits: u8,
    pub prescale: u32,
    pub divider_ratio: u32,
}

impl AdcCalibration {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            reference_mv: config.adc_reference_mv,
            resolution_bits: config.adc_resolution_bits,
            prescale: config.adc_prescale,
            divider_ratio: config.battery_divider_ratio,
        }
    }

    /// Voltage at the pin (mV), before the external divider.
    pub fn pin_millivolts(&self, raw: u16) -> Result<u32, SensorError> {
        let full_scale = 1u32
            .checked_shl(u32::from(self.resolution_bits))
            .ok_or(SensorError::OutOfRange)?;
        u32::from(raw)
            .checked_mul(self.reference_mv)
            .map(|scaled| scaled / full_scale)
            .and_then(|mv| mv.checked_mul(self.prescale))
            .ok_or(SensorError::OutOfRange)
    }
}

/// Battery voltage (mV) for a raw battery-channel sample.
pub fn battery_mv(raw: u16, cal: &AdcCalibration) -> Result<i16, SensorError> {
    let mv = cal
        .pin_millivolts(raw)?
        .checked_mul(cal.divider_ratio)
        .ok_or(SensorError::OutOfRange)?;
    i16::try_from(mv).map_err(|_| SensorError::OutOfRange)
}

//! NTC thermistor temperature (10 kOhm @ 25 C, B = 3950).
//!
//! The thermistor is the low side of a divider fed from the battery rail
//! through a fixed series resistor.  The divider is only powered while a
//! conversion is running (see the board adapter), so the rail voltage is
//! taken from the most recent battery sample.
//!
//! The simplified Beta equation converts resistance to temperature:
//!
//! ```text
//! R = Rs * v / (vbat - v)
//! T = 1 / (ln(R / R25) / B + 1 / 298.15) - 273.15
//! ```

use super::battery::AdcCalibration;
use crate::config::SystemConfig;
use crate::error::SensorError;

const T25_K: f32 = 298.15;
const KELVIN_OFFSET: f32 = 273.15;

#[derive(Debug, Clone, Copy)]
pub struct NtcParams {
    pub r25_ohms: f32,
    pub beta: f32,
    pub series_ohms: f32,
}

impl NtcParams {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            r25_ohms: config.ntc_r25_ohms,
            beta: config.ntc_beta,
            series_ohms: config.ntc_series_ohms,
        }
    }

    /// Thermistor resistance (Ohm) for a divider tap voltage.
    pub fn resistance(&self, tap_mv: f32, supply_mv: f32) -> Option<f32> {
        let headroom = supply_mv - tap_mv;
        (headroom > 0.0 && tap_mv > 0.0).then(|| self.series_ohms * tap_mv / headroom)
    }

    /// Temperature (°C) for a thermistor resistance.
    pub fn celsius(&self, resistance: f32) -> f32 {
        1.0 / ((resistance / self.r25_ohms).ln() / self.beta + 1.0 / T25_K) - KELVIN_OFFSET
    }
}

/// Temperature in 0.01 °C for a raw thermistor-channel sample.
///
/// `supply_mv` is the divider supply (the last battery reading).  A tap
/// voltage at or above the supply, or at zero, is `OutOfRange`.
pub fn centi_degrees(
    raw: u16,
    supply_mv: i32,
    cal: &AdcCalibration,
    ntc: &NtcParams,
) -> Result<i16, SensorError> {
    let tap_mv = cal.pin_millivolts(raw)? as f32;
    let resistance = ntc
        .resistance(tap_mv, supply_mv as f32)
        .ok_or(SensorError::OutOfRange)?;

    let centi = ntc.celsius(resistance) * 100.0;
    if !centi.is_finite() || centi < f32::from(i16::MIN) || centi > f32::from(i16::MAX) {
        return Err(SensorError::OutOfRange);
    }
    Ok(centi as i16)
}

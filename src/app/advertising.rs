//! Advertising Controller.
//!
//! Owns every call into the advertising service.  A (re)start is always
//! stop → rebuild payload from the current reading → configure → start,
//! because the payload is static for the lifetime of one advertisement.
//!
//! Payload layout (legacy advertising, at most 31 bytes):
//!
//! ```text
//! ┌───────────┬──────────────┬──────────────┬──────────┬──────────────────────────────────┐
//! │ Flags     │ Local name   │ UUID16 list  │ TX power │ Manufacturer data                │
//! │ 02 01 06  │ n+1 09 name  │ 03 03 lo hi  │ 02 0A tx │ 08 FF cid(2) batt(2) temp(2) fast│
//! └───────────┴──────────────┴──────────────┴──────────┴──────────────────────────────────┘
//! ```
//!
//! Start failures are retried on the next tick; more consecutive failures
//! than the configured limit are fatal.

use log::{debug, info, warn};

use crate::config::{MAX_ADV_PAYLOAD, SystemConfig};
use crate::error::{Error, FatalCause, Result};
use crate::fsm::advertising::AdvMode;
use crate::fsm::context::AppState;
use crate::sensors::SensorReading;

use super::events::AppEvent;
use super::ports::{AdvKind, AdvertisingPort, EventSink};

pub type AdvPayload = heapless::Vec<u8, MAX_ADV_PAYLOAD>;

const AD_FLAGS: u8 = 0x01;
const AD_UUID16_COMPLETE: u8 = 0x03;
const AD_NAME_COMPLETE: u8 = 0x09;
const AD_TX_POWER: u8 = 0x0A;
const AD_MANUFACTURER: u8 = 0xFF;
/// LE General Discoverable, BR/EDR not supported.
const FLAGS_LE_GENERAL: u8 = 0x06;
/// Company id + battery + temperature + fast flag.
const MANUFACTURER_LEN: usize = 2 + 2 + 2 + 1;

/// Encoded length of the payload for `config`.
pub fn payload_len(config: &SystemConfig) -> usize {
    3 + (2 + config.device_name.len()) + 4 + 3 + (2 + MANUFACTURER_LEN)
}

/// Encode the advertising payload.
pub fn build_payload(config: &SystemConfig, reading: &SensorReading, fast: bool) -> Result<AdvPayload> {
    let mut p = AdvPayload::new();
    let mut put = |ad_type: u8, data: &[u8]| -> Result<()> {
        let too_long = Error::Config("advertising payload exceeds 31 bytes");
        p.push(data.len() as u8 + 1).map_err(|_| too_long)?;
        p.push(ad_type).map_err(|_| too_long)?;
        p.extend_from_slice(data).map_err(|()| too_long)
    };

    put(AD_FLAGS, &[FLAGS_LE_GENERAL])?;
    put(AD_NAME_COMPLETE, config.device_name.as_bytes())?;
    put(AD_UUID16_COMPLETE, &config.service_uuid16.to_le_bytes())?;
    put(AD_TX_POWER, &[config.adv_tx_power_dbm as u8])?;

    let mut mfg = [0u8; MANUFACTURER_LEN];
    mfg[0..2].copy_from_slice(&config.company_id.to_le_bytes());
    mfg[2..4].copy_from_slice(&reading.battery_mv.to_le_bytes());
    mfg[4..6].copy_from_slice(&reading.temperature_centi.to_le_bytes());
    mfg[6] = u8::from(fast);
    put(AD_MANUFACTURER, &mfg)?;

    Ok(p)
}

/// (Re)start advertising in the session's current mode.
///
/// Returns `Ok(true)` when advertising is running, `Ok(false)` when the
/// attempt failed and will be retried on the next tick (or there was
/// nothing to start).  Exhausting the retries is fatal.
pub fn restart(
    state: &mut AppState,
    adv: &mut impl AdvertisingPort,
    sink: &mut impl EventSink,
) -> Result<bool> {
    let mode = state.adv.mode();
    let (kind, params) = match mode {
        AdvMode::Idle => {
            debug!("Advertising: restart requested while idle, ignored");
            return Ok(false);
        }
        AdvMode::Fast { .. } => (AdvKind::Fast, state.config.fast_params()),
        AdvMode::Slow => (AdvKind::Slow, state.config.slow_params()),
    };

    let payload = build_payload(&state.config, &state.sensors.reading(), mode.is_fast())?;

    let attempt = adv
        .stop()
        .and_then(|()| adv.configure(&payload, &params))
        .and_then(|()| adv.start(kind));

    match attempt {
        Ok(()) => {
            let session = &mut state.adv;
            session.pending_restart = false;
            session.consecutive_failures = 0;
            state.metrics.adv_starts += 1;
            info!(
                "Advertising {:?} started (interval {} ms)",
                kind,
                params.interval_ms()
            );
            sink.emit(&AppEvent::AdvertisingStarted(mode));
            Ok(true)
        }
        Err(e) => {
            let session = &mut state.adv;
            session.pending_restart = true;
            session.consecutive_failures = session.consecutive_failures.saturating_add(1);
            state.metrics.adv_start_failures += 1;
            if session.consecutive_failures > state.config.adv_start_retry_limit {
                return Err(FatalCause::AdvertisingUnavailable(e).into());
            }
            warn!(
                "Advertising {:?} start failed ({}), retry {}/{} next tick",
                kind, e, session.consecutive_failures, state.config.adv_start_retry_limit
            );
            Ok(false)
        }
    }
}

/// Stop advertising for a connection and drop all mode bookkeeping.
pub fn stop(state: &mut AppState, adv: &mut impl AdvertisingPort, sink: &mut impl EventSink) {
    if let Err(e) = adv.stop() {
        // The stack stops advertising on its own when a link comes up.
        debug!("Advertising stop: {}", e);
    }
    if state.adv.mode() != AdvMode::Idle {
        info!("Advertising stopped");
        sink.emit(&AppEvent::AdvertisingStopped);
    }
    state.adv.enter_idle();
}

/// Begin a fresh Fast window and start it right away.
pub fn enter_fast(
    state: &mut AppState,
    adv: &mut impl AdvertisingPort,
    sink: &mut impl EventSink,
) -> Result<()> {
    state.adv.enter_fast();
    info!("Advertising: Fast for {} ticks", state.adv.fast_ticks());
    restart(state, adv, sink).map(|_| ())
}

/// Degrade to Slow and restart right away.
pub fn enter_slow(
    state: &mut AppState,
    adv: &mut impl AdvertisingPort,
    sink: &mut impl EventSink,
) -> Result<()> {
    state.adv.enter_slow();
    restart(state, adv, sink).map(|_| ())
}

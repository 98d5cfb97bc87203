//! Runtime diagnostics and the fatal halt-and-report path.
//!
//! [`RuntimeMetrics`] are plain counters maintained by the core and
//! logged periodically from the main loop.  [`halt_and_report`] is the
//! single exit for unrecoverable errors: it logs the cause with the last
//! metrics snapshot and resets the SoC.

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Counters accumulated since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeMetrics {
    pub ticks: u32,
    pub battery_samples: u32,
    pub temperature_samples: u32,
    pub sample_failures: u32,
    pub notifications_pushed: u32,
    pub notifications_dropped: u32,
    pub adv_starts: u32,
    pub adv_start_failures: u32,
    pub connections: u32,
    pub security_failures: u32,
    pub events_dropped: u32,
}

impl RuntimeMetrics {
    /// One-line summary for the periodic log.
    pub fn log_summary(&self) {
        info!(
            "metrics: ticks={} batt={} temp={} sample_err={} push={} drop={} adv={}/{} conn={} sec_fail={} evt_drop={}",
            self.ticks,
            self.battery_samples,
            self.temperature_samples,
            self.sample_failures,
            self.notifications_pushed,
            self.notifications_dropped,
            self.adv_starts,
            self.adv_start_failures,
            self.connections,
            self.security_failures,
            self.events_dropped,
        );

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: heap statistics are plain reads of allocator counters.
            let (free, min_free) = unsafe {
                (
                    esp_idf_svc::sys::esp_get_free_heap_size(),
                    esp_idf_svc::sys::esp_get_minimum_free_heap_size(),
                )
            };
            info!("heap: free={} min_free={}", free, min_free);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Halt and report
// ───────────────────────────────────────────────────────────────

/// Log a fatal error and reset.  Never returns.
///
/// On target the reset is `esp_restart()`; the task watchdog would reset
/// the SoC anyway if the restart somehow stalled.  On host builds this
/// panics so tests and simulations observe the halt.
pub fn halt_and_report(err: &Error, metrics: &RuntimeMetrics) -> ! {
    error!("FATAL: {}", err);
    match serde_json::to_string(metrics) {
        Ok(json) => error!("FATAL metrics: {}", json),
        Err(_) => metrics.log_summary(),
    }

    #[cfg(target_os = "espidf")]
    {
        log::logger().flush();
        // SAFETY: esp_restart has no preconditions and does not return.
        unsafe { esp_idf_svc::sys::esp_restart() }
    }

    #[cfg(not(target_os = "espidf"))]
    {
        panic!("halted: {err}");
    }
}

/// Install a panic hook that logs the panic reason before the default
/// handler aborts (and the SoC resets).
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };

        match info.location() {
            Some(loc) => error!("PANIC at {}:{}: {}", loc.file(), loc.line(), reason),
            None => error!("PANIC: {}", reason),
        }
    }));
}

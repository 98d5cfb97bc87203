//! Single-shot tick timer on ESP-IDF's esp_timer API.
//!
//! Every expiry flags a pending [`Event::Tick`](crate::events::Event::Tick)
//! for the main loop; the core re-arms the timer at the end of each tick,
//! so exactly one expiry is ever pending.  Re-arming replaces a pending expiry.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR).  The
//! expiry bypasses the bounded queue: a dropped tick would leave nothing
//! to re-arm the timer.

use crate::events::signal_tick;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::{info, warn};

#[cfg(target_os = "espidf")]
unsafe extern "C" fn tick_cb(_arg: *mut core::ffi::c_void) {
    fire();
}

/// Deliver one tick to the core.
fn fire() {
    signal_tick();
}

pub struct TickTimer {
    #[cfg(target_os = "espidf")]
    handle: esp_timer_handle_t,
    #[cfg(not(target_os = "espidf"))]
    armed_ms: Option<u32>,
}

impl TickTimer {
    /// Create the (unarmed) timer.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, i32> {
        let args = esp_timer_create_args_t {
            callback: Some(tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"tick".as_ptr(),
            skip_unhandled_events: true,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: args outlives the call; handle is written once here.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(ret);
        }
        info!("hw_timer: tick timer created");
        Ok(Self { handle })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, i32> {
        log::info!("hw_timer(sim): tick timer created");
        Ok(Self { armed_ms: None })
    }

    /// (Re-)arm for one expiry `delay_ms` from now.
    #[cfg(target_os = "espidf")]
    pub fn arm(&mut self, delay_ms: u32) {
        // SAFETY: handle came from esp_timer_create; main task only.
        unsafe {
            // Not running is fine: the timer is single-shot.
            esp_timer_stop(self.handle);
            let ret = esp_timer_start_once(self.handle, u64::from(delay_ms) * 1_000);
            if ret != ESP_OK as i32 {
                warn!("hw_timer: start_once failed (rc={})", ret);
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn arm(&mut self, delay_ms: u32) {
        self.armed_ms = Some(delay_ms);
    }

    /// Delay of the pending expiry, if any.
    #[cfg(not(target_os = "espidf"))]
    pub fn armed_ms(&self) -> Option<u32> {
        self.armed_ms
    }

    /// Expire the pending timer now (simulation loop).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_expire(&mut self) -> bool {
        match self.armed_ms.take() {
            Some(_) => {
                fire();
                true
            }
            None => false,
        }
    }
}

#[cfg(target_os = "espidf")]
impl Drop for TickTimer {
    fn drop(&mut self) {
        // SAFETY: handle is valid until deleted here.
        unsafe {
            esp_timer_stop(self.handle);
            esp_timer_delete(self.handle);
        }
    }
}

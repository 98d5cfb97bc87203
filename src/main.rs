//! Sensor Beacon Firmware — Main Entry Point
//!
//! Hexagonal architecture with event-driven execution.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleAdapter          BoardAdapter           LogEventSink       │
//! │  (Advertising+Gatt   (Analog+Watchdog       (EventSink)        │
//! │   +Link)              +Timer+Indicator)                        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Lifecycle · Advertising · Tick Scheduler · Notify     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Event queue ◀── stack callbacks · tick timer · button         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{info, warn};

use sensorbeacon::adapters::ble::BleAdapter;
use sensorbeacon::adapters::hardware::BoardAdapter;
use sensorbeacon::adapters::log_sink::LogEventSink;
use sensorbeacon::app::ports::WatchdogPort;
use sensorbeacon::app::service::AppService;
use sensorbeacon::config::SystemConfig;
use sensorbeacon::diagnostics::{self, RuntimeMetrics, halt_and_report};
use sensorbeacon::drivers::button::ButtonDriver;
use sensorbeacon::drivers::hw_init;
use sensorbeacon::drivers::hw_timer::TickTimer;
use sensorbeacon::drivers::watchdog::Watchdog;
use sensorbeacon::error::Error;
use sensorbeacon::events::{self, push_event};

/// Main loop poll period (button sampling, LED pattern, idle watchdog feed).
const POLL_MS: u32 = 20;
/// Ticks between metrics summaries (5 min at the default interval).
const METRICS_EVERY_TICKS: u32 = 60;

fn uptime_ms() -> u32 {
    // SAFETY: esp_timer_get_time is a plain counter read.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() } / 1_000) as u32
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SensorBeacon v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    diagnostics::install_panic_handler();

    let config = SystemConfig::default();
    match serde_json::to_string(&config) {
        Ok(json) => info!("Config: {}", json),
        Err(e) => warn!("Config not printable: {}", e),
    }

    // ── 2. Watchdog first, then peripherals ───────────────────
    let watchdog = Watchdog::new(config.watchdog_timeout_ms);

    if let Err(e) = hw_init::init_peripherals() {
        log::error!("HAL init failed: {}", e);
        halt_and_report(&Error::Init("peripherals"), &RuntimeMetrics::default());
    }
    if let Err(e) = hw_init::init_isr_service() {
        warn!("ISR service init failed: {} (button disabled)", e);
    }

    let timer = TickTimer::new().map_err(|rc| anyhow::anyhow!("tick timer (rc={rc})"))?;
    let mut board = BoardAdapter::new(watchdog, timer, config.ntc_settle_us);

    // ── 3. Radio stack ────────────────────────────────────────
    let mut radio = match BleAdapter::new(&config) {
        Ok(r) => r,
        Err(e) => halt_and_report(&e, &RuntimeMetrics::default()),
    };

    let mut sink = LogEventSink::new();
    let mut button = ButtonDriver::new();

    // ── 4. Core ───────────────────────────────────────────────
    let mut app = match AppService::new(config) {
        Ok(a) => a,
        Err(e) => halt_and_report(&e, &RuntimeMetrics::default()),
    };
    if let Err(e) = app.start(&mut radio, &mut board, &mut sink) {
        halt_and_report(&e, &app.metrics());
    }

    info!("System ready. Entering event loop.");

    // ── 5. Event loop ─────────────────────────────────────────
    let mut last_summary = 0;

    loop {
        let drained =
            events::drain_events(|event| app.handle_event(event, &mut radio, &mut board, &mut sink));
        if let Err(e) = drained {
            halt_and_report(&e, &app.metrics());
        }

        let dropped = events::take_dropped();
        if dropped > 0 {
            warn!("{} event(s) dropped on a full queue", dropped);
            app.record_dropped_events(dropped);
        }

        if let Some(event) = button.tick(uptime_ms()) {
            push_event(event);
        }
        board.tick_indicator(POLL_MS);

        let ticks = app.tick_count();
        if ticks.wrapping_sub(last_summary) >= METRICS_EVERY_TICKS {
            last_summary = ticks;
            app.metrics().log_summary();
        }

        // The loop itself is alive; ticks feed again around conversions.
        board.feed();
        FreeRtos::delay_ms(POLL_MS);
    }
}

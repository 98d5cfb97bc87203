//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the [`AppState`] and exposes a clean,
//! hardware-agnostic API: [`start`](AppService::start) once, then
//! [`handle_event`](AppService::handle_event) for every queued event.
//! All I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!   RadioPort ◀──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │         AppService            │
//!   BoardPort ◀──▶ │ Lifecycle · Advertising ·     │
//!                  │ Tick Scheduler · Notify       │
//!                  └──────────────────────────────┘
//! ```
//!
//! Any `Err` returned from this API is fatal; the caller routes it to
//! [`halt_and_report`](crate::diagnostics::halt_and_report).

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::diagnostics::RuntimeMetrics;
use crate::error::{FatalCause, Result};
use crate::events::Event;
use crate::fsm::LinkState;
use crate::fsm::advertising::{AdvMode, Countdown};
use crate::fsm::context::AppState;
use crate::scheduler::TickPlan;
use crate::sensors::{AnalogChannel, SensorReading};
use crate::watchdog::WatchdogGuard;

use super::commands::PeerCommand;
use super::events::AppEvent;
use super::notify::{self, KEEPALIVE_PAYLOAD, PushOutcome};
use super::ports::{
    AnalogPort, BoardPort, CharacteristicId, ConnHandle, EventSink, Flash, GattPort,
    IndicatorPort, RadioPort,
};
use super::{advertising, lifecycle};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    state: AppState,
}

impl AppService {
    /// Construct the service from a validated configuration.
    ///
    /// Does **not** touch the radio — call [`start`](Self::start) next.
    pub fn new(config: SystemConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: AppState::new(config),
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot: advertise in Fast mode (the device was woken by the user)
    /// and arm the first tick.
    pub fn start(
        &mut self,
        radio: &mut impl RadioPort,
        board: &mut impl BoardPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        advertising::enter_fast(&mut self.state, radio, sink)?;
        self.state.scheduler.arm(board);
        self.show_state(board);
        sink.emit(&AppEvent::Started);
        info!(
            "AppService started (tick every {:?})",
            self.state.config.tick_interval()
        );
        Ok(())
    }

    // ── Event dispatch ────────────────────────────────────────

    /// Process one event.  Events run to completion, one at a time.
    pub fn handle_event(
        &mut self,
        event: Event,
        radio: &mut impl RadioPort,
        board: &mut impl BoardPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let state = &mut self.state;
        let result = match event {
            Event::Tick => self.tick(radio, board, sink),
            Event::Connected { handle } => lifecycle::on_connect(state, handle, radio, sink),
            Event::Disconnected { handle, reason } => {
                lifecycle::on_disconnect(state, handle, reason, board, sink)
            }
            Event::SecurityResult { handle, outcome } => {
                lifecycle::on_security_result(state, handle, outcome, radio, sink)
            }
            Event::CharacteristicWrite {
                handle,
                characteristic,
                data,
            } => self.handle_write(handle, characteristic, &data, radio, sink),
            Event::AdvertisingIdle => {
                if state.is_connected() {
                    return Ok(());
                }
                info!("Advertising window ended, falling back to Slow");
                advertising::enter_slow(state, radio, sink)
            }
            Event::BondsDeleted => lifecycle::on_bonds_deleted(state, radio, sink),
            Event::BondStorageFull => lifecycle::on_bond_storage_full(radio),
            Event::StackError(code) => Err(FatalCause::StackFault(code).into()),
            Event::FastModeTrigger => {
                board.flash(Flash::FastConfirm);
                self.handle_fast_trigger(radio, sink)
            }
            Event::ButtonPress => {
                info!("Button press");
                board.flash(Flash::Press);
                Ok(())
            }
        };
        if result.is_ok() {
            self.show_state(board);
        }
        result
    }

    /// Push the steady indication to the board when it changed.
    fn show_state(&mut self, led: &mut impl IndicatorPort) {
        let wanted = self.state.wanted_indication();
        if self.state.indication != Some(wanted) {
            debug!("Indicator: {:?}", wanted);
            led.indicate(wanted);
            self.state.indication = Some(wanted);
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one tick: feed → sample → feed → advertise/notify → re-arm.
    pub fn tick(
        &mut self,
        radio: &mut impl RadioPort,
        board: &mut impl BoardPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let plan = self.state.scheduler.begin();
        self.state.metrics.ticks += 1;

        // 1-3. Blocking conversion inside a watchdog lease.
        {
            let mut adc = WatchdogGuard::new(board);
            if let Some(channel) = plan.channel {
                self.sample(channel, &mut *adc, radio, sink);
            }
        }

        // 4-5. Connection-dependent work.
        match self.state.link.state() {
            LinkState::Disconnected => self.tick_disconnected(&plan, radio, sink)?,
            LinkState::Securing { .. } | LinkState::Connected { .. } => {
                self.tick_connected(radio)?;
            }
        }

        // 6. Re-arm.
        self.state.scheduler.finish(board);
        Ok(())
    }

    fn sample(
        &mut self,
        channel: AnalogChannel,
        adc: &mut impl AnalogPort,
        gatt: &mut impl GattPort,
        sink: &mut impl EventSink,
    ) {
        let value = match self.state.sensors.sample(channel, adc) {
            Ok(v) => v,
            Err(_) => {
                // Transient; the next tick for this channel tries again.
                self.state.metrics.sample_failures += 1;
                return;
            }
        };

        let characteristic = match channel {
            AnalogChannel::Battery => {
                self.state.metrics.battery_samples += 1;
                CharacteristicId::Battery
            }
            AnalogChannel::Temperature => {
                self.state.metrics.temperature_samples += 1;
                CharacteristicId::Temperature
            }
        };
        if let Err(e) = gatt.set_value(characteristic, &value.to_le_bytes()) {
            warn!("Read-back update of {:?} failed: {}", characteristic, e);
        }
        sink.emit(&AppEvent::Sampled(self.state.sensors.reading()));
    }

    fn tick_disconnected(
        &mut self,
        plan: &TickPlan,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let session = &mut self.state.adv;
        if session.mode() == AdvMode::Idle {
            // Nothing is advertising while nobody is connected; recover.
            session.enter_slow();
            session.pending_restart = true;
        }

        match session.countdown() {
            Countdown::Expired => {
                info!("Fast advertising window over, degrading to Slow");
                session.pending_restart = true;
            }
            Countdown::Running(left) => debug!("Fast advertising: {} ticks left", left),
            Countdown::Inactive => {}
        }

        if self.state.bond_purge_pending {
            // BondsDeleted restarts advertising; wait for it at most one tick.
            info!("Bond purge in progress, holding advertising for one tick");
            self.state.bond_purge_pending = false;
            return Ok(());
        }

        let session = &self.state.adv;
        let refresh = session.mode() == AdvMode::Slow && plan.readvertise_slot;
        if session.pending_restart || refresh {
            advertising::restart(&mut self.state, radio, sink)?;
        }
        Ok(())
    }

    fn tick_connected(&mut self, radio: &mut impl RadioPort) -> Result<()> {
        if self.state.adv.mode() != AdvMode::Idle {
            self.state.adv.enter_idle();
        }

        let link = self.state.link.state();
        let outcome = self.state.notify.push(&link, radio, &KEEPALIVE_PAYLOAD)?;
        self.count_push(outcome);
        Ok(())
    }

    // ── Peer writes ───────────────────────────────────────────

    fn handle_write(
        &mut self,
        handle: ConnHandle,
        characteristic: CharacteristicId,
        data: &[u8],
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let link = self.state.link.state();
        if !link.is_live(handle) {
            debug!("Write from stale peer {} ignored", handle);
            return Ok(());
        }
        let Some(command) = PeerCommand::parse(characteristic, data) else {
            debug!("Ignoring write to {:?} ({} bytes)", characteristic, data.len());
            return Ok(());
        };

        let reading = self.state.sensors.reading();
        match command {
            PeerCommand::BatteryQuery => {
                let payload = notify::query_payload(command, reading.battery_mv);
                let outcome = notify::send(&link, radio, handle, &payload)?;
                self.count_push(outcome);
            }
            PeerCommand::TemperatureQuery => {
                let payload = notify::query_payload(command, reading.temperature_centi);
                let outcome = notify::send(&link, radio, handle, &payload)?;
                self.count_push(outcome);
            }
            PeerCommand::EnableNotifications => {
                self.state.notify.subscribe(handle);
                sink.emit(&AppEvent::Subscribed(handle));
            }
        }
        Ok(())
    }

    // ── User input ────────────────────────────────────────────

    fn handle_fast_trigger(
        &mut self,
        radio: &mut impl RadioPort,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if self.state.is_connected() {
            info!("Fast advertising requested while connected; deferred to disconnect");
            self.state.adv.fast_requested = true;
            return Ok(());
        }
        advertising::enter_fast(&mut self.state, radio, sink)
    }

    fn count_push(&mut self, outcome: PushOutcome) {
        match outcome {
            PushOutcome::Sent => self.state.metrics.notifications_pushed += 1,
            PushOutcome::Stale | PushOutcome::Dropped(_) => {
                self.state.metrics.notifications_dropped += 1;
            }
            PushOutcome::NoSubscriber => {}
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn link_state(&self) -> LinkState {
        self.state.link.state()
    }

    pub fn adv_mode(&self) -> AdvMode {
        self.state.adv.mode()
    }

    /// Whether a Fast request is waiting for the next disconnect.
    pub fn fast_requested(&self) -> bool {
        self.state.adv.fast_requested
    }

    pub fn subscriber(&self) -> Option<ConnHandle> {
        self.state.notify.subscriber()
    }

    pub fn reading(&self) -> SensorReading {
        self.state.sensors.reading()
    }

    /// Ticks completed since startup.
    pub fn tick_count(&self) -> u32 {
        self.state.scheduler.count()
    }

    pub fn metrics(&self) -> RuntimeMetrics {
        self.state.metrics
    }

    /// Record events lost to a full queue.
    pub fn record_dropped_events(&mut self, n: u32) {
        self.state.metrics.events_dropped += n;
    }

    pub fn config(&self) -> &SystemConfig {
        &self.state.config
    }
}

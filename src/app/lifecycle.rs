//! Connection Lifecycle — connect, security, disconnect and bond recovery.
//!
//! Every handler takes the application state by `&mut` plus the ports it
//! needs.  The hard contract of this module: a disconnect always ends
//! with advertising scheduled to resume within one short tick delay.

use log::{info, warn};

use crate::config::RepairPolicy;
use crate::error::{Error, FatalCause, Result};
use crate::events::SecurityOutcome;
use crate::fsm::context::AppState;
use crate::fsm::{LinkInput, LinkTransition};

use super::advertising;
use super::events::AppEvent;
use super::ports::{ConnHandle, EventSink, LinkPort, RadioPort, TimerPort};

fn emit_transition(sink: &mut impl EventSink, t: Option<LinkTransition>) {
    if let Some(t) = t {
        sink.emit(&AppEvent::LinkChanged {
            from: t.from.id(),
            to: t.to.id(),
        });
    }
}

/// A peer connected.
pub fn on_connect(
    state: &mut AppState,
    handle: ConnHandle,
    radio: &mut impl RadioPort,
    sink: &mut impl EventSink,
) -> Result<()> {
    info!("Peer {} connected", handle);
    state.metrics.connections += 1;

    let t = state.link.apply(LinkInput::Connect(handle));
    emit_transition(sink, t);

    // Single-connection device: no advertising while serving a peer.
    advertising::stop(state, radio, sink);

    if let Some(stale) = state.notify.clear_if_stale(handle) {
        info!("Notify: stale subscriber {} cleared", stale);
        sink.emit(&AppEvent::Unsubscribed(stale));
    }

    if !state.config.pairing_enabled {
        let t = state.link.apply(LinkInput::SecuritySucceeded(handle));
        emit_transition(sink, t);
        return Ok(());
    }

    match radio.request_security(handle) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("Security request for {} failed: {}", handle, e);
            on_security_failure(state, handle, radio, sink)
        }
    }
}

/// Pairing / encryption finished.
pub fn on_security_result(
    state: &mut AppState,
    handle: ConnHandle,
    outcome: SecurityOutcome,
    radio: &mut impl RadioPort,
    sink: &mut impl EventSink,
) -> Result<()> {
    if !state.link.state().is_live(handle) {
        warn!("Security result for stale peer {} ignored", handle);
        return Ok(());
    }

    match outcome {
        SecurityOutcome::Success => {
            info!("Peer {} secured", handle);
            state.security_failures = 0;
            let t = state.link.apply(LinkInput::SecuritySucceeded(handle));
            emit_transition(sink, t);
            Ok(())
        }
        SecurityOutcome::Failed => on_security_failure(state, handle, radio, sink),
    }
}

/// Tear the link down after a failed pairing and, per policy, purge bonds
/// so the next attempt can pair from scratch.
fn on_security_failure(
    state: &mut AppState,
    handle: ConnHandle,
    radio: &mut impl RadioPort,
    sink: &mut impl EventSink,
) -> Result<()> {
    state.metrics.security_failures += 1;
    state.security_failures = state.security_failures.saturating_add(1);

    let t = state.link.apply(LinkInput::SecurityFailed(handle));
    emit_transition(sink, t);

    if let Some(peer) = state.notify.clear() {
        sink.emit(&AppEvent::Unsubscribed(peer));
    }

    if let Err(e) = radio.disconnect(handle) {
        warn!("Disconnect of {} failed: {}", handle, e);
    }

    let purge = state.config.repair_policy == RepairPolicy::AutoRepair
        && state.security_failures >= state.config.security_failures_before_purge;
    if purge {
        radio
            .delete_bonds()
            .map_err(|e| Error::from(FatalCause::BondDeletion(e)))?;
        info!("Bonds purged after {} failed pairing(s)", state.security_failures);
        state.security_failures = 0;
        state.bond_purge_pending = true;
    }

    warn!("Pairing with {} failed (purged={})", handle, purge);
    sink.emit(&AppEvent::SecurityFailed {
        peer: handle,
        purged: purge,
    });

    // The stack's Disconnected event re-arms the tick; if it never comes,
    // the next regular tick still restarts advertising.
    state.adv.enter_slow();
    state.adv.pending_restart = true;
    Ok(())
}

/// The link went down.  Idempotent: a disconnect after a security failure
/// (link already torn down locally) runs the same cleanup.
pub fn on_disconnect(
    state: &mut AppState,
    handle: ConnHandle,
    reason: u8,
    timer: &mut impl TimerPort,
    sink: &mut impl EventSink,
) -> Result<()> {
    let link = state.link.state();
    if link.handle().is_some() && !link.is_live(handle) {
        warn!("Disconnect of stale peer {} ignored (live: {:?})", handle, link);
        return Ok(());
    }

    info!("Peer {} disconnected (reason 0x{:02X})", handle, reason);
    let t = state.link.apply(LinkInput::Disconnect(handle));
    emit_transition(sink, t);

    if let Some(peer) = state.notify.clear() {
        info!("Notify: {} unsubscribed", peer);
        sink.emit(&AppEvent::Unsubscribed(peer));
    }

    if state.adv.fast_requested {
        info!("Advertising: honouring pending Fast request");
        state.adv.enter_fast();
    } else {
        state.adv.enter_slow();
    }
    state.adv.pending_restart = true;
    state.scheduler.rearm_soon(timer);
    Ok(())
}

/// The peer manager finished purging bonds.
pub fn on_bonds_deleted(
    state: &mut AppState,
    radio: &mut impl RadioPort,
    sink: &mut impl EventSink,
) -> Result<()> {
    info!("Bonds deleted");
    state.bond_purge_pending = false;
    if state.is_connected() {
        return Ok(());
    }
    if state.adv.mode().is_fast() {
        advertising::restart(state, radio, sink).map(|_| ())
    } else {
        advertising::enter_slow(state, radio, sink)
    }
}

/// Bond storage is full: compact it, retrying once before giving up.
pub fn on_bond_storage_full(links: &mut impl LinkPort) -> Result<()> {
    warn!("Bond storage full, collecting garbage");
    if let Err(first) = links.collect_garbage() {
        warn!("Bond storage GC failed ({}), retrying once", first);
        links
            .collect_garbage()
            .map_err(|e| Error::from(FatalCause::BondStorage(e)))?;
    }
    info!("Bond storage compacted");
    Ok(())
}

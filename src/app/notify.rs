//! Notification Channel — the single-subscriber push path.
//!
//! Every push goes out on the [`Data`](CharacteristicId::Data)
//! characteristic and only to a peer whose handle is still the live
//! link.  A push to a peer that has gone away is a silent no-op; a
//! payload longer than the characteristic is rejected before it reaches
//! the stack.

use log::{debug, info, warn};

use crate::error::NotifyError;
use crate::fsm::LinkState;
use crate::fsm::context::Subscription;

use super::commands::PeerCommand;
use super::ports::{CharacteristicId, ConnHandle, GattPort};

/// Pushed every tick to a subscribed peer.
pub const KEEPALIVE_PAYLOAD: [u8; 3] = [0x03, 0x00, 0x00];

/// Answer to a one-shot query: opcode followed by the value (LE).
pub fn query_payload(command: PeerCommand, value: i16) -> [u8; 3] {
    let [lo, hi] = value.to_le_bytes();
    [command.opcode(), lo, hi]
}

/// What happened to a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Handed to the stack.
    Sent,
    /// Nobody is subscribed.
    NoSubscriber,
    /// The target no longer matches the live link.
    Stale,
    /// The stack refused it; dropped.
    Dropped(NotifyError),
}

#[derive(Debug, Default)]
pub struct NotificationChannel {
    subscription: Option<Subscription>,
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber(&self) -> Option<ConnHandle> {
        self.subscription.map(|s| s.peer)
    }

    /// Record `peer` as the sole target, replacing any previous one.
    pub fn subscribe(&mut self, peer: ConnHandle) {
        if let Some(old) = self.subscription.replace(Subscription { peer }) {
            if old.peer != peer {
                info!("Notify: subscriber {} replaced by {}", old.peer, peer);
            }
        } else {
            info!("Notify: {} subscribed", peer);
        }
    }

    /// Drop the subscription.  Returns the peer that was subscribed.
    pub fn clear(&mut self) -> Option<ConnHandle> {
        self.subscription.take().map(|s| s.peer)
    }

    /// Drop the subscription if it belongs to anyone but `live`.
    pub fn clear_if_stale(&mut self, live: ConnHandle) -> Option<ConnHandle> {
        match self.subscription {
            Some(s) if s.peer != live => self.clear(),
            _ => None,
        }
    }

    /// Push `payload` to the subscriber.
    pub fn push(
        &self,
        link: &LinkState,
        gatt: &mut impl GattPort,
        payload: &[u8],
    ) -> Result<PushOutcome, NotifyError> {
        match self.subscriber() {
            Some(peer) => send(link, gatt, peer, payload),
            None => {
                check_len(payload)?;
                Ok(PushOutcome::NoSubscriber)
            }
        }
    }
}

/// Push `payload` to `peer` if it is still the live link.
pub fn send(
    link: &LinkState,
    gatt: &mut impl GattPort,
    peer: ConnHandle,
    payload: &[u8],
) -> Result<PushOutcome, NotifyError> {
    check_len(payload)?;

    if !link.is_live(peer) {
        debug!("Notify: {} no longer live, push skipped", peer);
        return Ok(PushOutcome::Stale);
    }

    match gatt.notify(peer, CharacteristicId::Data, payload) {
        Ok(()) => Ok(PushOutcome::Sent),
        Err(e) => {
            warn!("Notify to {} dropped: {}", peer, e);
            Ok(PushOutcome::Dropped(e))
        }
    }
}

fn check_len(payload: &[u8]) -> Result<(), NotifyError> {
    if payload.len() > CharacteristicId::MAX_LEN {
        return Err(NotifyError::PayloadTooLarge);
    }
    Ok(())
}

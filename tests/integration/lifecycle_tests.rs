//! Connection lifecycle: connect, pairing, disconnect and bond recovery.

use sensorbeacon::app::events::AppEvent;
use sensorbeacon::app::ports::{AdvKind, CharacteristicId, ConnHandle};
use sensorbeacon::config::{RepairPolicy, SystemConfig};
use sensorbeacon::error::{BondError, Error, FatalCause, LinkError};
use sensorbeacon::events::{Event, SecurityOutcome};
use sensorbeacon::fsm::advertising::AdvMode;
use sensorbeacon::fsm::{LinkState, LinkStateId};

use crate::mock_hw::{BoardCall, RadioCall, Rig};

const H1: ConnHandle = ConnHandle(1);
const H2: ConnHandle = ConnHandle(2);

#[test]
fn start_advertises_fast_and_arms_first_tick() {
    let rig = Rig::new();

    assert_eq!(rig.radio.starts(), vec![AdvKind::Fast]);
    assert_eq!(
        rig.radio.calls.first(),
        Some(&RadioCall::Stop),
        "a start is always stop → configure → start"
    );
    assert_eq!(rig.board.calls, vec![BoardCall::Schedule(5000)]);
    assert_eq!(rig.app.adv_mode(), AdvMode::Fast { remaining_ticks: 12 });
    assert!(rig.sink.contains(&AppEvent::Started));
    assert!(rig.sink.contains(&AppEvent::AdvertisingStarted(AdvMode::Fast {
        remaining_ticks: 12
    })));
}

#[test]
fn connect_stops_advertising_and_requests_security() {
    let mut rig = Rig::new();
    rig.clear();

    rig.event(Event::Connected { handle: H1 }).unwrap();

    assert_eq!(rig.app.link_state(), LinkState::Securing { handle: H1 });
    assert_eq!(rig.app.adv_mode(), AdvMode::Idle);
    assert_eq!(rig.radio.count(&RadioCall::Stop), 1);
    assert_eq!(rig.radio.count(&RadioCall::RequestSecurity(H1)), 1);
    assert!(rig.sink.contains(&AppEvent::AdvertisingStopped));
    assert!(rig.sink.contains(&AppEvent::LinkChanged {
        from: LinkStateId::Disconnected,
        to: LinkStateId::Securing,
    }));

    rig.event(Event::SecurityResult {
        handle: H1,
        outcome: SecurityOutcome::Success,
    })
    .unwrap();
    assert_eq!(rig.app.link_state(), LinkState::Connected { handle: H1 });
}

#[test]
fn pairing_disabled_connects_without_security() {
    let config = SystemConfig {
        pairing_enabled: false,
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(config);

    rig.event(Event::Connected { handle: H1 }).unwrap();

    assert_eq!(rig.app.link_state(), LinkState::Connected { handle: H1 });
    assert_eq!(rig.radio.count(&RadioCall::RequestSecurity(H1)), 0);
}

#[test]
fn disconnect_restarts_slow_after_short_delay() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.clear();

    rig.event(Event::Disconnected {
        handle: H1,
        reason: 0x13,
    })
    .unwrap();

    assert_eq!(rig.app.link_state(), LinkState::Disconnected);
    assert_eq!(rig.app.adv_mode(), AdvMode::Slow);
    assert_eq!(rig.board.last_schedule(), Some(1000));
    assert!(rig.radio.starts().is_empty(), "restart waits for the tick");

    rig.tick().unwrap();
    assert_eq!(rig.radio.starts(), vec![AdvKind::Slow]);
    assert_eq!(rig.board.last_schedule(), Some(5000));
}

#[test]
fn disconnect_clears_subscription() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.write(1, CharacteristicId::Command, &[0x03]).unwrap();
    assert_eq!(rig.app.subscriber(), Some(H1));

    rig.event(Event::Disconnected { handle: H1, reason: 0 }).unwrap();

    assert_eq!(rig.app.subscriber(), None);
    assert!(rig.sink.contains(&AppEvent::Unsubscribed(H1)));
}

#[test]
fn stale_disconnect_is_ignored() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.clear();

    rig.event(Event::Disconnected { handle: H2, reason: 0 }).unwrap();

    assert_eq!(rig.app.link_state(), LinkState::Connected { handle: H1 });
    assert!(rig.board.calls.is_empty());
}

#[test]
fn new_connection_replaces_live_link_and_stale_subscriber() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.write(1, CharacteristicId::Command, &[0x03]).unwrap();

    rig.event(Event::Connected { handle: H2 }).unwrap();

    assert_eq!(rig.app.link_state(), LinkState::Securing { handle: H2 });
    assert_eq!(rig.app.subscriber(), None);
    assert!(rig.sink.contains(&AppEvent::Unsubscribed(H1)));
}

#[test]
fn security_failure_disconnects_and_purges_bonds() {
    let mut rig = Rig::new();
    rig.event(Event::Connected { handle: H1 }).unwrap();
    rig.clear();

    rig.event(Event::SecurityResult {
        handle: H1,
        outcome: SecurityOutcome::Failed,
    })
    .unwrap();

    assert_eq!(rig.app.link_state(), LinkState::Disconnected);
    assert_eq!(rig.radio.count(&RadioCall::Disconnect(H1)), 1);
    assert_eq!(rig.radio.count(&RadioCall::DeleteBonds), 1);
    assert!(rig.sink.contains(&AppEvent::SecurityFailed {
        peer: H1,
        purged: true
    }));
    assert_eq!(rig.app.metrics().security_failures, 1);

    // Purge completion restarts advertising straight away.
    rig.event(Event::BondsDeleted).unwrap();
    assert_eq!(rig.radio.starts(), vec![AdvKind::Slow]);

    // The stack's own disconnect arrives afterwards and only re-arms.
    rig.event(Event::Disconnected {
        handle: H1,
        reason: 0x05,
    })
    .unwrap();
    assert_eq!(rig.app.link_state(), LinkState::Disconnected);
    assert_eq!(rig.board.last_schedule(), Some(1000));
}

#[test]
fn purge_in_flight_holds_advertising_for_one_tick() {
    let mut rig = Rig::new();
    rig.event(Event::Connected { handle: H1 }).unwrap();
    rig.event(Event::SecurityResult {
        handle: H1,
        outcome: SecurityOutcome::Failed,
    })
    .unwrap();
    rig.clear();

    rig.tick().unwrap();
    assert!(rig.radio.starts().is_empty(), "waiting for BondsDeleted");
    assert_eq!(rig.board.last_schedule(), Some(5000));

    // BondsDeleted never came; the next tick advertises anyway.
    rig.tick().unwrap();
    assert_eq!(rig.radio.starts(), vec![AdvKind::Slow]);
}

#[test]
fn purge_completion_releases_held_advertising() {
    let mut rig = Rig::new();
    rig.event(Event::Connected { handle: H1 }).unwrap();
    rig.event(Event::SecurityResult {
        handle: H1,
        outcome: SecurityOutcome::Failed,
    })
    .unwrap();
    rig.clear();

    rig.event(Event::BondsDeleted).unwrap();
    assert_eq!(rig.radio.starts(), vec![AdvKind::Slow]);

    rig.radio.clear();
    rig.tick().unwrap(); // tick #0, even: nothing pending
    assert!(rig.radio.starts().is_empty());
    rig.tick().unwrap(); // tick #1, odd: regular Slow refresh
    assert_eq!(rig.radio.starts(), vec![AdvKind::Slow]);
}

#[test]
fn late_disconnect_cancels_local_fast_window() {
    let mut rig = Rig::new();
    rig.event(Event::Connected { handle: H1 }).unwrap();
    rig.event(Event::SecurityResult {
        handle: H1,
        outcome: SecurityOutcome::Failed,
    })
    .unwrap();
    rig.event(Event::BondsDeleted).unwrap();

    // Long press while the link is already torn down locally.
    rig.event(Event::FastModeTrigger).unwrap();
    rig.tick().unwrap();
    assert_eq!(rig.app.adv_mode(), AdvMode::Fast { remaining_ticks: 11 });
    rig.clear();

    // The stack's disconnect for the failed link arrives afterwards.
    rig.event(Event::Disconnected {
        handle: H1,
        reason: 0x05,
    })
    .unwrap();
    assert_eq!(rig.app.adv_mode(), AdvMode::Slow, "countdown is reset");
    assert_eq!(rig.board.calls, vec![BoardCall::Schedule(1000)]);
    assert!(rig.radio.starts().is_empty());

    rig.tick().unwrap();
    assert_eq!(rig.radio.starts(), vec![AdvKind::Slow]);
}

#[test]
fn explicit_repair_policy_keeps_bonds() {
    let config = SystemConfig {
        repair_policy: RepairPolicy::RequireExplicitRepair,
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(config);
    rig.event(Event::Connected { handle: H1 }).unwrap();

    rig.event(Event::SecurityResult {
        handle: H1,
        outcome: SecurityOutcome::Failed,
    })
    .unwrap();

    assert_eq!(rig.radio.count(&RadioCall::DeleteBonds), 0);
    assert!(rig.sink.contains(&AppEvent::SecurityFailed {
        peer: H1,
        purged: false
    }));
}

#[test]
fn rejected_security_request_counts_as_failure() {
    let mut rig = Rig::new();
    rig.radio.security_error = Some(LinkError::NotConnected);

    rig.event(Event::Connected { handle: H1 }).unwrap();

    assert_eq!(rig.app.link_state(), LinkState::Disconnected);
    assert_eq!(rig.radio.count(&RadioCall::Disconnect(H1)), 1);
}

#[test]
fn failed_bond_purge_is_fatal() {
    let mut rig = Rig::new();
    rig.radio.delete_bonds_error = Some(BondError::Stack(-1));
    rig.event(Event::Connected { handle: H1 }).unwrap();

    let result = rig.event(Event::SecurityResult {
        handle: H1,
        outcome: SecurityOutcome::Failed,
    });

    assert_eq!(
        result,
        Err(Error::Fatal(FatalCause::BondDeletion(BondError::Stack(-1))))
    );
}

#[test]
fn security_result_for_stale_peer_is_ignored() {
    let mut rig = Rig::new();
    rig.event(Event::Connected { handle: H2 }).unwrap();

    rig.event(Event::SecurityResult {
        handle: H1,
        outcome: SecurityOutcome::Failed,
    })
    .unwrap();

    assert_eq!(rig.app.link_state(), LinkState::Securing { handle: H2 });
}

#[test]
fn bond_storage_full_collects_garbage_with_one_retry() {
    let mut rig = Rig::new();
    rig.radio.gc_results.push_back(Err(BondError::Stack(3)));
    rig.clear();

    rig.event(Event::BondStorageFull).unwrap();
    assert_eq!(rig.radio.count(&RadioCall::CollectGarbage), 2);

    rig.radio.gc_results.push_back(Err(BondError::Stack(3)));
    rig.radio.gc_results.push_back(Err(BondError::NoSpace));
    assert_eq!(
        rig.event(Event::BondStorageFull),
        Err(Error::Fatal(FatalCause::BondStorage(BondError::NoSpace)))
    );
}

#[test]
fn stack_error_is_fatal() {
    let mut rig = Rig::new();
    let err = rig.event(Event::StackError(-42)).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err, Error::Fatal(FatalCause::StackFault(-42)));
}

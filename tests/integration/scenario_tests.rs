//! Tick-driven scenarios: sampling, advertising modes, peer commands.

use sensorbeacon::app::events::AppEvent;
use sensorbeacon::app::ports::{AdvKind, CharacteristicId, ConnHandle, Flash, Indication};
use sensorbeacon::config::SystemConfig;
use sensorbeacon::error::{AdvError, Error, FatalCause, NotifyError, SensorError};
use sensorbeacon::events::Event;
use sensorbeacon::fsm::advertising::AdvMode;
use sensorbeacon::sensors::{AnalogChannel, SensorReading};

use crate::mock_hw::{BoardCall, RadioCall, Rig};

const H1: ConnHandle = ConnHandle(1);

// ── Sampling ──────────────────────────────────────────────────

#[test]
fn tick_brackets_conversion_with_feeds_then_rearms() {
    let mut rig = Rig::new();
    rig.clear();

    rig.tick().unwrap();

    assert_eq!(
        rig.board.calls,
        vec![
            BoardCall::Feed,
            BoardCall::Sample(AnalogChannel::Battery),
            BoardCall::Feed,
            BoardCall::Schedule(5000),
        ]
    );
    assert_eq!(rig.app.tick_count(), 1);
}

#[test]
fn channels_alternate_battery_first() {
    let mut rig = Rig::new();
    for _ in 0..4 {
        rig.tick().unwrap();
    }
    use AnalogChannel::*;
    assert_eq!(
        rig.board.samples(),
        vec![Battery, Temperature, Battery, Temperature]
    );
    assert_eq!(rig.app.metrics().battery_samples, 2);
    assert_eq!(rig.app.metrics().temperature_samples, 2);
}

#[test]
fn battery_sample_updates_readback_characteristic() {
    let mut rig = Rig::new();
    rig.tick().unwrap();

    assert_eq!(rig.app.reading().battery_mv, 3600);
    assert_eq!(
        rig.radio.count(&RadioCall::SetValue {
            characteristic: CharacteristicId::Battery,
            data: vec![0x10, 0x0E],
        }),
        1
    );
    assert!(rig.sink.contains(&AppEvent::Sampled(SensorReading {
        battery_mv: 3600,
        temperature_centi: 0,
    })));
}

#[test]
fn failed_conversion_keeps_last_value_and_still_feeds() {
    let mut rig = Rig::new();
    rig.tick().unwrap();
    rig.board.battery_raw = Err(SensorError::AdcReadFailed);
    rig.tick().unwrap();
    rig.clear();

    rig.tick().unwrap();

    assert_eq!(rig.board.feeds(), 2);
    assert_eq!(rig.app.reading().battery_mv, 3600);
    assert_eq!(rig.app.metrics().sample_failures, 1);
}

#[test]
fn sampling_disabled_still_feeds_twice() {
    let config = SystemConfig {
        sampling_enabled: false,
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(config);
    rig.clear();

    rig.tick().unwrap();

    assert!(rig.board.samples().is_empty());
    assert_eq!(rig.board.feeds(), 2);
}

// ── Advertising modes ─────────────────────────────────────────

#[test]
fn fast_lasts_twelve_ticks_then_slow_refreshes_on_odd_ticks() {
    let mut rig = Rig::new();

    for _ in 0..11 {
        rig.tick().unwrap();
    }
    assert_eq!(rig.app.adv_mode(), AdvMode::Fast { remaining_ticks: 1 });
    assert_eq!(rig.radio.starts(), vec![AdvKind::Fast]);

    rig.tick().unwrap();
    assert_eq!(rig.app.adv_mode(), AdvMode::Slow);
    assert_eq!(rig.radio.starts(), vec![AdvKind::Fast, AdvKind::Slow]);

    rig.radio.clear();
    rig.tick().unwrap(); // tick #12, even
    assert!(rig.radio.starts().is_empty());
    rig.tick().unwrap(); // tick #13, odd
    assert_eq!(rig.radio.starts(), vec![AdvKind::Slow]);
}

#[test]
fn slow_refresh_carries_latest_reading() {
    let mut rig = Rig::new();
    for _ in 0..14 {
        rig.tick().unwrap();
    }
    let payload = rig.radio.last_payload().unwrap();
    // Manufacturer data: ... batt(2) temp(2) fast
    let n = payload.len();
    assert_eq!(&payload[n - 5..n - 3], &3600i16.to_le_bytes());
    assert_eq!(payload[n - 1], 0);
}

#[test]
fn failed_start_is_retried_next_tick() {
    let mut rig = Rig::unstarted(SystemConfig::default());
    rig.radio.start_results.push_back(Err(AdvError::Busy));
    rig.app
        .start(&mut rig.radio, &mut rig.board, &mut rig.sink)
        .unwrap();
    assert_eq!(rig.app.metrics().adv_start_failures, 1);

    rig.tick().unwrap();

    assert_eq!(rig.radio.starts(), vec![AdvKind::Fast, AdvKind::Fast]);
    assert_eq!(rig.app.metrics().adv_starts, 1);
}

#[test]
fn advertising_that_never_starts_is_fatal() {
    let mut rig = Rig::unstarted(SystemConfig::default());
    rig.radio.fail_all_starts = true;
    rig.app
        .start(&mut rig.radio, &mut rig.board, &mut rig.sink)
        .unwrap();

    assert_eq!(
        rig.tick(),
        Err(Error::Fatal(FatalCause::AdvertisingUnavailable(AdvError::Busy)))
    );
}

#[test]
fn advertising_idle_degrades_to_slow() {
    let mut rig = Rig::new();
    rig.clear();

    rig.event(Event::AdvertisingIdle).unwrap();

    assert_eq!(rig.app.adv_mode(), AdvMode::Slow);
    assert_eq!(rig.radio.starts(), vec![AdvKind::Slow]);
}

#[test]
fn advertising_idle_while_connected_is_ignored() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.clear();

    rig.event(Event::AdvertisingIdle).unwrap();

    assert!(rig.radio.starts().is_empty());
    assert_eq!(rig.app.adv_mode(), AdvMode::Idle);
}

#[test]
fn long_press_enters_fast_immediately_when_disconnected() {
    let mut rig = Rig::new();
    rig.event(Event::AdvertisingIdle).unwrap();
    rig.clear();

    rig.event(Event::FastModeTrigger).unwrap();

    assert_eq!(rig.radio.starts(), vec![AdvKind::Fast]);
    assert_eq!(rig.app.adv_mode(), AdvMode::Fast { remaining_ticks: 12 });
}

#[test]
fn long_press_while_connected_is_deferred_to_disconnect() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.clear();

    rig.event(Event::FastModeTrigger).unwrap();
    assert!(rig.radio.starts().is_empty());
    assert!(rig.app.fast_requested());

    rig.event(Event::Disconnected { handle: H1, reason: 0 }).unwrap();
    rig.tick().unwrap();

    assert_eq!(rig.radio.starts(), vec![AdvKind::Fast]);
    assert!(!rig.app.fast_requested());
}

#[test]
fn short_press_only_flashes_the_led() {
    let mut rig = Rig::new();
    rig.clear();
    rig.event(Event::ButtonPress).unwrap();
    assert!(rig.radio.calls.is_empty());
    assert!(rig.board.calls.is_empty());
    assert_eq!(rig.board.flashes, vec![Flash::Press]);
    assert!(rig.board.indications.is_empty());
}

// ── User indication ───────────────────────────────────────────

#[test]
fn led_tracks_advertising_and_connection() {
    let mut rig = Rig::new();
    assert_eq!(rig.board.indications, vec![Indication::Advertising]);

    rig.event(Event::Connected { handle: H1 }).unwrap();
    rig.tick().unwrap();
    rig.event(Event::Disconnected { handle: H1, reason: 0 }).unwrap();

    assert_eq!(
        rig.board.indications,
        vec![
            Indication::Advertising,
            Indication::Connected,
            Indication::Advertising
        ],
        "only changes reach the board"
    );
}

#[test]
fn long_press_is_confirmed_even_when_deferred() {
    let mut rig = Rig::new();
    rig.event(Event::FastModeTrigger).unwrap();
    rig.connect_secured(1);
    rig.event(Event::FastModeTrigger).unwrap();

    assert_eq!(rig.board.flashes, vec![Flash::FastConfirm, Flash::FastConfirm]);
}

// ── Peer commands and notifications ───────────────────────────

#[test]
fn subscribed_peer_gets_keepalive_every_tick() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.write(1, CharacteristicId::Command, &[0x03]).unwrap();
    assert!(rig.sink.contains(&AppEvent::Subscribed(H1)));

    rig.tick().unwrap();
    rig.tick().unwrap();

    assert_eq!(
        rig.radio.notifications(),
        vec![(H1, vec![0x03, 0, 0]), (H1, vec![0x03, 0, 0])]
    );
    assert_eq!(rig.app.metrics().notifications_pushed, 2);
    assert_eq!(rig.radio.starts(), vec![AdvKind::Fast], "no advertising while connected");
}

#[test]
fn unsubscribed_peer_gets_no_keepalive() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.tick().unwrap();
    assert!(rig.radio.notifications().is_empty());
}

#[test]
fn battery_query_answers_once_with_latest_value() {
    let mut rig = Rig::new();
    rig.tick().unwrap();
    rig.connect_secured(1);

    rig.write(1, CharacteristicId::Command, &[0x01]).unwrap();

    assert_eq!(rig.radio.notifications(), vec![(H1, vec![0x01, 0x10, 0x0E])]);
    assert_eq!(rig.app.subscriber(), None, "a query does not subscribe");
}

#[test]
fn temperature_query_uses_opcode_two() {
    let mut rig = Rig::new();
    rig.connect_secured(1);

    rig.write(1, CharacteristicId::Command, &[0x02]).unwrap();

    let sent = rig.radio.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1[0], 0x02);
}

#[test]
fn malformed_and_misdirected_writes_are_ignored() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.clear();

    rig.write(1, CharacteristicId::Command, &[0x09]).unwrap();
    rig.write(1, CharacteristicId::Command, &[0x01, 0x01]).unwrap();
    rig.write(1, CharacteristicId::Command, &[]).unwrap();
    rig.write(1, CharacteristicId::Data, &[0x01]).unwrap();

    assert!(rig.radio.calls.is_empty());
    assert!(rig.sink.events.is_empty());
}

#[test]
fn write_from_stale_peer_is_a_no_op() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.clear();

    rig.write(7, CharacteristicId::Command, &[0x03]).unwrap();
    rig.write(7, CharacteristicId::Command, &[0x01]).unwrap();

    assert_eq!(rig.app.subscriber(), None);
    assert!(rig.radio.notifications().is_empty());
}

#[test]
fn refused_notification_is_counted_and_not_fatal() {
    let mut rig = Rig::new();
    rig.connect_secured(1);
    rig.write(1, CharacteristicId::Command, &[0x03]).unwrap();
    rig.radio.notify_error = Some(NotifyError::Stack(7));

    rig.tick().unwrap();

    assert_eq!(rig.app.metrics().notifications_dropped, 1);
    assert_eq!(rig.app.metrics().notifications_pushed, 0);
}

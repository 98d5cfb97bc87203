//! Property tests for the tick-driven core.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;

use sensorbeacon::app::events::AppEvent;
use sensorbeacon::app::ports::{
    AdvKind, AdvertisingPort, AnalogPort, CharacteristicId, ConnHandle, EventSink, Flash,
    GattPort, Indication, IndicatorPort, LinkPort, TimerPort, WatchdogPort,
};
use sensorbeacon::app::service::AppService;
use sensorbeacon::config::{AdvParams, SystemConfig};
use sensorbeacon::error::{AdvError, BondError, LinkError, NotifyError, SensorError, SetValueError};
use sensorbeacon::events::{Event, SecurityOutcome, WritePayload};
use sensorbeacon::fsm::LinkState;
use sensorbeacon::fsm::advertising::AdvMode;
use sensorbeacon::sensors::AnalogChannel;

/// Accepts everything and keeps only what the properties look at.
#[derive(Default)]
struct Bench {
    feeds: u32,
    schedules: u32,
    samples: Vec<AnalogChannel>,
    starts: Vec<AdvKind>,
    notified: Vec<ConnHandle>,
    shown: Option<Indication>,
}

impl AdvertisingPort for Bench {
    fn configure(&mut self, _: &[u8], _: &AdvParams) -> Result<(), AdvError> {
        Ok(())
    }
    fn start(&mut self, kind: AdvKind) -> Result<(), AdvError> {
        self.starts.push(kind);
        Ok(())
    }
    fn stop(&mut self) -> Result<(), AdvError> {
        Ok(())
    }
}

impl GattPort for Bench {
    fn notify(&mut self, peer: ConnHandle, _: CharacteristicId, _: &[u8]) -> Result<(), NotifyError> {
        self.notified.push(peer);
        Ok(())
    }
    fn set_value(&mut self, _: CharacteristicId, _: &[u8]) -> Result<(), SetValueError> {
        Ok(())
    }
}

impl LinkPort for Bench {
    fn request_security(&mut self, _: ConnHandle) -> Result<(), LinkError> {
        Ok(())
    }
    fn disconnect(&mut self, _: ConnHandle) -> Result<(), LinkError> {
        Ok(())
    }
    fn delete_bonds(&mut self) -> Result<(), BondError> {
        Ok(())
    }
    fn collect_garbage(&mut self) -> Result<(), BondError> {
        Ok(())
    }
}

impl AnalogPort for Bench {
    fn sample_blocking(&mut self, channel: AnalogChannel) -> Result<u16, SensorError> {
        self.samples.push(channel);
        Ok(match channel {
            AnalogChannel::Battery => 512,
            AnalogChannel::Temperature => 100,
        })
    }
}

impl WatchdogPort for Bench {
    fn feed(&mut self) {
        self.feeds += 1;
    }
}

impl TimerPort for Bench {
    fn schedule_once(&mut self, _: u32) {
        self.schedules += 1;
    }
}

impl IndicatorPort for Bench {
    fn indicate(&mut self, indication: Indication) {
        self.shown = Some(indication);
    }
    fn flash(&mut self, _: Flash) {}
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _: &AppEvent) {}
}

fn started(config: SystemConfig) -> (AppService, Bench, Bench) {
    let mut app = AppService::new(config).unwrap();
    let (mut radio, mut board) = (Bench::default(), Bench::default());
    app.start(&mut radio, &mut board, &mut NullSink).unwrap();
    (app, radio, board)
}

fn arb_handle() -> impl Strategy<Value = ConnHandle> {
    (1u16..4).prop_map(ConnHandle)
}

fn arb_characteristic() -> impl Strategy<Value = CharacteristicId> {
    prop::sample::select(CharacteristicId::ALL.to_vec())
}

/// Every non-fatal event the stack, timer or button can produce.
fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        4 => Just(Event::Tick),
        2 => arb_handle().prop_map(|handle| Event::Connected { handle }),
        2 => (arb_handle(), any::<u8>())
            .prop_map(|(handle, reason)| Event::Disconnected { handle, reason }),
        2 => (arb_handle(), any::<bool>()).prop_map(|(handle, ok)| Event::SecurityResult {
            handle,
            outcome: if ok { SecurityOutcome::Success } else { SecurityOutcome::Failed },
        }),
        2 => (arb_handle(), arb_characteristic(), prop::collection::vec(0u8..5, 0..4)).prop_map(
            |(handle, characteristic, bytes)| Event::CharacteristicWrite {
                handle,
                characteristic,
                data: WritePayload::from_slice(&bytes).unwrap(),
            }
        ),
        1 => Just(Event::AdvertisingIdle),
        1 => Just(Event::BondsDeleted),
        1 => Just(Event::BondStorageFull),
        1 => Just(Event::FastModeTrigger),
        1 => Just(Event::ButtonPress),
    ]
}

proptest! {
    /// Fast advertising lasts exactly the configured number of ticks.
    #[test]
    fn fast_window_is_bounded_in_ticks(secs in 1u32..=30, interval_s in 1u32..=5) {
        prop_assume!(secs >= interval_s);
        let config = SystemConfig {
            fast_mode_duration_secs: secs,
            tick_interval_ms: interval_s * 1000,
            reconnect_tick_delay_ms: 1000,
            ..SystemConfig::default()
        };
        let n = config.fast_mode_ticks();
        let (mut app, mut radio, mut board) = started(config);

        for _ in 1..n {
            app.tick(&mut radio, &mut board, &mut NullSink).unwrap();
            prop_assert!(app.adv_mode().is_fast());
        }
        app.tick(&mut radio, &mut board, &mut NullSink).unwrap();
        prop_assert_eq!(app.adv_mode(), AdvMode::Slow);
        prop_assert_eq!(radio.starts.first(), Some(&AdvKind::Fast));
        prop_assert_eq!(radio.starts.get(1), Some(&AdvKind::Slow));
    }

    /// Each tick feeds twice, re-arms once and samples by tick parity.
    #[test]
    fn ticks_feed_rearm_and_alternate(ticks in 1usize..64) {
        let (mut app, mut radio, mut board) = started(SystemConfig::default());
        board.schedules = 0;

        for _ in 0..ticks {
            app.tick(&mut radio, &mut board, &mut NullSink).unwrap();
        }

        prop_assert_eq!(board.feeds as usize, 2 * ticks);
        prop_assert_eq!(board.schedules as usize, ticks);
        for (i, ch) in board.samples.iter().enumerate() {
            prop_assert_eq!(*ch, AnalogChannel::for_tick(i as u32));
        }
    }

    /// No interleaving of non-fatal events errors out or breaks the
    /// link, advertising, subscription or indicator invariants.
    #[test]
    fn arbitrary_events_keep_invariants(events in prop::collection::vec(arb_event(), 1..200)) {
        let (mut app, mut radio, mut board) = started(SystemConfig::default());

        for event in events {
            let before = radio.notified.len();
            app.handle_event(event, &mut radio, &mut board, &mut NullSink).unwrap();
            let link = app.link_state();

            match link {
                LinkState::Disconnected => {
                    prop_assert_ne!(app.adv_mode(), AdvMode::Idle);
                    prop_assert_eq!(app.subscriber(), None);
                }
                LinkState::Securing { .. } | LinkState::Connected { .. } => {
                    prop_assert_eq!(app.adv_mode(), AdvMode::Idle);
                }
            }
            if let Some(peer) = app.subscriber() {
                prop_assert!(link.is_live(peer));
            }
            let expected = match link {
                LinkState::Disconnected => Indication::Advertising,
                LinkState::Securing { .. } | LinkState::Connected { .. } => Indication::Connected,
            };
            prop_assert_eq!(board.shown, Some(expected));
            for peer in &radio.notified[before..] {
                prop_assert!(link.is_live(*peer), "push to {} while link is {:?}", peer, link);
            }
        }
    }
}

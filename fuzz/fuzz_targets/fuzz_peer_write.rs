//! Fuzz target: peer writes and link churn against `AppService`
//!
//! Each input byte pair is decoded into a stack event (connect,
//! disconnect, pairing result, tick, or a characteristic write whose
//! body is the rest of the input; writes too long for a characteristic
//! are dropped the way the stack adapter drops them).  The service must never panic, never
//! return an error for these events, and never notify a peer that is not
//! the live link.
//!
//! cargo fuzz run fuzz_peer_write

#![no_main]

use critical_section as _;
use libfuzzer_sys::fuzz_target;
use sensorbeacon::adapters::ble::write_event;
use sensorbeacon::app::events::AppEvent;
use sensorbeacon::app::ports::{
    AdvKind, AdvertisingPort, AnalogPort, CharacteristicId, ConnHandle, EventSink, Flash,
    GattPort, Indication, IndicatorPort, LinkPort, TimerPort, WatchdogPort,
};
use sensorbeacon::app::service::AppService;
use sensorbeacon::config::{AdvParams, SystemConfig};
use sensorbeacon::error::{AdvError, BondError, LinkError, NotifyError, SensorError, SetValueError};
use sensorbeacon::events::{Event, SecurityOutcome};
use sensorbeacon::sensors::AnalogChannel;

#[derive(Default)]
struct Radio {
    notified: Vec<ConnHandle>,
}

impl AdvertisingPort for Radio {
    fn configure(&mut self, payload: &[u8], _: &AdvParams) -> Result<(), AdvError> {
        assert!(payload.len() <= 31);
        Ok(())
    }
    fn start(&mut self, _: AdvKind) -> Result<(), AdvError> {
        Ok(())
    }
    fn stop(&mut self) -> Result<(), AdvError> {
        Ok(())
    }
}

impl GattPort for Radio {
    fn notify(&mut self, peer: ConnHandle, _: CharacteristicId, data: &[u8]) -> Result<(), NotifyError> {
        assert!(data.len() <= CharacteristicId::MAX_LEN);
        self.notified.push(peer);
        Ok(())
    }
    fn set_value(&mut self, _: CharacteristicId, _: &[u8]) -> Result<(), SetValueError> {
        Ok(())
    }
}

impl LinkPort for Radio {
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

struct Board(u16);

impl AnalogPort for Board {
    fn sample_blocking(&mut self, _: AnalogChannel) -> Result<u16, SensorError> {
        // Any raw value the 10-bit ADC could produce.
        Ok(self.0 & 0x3FF)
    }
}

impl WatchdogPort for Board {
    fn feed(&mut self) {}
}

impl TimerPort for Board {
    fn schedule_once(&mut self, _: u32) {}
}

impl IndicatorPort for Board {
    fn indicate(&mut self, _: Indication) {}
    fn flash(&mut self, _: Flash) {}
}

struct Sink;

impl EventSink for Sink {
    fn emit(&mut self, _: &AppEvent) {}
}

fn decode(op: u8, arg: u8, rest: &[u8]) -> Option<Event> {
    let handle = ConnHandle(u16::from(arg & 0x03));
    let event = match op % 6 {
        0 => Event::Tick,
        1 => Event::Connected { handle },
        2 => Event::Disconnected { handle, reason: arg },
        3 => Event::SecurityResult {
            handle,
            outcome: if arg & 0x80 == 0 {
                SecurityOutcome::Success
            } else {
                SecurityOutcome::Failed
            },
        },
        4 => {
            let characteristic = CharacteristicId::ALL[usize::from(arg >> 6)];
            return write_event(handle, characteristic, rest);
        }
        _ => Event::FastModeTrigger,
    };
    Some(event)
}

fuzz_target!(|data: &[u8]| {
    let Ok(mut app) = AppService::new(SystemConfig::default()) else {
        return;
    };
    let mut radio = Radio::default();
    let mut board = Board(data.first().copied().map_or(512, u16::from) << 2);
    if app.start(&mut radio, &mut board, &mut Sink).is_err() {
        return;
    }

    let mut i = 0;
    while i + 1 < data.len() {
        let (op, arg) = (data[i], data[i + 1]);
        let rest = &data[i + 2..data.len().min(i + 2 + usize::from(arg & 0x1F))];
        i += 2 + if op % 6 == 4 { rest.len() } else { 0 };
        let Some(event) = decode(op, arg, rest) else {
            continue;
        };

        let before = radio.notified.len();
        assert!(app.handle_event(event, &mut radio, &mut board, &mut Sink).is_ok());

        let link = app.link_state();
        for peer in &radio.notified[before..] {
            assert!(link.is_live(*peer), "notified {peer} while link is {link:?}");
        }
    }
});

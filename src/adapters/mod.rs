//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements       | Connects to                    |
//! |------------|------------------|--------------------------------|
//! | `ble`      | AdvertisingPort  | Bluedroid GAP                  |
//! |            | GattPort         | Bluedroid GATT server          |
//! |            | LinkPort         | Bluedroid SMP / bond storage   |
//! | `hardware` | AnalogPort       | ESP32 ADC1 oneshot, NTC GPIO   |
//! |            | WatchdogPort     | Task watchdog                  |
//! |            | TimerPort        | esp_timer single-shot          |
//! |            | IndicatorPort    | Status LED GPIO                |
//! | `log_sink` | EventSink        | Serial log output              |

pub mod ble;
pub mod hardware;
pub mod log_sink;

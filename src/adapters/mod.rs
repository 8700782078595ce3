//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements        | Connects to              |
//! |-------------|-------------------|--------------------------|
//! | `hardware`  | SensorPort        | ESP32 GPIO               |
//! |             | ActuatorPort      | ESP32 LEDC servo         |
//! | `log_sink`  | EventSink         | Serial log output        |
//! | `presenter` | StatusPresenter   | Console status lines     |
//! | `time`      | ClockPort         | ESP32 system timer       |
//! |             | DelayNs           | FreeRTOS delay           |
//! | `wifi`      | ConnectivityPort  | ESP-IDF WiFi STA         |

pub mod hardware;
pub mod log_sink;
pub mod presenter;
pub mod time;
pub mod wifi;

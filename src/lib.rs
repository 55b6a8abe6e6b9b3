#![cfg_attr(not(test), no_std)]

//! LoRaWAN (ABP) power switch end-device.
//!
//! The library holds the hardware agnostic core: payload codec, downlink
//! dispatcher, actuator, debounced input and the session driver that ties them
//! to a LoRaWAN session provider. The RP2040 firmware in `main.rs` wires it to
//! real peripherals.

#[macro_use]
mod log;

pub mod actuator;
pub mod codec;
pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod input;
pub mod sensor;
pub mod session;

pub use actuator::{Actuator, ActuatorState};
pub use codec::{LppEncoder, TelemetryFrame};
pub use command::{dispatch, Command, Transition};
pub use config::Config;
pub use driver::{Phase, SessionDriver};
pub use error::Error;
pub use input::{Debouncer, EdgeEvent};
pub use sensor::{MockPowerSensor, PowerReading, PowerSensor};
pub use session::{AbpCredentials, Downlink, LifecycleEvent, SessionEvent, SessionProvider};

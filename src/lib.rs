//! FSR-to-keyboard engine.
//!
//! Converts analog readings from an array of force-sensitive resistors into
//! debounced press/release key events and exposes a line-oriented serial
//! protocol for tuning per-sensor sensitivity and debounce timing at runtime.
//!
//! The crate is `no_std`; all hardware access (ADC, keyboard HID, serial
//! link) stays behind the [`ports`] traits so the same engine runs under
//! firmware, host tests and the replay tool unchanged.

#![cfg_attr(not(test), no_std)]

pub mod channel;
pub mod config;
pub mod diag;
pub mod pad;
pub mod policy;
pub mod ports;
pub mod serial;
pub mod smoothing;

pub use channel::{ChannelEngine, ChannelReport, KeyAction, SampleTick, StateDump};
pub use diag::DebugGate;
pub use pad::{ChannelConfig, ConfigError, Pad, PadConfig};
pub use policy::{Classification, ThresholdPolicy};
pub use ports::{CommunicationPort, KeyPort, SensorPort};
pub use serial::{parse_command, Command, LineAssembler};
pub use smoothing::ExponentialFilter;

//! Tick orchestrator: one cooperative polling loop driving the command
//! decoder, every sensor channel and the optional key-state refresh.
//!
//! Within a tick, command processing always completes before sensor polling,
//! so a configuration change takes effect no later than the very next sample
//! read.

use log::debug;
use thiserror::Error;

use crate::{
    channel::{ChannelEngine, SampleTick},
    config::{
        COMMAND_POLL_INTERVAL_TICKS, DEFAULT_DEBOUNCE_US, DEFAULT_SENSITIVITY, MIN_SENSITIVITY,
        SMOOTHING_WINDOW,
    },
    diag::{
        debounce_time_line, sensor_sensitivity_line, sensor_state_line,
        unrecognized_command_line, DebugGate,
    },
    policy::ThresholdPolicy,
    ports::{CommunicationPort, KeyPort, SensorPort},
    serial::{parse_command, Command, LineAssembler},
};

/// Static per-channel wiring.
#[derive(Clone, Copy, Debug)]
pub struct ChannelConfig {
    pub pin: u8,
    pub sensitivity: i32,
    pub key: u8,
}

/// Construction-time settings. The serial protocol mutates sensitivity and
/// debounce afterwards; everything else is fixed for the process lifetime.
#[derive(Clone, Debug)]
pub struct PadConfig<const N: usize> {
    pub channels: [ChannelConfig; N],
    pub debounce_us: u32,
    pub smoothing_window: i32,
    /// Threshold strategy shared by all channels, chosen at configuration
    /// time.
    pub policy: ThresholdPolicy,
    /// Master switch for `sensor_state` diagnostics.
    pub debug: bool,
    /// Time-sliced key refresh: when set, every channel's key state is
    /// re-asserted to the key port at most once per this many microseconds.
    pub key_refresh_us: Option<u32>,
}

impl<const N: usize> Default for PadConfig<N> {
    fn default() -> Self {
        Self {
            channels: core::array::from_fn(|i| ChannelConfig {
                pin: i as u8,
                sensitivity: DEFAULT_SENSITIVITY,
                key: b'a' + (i % 26) as u8,
            }),
            debounce_us: DEFAULT_DEBOUNCE_US,
            smoothing_window: SMOOTHING_WINDOW,
            policy: ThresholdPolicy::fixed(),
            debug: true,
            key_refresh_us: None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("smoothing window must be positive, got {0}")]
    SmoothingWindow(i32),
    #[error("at least one sensor channel is required")]
    NoChannels,
}

struct KeyRefresh {
    interval_us: u32,
    last_us: u32,
}

/// One record per sensor: the protocol-mutable configuration next to the
/// runtime state machine, so the two can never drift apart.
struct Channel {
    config: ChannelConfig,
    engine: ChannelEngine,
}

pub struct Pad<const N: usize> {
    channels: [Channel; N],
    assembler: LineAssembler,
    debounce_us: u32,
    debug: bool,
    debug_gate: DebugGate,
    poll_counter: u32,
    key_refresh: Option<KeyRefresh>,
}

impl<const N: usize> Pad<N> {
    pub fn new(config: PadConfig<N>) -> Result<Self, ConfigError> {
        if N == 0 {
            return Err(ConfigError::NoChannels);
        }
        if config.smoothing_window <= 0 {
            return Err(ConfigError::SmoothingWindow(config.smoothing_window));
        }
        let channels = core::array::from_fn(|i| Channel {
            config: config.channels[i],
            engine: ChannelEngine::new(
                i as u8,
                config.channels[i].key,
                config.smoothing_window,
                config.policy.clone(),
            ),
        });
        Ok(Self {
            channels,
            assembler: LineAssembler::new(),
            debounce_us: config.debounce_us,
            debug: config.debug,
            debug_gate: DebugGate::new(),
            poll_counter: 0,
            key_refresh: config.key_refresh_us.map(|interval_us| KeyRefresh {
                interval_us,
                last_us: 0,
            }),
        })
    }

    /// Advance the pad by one step against a wrapping microsecond clock.
    pub fn tick<S, K, C>(&mut self, now_us: u32, sensors: &mut S, keys: &mut K, comm: &mut C)
    where
        S: SensorPort,
        K: KeyPort,
        C: CommunicationPort,
    {
        let debug_tick = self.debug_gate.observe(now_us) && self.debug;
        self.poll_command(comm);
        self.poll_sensors(now_us, debug_tick, sensors, keys, comm);
        self.refresh_keys(now_us, keys);
    }

    /// Read at most one pending byte every Kth tick, and handle at most one
    /// completed command per invocation.
    fn poll_command<C: CommunicationPort>(&mut self, comm: &mut C) {
        self.poll_counter += 1;
        if self.poll_counter < COMMAND_POLL_INTERVAL_TICKS {
            return;
        }
        self.poll_counter = 0;
        let Some(byte) = comm.read_byte() else {
            return;
        };
        let Some(line) = self.assembler.feed(byte) else {
            return;
        };
        self.apply_command(parse_command(&line, N), comm);
    }

    fn apply_command<C: CommunicationPort>(&mut self, command: Command, comm: &mut C) {
        match command {
            Command::SetSensitivity { channel, value } => {
                let clamped = value.max(MIN_SENSITIVITY);
                self.channels[channel].config.sensitivity = clamped;
                self.channels[channel].engine.reset_reference();
                debug!("sensor {channel}: sensitivity set to {clamped}");
                comm.write_line(&sensor_sensitivity_line(channel, clamped));
            }
            Command::ReportSensitivities => {
                for (index, channel) in self.channels.iter().enumerate() {
                    comm.write_line(&sensor_sensitivity_line(index, channel.config.sensitivity));
                }
            }
            Command::SetDebounce { micros } => {
                self.debounce_us = if micros < 0 {
                    DEFAULT_DEBOUNCE_US
                } else {
                    micros as u32
                };
                debug!("debounce set to {}us", self.debounce_us);
                comm.write_line(&debounce_time_line(self.debounce_us));
            }
            Command::Unrecognized { code } => {
                comm.write_line(&unrecognized_command_line(code));
            }
        }
    }

    fn poll_sensors<S, K, C>(
        &mut self,
        now_us: u32,
        debug_tick: bool,
        sensors: &mut S,
        keys: &mut K,
        comm: &mut C,
    ) where
        S: SensorPort,
        K: KeyPort,
        C: CommunicationPort,
    {
        for channel in self.channels.iter_mut() {
            let raw = sensors.read(channel.config.pin);
            let report = channel.engine.tick(SampleTick {
                now_us,
                raw,
                sensitivity: channel.config.sensitivity,
                debounce_us: self.debounce_us,
                debug_enabled: self.debug,
                debug_tick,
            });
            if let Some(action) = report.key {
                if action.pressed {
                    keys.press(action.key);
                } else {
                    keys.release(action.key);
                }
            }
            if let Some(dump) = report.dump {
                comm.write_line(&sensor_state_line(&dump));
            }
        }
    }

    /// Re-assert every channel's key state at a bounded rate so the
    /// transport is not saturated with redundant repetitions.
    fn refresh_keys<K: KeyPort>(&mut self, now_us: u32, keys: &mut K) {
        let Some(refresh) = &mut self.key_refresh else {
            return;
        };
        if now_us.wrapping_sub(refresh.last_us) < refresh.interval_us {
            return;
        }
        refresh.last_us = now_us;
        for channel in &self.channels {
            if channel.engine.is_pressed() {
                keys.press(channel.engine.key());
            } else {
                keys.release(channel.engine.key());
            }
        }
    }

    pub fn debounce_us(&self) -> u32 {
        self.debounce_us
    }

    pub fn sensitivity(&self, channel: usize) -> Option<i32> {
        self.channels
            .get(channel)
            .map(|slot| slot.config.sensitivity)
    }

    pub fn is_pressed(&self, channel: usize) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|slot| slot.engine.is_pressed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FlatSensors {
        value: i32,
    }

    impl SensorPort for FlatSensors {
        fn read(&mut self, _pin: u8) -> i32 {
            self.value
        }
    }

    #[derive(Default)]
    struct CountingKeys {
        calls: usize,
    }

    impl KeyPort for CountingKeys {
        fn press(&mut self, _key: u8) {
            self.calls += 1;
        }

        fn release(&mut self, _key: u8) {
            self.calls += 1;
        }
    }

    #[derive(Default)]
    struct CountingComm {
        reads: usize,
    }

    impl CommunicationPort for CountingComm {
        fn read_byte(&mut self) -> Option<u8> {
            self.reads += 1;
            None
        }

        fn write_line(&mut self, _line: &str) {}
    }

    #[test]
    fn rejects_degenerate_smoothing_window() {
        let config = PadConfig::<4> {
            smoothing_window: 0,
            ..PadConfig::default()
        };
        assert!(matches!(
            Pad::new(config),
            Err(ConfigError::SmoothingWindow(0))
        ));

        let config = PadConfig::<4> {
            smoothing_window: -3,
            ..PadConfig::default()
        };
        assert!(matches!(
            Pad::new(config),
            Err(ConfigError::SmoothingWindow(-3))
        ));
    }

    #[test]
    fn serial_is_polled_every_tenth_tick() {
        let mut pad = Pad::new(PadConfig::<4>::default()).expect("pad");
        let mut sensors = FlatSensors::default();
        let mut keys = CountingKeys::default();
        let mut comm = CountingComm::default();
        for step in 0..40u32 {
            pad.tick(step * 1_000, &mut sensors, &mut keys, &mut comm);
        }
        assert_eq!(comm.reads, 4);
    }

    #[test]
    fn key_refresh_reasserts_at_bounded_rate() {
        let config = PadConfig::<4> {
            key_refresh_us: Some(crate::config::KEY_REFRESH_INTERVAL_US),
            ..PadConfig::default()
        };
        let mut pad = Pad::new(config).expect("pad");
        let mut sensors = FlatSensors::default();
        let mut keys = CountingKeys::default();
        let mut comm = CountingComm::default();
        // 20 ticks spaced 500us apart span 9500us: flushes land at 2500,
        // 5000 and 7500us, four key re-assertions each.
        for step in 0..20u32 {
            pad.tick(step * 500, &mut sensors, &mut keys, &mut comm);
        }
        assert_eq!(keys.calls, 3 * 4);
    }

    #[test]
    fn refresh_disabled_by_default() {
        let mut pad = Pad::new(PadConfig::<4>::default()).expect("pad");
        let mut sensors = FlatSensors::default();
        let mut keys = CountingKeys::default();
        let mut comm = CountingComm::default();
        for step in 0..20u32 {
            pad.tick(step * 500, &mut sensors, &mut keys, &mut comm);
        }
        assert_eq!(keys.calls, 0);
    }
}

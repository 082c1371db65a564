//! Debug gating and the fixed-width diagnostic line formats.
//!
//! Lines are semicolon-delimited `key:value` ASCII with space-padded numeric
//! fields so downstream tooling can parse them by column. Confirmation lines
//! (`sensor_sensitivity`, `debounce_time`, `unrecognized_command`) are
//! always emitted; `sensor_state` lines pass through the per-tick visibility
//! rules of the channel engine.

use core::fmt::Write;

use crate::channel::StateDump;
use crate::config::DEBUG_INTERVAL_US;

/// Rate limiter for verbose per-tick diagnostics, independent of debounce.
#[derive(Debug, Default)]
pub struct DebugGate {
    last_us: u32,
}

impl DebugGate {
    pub fn new() -> Self {
        Self { last_us: 0 }
    }

    /// True when the verbose window opens this tick; opening advances the
    /// gate. Wrapping arithmetic keeps the gate sane across clock wrap.
    pub fn observe(&mut self, now_us: u32) -> bool {
        if now_us.wrapping_sub(self.last_us) > DEBUG_INTERVAL_US {
            self.last_us = now_us;
            true
        } else {
            false
        }
    }
}

pub(crate) type DiagLine = heapless::String<160>;

pub(crate) fn sensor_state_line(dump: &StateDump) -> DiagLine {
    let mut line = DiagLine::new();
    let _ = write!(
        &mut line,
        "sensor_state|sensor:{};sensitivity:{:4};raw_value:{:4};smoothed_value:{:4};previous_state:{};new_state:{};state_change_time_diff:{}",
        dump.channel,
        dump.sensitivity,
        dump.raw,
        dump.smoothed,
        dump.was_pressed as u8,
        dump.pressed as u8,
        dump.since_transition_us,
    );
    line
}

pub(crate) fn sensor_sensitivity_line(channel: usize, sensitivity: i32) -> DiagLine {
    let mut line = DiagLine::new();
    let _ = write!(
        &mut line,
        "sensor_sensitivity|sensor:{channel};sensitivity:{sensitivity:4};"
    );
    line
}

pub(crate) fn debounce_time_line(debounce_us: u32) -> DiagLine {
    let mut line = DiagLine::new();
    let _ = write!(&mut line, "debounce_time|debounce:{debounce_us:5};");
    line
}

pub(crate) fn unrecognized_command_line(code: i32) -> DiagLine {
    let mut line = DiagLine::new();
    let _ = write!(&mut line, "unrecognized_command|code:{code};");
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_opens_once_per_interval() {
        let mut gate = DebugGate::new();
        assert!(!gate.observe(0));
        assert!(!gate.observe(1_000_000));
        assert!(gate.observe(1_000_001));
        assert!(!gate.observe(1_500_000));
        assert!(gate.observe(2_000_002));
    }

    #[test]
    fn gate_survives_clock_wrap() {
        let mut gate = DebugGate::new();
        assert!(gate.observe(u32::MAX - 10));
        assert!(!gate.observe(u32::MAX));
        // Wrapped timestamp, just past the interval since the last opening.
        assert!(gate.observe(1_000_000u32.wrapping_add(u32::MAX - 10).wrapping_add(1)));
    }

    #[test]
    fn sensor_state_line_matches_wire_format() {
        let dump = StateDump {
            channel: 0,
            sensitivity: 500,
            raw: 612,
            smoothed: 598,
            was_pressed: false,
            pressed: true,
            since_transition_us: 123_456,
        };
        assert_eq!(
            sensor_state_line(&dump).as_str(),
            "sensor_state|sensor:0;sensitivity: 500;raw_value: 612;smoothed_value: 598;previous_state:0;new_state:1;state_change_time_diff:123456"
        );
    }

    #[test]
    fn confirmation_lines_pad_numeric_fields() {
        assert_eq!(
            sensor_sensitivity_line(2, 875).as_str(),
            "sensor_sensitivity|sensor:2;sensitivity: 875;"
        );
        assert_eq!(
            debounce_time_line(2_500).as_str(),
            "debounce_time|debounce: 2500;"
        );
        assert_eq!(
            unrecognized_command_line(34).as_str(),
            "unrecognized_command|code:34;"
        );
    }
}

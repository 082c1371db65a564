//! Per-sensor press/release engine.
//!
//! One [`ChannelEngine`] wraps a two-state machine fed with timestamped
//! samples. Each tick it records the sample, asks the threshold policy for a
//! verdict, applies the debounce gate and emits at most one key action and
//! one diagnostic record through the dispatch context. All elapsed-time math
//! is `wrapping_sub` so a wrapped microsecond clock never produces spurious
//! intervals.

use log::trace;
use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use crate::{
    config::NEAR_MISS_BAND,
    policy::{Classification, ThresholdPolicy},
    smoothing::ExponentialFilter,
};

/// One timestamped sample plus the orchestrator-owned settings that apply to
/// this tick.
#[derive(Clone, Copy, Debug)]
pub struct SampleTick {
    pub now_us: u32,
    pub raw: i32,
    pub sensitivity: i32,
    pub debounce_us: u32,
    /// Master diagnostics switch.
    pub debug_enabled: bool,
    /// True when the debug gate opened this tick for verbose output.
    pub debug_tick: bool,
}

/// Press/release request for the key port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyAction {
    pub key: u8,
    pub pressed: bool,
}

/// Snapshot behind one `sensor_state` diagnostic line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateDump {
    pub channel: u8,
    pub sensitivity: i32,
    pub raw: i32,
    pub smoothed: i32,
    pub was_pressed: bool,
    pub pressed: bool,
    pub since_transition_us: u32,
}

/// Per-tick output of one channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChannelReport {
    pub key: Option<KeyAction>,
    pub dump: Option<StateDump>,
}

#[derive(Clone, Copy, Debug)]
enum ChannelHsmEvent {
    Sample(SampleTick),
    ResetReference,
}

#[derive(Default)]
struct DispatchContext {
    key: Option<KeyAction>,
    dump: Option<StateDump>,
}

pub struct ChannelEngine {
    machine: statig::blocking::StateMachine<ChannelHsm>,
    pressed: bool,
    key: u8,
}

impl ChannelEngine {
    pub fn new(index: u8, key: u8, window: i32, policy: ThresholdPolicy) -> Self {
        Self {
            machine: ChannelHsm {
                index,
                key,
                filter: ExponentialFilter::new(window),
                policy,
                last_transition_us: 0,
            }
            .state_machine(),
            pressed: false,
            key,
        }
    }

    /// Feed one sample; returns the key action and diagnostic to forward.
    pub fn tick(&mut self, tick: SampleTick) -> ChannelReport {
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&ChannelHsmEvent::Sample(tick), &mut context);
        if let Some(action) = context.key {
            self.pressed = action.pressed;
        }
        ChannelReport {
            key: context.key,
            dump: context.dump,
        }
    }

    /// Drop the adaptive reference so it re-seeds on the next sample.
    /// A no-op for fixed thresholds.
    pub fn reset_reference(&mut self) {
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&ChannelHsmEvent::ResetReference, &mut context);
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn key(&self) -> u8 {
        self.key
    }
}

struct ChannelHsm {
    index: u8,
    key: u8,
    filter: ExponentialFilter,
    policy: ThresholdPolicy,
    last_transition_us: u32,
}

impl ChannelHsm {
    fn state_dump(
        &self,
        tick: &SampleTick,
        was_pressed: bool,
        pressed: bool,
        elapsed_us: u32,
    ) -> StateDump {
        StateDump {
            channel: self.index,
            sensitivity: tick.sensitivity,
            raw: self.filter.last(),
            smoothed: self.filter.value(),
            was_pressed,
            pressed,
            since_transition_us: elapsed_us,
        }
    }
}

#[state_machine(initial = "State::released()")]
impl ChannelHsm {
    #[state]
    fn released(
        &mut self,
        context: &mut DispatchContext,
        event: &ChannelHsmEvent,
    ) -> Outcome<State> {
        match event {
            ChannelHsmEvent::Sample(tick) => {
                self.filter.add(tick.raw);
                let value = self.filter.value();
                let elapsed = tick.now_us.wrapping_sub(self.last_transition_us);
                match self.policy.classify(value, tick.sensitivity, false) {
                    Classification::Pressing if elapsed >= tick.debounce_us => {
                        self.last_transition_us = tick.now_us;
                        self.policy.note_transition(value);
                        context.key = Some(KeyAction {
                            key: self.key,
                            pressed: true,
                        });
                        if tick.debug_enabled {
                            context.dump = Some(self.state_dump(tick, false, true, elapsed));
                        }
                        Transition(State::pressed())
                    }
                    Classification::Pressing => {
                        trace!(
                            "sensor {}: press suppressed, {}us since last transition",
                            self.index,
                            elapsed
                        );
                        if tick.debug_tick {
                            context.dump = Some(self.state_dump(tick, false, false, elapsed));
                        }
                        Handled
                    }
                    _ => {
                        // Force output for readings just below the threshold
                        // so near-misses stay visible between debug windows.
                        let near_miss = self
                            .policy
                            .press_threshold(tick.sensitivity)
                            .is_some_and(|threshold| {
                                self.filter.last() > threshold - NEAR_MISS_BAND
                            });
                        if tick.debug_enabled && near_miss {
                            context.dump = Some(self.state_dump(tick, false, false, elapsed));
                        }
                        Handled
                    }
                }
            }
            ChannelHsmEvent::ResetReference => {
                self.policy.reset();
                Handled
            }
        }
    }

    #[state]
    fn pressed(
        &mut self,
        context: &mut DispatchContext,
        event: &ChannelHsmEvent,
    ) -> Outcome<State> {
        match event {
            ChannelHsmEvent::Sample(tick) => {
                self.filter.add(tick.raw);
                let value = self.filter.value();
                let elapsed = tick.now_us.wrapping_sub(self.last_transition_us);
                match self.policy.classify(value, tick.sensitivity, true) {
                    Classification::Releasing if elapsed >= tick.debounce_us => {
                        self.last_transition_us = tick.now_us;
                        self.policy.note_transition(value);
                        context.key = Some(KeyAction {
                            key: self.key,
                            pressed: false,
                        });
                        if tick.debug_enabled {
                            context.dump = Some(self.state_dump(tick, true, false, elapsed));
                        }
                        Transition(State::released())
                    }
                    Classification::Releasing => {
                        trace!(
                            "sensor {}: release suppressed, {}us since last transition",
                            self.index,
                            elapsed
                        );
                        if tick.debug_tick {
                            context.dump = Some(self.state_dump(tick, true, true, elapsed));
                        }
                        Handled
                    }
                    _ => {
                        if tick.debug_tick {
                            context.dump = Some(self.state_dump(tick, true, true, elapsed));
                        }
                        Handled
                    }
                }
            }
            ChannelHsmEvent::ResetReference => {
                self.policy.reset();
                Handled
            }
        }
    }
}

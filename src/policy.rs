//! Threshold strategies deciding when a channel presses or releases.
//!
//! Both strategies implement one classify contract so each can be tested in
//! isolation and swapped at configuration time without touching the channel
//! state machine.

use crate::config::BASELINE_SEED_OFFSET;

/// Verdict for one sample against the active threshold strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Pressing,
    Releasing,
    Steady,
}

#[derive(Clone, Debug)]
pub enum ThresholdPolicy {
    /// Press when the value exceeds the channel sensitivity; release when it
    /// falls to the release bound or below.
    Fixed {
        /// Distinct release bound for hysteresis. `None` releases at the
        /// press threshold itself.
        release_limit: Option<i32>,
    },
    /// Drift-compensating reference. While released the reference ratchets
    /// down to the lowest value seen, while pressed it ratchets up to the
    /// highest; an excursion of at least the channel sensitivity away from
    /// the reference flips the state. Accepted transitions re-anchor the
    /// reference at the current value.
    Adaptive { reference: Option<i32> },
}

impl ThresholdPolicy {
    pub fn fixed() -> Self {
        Self::Fixed {
            release_limit: None,
        }
    }

    pub fn fixed_with_release_limit(limit: i32) -> Self {
        Self::Fixed {
            release_limit: Some(limit),
        }
    }

    pub fn adaptive() -> Self {
        Self::Adaptive { reference: None }
    }

    /// Classify one smoothed value. `pressed` is the channel's current
    /// state; the adaptive variant updates its internal reference as a side
    /// effect.
    pub fn classify(&mut self, value: i32, sensitivity: i32, pressed: bool) -> Classification {
        match self {
            Self::Fixed { release_limit } => {
                if pressed {
                    if value <= release_limit.unwrap_or(sensitivity) {
                        Classification::Releasing
                    } else {
                        Classification::Steady
                    }
                } else if value > sensitivity {
                    Classification::Pressing
                } else {
                    Classification::Steady
                }
            }
            Self::Adaptive { reference } => match reference {
                None => {
                    // First observation seeds the reference slightly below
                    // the current value. Seeding is per channel and never
                    // affects the processing of sibling channels.
                    *reference = Some(value - BASELINE_SEED_OFFSET);
                    Classification::Steady
                }
                Some(anchor) => {
                    if pressed {
                        if value <= *anchor - sensitivity {
                            Classification::Releasing
                        } else {
                            if value > *anchor {
                                *anchor = value;
                            }
                            Classification::Steady
                        }
                    } else if value >= *anchor + sensitivity {
                        Classification::Pressing
                    } else {
                        if value < *anchor {
                            *anchor = value;
                        }
                        Classification::Steady
                    }
                }
            },
        }
    }

    /// Re-anchor after an accepted transition.
    pub fn note_transition(&mut self, value: i32) {
        if let Self::Adaptive { reference } = self {
            *reference = Some(value);
        }
    }

    /// Forget the adaptive reference; it re-seeds on the next sample.
    /// A no-op for fixed thresholds.
    pub fn reset(&mut self) {
        if let Self::Adaptive { reference } = self {
            *reference = None;
        }
    }

    /// Effective press threshold, when one is currently defined.
    pub fn press_threshold(&self, sensitivity: i32) -> Option<i32> {
        match self {
            Self::Fixed { .. } => Some(sensitivity),
            Self::Adaptive { reference } => reference.map(|anchor| anchor + sensitivity),
        }
    }
}

//! Compiled-in defaults. Nothing here persists: the serial protocol mutates
//! sensitivity and debounce in memory only, and every restart returns to
//! these values.

/// Number of sensor channels in the reference pad build.
pub const SENSOR_COUNT: usize = 4;

/// Floor for per-channel sensitivity; requested values below it clamp here.
pub const MIN_SENSITIVITY: i32 = 100;

/// Sensitivity each channel starts with.
pub const DEFAULT_SENSITIVITY: i32 = 500;

/// Minimum elapsed microseconds between accepted state transitions of one
/// channel. Also the value a negative `D` command resets to.
pub const DEFAULT_DEBOUNCE_US: u32 = 10_000;

/// Verbose per-tick diagnostics open at most once per this interval.
pub const DEBUG_INTERVAL_US: u32 = 1_000_000;

/// The serial link is polled for one byte every this many ticks.
pub const COMMAND_POLL_INTERVAL_TICKS: u32 = 10;

/// Payload bytes retained per command line (10 bytes on the wire including
/// the `\n` terminator). Input past this is dropped, not an error.
pub const COMMAND_LINE_MAX: usize = 9;

/// Decimal field width of a sensitivity argument.
pub const SENSITIVITY_FIELD_WIDTH: usize = 4;

/// Decimal field width of a debounce argument.
pub const DEBOUNCE_FIELD_WIDTH: usize = 5;

/// Window of the exponential smoothing filter.
pub const SMOOTHING_WINDOW: i32 = 17;

/// Released-state raw readings this close below the press threshold force a
/// diagnostic every tick so near-misses stay visible.
pub const NEAR_MISS_BAND: i32 = 50;

/// Offset subtracted from the first observed value when the adaptive
/// reference seeds, so a pad already under load at boot can still press.
pub const BASELINE_SEED_OFFSET: i32 = 20;

/// Inter-flush interval of the optional time-sliced key-state refresh.
pub const KEY_REFRESH_INTERVAL_US: u32 = 2_500;

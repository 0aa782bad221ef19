//! Centralized geometry and tuning constants for the drill engine.
//!
//! These values define the deterministic math for scenario generation and
//! scoring. Keeping them together ensures that exercise difficulty can only
//! be adjusted via code changes reviewed in version control.

// Play area ----------------------------------------------------------------
pub(crate) const TOP_BUFFER_PX: f64 = 160.0;
pub(crate) const BOTTOM_BUFFER_PX: f64 = 160.0;
pub(crate) const SIDE_EDGE_MARGIN_PX: f64 = 60.0;
pub(crate) const HORIZONTAL_EDGE_INSET_PX: f64 = 50.0;
pub(crate) const AIM_JITTER_FRACTION: f64 = 0.3;

// Speeds -------------------------------------------------------------------
pub const BASE_SPEED_BAND_KT: (u32, u32) = (380, 480);
pub const HIGH_DIFF_SPEED_BAND_KT: (u32, u32) = (360, 500);
pub(crate) const HIGH_DIFF_PRESET_MIN_KT: u32 = 60;
pub(crate) const SECONDS_PER_HOUR: f64 = 3_600.0;
pub(crate) const SECONDS_PER_MINUTE: f64 = 60.0;

// Scenario acceptance ------------------------------------------------------
pub const MAX_SAMPLING_ATTEMPTS: u32 = 1_000;
pub const CONFLICT_THRESHOLD_NM: f64 = 5.0;
pub const MIN_INITIAL_DISTANCE_NM: f64 = 20.0;
pub(crate) const PARALLEL_TRACK_EPSILON: f64 = 0.001;

// Track history ------------------------------------------------------------
pub const HISTORY_POINTS: usize = 5;
pub(crate) const HISTORY_INTERVAL_SECS: f64 = 4.0;

// Verdict thresholds -------------------------------------------------------
pub const LOSS_OF_SEPARATION_NM: f64 = 5.0;
pub const WASTE_THRESHOLD_NM: f64 = 10.9;

// Settings bounds ----------------------------------------------------------
pub const SPEED_DIFF_BOUNDS_KT: (u32, u32) = (0, 150);
pub const ANGLE_BOUNDS_DEG: (f64, f64) = (20.0, 180.0);
pub const CROSSING_TIME_BOUNDS_MIN: (f64, f64) = (3.0, 10.0);

// Turn commands ------------------------------------------------------------
pub const MAX_TURN_DEGREES: i32 = 30;
pub const TURN_STEP_DEGREES: i32 = 5;

// Identity -----------------------------------------------------------------
pub(crate) const CALLSIGN_PREFIXES: [&str; 10] = [
    "CTN", "RYR", "DLH", "THY", "AFR", "BAW", "KLM", "SAS", "AUA", "SWR",
];
pub(crate) const CALLSIGN_NUMBER_MAX: u32 = 999;
pub(crate) const CALLSIGN_SUFFIX_CHANCE: f64 = 0.3;
pub(crate) const FLIGHT_LEVEL_BAND: (u32, u32) = (320, 400);
pub(crate) const FLIGHT_LEVEL_STEP: u32 = 10;

// Display scale ------------------------------------------------------------
pub(crate) const SCALE_REFERENCE_SPEED_KT: f64 = 420.0;
pub(crate) const SCALE_WINDOW_MINUTES: (f64, f64) = (4.0, 9.0);
pub const DEFAULT_PIXELS_PER_NM: f64 = 7.0;
pub(crate) const READOUT_WHOLE_NM_FROM: f64 = 11.0;

#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;

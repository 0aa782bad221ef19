//! Scenario constraint ranges chosen by the trainee or course manager.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    ANGLE_BOUNDS_DEG, CROSSING_TIME_BOUNDS_MIN, HIGH_DIFF_PRESET_MIN_KT, SPEED_DIFF_BOUNDS_KT,
};

/// Requested difficulty ranges for a generated conflict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Knots.
    #[serde(default = "Settings::default_speed_diff_min")]
    pub speed_diff_min: u32,
    #[serde(default = "Settings::default_speed_diff_max")]
    pub speed_diff_max: u32,
    /// Degrees.
    #[serde(default = "Settings::default_angle_min")]
    pub angle_min: f64,
    #[serde(default = "Settings::default_angle_max")]
    pub angle_max: f64,
    /// Minutes.
    #[serde(default = "Settings::default_time_min")]
    pub time_to_crossing_min: f64,
    #[serde(default = "Settings::default_time_max")]
    pub time_to_crossing_max: f64,
}

impl Settings {
    const fn default_speed_diff_min() -> u32 {
        SPEED_DIFF_BOUNDS_KT.0
    }

    const fn default_speed_diff_max() -> u32 {
        SPEED_DIFF_BOUNDS_KT.1
    }

    const fn default_angle_min() -> f64 {
        ANGLE_BOUNDS_DEG.0
    }

    const fn default_angle_max() -> f64 {
        ANGLE_BOUNDS_DEG.1
    }

    const fn default_time_min() -> f64 {
        CROSSING_TIME_BOUNDS_MIN.0
    }

    const fn default_time_max() -> f64 {
        CROSSING_TIME_BOUNDS_MIN.1
    }

    /// Settings assembled from the three preset pickers.
    #[must_use]
    pub const fn from_presets(
        speed: SpeedDiffPreset,
        angle: AnglePreset,
        time: CrossingTimePreset,
    ) -> Self {
        let (speed_diff_min, speed_diff_max) = speed.range();
        let (angle_min, angle_max) = angle.range();
        let (time_to_crossing_min, time_to_crossing_max) = time.range();
        Self {
            speed_diff_min,
            speed_diff_max,
            angle_min,
            angle_max,
            time_to_crossing_min,
            time_to_crossing_max,
        }
    }

    #[must_use]
    pub const fn with_speed_diff(mut self, min: u32, max: u32) -> Self {
        self.speed_diff_min = min;
        self.speed_diff_max = max;
        self
    }

    #[must_use]
    pub const fn with_angle(mut self, min: f64, max: f64) -> Self {
        self.angle_min = min;
        self.angle_max = max;
        self
    }

    #[must_use]
    pub const fn with_time_to_crossing(mut self, min: f64, max: f64) -> Self {
        self.time_to_crossing_min = min;
        self.time_to_crossing_max = max;
        self
    }

    /// Copy with every reversed range swapped into `min <= max` order.
    #[must_use]
    pub fn normalized(self) -> Self {
        let (speed_diff_min, speed_diff_max) = ordered(self.speed_diff_min, self.speed_diff_max);
        let (angle_min, angle_max) = ordered_f64(self.angle_min, self.angle_max);
        let (time_to_crossing_min, time_to_crossing_max) =
            ordered_f64(self.time_to_crossing_min, self.time_to_crossing_max);
        Self {
            speed_diff_min,
            speed_diff_max,
            angle_min,
            angle_max,
            time_to_crossing_min,
            time_to_crossing_max,
        }
    }

    /// Whether the speed-differential range is the "high" preset or harder,
    /// which widens the baseline speed band.
    #[must_use]
    pub const fn is_high_speed_diff(&self) -> bool {
        self.speed_diff_min >= HIGH_DIFF_PRESET_MIN_KT
    }

    /// Parse settings from JSON; absent fields take the full default range.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Parse` for malformed JSON and any violation
    /// reported by [`Settings::validate`].
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self =
            serde_json::from_str(json).map_err(|err| SettingsError::Parse(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every value against its slider bounds.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` naming the first field outside its bounds.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let (speed_low, speed_high) = SPEED_DIFF_BOUNDS_KT;
        for (field, value) in [
            ("speedDiffMin", self.speed_diff_min),
            ("speedDiffMax", self.speed_diff_max),
        ] {
            if !(speed_low..=speed_high).contains(&value) {
                return Err(SettingsError::RangeViolation {
                    field,
                    min: f64::from(speed_low),
                    max: f64::from(speed_high),
                    value: f64::from(value),
                });
            }
        }

        let checks = [
            ("angleMin", self.angle_min, ANGLE_BOUNDS_DEG),
            ("angleMax", self.angle_max, ANGLE_BOUNDS_DEG),
            ("timeToCrossingMin", self.time_to_crossing_min, CROSSING_TIME_BOUNDS_MIN),
            ("timeToCrossingMax", self.time_to_crossing_max, CROSSING_TIME_BOUNDS_MIN),
        ];
        for (field, value, (min, max)) in checks {
            if !value.is_finite() {
                return Err(SettingsError::NotFinite { field });
            }
            if !(min..=max).contains(&value) {
                return Err(SettingsError::RangeViolation {
                    field,
                    min,
                    max,
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_presets(
            SpeedDiffPreset::Random,
            AnglePreset::Random,
            CrossingTimePreset::Random,
        )
    }
}

fn ordered(a: u32, b: u32) -> (u32, u32) {
    (a.min(b), a.max(b))
}

fn ordered_f64(a: f64, b: f64) -> (f64, f64) {
    if a > b { (b, a) } else { (a, b) }
}

/// Errors raised when settings fall outside the slider bounds.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("{field} must be between {min:.0} and {max:.0} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("settings JSON is malformed: {0}")]
    Parse(String),
}

/// Speed differential presets, knots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedDiffPreset {
    Random,
    Low,
    Medium,
    High,
}

impl SpeedDiffPreset {
    #[must_use]
    pub const fn range(self) -> (u32, u32) {
        match self {
            Self::Random => SPEED_DIFF_BOUNDS_KT,
            Self::Low => (0, 30),
            Self::Medium => (20, 70),
            Self::High => (HIGH_DIFF_PRESET_MIN_KT, 150),
        }
    }
}

/// Crossing angle presets, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnglePreset {
    Random,
    Sharp,
    Crossing,
    Opposite,
}

impl AnglePreset {
    #[must_use]
    pub const fn range(self) -> (f64, f64) {
        match self {
            Self::Random => ANGLE_BOUNDS_DEG,
            Self::Sharp => (20.0, 55.0),
            Self::Crossing => (55.0, 140.0),
            Self::Opposite => (140.0, 180.0),
        }
    }
}

/// Time-to-crossing presets, minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingTimePreset {
    Random,
    Under5,
    From5To8,
    Over8,
}

impl CrossingTimePreset {
    #[must_use]
    pub const fn range(self) -> (f64, f64) {
        match self {
            Self::Random => CROSSING_TIME_BOUNDS_MIN,
            Self::Under5 => (3.0, 5.0),
            Self::From5To8 => (5.0, 8.0),
            Self::Over8 => (8.0, 10.0),
        }
    }
}

//! Per-trainee verdict tallies over stored score records.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{ANGLE_BOUNDS_DEG, CROSSING_TIME_BOUNDS_MIN, SPEED_DIFF_BOUNDS_KT};
use crate::exercise::{ExerciseMode, ScoreRecord};
use crate::numbers::percent;
use crate::outcome::Verdict;

/// Records without a user name are grouped under this label.
pub const UNKNOWN_USER: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerdictTally {
    pub submitted: usize,
    pub success: usize,
    pub fail: usize,
    pub waste: usize,
}

impl VerdictTally {
    pub fn record(&mut self, verdict: Verdict) {
        self.submitted += 1;
        match verdict {
            Verdict::Success => self.success += 1,
            Verdict::Fail => self.fail += 1,
            Verdict::Waste => self.waste += 1,
        }
    }

    #[must_use]
    pub const fn count(&self, verdict: Verdict) -> usize {
        match verdict {
            Verdict::Success => self.success,
            Verdict::Fail => self.fail,
            Verdict::Waste => self.waste,
        }
    }

    #[must_use]
    pub fn success_percent(&self) -> f64 {
        percent(self.success, self.submitted)
    }

    #[must_use]
    pub fn fail_percent(&self) -> f64 {
        percent(self.fail, self.submitted)
    }

    #[must_use]
    pub fn waste_percent(&self) -> f64 {
        percent(self.waste, self.submitted)
    }

    pub fn merge(&mut self, other: &Self) {
        self.submitted += other.submitted;
        self.success += other.success;
        self.fail += other.fail;
        self.waste += other.waste;
    }
}

/// Inclusive ranges over scenario metadata plus optional mode and time window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreFilter {
    pub speed_difference: (f64, f64),
    pub angle: (f64, f64),
    pub time_to_crossing: (f64, f64),
    #[serde(default)]
    pub mode: Option<ExerciseMode>,
    /// Unix seconds, inclusive. Records without a timestamp never match a bound.
    #[serde(default)]
    pub recorded_from: Option<i64>,
    #[serde(default)]
    pub recorded_until: Option<i64>,
}

impl Default for ScoreFilter {
    fn default() -> Self {
        Self {
            speed_difference: (
                f64::from(SPEED_DIFF_BOUNDS_KT.0),
                f64::from(SPEED_DIFF_BOUNDS_KT.1),
            ),
            angle: ANGLE_BOUNDS_DEG,
            time_to_crossing: CROSSING_TIME_BOUNDS_MIN,
            mode: None,
            recorded_from: None,
            recorded_until: None,
        }
    }
}

impl ScoreFilter {
    /// Filter accepting every record, including best-effort scenarios whose
    /// metadata lies outside the slider bounds.
    #[must_use]
    pub const fn all() -> Self {
        let open = (f64::NEG_INFINITY, f64::INFINITY);
        Self {
            speed_difference: open,
            angle: open,
            time_to_crossing: open,
            mode: None,
            recorded_from: None,
            recorded_until: None,
        }
    }

    /// Whether every range is at its full bounds and nothing else is set.
    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        *self == Self::default()
    }

    /// A range left at (or beyond) its slider bounds places no constraint,
    /// so records whose metadata drifts past a bound still count.
    #[must_use]
    pub fn matches(&self, record: &ScoreRecord) -> bool {
        let meta = &record.metadata;
        let speed_bounds = (
            f64::from(SPEED_DIFF_BOUNDS_KT.0),
            f64::from(SPEED_DIFF_BOUNDS_KT.1),
        );
        if !range_admits(self.speed_difference, speed_bounds, meta.speed_difference)
            || !range_admits(self.angle, ANGLE_BOUNDS_DEG, meta.angle)
            || !range_admits(
                self.time_to_crossing,
                CROSSING_TIME_BOUNDS_MIN,
                meta.time_to_crossing,
            )
        {
            return false;
        }
        if self.mode.is_some_and(|mode| mode != record.mode) {
            return false;
        }
        match (self.recorded_from, self.recorded_until, record.recorded_at) {
            (None, None, _) => true,
            (_, _, None) => false,
            (from, until, Some(at)) => {
                from.is_none_or(|from| at >= from) && until.is_none_or(|until| at <= until)
            }
        }
    }
}

/// Only a range narrowed inside `bounds` is applied.
fn range_admits((min, max): (f64, f64), (low, high): (f64, f64), value: f64) -> bool {
    let narrowed = min > low || max < high;
    !narrowed || (value >= min && value <= max)
}

/// Tally records matching `filter`, keyed by user name.
#[must_use]
pub fn tally_by_user<'a, I>(records: I, filter: &ScoreFilter) -> BTreeMap<String, VerdictTally>
where
    I: IntoIterator<Item = &'a ScoreRecord>,
{
    let mut tallies: BTreeMap<String, VerdictTally> = BTreeMap::new();
    for record in records.into_iter().filter(|record| filter.matches(record)) {
        let user = if record.user.trim().is_empty() {
            UNKNOWN_USER
        } else {
            record.user.as_str()
        };
        tallies.entry(user.to_string()).or_default().record(record.verdict);
    }
    tallies
}

/// Sum of every per-user tally.
#[must_use]
pub fn total(tallies: &BTreeMap<String, VerdictTally>) -> VerdictTally {
    tallies.values().fold(VerdictTally::default(), |mut sum, tally| {
        sum.merge(tally);
        sum
    })
}

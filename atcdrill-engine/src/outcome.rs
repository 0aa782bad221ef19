//! Separation verdicts
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{LOSS_OF_SEPARATION_NM, WASTE_THRESHOLD_NM};

/// Score of a submitted exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Loss of separation: below 5 NM at closest approach.
    Fail,
    /// Adequate separation without excessive deviation.
    Success,
    /// More separation than the conflict required.
    Waste,
}

impl Verdict {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Success => "success",
            Self::Waste => "waste",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a separation at closest approach, in nautical miles.
#[must_use]
pub fn classify(distance_nm: f64) -> Verdict {
    if distance_nm < LOSS_OF_SEPARATION_NM {
        Verdict::Fail
    } else if distance_nm <= WASTE_THRESHOLD_NM {
        Verdict::Success
    } else {
        Verdict::Waste
    }
}

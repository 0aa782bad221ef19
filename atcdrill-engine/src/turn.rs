//! Turn model: heading changes layered over the as-filed heading.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aircraft::Aircraft;
use crate::constants::{MAX_TURN_DEGREES, TURN_STEP_DEGREES};
use crate::numbers::round_f64_to_i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Direction of a signed turn; `None` for zero. Positive turns are
    /// clockwise on screen, i.e. to the right.
    #[must_use]
    pub const fn of(degrees: i32) -> Option<Self> {
        match degrees {
            0 => None,
            d if d > 0 => Some(Self::Right),
            _ => Some(Self::Left),
        }
    }
}

impl fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// A heading-control input as the trainee can issue it: within ±30°, in 5° steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnCommand(i32);

impl TurnCommand {
    /// Clamp a raw slider value to the allowed range and snap it to the step.
    #[must_use]
    pub fn from_slider(value: i32) -> Self {
        let clamped = value.clamp(-MAX_TURN_DEGREES, MAX_TURN_DEGREES);
        let steps = round_f64_to_i32(f64::from(clamped) / f64::from(TURN_STEP_DEGREES));
        Self(steps * TURN_STEP_DEGREES)
    }

    #[must_use]
    pub const fn degrees(self) -> i32 {
        self.0
    }

    /// Every command the slider can produce, from hard left to hard right.
    pub fn all() -> impl Iterator<Item = Self> {
        (-MAX_TURN_DEGREES..=MAX_TURN_DEGREES)
            .step_by(usize::try_from(TURN_STEP_DEGREES).unwrap_or(1))
            .map(Self)
    }
}

impl Aircraft {
    /// Set the pending turn and recompute the as-flown heading from the
    /// as-filed one. Any signed value is accepted.
    pub fn apply_turn(&mut self, turn_degrees: i32) {
        self.pending_turn_degrees = turn_degrees;
        self.heading = self.original_heading + f64::from(turn_degrees).to_radians();
    }
}

/// Copy of `aircraft` with `turn_degrees` applied.
#[must_use]
pub fn apply_turn(aircraft: &Aircraft, turn_degrees: i32) -> Aircraft {
    let mut turned = aircraft.clone();
    turned.apply_turn(turn_degrees);
    turned
}

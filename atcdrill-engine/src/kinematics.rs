//! Straight-line, constant-velocity kinematics and closest point of approach.
use serde::{Deserialize, Serialize};

use crate::aircraft::Aircraft;
use crate::constants::{PARALLEL_TRACK_EPSILON, READOUT_WHOLE_NM_FROM};
use crate::numbers::round_f64_to_i32;
use crate::viewport::PixelScale;

/// Planar pixel-space coordinate, origin at the top-left of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Move `distance` pixels along `heading` (radians, screen convention).
    #[must_use]
    pub fn advanced(self, heading: f64, distance: f64) -> Self {
        Self {
            x: self.x + distance * heading.cos(),
            y: self.y + distance * heading.sin(),
        }
    }

    /// Bearing from `self` towards `target` in radians.
    #[must_use]
    pub fn bearing_to(self, target: Self) -> f64 {
        (target.y - self.y).atan2(target.x - self.x)
    }

    /// Stretch the offset from `anchor` by `factor`.
    #[must_use]
    pub fn scaled_about(self, anchor: Self, factor: f64) -> Self {
        Self {
            x: (self.x - anchor.x).mul_add(factor, anchor.x),
            y: (self.y - anchor.y).mul_add(factor, anchor.y),
        }
    }

    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Euclidean distance between two points.
#[must_use]
pub fn distance(p1: Position, p2: Position) -> f64 {
    let dx = p1.x - p2.x;
    let dy = p1.y - p2.y;
    dx.hypot(dy)
}

/// Which heading a geometry query should extrapolate along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingSource {
    /// As-filed: the heading sampled at generation time.
    Filed,
    /// As-flown: the heading after any pending turn.
    Flown,
}

impl HeadingSource {
    #[must_use]
    pub const fn heading_of(self, aircraft: &Aircraft) -> f64 {
        match self {
            Self::Filed => aircraft.original_heading,
            Self::Flown => aircraft.heading,
        }
    }
}

/// Closest point of approach between two extrapolated tracks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestApproach {
    /// Seconds from the evaluation instant.
    pub time: f64,
    /// Separation at `time`, nautical miles.
    pub distance: f64,
    pub position1: Position,
    pub position2: Position,
}

/// Radar label for a predicted conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpaReadout {
    pub minutes_to_cpa: i32,
    pub separation_label: String,
}

impl ClosestApproach {
    /// Minutes until `aircraft` reaches its CPA position and the separation
    /// label shown beside the CPA marker.
    #[must_use]
    pub fn readout(&self, aircraft: &Aircraft, scale: PixelScale) -> CpaReadout {
        let to_cpa_nm = scale.px_to_nm(distance(aircraft.position, self.position1));
        let minutes = if aircraft.speed_knots > 0.0 {
            round_f64_to_i32(to_cpa_nm / aircraft.speed_knots * 60.0)
        } else {
            0
        };
        let separation_label = if self.distance >= READOUT_WHOLE_NM_FROM {
            format!("{}", round_f64_to_i32(self.distance))
        } else {
            format!("{:.1}", self.distance)
        };
        CpaReadout {
            minutes_to_cpa: minutes,
            separation_label,
        }
    }
}

/// Closest point of approach of `a1` flying `dir1` and `a2` flying `dir2`.
///
/// Returns `None` when the tracks are effectively parallel at equal speed, or
/// when the closest approach already lies in the past.
#[must_use]
pub fn closest_approach(
    a1: &Aircraft,
    a2: &Aircraft,
    dir1: f64,
    dir2: f64,
    scale: PixelScale,
) -> Option<ClosestApproach> {
    let (vx1, vy1) = (dir1.cos() * a1.speed_px_per_sec, dir1.sin() * a1.speed_px_per_sec);
    let (vx2, vy2) = (dir2.cos() * a2.speed_px_per_sec, dir2.sin() * a2.speed_px_per_sec);

    let dvx = vx1 - vx2;
    let dvy = vy1 - vy2;
    let dv2 = dvx * dvx + dvy * dvy;
    if dv2 < PARALLEL_TRACK_EPSILON {
        return None;
    }

    let dx = a1.position.x - a2.position.x;
    let dy = a1.position.y - a2.position.y;
    let time = -(dx * dvx + dy * dvy) / dv2;
    if time < 0.0 {
        return None;
    }

    let position1 = Position::new(a1.position.x + vx1 * time, a1.position.y + vy1 * time);
    let position2 = Position::new(a2.position.x + vx2 * time, a2.position.y + vy2 * time);
    Some(ClosestApproach {
        time,
        distance: scale.px_to_nm(distance(position1, position2)),
        position1,
        position2,
    })
}

/// Closest approach using the headings selected by `source`.
#[must_use]
pub fn approach_for(
    a1: &Aircraft,
    a2: &Aircraft,
    source: HeadingSource,
    scale: PixelScale,
) -> Option<ClosestApproach> {
    closest_approach(a1, a2, source.heading_of(a1), source.heading_of(a2), scale)
}

/// Minimum future separation in NM. Falls back to the current distance when
/// no future closest approach exists, since the tracks then never get closer.
#[must_use]
pub fn predicted_separation(
    a1: &Aircraft,
    a2: &Aircraft,
    source: HeadingSource,
    scale: PixelScale,
) -> f64 {
    approach_for(a1, a2, source, scale).map_or_else(
        || scale.px_to_nm(distance(a1.position, a2.position)),
        |cpa| cpa.distance,
    )
}

//! Rejection-sampling generator for two-aircraft conflicts.
//!
//! Each attempt spawns a fresh pair on the viewport edges, aims both at a
//! jittered point opposite their midpoint, and keeps the pair once the
//! as-filed tracks lose separation, start far enough apart, and cross at
//! an angle inside the requested range. The accepted pair is then slid
//! along its tracks so the closest approach happens at a requested time.
use log::{debug, warn};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::aircraft::{
    Aircraft, AircraftId, EdgeSpawn, SepColor, SpawnSource, create_aircraft_with,
};
use crate::constants::{
    AIM_JITTER_FRACTION, BASE_SPEED_BAND_KT, CONFLICT_THRESHOLD_NM, HIGH_DIFF_SPEED_BAND_KT,
    MAX_SAMPLING_ATTEMPTS, MIN_INITIAL_DISTANCE_NM, SECONDS_PER_MINUTE,
};
use crate::kinematics::{ClosestApproach, HeadingSource, Position, approach_for, distance};
use crate::settings::{Settings, SettingsError};
use crate::viewport::{PixelScale, Viewport};

/// Realized difficulty of a generated pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioMetadata {
    /// Absolute ground-speed difference, knots.
    pub speed_difference: f64,
    /// Crossing angle of the as-filed tracks, degrees in [0, 180].
    pub angle: f64,
    /// Minutes until the as-filed closest approach; 0 when the tracks never close.
    pub time_to_crossing: f64,
}

/// Whether the sampling loop found a pair meeting every constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Satisfied,
    /// The attempt budget ran out; the last sampled pair is returned as is.
    BestEffort,
}

/// A generated conflict pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub aircraft: [Aircraft; 2],
    pub metadata: ScenarioMetadata,
    pub status: GenerationStatus,
    pub attempts: u32,
}

impl Scenario {
    #[must_use]
    pub const fn first(&self) -> &Aircraft {
        &self.aircraft[0]
    }

    #[must_use]
    pub const fn second(&self) -> &Aircraft {
        &self.aircraft[1]
    }

    #[must_use]
    pub fn aircraft(&self, id: AircraftId) -> Option<&Aircraft> {
        self.aircraft.iter().find(|aircraft| aircraft.id == id)
    }

    pub fn aircraft_mut(&mut self, id: AircraftId) -> Option<&mut Aircraft> {
        self.aircraft.iter_mut().find(|aircraft| aircraft.id == id)
    }

    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.status == GenerationStatus::Satisfied
    }

    /// Closest approach of the pair along the chosen headings.
    #[must_use]
    pub fn approach(&self, source: HeadingSource, scale: PixelScale) -> Option<ClosestApproach> {
        let [first, second] = &self.aircraft;
        approach_for(first, second, source, scale)
    }

    /// Re-express the pair at a new zoom level around `anchor`.
    pub fn rescale(&mut self, from: PixelScale, to: PixelScale, anchor: Position) {
        for aircraft in &mut self.aircraft {
            aircraft.zoom(from, to, anchor);
        }
    }
}

/// Angle between two headings folded into [0, 180] degrees.
#[must_use]
pub fn crossing_angle_degrees(heading1: f64, heading2: f64) -> f64 {
    let diff = (heading1 - heading2).abs() % TAU;
    let folded = if diff > PI { TAU - diff } else { diff };
    folded.to_degrees()
}

/// Uniform draw in `[min, max)`, or `min` for an empty range.
fn sample_between<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if max <= min {
        min
    } else {
        min + rng.r#gen::<f64>() * (max - min)
    }
}

/// Scenario generator with a pluggable spawn policy.
#[derive(Debug, Clone, Default)]
pub struct ScenarioGenerator<S = EdgeSpawn> {
    spawn: S,
}

impl ScenarioGenerator<EdgeSpawn> {
    #[must_use]
    pub const fn new() -> Self {
        Self { spawn: EdgeSpawn }
    }
}

impl<S: SpawnSource> ScenarioGenerator<S> {
    #[must_use]
    pub const fn with_spawn(spawn: S) -> Self {
        Self { spawn }
    }

    /// Sample a conflict pair honouring `settings`. When the attempt budget
    /// runs out the last pair is returned flagged
    /// [`GenerationStatus::BestEffort`].
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when `settings` fall outside their bounds.
    pub fn generate<R: RngCore>(
        &mut self,
        settings: &Settings,
        viewport: &Viewport,
        scale: PixelScale,
        rng: &mut R,
    ) -> Result<Scenario, SettingsError> {
        let settings = settings.normalized();
        settings.validate()?;
        Ok(self.generate_validated(&settings, viewport, scale, rng))
    }

    /// `settings` must already be normalized and validated.
    pub(crate) fn generate_validated<R: RngCore>(
        &mut self,
        settings: &Settings,
        viewport: &Viewport,
        scale: PixelScale,
        rng: &mut R,
    ) -> Scenario {
        let mut attempts = 0;
        let mut satisfied = false;
        let mut pair = loop {
            attempts += 1;
            let candidate = self.sample_candidate(settings, viewport, scale, rng);
            if candidate.meets(settings) {
                satisfied = true;
                break candidate;
            }
            if attempts >= MAX_SAMPLING_ATTEMPTS {
                break candidate;
            }
        };

        let status = if satisfied {
            debug!(
                "accepted conflict after {attempts} attempts: angle {:.1} deg, cpa {:.2} NM",
                pair.angle,
                pair.cpa.map_or(f64::NAN, |cpa| cpa.distance)
            );
            GenerationStatus::Satisfied
        } else {
            warn!(
                "no pair met the requested constraints within {MAX_SAMPLING_ATTEMPTS} attempts; \
                 using last sample"
            );
            GenerationStatus::BestEffort
        };

        if let Some(cpa) = pair.cpa.filter(|cpa| cpa.time > 0.0) {
            let target_secs = sample_between(
                rng,
                settings.time_to_crossing_min,
                settings.time_to_crossing_max,
            ) * SECONDS_PER_MINUTE;
            for aircraft in &mut pair.aircraft {
                let shift = aircraft.speed_px_per_sec * (cpa.time - target_secs);
                aircraft.position = aircraft.position.advanced(aircraft.original_heading, shift);
            }
        }

        let flight_level = pair.aircraft[0].flight_level;
        let sep_color = SepColor::random(rng);
        for aircraft in &mut pair.aircraft {
            aircraft.flight_level = flight_level;
            aircraft.sep_color = sep_color;
            aircraft.populate_history();
        }

        let [first, second] = &pair.aircraft;
        let time_to_crossing = approach_for(first, second, HeadingSource::Filed, scale)
            .map_or(0.0, |cpa| cpa.time / SECONDS_PER_MINUTE);
        let metadata = ScenarioMetadata {
            speed_difference: (first.speed_knots - second.speed_knots).abs(),
            angle: pair.angle,
            time_to_crossing,
        };

        Scenario {
            aircraft: pair.aircraft,
            metadata,
            status,
            attempts,
        }
    }

    fn sample_candidate<R: RngCore>(
        &mut self,
        settings: &Settings,
        viewport: &Viewport,
        scale: PixelScale,
        rng: &mut R,
    ) -> Candidate {
        let mut first = create_aircraft_with(&mut self.spawn, AircraftId::FIRST, viewport, rng);
        let mut second = create_aircraft_with(&mut self.spawn, AircraftId::SECOND, viewport, rng);

        let (band_low, band_high) = if settings.is_high_speed_diff() {
            HIGH_DIFF_SPEED_BAND_KT
        } else {
            BASE_SPEED_BAND_KT
        };
        let speed1 = f64::from(rng.gen_range(band_low..=band_high));
        let diff = f64::from(rng.gen_range(settings.speed_diff_min..=settings.speed_diff_max));
        let speed2 = if rng.gen_bool(0.5) {
            speed1 + diff
        } else {
            speed1 - diff
        };
        first.set_speed_knots(speed1, scale);
        second.set_speed_knots(speed2, scale);

        let aim = aim_point(viewport, first.position, second.position, rng);
        first.file_heading(first.position.bearing_to(aim));
        second.file_heading(second.position.bearing_to(aim));

        let angle = crossing_angle_degrees(first.original_heading, second.original_heading);
        let cpa = approach_for(&first, &second, HeadingSource::Filed, scale);
        let separation_now = scale.px_to_nm(distance(first.position, second.position));

        Candidate {
            aircraft: [first, second],
            angle,
            cpa,
            separation_now,
        }
    }
}

/// Sample a scenario with the default edge spawn policy.
///
/// # Errors
///
/// Returns `SettingsError` when `settings` fall outside their bounds.
pub fn generate_pair<R: RngCore>(
    settings: &Settings,
    viewport: &Viewport,
    scale: PixelScale,
    rng: &mut R,
) -> Result<Scenario, SettingsError> {
    ScenarioGenerator::new().generate(settings, viewport, scale, rng)
}

/// Reflect the play-area centre through the pair midpoint, then jitter.
fn aim_point<R: Rng + ?Sized>(
    viewport: &Viewport,
    p1: Position,
    p2: Position,
    rng: &mut R,
) -> Position {
    let center = viewport.play_center();
    let mid = p1.midpoint(p2);
    let jitter_x = (rng.r#gen::<f64>() - 0.5) * viewport.width * AIM_JITTER_FRACTION;
    let jitter_y = (rng.r#gen::<f64>() - 0.5) * viewport.play_height() * AIM_JITTER_FRACTION;
    Position::new(
        2.0f64.mul_add(center.x, -mid.x) + jitter_x,
        2.0f64.mul_add(center.y, -mid.y) + jitter_y,
    )
}

struct Candidate {
    aircraft: [Aircraft; 2],
    angle: f64,
    cpa: Option<ClosestApproach>,
    separation_now: f64,
}

impl Candidate {
    fn meets(&self, settings: &Settings) -> bool {
        let conflict = self
            .cpa
            .is_some_and(|cpa| cpa.distance < CONFLICT_THRESHOLD_NM);
        conflict
            && self.separation_now > MIN_INITIAL_DISTANCE_NM
            && (settings.angle_min..=settings.angle_max).contains(&self.angle)
    }
}

//! A single trainee exercise: one conflict pair, turn inputs, and scoring.
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::aircraft::{Aircraft, AircraftId};
use crate::kinematics::{ClosestApproach, HeadingSource, predicted_separation};
use crate::outcome::{Verdict, classify};
use crate::rng::RngBundle;
use crate::scenario::{Scenario, ScenarioGenerator, ScenarioMetadata};
use crate::seed::encode_friendly;
use crate::settings::{Settings, SettingsError};
use crate::viewport::{PixelScale, Viewport, ViewportError};

/// Whether submissions count towards the trainee's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseMode {
    #[default]
    Practice,
    Test,
}

impl ExerciseMode {
    /// Two-letter prefix used in share codes.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Practice => "PR",
            Self::Test => "TS",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "PR" => Some(Self::Practice),
            "TS" => Some(Self::Test),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Practice => "practice",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for ExerciseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ExerciseError {
    #[error("aircraft {0} is not part of the current scenario")]
    UnknownAircraft(AircraftId),
    #[error("no aircraft is selected")]
    NoSelection,
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Viewport(#[from] ViewportError),
}

/// What gets persisted for one submitted exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user: String,
    pub verdict: Verdict,
    /// Minimum separation along the as-flown tracks, NM.
    pub separation_nm: f64,
    pub metadata: ScenarioMetadata,
    pub mode: ExerciseMode,
    /// Turn issued to each aircraft, indexed by scenario slot.
    pub turns: [i32; 2],
    /// Unix seconds, when the caller supplies a clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<i64>,
}

/// Live exercise state owned by the display layer.
#[derive(Debug, Clone)]
pub struct Exercise {
    mode: ExerciseMode,
    settings: Settings,
    viewport: Viewport,
    scale: PixelScale,
    scenario: Scenario,
    selected: Option<AircraftId>,
    rng: RngBundle,
}

impl Exercise {
    /// Validate `settings` and draw the first scale and scenario from `seed`.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::Settings` when a range lies outside its bounds
    /// and `ExerciseError::Viewport` for a degenerate viewport.
    pub fn start(
        mode: ExerciseMode,
        settings: Settings,
        viewport: Viewport,
        seed: u64,
    ) -> Result<Self, ExerciseError> {
        let settings = settings.normalized();
        settings.validate()?;
        viewport.validate()?;
        let rng = RngBundle::from_user_seed(seed);
        let scale = PixelScale::sample(&viewport, &mut *rng.scale());
        let scenario = ScenarioGenerator::new().generate_validated(
            &settings,
            &viewport,
            scale,
            &mut *rng.scenario(),
        );
        Ok(Self {
            mode,
            settings,
            viewport,
            scale,
            scenario,
            selected: None,
            rng,
        })
    }

    /// Replace the pair wholesale with the next draw from the same streams.
    /// Pending turns and the selection are dropped with the old pair.
    pub fn regenerate(&mut self) {
        self.scale = PixelScale::sample(&self.viewport, &mut *self.rng.scale());
        self.scenario = ScenarioGenerator::new().generate_validated(
            &self.settings,
            &self.viewport,
            self.scale,
            &mut *self.rng.scenario(),
        );
        self.selected = None;
    }

    /// Swap in new constraint ranges and regenerate the pair from them.
    /// Invalid settings leave the exercise untouched.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::Settings` when a range lies outside its bounds.
    pub fn apply_settings(&mut self, settings: Settings) -> Result<(), ExerciseError> {
        let settings = settings.normalized();
        settings.validate()?;
        self.settings = settings;
        self.regenerate();
        Ok(())
    }

    #[must_use]
    pub const fn mode(&self) -> ExerciseMode {
        self.mode
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn scale(&self) -> PixelScale {
        self.scale
    }

    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Seed this exercise was started from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.user_seed()
    }

    /// Share code for this exercise. It replays the same scenarios only when
    /// the seed itself was decoded from a share code.
    #[must_use]
    pub fn share_code(&self) -> String {
        encode_friendly(self.mode, self.seed())
    }

    /// Zoom: swap in a new scale and keep aircraft positions and pixel
    /// speeds in step, so every distance in NM is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::Viewport` unless `scale` is finite and positive.
    pub fn set_scale(&mut self, scale: PixelScale) -> Result<(), ExerciseError> {
        scale.validate()?;
        self.scenario.rescale(self.scale, scale, self.viewport.play_center());
        self.scale = scale;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ExerciseError::UnknownAircraft` when `id` is not in the pair.
    pub fn select(&mut self, id: AircraftId) -> Result<(), ExerciseError> {
        if self.scenario.aircraft(id).is_none() {
            return Err(ExerciseError::UnknownAircraft(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Aircraft> {
        self.selected.and_then(|id| self.scenario.aircraft(id))
    }

    /// Set the pending turn of the selected aircraft.
    ///
    /// # Errors
    ///
    /// Returns `ExerciseError::NoSelection` when nothing is selected.
    pub fn issue_turn(&mut self, degrees: i32) -> Result<(), ExerciseError> {
        let id = self.selected.ok_or(ExerciseError::NoSelection)?;
        self.turn_aircraft(id, degrees)
    }

    /// # Errors
    ///
    /// Returns `ExerciseError::UnknownAircraft` when `id` is not in the pair.
    pub fn turn_aircraft(&mut self, id: AircraftId, degrees: i32) -> Result<(), ExerciseError> {
        let aircraft = self
            .scenario
            .aircraft_mut(id)
            .ok_or(ExerciseError::UnknownAircraft(id))?;
        aircraft.apply_turn(degrees);
        Ok(())
    }

    /// Conflict as generated, ignoring pending turns.
    #[must_use]
    pub fn filed_approach(&self) -> Option<ClosestApproach> {
        self.scenario.approach(HeadingSource::Filed, self.scale)
    }

    /// Closest approach the trainee's turns would produce.
    #[must_use]
    pub fn flown_approach(&self) -> Option<ClosestApproach> {
        self.scenario.approach(HeadingSource::Flown, self.scale)
    }

    #[must_use]
    pub fn flown_separation(&self) -> f64 {
        let [first, second] = &self.scenario.aircraft;
        predicted_separation(first, second, HeadingSource::Flown, self.scale)
    }

    #[must_use]
    pub fn verdict(&self) -> Verdict {
        classify(self.flown_separation())
    }

    /// Score the current turns for `user`.
    #[must_use]
    pub fn score(&self, user: &str, recorded_at: Option<i64>) -> ScoreRecord {
        let separation_nm = self.flown_separation();
        let [first, second] = &self.scenario.aircraft;
        ScoreRecord {
            user: user.to_string(),
            verdict: classify(separation_nm),
            separation_nm,
            metadata: self.scenario.metadata,
            mode: self.mode,
            turns: [first.pending_turn_degrees, second.pending_turn_degrees],
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn practice(seed: u64) -> Exercise {
        Exercise::start(ExerciseMode::Practice, Settings::default(), Viewport::default(), seed)
            .expect("default settings are valid")
    }

    #[test]
    fn same_seed_replays_same_exercise() {
        let a = practice(1234);
        let b = practice(1234);
        assert_eq!(a.scenario(), b.scenario());
        assert_eq!(a.scale(), b.scale());
        assert_eq!(a.share_code(), b.share_code());
        assert!(a.share_code().starts_with("PR-"));
    }

    #[test]
    fn turns_need_a_selection() {
        let mut exercise = practice(9);
        assert_eq!(exercise.issue_turn(10), Err(ExerciseError::NoSelection));
        assert_eq!(
            exercise.select(AircraftId::new(3)),
            Err(ExerciseError::UnknownAircraft(AircraftId::new(3)))
        );

        exercise.select(AircraftId::SECOND).unwrap();
        exercise.issue_turn(-20).unwrap();
        assert_eq!(exercise.scenario().second().pending_turn_degrees, -20);
        assert_eq!(exercise.scenario().first().pending_turn_degrees, 0);
        assert_eq!(exercise.selected().map(|a| a.id), Some(AircraftId::SECOND));

        exercise.deselect();
        assert!(exercise.selected().is_none());
    }

    #[test]
    fn untouched_exercise_matches_filed_geometry() {
        let exercise = practice(55);
        let filed = exercise.filed_approach();
        let flown = exercise.flown_approach();
        assert_eq!(filed, flown);
        if exercise.scenario().is_satisfied() {
            assert_eq!(exercise.verdict(), Verdict::Fail);
        }
    }

    #[test]
    fn regenerate_replaces_pair_and_clears_selection() {
        let mut exercise = practice(42);
        let before = exercise.scenario().clone();
        exercise.select(AircraftId::FIRST).unwrap();
        exercise.issue_turn(30).unwrap();
        exercise.regenerate();
        assert_ne!(exercise.scenario(), &before);
        assert!(exercise.selected().is_none());
        assert_eq!(exercise.scenario().first().pending_turn_degrees, 0);
        assert_eq!(exercise.seed(), 42);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = Settings::default().with_angle(5.0, 90.0);
        let err =
            Exercise::start(ExerciseMode::Test, settings, Viewport::default(), 1).unwrap_err();
        assert!(matches!(err, ExerciseError::Settings(SettingsError::RangeViolation { .. })));
    }

    #[test]
    fn degenerate_viewport_is_rejected() {
        let flat = Viewport::new(0.0, 900.0);
        let err = Exercise::start(ExerciseMode::Test, Settings::default(), flat, 1).unwrap_err();
        assert!(matches!(err, ExerciseError::Viewport(ViewportError::Dimension { .. })));
    }

    #[test]
    fn applied_settings_regenerate_the_pair() {
        let mut exercise = practice(21);
        let before = exercise.scenario().clone();
        exercise.select(AircraftId::FIRST).unwrap();
        exercise.issue_turn(15).unwrap();

        let opposite = Settings::default().with_angle(180.0, 140.0).with_speed_diff(0, 30);
        exercise.apply_settings(opposite).unwrap();
        assert_eq!(exercise.settings(), &opposite.normalized());
        assert_ne!(exercise.scenario(), &before);
        assert!(exercise.selected().is_none());
        assert!(exercise.scenario().metadata.speed_difference <= 30.0);

        let kept = exercise.scenario().clone();
        let err = exercise.apply_settings(Settings::default().with_speed_diff(0, 151));
        assert!(matches!(err, Err(ExerciseError::Settings(_))));
        assert_eq!(exercise.scenario(), &kept);
        assert_eq!(exercise.settings(), &opposite.normalized());
    }

    #[test]
    fn zoom_rejects_degenerate_scale() {
        let mut exercise = practice(4);
        let scale = exercise.scale();
        assert!(matches!(
            exercise.set_scale(PixelScale::new(0.0)),
            Err(ExerciseError::Viewport(ViewportError::Scale(_)))
        ));
        assert_eq!(exercise.scale(), scale);
    }

    #[test]
    fn score_captures_turns_and_metadata() {
        let mut exercise = practice(8);
        exercise.turn_aircraft(AircraftId::FIRST, 25).unwrap();
        let record = exercise.score("trainee", Some(1_700_000_000));
        assert_eq!(record.turns, [25, 0]);
        assert_eq!(record.metadata, exercise.scenario().metadata);
        assert_eq!(record.verdict, exercise.verdict());
        assert_eq!(record.mode, ExerciseMode::Practice);
        assert_eq!(record.recorded_at, Some(1_700_000_000));
    }

    #[test]
    fn mode_codes_parse_back() {
        for mode in [ExerciseMode::Practice, ExerciseMode::Test] {
            assert_eq!(ExerciseMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(ExerciseMode::from_code("ts"), Some(ExerciseMode::Test));
        assert_eq!(ExerciseMode::from_code("XX"), None);
    }
}

//! ATC Drill Engine
//!
//! Platform-agnostic core of the ATC Drill separation trainer: conflict
//! geometry, scenario generation, the turn model and verdict scoring.
//! This crate has no UI, storage or clock dependencies; those are supplied
//! by the embedding application through [`ScoreStorage`].

pub mod aircraft;
pub mod constants;
pub mod exercise;
pub mod kinematics;
pub mod numbers;
pub mod outcome;
pub mod rng;
pub mod scenario;
pub mod seed;
pub mod settings;
pub mod stats;
pub mod turn;
pub mod viewport;

use log::{debug, warn};

// Re-export commonly used types
pub use aircraft::{
    Aircraft, AircraftId, Edge, EdgeSpawn, FixedSpawn, SepColor, SpawnSource, TrackHistory,
    create_aircraft, create_aircraft_with, generate_callsign, generate_flight_level,
};
pub use exercise::{Exercise, ExerciseError, ExerciseMode, ScoreRecord};
pub use kinematics::{
    ClosestApproach, CpaReadout, HeadingSource, Position, approach_for, closest_approach,
    distance, predicted_separation,
};
pub use outcome::{Verdict, classify};
pub use rng::{CountingRng, RngBundle};
pub use scenario::{
    GenerationStatus, Scenario, ScenarioGenerator, ScenarioMetadata, crossing_angle_degrees,
    generate_pair,
};
pub use seed::{decode_to_seed, encode_friendly, generate_code_from_entropy, parse_share_code};
pub use settings::{AnglePreset, CrossingTimePreset, Settings, SettingsError, SpeedDiffPreset};
pub use stats::{ScoreFilter, VerdictTally, tally_by_user, total};
pub use turn::{TurnCommand, TurnDirection, apply_turn};
pub use viewport::{PixelScale, Viewport, ViewportError};

/// Persistence seam for submitted scores.
/// Platform-specific implementations should provide this
pub trait ScoreStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist one score record
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    fn record_score(&self, record: &ScoreRecord) -> Result<(), Self::Error>;
}

/// Entry point for running exercises against a storage backend
pub struct ExerciseEngine<S>
where
    S: ScoreStorage,
{
    storage: S,
}

impl<S> ExerciseEngine<S>
where
    S: ScoreStorage,
{
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Start an exercise whose scale and scenario are drawn from `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if `settings` fall outside the allowed bounds.
    pub fn new_exercise(
        &self,
        mode: ExerciseMode,
        settings: Settings,
        viewport: Viewport,
        seed: u64,
    ) -> Result<Exercise, ExerciseError> {
        let exercise = Exercise::start(mode, settings, viewport, seed)?;
        debug!(
            "started {mode} exercise {} ({:?} after {} attempts)",
            exercise.share_code(),
            exercise.scenario().status,
            exercise.scenario().attempts
        );
        Ok(exercise)
    }

    /// Start an exercise from a share code such as `PR-ABNUR42`.
    /// Returns `None` for codes that do not parse.
    ///
    /// # Errors
    ///
    /// Returns an error if `settings` fall outside the allowed bounds.
    pub fn replay(
        &self,
        code: &str,
        settings: Settings,
        viewport: Viewport,
    ) -> Result<Option<Exercise>, ExerciseError> {
        let Some((mode, seed)) = parse_share_code(code) else {
            return Ok(None);
        };
        self.new_exercise(mode, settings, viewport, seed).map(Some)
    }

    /// Discard the current pair and draw the next one.
    pub fn regenerate(&self, exercise: &mut Exercise) {
        exercise.regenerate();
        debug!(
            "regenerated scenario: {:?} after {} attempts",
            exercise.scenario().status,
            exercise.scenario().attempts
        );
    }

    /// Score the exercise for `user` and hand the record to storage.
    /// Storage failures are logged and never surface to the trainee.
    pub fn submit(&self, exercise: &Exercise, user: &str) -> ScoreRecord {
        self.submit_at(exercise, user, None)
    }

    /// Same as [`ExerciseEngine::submit`] with a caller-supplied timestamp.
    pub fn submit_at(
        &self,
        exercise: &Exercise,
        user: &str,
        recorded_at: Option<i64>,
    ) -> ScoreRecord {
        let record = exercise.score(user, recorded_at);
        if let Err(err) = self.storage.record_score(&record) {
            warn!("failed to store {} score for {user}: {err}", record.verdict);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::rc::Rc;
    use thiserror::Error;

    #[derive(Clone, Default)]
    struct MemoryStorage {
        records: Rc<RefCell<Vec<ScoreRecord>>>,
    }

    impl ScoreStorage for MemoryStorage {
        type Error = Infallible;

        fn record_score(&self, record: &ScoreRecord) -> Result<(), Self::Error> {
            self.records.borrow_mut().push(record.clone());
            Ok(())
        }
    }

    #[derive(Debug, Error)]
    #[error("backend offline")]
    struct Offline;

    struct OfflineStorage;

    impl ScoreStorage for OfflineStorage {
        type Error = Offline;

        fn record_score(&self, _record: &ScoreRecord) -> Result<(), Self::Error> {
            Err(Offline)
        }
    }

    #[test]
    fn submit_stores_classified_record() {
        let storage = MemoryStorage::default();
        let engine = ExerciseEngine::new(storage.clone());
        let mut exercise = engine
            .new_exercise(ExerciseMode::Test, Settings::default(), Viewport::default(), 0xABCD)
            .unwrap();
        exercise.select(AircraftId::FIRST).unwrap();
        exercise.issue_turn(30).unwrap();

        let record = engine.submit(&exercise, "trainee");
        assert_eq!(record.verdict, classify(record.separation_nm));
        assert_eq!(record.turns, [30, 0]);

        let stored = storage.records.borrow();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], record);
    }

    #[test]
    fn storage_failure_still_returns_record() {
        let engine = ExerciseEngine::new(OfflineStorage);
        let exercise = engine
            .new_exercise(ExerciseMode::Practice, Settings::default(), Viewport::default(), 7)
            .unwrap();
        let record = engine.submit_at(&exercise, "trainee", Some(42));
        assert_eq!(record.user, "trainee");
        assert_eq!(record.recorded_at, Some(42));
    }

    #[test]
    fn share_code_replays_first_scenario() {
        let engine = ExerciseEngine::new(MemoryStorage::default());
        let original = engine
            .new_exercise(ExerciseMode::Test, Settings::default(), Viewport::default(), 0)
            .unwrap();
        let code = original.share_code();
        let (_, seed) = parse_share_code(&code).unwrap();

        let replayed = engine
            .replay(&code, Settings::default(), Viewport::default())
            .unwrap()
            .expect("code parses");
        let expected = engine
            .new_exercise(ExerciseMode::Test, Settings::default(), Viewport::default(), seed)
            .unwrap();
        assert_eq!(replayed.scenario(), expected.scenario());
        assert_eq!(replayed.mode(), ExerciseMode::Test);
        let garbage = engine.replay("nonsense", Settings::default(), Viewport::default());
        assert!(garbage.unwrap().is_none());
    }

    #[test]
    fn regenerate_keeps_seed() {
        let engine = ExerciseEngine::new(MemoryStorage::default());
        let mut exercise = engine
            .new_exercise(ExerciseMode::Practice, Settings::default(), Viewport::default(), 3)
            .unwrap();
        engine.regenerate(&mut exercise);
        assert_eq!(exercise.seed(), 3);
    }
}

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use atcdrill_engine::{
    AircraftId, Exercise, ExerciseEngine, ExerciseMode, PixelScale, ScoreFilter, ScoreRecord,
    ScoreStorage, Settings, TurnCommand, Verdict, Viewport, classify, distance, tally_by_user,
    total,
};

#[derive(Clone, Default)]
struct RecordingStorage {
    records: Rc<RefCell<Vec<ScoreRecord>>>,
}

impl ScoreStorage for RecordingStorage {
    type Error = Infallible;

    fn record_score(&self, record: &ScoreRecord) -> Result<(), Self::Error> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

fn engine() -> (ExerciseEngine<RecordingStorage>, RecordingStorage) {
    let storage = RecordingStorage::default();
    (ExerciseEngine::new(storage.clone()), storage)
}

#[test]
fn untouched_conflict_fails_and_a_turn_can_solve_it() {
    let (engine, _) = engine();
    let mut solved_any = false;
    for seed in 0..10 {
        let mut exercise = engine
            .new_exercise(ExerciseMode::Practice, Settings::default(), Viewport::default(), seed)
            .expect("valid settings");
        assert!(exercise.scenario().is_satisfied(), "seed {seed}");
        assert_eq!(exercise.verdict(), Verdict::Fail, "seed {seed}");

        exercise.select(AircraftId::FIRST).expect("aircraft 1 exists");
        for command in TurnCommand::all() {
            exercise.issue_turn(command.degrees()).expect("selection held");
            if exercise.verdict() == Verdict::Success {
                solved_any = true;
            }
        }
    }
    assert!(solved_any, "no turn produced adequate separation");
}

#[test]
fn zero_turn_restores_filed_geometry() {
    let (engine, _) = engine();
    let mut exercise = engine
        .new_exercise(ExerciseMode::Test, Settings::default(), Viewport::default(), 77)
        .expect("valid settings");
    let filed = exercise.filed_approach();
    exercise.select(AircraftId::SECOND).expect("aircraft 2 exists");
    exercise.issue_turn(25).expect("selected");
    assert_eq!(exercise.filed_approach(), filed);
    exercise.issue_turn(0).expect("selected");
    assert_eq!(exercise.flown_approach(), filed);
}

#[test]
fn submissions_feed_statistics() {
    let (engine, storage) = engine();
    let users = ["ana", "ben", "ana"];
    for (seed, user) in users.iter().enumerate() {
        let seed = u64::try_from(seed).expect("small index");
        let mut exercise = engine
            .new_exercise(ExerciseMode::Test, Settings::default(), Viewport::default(), seed)
            .expect("valid settings");
        exercise.turn_aircraft(AircraftId::FIRST, 30).expect("aircraft 1 exists");
        let record = engine.submit(&exercise, user);
        assert_eq!(record.verdict, classify(record.separation_nm));
        assert!((record.separation_nm - exercise.flown_separation()).abs() < f64::EPSILON);
    }

    let records = storage.records.borrow();
    assert_eq!(records.len(), 3);
    let tallies = tally_by_user(records.iter(), &ScoreFilter::all());
    assert_eq!(tallies["ana"].submitted, 2);
    assert_eq!(tallies["ben"].submitted, 1);
    let sum = total(&tallies);
    assert_eq!(sum.success + sum.fail + sum.waste, 3);

    let practice_only = ScoreFilter {
        mode: Some(ExerciseMode::Practice),
        ..ScoreFilter::all()
    };
    assert!(tally_by_user(records.iter(), &practice_only).is_empty());
}

#[test]
fn default_filter_counts_crossing_times_pinned_to_the_bounds() {
    let (engine, storage) = engine();
    for minutes in [3.0, 10.0] {
        let settings = Settings::default().with_time_to_crossing(minutes, minutes);
        for seed in 0..40 {
            let exercise = engine
                .new_exercise(ExerciseMode::Test, settings, Viewport::default(), seed)
                .expect("valid settings");
            let _ = engine.submit(&exercise, "edge");
        }
    }

    let records = storage.records.borrow();
    assert_eq!(records.len(), 80);
    let tallies = tally_by_user(records.iter(), &ScoreFilter::default());
    assert_eq!(tallies["edge"].submitted, 80);
    assert_eq!(total(&tallies), total(&tally_by_user(records.iter(), &ScoreFilter::all())));
}

#[test]
fn settings_json_drives_exercise() {
    let settings = Settings::from_json(r#"{"angleMin": 140, "angleMax": 180, "speedDiffMax": 30}"#)
        .expect("valid json settings");
    let (engine, _) = engine();
    let exercise = engine
        .new_exercise(ExerciseMode::Practice, settings, Viewport::new(1_400.0, 1_000.0), 5)
        .expect("valid settings");
    let meta = exercise.scenario().metadata;
    assert!(meta.speed_difference <= 30.0);
    assert!(exercise.scenario().is_satisfied());
    assert!(meta.angle >= 140.0);
}

#[test]
fn zoom_preserves_geometry_in_nautical_miles() {
    let (engine, _) = engine();
    let mut exercise = engine
        .new_exercise(ExerciseMode::Practice, Settings::default(), Viewport::default(), 3)
        .expect("valid settings");
    exercise.turn_aircraft(AircraftId::SECOND, -15).expect("aircraft 2 exists");

    let nm_apart = |exercise: &Exercise| {
        let scenario = exercise.scenario();
        exercise
            .scale()
            .px_to_nm(distance(scenario.first().position, scenario.second().position))
    };
    let filed = exercise.filed_approach().expect("generated pair converges");
    let flown_nm = exercise.flown_separation();
    let apart_nm = nm_apart(&exercise);
    let knots = [exercise.scenario().first().speed_knots, exercise.scenario().second().speed_knots];

    let zoomed = PixelScale::new(exercise.scale().pixels_per_nm() * 1.75);
    exercise.set_scale(zoomed).expect("positive scale");
    assert_eq!(exercise.scale(), zoomed);

    let rescaled = exercise.filed_approach().expect("zoom keeps the conflict");
    assert!((rescaled.time - filed.time).abs() < 1e-6);
    assert!((rescaled.distance - filed.distance).abs() < 1e-9);
    assert!((exercise.flown_separation() - flown_nm).abs() < 1e-9);
    assert!((nm_apart(&exercise) - apart_nm).abs() < 1e-9);
    for (aircraft, before) in exercise.scenario().aircraft.iter().zip(knots) {
        assert!((aircraft.speed_knots - before).abs() < f64::EPSILON);
        let expected_px = zoomed.knots_to_px_per_sec(before);
        assert!((aircraft.speed_px_per_sec - expected_px).abs() < 1e-12);
    }
}

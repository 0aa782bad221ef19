use std::sync::LazyLock;

use anyhow::{Result, anyhow, bail, ensure};
use regex::Regex;

use atcdrill_engine::constants::{
    CONFLICT_THRESHOLD_NM, HIGH_DIFF_SPEED_BAND_KT, HISTORY_POINTS, LOSS_OF_SEPARATION_NM,
    MAX_SAMPLING_ATTEMPTS,
};
use atcdrill_engine::{
    AnglePreset, CrossingTimePreset, GenerationStatus, HeadingSource, Settings, SpeedDiffPreset,
};

use crate::logic::{DrillPlan, DrillSummary};

pub const CUSTOM_KEY: &str = "custom";

const TOLERANCE: f64 = 1e-6;

static CALLSIGN_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}\d{1,3}[A-Z]?$"));

/// One row of the scenario catalogue.
pub struct CatalogEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub settings: Settings,
    pub build: fn(Settings) -> DrillPlan,
}

const fn presets(
    speed: SpeedDiffPreset,
    angle: AnglePreset,
    time: CrossingTimePreset,
) -> Settings {
    Settings::from_presets(speed, angle, time)
}

const RANDOM: Settings = presets(
    SpeedDiffPreset::Random,
    AnglePreset::Random,
    CrossingTimePreset::Random,
);

static CATALOG: [CatalogEntry; 12] = [
    CatalogEntry {
        key: "smoke",
        name: "Smoke",
        description: "Full default ranges; structural and determinism checks",
        settings: RANDOM,
        build: standard_plan,
    },
    CatalogEntry {
        key: "sharp-angle",
        name: "Sharp Angle",
        description: "Crossing angle preset 20-55 degrees",
        settings: presets(
            SpeedDiffPreset::Random,
            AnglePreset::Sharp,
            CrossingTimePreset::Random,
        ),
        build: standard_plan,
    },
    CatalogEntry {
        key: "crossing-angle",
        name: "Crossing Angle",
        description: "Crossing angle preset 55-140 degrees",
        settings: presets(
            SpeedDiffPreset::Random,
            AnglePreset::Crossing,
            CrossingTimePreset::Random,
        ),
        build: standard_plan,
    },
    CatalogEntry {
        key: "opposite-angle",
        name: "Opposite Angle",
        description: "Crossing angle preset 140-180 degrees",
        settings: presets(
            SpeedDiffPreset::Random,
            AnglePreset::Opposite,
            CrossingTimePreset::Random,
        ),
        build: standard_plan,
    },
    CatalogEntry {
        key: "low-speed-diff",
        name: "Low Speed Difference",
        description: "Speed difference preset 0-30 kt",
        settings: presets(
            SpeedDiffPreset::Low,
            AnglePreset::Random,
            CrossingTimePreset::Random,
        ),
        build: standard_plan,
    },
    CatalogEntry {
        key: "high-speed-diff",
        name: "High Speed Difference",
        description: "Speed difference preset 60-150 kt on the widened speed band",
        settings: presets(
            SpeedDiffPreset::High,
            AnglePreset::Random,
            CrossingTimePreset::Random,
        ),
        build: high_speed_plan,
    },
    CatalogEntry {
        key: "short-crossing",
        name: "Short Crossing",
        description: "Closest approach 3-5 minutes out",
        settings: presets(
            SpeedDiffPreset::Random,
            AnglePreset::Random,
            CrossingTimePreset::Under5,
        ),
        build: standard_plan,
    },
    CatalogEntry {
        key: "long-crossing",
        name: "Long Crossing",
        description: "Closest approach 8-10 minutes out",
        settings: presets(
            SpeedDiffPreset::Random,
            AnglePreset::Random,
            CrossingTimePreset::Over8,
        ),
        build: standard_plan,
    },
    CatalogEntry {
        key: "equal-speed",
        name: "Equal Speed",
        description: "Both aircraft at the same ground speed",
        settings: RANDOM.with_speed_diff(0, 0),
        build: equal_speed_plan,
    },
    CatalogEntry {
        key: "unsatisfiable",
        name: "Unsatisfiable Constraints",
        description: "Pinned 20 degree angle; exercises the best-effort fallback",
        settings: RANDOM.with_angle(20.0, 20.0),
        build: unsatisfiable_plan,
    },
    CatalogEntry {
        key: "turn-sweep",
        name: "Turn Sweep",
        description: "Every turn command on aircraft 1; some turn must restore separation",
        settings: RANDOM,
        build: turn_sweep_plan,
    },
    CatalogEntry {
        key: CUSTOM_KEY,
        name: "Custom Settings",
        description: "Ranges from --settings JSON (defaults when omitted)",
        settings: RANDOM,
        build: standard_plan,
    },
];

#[must_use]
pub fn catalog_entries() -> &'static [CatalogEntry] {
    &CATALOG
}

fn base_plan(settings: Settings) -> DrillPlan {
    DrillPlan::new(settings)
        .with_expectation(deterministic_replay)
        .with_expectation(shared_cosmetics)
        .with_expectation(callsign_format)
        .with_expectation(speed_difference_in_range)
}

fn standard_plan(settings: Settings) -> DrillPlan {
    base_plan(settings).with_expectation(satisfied_constraints)
}

fn high_speed_plan(settings: Settings) -> DrillPlan {
    standard_plan(settings).with_expectation(widened_speed_band)
}

fn equal_speed_plan(settings: Settings) -> DrillPlan {
    standard_plan(settings).with_expectation(|summary: &DrillSummary| {
        let [first, second] = &summary.scenario.aircraft;
        ensure!(
            summary.scenario.metadata.speed_difference.abs() < f64::EPSILON,
            "speed difference {} kt on an equal-speed drill",
            summary.scenario.metadata.speed_difference
        );
        ensure!(
            (first.speed_knots - second.speed_knots).abs() < f64::EPSILON,
            "speeds {} and {} differ",
            first.speed_knots,
            second.speed_knots
        );
        Ok(())
    })
}

fn unsatisfiable_plan(settings: Settings) -> DrillPlan {
    base_plan(settings).with_expectation(|summary: &DrillSummary| {
        let scenario = &summary.scenario;
        if scenario.status == GenerationStatus::Satisfied {
            // A spot-on 20 degree crossing is possible, just very unlikely.
            return check_satisfied(summary);
        }
        ensure!(
            scenario.attempts == MAX_SAMPLING_ATTEMPTS,
            "best-effort pair after {} attempts, expected {MAX_SAMPLING_ATTEMPTS}",
            scenario.attempts
        );
        Ok(())
    })
}

fn turn_sweep_plan(settings: Settings) -> DrillPlan {
    standard_plan(settings)
        .with_turn_sweep()
        .with_expectation(|summary: &DrillSummary| {
            ensure!(!summary.sweep.is_empty(), "turn sweep produced no points");
            if !summary.scenario.is_satisfied() {
                return Ok(());
            }
            let widest = summary
                .sweep
                .iter()
                .map(|point| point.separation_nm)
                .fold(f64::NEG_INFINITY, f64::max);
            ensure!(
                widest >= LOSS_OF_SEPARATION_NM,
                "no turn restored separation; best was {widest:.2} NM"
            );
            Ok(())
        })
}

fn deterministic_replay(summary: &DrillSummary) -> Result<()> {
    ensure!(
        summary.fingerprint == summary.replay_fingerprint,
        "seed {} produced different scenarios on replay ({:016x} vs {:016x})",
        summary.seed,
        summary.fingerprint,
        summary.replay_fingerprint
    );
    Ok(())
}

fn shared_cosmetics(summary: &DrillSummary) -> Result<()> {
    let [first, second] = &summary.scenario.aircraft;
    ensure!(
        first.flight_level == second.flight_level,
        "flight levels differ: FL{} vs FL{}",
        first.flight_level,
        second.flight_level
    );
    ensure!(
        first.sep_color == second.sep_color,
        "separation colours differ"
    );
    for aircraft in &summary.scenario.aircraft {
        ensure!(
            aircraft.history.len() == HISTORY_POINTS,
            "{} has {} history points",
            aircraft.callsign,
            aircraft.history.len()
        );
    }
    Ok(())
}

fn callsign_format(summary: &DrillSummary) -> Result<()> {
    let pattern = CALLSIGN_RE
        .as_ref()
        .map_err(|err| anyhow!("callsign pattern: {err}"))?;
    for aircraft in &summary.scenario.aircraft {
        if !pattern.is_match(&aircraft.callsign) {
            bail!("malformed callsign '{}'", aircraft.callsign);
        }
    }
    Ok(())
}

fn speed_difference_in_range(summary: &DrillSummary) -> Result<()> {
    let diff = summary.scenario.metadata.speed_difference;
    let min = f64::from(summary.settings.speed_diff_min);
    let max = f64::from(summary.settings.speed_diff_max);
    ensure!(
        diff >= min - TOLERANCE && diff <= max + TOLERANCE,
        "speed difference {diff} kt outside {min}-{max}"
    );
    Ok(())
}

fn satisfied_constraints(summary: &DrillSummary) -> Result<()> {
    if summary.scenario.is_satisfied() {
        check_satisfied(summary)
    } else {
        Ok(())
    }
}

fn check_satisfied(summary: &DrillSummary) -> Result<()> {
    let settings = &summary.settings;
    let meta = summary.scenario.metadata;
    ensure!(
        meta.angle >= settings.angle_min - TOLERANCE
            && meta.angle <= settings.angle_max + TOLERANCE,
        "angle {:.3} outside {}-{}",
        meta.angle,
        settings.angle_min,
        settings.angle_max
    );
    ensure!(
        meta.time_to_crossing >= settings.time_to_crossing_min - TOLERANCE
            && meta.time_to_crossing <= settings.time_to_crossing_max + TOLERANCE,
        "time to crossing {:.3} min outside {}-{}",
        meta.time_to_crossing,
        settings.time_to_crossing_min,
        settings.time_to_crossing_max
    );
    let Some(cpa) = summary.scenario.approach(HeadingSource::Filed, summary.scale) else {
        bail!("accepted scenario has no closest approach");
    };
    ensure!(
        cpa.distance < CONFLICT_THRESHOLD_NM + TOLERANCE,
        "accepted scenario separates to {:.2} NM",
        cpa.distance
    );
    Ok(())
}

fn widened_speed_band(summary: &DrillSummary) -> Result<()> {
    let speed = summary.scenario.first().speed_knots;
    let (low, high) = (
        f64::from(HIGH_DIFF_SPEED_BAND_KT.0),
        f64::from(HIGH_DIFF_SPEED_BAND_KT.1),
    );
    ensure!(
        (low..=high).contains(&speed),
        "first aircraft at {speed} kt, expected {low}-{high}"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_unique_and_lowercase() {
        let mut seen = HashSet::new();
        for entry in catalog_entries() {
            assert!(seen.insert(entry.key), "duplicate key {}", entry.key);
            assert_eq!(entry.key, entry.key.to_ascii_lowercase());
        }
    }

    #[test]
    fn catalogue_settings_are_valid() {
        for entry in catalog_entries() {
            entry
                .settings
                .validate()
                .unwrap_or_else(|err| panic!("{}: {err}", entry.key));
        }
    }

    #[test]
    fn callsign_pattern_accepts_generated_shapes() {
        let pattern = CALLSIGN_RE.as_ref().unwrap();
        for good in ["BAW1", "KLM7C", "SWR999", "DLH42Z"] {
            assert!(pattern.is_match(good), "{good}");
        }
        for bad in ["BA1", "BAW", "BAW1234", "baw12", "BAW12CD"] {
            assert!(!pattern.is_match(bad), "{bad}");
        }
    }

    #[test]
    fn high_speed_band_check_uses_engine_band() {
        use crate::logic::drill_tester::DrillTester;
        use atcdrill_engine::{ExerciseMode, Viewport};

        let entry = catalog_entries()
            .iter()
            .find(|entry| entry.key == "high-speed-diff")
            .unwrap();
        let plan = (entry.build)(entry.settings);
        let tester = DrillTester::new(Viewport::default(), false);
        let (_, mut summary) = tester.run_plan(&plan, ExerciseMode::Practice, 9).unwrap();
        widened_speed_band(&summary).unwrap();

        summary.scenario.aircraft[0].speed_knots = f64::from(HIGH_DIFF_SPEED_BAND_KT.1) + 1.0;
        assert!(widened_speed_band(&summary).is_err());
    }

    #[test]
    fn turn_sweep_is_only_enabled_for_its_scenario() {
        for entry in catalog_entries() {
            let plan = (entry.build)(entry.settings);
            assert_eq!(plan.turn_sweep, entry.key == "turn-sweep", "{}", entry.key);
            assert!(plan.expectations.len() >= 4);
        }
    }
}

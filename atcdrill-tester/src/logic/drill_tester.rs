use anyhow::{Context, Result};
use serde::Serialize;
use std::hash::Hasher;
use std::sync::Arc;
use twox_hash::XxHash64;

use atcdrill_engine::{
    AircraftId, Exercise, ExerciseMode, PixelScale, Scenario, Settings, TurnCommand, Verdict,
    Viewport,
};

/// Declarative plan for one drill scenario.
#[derive(Debug, Clone)]
pub struct DrillPlan {
    pub settings: Settings,
    pub turn_sweep: bool,
    pub expectations: Vec<DrillExpectation>,
}

impl DrillPlan {
    #[must_use]
    pub const fn new(settings: Settings) -> Self {
        Self {
            settings,
            turn_sweep: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_turn_sweep(mut self) -> Self {
        self.turn_sweep = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<DrillExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a drill completes.
type DrillExpectationFn = Arc<dyn Fn(&DrillSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct DrillExpectation(DrillExpectationFn);

impl std::fmt::Debug for DrillExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrillExpectation").finish()
    }
}

impl DrillExpectation {
    pub fn evaluate(&self, summary: &DrillSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for DrillExpectation
where
    F: Fn(&DrillSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Separation produced by one turn command on aircraft 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint {
    pub degrees: i32,
    pub separation_nm: f64,
    pub verdict: Verdict,
}

/// Everything an expectation may inspect about one drill run.
#[derive(Debug, Clone)]
pub struct DrillSummary {
    pub mode: ExerciseMode,
    pub seed: u64,
    pub share_code: String,
    pub settings: Settings,
    pub scale: PixelScale,
    pub scenario: Scenario,
    pub fingerprint: u64,
    pub replay_fingerprint: u64,
    pub sweep: Vec<SweepPoint>,
}

impl DrillSummary {
    /// Gentlest turn that produced a success, if any did.
    #[must_use]
    pub fn best_turn(&self) -> Option<SweepPoint> {
        gentlest_success(&self.sweep)
    }
}

pub struct DrillTester {
    viewport: Viewport,
    verbose: bool,
}

impl DrillTester {
    #[must_use]
    pub const fn new(viewport: Viewport, verbose: bool) -> Self {
        Self { viewport, verbose }
    }

    /// Start an exercise for `plan` and `seed`, replay it once for the
    /// determinism fingerprint and sweep turns when asked.
    pub fn run_plan(
        &self,
        plan: &DrillPlan,
        mode: ExerciseMode,
        seed: u64,
    ) -> Result<(Exercise, DrillSummary)> {
        let mut exercise = Exercise::start(mode, plan.settings, self.viewport, seed)
            .with_context(|| format!("starting {mode} exercise for seed {seed}"))?;
        let replay = Exercise::start(mode, plan.settings, self.viewport, seed)
            .with_context(|| format!("replaying {mode} exercise for seed {seed}"))?;

        let fingerprint = scenario_fingerprint(exercise.scenario())?;
        let replay_fingerprint = scenario_fingerprint(replay.scenario())?;

        let sweep = if plan.turn_sweep {
            sweep_turns(&mut exercise)?
        } else {
            Vec::new()
        };

        if self.verbose {
            let meta = exercise.scenario().metadata;
            log::info!(
                "seed {seed}: {:?} after {} attempts, angle {:.1}, dv {:.0} kt, t {:.2} min",
                exercise.scenario().status,
                exercise.scenario().attempts,
                meta.angle,
                meta.speed_difference,
                meta.time_to_crossing
            );
        }

        let summary = DrillSummary {
            mode,
            seed,
            share_code: exercise.share_code(),
            settings: *exercise.settings(),
            scale: exercise.scale(),
            scenario: exercise.scenario().clone(),
            fingerprint,
            replay_fingerprint,
            sweep,
        };
        Ok((exercise, summary))
    }
}

fn scenario_fingerprint(scenario: &Scenario) -> Result<u64> {
    let bytes = serde_json::to_vec(scenario).context("serializing scenario")?;
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&bytes);
    Ok(hasher.finish())
}

/// Evaluate every slider position on aircraft 1 and leave the exercise on
/// the gentlest successful turn, or untouched when none succeeds.
fn sweep_turns(exercise: &mut Exercise) -> Result<Vec<SweepPoint>> {
    let mut sweep = Vec::new();
    for command in TurnCommand::all() {
        exercise.turn_aircraft(AircraftId::FIRST, command.degrees())?;
        sweep.push(SweepPoint {
            degrees: command.degrees(),
            separation_nm: exercise.flown_separation(),
            verdict: exercise.verdict(),
        });
    }
    let chosen = gentlest_success(&sweep).map_or(0, |point| point.degrees);
    exercise.turn_aircraft(AircraftId::FIRST, chosen)?;
    Ok(sweep)
}

fn gentlest_success(sweep: &[SweepPoint]) -> Option<SweepPoint> {
    sweep
        .iter()
        .filter(|point| point.verdict == Verdict::Success)
        .min_by_key(|point| point.degrees.unsigned_abs())
        .copied()
}

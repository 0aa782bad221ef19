use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;
use std::time::{Duration, Instant};

use atcdrill_engine::{
    ExerciseEngine, ExerciseMode, GenerationStatus, HeadingSource, ScoreFilter, ScoreRecord,
    ScoreStorage, Verdict, VerdictTally, Viewport, tally_by_user,
};

use crate::common::scenario::TestScenario;
use crate::logic::drill_tester::{DrillPlan, DrillSummary, DrillTester};
use crate::logic::seeds::SeedInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub share_code: String,
    pub mode: ExerciseMode,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub best_effort_iterations: usize,
    /// Submissions carried the gentlest successful sweep turn rather than
    /// the untouched conflict.
    #[serde(default)]
    pub turned: bool,
    pub verdicts: VerdictTally,
    pub failures: Vec<String>,
    pub iterations: Vec<IterationRecord>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// What one generated exercise looked like once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub seed: u64,
    pub share_code: String,
    pub status: GenerationStatus,
    pub attempts: u32,
    pub speed_difference: f64,
    pub angle: f64,
    pub time_to_crossing: f64,
    /// As-filed separation at closest approach; `None` when the tracks never close.
    pub filed_cpa_nm: Option<f64>,
    pub verdict: Verdict,
    pub separation_nm: f64,
}

/// In-memory score sink shared with the engine.
#[derive(Debug, Clone, Default)]
struct ScoreLedger {
    records: Rc<RefCell<Vec<ScoreRecord>>>,
}

impl ScoreStorage for ScoreLedger {
    type Error = Infallible;

    fn record_score(&self, record: &ScoreRecord) -> Result<(), Self::Error> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

pub struct LogicTester {
    verbose: bool,
    drills: DrillTester,
}

impl LogicTester {
    pub const fn new(viewport: Viewport, verbose: bool) -> Self {
        Self {
            verbose,
            drills: DrillTester::new(viewport, verbose),
        }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[SeedInfo],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (mode: {} seed: {} code: {})",
                    scenario.name.bright_white(),
                    seed.mode(),
                    seed.seed,
                    seed.share_code()
                );
            }
            results.push(self.run_single_scenario(scenario, seed, iterations));
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: &SeedInfo,
        iterations: usize,
    ) -> ScenarioResult {
        let ledger = ScoreLedger::default();
        let engine = ExerciseEngine::new(ledger.clone());
        let run = self.run_drill_iterations(&engine, scenario, seed, iterations);

        let tallies = tally_by_user(ledger.records.borrow().iter(), &ScoreFilter::all());
        let verdicts = tallies.get(scenario.key).copied().unwrap_or_default();

        let average_duration = if run.performance_data.is_empty() {
            Duration::ZERO
        } else {
            run.performance_data.iter().sum::<Duration>()
                / u32::try_from(run.performance_data.len()).unwrap_or(1)
        };
        let best_effort_iterations = run
            .records
            .iter()
            .filter(|record| record.status == GenerationStatus::BestEffort)
            .count();

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed: seed.seed,
            share_code: seed.share_code(),
            mode: seed.mode(),
            passed: run.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: run.successes,
            best_effort_iterations,
            turned: scenario.plan.turn_sweep,
            verdicts,
            failures: run.failures,
            iterations: run.records,
            average_duration,
            performance_data: run.performance_data,
        }
    }

    fn run_drill_iterations(
        &self,
        engine: &ExerciseEngine<ScoreLedger>,
        scenario: &TestScenario,
        seed: &SeedInfo,
        iterations: usize,
    ) -> IterationRun {
        let plan = &scenario.plan;
        let mode = seed.mode();
        let mut run = IterationRun::default();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed
                .seed
                .wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let (exercise, summary) = match self.drills.run_plan(plan, mode, iteration_seed) {
                Ok(outcome) => outcome,
                Err(err) => {
                    run.failures.push(format!(
                        "Iteration {} (seed {iteration_seed}): {err:#}",
                        i + 1
                    ));
                    continue;
                }
            };

            let record = engine.submit(&exercise, scenario.key);
            run.records.push(IterationRecord::new(&summary, &record));

            if let Some(err) = evaluate_expectations(plan, &summary) {
                let meta = summary.scenario.metadata;
                run.failures.push(format!(
                    "Iteration {} ({} seed {}, code {}, {:?} after {} attempts, \
                     angle {:.1}, dv {:.0} kt, t {:.2} min): {}",
                    i + 1,
                    summary.mode,
                    summary.seed,
                    summary.share_code,
                    summary.scenario.status,
                    summary.scenario.attempts,
                    meta.angle,
                    meta.speed_difference,
                    meta.time_to_crossing,
                    err
                ));
                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                }
            } else {
                run.successes += 1;
                let duration = start_time.elapsed();
                run.performance_data.push(duration);

                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) \
                         code:{} verdict:{} sep:{:.2} NM",
                        i + 1,
                        iterations,
                        summary.share_code,
                        record.verdict,
                        record.separation_nm
                    );
                }
            }
        }

        run
    }
}

#[derive(Default)]
struct IterationRun {
    successes: usize,
    failures: Vec<String>,
    records: Vec<IterationRecord>,
    performance_data: Vec<Duration>,
}

impl IterationRecord {
    fn new(summary: &DrillSummary, record: &ScoreRecord) -> Self {
        let scenario = &summary.scenario;
        let filed = scenario.approach(HeadingSource::Filed, summary.scale);
        Self {
            seed: summary.seed,
            share_code: summary.share_code.clone(),
            status: scenario.status,
            attempts: scenario.attempts,
            speed_difference: scenario.metadata.speed_difference,
            angle: scenario.metadata.angle,
            time_to_crossing: scenario.metadata.time_to_crossing,
            filed_cpa_nm: filed.map(|cpa| cpa.distance),
            verdict: record.verdict,
            separation_nm: record.separation_nm,
        }
    }
}

fn evaluate_expectations(plan: &DrillPlan, summary: &DrillSummary) -> Option<String> {
    plan.expectations
        .iter()
        .find_map(|expectation| expectation.evaluate(summary).err())
        .map(|err| format!("{err:#}"))
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::scenario::get_scenario;

    #[test]
    fn smoke_scenario_passes_and_tallies_every_iteration() {
        let tester = LogicTester::new(Viewport::default(), false);
        let scenario = get_scenario("smoke", None).unwrap();
        let seeds = [SeedInfo::from_numeric(11), SeedInfo::from_numeric(12)];
        let results = tester.run_scenario(&scenario, &seeds, 3);

        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.passed, "{:?}", result.failures);
            assert_eq!(result.iterations_run, 3);
            assert_eq!(result.iterations.len(), 3);
            assert_eq!(result.verdicts.submitted, 3);
            assert_eq!(result.successful_iterations, 3);
        }
        assert_eq!(results[0].iterations[0].seed, 11);
        assert_eq!(results[0].iterations[2].seed, 13);
    }

    #[test]
    fn untouched_conflicts_are_scored_as_failures() {
        let tester = LogicTester::new(Viewport::default(), false);
        let scenario = get_scenario("short-crossing", None).unwrap();
        let seeds = [SeedInfo::from_numeric(5)];
        let result = &tester.run_scenario(&scenario, &seeds, 4)[0];
        for iteration in &result.iterations {
            if iteration.status == GenerationStatus::Satisfied {
                assert_eq!(iteration.verdict, Verdict::Fail);
            }
        }
    }

    #[test]
    fn sweep_scenarios_are_flagged_as_turned() {
        let tester = LogicTester::new(Viewport::default(), false);
        let seeds = [SeedInfo::from_numeric(2)];
        let sweep = get_scenario("turn-sweep", None).unwrap();
        assert!(tester.run_scenario(&sweep, &seeds, 1)[0].turned);
        let smoke = get_scenario("smoke", None).unwrap();
        assert!(!tester.run_scenario(&smoke, &seeds, 1)[0].turned);
    }

    #[test]
    fn durations_serialize_as_millis() {
        let result = ScenarioResult {
            scenario_name: "x".into(),
            seed: 1,
            share_code: "PR-ABNUR01".into(),
            mode: ExerciseMode::Practice,
            passed: true,
            iterations_run: 0,
            successful_iterations: 0,
            best_effort_iterations: 0,
            turned: false,
            verdicts: VerdictTally::default(),
            failures: Vec::new(),
            iterations: Vec::new(),
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(3), Duration::from_millis(4)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        assert_eq!(json["performance_data"], serde_json::json!([3, 4]));
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.performance_data.len(), 2);
    }
}

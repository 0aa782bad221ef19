use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use atcdrill_engine::VerdictTally;
use atcdrill_engine::numbers::{percent, usize_to_f64};

use super::ScenarioResult;

fn overall_tally(results: &[ScenarioResult]) -> VerdictTally {
    results
        .iter()
        .fold(VerdictTally::default(), |mut sum, result| {
            sum.merge(&result.verdicts);
            sum
        })
}

const fn verdict_label(result: &ScenarioResult) -> &'static str {
    if result.turned {
        "Verdicts after best turn"
    } else {
        "Untouched verdicts"
    }
}

fn pass_rate(results: &[ScenarioResult]) -> f64 {
    let passed = results.iter().filter(|r| r.passed).count();
    percent(passed, results.len())
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Drill Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "Total scenario runs: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", pass_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} [{} {}]",
            status,
            result.scenario_name.bold(),
            result.mode,
            result.share_code
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful, {} best-effort",
            result.successful_iterations, result.iterations_run, result.best_effort_iterations
        )?;
        let tally = &result.verdicts;
        writeln!(
            out,
            "   {}: {} fail / {} success / {} waste",
            verdict_label(result),
            tally.fail,
            tally.success,
            tally.waste
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let overall = overall_tally(results);
    if overall.submitted > 0 {
        writeln!(out, "{}", "🛩  Verdict Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "==================".yellow())?;
        writeln!(out, "Submitted: {}", overall.submitted)?;
        writeln!(
            out,
            "Fail {:.1}% | Success {:.1}% | Waste {:.1}%",
            overall.fail_percent(),
            overall.success_percent(),
            overall.waste_percent()
        )?;
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }

    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, results)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# ATC Drill Test Results\n")?;
    writeln!(
        out,
        "_Generated {}_\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenario runs**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {}", total_tests - passed_tests)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", pass_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;
    writeln!(
        out,
        "| Status | Scenario | Code | Iterations | Best-effort \
         | Fail | Success | Waste | Avg time |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|---|---|")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(
            out,
            "| {} | {} | {} | {}/{} | {} | {} | {} | {} | {:?} |",
            status,
            result.scenario_name,
            result.share_code,
            result.successful_iterations,
            result.iterations_run,
            result.best_effort_iterations,
            result.verdicts.fail,
            result.verdicts.success,
            result.verdicts.waste,
            result.average_duration
        )?;
    }
    writeln!(out)?;

    let failing: Vec<&ScenarioResult> = results.iter().filter(|r| !r.failures.is_empty()).collect();
    if !failing.is_empty() {
        writeln!(out, "## Failures\n")?;
        for result in failing {
            writeln!(out, "### {} ({})\n", result.scenario_name, result.share_code)?;
            for failure in &result.failures {
                writeln!(out, "- {failure}")?;
            }
            writeln!(out)?;
        }
    }

    Ok(())
}

/// One row per generated exercise.
pub fn generate_csv_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(
        out,
        "scenario,mode,seed,share_code,status,attempts,speed_difference,angle,\
         time_to_crossing,filed_cpa_nm,verdict,separation_nm"
    )?;
    for result in results {
        for row in &result.iterations {
            let status = match row.status {
                atcdrill_engine::GenerationStatus::Satisfied => "satisfied",
                atcdrill_engine::GenerationStatus::BestEffort => "best_effort",
            };
            let filed = row
                .filed_cpa_nm
                .map_or_else(String::new, |nm| format!("{nm:.3}"));
            writeln!(
                out,
                "{},{},{},{},{},{},{:.0},{:.2},{:.3},{},{},{:.3}",
                csv_field(&result.scenario_name),
                result.mode,
                row.seed,
                row.share_code,
                status,
                row.attempts,
                row.speed_difference,
                row.angle,
                row.time_to_crossing,
                filed,
                row.verdict,
                row.separation_nm
            )?;
        }
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Mean best-effort share across runs, for the tester banner.
#[must_use]
pub fn best_effort_share(results: &[ScenarioResult]) -> f64 {
    let iterations: usize = results.iter().map(|r| r.iterations_run).sum();
    if iterations == 0 {
        return 0.0;
    }
    let best_effort: usize = results.iter().map(|r| r.best_effort_iterations).sum();
    usize_to_f64(best_effort) / usize_to_f64(iterations)
}

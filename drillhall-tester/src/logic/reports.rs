use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;
use super::analysis::{AnalysisAggregate, AnalysisRecord};

#[allow(clippy::cast_precision_loss)]
fn success_rate(results: &[ScenarioResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    (passed as f64 / results.len() as f64) * 100.0
}

pub fn generate_console_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
    aggregates: &[AnalysisAggregate],
    total_duration: Duration,
) -> Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(writer, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(writer, "Total scenarios: {total_tests}")?;
    writeln!(writer, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(writer, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(writer, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(writer, "Total time: {total_duration:?}")?;
    writeln!(writer)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            writer,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            writer,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(writer, "   Failures:")?;
            for failure in &result.failures {
                writeln!(writer, "     • {}", failure.red())?;
            }
        }
        writeln!(writer)?;
    }

    if let (Some(fastest), Some(slowest)) = (
        results.iter().min_by_key(|r| r.average_duration),
        results.iter().max_by_key(|r| r.average_duration),
    ) {
        writeln!(writer, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(writer, "{}", "=====================".yellow())?;
        writeln!(
            writer,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            writer,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
        writeln!(writer)?;
    }

    if !aggregates.is_empty() {
        writeln!(writer, "{}", "⚖️  Balance Analysis".bright_magenta().bold())?;
        writeln!(writer, "{}", "===================".magenta())?;
        for aggregate in aggregates {
            writeln!(
                writer,
                "{:<11} runs {:>4} | turns {:>6.1} ±{:>5.1} | loops {:>4.2} | boss {:>5.1}% | collapse {:>5.1}% | defeat {:>5.1}% | halted {:>5.1}%",
                aggregate.strategy.label().bold(),
                aggregate.iterations,
                aggregate.mean_turns,
                aggregate.std_turns,
                aggregate.mean_loops,
                aggregate.boss_reach_pct * 100.0,
                aggregate.collapse_pct * 100.0,
                aggregate.defeat_pct * 100.0,
                aggregate.halted_pct * 100.0
            )?;
            writeln!(
                writer,
                "            rest ratio {:.2} | peak stress {:.1}",
                aggregate.mean_rest_ratio, aggregate.mean_peak_stress
            )?;
            if !aggregate.ranks.is_empty() {
                let ranks = aggregate
                    .ranks
                    .iter()
                    .map(|(rank, count)| format!("{rank}: {count}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(writer, "            ranks {ranks}")?;
            }
        }
    }

    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(writer: &mut W, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    writer: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(writer, "# Drillhall Logic Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();

    writeln!(writer, "## Summary\n")?;
    writeln!(writer, "- **Total scenarios**: {total_tests}")?;
    writeln!(writer, "- **Passed**: {passed_tests}")?;
    writeln!(writer, "- **Failed**: {}", total_tests - passed_tests)?;
    writeln!(writer, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(writer, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(writer, "### {} {} (seed {})\n", status, result.scenario_name, result.seed)?;
        writeln!(
            writer,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(writer, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(writer, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(writer, "  - {failure}")?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn generate_csv_report<W: Write + ?Sized>(writer: &mut W, records: &[AnalysisRecord]) -> Result<()> {
    writeln!(
        writer,
        "strategy,seed,seed_label,result,rank,turns,loops,actions,rests,rejected,encounters,combat_rounds,peak_stress,lowest_health,max_depth"
    )?;
    for record in records {
        let metrics = &record.metrics;
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            record.strategy,
            record.seed_value,
            csv_field(&record.seed_label),
            csv_field(&record.result_label()),
            record.rank.as_deref().unwrap_or(""),
            metrics.turns_played,
            record.loops_cleared,
            metrics.actions_taken,
            metrics.rests_taken,
            metrics.rejected_picks,
            metrics.encounters,
            metrics.combat_rounds,
            metrics.peak_stress,
            metrics.lowest_health,
            metrics.max_depth
        )?;
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

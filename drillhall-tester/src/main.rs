mod common;
mod logic;
mod watch;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::scenario::{get_scenario, list_scenarios};
use common::split_csv;
use drillhall_game::{FileSlots, GameState, MemorySlots, SlotStorage};
use logic::analysis::{analysis_digest, validate_determinism};
use logic::{
    AnalysisAggregate, AnalysisRecord, GameTester, GameplayStrategy, LogicTester, SeedInfo,
    TesterAssets, aggregate_analysis, resolve_seed_inputs, run_analysis,
};
use watch::{WatchConfig, watch_run};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestMode {
    /// Headless scenarios and balance analysis (fast)
    Logic,
    /// Play one run in real time, combat ticking on the clock
    Watch,
}

#[derive(Debug, Parser)]
#[command(name = "drillhall-tester", version = "0.1.0")]
#[command(about = "Automated play-testing and balance analysis for the Drillhall engine")]
struct Args {
    /// Test mode: logic (headless) or watch (real time)
    #[arg(long, value_enum, default_value_t = TestMode::Logic)]
    mode: TestMode,

    /// Scenarios to run (comma-separated, `all` for every scenario)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated; integers, 0x hex, a..b ranges, phrase:<text>)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario and seed
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Turn cap for analysis and watch runs
    #[arg(long, default_value_t = 400)]
    max_turns: u32,

    /// Strategy played in watch mode
    #[arg(long, value_enum, default_value_t = GameplayStrategy::Balanced)]
    strategy: GameplayStrategy,

    /// Milliseconds between combat exchanges in watch mode (defaults to the rules table)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Milliseconds between training turns in watch mode
    #[arg(long, default_value_t = 250)]
    turn_delay_ms: u64,

    /// Directory whose actions/events/bosses/rules JSON override the embedded assets
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Persist watch-mode records as JSON slots in this directory
    #[arg(long)]
    records_dir: Option<PathBuf>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let assets = Arc::new(load_assets(&args)?);
    let seed_infos = resolve_seed_inputs(&split_csv(&args.seeds))?;

    if args.mode == TestMode::Watch {
        return run_watch(&args, &assets, &seed_infos).await;
    }

    let game_tester = GameTester::new(Arc::clone(&assets), args.verbose);
    let scenarios = expand_scenarios(&args.scenarios);
    let logic_seeds: Vec<u64> = seed_infos.iter().map(|s| s.seed).collect();

    let all_results = run_logic_scenarios(&args, &scenarios, &logic_seeds, &game_tester);

    let (analysis_records, analysis_aggregates) =
        gather_analysis(&args, &game_tester, &seed_infos)?;

    write_reports(
        &args,
        &all_results,
        analysis_records.as_deref(),
        analysis_aggregates.as_deref(),
        start_time,
    )?;

    if let Some(records) = analysis_records.as_deref() {
        validate_determinism(&game_tester, records, args.max_turns)?;
        log::info!("analysis digest {}", analysis_digest(records));
    }

    if all_results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn load_assets(args: &Args) -> Result<TesterAssets> {
    let assets = match &args.data_dir {
        Some(dir) => TesterAssets::load_dir(dir)
            .with_context(|| format!("failed to load assets from {}", dir.display()))?,
        None => TesterAssets::load_default().context("embedded assets are invalid")?,
    };
    log::info!("ruleset fingerprint {:016x}", assets.fingerprint());
    Ok(assets)
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎖️  Drillhall Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for (key, _) in list_scenarios() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    logic_seeds: &[u64],
    game_tester: &GameTester,
) -> Vec<logic::ScenarioResult> {
    let mut results: Vec<logic::ScenarioResult> = Vec::new();
    if args.mode != TestMode::Logic {
        return results;
    }

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(game_tester.clone());

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            results.extend(logic_tester.run_scenario(&scenario, logic_seeds, args.iterations));
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

type AnalysisSummary = (Option<Vec<AnalysisRecord>>, Option<Vec<AnalysisAggregate>>);

fn gather_analysis(
    args: &Args,
    game_tester: &GameTester,
    seed_infos: &[SeedInfo],
) -> Result<AnalysisSummary> {
    let require_analysis =
        args.mode == TestMode::Logic && matches!(args.report.as_str(), "console" | "csv");
    if !require_analysis {
        return Ok((None, None));
    }

    println!("{}", "⚖️  Running Balance Analysis".bright_magenta().bold());
    let records = run_analysis(game_tester, seed_infos, args.iterations, args.max_turns);
    let aggregates = aggregate_analysis(&records);
    Ok((Some(records), Some(aggregates)))
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    analysis_records: Option<&[AnalysisRecord]>,
    analysis_aggregates: Option<&[AnalysisAggregate]>,
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Drillhall Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        "csv" => {
            if let Some(records) = analysis_records {
                logic::reports::generate_csv_report(&mut output_target, records)?;
            } else {
                writeln!(&mut output_target, "[]")?;
            }
        }
        _ => {
            let duration = start_time.elapsed();
            if results.is_empty() && analysis_aggregates.is_none() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    analysis_aggregates.unwrap_or_default(),
                    duration,
                )?;
            }
        }
    }

    // json and csv stay machine-readable
    if matches!(args.report.as_str(), "console" | "markdown") {
        let duration = start_time.elapsed();
        writeln!(&mut output_target)?;
        writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    }
    output_target.flush_inner()?;
    Ok(())
}

async fn run_watch(args: &Args, assets: &TesterAssets, seed_infos: &[SeedInfo]) -> Result<()> {
    let seed = seed_infos.first().map_or(logic::seeds::DEFAULT_SEED, |info| info.seed);
    if seed_infos.len() > 1 {
        log::warn!("watch mode plays one run; using seed {seed}");
    }
    match &args.records_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            watch_with_storage(args, assets, seed, FileSlots::new(dir)).await
        }
        None => watch_with_storage(args, assets, seed, MemorySlots::new()).await,
    }
}

async fn watch_with_storage<S: SlotStorage>(
    args: &Args,
    assets: &TesterAssets,
    seed: u64,
    storage: S,
) -> Result<()> {
    let mut engine = assets.engine(GameState::fresh(assets.rules(), seed), storage);
    let config = WatchConfig {
        max_turns: args.max_turns,
        turn_delay: Duration::from_millis(args.turn_delay_ms),
        combat_tick: args.tick_ms.map_or_else(|| engine.combat_tick(), Duration::from_millis),
    };
    println!(
        "{} seed {} | strategy {} | {} earlier runs on record",
        "👀 Watching".bright_blue().bold(),
        seed,
        args.strategy,
        engine.records().len()
    );

    let mut policy = args.strategy.create_policy(seed);
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let report = watch_run(&mut engine, policy.as_mut(), config, &mut output_target).await?;
    output_target.flush_inner()?;
    log::info!(
        "watch finished at turn {} after {} loops",
        report.turns,
        report.loops_cleared
    );
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::game_tester::RunMetrics;
    use crate::logic::ScenarioResult;
    use drillhall_game::{RECORDS_SLOT, Record};

    fn base_args() -> Args {
        Args {
            mode: TestMode::Logic,
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            max_turns: 60,
            strategy: GameplayStrategy::Balanced,
            tick_ms: Some(0),
            turn_delay_ms: 0,
            data_dir: None,
            records_dir: None,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("drillhall-{}-{name}", std::process::id()))
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Smoke".to_string(),
            seed: 1337,
            passed,
            iterations_run: 3,
            successful_iterations: if passed { 3 } else { 2 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["failure".to_string()]
            },
            average_duration: Duration::from_millis(10),
            performance_data: vec![Duration::from_millis(10)],
        }
    }

    fn sample_record() -> AnalysisRecord {
        AnalysisRecord {
            strategy: GameplayStrategy::Cautious,
            seed_label: "42".to_string(),
            seed_value: 42,
            result: None,
            rank: None,
            loops_cleared: 0,
            metrics: RunMetrics {
                turns_played: 60,
                ..RunMetrics::default()
            },
        }
    }

    fn tester() -> GameTester {
        GameTester::new(Arc::new(TesterAssets::load_default().unwrap()), false)
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("smoke,all");
        assert_eq!(expanded[0], "smoke");
        assert_eq!(expanded.len(), list_scenarios().len());
        assert!(expanded.contains(&"combat-cadence".to_string()));
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("records,smoke");
        assert_eq!(expanded, vec!["records".to_string(), "smoke".to_string()]);
    }

    #[test]
    fn run_logic_scenarios_skips_in_watch_mode() {
        let args = Args {
            mode: TestMode::Watch,
            ..base_args()
        };
        let results = run_logic_scenarios(&args, &["smoke".to_string()], &[42], &tester());
        assert!(results.is_empty());
    }

    #[test]
    fn run_logic_scenarios_runs_known_and_skips_unknown() {
        let args = base_args();
        let names = ["smoke".to_string(), "weather".to_string()];
        let results = run_logic_scenarios(&args, &names, &[42, 43], &tester());
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed));
    }

    #[test]
    fn gather_analysis_only_for_console_and_csv() {
        let seeds = vec![SeedInfo::from_numeric(42)];
        let (records, aggregates) = gather_analysis(&base_args(), &tester(), &seeds).unwrap();
        assert!(records.is_none() && aggregates.is_none());

        let args = Args {
            report: "csv".to_string(),
            ..base_args()
        };
        let (records, aggregates) = gather_analysis(&args, &tester(), &seeds).unwrap();
        assert_eq!(records.unwrap().len(), GameplayStrategy::ALL.len());
        assert_eq!(aggregates.unwrap().len(), GameplayStrategy::ALL.len());
    }

    #[test]
    fn write_reports_emits_empty_json_array() {
        let temp = temp_file("empty.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], None, None, Instant::now()).unwrap();
        let content = std::fs::read_to_string(&temp).unwrap();
        assert_eq!(content.trim(), "[]");
        let _ = std::fs::remove_file(temp);
    }

    #[test]
    fn write_reports_emits_json_for_results() {
        let temp = temp_file("full.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(false)], None, None, Instant::now()).unwrap();
        let content = std::fs::read_to_string(&temp).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[0]["passed"], false);
        let _ = std::fs::remove_file(temp);
    }

    #[test]
    fn write_reports_markdown_empty_results() {
        let temp = temp_file("empty.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], None, None, Instant::now()).unwrap();
        let content = std::fs::read_to_string(&temp).unwrap();
        assert!(content.contains("No scenarios executed"));
        assert!(content.contains("Total time"));
        let _ = std::fs::remove_file(temp);
    }

    #[test]
    fn write_reports_emits_csv_report() {
        let temp = temp_file("report.csv");
        let args = Args {
            report: "csv".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Some(&[sample_record()]), None, Instant::now()).unwrap();
        let content = std::fs::read_to_string(&temp).unwrap();
        assert!(content.starts_with("strategy,seed,seed_label,result"));
        assert!(content.contains("Cautious,42,42,Halted,,60"));
        let _ = std::fs::remove_file(temp);
    }

    #[test]
    fn write_reports_console_with_analysis() {
        colored::control::set_override(false);
        let temp = temp_file("console.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        let aggregates = aggregate_analysis(&[sample_record()]);
        write_reports(
            &args,
            &[sample_result(true)],
            None,
            Some(&aggregates),
            Instant::now(),
        )
        .unwrap();
        let content = std::fs::read_to_string(&temp).unwrap();
        assert!(content.contains("Balance Analysis"));
        assert!(content.contains("Cautious"));
        let _ = std::fs::remove_file(temp);
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let temp = temp_file("scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(&temp).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("deterministic-replay"));
        let _ = std::fs::remove_file(temp);
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn watch_persists_records_to_the_slot_directory() {
        let dir = temp_file("records");
        let out = temp_file("watch.txt");
        let _ = std::fs::remove_dir_all(&dir);
        let args = Args {
            mode: TestMode::Watch,
            max_turns: 500,
            strategy: GameplayStrategy::Aggressive,
            records_dir: Some(dir.clone()),
            output: Some(out.clone()),
            ..base_args()
        };
        let assets = TesterAssets::load_default().unwrap();
        let seeds = vec![SeedInfo::from_numeric(3)];
        tokio_test::block_on(run_watch(&args, &assets, &seeds)).unwrap();

        let slots = FileSlots::new(&dir);
        let stored = slots.read_slot(RECORDS_SLOT).unwrap();
        let transcript = std::fs::read_to_string(&out).unwrap();
        if transcript.contains("Stopped at turn cap") {
            assert!(stored.is_none());
        } else {
            let records: Vec<Record> = serde_json::from_str(&stored.unwrap()).unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].seed, 3);
        }
        let _ = std::fs::remove_dir_all(dir);
        let _ = std::fs::remove_file(out);
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}

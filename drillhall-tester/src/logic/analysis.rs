//! Seeded multi-run balance analysis across every built-in strategy.
use anyhow::{Result, bail};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::logic::game_tester::{GameTester, RunMetrics, SimulationPlan};
use crate::logic::policy::GameplayStrategy;
use crate::logic::seeds::SeedInfo;
use drillhall_game::RunResult;

/// Outcome of one analysed run.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub strategy: GameplayStrategy,
    pub seed_label: String,
    pub seed_value: u64,
    pub result: Option<RunResult>,
    pub rank: Option<String>,
    pub loops_cleared: u32,
    pub metrics: RunMetrics,
}

impl AnalysisRecord {
    #[must_use]
    pub fn result_label(&self) -> String {
        self.result
            .as_ref()
            .map_or_else(|| "Halted".to_string(), ToString::to_string)
    }
}

/// Per-strategy summary over every analysed seed.
#[derive(Debug, Clone)]
pub struct AnalysisAggregate {
    pub strategy: GameplayStrategy,
    pub iterations: usize,
    pub mean_turns: f64,
    pub std_turns: f64,
    pub mean_loops: f64,
    pub boss_reach_pct: f64,
    pub collapse_pct: f64,
    pub defeat_pct: f64,
    pub halted_pct: f64,
    pub mean_rest_ratio: f64,
    pub mean_peak_stress: f64,
    pub ranks: BTreeMap<String, usize>,
}

pub fn run_analysis(
    tester: &GameTester,
    seeds: &[SeedInfo],
    iterations: usize,
    max_turns: u32,
) -> Vec<AnalysisRecord> {
    let iterations = iterations.max(1);
    let mut records =
        Vec::with_capacity(seeds.len() * GameplayStrategy::ALL.len() * iterations);

    for strategy in GameplayStrategy::ALL {
        let plan = SimulationPlan::new(strategy).with_max_turns(max_turns);
        for seed in seeds {
            for iteration in 0..iterations {
                let iteration_offset = u64::try_from(iteration).unwrap_or(0);
                let iteration_seed = seed.seed.wrapping_add(iteration_offset);
                let summary = tester.run_plan(&plan, iteration_seed);
                records.push(AnalysisRecord {
                    strategy,
                    seed_label: seed.label(),
                    seed_value: iteration_seed,
                    rank: summary.record.as_ref().map(|record| record.rank.clone()),
                    loops_cleared: summary.final_state.loop_count,
                    result: summary.result,
                    metrics: summary.metrics,
                });
            }
        }
    }

    records
}

pub fn aggregate_analysis(records: &[AnalysisRecord]) -> Vec<AnalysisAggregate> {
    let mut builders: BTreeMap<GameplayStrategy, AggregateBuilder> = BTreeMap::new();
    for record in records {
        builders
            .entry(record.strategy)
            .or_insert_with(|| AggregateBuilder::new(record.strategy))
            .ingest(record);
    }
    builders.into_values().map(AggregateBuilder::finish).collect()
}

/// Re-run a sample of records and fail if any diverges.
pub fn validate_determinism(tester: &GameTester, records: &[AnalysisRecord], max_turns: u32) -> Result<()> {
    for record in records.iter().step_by(records.len().div_ceil(8).max(1)) {
        let plan = SimulationPlan::new(record.strategy).with_max_turns(max_turns);
        let replay = tester.run_plan(&plan, record.seed_value);
        if replay.metrics != record.metrics || replay.result != record.result {
            bail!(
                "{} seed {} diverged on replay: {:?} vs {:?}",
                record.strategy,
                record.seed_value,
                record.result,
                replay.result
            );
        }
    }
    Ok(())
}

/// Stable digest of the analysis rows, for comparing balance passes.
#[must_use]
pub fn analysis_digest(records: &[AnalysisRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(
            format!(
                "{}|{}|{}|{}|{}\n",
                record.strategy,
                record.seed_value,
                record.result_label(),
                record.metrics.turns_played,
                record.loops_cleared
            )
            .as_bytes(),
        );
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[derive(Debug, Clone)]
struct AggregateBuilder {
    strategy: GameplayStrategy,
    stats_turns: RunningStats,
    iterations: u32,
    loops_sum: u32,
    boss_reached: u32,
    collapses: u32,
    defeats: u32,
    halted: u32,
    rest_ratio_sum: f64,
    peak_stress_sum: f64,
    ranks: BTreeMap<String, usize>,
}

impl AggregateBuilder {
    fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            stats_turns: RunningStats::default(),
            iterations: 0,
            loops_sum: 0,
            boss_reached: 0,
            collapses: 0,
            defeats: 0,
            halted: 0,
            rest_ratio_sum: 0.0,
            peak_stress_sum: 0.0,
            ranks: BTreeMap::new(),
        }
    }

    fn ingest(&mut self, record: &AnalysisRecord) {
        let metrics = &record.metrics;
        self.iterations += 1;
        self.stats_turns.add(f64::from(metrics.turns_played));
        self.loops_sum = self.loops_sum.saturating_add(record.loops_cleared);
        if metrics.encounters > 0 {
            self.boss_reached += 1;
        }
        match &record.result {
            Some(RunResult::Collapsed) => self.collapses += 1,
            Some(RunResult::DefeatedBy { .. }) => self.defeats += 1,
            Some(RunResult::Cleared) => {}
            None => self.halted += 1,
        }
        if metrics.turns_played > 0 {
            self.rest_ratio_sum += f64::from(metrics.rests_taken + metrics.rejected_picks)
                / f64::from(metrics.turns_played);
        }
        self.peak_stress_sum += f64::from(metrics.peak_stress);
        if let Some(rank) = &record.rank {
            *self.ranks.entry(rank.clone()).or_default() += 1;
        }
    }

    fn finish(self) -> AnalysisAggregate {
        let denom = f64::from(self.iterations.max(1));
        AnalysisAggregate {
            strategy: self.strategy,
            iterations: usize::try_from(self.iterations).unwrap_or(usize::MAX),
            mean_turns: self.stats_turns.mean(),
            std_turns: self.stats_turns.std_dev(),
            mean_loops: f64::from(self.loops_sum) / denom,
            boss_reach_pct: f64::from(self.boss_reached) / denom,
            collapse_pct: f64::from(self.collapses) / denom,
            defeat_pct: f64::from(self.defeats) / denom,
            halted_pct: f64::from(self.halted) / denom,
            mean_rest_ratio: self.rest_ratio_sum / denom,
            mean_peak_stress: self.peak_stress_sum / denom,
            ranks: self.ranks,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct RunningStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / f64::from(self.count);
        self.m2 += delta * (value - self.mean);
    }

    const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    fn std_dev(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / f64::from(self.count - 1)).sqrt()
        } else {
            0.0
        }
    }
}

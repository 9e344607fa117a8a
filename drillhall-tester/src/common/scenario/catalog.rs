use anyhow::{Context, Result, ensure};
use std::sync::Arc;

use crate::common::scenario::TestScenario;
use crate::logic::{GameTester, GameplayStrategy, SimulationPlan, SimulationSummary};
use drillhall_game::{GameState, RunResult};

const CATALOG_SIM_TURNS: u32 = 160;

pub fn catalog_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::simulation(
            "Stat Bounds",
            SimulationPlan::new(GameplayStrategy::Random)
                .with_max_turns(CATALOG_SIM_TURNS)
                .with_expectation(stat_bounds_expectation),
        ),
        TestScenario::simulation(
            "Combat Cadence",
            SimulationPlan::new(GameplayStrategy::Cautious)
                .with_max_turns(CATALOG_SIM_TURNS)
                .with_expectation(combat_cadence_expectation),
        ),
        TestScenario::simulation(
            "Record Integrity",
            SimulationPlan::new(GameplayStrategy::Aggressive)
                .with_max_turns(CATALOG_SIM_TURNS)
                .with_expectation(record_integrity_expectation),
        ),
        TestScenario::simulation(
            "Requirement Gate",
            SimulationPlan::new(GameplayStrategy::Random)
                .with_max_turns(40)
                .with_setup(drained_setup)
                .with_expectation(requirement_gate_expectation),
        ),
        TestScenario::simulation(
            "Collapse Handling",
            SimulationPlan::new(GameplayStrategy::Aggressive)
                .with_max_turns(40)
                .with_setup(fragile_setup)
                .with_expectation(collapse_expectation)
                .with_expectation(record_integrity_expectation),
        ),
        TestScenario::simulation(
            "Deterministic Replay",
            replay_plan().with_expectation(deterministic_replay_expectation),
        ),
    ]
}

pub fn find_catalog_scenario(name: &str) -> Option<TestScenario> {
    catalog_scenarios()
        .into_iter()
        .find(|scenario| scenario.name == name)
}

fn replay_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Random).with_max_turns(120)
}

fn drained_setup(state: &mut GameState) {
    state.resources.ap = 0;
}

fn fragile_setup(state: &mut GameState) {
    state.character.health = 1;
    state.resources.ap = state.resources.max_ap;
}

fn stat_bounds_expectation(summary: &SimulationSummary) -> Result<()> {
    let state = &summary.final_state;
    ensure!(
        state.character.within_bounds(None),
        "Character left its bounds: hp {} stress {} depth {}",
        state.character.health,
        state.character.stress,
        state.character.depth
    );
    ensure!(
        (0..=state.resources.max_ap).contains(&state.resources.ap),
        "AP {} outside 0..={}",
        state.resources.ap,
        state.resources.max_ap
    );
    ensure!(summary.metrics.peak_stress <= 100, "Stress peaked above 100");
    ensure!(summary.metrics.lowest_health >= 0, "Health dipped below 0");
    Ok(())
}

fn combat_cadence_expectation(summary: &SimulationSummary) -> Result<()> {
    let interval = summary.assets.rules().combat.interval_turns;
    for turn in summary.turns.iter().filter(|turn| turn.opened_combat()) {
        ensure!(
            turn.turn.checked_rem(interval) == Some(0),
            "Encounter opened on turn {}, not a multiple of {interval}",
            turn.turn
        );
    }
    ensure!(
        summary.metrics.bosses_cleared == summary.final_state.loop_count,
        "Loop count {} does not match {} cleared bosses",
        summary.final_state.loop_count,
        summary.metrics.bosses_cleared
    );
    Ok(())
}

fn record_integrity_expectation(summary: &SimulationSummary) -> Result<()> {
    let Some(record) = &summary.record else {
        ensure!(!summary.game_ended, "Ended run wrote no record");
        return Ok(());
    };
    ensure!(record.seed == summary.seed, "Record seed mismatch");
    ensure!(
        record.loops_cleared == summary.final_state.loop_count,
        "Record loops {} vs state {}",
        record.loops_cleared,
        summary.final_state.loop_count
    );
    ensure!(
        record.final_stats == summary.final_state.character.stats,
        "Record stats differ from final state"
    );
    ensure!(
        (record.rank == "F") == (record.result == RunResult::Collapsed),
        "Rank {} inconsistent with {}",
        record.rank,
        record.result
    );
    ensure!(
        summary.turns.last().is_some_and(|turn| turn.game_ended),
        "Play continued after the run ended"
    );
    Ok(())
}

fn requirement_gate_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.rejected_picks == 0,
        "Policy picked {} blocked actions",
        summary.metrics.rejected_picks
    );
    let first = summary.turns.first().context("No turns played")?;
    ensure!(
        first.outcome.is_applied(),
        "Drained opening turn was not applied: {:?}",
        first.outcome
    );
    Ok(())
}

fn collapse_expectation(summary: &SimulationSummary) -> Result<()> {
    if summary.result == Some(RunResult::Collapsed) {
        ensure!(
            summary.final_state.character.health == 0,
            "Collapsed with {} health",
            summary.final_state.character.health
        );
        ensure!(summary.final_state.game_over, "Collapse did not end the run");
    }
    Ok(())
}

fn deterministic_replay_expectation(summary: &SimulationSummary) -> Result<()> {
    let replay =
        GameTester::new(Arc::clone(&summary.assets), false).run_plan(&replay_plan(), summary.seed);
    ensure!(
        replay.final_state == summary.final_state,
        "Replay of seed {} diverged at turn {} vs {}",
        summary.seed,
        replay.final_state.turn,
        summary.final_state.turn
    );
    ensure!(replay.metrics == summary.metrics, "Replay metrics diverged");
    Ok(())
}

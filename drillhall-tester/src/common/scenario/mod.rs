pub mod catalog;

use anyhow::{Result, ensure};

use crate::logic::{GameplayStrategy, SimulationPlan, SimulationSummary};
use catalog::find_catalog_scenario;

/// Turn cap for strategy scenarios.
pub const STRATEGY_SIM_TURNS: u32 = 200;

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

fn survival_expectation(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.metrics.turns_played > 0,
        "Run should play at least one turn"
    );
    ensure!(
        summary.game_ended == summary.record.is_some(),
        "Ended runs write exactly one record"
    );
    Ok(())
}

fn smoke_scenario() -> TestScenario {
    TestScenario::simulation(
        "Smoke Test",
        SimulationPlan::new(GameplayStrategy::Balanced)
            .with_max_turns(40)
            .with_expectation(survival_expectation),
    )
}

fn strategy_scenario(name: &'static str, strategy: GameplayStrategy) -> TestScenario {
    TestScenario::simulation(
        name,
        SimulationPlan::new(strategy)
            .with_max_turns(STRATEGY_SIM_TURNS)
            .with_expectation(survival_expectation),
    )
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(smoke_scenario()),
        "cautious-strategy" | "cautious" => Some(strategy_scenario(
            "Cautious Strategy Test",
            GameplayStrategy::Cautious,
        )),
        "balanced-strategy" | "balanced" => Some(strategy_scenario(
            "Balanced Strategy Test",
            GameplayStrategy::Balanced,
        )),
        "aggressive-strategy" | "aggressive" => Some(strategy_scenario(
            "Aggressive Strategy Test",
            GameplayStrategy::Aggressive,
        )),
        "random-strategy" | "random" => Some(strategy_scenario(
            "Random Strategy Test",
            GameplayStrategy::Random,
        )),
        "stat-bounds" | "bounds" => find_catalog_scenario("Stat Bounds"),
        "combat-cadence" | "cadence" => find_catalog_scenario("Combat Cadence"),
        "record-integrity" | "records" => find_catalog_scenario("Record Integrity"),
        "requirement-gate" | "requirements" => find_catalog_scenario("Requirement Gate"),
        "collapse-handling" | "collapse" => find_catalog_scenario("Collapse Handling"),
        "deterministic-replay" | "deterministic" => {
            find_catalog_scenario("Deterministic Replay")
        }
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("cautious-strategy", "Cautious Strategy Test"),
        ("balanced-strategy", "Balanced Strategy Test"),
        ("aggressive-strategy", "Aggressive Strategy Test"),
        ("random-strategy", "Random Strategy Test"),
        ("stat-bounds", "Stat Bounds"),
        ("combat-cadence", "Combat Cadence"),
        ("record-integrity", "Record Integrity"),
        ("requirement-gate", "Requirement Gate"),
        ("collapse-handling", "Collapse Handling"),
        ("deterministic-replay", "Deterministic Replay"),
    ]
}

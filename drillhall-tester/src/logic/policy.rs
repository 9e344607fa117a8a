use std::fmt;

use clap::ValueEnum;
use drillhall_game::{ActionOption, GameState, Stat};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Command chosen by a [`PlayerPolicy`] for the current training turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyChoice {
    Perform(String),
    Rest,
}

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub choice: PolicyChoice,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn perform(action_id: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            choice: PolicyChoice::Perform(action_id.into()),
            rationale: Some(rationale.into()),
        }
    }

    #[must_use]
    pub fn rest(rationale: impl Into<String>) -> Self {
        Self {
            choice: PolicyChoice::Rest,
            rationale: Some(rationale.into()),
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Pick the next training command given the live state and the action menu.
    fn pick(&mut self, state: &GameState, options: &[ActionOption<'_>]) -> PolicyDecision;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum GameplayStrategy {
    Cautious,
    Balanced,
    Aggressive,
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 4] = [
        Self::Cautious,
        Self::Balanced,
        Self::Aggressive,
        Self::Random,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cautious => "Cautious",
            Self::Balanced => "Balanced",
            Self::Aggressive => "Aggressive",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Cautious => Box::new(CautiousPolicy),
            Self::Balanced => Box::new(BalancedPolicy),
            Self::Aggressive => Box::new(AggressivePolicy),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct CautiousPolicy;
struct BalancedPolicy;
struct AggressivePolicy;

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

/// Health as a percentage of maximum.
fn health_pct(state: &GameState) -> i32 {
    let max = state.character.max_health.max(1);
    state.character.health.saturating_mul(100) / max
}

/// Sum of the positive stat shifts an action promises, resistance counted as a drop.
fn action_value(option: &ActionOption<'_>) -> i32 {
    option
        .action
        .stat_deltas
        .iter()
        .map(|(stat, delta)| match stat {
            Stat::Resistance => -delta,
            _ => *delta,
        })
        .sum()
}

fn available<'a, 'o>(options: &'o [ActionOption<'a>]) -> impl Iterator<Item = &'o ActionOption<'a>> {
    options.iter().filter(|option| option.is_available())
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "Cautious"
    }

    fn pick(&mut self, state: &GameState, options: &[ActionOption<'_>]) -> PolicyDecision {
        if health_pct(state) < 50 || state.character.stress >= 60 {
            return PolicyDecision::rest(format!(
                "hp {}% stress {}",
                health_pct(state),
                state.character.stress
            ));
        }
        available(options)
            .filter(|option| option.action.hp_cost_max < state.character.health / 2)
            .max_by_key(|option| (option.success_rate, -option.action.hp_cost_max))
            .map_or_else(
                || PolicyDecision::rest("nothing safe to attempt"),
                |option| {
                    PolicyDecision::perform(
                        option.action.id.clone(),
                        format!("rate {}%", option.success_rate),
                    )
                },
            )
    }
}

impl PlayerPolicy for BalancedPolicy {
    fn name(&self) -> &'static str {
        "Balanced"
    }

    fn pick(&mut self, state: &GameState, options: &[ActionOption<'_>]) -> PolicyDecision {
        if health_pct(state) < 35 || state.character.stress >= 75 {
            return PolicyDecision::rest(format!(
                "hp {}% stress {}",
                health_pct(state),
                state.character.stress
            ));
        }
        available(options)
            .filter(|option| option.action.hp_cost_max < state.character.health)
            .max_by_key(|option| action_value(option) * i32::from(option.success_rate))
            .map_or_else(
                || PolicyDecision::rest("no affordable action"),
                |option| {
                    PolicyDecision::perform(
                        option.action.id.clone(),
                        format!("value {} at {}%", action_value(option), option.success_rate),
                    )
                },
            )
    }
}

impl PlayerPolicy for AggressivePolicy {
    fn name(&self) -> &'static str {
        "Aggressive"
    }

    fn pick(&mut self, _state: &GameState, options: &[ActionOption<'_>]) -> PolicyDecision {
        available(options)
            .max_by_key(|option| (action_value(option), option.action.hp_cost_max))
            .map_or_else(
                || PolicyDecision::rest("forced rest"),
                |option| {
                    PolicyDecision::perform(
                        option.action.id.clone(),
                        format!("value {}", action_value(option)),
                    )
                },
            )
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn pick(&mut self, _state: &GameState, options: &[ActionOption<'_>]) -> PolicyDecision {
        let candidates: Vec<&ActionOption<'_>> = available(options).collect();
        // one extra slot stands for resting
        let pick = self.rng.gen_range(0..=candidates.len());
        candidates.get(pick).map_or_else(
            || PolicyDecision::rest("random rest"),
            |option| PolicyDecision::perform(option.action.id.clone(), format!("slot {pick}")),
        )
    }
}

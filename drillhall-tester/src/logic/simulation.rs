use drillhall_game::{
    CombatTicker, GamePhase, GameState, Outcome, Record, RunResult, SlotStorage, TurnEngine,
};

use crate::logic::policy::{GameplayStrategy, PlayerPolicy, PolicyChoice};

/// Hard stop for a single encounter when fast-forwarding.
pub const MAX_COMBAT_ROUNDS: usize = 1_000;

/// Configuration for a simulation session.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub max_turns: u32,
}

impl SimulationConfig {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy, seed: u64) -> Self {
        Self {
            seed,
            strategy,
            max_turns: 400,
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }
}

/// Snapshot of one policy decision.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub turn: u32,
    pub choice: PolicyChoice,
    pub policy_name: String,
    pub rationale: Option<String>,
}

/// Result of advancing the simulation by one training command.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub turn: u32,
    pub decision: DecisionRecord,
    pub outcome: Outcome,
    /// The policy's pick was rejected and the turn was spent resting.
    pub fell_back: bool,
    /// Exchanges fought when the command opened an encounter.
    pub combat: Vec<Outcome>,
    pub game_ended: bool,
}

impl TurnOutcome {
    #[must_use]
    pub const fn opened_combat(&self) -> bool {
        matches!(self.outcome, Outcome::PhaseChanged(GamePhase::Combat))
    }

    #[must_use]
    pub fn boss_cleared(&self) -> bool {
        self.combat.iter().any(|outcome| {
            matches!(
                outcome,
                Outcome::PhaseChanged(GamePhase::Training) | Outcome::RunEnded(RunResult::Cleared)
            )
        })
    }
}

/// Headless driver pairing a turn engine with a fast-forwarding combat ticker.
#[derive(Debug)]
pub struct SimulationSession<S: SlotStorage> {
    config: SimulationConfig,
    engine: TurnEngine<S>,
    ticker: CombatTicker,
}

impl<S: SlotStorage> SimulationSession<S> {
    pub fn new(config: SimulationConfig, engine: TurnEngine<S>) -> Self {
        let ticker = CombatTicker::for_engine(&engine);
        Self {
            config,
            engine,
            ticker,
        }
    }

    pub const fn engine(&self) -> &TurnEngine<S> {
        &self.engine
    }

    pub const fn state(&self) -> &GameState {
        self.engine.state()
    }

    /// True once the run ended or the turn cap was reached.
    pub const fn finished(&self) -> bool {
        self.engine.is_game_over() || self.engine.turn() > self.config.max_turns
    }

    /// Record written for this run, if it has ended.
    pub fn final_record(&self) -> Option<&Record> {
        if self.engine.is_game_over() {
            self.engine.records().last()
        } else {
            None
        }
    }

    pub fn into_engine(self) -> TurnEngine<S> {
        self.engine
    }

    /// Ask the policy for one command, apply it and settle any combat it opens.
    pub fn advance(&mut self, policy: &mut dyn PlayerPolicy) -> TurnOutcome {
        let turn = self.engine.turn();
        let decision = {
            let options = self.engine.available_actions();
            policy.pick(self.engine.state(), &options)
        };

        let outcome = match &decision.choice {
            PolicyChoice::Perform(action_id) => self.engine.perform_action(action_id),
            PolicyChoice::Rest => self.engine.rest(),
        };
        let (outcome, fell_back) = match outcome {
            // a blocked pick still has to move the clock
            Outcome::Rejected(reason) => {
                log::debug!("turn {turn}: {} rejected ({reason}); resting", policy.name());
                (self.engine.rest(), true)
            }
            other => (other, false),
        };

        let combat = if self.engine.combat_pending() {
            self.ticker.run_until_settled(&mut self.engine, MAX_COMBAT_ROUNDS)
        } else {
            Vec::new()
        };

        TurnOutcome {
            turn,
            decision: DecisionRecord {
                turn,
                choice: decision.choice,
                policy_name: policy.name().to_string(),
                rationale: decision.rationale,
            },
            outcome,
            fell_back,
            combat,
            game_ended: self.engine.is_game_over(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillhall_game::{Catalogs, MemorySlots, RulesConfig};

    fn session(strategy: GameplayStrategy, seed: u64) -> SimulationSession<MemorySlots> {
        let engine = TurnEngine::new(
            Catalogs::load_from_static().unwrap(),
            RulesConfig::default(),
            MemorySlots::new(),
            seed,
        );
        SimulationSession::new(SimulationConfig::new(strategy, seed), engine)
    }

    #[test]
    fn every_advance_moves_the_clock_or_ends_the_run() {
        let mut session = session(GameplayStrategy::Aggressive, 21);
        let mut policy = GameplayStrategy::Aggressive.create_policy(21);
        for _ in 0..30 {
            if session.finished() {
                break;
            }
            let before = session.engine().turn();
            let outcome = session.advance(policy.as_mut());
            assert!(outcome.game_ended || session.engine().turn() == before + 1);
            assert!(outcome.outcome.is_applied());
        }
    }

    #[test]
    fn combat_is_settled_within_the_same_step() {
        let mut session = session(GameplayStrategy::Cautious, 4);
        let mut policy = GameplayStrategy::Cautious.create_policy(4);
        while !session.finished() {
            let outcome = session.advance(policy.as_mut());
            if !outcome.game_ended {
                assert_eq!(session.engine().phase(), GamePhase::Training);
            }
            if outcome.opened_combat() {
                assert!(!outcome.combat.is_empty());
            }
        }
    }

    #[test]
    fn turn_cap_halts_open_ended_runs() {
        let engine = TurnEngine::new(
            Catalogs::load_from_static().unwrap(),
            RulesConfig::default(),
            MemorySlots::new(),
            2,
        );
        let mut session =
            SimulationSession::new(SimulationConfig::new(GameplayStrategy::Cautious, 2).with_max_turns(5), engine);
        let mut policy = GameplayStrategy::Cautious.create_policy(2);
        let mut steps = 0;
        while !session.finished() {
            session.advance(policy.as_mut());
            steps += 1;
        }
        assert!(steps <= 5);
        assert!(session.final_record().is_none() || session.engine().is_game_over());
    }
}

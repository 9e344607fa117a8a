//! Combat auto-advance timing.
//!
//! The ticker is a single-shot timer: it is armed only while a live boss is
//! being fought and re-arms itself each time state settles after a tick.
use std::time::{Duration, Instant};

use crate::SlotStorage;
use crate::engine::{Outcome, TurnEngine};

#[derive(Debug, Clone)]
pub struct CombatTicker {
    interval: Duration,
    deadline: Option<Instant>,
}

impl CombatTicker {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Ticker using the engine's configured period.
    #[must_use]
    pub fn for_engine<S: SlotStorage>(engine: &TurnEngine<S>) -> Self {
        Self::new(engine.combat_tick())
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Arm when combat is pending and no deadline exists; disarm otherwise.
    pub fn settle<S: SlotStorage>(&mut self, engine: &TurnEngine<S>, now: Instant) {
        if !engine.combat_pending() {
            self.deadline = None;
        } else if self.deadline.is_none() {
            self.deadline = Some(now + self.interval);
        }
    }

    /// Fire one exchange if the deadline has passed.
    pub fn poll<S: SlotStorage>(&mut self, engine: &mut TurnEngine<S>, now: Instant) -> Option<Outcome> {
        self.settle(engine, now);
        let due = self.deadline.is_some_and(|deadline| now >= deadline);
        if !due {
            return None;
        }
        self.deadline = None;
        let outcome = engine.advance_combat();
        self.settle(engine, now);
        Some(outcome)
    }

    /// Fast-forward every pending tick without waiting, up to `max_rounds`.
    pub fn run_until_settled<S: SlotStorage>(
        &mut self,
        engine: &mut TurnEngine<S>,
        max_rounds: usize,
    ) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while engine.combat_pending() && outcomes.len() < max_rounds {
            outcomes.push(engine.advance_combat());
        }
        if engine.combat_pending() {
            log::warn!("combat still pending after {max_rounds} rounds");
        }
        self.deadline = None;
        outcomes
    }
}

/// Drive combat in real time, sleeping `interval` before each exchange.
#[cfg(feature = "async")]
pub async fn drive_combat<S: SlotStorage>(
    engine: &mut TurnEngine<S>,
    interval: Duration,
) -> Vec<Outcome> {
    drive_combat_with(engine, interval, |_, _| {}).await
}

/// [`drive_combat`] with an observer called after every exchange.
#[cfg(feature = "async")]
pub async fn drive_combat_with<S, F>(
    engine: &mut TurnEngine<S>,
    interval: Duration,
    mut observe: F,
) -> Vec<Outcome>
where
    S: SlotStorage,
    F: FnMut(&TurnEngine<S>, &Outcome),
{
    let mut outcomes = Vec::new();
    while engine.combat_pending() {
        tokio::time::sleep(interval).await;
        let outcome = engine.advance_combat();
        observe(engine, &outcome);
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::Enemy;
    use crate::config::RulesConfig;
    use crate::data::Catalogs;
    use crate::engine::{GamePhase, GameState};
    use crate::records::MemorySlots;

    fn combat_engine(boss_hp: i32) -> TurnEngine<MemorySlots> {
        let rules = RulesConfig::default();
        let mut state = GameState::fresh(&rules, 12);
        state.phase = GamePhase::Combat;
        state.boss = Some(Enemy {
            name: "Hieron".to_string(),
            description: String::new(),
            hp: boss_hp,
            max_hp: boss_hp,
            attack: 1,
            defense: 0,
        });
        let catalogs = Catalogs::load_from_static().unwrap();
        TurnEngine::from_state(state, catalogs, rules, MemorySlots::new())
    }

    #[test]
    fn ticker_arms_only_during_combat() {
        let mut engine = combat_engine(500);
        let mut ticker = CombatTicker::for_engine(&engine);
        let start = Instant::now();

        ticker.settle(&engine, start);
        assert!(ticker.is_armed());
        assert!(ticker.poll(&mut engine, start).is_none());

        let later = start + Duration::from_millis(1_000);
        assert_eq!(ticker.poll(&mut engine, later), Some(Outcome::Continued));
        assert_eq!(ticker.deadline(), Some(later + Duration::from_millis(1_000)));

        engine.reset();
        ticker.settle(&engine, later);
        assert!(!ticker.is_armed());
    }

    #[test]
    fn fast_forward_finishes_encounter() {
        // attack 50 against 120 hp: three exchanges
        let mut engine = combat_engine(120);
        let mut ticker = CombatTicker::for_engine(&engine);
        let outcomes = ticker.run_until_settled(&mut engine, 100);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes.last(), Some(&Outcome::PhaseChanged(GamePhase::Training)));
        assert!(!ticker.is_armed());
        assert_eq!(engine.loop_count(), 1);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn async_driver_runs_to_settlement() {
        let mut engine = combat_engine(100);
        let outcomes = drive_combat(&mut engine, Duration::from_millis(1)).await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(engine.phase(), GamePhase::Training);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn observer_sees_every_exchange() {
        let mut engine = combat_engine(100);
        let mut rounds = Vec::new();
        let outcomes = drive_combat_with(&mut engine, Duration::from_millis(1), |engine, _| {
            rounds.push(engine.state().combat_round);
        })
        .await;
        assert_eq!(outcomes.len(), rounds.len());
        // the winning exchange resets the round counter
        assert_eq!(rounds, vec![1, 0]);
    }
}

//! Drillhall Game Engine
//!
//! Platform-agnostic core for the Drillhall training simulation: a turn
//! engine that spends resources, rolls success, shifts a cadet's attributes,
//! injects random events and schedules periodic boss combat.
//! This crate provides all game mechanics without UI or platform-specific dependencies.

pub mod actions;
pub mod combat;
pub mod config;
pub mod constants;
pub mod data;
pub mod engine;
pub mod events;
pub mod numbers;
pub mod rank;
pub mod records;
pub mod requirements;
pub mod rng;
pub mod scheduler;
pub mod stats;
pub mod success;

// Re-export commonly used types
pub use actions::{Action, ActionCategory};
pub use combat::{
    Actor, BossTemplate, CombatExchange, CombatLogEntry, CombatStats, Enemy, exchange_with_crit,
    generate_boss, resolve_exchange,
};
pub use config::{
    BossScaling, CategoryTuning, CombatRules, EventRules, RestRules, RulesConfig,
    StartingSnapshot,
};
pub use constants::RECORDS_SLOT;
pub use data::{
    ACTIONS_ASSET, ActionCatalog, BOSSES_ASSET, BossPool, CatalogError, Catalogs, EVENTS_ASSET,
    FixedLoader, RULES_ASSET, StaticLoader, embedded_asset, ruleset_fingerprint,
};
pub use engine::{
    ActionOption, Clock, GamePhase, GameState, IgnoreReason, Outcome, TurnEngine,
};
pub use events::{EventCatalog, EventEffect, RandomEvent};
pub use rank::{Comparison, RankRule, RankTable, RunResult, StatCondition};
pub use records::{FileSlots, MemorySlots, Record, RecordStore, StorageError};
pub use requirements::{RequirementFailure, Requirements, check};
pub use rng::{CountingRng, RngStreams};
#[cfg(feature = "async")]
pub use scheduler::{drive_combat, drive_combat_with};
pub use scheduler::CombatTicker;
pub use stats::{Character, CoreStats, ResourcePool, Stat, StatDeltas};
pub use success::success_rate;

/// Trait for abstracting content loading
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the action, event and boss catalogs
    ///
    /// # Errors
    ///
    /// Returns an error if any catalog cannot be loaded or fails validation.
    fn load_catalogs(&self) -> Result<Catalogs, Self::Error>;

    /// Load the balance table
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be loaded or parsed.
    fn load_rules(&self) -> Result<RulesConfig, Self::Error>;
}

/// Trait for abstracting named-slot persistence
/// Platform-specific implementations should provide this
pub trait SlotStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read a slot; `Ok(None)` when it has never been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unavailable.
    fn read_slot(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Replace the slot contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn write_slot(&self, key: &str, payload: &str) -> Result<(), Self::Error>;
}

/// Main game engine for creating runs
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: SlotStorage + Clone,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: SlotStorage + Clone,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    /// Start a fresh run with the given seed
    ///
    /// # Errors
    ///
    /// Returns an error if catalogs or rules cannot be loaded.
    pub fn start_run(&self, seed: u64) -> Result<TurnEngine<S>, L::Error> {
        let catalogs = self.data_loader.load_catalogs()?;
        let rules = self.data_loader.load_rules()?;
        Ok(TurnEngine::new(catalogs, rules, self.storage.clone(), seed))
    }

    /// Resume a run from a saved state
    ///
    /// # Errors
    ///
    /// Returns an error if catalogs or rules cannot be loaded.
    pub fn resume_run(&self, state: GameState) -> Result<TurnEngine<S>, L::Error> {
        let catalogs = self.data_loader.load_catalogs()?;
        let rules = self.data_loader.load_rules()?;
        Ok(TurnEngine::from_state(
            state,
            catalogs,
            rules,
            self.storage.clone(),
        ))
    }

    /// Records persisted so far, read fresh from storage
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        RecordStore::open(self.storage.clone()).records().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_loader_starts_a_playable_run() {
        let engine = GameEngine::new(StaticLoader, MemorySlots::new());
        let mut run = engine.start_run(0xD1_11).unwrap();
        assert_eq!(run.turn(), 1);
        assert_eq!(run.character().name, "Cadet");
        assert_eq!(run.available_actions().len(), 8);
        assert!(run.perform_action("visit").is_applied());
        assert_eq!(run.turn(), 2);
    }

    #[test]
    fn runs_share_record_storage() {
        let mut rules = RulesConfig::default();
        rules.events.action_chance = 0.0;
        rules.events.stress_critical = 100;
        let loader = FixedLoader {
            catalogs: Catalogs::load_from_static().unwrap(),
            rules,
        };
        let engine = GameEngine::new(loader, MemorySlots::new());
        let mut state = GameState::fresh(&RulesConfig::default(), 5);
        state.character.health = 1;
        state.resources.ap = 100;
        let mut run = engine.resume_run(state).unwrap();
        // hypno_app always costs at least 5 health
        assert_eq!(run.perform_action("hypno_app"), Outcome::RunEnded(RunResult::Collapsed));
        assert_eq!(engine.records().len(), 1);
        assert_eq!(engine.records()[0].rank, "F");

        let next = engine.start_run(6).unwrap();
        assert_eq!(next.records().len(), 1);
    }

    #[test]
    fn fixed_loader_serves_custom_rules() {
        let rules = RulesConfig {
            final_loop: Some(3),
            ..RulesConfig::default()
        };
        let loader = FixedLoader {
            catalogs: Catalogs::load_from_static().unwrap(),
            rules,
        };
        let run = GameEngine::new(loader, MemorySlots::new()).start_run(1).unwrap();
        assert_eq!(run.rules().final_loop, Some(3));
    }
}

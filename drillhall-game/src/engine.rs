//! Turn engine: one state transition per player command.
//!
//! The engine exclusively owns the live [`GameState`]; hosts issue commands
//! and read snapshots. Every command returns an [`Outcome`] instead of
//! failing, so wrong-phase or ineligible input never needs error handling.
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::SlotStorage;
use crate::actions::Action;
use crate::combat::{CombatLogEntry, Enemy, generate_boss, resolve_exchange};
use crate::config::RulesConfig;
use crate::constants::{
    LOG_CLEARED, LOG_COLLAPSE, LOG_DEFEAT, LOG_EVENT_PREFIX, LOG_FAILURE, LOG_OVERLOAD,
    LOG_REJECTED_PREFIX, LOG_RESET, LOG_RUN_START, LOG_SUCCESS, PERCENT_SCALE,
};
use crate::data::{Catalogs, ruleset_fingerprint};
use crate::rank::RunResult;
use crate::records::{Record, RecordStore};
use crate::requirements::{RequirementFailure, check};
use crate::rng::RngStreams;
use crate::stats::{Character, ResourcePool, Stat};
use crate::success::{roll_succeeds, success_rate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    #[default]
    Training,
    Combat,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Training => f.write_str("training"),
            Self::Combat => f.write_str("combat"),
        }
    }
}

/// Why a command was dropped without touching state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    GameOver,
    WrongPhase(GamePhase),
    UnknownAction(String),
    NoBoss,
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    /// Requirements failed; only a log line was appended.
    Rejected(RequirementFailure),
    Continued,
    PhaseChanged(GamePhase),
    RunEnded(RunResult),
}

impl Outcome {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        !matches!(self, Self::Ignored(_) | Self::Rejected(_))
    }
}

/// Source of record timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System => Utc::now(),
            Self::Fixed(at) => *at,
        }
    }
}

/// Complete live state of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Turn currently being played, starting at 1.
    pub turn: u32,
    pub phase: GamePhase,
    /// Bosses cleared so far.
    pub loop_count: u32,
    pub character: Character,
    pub resources: ResourcePool,
    pub boss: Option<Enemy>,
    #[serde(default)]
    pub combat_round: u32,
    #[serde(default)]
    pub combat_log: Vec<CombatLogEntry>,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default)]
    pub game_over: bool,
    #[serde(default)]
    pub seed: u64,
}

impl GameState {
    /// Starting snapshot for a new run.
    #[must_use]
    pub fn fresh(rules: &RulesConfig, seed: u64) -> Self {
        Self {
            turn: 1,
            phase: GamePhase::Training,
            loop_count: 0,
            character: rules.start.character(),
            resources: rules.start.resources(),
            boss: None,
            combat_round: 0,
            combat_log: Vec::new(),
            logs: vec![LOG_RUN_START.to_string()],
            game_over: false,
            seed,
        }
    }
}

/// Presentation view of one catalog action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOption<'a> {
    pub action: &'a Action,
    pub success_rate: u8,
    pub blocked: Option<RequirementFailure>,
}

impl ActionOption<'_> {
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.blocked.is_none()
    }
}

/// Drives a run: validates commands, rolls, mutates and records.
#[derive(Debug)]
pub struct TurnEngine<S: SlotStorage> {
    state: GameState,
    catalogs: Catalogs,
    rules: RulesConfig,
    rngs: RngStreams,
    records: RecordStore<S>,
    clock: Clock,
    ruleset: u64,
}

impl<S: SlotStorage> TurnEngine<S> {
    /// Start a fresh run. Record history is read once from `storage`.
    pub fn new(catalogs: Catalogs, rules: RulesConfig, storage: S, seed: u64) -> Self {
        let state = GameState::fresh(&rules, seed);
        Self::from_state(state, catalogs, rules, storage)
    }

    /// Resume from an existing state; streams are seeded from `state.seed`.
    pub fn from_state(state: GameState, catalogs: Catalogs, rules: RulesConfig, storage: S) -> Self {
        let ruleset = ruleset_fingerprint(&catalogs, &rules);
        log::debug!("engine ready: seed {} ruleset {ruleset:016x}", state.seed);
        Self {
            rngs: RngStreams::from_user_seed(state.seed),
            records: RecordStore::open(storage),
            state,
            catalogs,
            rules,
            clock: Clock::System,
            ruleset,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // Commands -------------------------------------------------------------

    /// Run one training action by id.
    pub fn perform_action(&mut self, action_id: &str) -> Outcome {
        if let Some(reason) = self.guard(GamePhase::Training) {
            return Outcome::Ignored(reason);
        }
        let Some(action) = self.catalogs.actions.get(action_id).cloned() else {
            log::debug!("ignoring unknown action `{action_id}`");
            return Outcome::Ignored(IgnoreReason::UnknownAction(action_id.to_string()));
        };
        if let Err(failure) = check(&self.state.character, &self.state.resources, &action.requirements) {
            log::debug!("action `{action_id}` rejected: {failure}");
            self.state
                .logs
                .push(format!("{LOG_REJECTED_PREFIX} {failure}"));
            return Outcome::Rejected(failure);
        }

        let turn = self.state.turn;
        let rate = success_rate(&self.state.character, action.category, &self.rules);
        let (cost_lo, cost_hi) = action.hp_cost_range();
        let hp_cost = self.rngs.action().gen_range(cost_lo..=cost_hi);
        self.state.character.change_health(-hp_cost);
        self.state.resources.spend(action.requirements.ap_cost());

        let roll = self.rngs.action().r#gen::<f64>() * PERCENT_SCALE;
        let succeeded = roll_succeeds(roll, rate);
        log::debug!(
            "turn {turn}: {} rolled {roll:.2} against {rate}% (hp cost {hp_cost})",
            action.id
        );

        let mut line = format!("Turn {turn}: [{}] ", action.label);
        if succeeded {
            line.push_str(LOG_SUCCESS);
            self.apply_success(&action, &mut line);
        } else {
            line.push_str(LOG_FAILURE);
            self.state.character.change_stress(self.rules.failure_stress);
        }

        self.event_step(self.rules.events.action_chance, true, &mut line);
        self.settle_training_turn(line)
    }

    /// Recover health, AP and stress at the cost of a turn.
    pub fn rest(&mut self) -> Outcome {
        if let Some(reason) = self.guard(GamePhase::Training) {
            return Outcome::Ignored(reason);
        }
        let turn = self.state.turn;
        let rest = self.rules.rest.clone();
        let (lo, hi) = (rest.health_min.min(rest.health_max), rest.health_min.max(rest.health_max));
        let heal = self.rngs.event().gen_range(lo..=hi);
        self.state.character.change_health(heal);
        self.state.resources.restore(rest.ap);
        self.state.character.change_stress(-rest.stress_relief);

        let mut line = format!(
            "Turn {turn}: Rest. (HP+{heal}, AP+{}, Stress-{})",
            rest.ap, rest.stress_relief
        );
        self.event_step(self.rules.events.rest_chance, false, &mut line);
        self.settle_training_turn(line)
    }

    /// Resolve one combat exchange against the current boss.
    pub fn advance_combat(&mut self) -> Outcome {
        if let Some(reason) = self.guard(GamePhase::Combat) {
            return Outcome::Ignored(reason);
        }
        let Some(mut boss) = self.state.boss.take() else {
            return Outcome::Ignored(IgnoreReason::NoBoss);
        };

        let round = self.state.combat_round.saturating_add(1);
        let exchange = resolve_exchange(
            &self.state.character,
            &boss,
            round,
            &self.rules.combat,
            self.rngs.combat(),
        );
        self.state.combat_round = round;
        self.state
            .character
            .change_health(-exchange.damage_to_character);
        boss.hp = boss.hp.saturating_sub(exchange.damage_to_boss).max(0);
        self.state.combat_log.extend(exchange.entries);

        if self.state.character.is_down() {
            log::info!("defeated by {} in round {round}", boss.name);
            let result = RunResult::DefeatedBy {
                boss: boss.name.clone(),
            };
            self.state.boss = Some(boss);
            self.state.logs.push(LOG_DEFEAT.to_string());
            return self.end_run(result);
        }

        if boss.is_defeated() {
            self.state.loop_count = self.state.loop_count.saturating_add(1);
            self.state.phase = GamePhase::Training;
            self.state.combat_log.clear();
            self.state.combat_round = 0;
            self.state
                .logs
                .push(format!("Victory! {} defeated!", boss.name));
            log::info!(
                "{} defeated after {round} rounds; loop {}",
                boss.name,
                self.state.loop_count
            );
            if let Some(final_loop) = self.rules.final_loop
                && self.state.loop_count >= final_loop
            {
                self.state.logs.push(LOG_CLEARED.to_string());
                return self.end_run(RunResult::Cleared);
            }
            return Outcome::PhaseChanged(GamePhase::Training);
        }

        self.state.boss = Some(boss);
        Outcome::Continued
    }

    /// Return to the starting snapshot. Records and RNG streams carry on.
    pub fn reset(&mut self) {
        let seed = self.state.seed;
        self.state = GameState::fresh(&self.rules, seed);
        self.state.logs = vec![LOG_RESET.to_string()];
        log::debug!("run reset");
    }

    /// Reset and restart every RNG stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rngs = RngStreams::from_user_seed(seed);
        self.state = GameState::fresh(&self.rules, seed);
        log::debug!("run reseeded with {seed}");
    }

    // Accessors ------------------------------------------------------------

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn character(&self) -> &Character {
        &self.state.character
    }

    #[must_use]
    pub const fn resources(&self) -> &ResourcePool {
        &self.state.resources
    }

    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.state.phase
    }

    #[must_use]
    pub const fn boss(&self) -> Option<&Enemy> {
        self.state.boss.as_ref()
    }

    #[must_use]
    pub fn logs(&self) -> &[String] {
        &self.state.logs
    }

    #[must_use]
    pub fn combat_log(&self) -> &[CombatLogEntry] {
        &self.state.combat_log
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        self.records.records()
    }

    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.state.game_over
    }

    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.state.turn
    }

    #[must_use]
    pub const fn loop_count(&self) -> u32 {
        self.state.loop_count
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.state.seed
    }

    #[must_use]
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    #[must_use]
    pub const fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    #[must_use]
    pub const fn ruleset_fingerprint(&self) -> u64 {
        self.ruleset
    }

    #[must_use]
    pub const fn rng_draws(&self) -> u64 {
        self.rngs.total_draws()
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        self.records.storage()
    }

    /// True while an auto-advance timer should be armed.
    #[must_use]
    pub const fn combat_pending(&self) -> bool {
        matches!(self.state.phase, GamePhase::Combat)
            && !self.state.game_over
            && matches!(&self.state.boss, Some(boss) if boss.hp > 0)
    }

    #[must_use]
    pub const fn combat_tick(&self) -> Duration {
        Duration::from_millis(self.rules.combat.tick_millis)
    }

    /// Every catalog action with its current rate and first unmet requirement.
    #[must_use]
    pub fn available_actions(&self) -> Vec<ActionOption<'_>> {
        self.catalogs
            .actions
            .iter()
            .map(|action| ActionOption {
                action,
                success_rate: success_rate(&self.state.character, action.category, &self.rules),
                blocked: check(&self.state.character, &self.state.resources, &action.requirements)
                    .err(),
            })
            .collect()
    }

    #[must_use]
    pub fn success_rate_for(&self, action_id: &str) -> Option<u8> {
        self.catalogs
            .actions
            .get(action_id)
            .map(|action| success_rate(&self.state.character, action.category, &self.rules))
    }

    // Internals ------------------------------------------------------------

    fn guard(&self, phase: GamePhase) -> Option<IgnoreReason> {
        if self.state.game_over {
            Some(IgnoreReason::GameOver)
        } else if self.state.phase == phase {
            None
        } else {
            Some(IgnoreReason::WrongPhase(self.state.phase))
        }
    }

    fn apply_success(&mut self, action: &Action, line: &mut String) {
        let ceiling = self.rules.stat_ceiling;
        for (&stat, &delta) in &action.stat_deltas {
            if delta == 0 {
                continue;
            }
            let magnitude = self.rngs.action().gen_range(1..=delta.unsigned_abs());
            let magnitude = i32::try_from(magnitude).unwrap_or(i32::MAX);
            let change = if delta > 0 { magnitude } else { -magnitude };
            self.state.character.stats.adjust(stat, change, ceiling);
        }
        self.state.character.change_stress(action.stress_delta);

        if let Some(gain) = action.depth_gain
            && gain > 0
            && chance(self.rngs.action(), self.rules.depth_gain_chance)
        {
            self.state.character.deepen(gain, self.rules.max_depth);
            line.push_str(&format!(" (Depth up: Lv.{}!)", self.state.character.depth));
        }
    }

    fn event_step(&mut self, probability: f64, allow_overload: bool, line: &mut String) {
        let rules = &self.rules.events;
        let critical = allow_overload && self.state.character.stress > rules.stress_critical;
        let event = if critical {
            if chance(self.rngs.event(), rules.overload_chance) {
                self.state
                    .character
                    .change_health(-rules.overload_health_loss);
                self.state.character.stats.adjust(
                    Stat::Obedience,
                    -rules.overload_obedience_loss,
                    self.rules.stat_ceiling,
                );
                line.push_str("\n   ");
                line.push_str(LOG_OVERLOAD);
                log::debug!("stress overload breakdown");
                return;
            }
            self.catalogs.events.pick(self.rngs.event()).cloned()
        } else {
            self.catalogs.events.roll(probability, self.rngs.event()).cloned()
        };
        let Some(event) = event else {
            return;
        };

        let effect = event.resolve(self.rngs.event());
        self.state.character.change_health(effect.health_delta);
        self.state.character.change_stress(effect.stress_delta);
        self.state
            .character
            .stats
            .apply_deltas(&effect.stat_deltas, self.rules.stat_ceiling);
        line.push_str(&format!(
            "\n   -> {LOG_EVENT_PREFIX} {} (HP {})",
            event.message, effect.health_delta
        ));
        log::debug!("event `{}` fired", event.id);
    }

    fn settle_training_turn(&mut self, line: String) -> Outcome {
        self.state.logs.push(line);
        if self.state.character.is_down() {
            self.state.logs.push(LOG_COLLAPSE.to_string());
            return self.end_run(RunResult::Collapsed);
        }

        let completed = self.state.turn;
        self.state.turn = completed.saturating_add(1);
        if completed.checked_rem(self.rules.combat.interval_turns) == Some(0) {
            return self.start_encounter();
        }
        Outcome::Continued
    }

    fn start_encounter(&mut self) -> Outcome {
        let Some(boss) = generate_boss(
            self.state.loop_count,
            &self.catalogs.bosses.bosses,
            &self.rules.combat.boss,
            self.rngs.boss(),
        ) else {
            log::warn!("boss pool empty; skipping encounter");
            return Outcome::Continued;
        };
        log::info!(
            "boss {} appears (loop {}, hp {})",
            boss.name,
            self.state.loop_count,
            boss.max_hp
        );
        self.state
            .logs
            .push(format!("WARNING: {} approaches!", boss.name));
        self.state.boss = Some(boss);
        self.state.phase = GamePhase::Combat;
        self.state.combat_log.clear();
        self.state.combat_round = 0;
        Outcome::PhaseChanged(GamePhase::Combat)
    }

    fn end_run(&mut self, result: RunResult) -> Outcome {
        let stats = self.state.character.stats;
        let record = Record {
            id: 0,
            final_stats: stats,
            total_turns: self.state.turn,
            loops_cleared: self.state.loop_count,
            seed: self.state.seed,
            timestamp: self.clock.now(),
            rank: self.rules.ranks.rank_for(&result, &stats),
            result: result.clone(),
            ruleset: self.ruleset,
        };
        let stored = self.records.append(record);
        log::info!(
            "run ended on turn {}: {} (rank {}, record #{})",
            stored.total_turns,
            stored.result,
            stored.rank,
            stored.id
        );
        self.state.game_over = true;
        Outcome::RunEnded(result)
    }
}

fn chance<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.r#gen::<f64>() < probability
}

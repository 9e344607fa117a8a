use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use drillhall_game::{
    ACTIONS_ASSET, BOSSES_ASSET, CatalogError, Catalogs, DataLoader, EVENTS_ASSET, GameState,
    MemorySlots, RULES_ASSET, Record, RulesConfig, RunResult, SlotStorage, TurnEngine,
    embedded_asset, ruleset_fingerprint,
};
use thiserror::Error;

use crate::logic::policy::{GameplayStrategy, PolicyChoice};
use crate::logic::simulation::{SimulationConfig, SimulationSession, TurnOutcome};

pub const DEFAULT_MAX_TURNS: u32 = 400;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no embedded fallback for asset `{0}`")]
    Missing(&'static str),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("failed to parse {path}: {source}")]
    Rules {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Content and balance table shared by every simulated run.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    catalogs: Catalogs,
    rules: RulesConfig,
}

impl TesterAssets {
    /// Assets compiled into the engine.
    ///
    /// # Errors
    ///
    /// Fails only if the embedded catalogs are invalid.
    pub fn load_default() -> Result<Self, AssetError> {
        Self::load_from(&AssetDir::embedded())
    }

    /// Assets from `dir`, each missing file falling back to the embedded copy.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError`] for unreadable or invalid files.
    pub fn load_dir(dir: impl Into<PathBuf>) -> Result<Self, AssetError> {
        Self::load_from(&AssetDir::new(dir))
    }

    fn load_from(loader: &AssetDir) -> Result<Self, AssetError> {
        Ok(Self {
            catalogs: loader.load_catalogs()?,
            rules: loader.load_rules()?,
        })
    }

    #[must_use]
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Fingerprint stamped on records made with these assets.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        ruleset_fingerprint(&self.catalogs, &self.rules)
    }

    /// Fresh engine over `storage` with these assets.
    pub fn engine<S: SlotStorage>(&self, state: GameState, storage: S) -> TurnEngine<S> {
        TurnEngine::from_state(state, self.catalogs.clone(), self.rules.clone(), storage)
    }
}

/// Loader reading `<name>.json` files from a directory.
#[derive(Debug, Clone, Default)]
pub struct AssetDir {
    dir: Option<PathBuf>,
}

impl AssetDir {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    #[must_use]
    pub const fn embedded() -> Self {
        Self { dir: None }
    }

    fn read(&self, name: &'static str) -> Result<(String, String), AssetError> {
        if let Some(dir) = &self.dir {
            let path = dir.join(format!("{name}.json"));
            if path.exists() {
                log::info!("loading {name} from {}", path.display());
                let text = fs::read_to_string(&path)
                    .map_err(|source| AssetError::Io { path: path.clone(), source })?;
                return Ok((path.display().to_string(), text));
            }
        }
        let text = embedded_asset(name).ok_or(AssetError::Missing(name))?;
        Ok((format!("embedded {name}.json"), text.to_string()))
    }
}

impl DataLoader for AssetDir {
    type Error = AssetError;

    fn load_catalogs(&self) -> Result<Catalogs, Self::Error> {
        let (_, actions) = self.read(ACTIONS_ASSET)?;
        let (_, events) = self.read(EVENTS_ASSET)?;
        let (_, bosses) = self.read(BOSSES_ASSET)?;
        Ok(Catalogs::from_json(&actions, &events, &bosses)?)
    }

    fn load_rules(&self) -> Result<RulesConfig, Self::Error> {
        let (path, rules) = self.read(RULES_ASSET)?;
        RulesConfig::from_json(&rules).map_err(|source| AssetError::Rules { path, source })
    }
}

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub max_turns: Option<u32>,
    pub setup: Option<fn(&mut GameState)>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            max_turns: None,
            setup: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut GameState)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Per-run counters gathered while the policy plays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunMetrics {
    pub turns_played: u32,
    pub actions_taken: u32,
    pub rests_taken: u32,
    pub rejected_picks: u32,
    pub encounters: u32,
    pub bosses_cleared: u32,
    pub combat_rounds: u32,
    pub peak_stress: i32,
    pub lowest_health: i32,
    pub max_depth: u8,
}

impl RunMetrics {
    fn starting(state: &GameState) -> Self {
        Self {
            lowest_health: state.character.health,
            peak_stress: state.character.stress,
            max_depth: state.character.depth,
            ..Self::default()
        }
    }

    fn record_turn(&mut self, outcome: &TurnOutcome, state: &GameState) {
        self.turns_played += 1;
        match outcome.decision.choice {
            PolicyChoice::Perform(_) => self.actions_taken += 1,
            PolicyChoice::Rest => self.rests_taken += 1,
        }
        if outcome.fell_back {
            self.rejected_picks += 1;
        }
        if outcome.opened_combat() {
            self.encounters += 1;
        }
        if outcome.boss_cleared() {
            self.bosses_cleared += 1;
        }
        self.combat_rounds += u32::try_from(outcome.combat.len()).unwrap_or(u32::MAX);
        self.peak_stress = self.peak_stress.max(state.character.stress);
        self.lowest_health = self.lowest_health.min(state.character.health);
        self.max_depth = self.max_depth.max(state.character.depth);
    }
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub turns: Vec<TurnOutcome>,
    pub metrics: RunMetrics,
    pub final_state: GameState,
    pub result: Option<RunResult>,
    pub record: Option<Record>,
    pub ending_message: String,
    pub game_ended: bool,
    /// Assets the run was played with, for replays.
    pub assets: Arc<TesterAssets>,
}

/// Headless deterministic runner for the core game logic.
#[derive(Clone)]
pub struct GameTester {
    verbose: bool,
    assets: Arc<TesterAssets>,
}

impl GameTester {
    pub const fn new(assets: Arc<TesterAssets>, verbose: bool) -> Self {
        Self { verbose, assets }
    }

    /// Tester over the embedded assets.
    ///
    /// # Errors
    ///
    /// Fails only if the embedded catalogs are invalid.
    pub fn try_new(verbose: bool) -> Result<Self> {
        Ok(Self::new(Arc::new(TesterAssets::load_default()?), verbose))
    }

    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let max_turns = plan.max_turns.unwrap_or(DEFAULT_MAX_TURNS);
        let mut state = GameState::fresh(self.assets.rules(), seed);
        if let Some(setup) = plan.setup {
            setup(&mut state);
        }
        let engine = self.assets.engine(state, MemorySlots::new());
        let mut session = SimulationSession::new(
            SimulationConfig::new(plan.strategy, seed).with_max_turns(max_turns),
            engine,
        );

        if self.verbose {
            println!(
                "🎲 seed {} | strategy {} | ruleset {:016x}",
                seed,
                plan.strategy.label().bright_white(),
                session.engine().ruleset_fingerprint()
            );
        }

        let mut policy = plan.strategy.create_policy(seed);
        let mut metrics = RunMetrics::starting(session.state());
        let mut turns = Vec::new();

        while !session.finished() {
            let outcome = session.advance(policy.as_mut());
            metrics.record_turn(&outcome, session.state());
            if self.verbose {
                log_turn(&outcome, session.state());
            }
            turns.push(outcome);
        }

        let record = session.final_record().cloned();
        let result = record.as_ref().map(|record| record.result.clone());
        let game_ended = session.engine().is_game_over();
        let ending_message = match (&result, &record) {
            (Some(result), Some(record)) => format!("{result} (rank {})", record.rank),
            _ => format!("Halted at turn cap {max_turns}"),
        };

        SimulationSummary {
            seed,
            strategy: plan.strategy,
            turns,
            metrics,
            final_state: session.into_engine().state().clone(),
            result,
            record,
            ending_message,
            game_ended,
            assets: Arc::clone(&self.assets),
        }
    }
}

fn log_turn(outcome: &TurnOutcome, state: &GameState) {
    let choice = match &outcome.decision.choice {
        PolicyChoice::Perform(id) => id.as_str(),
        PolicyChoice::Rest => "rest",
    };
    println!(
        "  turn {:>3} {:<16} hp {:>3} ap {:>3} stress {:>3} {:?}",
        outcome.turn,
        choice,
        state.character.health,
        state.resources.ap,
        state.character.stress,
        outcome.outcome
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::ensure;

    fn tester() -> GameTester {
        GameTester::try_new(false).unwrap()
    }

    #[test]
    fn plan_runs_until_end_or_cap() {
        let plan = SimulationPlan::new(GameplayStrategy::Balanced).with_max_turns(60);
        let summary = tester().run_plan(&plan, 1337);
        assert!(!summary.turns.is_empty());
        assert!(summary.game_ended || summary.final_state.turn > 60);
        assert_eq!(summary.game_ended, summary.record.is_some());
        assert_eq!(summary.metrics.turns_played as usize, summary.turns.len());
    }

    #[test]
    fn runs_are_deterministic_per_seed() {
        let plan = SimulationPlan::new(GameplayStrategy::Random).with_max_turns(80);
        let first = tester().run_plan(&plan, 99);
        let second = tester().run_plan(&plan, 99);
        assert_eq!(first.final_state, second.final_state);
        assert_eq!(first.metrics, second.metrics);
    }

    #[test]
    fn setup_hook_shapes_the_starting_state() {
        fn fragile(state: &mut GameState) {
            state.character.health = 1;
            state.resources.ap = 100;
        }
        let plan = SimulationPlan::new(GameplayStrategy::Aggressive)
            .with_setup(fragile)
            .with_expectation(|summary: &SimulationSummary| {
                ensure!(summary.metrics.lowest_health <= 1, "setup not applied");
                Ok(())
            });
        let summary = tester().run_plan(&plan, 5);
        for expectation in &plan.expectations {
            expectation.evaluate(&summary).unwrap();
        }
    }

    #[test]
    fn asset_dir_falls_back_to_embedded_files() {
        let dir = std::env::temp_dir().join(format!("drillhall-assets-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("rules.json"), r#"{ "base_success_rate": 70.0 }"#).unwrap();

        let assets = TesterAssets::load_dir(&dir).unwrap();
        assert!((assets.rules().base_success_rate - 70.0).abs() < f64::EPSILON);
        let embedded = TesterAssets::load_default().unwrap();
        assert_eq!(assets.catalogs, embedded.catalogs);
        assert_ne!(assets.fingerprint(), embedded.fingerprint());

        fs::write(dir.join("bosses.json"), r#"{ "bosses": [] }"#).unwrap();
        let err = TesterAssets::load_dir(&dir).unwrap_err();
        assert!(matches!(err, AssetError::Catalog(CatalogError::EmptyBossPool)));
        let _ = fs::remove_dir_all(&dir);
    }
}

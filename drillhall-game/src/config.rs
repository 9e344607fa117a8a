//! Balance table for the canonical ruleset.
//!
//! Every number the engine uses lives here so tuning never touches engine
//! logic. The embedded `rules.json` mirrors [`RulesConfig::default`].
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::actions::ActionCategory;
use crate::rank::RankTable;
use crate::stats::{Character, CoreStats, ResourcePool, Stat};

pub(crate) const DEFAULT_RULES_DATA: &str = include_str!("../assets/data/rules.json");

/// Per-category success-rate adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CategoryTuning {
    #[serde(default)]
    pub flat_bonus: f64,
    #[serde(default)]
    pub stat_weights: BTreeMap<Stat, f64>,
    #[serde(default)]
    pub missing_health_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRules {
    pub action_chance: f64,
    pub rest_chance: f64,
    pub stress_critical: i32,
    pub overload_chance: f64,
    pub overload_health_loss: i32,
    pub overload_obedience_loss: i32,
}

impl Default for EventRules {
    fn default() -> Self {
        Self {
            action_chance: 0.3,
            rest_chance: 0.1,
            stress_critical: 80,
            overload_chance: 0.5,
            overload_health_loss: 10,
            overload_obedience_loss: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestRules {
    pub health_min: i32,
    pub health_max: i32,
    pub ap: i32,
    pub stress_relief: i32,
}

impl Default for RestRules {
    fn default() -> Self {
        Self {
            health_min: 20,
            health_max: 30,
            ap: 20,
            stress_relief: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossScaling {
    pub base_hp: i32,
    pub base_attack: i32,
    pub base_defense: i32,
    pub scale_per_loop: f64,
}

impl Default for BossScaling {
    fn default() -> Self {
        Self {
            base_hp: 1_200,
            base_attack: 60,
            base_defense: 30,
            scale_per_loop: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    /// Completed training turns between boss encounters.
    pub interval_turns: u32,
    /// Auto-advance period for hosts driving combat in real time.
    pub tick_millis: u64,
    pub attack_base: i32,
    pub attack_power_multiplier: f64,
    pub damage_floor: f64,
    pub boss_defense_divisor: f64,
    pub crit_divisor: f64,
    pub crit_multiplier: f64,
    pub counter_defense_divisor: f64,
    pub corruption_penalty_divisor: f64,
    pub boss: BossScaling,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            interval_turns: 20,
            tick_millis: 1_000,
            attack_base: 10,
            attack_power_multiplier: 2.0,
            damage_floor: 5.0,
            boss_defense_divisor: 2.0,
            crit_divisor: 2.0,
            crit_multiplier: 1.5,
            counter_defense_divisor: 3.0,
            corruption_penalty_divisor: 200.0,
            boss: BossScaling::default(),
        }
    }
}

/// Initial character and resource values restored on every reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartingSnapshot {
    pub name: String,
    pub max_health: i32,
    pub stress: i32,
    pub depth: u8,
    pub stats: CoreStats,
    pub ap: i32,
    pub max_ap: i32,
}

impl Default for StartingSnapshot {
    fn default() -> Self {
        Self {
            name: "Cadet".to_string(),
            max_health: 100,
            stress: 0,
            depth: 0,
            stats: CoreStats {
                resistance: 60,
                power: 20,
                ..CoreStats::default()
            },
            ap: 50,
            max_ap: 100,
        }
    }
}

impl StartingSnapshot {
    #[must_use]
    pub fn character(&self) -> Character {
        Character {
            name: self.name.clone(),
            max_health: self.max_health,
            health: self.max_health,
            stress: self.stress,
            depth: self.depth,
            stats: self.stats,
        }
    }

    #[must_use]
    pub const fn resources(&self) -> ResourcePool {
        ResourcePool {
            ap: self.ap,
            max_ap: self.max_ap,
        }
    }
}

/// Complete balance table consumed by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub base_success_rate: f64,
    pub success_floor: u8,
    pub success_ceiling: u8,
    pub stress_penalty_threshold: i32,
    pub stress_penalty_weight: f64,
    pub categories: BTreeMap<ActionCategory, CategoryTuning>,
    pub failure_stress: i32,
    pub depth_gain_chance: f64,
    pub max_depth: u8,
    pub stat_ceiling: Option<i32>,
    pub final_loop: Option<u32>,
    pub events: EventRules,
    pub rest: RestRules,
    pub combat: CombatRules,
    pub ranks: RankTable,
    pub start: StartingSnapshot,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            base_success_rate: 60.0,
            success_floor: 5,
            success_ceiling: 95,
            stress_penalty_threshold: 50,
            stress_penalty_weight: 1.0,
            categories: default_categories(),
            failure_stress: 10,
            depth_gain_chance: 0.5,
            max_depth: 4,
            stat_ceiling: None,
            final_loop: None,
            events: EventRules::default(),
            rest: RestRules::default(),
            combat: CombatRules::default(),
            ranks: RankTable::default(),
            start: StartingSnapshot::default(),
        }
    }
}

impl RulesConfig {
    /// Parse the embedded asset, falling back to the compiled defaults.
    #[must_use]
    pub fn load_from_static() -> Self {
        match Self::from_json(DEFAULT_RULES_DATA) {
            Ok(rules) => rules,
            Err(err) => {
                log::warn!("embedded rules.json unreadable, using built-in defaults: {err}");
                Self::default()
            }
        }
    }

    /// Parse a rules table from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn category(&self, category: ActionCategory) -> Option<&CategoryTuning> {
        self.categories.get(&category)
    }
}

fn default_categories() -> BTreeMap<ActionCategory, CategoryTuning> {
    BTreeMap::from([
        (
            ActionCategory::Communication,
            CategoryTuning {
                flat_bonus: 0.0,
                stat_weights: BTreeMap::from([(Stat::Resistance, -0.5), (Stat::Obedience, 0.2)]),
                missing_health_weight: 0.0,
            },
        ),
        (
            ActionCategory::Training,
            CategoryTuning {
                flat_bonus: 0.0,
                stat_weights: BTreeMap::from([(Stat::Obedience, 0.5)]),
                missing_health_weight: -0.2,
            },
        ),
        (
            ActionCategory::Hypnosis,
            CategoryTuning {
                flat_bonus: 20.0,
                stat_weights: BTreeMap::from([(Stat::Resistance, -0.2)]),
                missing_health_weight: 0.0,
            },
        ),
        (
            ActionCategory::Conditioning,
            CategoryTuning {
                flat_bonus: 0.0,
                stat_weights: BTreeMap::from([(Stat::Sensitivity, 0.4), (Stat::Corruption, 0.4)]),
                missing_health_weight: 0.0,
            },
        ),
    ])
}

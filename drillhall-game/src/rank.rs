//! Run outcome classification
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stats::{CoreStats, Stat};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunResult {
    Collapsed,
    DefeatedBy { boss: String },
    Cleared,
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collapsed => f.write_str("Collapsed"),
            Self::DefeatedBy { boss } => write!(f, "Defeated by {boss}"),
            Self::Cleared => f.write_str("Cleared"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    AtLeast,
    AtMost,
    Below,
    Above,
}

impl Comparison {
    #[must_use]
    pub const fn holds(self, value: i32, threshold: i32) -> bool {
        match self {
            Self::AtLeast => value >= threshold,
            Self::AtMost => value <= threshold,
            Self::Below => value < threshold,
            Self::Above => value > threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatCondition {
    pub stat: Stat,
    pub op: Comparison,
    pub value: i32,
}

impl StatCondition {
    #[must_use]
    pub const fn matches(&self, stats: &CoreStats) -> bool {
        self.op.holds(stats.get(self.stat), self.value)
    }
}

/// A rank awarded when every condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankRule {
    pub rank: String,
    #[serde(default)]
    pub all: Vec<StatCondition>,
}

/// Ordered rank rules; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankTable {
    pub rules: Vec<RankRule>,
    pub fallback: String,
    pub collapse: String,
}

impl Default for RankTable {
    fn default() -> Self {
        let rule = |rank: &str, all: Vec<StatCondition>| RankRule {
            rank: rank.to_string(),
            all,
        };
        let cond = |stat, op, value| StatCondition { stat, op, value };
        Self {
            rules: vec![
                rule(
                    "Platinum (Dominator)",
                    vec![
                        cond(Stat::Corruption, Comparison::AtLeast, 80),
                        cond(Stat::Obedience, Comparison::AtLeast, 80),
                    ],
                ),
                rule(
                    "Platinum (Savior)",
                    vec![
                        cond(Stat::Power, Comparison::AtLeast, 100),
                        cond(Stat::Corruption, Comparison::Below, 20),
                    ],
                ),
                rule("Gold", vec![cond(Stat::Corruption, Comparison::AtLeast, 50)]),
                rule("Silver", vec![cond(Stat::Resistance, Comparison::AtMost, 20)]),
            ],
            fallback: "Bronze".to_string(),
            collapse: "F".to_string(),
        }
    }
}

impl RankTable {
    /// Grade final stats against the table.
    #[must_use]
    pub fn evaluate(&self, stats: &CoreStats) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.all.iter().all(|condition| condition.matches(stats)))
            .map_or(self.fallback.as_str(), |rule| rule.rank.as_str())
    }

    /// Rank for the given result; collapse ignores stats entirely.
    #[must_use]
    pub fn rank_for(&self, result: &RunResult, stats: &CoreStats) -> String {
        match result {
            RunResult::Collapsed => self.collapse.clone(),
            RunResult::DefeatedBy { .. } | RunResult::Cleared => self.evaluate(stats).to_string(),
        }
    }
}

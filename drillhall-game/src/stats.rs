//! Attribute schema, character sheet and clamping rules
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Upper bound for the stress meter.
pub const STRESS_MAX: i32 = 100;
/// Deepest reachable depth stage.
pub const DEPTH_MAX: u8 = 4;

/// One of the six core attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Resistance,
    Sensitivity,
    Obedience,
    Tolerance,
    Corruption,
    Power,
}

impl Stat {
    pub const ALL: [Self; 6] = [
        Self::Resistance,
        Self::Sensitivity,
        Self::Obedience,
        Self::Tolerance,
        Self::Corruption,
        Self::Power,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resistance => "resistance",
            Self::Sensitivity => "sensitivity",
            Self::Obedience => "obedience",
            Self::Tolerance => "tolerance",
            Self::Corruption => "corruption",
            Self::Power => "power",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stat| stat.as_str() == s)
            .ok_or(())
    }
}

/// Signed per-stat changes declared by actions and events.
pub type StatDeltas = BTreeMap<Stat, i32>;

/// The attribute block owned by a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CoreStats {
    #[serde(default)]
    pub resistance: i32,
    #[serde(default)]
    pub sensitivity: i32,
    #[serde(default)]
    pub obedience: i32,
    #[serde(default)]
    pub tolerance: i32,
    #[serde(default)]
    pub corruption: i32,
    #[serde(default)]
    pub power: i32,
}

impl CoreStats {
    #[must_use]
    pub const fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Resistance => self.resistance,
            Stat::Sensitivity => self.sensitivity,
            Stat::Obedience => self.obedience,
            Stat::Tolerance => self.tolerance,
            Stat::Corruption => self.corruption,
            Stat::Power => self.power,
        }
    }

    pub const fn get_mut(&mut self, stat: Stat) -> &mut i32 {
        match stat {
            Stat::Resistance => &mut self.resistance,
            Stat::Sensitivity => &mut self.sensitivity,
            Stat::Obedience => &mut self.obedience,
            Stat::Tolerance => &mut self.tolerance,
            Stat::Corruption => &mut self.corruption,
            Stat::Power => &mut self.power,
        }
    }

    /// Apply a signed change to one stat, keeping it within `[0, ceiling]`.
    pub fn adjust(&mut self, stat: Stat, delta: i32, ceiling: Option<i32>) {
        let slot = self.get_mut(stat);
        *slot = clamp_stat(slot.saturating_add(delta), ceiling);
    }

    /// Apply every delta verbatim.
    pub fn apply_deltas(&mut self, deltas: &StatDeltas, ceiling: Option<i32>) {
        for (&stat, &delta) in deltas {
            self.adjust(stat, delta, ceiling);
        }
    }

    /// Re-establish the floor (and optional ceiling) on every stat.
    pub fn clamp(&mut self, ceiling: Option<i32>) {
        for stat in Stat::ALL {
            let slot = self.get_mut(stat);
            *slot = clamp_stat(*slot, ceiling);
        }
    }

    #[must_use]
    pub fn is_within(&self, ceiling: Option<i32>) -> bool {
        Stat::ALL
            .into_iter()
            .all(|stat| clamp_stat(self.get(stat), ceiling) == self.get(stat))
    }
}

fn clamp_stat(value: i32, ceiling: Option<i32>) -> i32 {
    let floored = value.max(0);
    ceiling.map_or(floored, |max| floored.min(max.max(0)))
}

/// The trainee whose attributes the run revolves around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub max_health: i32,
    pub health: i32,
    pub stress: i32,
    pub depth: u8,
    pub stats: CoreStats,
}

impl Character {
    #[must_use]
    pub const fn is_down(&self) -> bool {
        self.health <= 0
    }

    #[must_use]
    pub const fn missing_health(&self) -> i32 {
        self.max_health.saturating_sub(self.health)
    }

    pub fn change_health(&mut self, delta: i32) {
        self.health = self.health.saturating_add(delta).clamp(0, self.max_health.max(0));
    }

    pub fn change_stress(&mut self, delta: i32) {
        self.stress = self.stress.saturating_add(delta).clamp(0, STRESS_MAX);
    }

    pub fn deepen(&mut self, by: u8, max_depth: u8) {
        self.depth = self.depth.saturating_add(by).min(max_depth.min(DEPTH_MAX));
    }

    /// True when every bounded field is inside its declared range.
    #[must_use]
    pub fn within_bounds(&self, ceiling: Option<i32>) -> bool {
        (0..=self.max_health).contains(&self.health)
            && (0..=STRESS_MAX).contains(&self.stress)
            && self.depth <= DEPTH_MAX
            && self.stats.is_within(ceiling)
    }
}

/// Secondary currency spent by higher-tier actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub ap: i32,
    pub max_ap: i32,
}

impl ResourcePool {
    pub fn spend(&mut self, amount: i32) {
        self.ap = self.ap.saturating_sub(amount.max(0)).max(0);
    }

    pub fn restore(&mut self, amount: i32) {
        self.ap = self.ap.saturating_add(amount.max(0)).min(self.max_ap);
    }
}

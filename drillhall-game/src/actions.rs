//! Training action catalog entries
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::requirements::Requirements;
use crate::stats::StatDeltas;

/// Category tag driving success-rate tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Communication,
    Training,
    Hypnosis,
    Conditioning,
}

impl ActionCategory {
    pub const ALL: [Self; 4] = [
        Self::Communication,
        Self::Training,
        Self::Hypnosis,
        Self::Conditioning,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Communication => "communication",
            Self::Training => "training",
            Self::Hypnosis => "hypnosis",
            Self::Conditioning => "conditioning",
        }
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or(())
    }
}

/// Read-only action definition consumed once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub category: ActionCategory,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default)]
    pub hp_cost_min: i32,
    #[serde(default)]
    pub hp_cost_max: i32,
    #[serde(default)]
    pub stress_delta: i32,
    #[serde(default)]
    pub stat_deltas: StatDeltas,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_gain: Option<u8>,
}

impl Action {
    /// Inclusive health-cost bounds, normalised so `min <= max`.
    #[must_use]
    pub fn hp_cost_range(&self) -> (i32, i32) {
        let lo = self.hp_cost_min.max(0);
        let hi = self.hp_cost_max.max(0);
        (lo.min(hi), lo.max(hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stat;

    #[test]
    fn action_parses_with_sparse_fields() {
        let json = r#"{
            "id": "visit",
            "category": "communication",
            "label": "Counseling",
            "requirements": { "max_stress": 90 },
            "stress_delta": -15,
            "stat_deltas": { "resistance": -3, "obedience": 1 }
        }"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.category, ActionCategory::Communication);
        assert_eq!(action.requirements.max_stress, Some(90));
        assert_eq!(action.requirements.min_ap, None);
        assert_eq!(action.stat_deltas.get(&Stat::Resistance), Some(&-3));
        assert_eq!(action.hp_cost_range(), (0, 0));
        assert!(action.depth_gain.is_none());
    }

    #[test]
    fn inverted_cost_range_is_normalised() {
        let json = r#"{
            "id": "odd",
            "category": "training",
            "label": "Odd",
            "hp_cost_min": 15,
            "hp_cost_max": 10
        }"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.hp_cost_range(), (10, 15));
    }

    #[test]
    fn category_names_parse() {
        assert_eq!("hypnosis".parse(), Ok(ActionCategory::Hypnosis));
        assert!("shopping".parse::<ActionCategory>().is_err());
    }
}

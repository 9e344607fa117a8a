//! Action eligibility checks
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::{Character, ResourcePool};

/// Gate predicates declared by an action. Absent fields are not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Requirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_ap: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_resistance: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_obedience: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_depth: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stress: Option<i32>,
}

impl Requirements {
    /// AP deducted when the action runs.
    #[must_use]
    pub fn ap_cost(&self) -> i32 {
        self.min_ap.unwrap_or(0).max(0)
    }
}

/// The first unmet requirement, carrying current value and threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RequirementFailure {
    #[error("AP shortfall ({have}/{need})")]
    ApShortfall { have: i32, need: i32 },
    #[error("Resistance too high ({have}/{max})")]
    ResistanceTooHigh { have: i32, max: i32 },
    #[error("Obedience too low ({have}/{need})")]
    ObedienceTooLow { have: i32, need: i32 },
    #[error("Depth too low (Lv.{need} required, at Lv.{have})")]
    DepthTooLow { have: u8, need: u8 },
    #[error("Stress too high ({have}/{max})")]
    StressTooHigh { have: i32, max: i32 },
}

/// Evaluate requirements in fixed order, stopping at the first failure.
///
/// # Errors
///
/// Returns the first [`RequirementFailure`] encountered.
pub fn check(
    character: &Character,
    resources: &ResourcePool,
    requirements: &Requirements,
) -> Result<(), RequirementFailure> {
    if let Some(need) = requirements.min_ap
        && resources.ap < need
    {
        return Err(RequirementFailure::ApShortfall {
            have: resources.ap,
            need,
        });
    }
    if let Some(max) = requirements.max_resistance
        && character.stats.resistance > max
    {
        return Err(RequirementFailure::ResistanceTooHigh {
            have: character.stats.resistance,
            max,
        });
    }
    if let Some(need) = requirements.min_obedience
        && character.stats.obedience < need
    {
        return Err(RequirementFailure::ObedienceTooLow {
            have: character.stats.obedience,
            need,
        });
    }
    if let Some(need) = requirements.min_depth
        && character.depth < need
    {
        return Err(RequirementFailure::DepthTooLow {
            have: character.depth,
            need,
        });
    }
    if let Some(max) = requirements.max_stress
        && character.stress > max
    {
        return Err(RequirementFailure::StressTooHigh {
            have: character.stress,
            max,
        });
    }
    Ok(())
}

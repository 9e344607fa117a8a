//! Success-rate calculation for training actions
use crate::actions::ActionCategory;
use crate::config::RulesConfig;
use crate::numbers::{floor_f64_to_pct, i32_to_f64};
use crate::stats::Character;

/// Percentage chance that an action of `category` succeeds, clamped to the
/// configured floor and ceiling.
#[must_use]
pub fn success_rate(character: &Character, category: ActionCategory, rules: &RulesConfig) -> u8 {
    let mut rate = rules.base_success_rate;

    if character.stress > rules.stress_penalty_threshold {
        let excess = character.stress.saturating_sub(rules.stress_penalty_threshold);
        rate -= i32_to_f64(excess) * rules.stress_penalty_weight;
    }

    if let Some(tuning) = rules.category(category) {
        rate += tuning.flat_bonus;
        for (&stat, &weight) in &tuning.stat_weights {
            rate += i32_to_f64(character.stats.get(stat)) * weight;
        }
        rate += i32_to_f64(character.missing_health()) * tuning.missing_health_weight;
    }

    floor_f64_to_pct(rate, rules.success_floor, rules.success_ceiling)
}

/// A roll in `[0, 100)` succeeds when strictly below the rate.
#[must_use]
pub fn roll_succeeds(roll: f64, rate: u8) -> bool {
    roll < f64::from(rate)
}

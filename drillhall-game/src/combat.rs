//! Boss combat system
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::{BossScaling, CombatRules};
use crate::numbers::{floor_f64_to_i32, i32_to_f64};
use crate::stats::{Character, CoreStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Player,
    Boss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatLogEntry {
    /// 1-based round within the current encounter.
    pub round: u32,
    pub message: String,
    pub actor: Actor,
}

/// Name and flavor for a boss; numbers come from [`BossScaling`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub description: String,
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
}

impl Enemy {
    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.hp <= 0
    }
}

/// Difficulty multiplier for the given number of cleared loops.
#[must_use]
pub fn loop_scale(loop_count: u32, scaling: &BossScaling) -> f64 {
    1.0 + f64::from(loop_count) * scaling.scale_per_loop
}

/// Build a boss from `template` scaled to `loop_count`.
#[must_use]
pub fn scale_boss(template: &BossTemplate, loop_count: u32, scaling: &BossScaling) -> Enemy {
    let scale = loop_scale(loop_count, scaling);
    let scaled = |base: i32| floor_f64_to_i32(i32_to_f64(base) * scale);
    let hp = scaled(scaling.base_hp);
    Enemy {
        name: template.name.clone(),
        description: template.description.clone(),
        hp,
        max_hp: hp,
        attack: scaled(scaling.base_attack),
        defense: scaled(scaling.base_defense),
    }
}

/// Pick a template uniformly and scale it. `None` for an empty pool.
pub fn generate_boss<R: Rng + ?Sized>(
    loop_count: u32,
    templates: &[BossTemplate],
    scaling: &BossScaling,
    rng: &mut R,
) -> Option<Enemy> {
    if templates.is_empty() {
        return None;
    }
    let template = templates.get(rng.gen_range(0..templates.len()))?;
    Some(scale_boss(template, loop_count, scaling))
}

/// Derived combat numbers for a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatStats {
    pub attack: i32,
    pub defense: i32,
}

impl CombatStats {
    #[must_use]
    pub fn from_stats(stats: &CoreStats, rules: &CombatRules) -> Self {
        let multiplier = 1.0 + i32_to_f64(stats.corruption) / 100.0;
        let attack = floor_f64_to_i32(
            i32_to_f64(stats.power) * multiplier * rules.attack_power_multiplier,
        )
        .saturating_add(rules.attack_base);
        let defense = stats
            .power
            .saturating_add(stats.sensitivity.div_euclid(2))
            .saturating_add(stats.tolerance);
        Self { attack, defense }
    }
}

/// Result of one combat round. Inputs are never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatExchange {
    pub damage_to_boss: i32,
    pub damage_to_character: i32,
    pub crit: bool,
    pub entries: SmallVec<[CombatLogEntry; 2]>,
}

/// Critical-hit chance in percent.
#[must_use]
pub fn crit_chance(stats: &CoreStats, rules: &CombatRules) -> f64 {
    if rules.crit_divisor <= 0.0 {
        return 0.0;
    }
    i32_to_f64(stats.sensitivity) / rules.crit_divisor
}

/// Roll the crit and resolve one exchange.
pub fn resolve_exchange<R: Rng + ?Sized>(
    character: &Character,
    boss: &Enemy,
    round: u32,
    rules: &CombatRules,
    rng: &mut R,
) -> CombatExchange {
    let roll = rng.r#gen::<f64>() * 100.0;
    let crit = roll < crit_chance(&character.stats, rules);
    exchange_with_crit(character, boss, round, crit, rules)
}

/// Deterministic core of an exchange with the crit outcome decided.
#[must_use]
pub fn exchange_with_crit(
    character: &Character,
    boss: &Enemy,
    round: u32,
    crit: bool,
    rules: &CombatRules,
) -> CombatExchange {
    let stats = CombatStats::from_stats(&character.stats, rules);
    let mut entries = SmallVec::new();

    let raw = (i32_to_f64(stats.attack) - i32_to_f64(boss.defense) / rules.boss_defense_divisor)
        .max(rules.damage_floor);
    let damage_to_boss = floor_f64_to_i32(if crit { raw * rules.crit_multiplier } else { raw });
    let suffix = if crit { " (critical hit!)" } else { "" };
    entries.push(CombatLogEntry {
        round,
        message: format!("{} strikes for {damage_to_boss} damage!{suffix}", character.name),
        actor: Actor::Player,
    });

    let mut damage_to_character = 0;
    if boss.hp.saturating_sub(damage_to_boss) > 0 {
        let penalty = 1.0 + i32_to_f64(character.stats.corruption) / rules.corruption_penalty_divisor;
        let counter = (i32_to_f64(boss.attack)
            - i32_to_f64(stats.defense) / rules.counter_defense_divisor)
            .max(rules.damage_floor);
        damage_to_character = floor_f64_to_i32(counter * penalty);
        entries.push(CombatLogEntry {
            round,
            message: format!("{} counters for {damage_to_character} damage.", boss.name),
            actor: Actor::Boss,
        });
    }

    CombatExchange {
        damage_to_boss,
        damage_to_character,
        crit,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::mock::StepRng;
    use rand_chacha::ChaCha20Rng;

    fn fighter(stats: CoreStats, health: i32) -> Character {
        Character {
            name: "Cadet".to_string(),
            max_health: 100,
            health,
            stress: 0,
            depth: 0,
            stats,
        }
    }

    fn boss(hp: i32, attack: i32, defense: i32) -> Enemy {
        Enemy {
            name: "Hieron".to_string(),
            description: String::new(),
            hp,
            max_hp: hp,
            attack,
            defense,
        }
    }

    #[test]
    fn combat_stats_follow_formula() {
        let stats = CoreStats {
            power: 20,
            corruption: 50,
            sensitivity: 7,
            tolerance: 4,
            ..CoreStats::default()
        };
        let derived = CombatStats::from_stats(&stats, &CombatRules::default());
        // floor(20 * 1.5 * 2) + 10
        assert_eq!(derived.attack, 70);
        // 20 + 3 + 4
        assert_eq!(derived.defense, 27);
    }

    #[test]
    fn weak_attack_hits_damage_floor() {
        let rules = CombatRules::default();
        let exchange = exchange_with_crit(
            &fighter(CoreStats::default(), 100),
            &boss(1_200, 60, 300),
            1,
            false,
            &rules,
        );
        assert_eq!(exchange.damage_to_boss, 5);
        assert_eq!(exchange.damage_to_character, 60);
        assert_eq!(exchange.entries.len(), 2);
        assert_eq!(exchange.entries[0].actor, Actor::Player);
        assert_eq!(exchange.entries[1].actor, Actor::Boss);
    }

    #[test]
    fn crit_multiplies_then_floors() {
        let rules = CombatRules::default();
        let stats = CoreStats {
            power: 1,
            ..CoreStats::default()
        };
        // attack 12, boss defense 3 -> 10.5, crit -> 15.75
        let exchange = exchange_with_crit(&fighter(stats, 100), &boss(500, 10, 3), 2, true, &rules);
        assert_eq!(exchange.damage_to_boss, 15);
        assert!(exchange.entries[0].message.contains("critical"));
        assert_eq!(exchange.entries[0].round, 2);
    }

    #[test]
    fn killing_blow_skips_counter() {
        let rules = CombatRules::default();
        let exchange = exchange_with_crit(
            &fighter(CoreStats::default(), 100),
            &boss(10, 500, 0),
            1,
            false,
            &rules,
        );
        assert_eq!(exchange.damage_to_boss, 10);
        assert_eq!(exchange.damage_to_character, 0);
        assert_eq!(exchange.entries.len(), 1);
    }

    #[test]
    fn zero_defense_takes_full_counter() {
        let rules = CombatRules::default();
        let exchange = exchange_with_crit(
            &fighter(CoreStats::default(), 12),
            &boss(1_000, 40, 0),
            1,
            false,
            &rules,
        );
        assert_eq!(exchange.damage_to_character, 40);
    }

    #[test]
    fn corruption_penalty_scales_counter() {
        let rules = CombatRules::default();
        let stats = CoreStats {
            corruption: 100,
            ..CoreStats::default()
        };
        let exchange = exchange_with_crit(&fighter(stats, 100), &boss(5_000, 60, 0), 1, false, &rules);
        assert_eq!(exchange.damage_to_character, 90);
    }

    #[test]
    fn crit_roll_uses_sensitivity() {
        let rules = CombatRules::default();
        let sharp = CoreStats {
            sensitivity: 200,
            ..CoreStats::default()
        };
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for round in 1..=20 {
            let exchange = resolve_exchange(&fighter(sharp, 100), &boss(5_000, 60, 0), round, &rules, &mut rng);
            assert!(exchange.crit);
        }
        let mut zero = StepRng::new(0, 0);
        let dull = resolve_exchange(
            &fighter(CoreStats::default(), 100),
            &boss(5_000, 60, 0),
            1,
            &rules,
            &mut zero,
        );
        assert!(!dull.crit);
    }

    #[test]
    fn bosses_scale_with_loops() {
        let templates = vec![BossTemplate {
            name: "Hieron".to_string(),
            description: "An artificial angel".to_string(),
        }];
        let scaling = BossScaling::default();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let first = generate_boss(0, &templates, &scaling, &mut rng).unwrap();
        assert_eq!((first.hp, first.attack, first.defense), (1_200, 60, 30));
        let third = generate_boss(2, &templates, &scaling, &mut rng).unwrap();
        assert_eq!((third.max_hp, third.attack, third.defense), (2_640, 132, 66));
        assert!(generate_boss(0, &[], &scaling, &mut rng).is_none());
    }
}

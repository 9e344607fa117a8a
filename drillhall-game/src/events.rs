//! Random event table
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::stats::StatDeltas;

/// Flavor perturbation drawn after most commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomEvent {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub hp_min: i32,
    #[serde(default)]
    pub hp_max: i32,
    #[serde(default)]
    pub stress_delta: i32,
    #[serde(default)]
    pub stat_deltas: StatDeltas,
}

/// Concrete effect of one resolved event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEffect {
    pub health_delta: i32,
    pub stress_delta: i32,
    pub stat_deltas: StatDeltas,
}

impl RandomEvent {
    /// Draw the health delta uniformly from the declared range; stat and
    /// stress deltas are copied verbatim.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> EventEffect {
        let lo = self.hp_min.min(self.hp_max);
        let hi = self.hp_min.max(self.hp_max);
        EventEffect {
            health_delta: rng.gen_range(lo..=hi),
            stress_delta: self.stress_delta,
            stat_deltas: self.stat_deltas.clone(),
        }
    }
}

/// Uniformly-weighted event pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventCatalog {
    pub events: Vec<RandomEvent>,
}

impl EventCatalog {
    #[must_use]
    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    #[must_use]
    pub fn from_events(events: Vec<RandomEvent>) -> Self {
        Self { events }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RandomEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Pick one entry uniformly. `None` when the pool is empty.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&RandomEvent> {
        if self.events.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.events.len());
        self.events.get(idx)
    }

    /// Trigger with `probability`, then pick uniformly.
    pub fn roll<R: Rng + ?Sized>(&self, probability: f64, rng: &mut R) -> Option<&RandomEvent> {
        let chance = probability.clamp(0.0, 1.0);
        if rng.r#gen::<f64>() >= chance {
            return None;
        }
        self.pick(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stat;
    use rand::SeedableRng;
    use rand::rngs::mock::StepRng;
    use rand_chacha::ChaCha20Rng;

    fn trip() -> RandomEvent {
        RandomEvent {
            id: "trip".to_string(),
            message: "Tripped during drills.".to_string(),
            hp_min: -10,
            hp_max: -5,
            stress_delta: 5,
            stat_deltas: StatDeltas::from([(Stat::Resistance, -1)]),
        }
    }

    fn catalog() -> EventCatalog {
        EventCatalog::from_events(vec![
            trip(),
            RandomEvent {
                id: "rain".to_string(),
                message: "Sudden shower.".to_string(),
                hp_min: -5,
                hp_max: 0,
                stress_delta: 5,
                stat_deltas: StatDeltas::new(),
            },
        ])
    }

    #[test]
    fn resolve_stays_inside_health_range() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let event = trip();
        for _ in 0..200 {
            let effect = event.resolve(&mut rng);
            assert!((-10..=-5).contains(&effect.health_delta));
            assert_eq!(effect.stress_delta, 5);
            assert_eq!(effect.stat_deltas.get(&Stat::Resistance), Some(&-1));
        }
    }

    #[test]
    fn roll_respects_probability_edges() {
        let events = catalog();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        for _ in 0..50 {
            assert!(events.roll(0.0, &mut rng).is_none());
            assert!(events.roll(1.0, &mut rng).is_some());
        }
    }

    #[test]
    fn empty_catalog_never_yields() {
        let mut rng = StepRng::new(0, 0);
        assert!(EventCatalog::empty().roll(1.0, &mut rng).is_none());
    }

    #[test]
    fn pick_covers_every_entry() {
        let events = catalog();
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..100 {
            if let Some(event) = events.pick(&mut rng) {
                seen.insert(event.id.clone());
            }
        }
        assert_eq!(seen.len(), 2);
        assert!(events.get("rain").is_some());
    }
}

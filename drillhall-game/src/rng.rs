//! Seeded randomness segregated by engine domain.
use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use sha2::Sha256;

/// Deterministic set of RNG streams, one per concern, so that adding a draw
/// in one domain never shifts the others.
#[derive(Debug, Clone)]
pub struct RngStreams {
    seed: u64,
    action: CountingRng<SmallRng>,
    event: CountingRng<SmallRng>,
    combat: CountingRng<SmallRng>,
    boss: CountingRng<SmallRng>,
}

impl RngStreams {
    /// Construct the streams from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            seed,
            action: CountingRng::new(derive_stream_seed(seed, b"action")),
            event: CountingRng::new(derive_stream_seed(seed, b"event")),
            combat: CountingRng::new(derive_stream_seed(seed, b"combat")),
            boss: CountingRng::new(derive_stream_seed(seed, b"boss")),
        }
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Health costs, success rolls, stat magnitudes and depth rolls.
    pub fn action(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.action
    }

    /// Event triggers, overload coin flips, event picks and rest recovery.
    pub fn event(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.event
    }

    /// Critical-hit rolls.
    pub fn combat(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.combat
    }

    /// Boss template selection.
    pub fn boss(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.boss
    }

    /// Total draws across all streams.
    #[must_use]
    pub const fn total_draws(&self) -> u64 {
        self.action
            .draws()
            .saturating_add(self.event.draws())
            .saturating_add(self.combat.draws())
            .saturating_add(self.boss.draws())
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

//! Randomized delay sampling.
//!
//! Every pause is drawn fresh from the RNG; nothing is precomputed, so two
//! dispatches of the same list never share a timing profile.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use nexus_shared::DispatchConfig;

use crate::plan::Pause;

/// Delay sampler for the dispatch pacing policy.
#[derive(Debug)]
pub struct Pacer {
    rng: StdRng,
    delay_min: Duration,
    delay_max: Duration,
    same_host_extra: Duration,
    progressive_increment: Duration,
    jitter_min: Duration,
    jitter_max: Duration,
    settle_jitter_min: Duration,
    settle_jitter_max: Duration,
}

impl Pacer {
    pub fn new(config: &DispatchConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic sequence for reproducible runs.
    pub fn seeded(config: &DispatchConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &DispatchConfig, rng: StdRng) -> Self {
        Self {
            rng,
            delay_min: config.delay_min,
            delay_max: config.delay_max,
            same_host_extra: config.same_host_extra_delay,
            progressive_increment: config.progressive_delay_increment,
            jitter_min: config.jitter_min,
            jitter_max: config.jitter_max,
            settle_jitter_min: config.settle_jitter_min,
            settle_jitter_max: config.settle_jitter_max,
        }
    }

    /// Sample the duration of `pause`.
    pub fn delay(&mut self, pause: Pause) -> Duration {
        match pause {
            Pause::InterGroup { known_host } => {
                let extra = if known_host {
                    self.same_host_extra
                } else {
                    Duration::ZERO
                };
                self.base() + extra + self.uniform(self.jitter_min, self.jitter_max)
            }
            Pause::Settle => {
                self.base()
                    + self.same_host_extra
                    + self.uniform(self.settle_jitter_min, self.settle_jitter_max)
            }
            Pause::SubBatch(index) => {
                let step = u32::try_from(index).unwrap_or(u32::MAX);
                (self.base() + self.same_host_extra)
                    .saturating_add(self.progressive_increment.saturating_mul(step))
            }
        }
    }

    fn base(&mut self) -> Duration {
        self.uniform(self.delay_min, self.delay_max)
    }

    fn uniform(&mut self, min: Duration, max: Duration) -> Duration {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..=max)
    }
}

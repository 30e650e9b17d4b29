//! Seeded random source and the dice the behavior engine rolls
//!
//! Every random decision goes through the scheduler's `SimRng`, so a seed fully
//! determines a run.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub type SimRng = ChaCha8Rng;

pub fn seeded(seed: u64) -> SimRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// True with probability `chance`. 0.0 never fires, 1.0 always does.
pub fn roll<R: Rng>(rng: &mut R, chance: f64) -> bool {
    rng.gen::<f64>() < chance
}

/// Uniform integer in `[min, max]`
pub fn amount_in<R: Rng>(rng: &mut R, min: u32, max: u32) -> u32 {
    if min >= max {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Uniform pick from a slice
pub fn pick<'a, T, R: Rng>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    items.choose(rng)
}

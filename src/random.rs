//! Random number generator setup shared by the generators.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// A reproducible generator for `Some(seed)`, an OS-seeded one otherwise.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

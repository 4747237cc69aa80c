//! Seeded random streams.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use siphasher::sip::SipHasher13;

/// Seeded `StdRng` that remembers its seed.
///
/// Named child streams are forked from the seed alone, so forking never
/// consumes output and the children do not depend on fork order.
#[derive(Debug, Clone)]
pub struct RngHandle {
    seed: u64,
    rng: StdRng,
}

impl RngHandle {
    /// Stream seeded directly from `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed this stream was built from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Independent stream named `label`.
    pub fn fork(&self, label: &str) -> Self {
        Self::from_seed(derive_substream_seed(self.seed, label))
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Seed of the stream `label` under `master_seed`: SipHash-1-3 with zero keys
/// over the seed followed by the label bytes.
pub fn derive_substream_seed(master_seed: u64, label: &str) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write(label.as_bytes());
    hasher.finish()
}

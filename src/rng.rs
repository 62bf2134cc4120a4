use std::collections::HashMap;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Hands out one independent ChaCha stream per name. A stream's seed depends
/// only on the master seed and the name, so adding a phase never shifts the
/// draws of the others.
#[derive(Debug, Clone)]
pub struct RngManager {
    seed: u64,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            streams: HashMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stream(&mut self, name: &str) -> StreamRng<'_> {
        let seed = self.seed;
        let entry = self
            .streams
            .entry(name.to_string())
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(derive_seed(seed, name)));
        StreamRng { inner: entry }
    }
}

/// FNV-1a over the stream name, folded into the master seed.
fn derive_seed(seed: u64, name: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    seed ^ hash
}

pub struct StreamRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for StreamRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_same_draws() {
        let mut a = RngManager::new(7);
        let mut b = RngManager::new(7);
        let xs: Vec<u32> = (0..8).map(|_| a.stream("movement").gen()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.stream("movement").gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn streams_do_not_depend_on_first_use_order() {
        let mut a = RngManager::new(7);
        let mut b = RngManager::new(7);
        let _: u64 = a.stream("attack").gen();
        let from_a: u64 = a.stream("respawn").gen();
        let from_b: u64 = b.stream("respawn").gen();
        assert_eq!(from_a, from_b);
    }
}

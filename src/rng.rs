use std::collections::HashMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Stream used for the initial grid layout.
pub const LAYOUT_STREAM: &str = "layout";
/// Stream shared by every phase of every round, in phase order.
pub const ROUND_STREAM: &str = "rounds";

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

    /// Returns the named stream, creating it on first use. A stream's seed
    /// depends only on the master seed and the name, never on the order in
    /// which streams are requested.
    pub fn stream(&mut self, name: &str) -> SystemRng<'_> {
        let seed = self.seed;
        let entry = self
            .streams
            .entry(name.to_string())
            .or_insert_with(|| ChaCha8Rng::seed_from_u64(derive_seed(seed, name)));
        SystemRng { inner: entry }
    }
}

fn derive_seed(master: u64, name: &str) -> u64 {
    // FNV-1a over the name, then LCG mixing with the master seed.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in name.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let mut seed = master;
    seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    seed ^= hash;
    seed.wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407)
}

pub struct SystemRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for SystemRng<'a> {
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

/// Bernoulli draws against a probability. Probabilities at or above 1 always
/// succeed, at or below 0 never do.
pub trait Draw {
    fn chance(&mut self, probability: f64) -> bool;
}

impl<R: Rng + ?Sized> Draw for R {
    fn chance(&mut self, probability: f64) -> bool {
        self.gen::<f64>() < probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = RngManager::new(42);
        let mut b = RngManager::new(42);

        let x: u64 = a.stream(ROUND_STREAM).gen();
        let y: u64 = b.stream(ROUND_STREAM).gen();
        assert_eq!(x, y);
    }

    #[test]
    fn stream_seed_ignores_request_order() {
        let mut a = RngManager::new(7);
        let _: u64 = a.stream(LAYOUT_STREAM).gen();
        let x: u64 = a.stream(ROUND_STREAM).gen();

        let mut b = RngManager::new(7);
        let y: u64 = b.stream(ROUND_STREAM).gen();

        assert_eq!(x, y);
    }

    #[test]
    fn named_streams_differ() {
        let mut rng = RngManager::new(7);
        let x: u64 = rng.stream(LAYOUT_STREAM).gen();
        let y: u64 = rng.stream(ROUND_STREAM).gen();
        assert_ne!(x, y);
    }

    #[test]
    fn stream_state_persists_between_borrows() {
        let mut rng = RngManager::new(3);
        let first: u64 = rng.stream(ROUND_STREAM).gen();
        let second: u64 = rng.stream(ROUND_STREAM).gen();
        assert_ne!(first, second);
    }

    #[test]
    fn chance_saturates() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!((0..1_000).all(|_| rng.chance(1.0)));
        assert!((0..1_000).all(|_| rng.chance(1.7)));
        assert!((0..1_000).all(|_| !rng.chance(0.0)));
    }
}

//! Cryptographically strong randomness for everything player-facing: the
//! battle coin flip, growth sign and magnitude, and the daily-winner draw.
//! Predictable randomness here would be exploitable, so the source is
//! `ring::rand::SystemRandom` rather than a seeded PRNG.

use ring::rand::{SecureRandom, SystemRandom};

pub struct Rng {
    inner: SystemRandom,
}

impl Default for Rng {
    fn default() -> Self {
        Self::new()
    }
}

impl Rng {
    pub fn new() -> Self {
        Self {
            inner: SystemRandom::new(),
        }
    }

    fn next_u64(&self) -> u64 {
        let mut buf = [0u8; 8];
        self.inner
            .fill(&mut buf)
            .expect("system rng unavailable");
        u64::from_le_bytes(buf)
    }

    pub fn coin_flip(&self) -> bool {
        self.next_u64() & 1 == 0
    }

    /// Uniform integer in the inclusive range `[min, max]`, free of modulo
    /// bias via rejection sampling.
    pub fn range_i64(&self, min: i64, max: i64) -> i64 {
        debug_assert!(min <= max);
        let span = (max as i128 - min as i128 + 1) as u64;
        if span == 0 {
            // the range covers the whole u64 domain
            return self.next_u64() as i64;
        }
        let zone = u64::MAX - (u64::MAX % span);
        loop {
            let v = self.next_u64();
            if v < zone {
                return (min as i128 + (v % span) as i128) as i64;
            }
        }
    }

    /// Uniform draw in `[0, 1)` with 53 bits of precision.
    pub fn uniform_f64(&self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn range_stays_inclusive() {
        let rng = Rng::new();
        let mut seen_min = false;
        let mut seen_max = false;
        for _ in 0..2000 {
            let v = rng.range_i64(-3, 3);
            assert!((-3..=3).contains(&v));
            seen_min |= v == -3;
            seen_max |= v == 3;
        }
        assert!(seen_min && seen_max);
    }

    #[test]
    fn degenerate_range_is_constant() {
        let rng = Rng::new();
        for _ in 0..50 {
            assert_eq!(rng.range_i64(7, 7), 7);
        }
    }

    #[test]
    fn uniform_f64_is_a_half_open_unit_draw() {
        let rng = Rng::new();
        for _ in 0..2000 {
            let v = rng.uniform_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn coin_flip_lands_on_both_sides() {
        let rng = Rng::new();
        let heads = (0..2000).filter(|_| rng.coin_flip()).count();
        assert!((400..=1600).contains(&heads), "suspicious flip count: {heads}");
    }
}

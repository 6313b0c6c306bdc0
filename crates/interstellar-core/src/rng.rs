use std::ops::{Range, RangeInclusive};

/// Randomness source for galaxy generation and combat.
///
/// Only `next_u64` is required. Everything else derives from it, so a seeded
/// implementation makes a whole game reproducible. Test doubles may override
/// `roll_d6` directly to script combat.
pub trait GameRandom {
    fn next_u64(&mut self) -> u64;

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform integer in `[start, end)`. An empty range yields `start`.
    fn gen_range_u32(&mut self, range: Range<u32>) -> u32 {
        let Range { start, end } = range;
        if end <= start {
            return start;
        }
        let span = u64::from(end - start);
        // Rejection sampling keeps the result unbiased.
        let threshold = u64::MAX - (u64::MAX % span);
        loop {
            let x = self.next_u64();
            if x < threshold {
                return start + (x % span) as u32;
            }
        }
    }

    fn gen_range_inclusive(&mut self, range: RangeInclusive<u32>) -> u32 {
        let (start, end) = range.into_inner();
        if end < start {
            return start;
        }
        match end.checked_add(1) {
            Some(stop) => self.gen_range_u32(start..stop),
            None if start == 0 => self.next_u32(),
            None => self.gen_range_u32(start - 1..end) + 1,
        }
    }

    /// Uniform float in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64 {
        // Top 53 bits fill the mantissa.
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn gen_range_f64(&mut self, range: Range<f64>) -> f64 {
        range.start + self.next_f64() * (range.end - range.start)
    }

    /// One six-sided die, `1..=6`.
    fn roll_d6(&mut self) -> u8 {
        self.gen_range_u32(1..7) as u8
    }
}

impl<R: GameRandom + ?Sized> GameRandom for &mut R {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }

    fn roll_d6(&mut self) -> u8 {
        (**self).roll_d6()
    }
}

/// Deterministic PRNG with 256-bit state.
///
/// This is `xoshiro256**` seeded via SplitMix64. It is **not** cryptographic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameRng {
    state: [u64; 4],
}

impl GameRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut sm = SplitMix64 { state: seed };
        Self {
            state: [sm.next(), sm.next(), sm.next(), sm.next()],
        }
    }

    /// Seeded from the operating system, for production games.
    pub fn from_entropy() -> Self {
        Self::seed_from_u64(rand::random())
    }
}

impl GameRandom for GameRng {
    fn next_u64(&mut self) -> u64 {
        let result = self.state[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);

        let t = self.state[1] << 17;

        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];

        self.state[2] ^= t;

        self.state[3] = self.state[3].rotate_left(45);

        result
    }
}

struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn next(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = GameRng::seed_from_u64(7);
        let mut b = GameRng::seed_from_u64(7);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn ranges_stay_in_bounds() {
        let mut rng = GameRng::seed_from_u64(99);
        for _ in 0..1_000 {
            let v = rng.gen_range_inclusive(20..=30);
            assert!((20..=30).contains(&v));

            let f = rng.gen_range_f64(-500.0..500.0);
            assert!((-500.0..500.0).contains(&f));

            let die = rng.roll_d6();
            assert!((1..=6).contains(&die));
        }
    }

    #[test]
    fn every_die_face_shows_up() {
        let mut rng = GameRng::seed_from_u64(3);
        let mut seen = [false; 6];
        for _ in 0..600 {
            seen[usize::from(rng.roll_d6() - 1)] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn degenerate_ranges_do_not_loop() {
        let mut rng = GameRng::seed_from_u64(1);
        assert_eq!(rng.gen_range_u32(5..5), 5);
        assert_eq!(rng.gen_range_inclusive(4..=4), 4);
        assert!(rng.gen_range_inclusive(u32::MAX - 1..=u32::MAX) >= u32::MAX - 1);
    }
}

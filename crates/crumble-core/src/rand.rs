//! Lightweight xorshift32 PRNG — no external crate needed

pub struct EffectRng {
    state: u32,
}

impl EffectRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Returns a float in [0, 1)
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Returns a float in [min, max)
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }

    /// Returns an integer in [0, n); 0 when n is 0
    pub fn below(&mut self, n: i32) -> i32 {
        if n <= 0 {
            return 0;
        }
        (self.next_u32() % n as u32) as i32
    }

    /// Returns an integer in [min, max] inclusive
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        min + self.below(max - min + 1)
    }

    /// One-in-n chance
    pub fn one_in(&mut self, n: i32) -> bool {
        self.below(n) == 0
    }

    /// Picks a uniformly random element of a non-empty slice
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len() as i32) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_range_bounds() {
        let mut rng = EffectRng::new(42);
        for _ in 0..1000 {
            let v = rng.range(0.0, 10.0);
            assert!((0.0..10.0).contains(&v));
        }
    }

    #[test]
    fn rng_int_range_inclusive() {
        let mut rng = EffectRng::new(7);
        let mut hit_min = false;
        let mut hit_max = false;
        for _ in 0..2000 {
            let v = rng.range_i32(3, 6);
            assert!((3..=6).contains(&v));
            hit_min |= v == 3;
            hit_max |= v == 6;
        }
        assert!(hit_min && hit_max);
    }

    #[test]
    fn rng_degenerate_ranges() {
        let mut rng = EffectRng::new(9);
        assert_eq!(rng.below(0), 0);
        assert_eq!(rng.range_i32(5, 5), 5);
        assert_eq!(rng.range_i32(5, 2), 5);
    }

    #[test]
    fn rng_one_in_distribution() {
        let mut rng = EffectRng::new(1234);
        let hits = (0..10_000).filter(|_| rng.one_in(10)).count();
        // ~1000 expected; keep the band wide, this is a smoke test
        assert!(hits > 600 && hits < 1400, "hits = {hits}");
    }

    #[test]
    fn rng_pick_covers_all() {
        let mut rng = EffectRng::new(5);
        let items = [0.3f32, 0.6, 1.0];
        let mut seen = [false; 3];
        for _ in 0..200 {
            let v = *rng.pick(&items);
            seen[items.iter().position(|i| *i == v).unwrap()] = true;
        }
        assert_eq!(seen, [true, true, true]);
    }
}

//! Particle lifetime policy: strips revealed early live shorter

use crumble_core::EffectRng;

/// Maps a particle's strip index to a randomized lifetime in milliseconds.
///
/// Pluggable per attach: any implementation with this signature can replace
/// the default (tests substitute a fast policy to shrink wall-clock time).
pub trait ParticleLifetime: Send + Sync {
    /// Shortest lifetime the policy can produce, in milliseconds
    fn min_duration(&self) -> i32;

    /// Longest lifetime the policy can produce, in milliseconds.
    /// Also bounds the post-reveal tail of an instance.
    fn max_duration(&self) -> i32;

    /// How strongly the strip index tightens the range, in milliseconds
    fn line_sensitivity(&self) -> i32;

    /// Lifetime for a particle spawned on strip `line` of `max_line` total.
    ///
    /// Early strips (small `line`) get the full reduction, shrinking both the
    /// base and the random range ceiling; late strips get the full range.
    fn calculate(&self, line: u32, max_line: u32, rng: &mut EffectRng) -> i32 {
        let reduction = if max_line == 0 {
            0
        } else {
            ((max_line - line) as f32 / max_line as f32 * self.line_sensitivity() as f32) as i32
        };
        let span = self.max_duration() - self.min_duration() - reduction;
        self.min_duration() + reduction + rng.range_i32(0, span)
    }
}

/// Default lifetime policy with tunable bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeLifetime {
    pub min_ms: i32,
    pub max_ms: i32,
    pub line_sensitivity_ms: i32,
}

impl Default for RangeLifetime {
    fn default() -> Self {
        Self {
            min_ms: 1400,
            max_ms: 2800,
            line_sensitivity_ms: 600,
        }
    }
}

impl ParticleLifetime for RangeLifetime {
    fn min_duration(&self) -> i32 {
        self.min_ms
    }

    fn max_duration(&self) -> i32 {
        self.max_ms
    }

    fn line_sensitivity(&self) -> i32 {
        self.line_sensitivity_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_stays_within_policy_bounds() {
        let policy = RangeLifetime::default();
        let mut rng = EffectRng::new(42);
        for line in 0..20 {
            let ms = policy.calculate(line, 20, &mut rng);
            assert!(ms >= policy.min_ms, "line {line}: {ms}");
            assert!(ms <= policy.max_ms, "line {line}: {ms}");
        }
    }

    #[test]
    fn early_strips_have_tighter_shorter_ranges() {
        let policy = RangeLifetime::default();
        let mut rng = EffectRng::new(7);
        // Strip 0 of 10: reduction = 600, so range is [2000, 2800].
        for _ in 0..500 {
            let ms = policy.calculate(0, 10, &mut rng);
            assert!((2000..=2800).contains(&ms), "{ms}");
        }
        // Strip 10 of 10: reduction = 0, range is [1400, 2800].
        let mut saw_short = false;
        for _ in 0..500 {
            let ms = policy.calculate(10, 10, &mut rng);
            assert!((1400..=2800).contains(&ms), "{ms}");
            saw_short |= ms < 2000;
        }
        assert!(saw_short);
    }

    #[test]
    fn zero_max_line_does_not_divide() {
        let policy = RangeLifetime::default();
        let mut rng = EffectRng::new(3);
        let ms = policy.calculate(0, 0, &mut rng);
        assert!((policy.min_ms..=policy.max_ms).contains(&ms));
    }

    #[test]
    fn custom_policy_substitutes() {
        struct Fixed;
        impl ParticleLifetime for Fixed {
            fn min_duration(&self) -> i32 {
                50
            }
            fn max_duration(&self) -> i32 {
                50
            }
            fn line_sensitivity(&self) -> i32 {
                0
            }
        }
        let mut rng = EffectRng::new(1);
        assert_eq!(Fixed.calculate(3, 8, &mut rng), 50);
    }
}

//! Closed-form particle kinematics
//!
//! A particle's position, radius and alpha are pure functions of its elapsed
//! lifetime; nothing is integrated frame-to-frame, so variable deltas cannot
//! accumulate error.

use crumble_core::{Density, EffectRng, Point, Rgba};

/// Absolute grow-in window after spawn, in milliseconds
const GROW_MS: f32 = 200.0;

/// Largest radius a particle may show while shrinking
const SHRINK_CAP: f32 = 15.0;

/// Initial alpha is the pixel's alpha capped by a random step
const ALPHA_STEPS: [f32; 3] = [0.3, 0.6, 1.0];

/// One sprite of the disintegration field.
///
/// Creation-time values are immutable; `x`/`y`/`radius`/`alpha` are
/// recomputed on every `update` from elapsed time alone.
pub struct Particle {
    origin_x: i32,
    origin_y: i32,
    initial_radius: f32,
    color: Rgba,
    lifetime_ms: f32,
    initial_alpha: u8,
    velocity_y: f32,
    translation_x: f32,
    translation_y: f32,

    time_ms: f32,
    x: f32,
    y: f32,
    radius: f32,
    alpha: u8,
}

impl Particle {
    /// Spawn a particle for a sampled source pixel.
    ///
    /// `stride` is the sampling step (bounds the base radius); `density`
    /// scales the dp-specified velocity and drift targets.
    pub fn spawn(
        x: i32,
        y: i32,
        color: Rgba,
        lifetime_ms: f32,
        stride: u32,
        density: Density,
        rng: &mut EffectRng,
    ) -> Self {
        let initial_alpha = random_initial_alpha(color, rng);
        let initial_radius = random_radius(stride, rng);
        Self {
            origin_x: x,
            origin_y: y,
            initial_radius,
            color,
            lifetime_ms,
            initial_alpha,
            velocity_y: random_velocity(density, rng),
            translation_y: random_translation(32.0, density, rng),
            translation_x: random_translation(96.0, density, rng),
            time_ms: 0.0,
            x: x as f32,
            y: y as f32,
            radius: initial_radius,
            alpha: initial_alpha,
        }
    }

    /// Advance by `delta_ms` and recompute position/radius/alpha.
    ///
    /// `offset` places the source bitmap on the surface, `center` is the
    /// bitmap center in source space, and `reveal` in [0, 1] is the strip
    /// cursor progress — motion intensity ramps up as the reveal advances.
    ///
    /// Returns `false` once the lifetime has elapsed; a dead particle stays
    /// dead and contributes nothing to the frame.
    pub fn update(&mut self, delta_ms: f32, offset: Point, center: Point, reveal: f32) -> bool {
        self.time_ms += delta_ms;
        let fraction = self.time_ms / self.lifetime_ms;
        if fraction >= 1.0 {
            return false;
        }
        let effect = reveal.min(1.0).sqrt();
        let (cx, cy) = (center.x as f32, center.y as f32);
        let (ox, oy) = (self.origin_x as f32, self.origin_y as f32);

        self.y = offset.y as f32 + oy + (oy - cy) / cy * self.translation_y * fraction * effect;
        self.y -= (fraction * self.velocity_y).powi(2) * effect.sqrt();

        self.x = offset.x as f32 + ox + (ox - cx) / cx * self.translation_x * fraction * effect;

        let grow_fraction = self.time_ms / GROW_MS;
        let mut r = self.initial_radius * 1.2;
        if grow_fraction > 1.0 {
            let shrink = (self.time_ms - GROW_MS) / (self.lifetime_ms - GROW_MS);
            r = SHRINK_CAP.min(r * (1.0 - shrink));
        } else {
            let original = r.max(self.initial_radius);
            r = original - (original - r) * grow_fraction;
        }
        self.radius = r;
        self.alpha = (f32::from(self.initial_alpha) * (1.2 - fraction).min(1.0)) as u8;
        true
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn lifetime_ms(&self) -> f32 {
        self.lifetime_ms
    }
}

fn random_initial_alpha(color: Rgba, rng: &mut EffectRng) -> u8 {
    let step = (*rng.pick(&ALPHA_STEPS) * 255.0) as u8;
    color.a.min(step)
}

fn random_velocity(density: Density, rng: &mut EffectRng) -> f32 {
    let base = density.dp(4.0);
    (base + rng.below(base)) as f32
}

/// Magnitude in [min_dp, min_dp + 56dp); flips negative one time in ten,
/// and a negative excursion is quartered (drift is intentionally asymmetric).
fn random_translation(min_dp: f32, density: Density, rng: &mut EffectRng) -> f32 {
    let mut t = (density.dp(min_dp) + rng.below(density.dp(56.0))) as f32;
    if rng.one_in(10) {
        t = -t / 4.0;
    }
    t
}

fn random_radius(stride: u32, rng: &mut EffectRng) -> f32 {
    rng.range_i32(stride as i32 / 4, stride as i32) as f32
}

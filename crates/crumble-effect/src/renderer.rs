//! Per-instance strip-reveal state machine
//!
//! Owns one captured bitmap and its particle field. Each tick the render
//! loop first asks the renderer to reveal more strips (rate-limited,
//! amortized), then to composite its still-unrevealed bitmap remainder plus
//! every live particle into the shared frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use crumble_core::{EffectRng, PixelBuffer, Point, Rect};

use crate::capture::{SourceCapture, TranslationSource};
use crate::config::EffectConfig;
use crate::draw::DrawTarget;
use crate::particle::Particle;

/// Source pixels at or below this alpha spawn no particle
const ALPHA_THRESHOLD: u8 = 10;

/// How long the source element's live translation is carried over, in ms
const TRANSLATION_WINDOW_MS: f32 = 120.0;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for one attached effect instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u64);

/// Renders one disintegrating element.
///
/// State machine over the reveal cursor `line`: Revealing (strips are being
/// sampled into particles) → Revealed (cursor frozen at `max_line`, tail
/// runs until the last possible particle is dead) → finished (`draw`
/// returns `false` and the loop prunes the instance).
pub struct EffectRenderer {
    id: InstanceId,
    config: EffectConfig,
    rng: EffectRng,

    bitmap: PixelBuffer,
    offset: Point,
    center: Point,
    src: Rect,
    dst: Rect,

    particles: Vec<Particle>,
    capacity: usize,
    stride: u32,
    max_line: u32,
    line: u32,
    animated_line_width: u32,
    weight: i32,

    time_ms: f32,
    line_delay_ms: f32,
    next_reveal_at_ms: f32,
    reveal_completed_at: Option<f32>,
    max_lifetime_ms: f32,

    translation: Option<Weak<dyn TranslationSource>>,
    on_first_frame: Option<Box<dyn FnOnce() + Send>>,
}

impl EffectRenderer {
    /// Create a renderer for a capture.
    ///
    /// `sum_of_pending_weights` is the accumulated weight of sibling
    /// instances; it widens the sampling stride so the total particle count
    /// stays bounded when many effects run at once. `default_line_delay_ms`
    /// is the surface's target frame interval, used when the config does not
    /// pin an inter-strip delay.
    pub fn new(
        capture: SourceCapture,
        translation: Option<Weak<dyn TranslationSource>>,
        surface_origin: Point,
        sum_of_pending_weights: i32,
        default_line_delay_ms: f32,
        config: EffectConfig,
        on_first_frame: Option<Box<dyn FnOnce() + Send>>,
    ) -> Self {
        let id = InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed));
        let (width, height) = (capture.width(), capture.height());

        let offset = Point::new(
            capture.screen_x - surface_origin.x - capture.translation_x as i32,
            capture.screen_y - surface_origin.y - capture.translation_y as i32,
        );

        let weight = calculate_weight(&capture, &config);
        let stride = config.stride + 2 * sum_of_pending_weights.max(0) as u32;
        let capacity = (width * height / (stride * stride)) as usize;
        // A capture too small to fill even one particle slot has nothing to
        // reveal; treating it as zero strips completes it on the first tick.
        let max_line = if capacity == 0 { 0 } else { width / stride };

        let seed = config.seed.unwrap_or_else(|| {
            (id.0 as u32 ^ 0x9E37_79B9)
                .wrapping_mul(0x85EB_CA6B)
                .wrapping_add(width.wrapping_mul(31).wrapping_add(height))
        });

        let line_delay_ms = config.line_delay_ms.unwrap_or(default_line_delay_ms);
        let max_lifetime_ms = config.lifetime.max_duration() as f32;

        log::debug!(
            "instance {}: {}x{} stride {} capacity {} strips {} weight {}",
            id.0,
            width,
            height,
            stride,
            capacity,
            max_line,
            weight
        );

        Self {
            id,
            config,
            rng: EffectRng::new(seed),
            bitmap: capture.pixels,
            offset,
            center: Point::new(width as i32 / 2, height as i32 / 2),
            src: Rect::from_size(0, 0, width as i32, height as i32),
            dst: Rect::from_size(offset.x, offset.y, width as i32, height as i32),
            particles: Vec::with_capacity(capacity),
            capacity,
            stride,
            max_line,
            line: 0,
            animated_line_width: 0,
            weight,
            time_ms: 0.0,
            line_delay_ms,
            next_reveal_at_ms: 0.0,
            reveal_completed_at: None,
            max_lifetime_ms,
            translation,
            on_first_frame,
        }
    }

    /// Reveal the next strips if the inter-strip delay has elapsed.
    ///
    /// Reveals a per-tick quota of non-empty strips; strips with no
    /// qualifying pixel advance the cursor without consuming quota. Marks
    /// the reveal complete (once) when the cursor reaches the end or the
    /// particle storage fills.
    pub fn advance_reveal(&mut self) {
        if self.time_ms < self.next_reveal_at_ms {
            return;
        }
        if self.line >= self.max_line {
            self.complete_reveal();
            return;
        }

        let quota = self.strips_per_tick();
        let mut revealed = 0;
        while revealed < quota && self.line < self.max_line {
            let x = self.line * self.stride;
            self.animated_line_width = x;
            self.update_src_window();

            let mut on_this_line = 0;
            let mut y = 0;
            while y < self.bitmap.height() {
                if self.bitmap.alpha(x, y) <= ALPHA_THRESHOLD {
                    y += self.stride;
                    continue;
                }
                on_this_line += 1;
                let color = self.bitmap.pixel(x, y);
                let lifetime =
                    self.config
                        .lifetime
                        .calculate(self.line, self.max_line, &mut self.rng);
                self.particles.push(Particle::spawn(
                    x as i32,
                    y as i32,
                    color,
                    lifetime as f32,
                    self.stride,
                    self.config.density,
                    &mut self.rng,
                ));
                if self.particles.len() >= self.capacity {
                    self.complete_reveal();
                    return;
                }
                y += self.stride;
            }
            self.line += 1;
            if on_this_line > 0 {
                revealed += 1;
            }
        }

        if self.line >= self.max_line {
            self.complete_reveal();
        } else {
            self.next_reveal_at_ms = self.time_ms + self.line_delay_ms;
        }
    }

    /// Composite this instance into the frame.
    ///
    /// Returns `false` once the reveal is complete and the tail has elapsed
    /// (every spawned particle is guaranteed dead); the caller then drops
    /// the instance.
    pub fn draw(&mut self, target: &mut dyn DrawTarget, delta_ms: f32) -> bool {
        self.time_ms += delta_ms;

        let tx = self.carry_over_translation();

        if self.animated_line_width < self.bitmap.width() {
            let mut dst = self.dst;
            let shift = tx as i32;
            dst.left += shift;
            dst.right += shift;
            target.draw_image(&self.bitmap, self.src, dst);
        }

        let reveal = self.line as f32 / self.max_line.max(1) as f32;
        let rects = self.config.draw_rect_particles;
        for p in &mut self.particles {
            if !p.update(delta_ms, self.offset, self.center, reveal) {
                continue;
            }
            let color = p.color().with_alpha(p.alpha());
            let (x, r) = (p.x() + tx, p.radius());
            if rects {
                target.fill_rect(x - r, p.y() - r, x + r, p.y() + r, color);
            } else {
                target.fill_circle(x, p.y(), r, color);
            }
        }

        if let Some(callback) = self.on_first_frame.take() {
            callback();
        }

        match self.reveal_completed_at {
            None => true,
            Some(done) => self.time_ms <= done + self.max_lifetime_ms,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Density cost this instance contributes to sibling throttling
    pub fn weight(&self) -> i32 {
        self.weight
    }

    /// Effective sampling stride after sibling throttling
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn max_line(&self) -> u32 {
        self.max_line
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn reveal_completed_at(&self) -> Option<f32> {
        self.reveal_completed_at
    }

    pub fn time_ms(&self) -> f32 {
        self.time_ms
    }

    fn strips_per_tick(&self) -> u32 {
        let density = self.config.density;
        let wide = self.bitmap.width() as i32 > density.dp(300.0);
        let count = if wide { density.dp(2.0) } else { density.dp(1.0) };
        count.max(1) as u32
    }

    fn complete_reveal(&mut self) {
        if self.reveal_completed_at.is_none() {
            self.reveal_completed_at = Some(self.time_ms);
            log::debug!(
                "instance {}: reveal complete at {:.0}ms with {} particles",
                self.id.0,
                self.time_ms,
                self.particles.len()
            );
        }
        self.line = self.max_line;
        self.animated_line_width = self.bitmap.width();
        self.update_src_window();
    }

    fn update_src_window(&mut self) {
        self.src.left = self.animated_line_width as i32;
        self.dst.left = self.dst.right - self.bitmap.width() as i32 + self.src.left;
    }

    /// Source translation to apply this frame.
    ///
    /// Only read while the instance is younger than the carry-over window
    /// and the source is still alive; in every other case the handle is
    /// dropped so the host side can be released.
    fn carry_over_translation(&mut self) -> f32 {
        if self.time_ms <= TRANSLATION_WINDOW_MS {
            if let Some(source) = self.translation.as_ref().and_then(Weak::upgrade) {
                let tx = source.translation_x();
                if tx != 0.0 {
                    return tx;
                }
            }
        }
        self.translation = None;
        0.0
    }
}

fn calculate_weight(capture: &SourceCapture, config: &EffectConfig) -> i32 {
    let size = capture.width().max(capture.height()) as i32;
    let dp = |v| config.density.dp(v);
    if size <= dp(150.0) {
        1
    } else if size <= dp(250.0) {
        1
    } else if size <= dp(300.0) {
        2
    } else if size <= dp(420.0) {
        3
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::FrameBatch;
    use crate::lifetime::RangeLifetime;
    use crumble_core::{PixelBuffer, Rgba};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    const FRAME_MS: f32 = 1000.0 / 60.0;

    fn fast_config(stride: u32) -> EffectConfig {
        EffectConfig {
            stride,
            lifetime: Arc::new(RangeLifetime {
                min_ms: 40,
                max_ms: 80,
                line_sensitivity_ms: 20,
            }),
            seed: Some(42),
            ..Default::default()
        }
    }

    fn red_renderer(w: u32, h: u32, stride: u32) -> EffectRenderer {
        let capture = SourceCapture::new(PixelBuffer::solid(w, h, Rgba::RED), 0, 0);
        EffectRenderer::new(capture, None, Point::ZERO, 0, FRAME_MS, fast_config(stride), None)
    }

    fn tick(r: &mut EffectRenderer, batch: &mut FrameBatch) -> bool {
        batch.clear();
        r.advance_reveal();
        r.draw(batch, FRAME_MS)
    }

    #[test]
    fn full_reveal_fills_every_slot_then_finishes() {
        // 100x100 opaque red at stride 10: capacity 100, 10 strips
        let mut r = red_renderer(100, 100, 10);
        assert_eq!(r.max_line(), 10);
        let mut batch = FrameBatch::new();

        let mut ticks = 0;
        while r.reveal_completed_at().is_none() {
            assert!(tick(&mut r, &mut batch));
            ticks += 1;
            assert!(ticks < 100, "reveal never completed");
        }
        assert_eq!(r.particle_count(), 100);
        assert_eq!(r.line(), 10);

        // after completion + max lifetime the instance reports finished
        let mut alive = true;
        for _ in 0..30 {
            alive = tick(&mut r, &mut batch);
            if !alive {
                break;
            }
        }
        assert!(!alive);
        assert_eq!(r.particle_count(), 100); // slots are never reclaimed
    }

    #[test]
    fn transparent_capture_completes_immediately() {
        let capture = SourceCapture::new(PixelBuffer::new(50, 40), 0, 0);
        let mut r = EffectRenderer::new(
            capture,
            None,
            Point::ZERO,
            0,
            FRAME_MS,
            fast_config(5),
            None,
        );
        r.advance_reveal();
        assert_eq!(r.particle_count(), 0);
        assert_eq!(r.reveal_completed_at(), Some(0.0));
    }

    #[test]
    fn cursor_is_monotonic_and_completion_set_once() {
        let mut r = red_renderer(60, 60, 6);
        let mut batch = FrameBatch::new();
        let mut last_line = 0;
        for _ in 0..40 {
            tick(&mut r, &mut batch);
            assert!(r.line() >= last_line);
            assert!(r.line() <= r.max_line());
            last_line = r.line();
        }
        let completed = r.reveal_completed_at().expect("should have completed");
        for _ in 0..5 {
            tick(&mut r, &mut batch);
        }
        assert_eq!(r.reveal_completed_at(), Some(completed));
    }

    #[test]
    fn capacity_is_never_exceeded() {
        // 33x33 at stride 4: capacity 68 < qualifying pixels (9 per strip, 8 strips)
        let mut r = red_renderer(33, 33, 4);
        let capacity = (33 * 33) / (4 * 4);
        let mut batch = FrameBatch::new();
        for _ in 0..60 {
            tick(&mut r, &mut batch);
        }
        assert!(r.particle_count() <= capacity);
        assert!(r.reveal_completed_at().is_some());
    }

    #[test]
    fn sibling_weights_only_widen_stride() {
        let first = red_renderer(100, 100, 6);
        assert_eq!(first.stride(), 6);
        assert_eq!(first.weight(), 1);

        let capture = SourceCapture::new(PixelBuffer::solid(100, 100, Rgba::RED), 0, 0);
        let second = EffectRenderer::new(
            capture,
            None,
            Point::ZERO,
            first.weight(),
            FRAME_MS,
            fast_config(6),
            None,
        );
        assert_eq!(second.stride(), 6 + 2 * first.weight() as u32);
        assert!(second.stride() >= first.stride());
    }

    #[test]
    fn draws_remainder_then_drops_it_when_revealed() {
        let mut r = red_renderer(40, 40, 10);
        let mut batch = FrameBatch::new();
        tick(&mut r, &mut batch);
        assert_eq!(batch.image_rects.len(), 1);
        while r.reveal_completed_at().is_none() {
            tick(&mut r, &mut batch);
        }
        batch.clear();
        r.draw(&mut batch, FRAME_MS);
        assert!(batch.image_rects.is_empty());
        assert!(!batch.prims.is_empty());
    }

    #[test]
    fn first_frame_callback_fires_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        let capture = SourceCapture::new(PixelBuffer::solid(20, 20, Rgba::RED), 0, 0);
        let mut r = EffectRenderer::new(
            capture,
            None,
            Point::ZERO,
            0,
            FRAME_MS,
            fast_config(5),
            Some(Box::new(move || {
                fired2.fetch_add(1, Ordering::SeqCst);
            })),
        );
        let mut batch = FrameBatch::new();
        tick(&mut r, &mut batch);
        tick(&mut r, &mut batch);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn translation_carries_over_then_releases() {
        struct Sliding;
        impl TranslationSource for Sliding {
            fn translation_x(&self) -> f32 {
                24.0
            }
        }
        let source: Arc<dyn TranslationSource> = Arc::new(Sliding);
        let capture = SourceCapture::new(PixelBuffer::solid(40, 40, Rgba::RED), 0, 0);
        let mut r = EffectRenderer::new(
            capture,
            Some(Arc::downgrade(&source)),
            Point::ZERO,
            0,
            FRAME_MS,
            fast_config(10),
            None,
        );
        let mut batch = FrameBatch::new();
        tick(&mut r, &mut batch);
        // within the window the still image is shifted by the live translation
        assert_eq!(batch.image_rects[0].1.left, 24);

        // push past the 120ms window; the handle is released for good
        for _ in 0..10 {
            tick(&mut r, &mut batch);
        }
        assert!(r.translation.is_none());
        batch.clear();
        r.advance_reveal();
        r.draw(&mut batch, FRAME_MS);
        if let Some((_, dst)) = batch.image_rects.first() {
            assert_eq!(dst.left, 0);
        }
    }

    #[test]
    fn dead_translation_source_disables_carry_over() {
        struct Sliding;
        impl TranslationSource for Sliding {
            fn translation_x(&self) -> f32 {
                24.0
            }
        }
        let source: Arc<dyn TranslationSource> = Arc::new(Sliding);
        let weak = Arc::downgrade(&source);
        drop(source);
        let capture = SourceCapture::new(PixelBuffer::solid(40, 40, Rgba::RED), 0, 0);
        let mut r = EffectRenderer::new(
            capture,
            Some(weak),
            Point::ZERO,
            0,
            FRAME_MS,
            fast_config(10),
            None,
        );
        let mut batch = FrameBatch::new();
        tick(&mut r, &mut batch);
        assert_eq!(batch.image_rects[0].1.left, 0);
        assert!(r.translation.is_none());
    }
}

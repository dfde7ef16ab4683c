//! Frame composition seam: the capability every backend implements
//!
//! The effect core emits draw calls through `DrawTarget`; backends decide how
//! to realize them (CPU raster, GPU quads, a recording batch for tests).

use bytemuck::{Pod, Zeroable};
use crumble_core::{PixelBuffer, Rect, Rgba};

/// Per-frame drawing capability the effect renders through
pub trait DrawTarget {
    /// Blit `src` (a sub-rect of `image`) to `dst` on the surface, 1:1
    fn draw_image(&mut self, image: &PixelBuffer, src: Rect, dst: Rect);

    /// Fill a circle at surface coordinates; alpha rides in `color.a`
    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba);

    /// Fill an axis-aligned rect; alpha rides in `color.a`
    fn fill_rect(&mut self, left: f32, top: f32, right: f32, bottom: f32, color: Rgba);
}

/// Packed particle primitive — matches a GPU instance layout (2 x vec4).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ParticlePrim {
    /// x, y, radius; w = shape (0 circle, 1 rect)
    pub pos_radius: [f32; 4],
    /// rgba, normalized
    pub color: [f32; 4],
}

impl ParticlePrim {
    pub fn circle(cx: f32, cy: f32, radius: f32, color: Rgba) -> Self {
        Self {
            pos_radius: [cx, cy, radius, 0.0],
            color: normalize(color),
        }
    }

    pub fn rect(cx: f32, cy: f32, half_extent: f32, color: Rgba) -> Self {
        Self {
            pos_radius: [cx, cy, half_extent, 1.0],
            color: normalize(color),
        }
    }
}

fn normalize(color: Rgba) -> [f32; 4] {
    [
        f32::from(color.r) / 255.0,
        f32::from(color.g) / 255.0,
        f32::from(color.b) / 255.0,
        f32::from(color.a) / 255.0,
    ]
}

/// A `DrawTarget` that records one frame as a packed batch.
///
/// Suitable for upload to a GPU-oriented frame sink (the prims are Pod), and
/// as the instrumented target in unit tests.
#[derive(Default)]
pub struct FrameBatch {
    /// (src, dst) for each still-image blit this frame
    pub image_rects: Vec<(Rect, Rect)>,
    pub prims: Vec<ParticlePrim>,
}

impl FrameBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for the next frame, keeping allocations
    pub fn clear(&mut self) {
        self.image_rects.clear();
        self.prims.clear();
    }
}

impl DrawTarget for FrameBatch {
    fn draw_image(&mut self, _image: &PixelBuffer, src: Rect, dst: Rect) {
        self.image_rects.push((src, dst));
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba) {
        self.prims.push(ParticlePrim::circle(cx, cy, radius, color));
    }

    fn fill_rect(&mut self, left: f32, top: f32, right: f32, bottom: f32, color: Rgba) {
        let half = (right - left) / 2.0;
        self.prims
            .push(ParticlePrim::rect(left + half, (top + bottom) / 2.0, half, color));
    }
}

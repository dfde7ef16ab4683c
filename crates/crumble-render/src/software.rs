//! CPU raster backend: composites the frame into an RGBA buffer
//!
//! The reference backend. Rasterizes the effect's draw calls with straight
//! src-over blending and hands the finished frame to a `FrameSink`.

use crumble_core::{PixelBuffer, Rect, Result, Rgba};
use crumble_effect::DrawTarget;

use crate::backend::RenderBackend;
use crate::sink::FrameSink;

pub struct SoftwareBackend {
    frame: PixelBuffer,
    sink: Box<dyn FrameSink>,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32, sink: Box<dyn FrameSink>) -> Self {
        Self {
            frame: PixelBuffer::new(width, height),
            sink,
        }
    }

    pub fn frame(&self) -> &PixelBuffer {
        &self.frame
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba) {
        if x < 0 || y < 0 || x >= self.frame.width() as i32 || y >= self.frame.height() as i32 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let dst = self.frame.pixel(x, y);
        self.frame.set_pixel(x, y, src_over(color, dst));
    }
}

/// Straight-alpha src-over: src composited onto dst
fn src_over(src: Rgba, dst: Rgba) -> Rgba {
    let sa = u32::from(src.a);
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = u32::from(dst.a);
    let inv = 255 - sa;
    let out_a = sa + da * inv / 255;
    if out_a == 0 {
        return Rgba::TRANSPARENT;
    }
    let channel = |s: u8, d: u8| -> u8 {
        ((u32::from(s) * sa * 255 + u32::from(d) * da * inv) / (out_a * 255)) as u8
    };
    Rgba::new(
        channel(src.r, dst.r),
        channel(src.g, dst.g),
        channel(src.b, dst.b),
        out_a as u8,
    )
}

impl DrawTarget for SoftwareBackend {
    fn draw_image(&mut self, image: &PixelBuffer, src: Rect, dst: Rect) {
        if src.is_empty() || dst.is_empty() {
            return;
        }
        for dy in dst.top..dst.bottom {
            let sy = src.top + (dy - dst.top);
            if sy < 0 || sy >= image.height() as i32 {
                continue;
            }
            for dx in dst.left..dst.right {
                let sx = src.left + (dx - dst.left);
                if sx < 0 || sx >= src.right || sx >= image.width() as i32 {
                    continue;
                }
                self.blend_pixel(dx, dy, image.pixel(sx as u32, sy as u32));
            }
        }
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba) {
        if radius <= 0.0 || color.a == 0 {
            return;
        }
        let r_sq = radius * radius;
        let y0 = (cy - radius).floor() as i32;
        let y1 = (cy + radius).ceil() as i32;
        let x0 = (cx - radius).floor() as i32;
        let x1 = (cx + radius).ceil() as i32;
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r_sq {
                    self.blend_pixel(x, y, color);
                }
            }
        }
    }

    fn fill_rect(&mut self, left: f32, top: f32, right: f32, bottom: f32, color: Rgba) {
        if color.a == 0 {
            return;
        }
        for y in snap(top)..snap(bottom) {
            for x in snap(left)..snap(right) {
                self.blend_pixel(x, y, color);
            }
        }
    }
}

fn snap(v: f32) -> i32 {
    v.round() as i32
}

impl RenderBackend for SoftwareBackend {
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_frame(&mut self) {
        self.frame.fill(Rgba::TRANSPARENT);
    }

    fn present(&mut self) -> Result<()> {
        self.sink.present(&self.frame)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.frame = PixelBuffer::new(width, height);
    }

    fn die(&mut self) {}

    fn draw_target(&mut self) -> &mut dyn DrawTarget {
        self
    }
}

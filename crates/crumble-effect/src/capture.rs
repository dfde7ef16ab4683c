//! Source element capture: the pixels and placement of the effected element

use crumble_core::PixelBuffer;

/// A snapshot of the host element the effect disintegrates.
///
/// Produced synchronously by the host once per effect start. The effect owns
/// the pixel copy; the live element may be released by the host at any time
/// afterwards.
#[derive(Clone, Debug)]
pub struct SourceCapture {
    pub pixels: PixelBuffer,
    /// Screen position of the element's top-left corner
    pub screen_x: i32,
    pub screen_y: i32,
    /// Transform translation the element carried at capture time
    pub translation_x: f32,
    pub translation_y: f32,
}

impl SourceCapture {
    pub fn new(pixels: PixelBuffer, screen_x: i32, screen_y: i32) -> Self {
        Self {
            pixels,
            screen_x,
            screen_y,
            translation_x: 0.0,
            translation_y: 0.0,
        }
    }

    pub fn with_translation(mut self, x: f32, y: f32) -> Self {
        self.translation_x = x;
        self.translation_y = y;
        self
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Live translation of the source element, read during the carry-over window.
///
/// This is a non-owning seam: the instance holds it behind a `Weak` and only
/// reads it during the first 120ms of the effect, so a mid-flight transform
/// animation (e.g. list items sliding while one disintegrates) stays aligned.
/// It is never a source of truth for lifetime management.
pub trait TranslationSource: Send + Sync {
    fn translation_x(&self) -> f32;

    fn translation_y(&self) -> f32 {
        0.0
    }
}

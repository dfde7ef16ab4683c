//! Frame presentation contract

use crumble_core::{PixelBuffer, Result};

/// Receives each composited frame.
///
/// Invoked from the render thread only. A sink that fails permanently should
/// keep returning errors; the loop treats the first failure as fail-stop.
pub trait FrameSink: Send {
    fn present(&mut self, frame: &PixelBuffer) -> Result<()>;
}

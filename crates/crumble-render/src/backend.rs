//! Render backend capability
//!
//! The render loop is generic over this set and assumes nothing about a
//! backend's resource model. Backends with thread-bound resources (GPU
//! contexts) defer acquisition to `initialize`, which runs on the render
//! thread; `die` runs there too, so resources are released in the execution
//! context that owns them.

use crumble_core::Result;
use crumble_effect::DrawTarget;

pub trait RenderBackend: Send {
    /// Acquire backend resources. Called once, on the render thread, before
    /// the first frame. Failure is fatal to the loop.
    fn initialize(&mut self) -> Result<()>;

    /// Start a frame: clear the surface to transparent
    fn begin_frame(&mut self);

    /// Present the composited frame. Failure stops the loop (fail-stop; a
    /// broken surface cannot self-heal).
    fn present(&mut self) -> Result<()>;

    /// Apply a surface size change (called between frames, render thread)
    fn resize(&mut self, width: u32, height: u32);

    /// Release backend resources; last call before the thread exits
    fn die(&mut self);

    /// The drawing capability for the current frame
    fn draw_target(&mut self) -> &mut dyn DrawTarget;
}

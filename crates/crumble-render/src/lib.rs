//! Crumble Render - render loop, backends, and the effect system
//!
//! Drives every attached effect instance from one background render thread:
//! - `RenderBackend` — the capability a presentation backend implements
//! - `SoftwareBackend` — CPU raster reference backend (src-over compositing)
//! - `FrameSink` — where composited frames go, render thread only
//! - `EffectSurface` — shared state + the tick loop thread
//! - `EffectSystem` — the owned service object hosts start effects through

pub mod backend;
pub mod sink;
pub mod software;
pub mod surface;
pub mod system;

pub use backend::RenderBackend;
pub use sink::FrameSink;
pub use software::SoftwareBackend;
pub use surface::{EffectSurface, StartOptions, TeardownFn};
pub use system::{EffectSystem, SurfaceProvider};

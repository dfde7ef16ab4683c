//! Crumble Core - Foundational types for the Crumble effect
//!
//! This crate provides the types that the effect and render crates depend on:
//! - `Rgba`, `Point`, `Rect`, `PixelBuffer` - pixel-space primitives
//! - `FramePacer` - clamped per-frame delta pacing
//! - `EffectRng` - lightweight PRNG for particle randomization
//! - `Density` - device-independent pixel conversion
//! - Error types and Result alias

mod error;
mod rand;
mod timing;
mod types;
mod units;

pub use error::{EffectError, Result};
pub use rand::EffectRng;
pub use timing::FramePacer;
pub use types::{PixelBuffer, Point, Rect, Rgba};
pub use units::Density;

//! The effect system: an owned service object hosts start effects through
//!
//! Replaces the ambient-global pattern with an explicit object the host
//! constructs and injects where effects are triggered. The surface and its
//! render thread are created lazily on the first start and recreated after
//! an idle teardown.

use std::sync::Arc;

use crumble_core::{EffectError, Point, Result};
use crumble_effect::{InstanceId, SourceCapture};

use crate::backend::RenderBackend;
use crate::surface::{EffectSurface, StartOptions, TeardownFn};

/// Creates backends for the shared surface.
///
/// `create_backend` must be cheap and infallible; anything that can fail
/// (GPU context, surface handles) belongs in `RenderBackend::initialize`,
/// which runs on the render thread and fail-stops the loop silently.
pub trait SurfaceProvider: Send + Sync {
    fn create_backend(&self) -> Box<dyn RenderBackend>;

    /// Screen position of the surface's top-left corner
    fn surface_origin(&self) -> Point {
        Point::ZERO
    }

    fn refresh_hz(&self) -> f32 {
        60.0
    }
}

/// Entry point for hosts: start, pause, and destroy disintegration effects.
#[derive(Default)]
pub struct EffectSystem {
    provider: Option<Arc<dyn SurfaceProvider>>,
    surface: Option<EffectSurface>,
    on_all_finished: Option<TeardownFn>,
}

impl EffectSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_surface_provider(&mut self, provider: Arc<dyn SurfaceProvider>) {
        self.provider = Some(provider);
    }

    /// Register the callback that fires (from the render thread) once every
    /// instance has finished and the surface has been torn down. Hosts use
    /// it to detach the shared surface from their view hierarchy.
    pub fn on_all_finished(&mut self, callback: impl Fn() + Send + Sync + 'static) {
        self.on_all_finished = Some(Arc::new(callback));
    }

    /// Start a disintegration effect for a captured element.
    ///
    /// The only synchronous error is the missing-provider precondition;
    /// every later failure is logged and fail-stops the loop silently.
    pub fn start(&mut self, capture: SourceCapture, options: StartOptions) -> Result<InstanceId> {
        let provider = self
            .provider
            .clone()
            .ok_or(EffectError::NoSurfaceProvider)?;

        let mut request = (capture, options);
        for _ in 0..2 {
            if self.surface.as_ref().map_or(true, EffectSurface::is_torn_down) {
                log::debug!("creating render surface");
                self.surface = Some(EffectSurface::spawn(
                    provider.create_backend(),
                    provider.surface_origin(),
                    provider.refresh_hz(),
                    self.on_all_finished.clone(),
                ));
            }
            let Some(surface) = self.surface.as_ref() else {
                break;
            };
            match surface.attach(request.0, request.1) {
                Ok(id) => {
                    log::debug!("started effect instance {}", id.0);
                    return Ok(id);
                }
                // surface idled out between the check and the attach;
                // drop it and try once with a fresh one
                Err(returned) => {
                    request = returned;
                    self.surface = None;
                }
            }
        }
        log::error!("render surface unavailable, effect discarded");
        Err(EffectError::BackendInit("render surface unavailable".into()))
    }

    /// Pause or resume the render loop (coarse: up to ~1s to take effect)
    pub fn set_paused(&self, paused: bool) {
        if let Some(surface) = &self.surface {
            surface.set_paused(paused);
        }
    }

    /// Forward a surface size change to the render thread
    pub fn resize_surface(&self, width: u32, height: u32) {
        if let Some(surface) = &self.surface {
            surface.request_resize(width, height);
        }
    }

    /// Stop the loop and discard every instance; supersedes pause
    pub fn destroy_all(&mut self) {
        if let Some(surface) = self.surface.take() {
            log::debug!("destroying all effect instances");
            surface.force_destroy();
        }
    }
}

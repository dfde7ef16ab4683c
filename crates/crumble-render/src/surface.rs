//! The shared render surface: one background thread driving every instance
//!
//! All shared mutable state (the live-renderer vector and the pending-weight
//! accumulator) sits under a single mutex spanning attach, per-tick
//! iteration, and prune, which are therefore mutually exclusive.
//! Pause is a polled flag; resize has its own small lock so it can be
//! signaled from any thread without touching the instance lock. Teardown is
//! performed by the render thread itself at loop exit, then the host is
//! notified through a thread-safe callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

use crumble_core::{FramePacer, Point};
use crumble_effect::{EffectConfig, EffectRenderer, InstanceId, SourceCapture, TranslationSource};

use crate::backend::RenderBackend;

/// How long the live set must stay empty before the loop tears down; absorbs
/// rapid successive starts without thrashing surface teardown
const IDLE_GRACE: Duration = Duration::from_millis(30);

/// Pause poll granularity; sub-second resume latency is tolerable here
const PAUSE_POLL: Duration = Duration::from_secs(1);

/// Thread-safe notification the render thread posts at teardown
pub type TeardownFn = Arc<dyn Fn() + Send + Sync>;

/// Per-attach parameters besides the capture itself
pub struct StartOptions {
    /// Extra weight the host wants counted against this instance's siblings
    pub pending_weight: i32,
    pub config: EffectConfig,
    /// Live translation handle for the carry-over window
    pub translation_source: Option<Weak<dyn TranslationSource>>,
    /// Fires once, after this instance's first composited frame
    pub on_first_frame: Option<Box<dyn FnOnce() + Send>>,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            pending_weight: 0,
            config: EffectConfig::default(),
            translation_source: None,
            on_first_frame: None,
        }
    }
}

struct Live {
    renderers: Vec<EffectRenderer>,
    sum_of_pending_weights: i32,
}

struct PendingResize {
    dirty: bool,
    width: u32,
    height: u32,
}

struct Shared {
    live: Mutex<Live>,
    resize: Mutex<PendingResize>,
    paused: AtomicBool,
    running: AtomicBool,
    destroyed: AtomicBool,
}

/// Handle to a spawned render surface.
///
/// Dropping the handle does not stop the loop; it runs until its instances
/// finish and the idle grace elapses, or until `force_destroy`.
pub struct EffectSurface {
    shared: Arc<Shared>,
    origin: Point,
    frame_floor_ms: f32,
}

impl EffectSurface {
    /// Spawn the render thread for `backend`.
    ///
    /// `on_teardown` fires exactly once, from the render thread, after the
    /// loop has exited and backend resources are released.
    pub fn spawn(
        backend: Box<dyn RenderBackend>,
        origin: Point,
        refresh_hz: f32,
        on_teardown: Option<TeardownFn>,
    ) -> Self {
        let pacer = FramePacer::new(refresh_hz);
        let frame_floor_ms = (pacer.min_delta() * 1000.0) as f32;
        let shared = Arc::new(Shared {
            live: Mutex::new(Live {
                renderers: Vec::new(),
                sum_of_pending_weights: 0,
            }),
            resize: Mutex::new(PendingResize {
                dirty: false,
                width: 0,
                height: 0,
            }),
            paused: AtomicBool::new(false),
            running: AtomicBool::new(true),
            destroyed: AtomicBool::new(false),
        });

        let loop_shared = shared.clone();
        let loop_teardown = on_teardown.clone();
        let spawned = thread::Builder::new()
            .name("crumble-render".into())
            .spawn(move || run_loop(backend, loop_shared, pacer, loop_teardown));
        if let Err(e) = spawned {
            log::error!("render thread spawn failed: {e}");
            shared.running.store(false, Ordering::Release);
            shared.destroyed.store(true, Ordering::Release);
            if let Some(callback) = on_teardown {
                callback();
            }
        }

        Self {
            shared,
            origin,
            frame_floor_ms,
        }
    }

    /// Register a new instance. Returns the request unchanged when the
    /// surface has already been torn down, so the caller can re-attach to a
    /// fresh surface without re-capturing.
    pub fn attach(
        &self,
        capture: SourceCapture,
        options: StartOptions,
    ) -> std::result::Result<InstanceId, (SourceCapture, StartOptions)> {
        if self.shared.destroyed.load(Ordering::Acquire) {
            return Err((capture, options));
        }
        let Ok(mut live) = self.shared.live.lock() else {
            return Err((capture, options));
        };
        let renderer = EffectRenderer::new(
            capture,
            options.translation_source,
            self.origin,
            options.pending_weight + live.sum_of_pending_weights,
            self.frame_floor_ms,
            options.config,
            options.on_first_frame,
        );
        let id = renderer.id();
        live.sum_of_pending_weights += renderer.weight();
        live.renderers.push(renderer);
        Ok(id)
    }

    pub fn set_paused(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::Release);
    }

    /// Signal a surface size change; applied by the render thread between
    /// frames. Callable from any thread.
    pub fn request_resize(&self, width: u32, height: u32) {
        if let Ok(mut resize) = self.shared.resize.lock() {
            resize.dirty = true;
            resize.width = width;
            resize.height = height;
        }
    }

    /// Stop the loop regardless of pause state and discard all instances
    pub fn force_destroy(&self) {
        self.shared.destroyed.store(true, Ordering::Release);
        self.shared.running.store(false, Ordering::Release);
    }

    /// True once the render thread has exited (or never started)
    pub fn is_torn_down(&self) -> bool {
        !self.shared.running.load(Ordering::Acquire)
    }

    pub fn instance_count(&self) -> usize {
        self.shared.live.lock().map(|l| l.renderers.len()).unwrap_or(0)
    }
}

fn run_loop(
    mut backend: Box<dyn RenderBackend>,
    shared: Arc<Shared>,
    pacer: FramePacer,
    on_teardown: Option<TeardownFn>,
) {
    log::debug!("render loop starting");
    if let Err(e) = backend.initialize() {
        log::error!("backend initialization failed: {e}");
        finish(backend, &shared, on_teardown);
        return;
    }

    let start = Instant::now();
    let mut last_nanos = 0u64;
    let mut empty_since: Option<Instant> = None;

    while shared.running.load(Ordering::Acquire) {
        let now_nanos = start.elapsed().as_nanos() as u64;
        let delta = pacer.pace(now_nanos, last_nanos);
        last_nanos = now_nanos;

        while shared.paused.load(Ordering::Acquire) && shared.running.load(Ordering::Acquire) {
            thread::sleep(PAUSE_POLL);
        }
        // halt supersedes pause
        if !shared.running.load(Ordering::Acquire) {
            break;
        }

        {
            let Ok(mut resize) = shared.resize.lock() else {
                break;
            };
            if resize.dirty {
                backend.resize(resize.width, resize.height);
                resize.dirty = false;
            }
        }

        let delta_ms = (delta * 1000.0) as f32;
        let empty = {
            let Ok(mut live) = shared.live.lock() else {
                break;
            };
            let Live {
                renderers,
                sum_of_pending_weights,
            } = &mut *live;

            for renderer in renderers.iter_mut() {
                renderer.advance_reveal();
            }

            backend.begin_frame();
            renderers.retain_mut(|renderer| {
                let keep = renderer.draw(backend.draw_target(), delta_ms);
                if !keep {
                    *sum_of_pending_weights -= renderer.weight();
                    log::debug!("instance {} finished", renderer.id().0);
                }
                keep
            });
            if let Err(e) = backend.present() {
                log::warn!("present failed, stopping render loop: {e}");
                shared.running.store(false, Ordering::Release);
            }
            renderers.is_empty()
        };

        if empty && !shared.destroyed.load(Ordering::Acquire) {
            match empty_since {
                None => empty_since = Some(Instant::now()),
                Some(since) if since.elapsed() >= IDLE_GRACE => {
                    log::debug!("no live instances, tearing down surface");
                    shared.running.store(false, Ordering::Release);
                }
                Some(_) => {}
            }
        } else {
            empty_since = None;
        }
    }

    finish(backend, &shared, on_teardown);
}

/// Loop epilogue: release everything in the thread that owns it, then tell
/// the host. Runs exactly once per loop, on the render thread.
fn finish(mut backend: Box<dyn RenderBackend>, shared: &Arc<Shared>, on_teardown: Option<TeardownFn>) {
    shared.running.store(false, Ordering::Release);
    shared.destroyed.store(true, Ordering::Release);
    if let Ok(mut live) = shared.live.lock() {
        live.renderers.clear();
        live.sum_of_pending_weights = 0;
    }
    backend.die();
    log::debug!("render loop stopped");
    if let Some(callback) = on_teardown {
        callback();
    }
}

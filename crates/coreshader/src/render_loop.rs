//! Frame loop state machine.
//!
//! The loop never owns a timer. It asks a [`FrameScheduler`] for the next
//! frame callback and the host calls [`RenderLoop::on_frame`] when that
//! callback fires, so at most one request is outstanding at a time.
use std::time::Instant;

/// Upper bound for the device pixel ratio used to size the surface.
pub const MAX_PIXEL_RATIO: f64 = 3.0;
/// Smallest surface edge in physical pixels.
pub const MIN_SURFACE_EDGE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Host hook that delivers frame callbacks (redraw requests, vsync ticks).
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Stopped,
    Running {
        started: Instant,
        pending: Option<FrameRequest>,
        frames: u64,
    },
}

/// What a frame should draw with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Seconds since the loop started.
    pub seconds: f32,
    pub frame: u64,
}

#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }

    /// Cancels any running loop and starts a fresh one at `now`.
    pub fn start<S: FrameScheduler + ?Sized>(&mut self, now: Instant, scheduler: &mut S) {
        self.stop(scheduler);
        let request = scheduler.request_frame();
        self.state = LoopState::Running {
            started: now,
            pending: Some(request),
            frames: 0,
        };
        tracing::debug!("render loop started");
    }

    pub fn stop<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let LoopState::Running { pending, .. } = self.state {
            if let Some(request) = pending {
                scheduler.cancel_frame(request);
            }
            tracing::debug!("render loop stopped");
        }
        self.state = LoopState::Stopped;
    }

    /// Handles a delivered frame callback.
    ///
    /// The next frame is requested before the caller draws, so a draw that
    /// fails does not stall the loop. Returns `None` when the loop is stopped.
    pub fn on_frame<S: FrameScheduler + ?Sized>(
        &mut self,
        now: Instant,
        scheduler: &mut S,
    ) -> Option<FrameTick> {
        let LoopState::Running {
            started,
            pending,
            frames,
        } = &mut self.state
        else {
            return None;
        };
        *pending = Some(scheduler.request_frame());
        let tick = FrameTick {
            seconds: now.saturating_duration_since(*started).as_secs_f32(),
            frame: *frames,
        };
        *frames += 1;
        Some(tick)
    }
}

/// Physical surface size for a displayed size in logical pixels.
///
/// The pixel ratio is clamped to `[1, max_ratio]` with `max_ratio` itself
/// capped at [`MAX_PIXEL_RATIO`]; each edge is at least two pixels.
pub fn surface_size(logical: (f64, f64), pixel_ratio: f64, max_ratio: f64) -> (u32, u32) {
    let ceiling = max_ratio.clamp(1.0, MAX_PIXEL_RATIO);
    let ratio = if pixel_ratio.is_finite() {
        pixel_ratio.clamp(1.0, ceiling)
    } else {
        1.0
    };
    let edge = |value: f64| -> u32 {
        // Absorb float error from callers that derive `logical` from a
        // physical size.
        let scaled = (value.max(0.0) * ratio + 1e-6).floor();
        (scaled.min(u32::MAX as f64) as u32).max(MIN_SURFACE_EDGE)
    };
    (edge(logical.0), edge(logical.1))
}

//! The per-frame driver: poll input, tick time, update, render, present.
//!
//! ```text
//! Uninitialized --open--> Running --close condition--> Closing --release--> Terminated
//! ```
//!
//! Resources registered during [`FrameLoop::setup`] are released in reverse
//! registration order when the loop closes, whether it closed normally or
//! because a frame failed.

use crate::error::GlError;
use crate::gpu::Gpu;
use crate::input::{InputState, Key};
use crate::resources::Resources;
use crate::time::{FrameClock, FrameTime};
use crate::window::Window;
use std::fmt;
use std::time::Duration;

/// Lifecycle of a [`FrameLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Running,
    Closing,
    Terminated,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Uninitialized => "uninitialized",
            LoopState::Running => "running",
            LoopState::Closing => "closing",
            LoopState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Why a loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    EscapePressed,
    WindowClosed,
    SceneRequested,
    FrameLimit,
    Error,
}

/// Summary returned by [`FrameLoop::run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frames: u64,
    pub total: Duration,
    pub reason: Option<CloseReason>,
}

/// RGBA8 pixels read back from the final frame, bottom row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Per-frame context handed to a [`Scene`].
pub struct FrameCtx<'a> {
    pub gpu: &'a dyn Gpu,
    pub input: &'a InputState,
    pub time: FrameTime,
    pub resources: &'a mut Resources,
    pub framebuffer: (u32, u32),
    close: bool,
}

impl FrameCtx<'_> {
    /// Closes the loop after this frame is presented.
    pub fn request_close(&mut self) {
        self.close = true;
    }

    pub fn close_requested(&self) -> bool {
        self.close
    }

    /// Framebuffer width over height; 1.0 for a degenerate size.
    pub fn aspect(&self) -> f32 {
        let (w, h) = self.framebuffer;
        if w == 0 || h == 0 {
            1.0
        } else {
            w as f32 / h as f32
        }
    }
}

/// Something drawn once per frame.
pub trait Scene {
    fn name(&self) -> &str;

    /// Advances simulation state. Runs before [`render`](Self::render).
    fn update(&mut self, ctx: &mut FrameCtx<'_>) -> Result<(), GlError> {
        let _ = ctx;
        Ok(())
    }

    fn render(&mut self, ctx: &mut FrameCtx<'_>) -> Result<(), GlError>;
}

/// Owns a window, the input state, the frame clock and the resource
/// registry, and drives a [`Scene`] until a close condition holds.
pub struct FrameLoop<W: Window> {
    window: Option<W>,
    state: LoopState,
    input: InputState,
    clock: FrameClock,
    resources: Resources,
    frame_limit: Option<u64>,
    frames: u64,
    reason: Option<CloseReason>,
    capture_final_frame: bool,
    capture: Option<Capture>,
}

impl<W: Window> Default for FrameLoop<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Window> fmt::Debug for FrameLoop<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLoop")
            .field("state", &self.state)
            .field("frames", &self.frames)
            .field("frame_limit", &self.frame_limit)
            .field("resources", &self.resources.len())
            .finish()
    }
}

impl<W: Window> FrameLoop<W> {
    pub fn new() -> Self {
        Self {
            window: None,
            state: LoopState::Uninitialized,
            input: InputState::new(),
            clock: FrameClock::new(),
            resources: Resources::new(),
            frame_limit: None,
            frames: 0,
            reason: None,
            capture_final_frame: false,
            capture: None,
        }
    }

    /// Closes the loop after `limit` frames. `None` runs until closed.
    pub fn with_frame_limit(mut self, limit: Option<u64>) -> Self {
        self.frame_limit = limit;
        self
    }

    /// Reads back the last frame before it is presented; see
    /// [`take_capture`](Self::take_capture).
    pub fn with_final_frame_capture(mut self, capture: bool) -> Self {
        self.capture_final_frame = capture;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames completed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.reason
    }

    pub fn window(&self) -> Option<&W> {
        self.window.as_ref()
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn take_capture(&mut self) -> Option<Capture> {
        self.capture.take()
    }

    /// Creates the window with `factory` and enters `Running`.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::ContextInit`] if the factory fails; the loop is
    /// then `Terminated`. Calling `open` twice is an
    /// [`GlError::InvalidArgument`].
    pub fn open<F>(&mut self, factory: F) -> Result<(), GlError>
    where
        F: FnOnce() -> Result<W, GlError>,
    {
        if self.state != LoopState::Uninitialized {
            return Err(GlError::InvalidArgument(format!(
                "open called on a {} loop",
                self.state
            )));
        }
        let window = match factory() {
            Ok(w) => w,
            Err(e) => {
                self.state = LoopState::Terminated;
                let err = match e {
                    GlError::ContextInit(_) => e,
                    other => GlError::ContextInit(other.to_string()),
                };
                log::error!("{err}");
                return Err(err);
            }
        };

        let (width, height) = window.framebuffer_size();
        let gpu = window.gpu();
        log::info!("GL context ready: {}", gpu.driver_info());
        gpu.viewport(width, height);

        self.window = Some(window);
        self.clock.reset();
        self.state = LoopState::Running;
        log::info!("frame loop running at {width}x{height}");
        Ok(())
    }

    /// Runs scene construction against the live context.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] unless the loop is `Running`.
    /// If `build` fails, everything registered so far is released, the
    /// loop terminates and the error is returned.
    pub fn setup<T, F>(&mut self, build: F) -> Result<T, GlError>
    where
        F: FnOnce(&dyn Gpu, &mut Resources) -> Result<T, GlError>,
    {
        let window = running(&mut self.window, self.state, "setup")?;
        match build(window.gpu(), &mut self.resources) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::error!("scene setup failed: {e}");
                self.reason = Some(CloseReason::Error);
                self.shutdown();
                Err(e)
            }
        }
    }

    /// Performs one frame.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] outside `Running`. A failing
    /// update, render or present closes the loop, releases its resources
    /// and returns the error.
    pub fn step<S: Scene + ?Sized>(&mut self, scene: &mut S) -> Result<(), GlError> {
        let window = running(&mut self.window, self.state, "step")?;

        window.poll_events(&mut self.input);
        let framebuffer = window.framebuffer_size();
        if let Some((w, h)) = self.input.resized() {
            log::debug!("framebuffer resized to {w}x{h}");
            window.gpu().viewport(w, h);
        }
        let time = self.clock.tick();

        let mut ctx = FrameCtx {
            gpu: window.gpu(),
            input: &self.input,
            time,
            resources: &mut self.resources,
            framebuffer,
            close: false,
        };
        let drawn = scene
            .update(&mut ctx)
            .and_then(|()| scene.render(&mut ctx));
        let scene_close = ctx.close;
        if let Err(e) = drawn {
            return Err(self.fail(scene.name(), e));
        }

        self.frames += 1;
        let reason = close_condition(&self.input, self.frames, self.frame_limit, scene_close);
        if reason.is_some() && self.capture_final_frame {
            let (width, height) = framebuffer;
            let pixels = window.gpu().read_pixels(width, height);
            self.capture = Some(Capture {
                width,
                height,
                pixels,
            });
        }
        if let Err(e) = window.present() {
            return Err(self.fail(scene.name(), e));
        }
        self.input.end_frame();

        if let Some(reason) = reason {
            log::info!(
                "closing '{}' after {} frames: {reason:?}",
                scene.name(),
                self.frames
            );
            self.reason = Some(reason);
            self.state = LoopState::Closing;
            self.shutdown();
        }
        Ok(())
    }

    /// Steps until the loop terminates.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] unless the loop is `Running`,
    /// and the first frame error otherwise.
    pub fn run<S: Scene + ?Sized>(&mut self, scene: &mut S) -> Result<FrameStats, GlError> {
        running(&mut self.window, self.state, "run")?;
        log::info!("running scene '{}'", scene.name());
        while self.state == LoopState::Running {
            self.step(scene)?;
        }
        Ok(FrameStats {
            frames: self.frames,
            total: self.clock.total(),
            reason: self.reason,
        })
    }

    /// Releases every registered resource, newest first, and terminates.
    /// Safe to call in any state; only the first call releases anything.
    pub fn shutdown(&mut self) -> Vec<GlError> {
        if self.state == LoopState::Terminated {
            return Vec::new();
        }
        self.state = LoopState::Closing;
        let failures = match self.window.as_ref() {
            Some(window) => self.resources.release_all(window.gpu()),
            None => Vec::new(),
        };
        if !failures.is_empty() {
            log::warn!("{} resources failed to release", failures.len());
        }
        self.state = LoopState::Terminated;
        log::info!("frame loop terminated");
        failures
    }

    fn fail(&mut self, scene: &str, err: GlError) -> GlError {
        log::error!("frame {} of '{scene}' failed: {err}", self.frames);
        self.reason = Some(CloseReason::Error);
        self.shutdown();
        err
    }
}

fn running<'w, W>(
    window: &'w mut Option<W>,
    state: LoopState,
    op: &str,
) -> Result<&'w mut W, GlError> {
    match (state, window.as_mut()) {
        (LoopState::Running, Some(window)) => Ok(window),
        (state, _) => Err(GlError::InvalidArgument(format!(
            "{op} called on a {state} loop"
        ))),
    }
}

fn close_condition(
    input: &InputState,
    frames: u64,
    frame_limit: Option<u64>,
    scene_close: bool,
) -> Option<CloseReason> {
    if input.close_requested() {
        Some(CloseReason::WindowClosed)
    } else if input.key_down(Key::Escape) {
        Some(CloseReason::EscapePressed)
    } else if scene_close {
        Some(CloseReason::SceneRequested)
    } else if frame_limit.is_some_and(|limit| frames >= limit) {
        Some(CloseReason::FrameLimit)
    } else {
        None
    }
}

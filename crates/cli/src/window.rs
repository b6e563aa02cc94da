//! Desktop window: winit for the surface and events, glutin for the
//! OpenGL 3.3 core context, glow behind the core `Gpu` seam.
//!
//! The frame loop pulls events once per frame, so the winit event loop is
//! pumped with a zero timeout instead of handing it control.

use glutin::config::ConfigTemplateBuilder;
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use learngl_core::config::WindowConfig;
use learngl_core::gpu::{Gpu, GlowGpu};
use learngl_core::{GlError, InputEvent, InputState, Key, Window};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CStr;
use std::num::NonZeroU32;
use std::time::Duration;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{CursorGrabMode, Window as WinitWindow, WindowAttributes, WindowId};

/// Pumps allowed before giving up on the platform creating the window.
const STARTUP_PUMPS: usize = 64;

/// Pixel scroll deltas are scaled to roughly one line per notch.
const PIXELS_PER_LINE: f32 = 20.0;

/// Receives winit callbacks during a pump.
#[derive(Default)]
struct Pump {
    attributes: Option<WindowAttributes>,
    window: Option<WinitWindow>,
    events: Vec<InputEvent>,
    error: Option<String>,
}

impl ApplicationHandler for Pump {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(attributes) = self.attributes.take() {
            match event_loop.create_window(attributes) {
                Ok(window) => self.window = Some(window),
                Err(e) => self.error = Some(e.to_string()),
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(event) = translate(&event) {
            self.events.push(event);
        }
    }
}

/// An on-screen window with a current OpenGL 3.3 core context.
///
/// Fields drop in declaration order: GL objects go before the context and
/// the context before the window it renders to.
pub struct DesktopWindow {
    gpu: GlowGpu,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: WinitWindow,
    pump: Pump,
    event_loop: EventLoop<()>,
    size: (u32, u32),
}

impl DesktopWindow {
    /// Creates the window, makes a context current on it and captures the
    /// cursor.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::ContextInit`] if the event loop, window, display,
    /// config, surface or context cannot be created.
    pub fn open(config: &WindowConfig) -> Result<Self, GlError> {
        let mut event_loop = EventLoop::new().map_err(context_error)?;
        let attributes = WinitWindow::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);
        let mut pump = Pump {
            attributes: Some(attributes),
            ..Pump::default()
        };

        for _ in 0..STARTUP_PUMPS {
            if let PumpStatus::Exit(code) =
                event_loop.pump_app_events(Some(Duration::ZERO), &mut pump)
            {
                return Err(GlError::ContextInit(format!(
                    "event loop exited during startup (code {code})"
                )));
            }
            if pump.window.is_some() || pump.error.is_some() {
                break;
            }
        }
        if let Some(e) = pump.error.take() {
            return Err(GlError::ContextInit(format!("failed to create window: {e}")));
        }
        let window = pump
            .window
            .take()
            .ok_or_else(|| GlError::ContextInit("platform never created the window".into()))?;

        let (surface, context, gl) = create_context(&window, config)?;
        grab_cursor(&window);
        let inner = window.inner_size();
        log::info!(
            "opened '{}' at {}x{} ({} samples, vsync {})",
            config.title,
            inner.width,
            inner.height,
            config.samples,
            if config.vsync { "on" } else { "off" }
        );

        Ok(Self {
            gpu: GlowGpu::new(gl),
            surface,
            context,
            window,
            pump,
            event_loop,
            size: (inner.width, inner.height),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            self.surface.resize(&self.context, w, h);
            self.size = (width, height);
        }
    }
}

impl Window for DesktopWindow {
    fn gpu(&self) -> &dyn Gpu {
        &self.gpu
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn poll_events(&mut self, input: &mut InputState) {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.pump);
        for event in std::mem::take(&mut self.pump.events) {
            if let InputEvent::Resized { width, height } = event {
                self.resize(width, height);
            }
            input.apply(event);
        }
        if let PumpStatus::Exit(_) = status {
            input.apply(InputEvent::CloseRequested);
        }
    }

    fn present(&mut self) -> Result<(), GlError> {
        self.window.pre_present_notify();
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| GlError::ContextInit(format!("failed to swap buffers: {e}")))
    }
}

#[allow(unsafe_code)]
fn create_context(
    window: &WinitWindow,
    config: &WindowConfig,
) -> Result<(Surface<WindowSurface>, PossiblyCurrentContext, glow::Context), GlError> {
    let display_handle = window.display_handle().map_err(context_error)?.as_raw();
    let window_handle = window.window_handle().map_err(context_error)?.as_raw();

    #[cfg(target_os = "windows")]
    let preference = DisplayApiPreference::Wgl(Some(window_handle));
    #[cfg(target_os = "macos")]
    let preference = DisplayApiPreference::Cgl;
    #[cfg(all(unix, not(target_os = "macos")))]
    let preference = DisplayApiPreference::Egl;

    // SAFETY: both handles come from a live winit window that outlives the
    // display, surface and context.
    let display = unsafe { Display::new(display_handle, preference) }.map_err(context_error)?;

    let mut template = ConfigTemplateBuilder::new()
        .with_depth_size(24)
        .with_stencil_size(8)
        .compatible_with_native_window(window_handle);
    if config.samples > 0 {
        template = template.with_multisampling(config.samples);
    }
    let gl_config = unsafe { display.find_configs(template.build()) }
        .map_err(context_error)?
        .next()
        .ok_or_else(|| GlError::ContextInit("no GL config matches the window settings".into()))?;

    let size = window.inner_size();
    let width = NonZeroU32::new(size.width)
        .ok_or_else(|| GlError::ContextInit("window has zero width".into()))?;
    let height = NonZeroU32::new(size.height)
        .ok_or_else(|| GlError::ContextInit("window has zero height".into()))?;
    let surface_attributes =
        SurfaceAttributesBuilder::<WindowSurface>::new().build(window_handle, width, height);
    let surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
        .map_err(context_error)?;

    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
        .with_profile(GlProfile::Core)
        .with_debug(config.debug_context)
        .build(Some(window_handle));
    let context = unsafe { display.create_context(&gl_config, &context_attributes) }
        .map_err(context_error)?
        .make_current(&surface)
        .map_err(context_error)?;

    let interval = if config.vsync {
        SwapInterval::Wait(NonZeroU32::MIN)
    } else {
        SwapInterval::DontWait
    };
    if let Err(e) = surface.set_swap_interval(&context, interval) {
        log::warn!("failed to set swap interval: {e}");
    }

    let gl = unsafe {
        glow::Context::from_loader_function_cstr(|s: &CStr| display.get_proc_address(s))
    };
    Ok((surface, context, gl))
}

/// Hides the cursor and keeps it in the window for mouse look. Not every
/// platform supports both grab modes; failure only costs mouse look.
fn grab_cursor(window: &WinitWindow) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Confined)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
    match grabbed {
        Ok(()) => window.set_cursor_visible(false),
        Err(e) => log::warn!("cursor capture unavailable: {e}"),
    }
}

fn context_error(e: impl std::fmt::Display) -> GlError {
    GlError::ContextInit(e.to_string())
}

/// Maps a winit window event to the platform-agnostic form, dropping the
/// ones no scene reacts to.
fn translate(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::CloseRequested => Some(InputEvent::CloseRequested),
        WindowEvent::Resized(size) => Some(InputEvent::Resized {
            width: size.width,
            height: size.height,
        }),
        WindowEvent::Focused(false) => Some(InputEvent::FocusLost),
        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::PointerMoved {
            x: position.x as f32,
            y: position.y as f32,
        }),
        WindowEvent::MouseWheel { delta, .. } => {
            let dy = match delta {
                MouseScrollDelta::LineDelta(_, y) => *y,
                MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
            };
            Some(InputEvent::Scrolled { dy })
        }
        WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(code),
                    state,
                    repeat: false,
                    ..
                },
            ..
        } => {
            let key = map_key(*code)?;
            Some(match state {
                ElementState::Pressed => InputEvent::KeyPressed(key),
                ElementState::Released => InputEvent::KeyReleased(key),
            })
        }
        _ => None,
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::Space => Key::Space,
        KeyCode::ControlLeft => Key::LeftControl,
        KeyCode::ShiftLeft => Key::LeftShift,
        KeyCode::Escape => Key::Escape,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_keys_map_to_wasd() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::W));
        assert_eq!(map_key(KeyCode::KeyD), Some(Key::D));
        assert_eq!(map_key(KeyCode::Escape), Some(Key::Escape));
        assert_eq!(map_key(KeyCode::KeyQ), None);
    }

    #[test]
    fn close_and_resize_translate() {
        assert_eq!(
            translate(&WindowEvent::CloseRequested),
            Some(InputEvent::CloseRequested)
        );
        assert_eq!(
            translate(&WindowEvent::Resized(PhysicalSize::new(800, 600))),
            Some(InputEvent::Resized {
                width: 800,
                height: 600
            })
        );
    }

    #[test]
    fn focus_loss_translates_but_focus_gain_does_not() {
        assert_eq!(translate(&WindowEvent::Focused(false)), Some(InputEvent::FocusLost));
        assert_eq!(translate(&WindowEvent::Focused(true)), None);
    }

    #[test]
    #[ignore = "requires GL context"]
    fn desktop_window_opens_with_core_context() {
        let window = DesktopWindow::open(&WindowConfig::default()).unwrap();
        let info = window.gpu().driver_info();
        assert!(info.max_vertex_attributes >= 16, "got {info:?}");
    }
}

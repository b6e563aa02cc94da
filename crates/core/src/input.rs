//! Per-window input state handed to scenes each frame.
//!
//! Windows translate platform events into [`InputEvent`]s and feed them to
//! [`InputState::apply`]. Held keys persist across frames; pointer motion,
//! scroll and "pressed this frame" transitions are cleared by
//! [`InputState::end_frame`].

use glam::Vec2;
use std::collections::HashSet;

/// Keys the demos react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    LeftControl,
    LeftShift,
    Escape,
    Up,
    Down,
    Left,
    Right,
}

/// A platform-agnostic window event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPressed(Key),
    KeyReleased(Key),
    /// Cursor position in window pixels, origin top-left.
    PointerMoved { x: f32, y: f32 },
    /// Vertical wheel movement in lines; positive scrolls up.
    Scrolled { dy: f32 },
    /// Framebuffer size in physical pixels.
    Resized { width: u32, height: u32 },
    FocusLost,
    CloseRequested,
}

/// Current input for one window.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys_down: HashSet<Key>,
    keys_pressed: HashSet<Key>,
    pointer: Option<Vec2>,
    pointer_delta: Vec2,
    scroll: f32,
    resized: Option<(u32, u32)>,
    close_requested: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyPressed(key) => {
                if self.keys_down.insert(key) {
                    self.keys_pressed.insert(key);
                }
            }
            InputEvent::KeyReleased(key) => {
                self.keys_down.remove(&key);
            }
            InputEvent::PointerMoved { x, y } => {
                let pos = Vec2::new(x, y);
                // The first sample only establishes the baseline.
                if let Some(last) = self.pointer {
                    self.pointer_delta += pos - last;
                }
                self.pointer = Some(pos);
            }
            InputEvent::Scrolled { dy } => self.scroll += dy,
            InputEvent::Resized { width, height } => self.resized = Some((width, height)),
            InputEvent::FocusLost => {
                self.keys_down.clear();
                self.pointer = None;
            }
            InputEvent::CloseRequested => self.close_requested = true,
        }
    }

    /// Clears per-frame transitions. Held keys and the close request persist.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.pointer_delta = Vec2::ZERO;
        self.scroll = 0.0;
        self.resized = None;
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// Whether `key` went down during the current frame.
    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Pointer motion accumulated this frame, in pixels with +Y down.
    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_delta
    }

    pub fn pointer_position(&self) -> Option<Vec2> {
        self.pointer
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    /// Latest framebuffer size reported this frame.
    pub fn resized(&self) -> Option<(u32, u32)> {
        self.resized
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

//! The window seam between the frame loop and a platform.
//!
//! A [`Window`] owns the GL context (exposed as a [`Gpu`]) and translates its
//! platform's events into [`InputEvent`]s. The desktop implementation lives
//! in the CLI; [`HeadlessWindow`] replays scripted events for tests and for
//! runs without a display.

use crate::error::GlError;
use crate::gpu::{Gpu, HeadlessGpu};
use crate::input::{InputEvent, InputState};
use std::collections::VecDeque;

/// A presentable surface with a current GL context.
pub trait Window {
    fn gpu(&self) -> &dyn Gpu;

    /// Drawable size in physical pixels.
    fn framebuffer_size(&self) -> (u32, u32);

    /// Feeds every pending platform event into `input`.
    fn poll_events(&mut self, input: &mut InputState);

    /// Swaps buffers.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::ContextInit`] if the context was lost.
    fn present(&mut self) -> Result<(), GlError>;
}

impl<W: Window + ?Sized> Window for Box<W> {
    fn gpu(&self) -> &dyn Gpu {
        (**self).gpu()
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        (**self).framebuffer_size()
    }

    fn poll_events(&mut self, input: &mut InputState) {
        (**self).poll_events(input)
    }

    fn present(&mut self) -> Result<(), GlError> {
        (**self).present()
    }
}

/// Window backed by a [`HeadlessGpu`].
///
/// Each call to [`poll_events`](Window::poll_events) delivers the next
/// scripted batch of events; once the script runs out, frames see no input.
#[derive(Debug)]
pub struct HeadlessWindow {
    gpu: HeadlessGpu,
    size: (u32, u32),
    script: VecDeque<Vec<InputEvent>>,
    presented: u64,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            gpu: HeadlessGpu::new(),
            size: (width, height),
            script: VecDeque::new(),
            presented: 0,
        }
    }

    /// Queues the events delivered on the next unscripted frame.
    pub fn push_frame(&mut self, events: impl IntoIterator<Item = InputEvent>) {
        self.script.push_back(events.into_iter().collect());
    }

    pub fn with_frames<I>(mut self, frames: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoIterator<Item = InputEvent>,
    {
        for events in frames {
            self.push_frame(events);
        }
        self
    }

    pub fn headless_gpu(&self) -> &HeadlessGpu {
        &self.gpu
    }

    /// Number of presented frames.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Window for HeadlessWindow {
    fn gpu(&self) -> &dyn Gpu {
        &self.gpu
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn poll_events(&mut self, input: &mut InputState) {
        let Some(events) = self.script.pop_front() else {
            return;
        };
        for event in events {
            if let InputEvent::Resized { width, height } = event {
                self.size = (width, height);
            }
            input.apply(event);
        }
    }

    fn present(&mut self) -> Result<(), GlError> {
        self.presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Key;

    #[test]
    fn scripted_frames_arrive_in_order() {
        let mut window = HeadlessWindow::new(64, 48).with_frames([
            vec![InputEvent::KeyPressed(Key::W)],
            vec![InputEvent::KeyReleased(Key::W)],
        ]);
        let mut input = InputState::new();

        window.poll_events(&mut input);
        assert!(input.key_down(Key::W));
        window.poll_events(&mut input);
        assert!(!input.key_down(Key::W));
        window.poll_events(&mut input);
        assert!(!input.key_down(Key::W));
    }

    #[test]
    fn resize_event_changes_framebuffer_size() {
        let mut window = HeadlessWindow::new(64, 48);
        window.push_frame([InputEvent::Resized {
            width: 128,
            height: 96,
        }]);
        let mut input = InputState::new();
        window.poll_events(&mut input);
        assert_eq!(window.framebuffer_size(), (128, 96));
        assert_eq!(input.resized(), Some((128, 96)));
    }

    #[test]
    fn present_counts_frames() {
        let mut window = HeadlessWindow::new(1, 1);
        window.present().unwrap();
        window.present().unwrap();
        assert_eq!(window.presented(), 2);
    }
}

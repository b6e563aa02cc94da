//! Free-fly camera control: WASD movement, mouse look and scroll zoom.

use crate::camera::{Camera, MouseLook, DEFAULT_SENSITIVITY};
use crate::input::{InputState, Key};

/// Narrowest field of view reachable by zooming, in degrees.
pub const MIN_ZOOM_FOV: f32 = 1.0;
/// Widest field of view reachable by zooming, in degrees.
pub const MAX_ZOOM_FOV: f32 = 45.0;

/// Drives a [`Camera`] from an [`InputState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlyController {
    /// World units per second.
    pub move_speed: f32,
    look: MouseLook,
}

impl Default for FlyController {
    fn default() -> Self {
        Self::new(2.5, DEFAULT_SENSITIVITY)
    }
}

impl FlyController {
    pub fn new(move_speed: f32, sensitivity: f32) -> Self {
        Self {
            move_speed,
            look: MouseLook::new(-90.0, 0.0, sensitivity),
        }
    }

    /// Controller whose mouse look starts from the camera's current heading.
    pub fn for_camera(camera: &Camera, move_speed: f32, sensitivity: f32) -> Self {
        Self {
            move_speed,
            look: MouseLook::from_forward(camera.forward(), sensitivity),
        }
    }

    pub fn look(&self) -> &MouseLook {
        &self.look
    }

    /// Applies one frame of input. Movement scales with `dt` seconds.
    pub fn update(&mut self, camera: &mut Camera, input: &InputState, dt: f32) {
        let delta = input.pointer_delta();
        if delta.x != 0.0 || delta.y != 0.0 {
            // Screen Y grows downwards; pitch grows upwards.
            let forward = self.look.apply(delta.x, -delta.y);
            if let Err(e) = camera.set_forward(forward) {
                log::warn!("mouse look produced an unusable direction: {e}");
            }
        }

        let step = self.move_speed * dt;
        camera.set_speed(step);
        let forward = camera.forward();
        let right = camera.right();
        let up = camera.up();

        let mut position = camera.position();
        if input.key_down(Key::W) {
            position += forward * step;
        }
        if input.key_down(Key::S) {
            position -= forward * step;
        }
        if input.key_down(Key::A) {
            position -= right * step;
        }
        if input.key_down(Key::D) {
            position += right * step;
        }
        if input.key_down(Key::Space) {
            position += up * step;
        }
        if input.key_down(Key::LeftControl) {
            position -= up * step;
        }
        camera.set_position(position);

        let scroll = input.scroll();
        if scroll != 0.0 {
            let fov = (camera.fov_degrees() - scroll).clamp(MIN_ZOOM_FOV, MAX_ZOOM_FOV);
            if let Err(e) = camera.set_fov(fov) {
                log::warn!("zoom rejected: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputEvent;
    use glam::Vec3;

    fn camera() -> Camera {
        Camera::new(Vec3::ZERO, 45.0, 1.0, 0.1, 100.0).unwrap()
    }

    #[test]
    fn w_moves_along_forward_scaled_by_dt() {
        let mut cam = camera();
        let mut ctl = FlyController::default();
        let mut input = InputState::new();
        input.apply(InputEvent::KeyPressed(Key::W));
        ctl.update(&mut cam, &input, 0.5);
        assert!((cam.position() - Vec3::new(0.0, 0.0, -1.25)).length() < 1e-6);
        assert!((cam.speed() - 1.25).abs() < 1e-6);
    }

    #[test]
    fn a_and_d_strafe_along_right_vector() {
        let mut cam = camera();
        let mut ctl = FlyController::default();
        let mut input = InputState::new();
        input.apply(InputEvent::KeyPressed(Key::D));
        ctl.update(&mut cam, &input, 1.0);
        assert!((cam.position() - Vec3::new(2.5, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn upward_mouse_motion_raises_pitch() {
        let mut cam = camera();
        let mut ctl = FlyController::default();
        let mut input = InputState::new();
        input.apply(InputEvent::PointerMoved { x: 100.0, y: 100.0 });
        input.apply(InputEvent::PointerMoved { x: 100.0, y: 50.0 });
        ctl.update(&mut cam, &input, 0.016);
        assert!((ctl.look().pitch() - 5.0).abs() < 1e-5);
        assert!(cam.forward().y > 0.0);
    }

    #[test]
    fn scroll_zoom_is_clamped() {
        let mut cam = camera();
        let mut ctl = FlyController::default();
        let mut input = InputState::new();
        input.apply(InputEvent::Scrolled { dy: 100.0 });
        ctl.update(&mut cam, &input, 0.016);
        assert_eq!(cam.fov_degrees(), MIN_ZOOM_FOV);
        input.end_frame();
        input.apply(InputEvent::Scrolled { dy: -100.0 });
        ctl.update(&mut cam, &input, 0.016);
        assert_eq!(cam.fov_degrees(), MAX_ZOOM_FOV);
    }

    #[test]
    fn for_camera_keeps_existing_heading() {
        let mut cam = camera();
        cam.set_forward(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let ctl = FlyController::for_camera(&cam, 2.5, 0.1);
        assert!((ctl.look().forward() - Vec3::X).length() < 1e-5);
    }
}

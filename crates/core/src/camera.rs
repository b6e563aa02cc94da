//! Perspective camera and yaw/pitch mouse look.
//!
//! The camera stores state only. View and projection matrices are
//! recomputed on every call, so a setter is always reflected by the next
//! `compute_*` without any invalidation step.

use crate::error::GlError;
use glam::{Mat4, Vec3};

/// Pitch is clamped to this many degrees either side of the horizon.
pub const PITCH_LIMIT_DEGREES: f32 = 89.0;

/// Degrees of rotation per pixel of pointer motion.
pub const DEFAULT_SENSITIVITY: f32 = 0.1;

/// A right-handed perspective camera with GL clip-space conventions.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    target: Option<Vec3>,
    up: Vec3,
    fov_degrees: f32,
    aspect: f32,
    near: f32,
    far: f32,
    speed: f32,
}

impl Camera {
    /// Camera at `position` looking down -Z with +Y up.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] unless `0 < fov_degrees < 180`,
    /// `aspect > 0` and `0 < near < far`.
    pub fn new(
        position: Vec3,
        fov_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<Self, GlError> {
        check_fov(fov_degrees)?;
        check_aspect(aspect)?;
        if !(near > 0.0 && far > near) {
            return Err(GlError::InvalidArgument(format!(
                "clip planes need 0 < near < far, got near {near}, far {far}"
            )));
        }
        Ok(Self {
            position,
            forward: Vec3::NEG_Z,
            target: None,
            up: Vec3::Y,
            fov_degrees,
            aspect,
            near,
            far,
            speed: 0.0,
        })
    }

    /// World-to-view matrix looking at the fixed target if one is set,
    /// otherwise along `forward`.
    pub fn compute_view(&self) -> Mat4 {
        let center = self.target.unwrap_or(self.position + self.forward);
        Mat4::look_at_rh(self.position, center, self.up)
    }

    /// View-to-clip matrix (depth mapped to [-1, 1]).
    pub fn compute_projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    /// `projection * view`.
    pub fn compute_view_projection(&self) -> Mat4 {
        self.compute_projection() * self.compute_view()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Unit vector to the camera's right.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }

    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    /// Distance moved per input step, as last set by the controller.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Sets the viewing direction; stored normalized.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] for a zero or non-finite vector.
    pub fn set_forward(&mut self, forward: Vec3) -> Result<(), GlError> {
        self.forward = forward.try_normalize().ok_or_else(|| {
            GlError::InvalidArgument(format!("camera forward must be non-zero, got {forward}"))
        })?;
        Ok(())
    }

    /// Locks the view onto `target` until [`clear_target`](Self::clear_target).
    pub fn set_target(&mut self, target: Vec3) {
        self.target = Some(target);
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] unless `aspect` is positive and finite.
    pub fn set_aspect(&mut self, aspect: f32) -> Result<(), GlError> {
        check_aspect(aspect)?;
        self.aspect = aspect;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] unless `0 < fov_degrees < 180`.
    pub fn set_fov(&mut self, fov_degrees: f32) -> Result<(), GlError> {
        check_fov(fov_degrees)?;
        self.fov_degrees = fov_degrees;
        Ok(())
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }
}

fn check_fov(fov_degrees: f32) -> Result<(), GlError> {
    if fov_degrees > 0.0 && fov_degrees < 180.0 {
        Ok(())
    } else {
        Err(GlError::InvalidArgument(format!(
            "field of view must be in (0, 180) degrees, got {fov_degrees}"
        )))
    }
}

fn check_aspect(aspect: f32) -> Result<(), GlError> {
    if aspect > 0.0 && aspect.is_finite() {
        Ok(())
    } else {
        Err(GlError::InvalidArgument(format!(
            "aspect ratio must be positive, got {aspect}"
        )))
    }
}

/// Yaw/pitch accumulator turning pointer motion into a view direction.
///
/// Each delta adds `dx * sensitivity` to yaw and `dy * sensitivity` to
/// pitch (positive `dy` looks up), clamps pitch to
/// ±[`PITCH_LIMIT_DEGREES`], and rebuilds the direction from the two
/// Euler angles:
///
/// ```text
/// forward = normalize(cos(yaw)·cos(pitch), sin(pitch), sin(yaw)·cos(pitch))
/// ```
///
/// Yaw -90° with pitch 0° faces -Z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseLook {
    yaw: f32,
    pitch: f32,
    sensitivity: f32,
}

impl Default for MouseLook {
    fn default() -> Self {
        Self::new(-90.0, 0.0, DEFAULT_SENSITIVITY)
    }
}

impl MouseLook {
    /// Starts from the given angles in degrees. The pitch is clamped by the
    /// next [`apply`](Self::apply), not here.
    pub fn new(yaw: f32, pitch: f32, sensitivity: f32) -> Self {
        Self {
            yaw,
            pitch,
            sensitivity,
        }
    }

    /// Angles matching an existing view direction.
    pub fn from_forward(forward: Vec3, sensitivity: f32) -> Self {
        let f = forward.normalize_or(Vec3::NEG_Z);
        let pitch = f
            .y
            .clamp(-1.0, 1.0)
            .asin()
            .to_degrees()
            .clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES);
        let yaw = f.z.atan2(f.x).to_degrees();
        Self::new(yaw, pitch, sensitivity)
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Accumulates one pointer delta and returns the new forward vector.
    pub fn apply(&mut self, dx: f32, dy: f32) -> Vec3 {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch + dy * self.sensitivity)
            .clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES);
        self.forward()
    }

    /// Unit view direction for the current angles.
    pub fn forward(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }
}

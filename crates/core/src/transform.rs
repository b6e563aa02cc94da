//! Model transforms built from translation, scale and Euler rotation.

use glam::{EulerRot, Mat4, Quat, Vec3};
use std::ops::Mul;

/// Translation, scale and rotation (degrees about X, Y, Z) with a cached
/// model matrix.
///
/// Setting any component rebuilds `model = T * S * R`. The `accumulate_*`
/// methods instead premultiply the current model by one component, which
/// is how the spinning and orbiting demo objects animate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    translation: Vec3,
    scale: Vec3,
    rotation_degrees: Vec3,
    model: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ONE, Vec3::ZERO)
    }
}

impl Transform {
    pub fn new(translation: Vec3, scale: Vec3, rotation_degrees: Vec3) -> Self {
        let mut t = Self {
            translation,
            scale,
            rotation_degrees,
            model: Mat4::IDENTITY,
        };
        t.rebuild();
        t
    }

    /// Same offset on every axis and a uniform scale factor.
    pub fn uniform(offset: f32, scale: f32, rotation_degrees: Vec3) -> Self {
        Self::new(Vec3::splat(offset), Vec3::splat(scale), rotation_degrees)
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn rotation_degrees(&self) -> Vec3 {
        self.rotation_degrees
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn translation_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
    }

    pub fn scale_matrix(&self) -> Mat4 {
        Mat4::from_scale(self.scale)
    }

    /// Rotation composed as a quaternion: X first, then Y, then Z.
    pub fn rotation_matrix(&self) -> Mat4 {
        let r = self.rotation_degrees;
        Mat4::from_quat(Quat::from_euler(
            EulerRot::ZYX,
            r.z.to_radians(),
            r.y.to_radians(),
            r.x.to_radians(),
        ))
    }

    pub fn set(&mut self, translation: Vec3, scale: Vec3, rotation_degrees: Vec3) {
        self.translation = translation;
        self.scale = scale;
        self.rotation_degrees = rotation_degrees;
        self.rebuild();
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.rebuild();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.rebuild();
    }

    pub fn set_rotation(&mut self, rotation_degrees: Vec3) {
        self.rotation_degrees = rotation_degrees;
        self.rebuild();
    }

    /// `model = R * model`
    pub fn accumulate_rotation(&mut self) {
        self.model = self.rotation_matrix() * self.model;
    }

    /// `model = T * model`
    pub fn accumulate_translation(&mut self) {
        self.model = self.translation_matrix() * self.model;
    }

    /// `model = S * model`
    pub fn accumulate_scale(&mut self) {
        self.model = self.scale_matrix() * self.model;
    }

    /// `model = (T * R * S) * model`
    pub fn accumulate(&mut self) {
        self.model =
            self.translation_matrix() * self.rotation_matrix() * self.scale_matrix() * self.model;
    }

    fn rebuild(&mut self) {
        self.model = self.translation_matrix() * self.scale_matrix() * self.rotation_matrix();
    }
}

impl Mul for Transform {
    type Output = Mat4;

    fn mul(self, rhs: Transform) -> Mat4 {
        self.model * rhs.model
    }
}

impl Mul<Mat4> for Transform {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        self.model * rhs
    }
}

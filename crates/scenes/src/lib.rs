#![deny(unsafe_code)]
//! Scene registry: maps scene names to the built-in tutorial scenes and
//! provides frame snapshots.
//!
//! This crate sits between `learngl-core` (which defines the `Scene` trait
//! and the GPU resource wrappers) and the desktop binary. Everything here
//! drives a `&dyn Gpu`, so the scenes run unchanged against the headless
//! backend in tests.

pub mod cubes;
pub mod geometry;
pub mod model;
pub mod pixel;
pub mod quad;
pub mod shaders;

#[cfg(feature = "png")]
pub mod snapshot;

use cubes::CubesScene;
use learngl_core::gpu::{Gpu, PixelFormat};
use learngl_core::{AppConfig, FrameCtx, GlError, Resources, Scene, Texture2D, TextureKind};
use model::ModelScene;
use quad::QuadScene;
use std::path::Path;

/// All available scene names.
const SCENE_NAMES: &[&str] = &["quad", "cubes", "model"];

/// Enumeration of the built-in scenes.
///
/// Wraps each scene and delegates `Scene` trait methods. Use
/// [`SceneKind::from_name`] for string-based construction.
#[derive(Debug)]
pub enum SceneKind {
    /// Textured, pulsing quad with stepped spin and drift.
    Quad(QuadScene),
    /// Ten textured cubes and a free-fly camera.
    Cubes(CubesScene),
    /// Lit glTF model with a stencil outline.
    Model(ModelScene),
}

impl SceneKind {
    /// Builds a scene by name, registering its GPU objects in `resources`.
    ///
    /// Returns `GlError::InvalidArgument` if the name is not recognized.
    pub fn from_name(
        name: &str,
        config: &AppConfig,
        gpu: &dyn Gpu,
        resources: &mut Resources,
    ) -> Result<Self, GlError> {
        match name {
            "quad" => Ok(SceneKind::Quad(QuadScene::new(config, gpu, resources)?)),
            "cubes" => Ok(SceneKind::Cubes(CubesScene::new(config, gpu, resources)?)),
            "model" => Ok(SceneKind::Model(ModelScene::new(config, gpu, resources)?)),
            _ => Err(GlError::InvalidArgument(format!(
                "unknown scene '{name}' (available: {})",
                SCENE_NAMES.join(", ")
            ))),
        }
    }

    /// Returns a slice of all recognized scene names.
    pub fn list_scenes() -> &'static [&'static str] {
        SCENE_NAMES
    }
}

impl Scene for SceneKind {
    fn name(&self) -> &str {
        match self {
            SceneKind::Quad(s) => s.name(),
            SceneKind::Cubes(s) => s.name(),
            SceneKind::Model(s) => s.name(),
        }
    }

    fn update(&mut self, ctx: &mut FrameCtx<'_>) -> Result<(), GlError> {
        match self {
            SceneKind::Quad(s) => s.update(ctx),
            SceneKind::Cubes(s) => s.update(ctx),
            SceneKind::Model(s) => s.update(ctx),
        }
    }

    fn render(&mut self, ctx: &mut FrameCtx<'_>) -> Result<(), GlError> {
        match self {
            SceneKind::Quad(s) => s.render(ctx),
            SceneKind::Cubes(s) => s.render(ctx),
            SceneKind::Model(s) => s.render(ctx),
        }
    }
}

/// Loads `path`, or logs the failure and uploads the checkerboard
/// placeholder for `kind` instead.
pub(crate) fn texture_or_placeholder(
    gpu: &dyn Gpu,
    path: impl AsRef<Path>,
    format: PixelFormat,
    kind: TextureKind,
) -> Result<Texture2D, GlError> {
    match Texture2D::load(gpu, path.as_ref(), format, kind) {
        Ok(texture) => Ok(texture),
        Err(GlError::TextureLoad { path, reason }) => {
            log::warn!(
                "texture '{}' unavailable ({reason}); using placeholder",
                path.display()
            );
            Texture2D::placeholder(gpu, kind)
        }
        Err(e) => Err(e),
    }
}

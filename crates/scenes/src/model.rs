//! A glTF model lit by one point light, outlined with a stencil pass.
//!
//! Without a configured or loadable model the scene draws a cube instead, so
//! it always has something to show.

use crate::geometry::cube;
use crate::shaders::{LIT_FRAGMENT, MESH_VERTEX, OUTLINE_FRAGMENT};
use glam::{Mat4, Vec3, Vec4};
use learngl_core::gpu::{ClearMask, Gpu, StencilMode};
use learngl_core::{
    AppConfig, Camera, FlyController, FrameCtx, GlError, Mesh, Model, ResourceKey, Resources,
    Scene, ShaderProgram,
};

const OBJECT_COLOR: Vec3 = Vec3::new(1.0, 0.5, 0.31);
const STENCIL_REF: u8 = 1;

/// What the scene ended up drawing.
#[derive(Debug, Clone, Copy)]
pub enum Subject {
    Model(ResourceKey<Model>),
    Cube(ResourceKey<Mesh>),
}

#[derive(Debug)]
pub struct ModelScene {
    lit: ResourceKey<ShaderProgram>,
    outline: ResourceKey<ShaderProgram>,
    subject: Subject,
    textured: bool,
    camera: Camera,
    controller: FlyController,
    light_pos: Vec3,
    light_color: Vec3,
    outline_enabled: bool,
    outline_scale: f32,
    /// Fixed point of the outline's enlargement.
    outline_center: Vec3,
    outline_color: Vec3,
    clear_color: Vec4,
}

impl ModelScene {
    /// Loads `config.model_path` (relative to the assets directory).
    ///
    /// Recognised `scene_params`: `light_pos`, `light_color`, `outline`
    /// (bool), `outline_scale` and `outline_color`.
    ///
    /// # Errors
    ///
    /// Propagates shader and camera errors. A model that fails to load is
    /// logged and replaced by a cube.
    pub fn new(
        config: &AppConfig,
        gpu: &dyn Gpu,
        resources: &mut Resources,
    ) -> Result<Self, GlError> {
        let params = &config.scene_params;
        let lit = resources.insert(ShaderProgram::build(gpu, "lit", MESH_VERTEX, LIT_FRAGMENT)?);
        let outline = resources.insert(ShaderProgram::build(
            gpu,
            "outline",
            MESH_VERTEX,
            OUTLINE_FRAGMENT,
        )?);

        let loaded = match config.model_file() {
            Some(path) => match Model::load(gpu, &path) {
                Ok(model) => Some(model),
                Err(e) => {
                    log::warn!("{e}; drawing a cube instead");
                    None
                }
            },
            None => {
                log::info!("no model_path configured; drawing a cube");
                None
            }
        };

        let mut camera = config.camera(config.aspect())?;
        // The camera frames the bounds; the outline grows about their centre.
        let (subject, textured, center) = match loaded {
            Some(model) => {
                let (min, max) = model.bounds();
                let center = (min + max) / 2.0;
                let radius = ((max - min).length() / 2.0).max(0.5);
                camera.set_position(center + Vec3::Z * radius * 2.5);
                let textured = !model.textures().is_empty();
                (Subject::Model(resources.insert(model)), textured, center)
            }
            None => {
                let (vertices, indices) = cube();
                let mesh = Mesh::create(gpu, "fallback cube", &vertices, &indices, Vec::new())?;
                (Subject::Cube(resources.insert(mesh)), false, Vec3::ZERO)
            }
        };
        let controller = FlyController::for_camera(
            &camera,
            config.camera.move_speed,
            config.camera.mouse_sensitivity,
        );

        Ok(Self {
            lit,
            outline,
            subject,
            textured,
            camera,
            controller,
            light_pos: params.vec3("light_pos", Vec3::new(1.2, 1.0, 2.0)),
            light_color: params.vec3("light_color", Vec3::ONE),
            outline_enabled: params.bool("outline", true),
            outline_scale: params.f32("outline_scale", 1.05),
            outline_center: center,
            outline_color: params.vec3("outline_color", Vec3::new(0.04, 0.28, 0.26)),
            clear_color: config.clear_color(),
        })
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Model matrix of the outline pass: the subject scaled by
    /// `outline_scale` about its bounds centre.
    pub fn outline_transform(&self) -> Mat4 {
        Mat4::from_translation(self.outline_center)
            * Mat4::from_scale(Vec3::splat(self.outline_scale))
            * Mat4::from_translation(-self.outline_center)
    }

    fn draw_subject(
        &self,
        gpu: &dyn Gpu,
        resources: &Resources,
        program: &ShaderProgram,
    ) -> Result<(), GlError> {
        match self.subject {
            Subject::Model(key) => resources
                .get(key)
                .ok_or_else(|| missing("model"))?
                .draw(gpu, program),
            Subject::Cube(key) => resources
                .get(key)
                .ok_or_else(|| missing("cube"))?
                .draw(gpu, program, &[]),
        }
    }
}

impl Scene for ModelScene {
    fn name(&self) -> &str {
        "model"
    }

    fn update(&mut self, ctx: &mut FrameCtx<'_>) -> Result<(), GlError> {
        if ctx.input.resized().is_some() {
            self.camera.set_aspect(ctx.aspect())?;
        }
        self.controller.update(&mut self.camera, ctx.input, ctx.time.dt);
        Ok(())
    }

    fn render(&mut self, ctx: &mut FrameCtx<'_>) -> Result<(), GlError> {
        let gpu = ctx.gpu;
        let resources = &*ctx.resources;
        gpu.set_depth_test(true);
        gpu.clear(self.clear_color, ClearMask::ALL);

        let view = self.camera.compute_view();
        let projection = self.camera.compute_projection();

        let lit = resources.get(self.lit).ok_or_else(|| missing("lit program"))?;
        lit.use_program(gpu)?;
        lit.set_uniform(gpu, "model", Mat4::IDENTITY)?;
        lit.set_uniform(gpu, "view", view)?;
        lit.set_uniform(gpu, "projection", projection)?;
        lit.set_uniform(gpu, "lightPos", self.light_pos)?;
        lit.set_uniform(gpu, "lightColor", self.light_color)?;
        lit.set_uniform(gpu, "viewPos", self.camera.position())?;
        lit.set_uniform(gpu, "objectColor", OBJECT_COLOR)?;
        lit.set_uniform(gpu, "useTexture", self.textured)?;

        if !self.outline_enabled {
            return self.draw_subject(gpu, resources, lit);
        }

        gpu.set_stencil(StencilMode::Write {
            reference: STENCIL_REF,
        });
        self.draw_subject(gpu, resources, lit)?;

        // Slightly enlarged copy, kept only where the object did not mark
        // the stencil buffer.
        let outline = resources
            .get(self.outline)
            .ok_or_else(|| missing("outline program"))?;
        gpu.set_stencil(StencilMode::NotEqual {
            reference: STENCIL_REF,
        });
        gpu.set_depth_test(false);
        outline.use_program(gpu)?;
        outline.set_uniform(gpu, "model", self.outline_transform())?;
        outline.set_uniform(gpu, "view", view)?;
        outline.set_uniform(gpu, "projection", projection)?;
        outline.set_uniform(gpu, "outlineColor", self.outline_color)?;
        let drawn = self.draw_subject(gpu, resources, outline);

        gpu.set_stencil(StencilMode::Disabled);
        gpu.set_depth_test(true);
        drawn
    }
}

fn missing(what: &str) -> GlError {
    GlError::InvalidArgument(format!("model scene {what} is no longer registered"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use learngl_core::gpu::UniformValue;
    use learngl_core::{FrameLoop, HeadlessWindow};
    use std::fs;
    use std::path::{Path, PathBuf};

    fn open() -> FrameLoop<HeadlessWindow> {
        let mut frame_loop = FrameLoop::new().with_frame_limit(Some(1));
        frame_loop.open(|| Ok(HeadlessWindow::new(32, 32))).unwrap();
        frame_loop
    }

    /// One textured triangle, (0,0,0) (1,0,0) (0,1,0), placed at x = 10.
    /// Its image does not exist, so it loads as the placeholder.
    const OFF_ORIGIN: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0, "translation": [10.0, 0.0, 0.0] }],
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }],
        "materials": [{ "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }],
        "textures": [{ "source": 0 }],
        "images": [{ "uri": "missing.png" }],
        "buffers": [{ "uri": "tri.bin", "byteLength": 42 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    }"#;

    fn write_off_origin(dir: &Path) -> PathBuf {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let mut bin: Vec<u8> = positions.iter().flat_map(|p| p.to_le_bytes()).collect();
        bin.extend([0u16, 1, 2].iter().flat_map(|i| i.to_le_bytes()));
        fs::write(dir.join("tri.bin"), bin).unwrap();
        let path = dir.join("tri.gltf");
        fs::write(&path, OFF_ORIGIN).unwrap();
        path
    }

    fn model_config(path: &Path) -> AppConfig {
        AppConfig {
            model_path: Some(path.to_path_buf()),
            ..AppConfig::default()
        }
    }

    fn assert_near(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-5), "{a} != {b}");
    }

    #[test]
    fn falls_back_to_cube_without_model_path() {
        let config = AppConfig::default();
        let mut frame_loop = open();
        let scene = frame_loop
            .setup(|gpu, resources| ModelScene::new(&config, gpu, resources))
            .unwrap();
        assert!(matches!(scene.subject(), Subject::Cube(_)));
    }

    #[test]
    fn unloadable_model_falls_back_to_cube() {
        let config =
            AppConfig::from_json_str(r#"{"model_path": "/nonexistent/backpack.gltf"}"#).unwrap();
        let mut frame_loop = open();
        let scene = frame_loop
            .setup(|gpu, resources| ModelScene::new(&config, gpu, resources))
            .unwrap();
        assert!(matches!(scene.subject(), Subject::Cube(_)));
    }

    #[test]
    fn outline_pass_draws_twice_and_restores_state() {
        let config = AppConfig::default();
        let mut frame_loop = open();
        let mut scene = frame_loop
            .setup(|gpu, resources| ModelScene::new(&config, gpu, resources))
            .unwrap();
        frame_loop.run(&mut scene).unwrap();

        let gpu = frame_loop.window().unwrap().headless_gpu();
        let calls = gpu.draw_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].stencil,
            StencilMode::Write {
                reference: STENCIL_REF
            }
        );
        assert_eq!(
            calls[1].stencil,
            StencilMode::NotEqual {
                reference: STENCIL_REF
            }
        );
        assert_ne!(calls[0].program, calls[1].program);
        assert_eq!(gpu.stencil(), StencilMode::Disabled);
        assert!(gpu.depth_test());
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn outline_can_be_disabled() {
        let config = AppConfig::from_json_str(r#"{"scene_params": {"outline": false}}"#).unwrap();
        let mut frame_loop = open();
        let mut scene = frame_loop
            .setup(|gpu, resources| ModelScene::new(&config, gpu, resources))
            .unwrap();
        frame_loop.step(&mut scene).unwrap();
        let gpu = frame_loop.window().unwrap().headless_gpu();
        let calls = gpu.draw_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].stencil, StencilMode::Disabled);
    }

    #[test]
    fn loaded_model_frames_camera_on_its_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let config = model_config(&write_off_origin(dir.path()));
        let mut frame_loop = open();
        let scene = frame_loop
            .setup(|gpu, resources| ModelScene::new(&config, gpu, resources))
            .unwrap();

        assert!(matches!(scene.subject(), Subject::Model(_)));
        let center = Vec3::new(10.5, 0.5, 0.0);
        let radius = Vec3::new(1.0, 1.0, 0.0).length() / 2.0;
        assert_near(scene.camera().position(), center + Vec3::Z * radius * 2.5);
    }

    #[test]
    fn textured_model_sets_use_texture() {
        let dir = tempfile::tempdir().unwrap();
        let config = model_config(&write_off_origin(dir.path()));
        let mut frame_loop = open();
        let mut scene = frame_loop
            .setup(|gpu, resources| ModelScene::new(&config, gpu, resources))
            .unwrap();
        frame_loop.step(&mut scene).unwrap();

        let gpu = frame_loop.window().unwrap().headless_gpu();
        let lit = gpu.draw_calls()[0].program.unwrap();
        assert_eq!(gpu.uniform_value(lit, "useTexture"), Some(UniformValue::Int(1)));
    }

    #[test]
    fn outline_grows_about_the_model_center() {
        let dir = tempfile::tempdir().unwrap();
        let config = model_config(&write_off_origin(dir.path()));
        let mut frame_loop = open();
        let mut scene = frame_loop
            .setup(|gpu, resources| ModelScene::new(&config, gpu, resources))
            .unwrap();
        frame_loop.step(&mut scene).unwrap();

        let gpu = frame_loop.window().unwrap().headless_gpu();
        let calls = gpu.draw_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].vertex_array, calls[1].vertex_array);
        assert_eq!(
            calls[1].stencil,
            StencilMode::NotEqual {
                reference: STENCIL_REF
            }
        );

        let Some(UniformValue::Mat4(model)) = gpu.uniform_value(calls[1].program.unwrap(), "model")
        else {
            panic!("outline program has no model matrix");
        };
        let center = Vec3::new(10.5, 0.5, 0.0);
        assert_near(model.transform_point3(center), center);
        assert_near(
            model.transform_point3(Vec3::new(11.0, 0.5, 0.0)),
            Vec3::new(11.025, 0.5, 0.0),
        );
    }

    #[test]
    fn untextured_subject_uses_object_color() {
        let config = AppConfig::default();
        let mut frame_loop = open();
        let mut scene = frame_loop
            .setup(|gpu, resources| ModelScene::new(&config, gpu, resources))
            .unwrap();
        frame_loop.step(&mut scene).unwrap();
        let gpu = frame_loop.window().unwrap().headless_gpu();
        let lit = gpu.draw_calls()[0].program.unwrap();
        assert_eq!(gpu.uniform_value(lit, "useTexture"), Some(UniformValue::Int(0)));
    }
}

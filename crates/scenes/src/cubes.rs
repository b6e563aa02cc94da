//! Ten textured cubes seen through the free-fly camera.

use crate::geometry::{cube, CUBE_POSITIONS};
use crate::shaders::{CUBES_FRAGMENT, MESH_VERTEX};
use crate::texture_or_placeholder;
use glam::{Mat4, Vec3, Vec4};
use learngl_core::gpu::{ClearMask, Gpu, PixelFormat};
use learngl_core::{
    AppConfig, Camera, FlyController, FrameCtx, GlError, Mesh, ResourceKey, Resources, Scene,
    ShaderProgram, Texture2D, TextureKind,
};

#[derive(Debug)]
pub struct CubesScene {
    program: ResourceKey<ShaderProgram>,
    mesh: ResourceKey<Mesh>,
    textures: [ResourceKey<Texture2D>; 2],
    camera: Camera,
    controller: FlyController,
    count: usize,
    /// Degrees per second each cube turns; cube `i` turns `i + 1` times as fast.
    spin_speed: f32,
    clear_color: Vec4,
}

impl CubesScene {
    /// Recognised `scene_params`: `count` (1 to 10 cubes) and `spin_speed`
    /// (degrees per second).
    ///
    /// # Errors
    ///
    /// Propagates shader, mesh and camera errors.
    pub fn new(
        config: &AppConfig,
        gpu: &dyn Gpu,
        resources: &mut Resources,
    ) -> Result<Self, GlError> {
        let program = ShaderProgram::build(gpu, "cubes", MESH_VERTEX, CUBES_FRAGMENT)?;
        let program = resources.insert(program);
        let (vertices, indices) = cube();
        let mesh = resources.insert(Mesh::create(gpu, "cube", &vertices, &indices, Vec::new())?);

        let container = texture_or_placeholder(
            gpu,
            config.asset("textures/container.png"),
            PixelFormat::Rgb,
            TextureKind::Diffuse,
        )?;
        let container = resources.insert(container);
        let face = texture_or_placeholder(
            gpu,
            config.asset("textures/awesomeface.png"),
            PixelFormat::Rgba,
            TextureKind::Diffuse,
        )?;
        let face = resources.insert(face);

        let camera = config.camera(config.aspect())?;
        let controller = FlyController::for_camera(
            &camera,
            config.camera.move_speed,
            config.camera.mouse_sensitivity,
        );
        let count = config
            .scene_params
            .u32("count", CUBE_POSITIONS.len() as u32)
            .clamp(1, CUBE_POSITIONS.len() as u32) as usize;

        Ok(Self {
            program,
            mesh,
            textures: [container, face],
            camera,
            controller,
            count,
            spin_speed: config.scene_params.f32("spin_speed", 0.0),
            clear_color: config.clear_color(),
        })
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Model matrix of cube `index` at `elapsed` seconds.
    pub fn model_matrix(&self, index: usize, elapsed: f32) -> Mat4 {
        let position = CUBE_POSITIONS[index % CUBE_POSITIONS.len()];
        let angle = 20.0 * index as f32 + self.spin_speed * (index as f32 + 1.0) * elapsed;
        Mat4::from_translation(position)
            * Mat4::from_axis_angle(Vec3::new(1.0, 0.3, 0.5).normalize(), angle.to_radians())
    }
}

impl Scene for CubesScene {
    fn name(&self) -> &str {
        "cubes"
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
        gpu.set_depth_test(true);
        gpu.clear(self.clear_color, ClearMask::ALL);

        let resources = &*ctx.resources;
        let missing = |what: &str| {
            GlError::InvalidArgument(format!("cubes {what} is no longer registered"))
        };
        let program = resources.get(self.program).ok_or_else(|| missing("program"))?;
        let mesh = resources.get(self.mesh).ok_or_else(|| missing("mesh"))?;

        program.use_program(gpu)?;
        program.set_uniform(gpu, "view", self.camera.compute_view())?;
        program.set_uniform(gpu, "projection", self.camera.compute_projection())?;
        for (unit, key) in self.textures.iter().enumerate() {
            let texture = resources.get(*key).ok_or_else(|| missing("texture"))?;
            texture.bind(gpu, unit as u32)?;
            program.set_uniform(gpu, &format!("texture_diffuse{}", unit + 1), unit as i32)?;
        }
        gpu.active_texture(0);

        for i in 0..self.count {
            program.set_uniform(gpu, "model", self.model_matrix(i, ctx.time.elapsed))?;
            mesh.draw(gpu, program, &[])?;
        }
        Ok(())
    }
}

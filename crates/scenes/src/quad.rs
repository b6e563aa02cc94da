//! The first lesson: a textured rectangle that pulses, spins and drifts.

use crate::geometry::{upload_interleaved, QUAD_COMPONENTS, QUAD_INDICES, QUAD_VERTICES};
use crate::shaders::{QUAD_FRAGMENT, QUAD_VERTEX};
use crate::texture_or_placeholder;
use glam::{Mat4, Vec3, Vec4};
use learngl_core::gpu::{ClearMask, Gpu, IndexType, PixelFormat, Primitive};
use learngl_core::{
    AppConfig, FrameCtx, GlError, ResourceKey, Resources, Scene, ShaderProgram, Texture2D,
    TextureKind, Transform, VertexLayout,
};

/// Seconds between animation steps.
pub const DEFAULT_STEP_PERIOD: f32 = 0.05;

#[derive(Debug)]
pub struct QuadScene {
    program: ResourceKey<ShaderProgram>,
    layout: ResourceKey<VertexLayout>,
    textures: [ResourceKey<Texture2D>; 2],
    spin: Transform,
    orbit: Transform,
    transform: Mat4,
    step_period: f32,
    last_step: f32,
    clear_color: Vec4,
}

impl QuadScene {
    /// Recognised `scene_params`: `step_period` (seconds), `scale`,
    /// `spin_degrees` (per step about Z) and `orbit_step` (units per step).
    ///
    /// # Errors
    ///
    /// Propagates shader, buffer and layout errors. Missing images are
    /// replaced by placeholders.
    pub fn new(
        config: &AppConfig,
        gpu: &dyn Gpu,
        resources: &mut Resources,
    ) -> Result<Self, GlError> {
        let params = &config.scene_params;
        let program = ShaderProgram::build(gpu, "quad", QUAD_VERTEX, QUAD_FRAGMENT)?;
        let program = resources.insert(program);
        let layout = upload_interleaved(
            gpu,
            resources,
            "quad",
            &QUAD_VERTICES,
            &QUAD_INDICES,
            &QUAD_COMPONENTS,
        )?;
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

        let spin = Transform::uniform(
            0.0,
            params.f32("scale", 0.1),
            Vec3::new(0.0, 0.0, params.f32("spin_degrees", 5.0)),
        );
        let orbit = Transform::uniform(
            params.f32("orbit_step", 0.01),
            1.0,
            Vec3::new(0.0, 0.0, 5.0),
        );

        let shader = program_ref(resources, program)?;
        shader.set_uniform(gpu, "ourTexture1", 0)?;
        shader.set_uniform(gpu, "ourTexture2", 1)?;
        shader.set_uniform(gpu, "transform", spin.model())?;

        Ok(Self {
            program,
            layout,
            textures: [container, face],
            spin,
            orbit,
            transform: spin.model(),
            step_period: params.f32("step_period", DEFAULT_STEP_PERIOD),
            last_step: 0.0,
            clear_color: config.clear_color(),
        })
    }

    /// The matrix currently uploaded as `transform`.
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// `ourColor` at `elapsed` seconds: a sine wave between 0 and 1.
    pub fn pulse(elapsed: f32) -> f32 {
        elapsed.sin() / 2.0 + 0.5
    }
}

impl Scene for QuadScene {
    fn name(&self) -> &str {
        "quad"
    }

    fn update(&mut self, ctx: &mut FrameCtx<'_>) -> Result<(), GlError> {
        let now = ctx.time.elapsed;
        if now - self.last_step > self.step_period {
            self.spin.accumulate_rotation();
            self.orbit.accumulate_translation();
            self.transform = self.orbit * self.spin;
            self.last_step = now;
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut FrameCtx<'_>) -> Result<(), GlError> {
        let gpu = ctx.gpu;
        gpu.clear(self.clear_color, ClearMask::COLOR);

        let program = program_ref(ctx.resources, self.program)?;
        program.use_program(gpu)?;
        program.set_uniform(gpu, "ourColor", Self::pulse(ctx.time.elapsed))?;
        program.set_uniform(gpu, "transform", self.transform)?;

        for (unit, key) in self.textures.iter().enumerate() {
            ctx.resources
                .get(*key)
                .ok_or_else(|| missing("texture"))?
                .bind(gpu, unit as u32)?;
        }
        gpu.active_texture(0);

        let layout = ctx.resources.get(self.layout).ok_or_else(|| missing("vertex layout"))?;
        layout.bind(gpu)?;
        gpu.draw_elements(
            Primitive::Triangles,
            QUAD_INDICES.len() as u32,
            IndexType::UnsignedInt,
            0,
        );
        layout.unbind(gpu)
    }
}

fn program_ref(
    resources: &Resources,
    key: ResourceKey<ShaderProgram>,
) -> Result<&ShaderProgram, GlError> {
    resources.get(key).ok_or_else(|| missing("shader program"))
}

fn missing(what: &str) -> GlError {
    GlError::InvalidArgument(format!("quad {what} is no longer registered"))
}

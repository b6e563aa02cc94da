//! [`Gpu`] implementation over a live `glow::Context`.
//!
//! Every method is a thin translation into the matching GL entry point.
//! The context must be current on the calling thread for the lifetime of
//! this value.

use super::{
    AttributeDesc, BufferKind, BufferUsage, ClearMask, ComponentType, DriverInfo, Filter,
    GlHandle, Gpu, IndexType, PixelFormat, Primitive, Sampler, ShaderStage, StencilMode,
    UniformLocation, UniformValue, WrapMode,
};
use glam::Vec4;
use glow::HasContext;
use std::fmt;

/// Forwards [`Gpu`] calls to OpenGL through glow.
pub struct GlowGpu {
    gl: glow::Context,
}

impl fmt::Debug for GlowGpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlowGpu").finish_non_exhaustive()
    }
}

impl GlowGpu {
    /// Wraps a context whose function pointers are already loaded.
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// Borrows the underlying glow context.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

fn buffer_target(kind: BufferKind) -> u32 {
    match kind {
        BufferKind::Vertex => glow::ARRAY_BUFFER,
        BufferKind::Index => glow::ELEMENT_ARRAY_BUFFER,
    }
}

fn usage_hint(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::Static => glow::STATIC_DRAW,
        BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
    }
}

fn component_enum(ty: ComponentType) -> u32 {
    match ty {
        ComponentType::Float => glow::FLOAT,
        ComponentType::Byte => glow::BYTE,
        ComponentType::UnsignedByte => glow::UNSIGNED_BYTE,
        ComponentType::Short => glow::SHORT,
        ComponentType::UnsignedShort => glow::UNSIGNED_SHORT,
        ComponentType::Int => glow::INT,
        ComponentType::UnsignedInt => glow::UNSIGNED_INT,
    }
}

fn format_enum(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Red => glow::RED,
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Rgba => glow::RGBA,
    }
}

fn wrap_enum(wrap: WrapMode) -> i32 {
    match wrap {
        WrapMode::Repeat => glow::REPEAT as i32,
        WrapMode::MirroredRepeat => glow::MIRRORED_REPEAT as i32,
        WrapMode::ClampToEdge => glow::CLAMP_TO_EDGE as i32,
    }
}

fn filter_enum(filter: Filter) -> i32 {
    match filter {
        Filter::Nearest => glow::NEAREST as i32,
        Filter::Linear => glow::LINEAR as i32,
        Filter::LinearMipmapLinear => glow::LINEAR_MIPMAP_LINEAR as i32,
    }
}

fn primitive_enum(primitive: Primitive) -> u32 {
    match primitive {
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::Lines => glow::LINES,
        Primitive::Points => glow::POINTS,
    }
}

fn stage_enum(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn buffer(h: GlHandle) -> glow::NativeBuffer {
    glow::NativeBuffer(h.non_zero())
}

fn vertex_array(h: GlHandle) -> glow::NativeVertexArray {
    glow::NativeVertexArray(h.non_zero())
}

fn texture(h: GlHandle) -> glow::NativeTexture {
    glow::NativeTexture(h.non_zero())
}

fn shader(h: GlHandle) -> glow::NativeShader {
    glow::NativeShader(h.non_zero())
}

fn program(h: GlHandle) -> glow::NativeProgram {
    glow::NativeProgram(h.non_zero())
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

// SAFETY (applies to every block below): glow marks raw GL entry points as
// unsafe. Handles passed in were produced by this context and enum
// arguments come from the exhaustive translation tables above.
#[allow(unsafe_code)]
impl Gpu for GlowGpu {
    fn create_buffer(&self) -> Result<GlHandle, String> {
        let b = unsafe { self.gl.create_buffer()? };
        Ok(GlHandle::from_non_zero(b.0))
    }

    fn bind_buffer(&self, kind: BufferKind, b: Option<GlHandle>) {
        unsafe { self.gl.bind_buffer(buffer_target(kind), b.map(buffer)) }
    }

    fn buffer_data(&self, kind: BufferKind, data: &[u8], usage: BufferUsage) {
        unsafe {
            self.gl
                .buffer_data_u8_slice(buffer_target(kind), data, usage_hint(usage))
        }
    }

    fn delete_buffer(&self, b: GlHandle) {
        unsafe { self.gl.delete_buffer(buffer(b)) }
    }

    fn create_vertex_array(&self) -> Result<GlHandle, String> {
        let v = unsafe { self.gl.create_vertex_array()? };
        Ok(GlHandle::from_non_zero(v.0))
    }

    fn bind_vertex_array(&self, v: Option<GlHandle>) {
        unsafe { self.gl.bind_vertex_array(v.map(vertex_array)) }
    }

    fn vertex_attrib_pointer(&self, attr: &AttributeDesc) {
        let size = to_i32(attr.components);
        let stride = to_i32(attr.stride_bytes);
        let offset = to_i32(attr.offset_bytes);
        let ty = component_enum(attr.component_type);
        unsafe {
            match attr.component_type {
                ComponentType::Float => self.gl.vertex_attrib_pointer_f32(
                    attr.slot,
                    size,
                    ty,
                    attr.normalized,
                    stride,
                    offset,
                ),
                // Normalized integers are read as floats by the shader.
                _ if attr.normalized => self
                    .gl
                    .vertex_attrib_pointer_f32(attr.slot, size, ty, true, stride, offset),
                _ => self
                    .gl
                    .vertex_attrib_pointer_i32(attr.slot, size, ty, stride, offset),
            }
        }
    }

    fn enable_vertex_attrib_array(&self, slot: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(slot) }
    }

    fn delete_vertex_array(&self, v: GlHandle) {
        unsafe { self.gl.delete_vertex_array(vertex_array(v)) }
    }

    fn create_texture(&self) -> Result<GlHandle, String> {
        let t = unsafe { self.gl.create_texture()? };
        Ok(GlHandle::from_non_zero(t.0))
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&self, t: Option<GlHandle>) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, t.map(texture)) }
    }

    fn set_sampler(&self, sampler: &Sampler) {
        let wrap = wrap_enum(sampler.wrap);
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                filter_enum(sampler.min_filter),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                filter_enum(sampler.mag_filter),
            );
        }
    }

    fn tex_image_2d(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<(), String> {
        let gl_format = format_enum(format);
        let error = unsafe {
            // Rows of 1- and 3-channel images are not 4-byte aligned.
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                gl_format as i32,
                to_i32(width),
                to_i32(height),
                0,
                gl_format,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
            self.gl.get_error()
        };
        match error {
            glow::NO_ERROR => Ok(()),
            glow::OUT_OF_MEMORY => Err("out of memory (GL_OUT_OF_MEMORY)".into()),
            code => Err(format!("glTexImage2D failed with GL error 0x{code:04X}")),
        }
    }

    fn generate_mipmap(&self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) }
    }

    fn delete_texture(&self, t: GlHandle) {
        unsafe { self.gl.delete_texture(texture(t)) }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<GlHandle, String> {
        let s = unsafe { self.gl.create_shader(stage_enum(stage))? };
        Ok(GlHandle::from_non_zero(s.0))
    }

    fn compile_shader(&self, s: GlHandle, source: &str) -> bool {
        unsafe {
            self.gl.shader_source(shader(s), source);
            self.gl.compile_shader(shader(s));
            self.gl.get_shader_compile_status(shader(s))
        }
    }

    fn shader_info_log(&self, s: GlHandle) -> String {
        unsafe { self.gl.get_shader_info_log(shader(s)) }
    }

    fn delete_shader(&self, s: GlHandle) {
        unsafe { self.gl.delete_shader(shader(s)) }
    }

    fn create_program(&self) -> Result<GlHandle, String> {
        let p = unsafe { self.gl.create_program()? };
        Ok(GlHandle::from_non_zero(p.0))
    }

    fn attach_shader(&self, p: GlHandle, s: GlHandle) {
        unsafe { self.gl.attach_shader(program(p), shader(s)) }
    }

    fn detach_shader(&self, p: GlHandle, s: GlHandle) {
        unsafe { self.gl.detach_shader(program(p), shader(s)) }
    }

    fn link_program(&self, p: GlHandle) -> bool {
        unsafe {
            self.gl.link_program(program(p));
            self.gl.get_program_link_status(program(p))
        }
    }

    fn program_info_log(&self, p: GlHandle) -> String {
        unsafe { self.gl.get_program_info_log(program(p)) }
    }

    fn use_program(&self, p: Option<GlHandle>) {
        unsafe { self.gl.use_program(p.map(program)) }
    }

    fn uniform_location(&self, p: GlHandle, name: &str) -> Option<UniformLocation> {
        unsafe { self.gl.get_uniform_location(program(p), name) }.map(|l| UniformLocation(l.0))
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let loc = glow::NativeUniformLocation(location.0);
        let loc = Some(&loc);
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(loc, *v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(loc, *v),
                UniformValue::Vec2(v) => self.gl.uniform_2_f32(loc, v.x, v.y),
                UniformValue::Vec3(v) => self.gl.uniform_3_f32(loc, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.gl.uniform_4_f32(loc, v.x, v.y, v.z, v.w),
                UniformValue::Mat3(m) => {
                    self.gl
                        .uniform_matrix_3_f32_slice(loc, false, &m.to_cols_array())
                }
                UniformValue::Mat4(m) => {
                    self.gl
                        .uniform_matrix_4_f32_slice(loc, false, &m.to_cols_array())
                }
            }
        }
    }

    fn delete_program(&self, p: GlHandle) {
        unsafe { self.gl.delete_program(program(p)) }
    }

    fn viewport(&self, width: u32, height: u32) {
        unsafe { self.gl.viewport(0, 0, to_i32(width), to_i32(height)) }
    }

    fn clear(&self, color: Vec4, mask: ClearMask) {
        let mut bits = 0;
        if mask.color {
            bits |= glow::COLOR_BUFFER_BIT;
        }
        if mask.depth {
            bits |= glow::DEPTH_BUFFER_BIT;
        }
        if mask.stencil {
            bits |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe {
            self.gl.clear_color(color.x, color.y, color.z, color.w);
            if mask.stencil {
                // Clears honour the stencil write mask.
                self.gl.stencil_mask(0xFF);
            }
            self.gl.clear(bits);
        }
    }

    fn set_depth_test(&self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::DEPTH_TEST);
                self.gl.depth_func(glow::LESS);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn set_stencil(&self, mode: StencilMode) {
        unsafe {
            match mode {
                StencilMode::Disabled => {
                    self.gl.stencil_mask(0xFF);
                    self.gl.disable(glow::STENCIL_TEST);
                }
                StencilMode::Write { reference } => {
                    self.gl.enable(glow::STENCIL_TEST);
                    self.gl.stencil_op(glow::KEEP, glow::KEEP, glow::REPLACE);
                    self.gl
                        .stencil_func(glow::ALWAYS, i32::from(reference), 0xFF);
                    self.gl.stencil_mask(0xFF);
                }
                StencilMode::NotEqual { reference } => {
                    self.gl.enable(glow::STENCIL_TEST);
                    self.gl
                        .stencil_func(glow::NOTEQUAL, i32::from(reference), 0xFF);
                    self.gl.stencil_mask(0x00);
                }
            }
        }
    }

    fn draw_arrays(&self, primitive: Primitive, first: u32, count: u32) {
        unsafe {
            self.gl
                .draw_arrays(primitive_enum(primitive), to_i32(first), to_i32(count))
        }
    }

    fn draw_elements(&self, primitive: Primitive, count: u32, index_type: IndexType, offset: u32) {
        let ty = match index_type {
            IndexType::UnsignedShort => glow::UNSIGNED_SHORT,
            IndexType::UnsignedInt => glow::UNSIGNED_INT,
        };
        unsafe {
            self.gl
                .draw_elements(primitive_enum(primitive), to_i32(count), ty, to_i32(offset))
        }
    }

    fn read_pixels(&self, width: u32, height: u32) -> Vec<u8> {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        unsafe {
            self.gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            self.gl.read_pixels(
                0,
                0,
                to_i32(width),
                to_i32(height),
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(&mut pixels)),
            );
        }
        pixels
    }

    fn driver_info(&self) -> DriverInfo {
        unsafe {
            DriverInfo {
                vendor: self.gl.get_parameter_string(glow::VENDOR),
                renderer: self.gl.get_parameter_string(glow::RENDERER),
                version: self.gl.get_parameter_string(glow::VERSION),
                shading_language: self.gl.get_parameter_string(glow::SHADING_LANGUAGE_VERSION),
                max_vertex_attributes: u32::try_from(
                    self.gl.get_parameter_i32(glow::MAX_VERTEX_ATTRIBS),
                )
                .unwrap_or(0),
            }
        }
    }
}

//! The backend seam between resource wrappers and the graphics API.
//!
//! Every GPU call made by this crate goes through the object-safe [`Gpu`]
//! trait. Two implementations ship with the crate:
//!
//! - [`GlowGpu`] forwards to a live `glow::Context` (feature `render`).
//! - [`HeadlessGpu`] keeps the same bookkeeping in memory so resource
//!   lifecycles, attribute layouts and draw sequences can run without a
//!   window or driver.
//!
//! The trait takes `&self` everywhere, mirroring `glow::HasContext`. All
//! calls are expected on the thread that owns the context.

pub mod headless;

#[cfg(feature = "render")]
pub mod glow_backend;

#[cfg(feature = "render")]
pub use glow_backend::GlowGpu;
pub use headless::HeadlessGpu;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use std::fmt;
use std::num::NonZeroU32;

/// Non-zero name of a GPU-resident object (buffer, texture, shader,
/// program or vertex array).
///
/// GL reserves `0` for "no object", so an absent handle is modelled as
/// `Option<GlHandle>` and reads back as raw value `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlHandle(NonZeroU32);

impl GlHandle {
    /// Wraps a raw GL name, returning `None` for the reserved name `0`.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Returns the raw GL name.
    pub fn raw(self) -> u32 {
        self.0.get()
    }

    pub(crate) fn from_non_zero(raw: NonZeroU32) -> Self {
        Self(raw)
    }

    pub(crate) fn non_zero(self) -> NonZeroU32 {
        self.0
    }
}

impl fmt::Display for GlHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Returns the raw name of an optional handle, `0` when absent.
pub fn raw_handle(handle: Option<GlHandle>) -> u32 {
    handle.map_or(0, GlHandle::raw)
}

/// Which binding target a data buffer lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Per-vertex attribute data (`ARRAY_BUFFER`).
    Vertex,
    /// Element indices (`ELEMENT_ARRAY_BUFFER`).
    Index,
}

impl fmt::Display for BufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferKind::Vertex => f.write_str("vertex"),
            BufferKind::Index => f.write_str("index"),
        }
    }
}

/// Upload usage hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Static,
    Dynamic,
}

/// Scalar type of one vertex attribute component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Float,
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
}

impl ComponentType {
    /// Size of one component in bytes.
    pub fn size_bytes(self) -> u32 {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::Float | ComponentType::Int | ComponentType::UnsignedInt => 4,
        }
    }
}

/// One vertex attribute binding recorded by a vertex array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDesc {
    /// Shader input location.
    pub slot: u32,
    /// Number of components (1..=4).
    pub components: u32,
    pub component_type: ComponentType,
    /// Whether integer data is normalized to [0, 1] / [-1, 1].
    pub normalized: bool,
    /// Distance in bytes between consecutive vertices; `0` means tightly packed.
    pub stride_bytes: u32,
    /// Byte offset of the first component inside a vertex.
    pub offset_bytes: u32,
}

impl AttributeDesc {
    /// Bytes covered by this attribute inside one vertex.
    pub fn size_bytes(&self) -> u32 {
        self.components * self.component_type.size_bytes()
    }
}

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Channel layout of texture pixels, both on the CPU side and on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Red,
    Rgb,
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel for 8-bit channels.
    pub fn channels(self) -> u32 {
        match self {
            PixelFormat::Red => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Sampler state applied to a texture when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    pub wrap: WrapMode,
    pub min_filter: Filter,
    pub mag_filter: Filter,
}

impl Sampler {
    /// Repeat wrap, trilinear minification, linear magnification.
    pub const MIPMAPPED_REPEAT: Sampler = Sampler {
        wrap: WrapMode::Repeat,
        min_filter: Filter::LinearMipmapLinear,
        mag_filter: Filter::Linear,
    };
}

/// Primitive topology for draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    Lines,
    Points,
}

/// Element type of a bound index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    UnsignedShort,
    UnsignedInt,
}

/// Which framebuffer planes a clear touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearMask {
    pub const COLOR: ClearMask = ClearMask {
        color: true,
        depth: false,
        stencil: false,
    };
    pub const ALL: ClearMask = ClearMask {
        color: true,
        depth: true,
        stencil: true,
    };
}

/// Stencil configuration used by the outline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilMode {
    /// Stencil test off.
    Disabled,
    /// Always pass and write `reference` wherever fragments land.
    Write { reference: u8 },
    /// Pass only where the stored value differs from `reference`; no writes.
    NotEqual { reference: u8 },
}

/// A value uploaded to a shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Int(i32::from(v))
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

/// Resolved uniform location inside a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Driver identification strings, logged once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
    pub shading_language: String,
    pub max_vertex_attributes: u32,
}

impl fmt::Display for DriverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}], {}, GLSL {}, {} vertex attributes",
            self.renderer,
            self.vendor,
            self.version,
            self.shading_language,
            self.max_vertex_attributes
        )
    }
}

/// The graphics API surface used by every resource wrapper.
///
/// Creation calls return `Err` with backend text when the context refuses
/// the allocation. Everything else mirrors the fire-and-forget style of GL.
pub trait Gpu {
    // -- buffers --
    fn create_buffer(&self) -> Result<GlHandle, String>;
    fn bind_buffer(&self, kind: BufferKind, buffer: Option<GlHandle>);
    /// Uploads `data` into the buffer currently bound to `kind`.
    fn buffer_data(&self, kind: BufferKind, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&self, buffer: GlHandle);

    // -- vertex arrays --
    fn create_vertex_array(&self) -> Result<GlHandle, String>;
    fn bind_vertex_array(&self, vertex_array: Option<GlHandle>);
    /// Records `attr` against the bound vertex array and vertex buffer.
    fn vertex_attrib_pointer(&self, attr: &AttributeDesc);
    fn enable_vertex_attrib_array(&self, slot: u32);
    fn delete_vertex_array(&self, vertex_array: GlHandle);

    // -- textures --
    fn create_texture(&self) -> Result<GlHandle, String>;
    /// Selects texture unit `unit` (0-based) for subsequent binds.
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, texture: Option<GlHandle>);
    fn set_sampler(&self, sampler: &Sampler);
    /// Uploads level 0 of the bound 2D texture from tightly packed 8-bit pixels.
    fn tex_image_2d(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<(), String>;
    fn generate_mipmap(&self);
    fn delete_texture(&self, texture: GlHandle);

    // -- shaders and programs --
    fn create_shader(&self, stage: ShaderStage) -> Result<GlHandle, String>;
    /// Sets the source and compiles; returns the compile status.
    fn compile_shader(&self, shader: GlHandle, source: &str) -> bool;
    fn shader_info_log(&self, shader: GlHandle) -> String;
    fn delete_shader(&self, shader: GlHandle);
    fn create_program(&self) -> Result<GlHandle, String>;
    fn attach_shader(&self, program: GlHandle, shader: GlHandle);
    fn detach_shader(&self, program: GlHandle, shader: GlHandle);
    /// Links the program; returns the link status.
    fn link_program(&self, program: GlHandle) -> bool;
    fn program_info_log(&self, program: GlHandle) -> String;
    fn use_program(&self, program: Option<GlHandle>);
    fn uniform_location(&self, program: GlHandle, name: &str) -> Option<UniformLocation>;
    /// Uploads to `location` of the program currently in use.
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue);
    fn delete_program(&self, program: GlHandle);

    // -- frame state --
    fn viewport(&self, width: u32, height: u32);
    fn clear(&self, color: Vec4, mask: ClearMask);
    fn set_depth_test(&self, enabled: bool);
    fn set_stencil(&self, mode: StencilMode);
    fn draw_arrays(&self, primitive: Primitive, first: u32, count: u32);
    /// Draws `count` indices from the bound index buffer starting at byte `offset`.
    fn draw_elements(&self, primitive: Primitive, count: u32, index_type: IndexType, offset: u32);
    /// Reads the bound framebuffer as tightly packed RGBA8, bottom row first.
    fn read_pixels(&self, width: u32, height: u32) -> Vec<u8>;

    fn driver_info(&self) -> DriverInfo;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gl_handle_rejects_zero() {
        assert!(GlHandle::new(0).is_none());
        assert_eq!(GlHandle::new(7).map(GlHandle::raw), Some(7));
    }

    #[test]
    fn raw_handle_of_none_is_zero() {
        assert_eq!(raw_handle(None), 0);
        assert_eq!(raw_handle(GlHandle::new(3)), 3);
    }

    #[test]
    fn component_sizes_match_gl() {
        assert_eq!(ComponentType::Float.size_bytes(), 4);
        assert_eq!(ComponentType::UnsignedShort.size_bytes(), 2);
        assert_eq!(ComponentType::UnsignedByte.size_bytes(), 1);
    }

    #[test]
    fn attribute_size_is_components_times_component_size() {
        let attr = AttributeDesc {
            slot: 0,
            components: 3,
            component_type: ComponentType::Float,
            normalized: false,
            stride_bytes: 32,
            offset_bytes: 0,
        };
        assert_eq!(attr.size_bytes(), 12);
    }

    #[test]
    fn bool_uniform_uploads_as_int() {
        assert_eq!(UniformValue::from(true), UniformValue::Int(1));
        assert_eq!(UniformValue::from(false), UniformValue::Int(0));
    }

    #[test]
    fn gpu_trait_is_object_safe() {
        let gpu = HeadlessGpu::new();
        let dyn_gpu: &dyn Gpu = &gpu;
        assert!(dyn_gpu.create_buffer().is_ok());
    }
}

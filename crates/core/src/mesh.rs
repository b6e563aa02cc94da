//! Indexed triangle meshes with interleaved vertices.

use crate::buffer::GpuBuffer;
use crate::error::GlError;
use crate::gpu::{BufferKind, BufferUsage, Gpu, IndexType, Primitive};
use crate::layout::{VertexAttribute, VertexLayout};
use crate::shader::ShaderProgram;
use crate::texture::{Texture2D, TextureKind};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use std::collections::BTreeMap;
use std::mem::{offset_of, size_of};

/// One interleaved vertex: position (slot 0), normal (slot 1), texture
/// coordinates (slot 2).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

impl Vertex {
    pub const STRIDE: u32 = size_of::<Vertex>() as u32;

    pub fn new(position: Vec3, normal: Vec3, tex_coords: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coords,
        }
    }

    /// Attribute shapes in slot order.
    pub fn attributes() -> [VertexAttribute; 3] {
        [
            VertexAttribute::floats(3, Self::STRIDE, offset_of!(Vertex, position) as u32),
            VertexAttribute::floats(3, Self::STRIDE, offset_of!(Vertex, normal) as u32),
            VertexAttribute::floats(2, Self::STRIDE, offset_of!(Vertex, tex_coords) as u32),
        ]
    }
}

/// GPU geometry plus the textures it samples.
///
/// Textures are referenced by index into a slice owned by the caller, so
/// meshes of one model can share them.
#[derive(Debug)]
pub struct Mesh {
    label: String,
    layout: VertexLayout,
    vertices: GpuBuffer,
    indices: GpuBuffer,
    vertex_count: usize,
    index_count: u32,
    textures: Vec<usize>,
}

impl Mesh {
    /// Uploads `vertices` and `indices` and records the vertex layout.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] for empty geometry or an index
    /// past the last vertex, or any allocation error. Partially created
    /// objects are released before returning.
    pub fn create(
        gpu: &dyn Gpu,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
        textures: Vec<usize>,
    ) -> Result<Self, GlError> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(GlError::InvalidArgument(format!(
                "mesh '{label}' needs vertices and indices, got {} and {}",
                vertices.len(),
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(GlError::InvalidArgument(format!(
                "mesh '{label}' index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }
        let index_count = u32::try_from(indices.len()).map_err(|_| {
            GlError::InvalidArgument(format!("mesh '{label}' has too many indices"))
        })?;

        let mut layout = VertexLayout::create(gpu, label)?;
        let mut vbo = match layout.bind(gpu).and_then(|()| {
            GpuBuffer::from_slice(gpu, label, BufferKind::Vertex, BufferUsage::Static, vertices)
        }) {
            Ok(vbo) => vbo,
            Err(e) => {
                discard(gpu, &mut layout, &mut []);
                return Err(e);
            }
        };
        // Created while the layout is bound, so the layout captures it.
        let ebo = GpuBuffer::from_slice(
            gpu,
            label,
            BufferKind::Index,
            BufferUsage::Static,
            indices,
        );
        let mut ebo = match ebo {
            Ok(ebo) => ebo,
            Err(e) => {
                discard(gpu, &mut layout, &mut [&mut vbo]);
                return Err(e);
            }
        };

        let declared = Vertex::attributes()
            .into_iter()
            .try_for_each(|attr| layout.declare_attribute(gpu, &vbo, attr).map(|_| ()))
            .and_then(|()| layout.enable_all(gpu))
            .and_then(|()| layout.unbind(gpu));
        if let Err(e) = declared {
            discard(gpu, &mut layout, &mut [&mut vbo, &mut ebo]);
            return Err(e);
        }

        log::debug!(
            "created mesh '{label}' ({} vertices, {index_count} indices, {} textures)",
            vertices.len(),
            textures.len()
        );
        Ok(Self {
            label: label.to_string(),
            layout,
            vertices: vbo,
            indices: ebo,
            vertex_count: vertices.len(),
            index_count,
            textures,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Indices into the texture slice passed to [`draw`](Self::draw).
    pub fn texture_indices(&self) -> &[usize] {
        &self.textures
    }

    pub fn is_live(&self) -> bool {
        self.layout.is_live()
    }

    /// Binds texture `i` of this mesh to unit `i`, points the matching
    /// `texture_<kind>N` sampler at it (N counts from 1 per kind), then
    /// draws all indices.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] if a texture index is outside
    /// `textures`, and propagates program, texture and layout errors.
    pub fn draw(
        &self,
        gpu: &dyn Gpu,
        program: &ShaderProgram,
        textures: &[Texture2D],
    ) -> Result<(), GlError> {
        program.use_program(gpu)?;

        let mut counters: BTreeMap<TextureKind, u32> = BTreeMap::new();
        for (unit, &index) in self.textures.iter().enumerate() {
            let texture = textures.get(index).ok_or_else(|| {
                GlError::InvalidArgument(format!(
                    "mesh '{}' references texture {index}, only {} available",
                    self.label,
                    textures.len()
                ))
            })?;
            let unit = unit as u32;
            let n = counters.entry(texture.kind()).or_insert(0);
            *n += 1;
            let name = format!("{}{}", texture.kind().uniform_prefix(), n);
            program.set_uniform(gpu, &name, unit as i32)?;
            texture.bind(gpu, unit)?;
        }
        gpu.active_texture(0);

        self.layout.bind(gpu)?;
        gpu.draw_elements(Primitive::Triangles, self.index_count, IndexType::UnsignedInt, 0);
        self.layout.unbind(gpu)
    }

    /// Releases the layout and both buffers. Textures belong to the caller.
    ///
    /// # Errors
    ///
    /// Returns the first failure; every object is still attempted.
    pub fn release(&mut self, gpu: &dyn Gpu) -> Result<(), GlError> {
        let results = [
            self.layout.release(gpu),
            self.vertices.release(gpu),
            self.indices.release(gpu),
        ];
        results.into_iter().collect::<Result<Vec<()>, _>>().map(|_| ())
    }
}

/// Releases objects from a build that failed part way.
fn discard(gpu: &dyn Gpu, layout: &mut VertexLayout, buffers: &mut [&mut GpuBuffer]) {
    let results = std::iter::once(layout.release(gpu))
        .chain(buffers.iter_mut().map(|b| b.release(gpu)));
    for result in results {
        if let Err(e) = result {
            log::warn!("cleanup after failed mesh build: {e}");
        }
    }
}

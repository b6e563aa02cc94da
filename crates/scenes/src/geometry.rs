//! Built-in geometry and the helper that uploads interleaved float data.

use glam::{Vec2, Vec3};
use learngl_core::gpu::{BufferKind, BufferUsage, Gpu};
use learngl_core::{
    GlError, GpuBuffer, ResourceKey, Resources, Vertex, VertexAttribute, VertexLayout,
};

/// Floats per quad vertex: position (3), colour (3), texture coordinates (2).
pub const QUAD_COMPONENTS: [u32; 3] = [3, 3, 2];

#[rustfmt::skip]
pub const QUAD_VERTICES: [f32; 32] = [
    // position          colour          uv
     0.5,  0.5, 0.0,     1.0, 0.0, 0.0,  1.0, 1.0, // top right
     0.5, -0.5, 0.0,     0.0, 0.0, 0.0,  1.0, 0.0, // bottom right
    -0.5, -0.5, 0.0,     0.0, 1.0, 0.0,  0.0, 0.0, // bottom left
    -0.5,  0.5, 0.0,     0.0, 0.0, 1.0,  0.0, 1.0, // top left
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

/// World positions of the ten cubes in the cubes scene.
pub const CUBE_POSITIONS: [Vec3; 10] = [
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(2.0, 5.0, -15.0),
    Vec3::new(-1.5, -2.2, -2.5),
    Vec3::new(-3.8, -2.0, -12.3),
    Vec3::new(2.4, -0.4, -3.5),
    Vec3::new(-1.7, 3.0, -7.5),
    Vec3::new(1.3, -2.0, -2.5),
    Vec3::new(1.5, 2.0, -2.5),
    Vec3::new(1.5, 0.2, -1.5),
    Vec3::new(-1.3, 1.0, -1.5),
];

/// Unit cube centred on the origin: four vertices per face with outward
/// normals, two counter-clockwise triangles per face.
pub fn cube() -> (Vec<Vertex>, Vec<u32>) {
    // (normal, u axis, v axis) per face
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];
    let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        for (s, t) in corners {
            let position = normal * 0.5 + u * (s - 0.5) + v * (t - 0.5);
            vertices.push(Vertex::new(position, normal, Vec2::new(s, t)));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// Uploads tightly packed float vertices plus indices and records one
/// attribute per entry of `components`.
///
/// Every object is registered in `resources` as soon as it exists, so a
/// failure part way is cleaned up when the registry is released.
///
/// # Errors
///
/// Propagates allocation and attribute errors.
pub fn upload_interleaved(
    gpu: &dyn Gpu,
    resources: &mut Resources,
    label: &str,
    vertices: &[f32],
    indices: &[u32],
    components: &[u32],
) -> Result<ResourceKey<VertexLayout>, GlError> {
    let vbo = GpuBuffer::from_slice(gpu, label, BufferKind::Vertex, BufferUsage::Static, vertices)?;
    let vbo = resources.insert(vbo);
    let mut layout = VertexLayout::create(gpu, label)?;
    let described = describe(gpu, resources, &mut layout, vbo, label, indices, components);
    let key = resources.insert(layout);
    described.map(|()| key)
}

fn describe(
    gpu: &dyn Gpu,
    resources: &mut Resources,
    layout: &mut VertexLayout,
    vbo: ResourceKey<GpuBuffer>,
    label: &str,
    indices: &[u32],
    components: &[u32],
) -> Result<(), GlError> {
    layout.bind(gpu)?;
    // Created while the layout is bound, so the layout captures it.
    let ebo = GpuBuffer::from_slice(gpu, label, BufferKind::Index, BufferUsage::Static, indices)?;
    resources.insert(ebo);

    let floats = components.iter().sum::<u32>();
    let stride = floats * std::mem::size_of::<f32>() as u32;
    let buffer = resources
        .get(vbo)
        .ok_or_else(|| GlError::InvalidArgument(format!("vertex buffer '{label}' is gone")))?;
    let mut offset = 0;
    for &n in components {
        layout.declare_attribute(gpu, buffer, VertexAttribute::floats(n, stride, offset))?;
        offset += n * std::mem::size_of::<f32>() as u32;
    }
    layout.enable_all(gpu)?;
    log::debug!("{layout}");
    layout.unbind(gpu)
}

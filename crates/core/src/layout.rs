//! Vertex array objects and their attribute tables.

use crate::buffer::GpuBuffer;
use crate::error::GlError;
use crate::gpu::{AttributeDesc, BufferKind, ComponentType, GlHandle, Gpu};
use std::fmt;

/// Attribute slots a single layout may declare.
pub const MAX_VERTEX_ATTRIBUTES: u32 = 16;

/// Shape of one attribute inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub components: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub stride_bytes: u32,
    pub offset_bytes: u32,
}

impl VertexAttribute {
    /// `components` floats at `offset_bytes` inside a vertex of `stride_bytes`.
    pub fn floats(components: u32, stride_bytes: u32, offset_bytes: u32) -> Self {
        Self {
            components,
            component_type: ComponentType::Float,
            normalized: false,
            stride_bytes,
            offset_bytes,
        }
    }

    fn validate(&self) -> Result<(), GlError> {
        if !(1..=4).contains(&self.components) {
            return Err(GlError::InvalidArgument(format!(
                "attribute component count must be 1..=4, got {}",
                self.components
            )));
        }
        let end = self.offset_bytes as u64
            + self.components as u64 * self.component_type.size_bytes() as u64;
        if self.stride_bytes != 0 && end > self.stride_bytes as u64 {
            return Err(GlError::InvalidArgument(format!(
                "attribute at offset {} with {} x {:?} overruns stride {}",
                self.offset_bytes, self.components, self.component_type, self.stride_bytes
            )));
        }
        Ok(())
    }
}

/// A vertex array object recording which buffer ranges feed which
/// shader inputs.
///
/// Slots are assigned in declaration order starting at 0.
#[derive(Debug)]
pub struct VertexLayout {
    handle: Option<GlHandle>,
    attributes: Vec<AttributeDesc>,
    label: String,
}

impl VertexLayout {
    /// Allocates an empty vertex array.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::Allocation`] if the backend cannot create it.
    pub fn create(gpu: &dyn Gpu, label: &str) -> Result<Self, GlError> {
        let handle = gpu
            .create_vertex_array()
            .map_err(|e| GlError::allocation(format!("vertex layout '{label}'"), e))?;
        log::debug!("created vertex layout '{label}' {handle}");
        Ok(Self {
            handle: Some(handle),
            attributes: Vec::new(),
            label: label.to_string(),
        })
    }

    pub fn handle(&self) -> Option<GlHandle> {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Declared attributes, in slot order.
    pub fn attributes(&self) -> &[AttributeDesc] {
        &self.attributes
    }

    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] after release.
    pub fn bind(&self, gpu: &dyn Gpu) -> Result<(), GlError> {
        gpu.bind_vertex_array(Some(self.live()?));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] after release.
    pub fn unbind(&self, gpu: &dyn Gpu) -> Result<(), GlError> {
        self.live()?;
        gpu.bind_vertex_array(None);
        Ok(())
    }

    /// Declares the next attribute, sourced from `buffer`, and returns its slot.
    ///
    /// Binds this layout and `buffer` before recording the pointer, so the
    /// attribute always refers to the buffer passed in.
    ///
    /// # Errors
    ///
    /// - [`GlError::AttributeLimitExceeded`] once [`MAX_VERTEX_ATTRIBUTES`] are declared.
    /// - [`GlError::InvalidArgument`] for an index buffer, a component count
    ///   outside 1..=4, or an attribute that overruns a non-zero stride.
    /// - [`GlError::UseAfterRelease`] if the layout or buffer was released.
    pub fn declare_attribute(
        &mut self,
        gpu: &dyn Gpu,
        buffer: &GpuBuffer,
        attribute: VertexAttribute,
    ) -> Result<u32, GlError> {
        let handle = self.live()?;
        let buffer_handle = buffer.live()?;
        if buffer.kind() != BufferKind::Vertex {
            return Err(GlError::InvalidArgument(format!(
                "attributes must come from a vertex buffer, '{}' is an {} buffer",
                buffer.label(),
                buffer.kind()
            )));
        }
        let slot = self.attributes.len() as u32;
        if slot >= MAX_VERTEX_ATTRIBUTES {
            return Err(GlError::AttributeLimitExceeded {
                limit: MAX_VERTEX_ATTRIBUTES,
            });
        }
        attribute.validate()?;

        let desc = AttributeDesc {
            slot,
            components: attribute.components,
            component_type: attribute.component_type,
            normalized: attribute.normalized,
            stride_bytes: attribute.stride_bytes,
            offset_bytes: attribute.offset_bytes,
        };
        gpu.bind_vertex_array(Some(handle));
        gpu.bind_buffer(BufferKind::Vertex, Some(buffer_handle));
        gpu.vertex_attrib_pointer(&desc);
        self.attributes.push(desc);
        Ok(slot)
    }

    /// Binds the layout and enables every declared slot in order.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] after release.
    pub fn enable_all(&self, gpu: &dyn Gpu) -> Result<(), GlError> {
        self.bind(gpu)?;
        for attr in &self.attributes {
            gpu.enable_vertex_attrib_array(attr.slot);
        }
        Ok(())
    }

    /// Deletes the vertex array. Buffers it referenced are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] if already released.
    pub fn release(&mut self, gpu: &dyn Gpu) -> Result<(), GlError> {
        let handle = self.live()?;
        gpu.delete_vertex_array(handle);
        self.handle = None;
        log::debug!("released vertex layout '{}'", self.label);
        Ok(())
    }

    fn live(&self) -> Result<GlHandle, GlError> {
        self.handle
            .ok_or_else(|| GlError::use_after_release(format!("vertex layout '{}'", self.label)))
    }
}

impl fmt::Display for VertexLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "vertex layout '{}' ({} attributes)",
            self.label,
            self.attributes.len()
        )?;
        writeln!(f, "slot  size  type           norm   stride  offset")?;
        for a in &self.attributes {
            writeln!(
                f,
                "{:>4}  {:>4}  {:<13}  {:<5}  {:>6}  {:>6}",
                a.slot,
                a.components,
                format!("{:?}", a.component_type),
                a.normalized,
                a.stride_bytes,
                a.offset_bytes
            )?;
        }
        Ok(())
    }
}

impl Drop for VertexLayout {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("vertex layout '{}' {handle} dropped without release", self.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{BufferUsage, HeadlessGpu};

    fn vertex_buffer(gpu: &HeadlessGpu) -> GpuBuffer {
        GpuBuffer::create(gpu, "vbo", BufferKind::Vertex, BufferUsage::Static, &[0; 96]).unwrap()
    }

    #[test]
    fn position_normal_texcoord_enable_slots_in_order() {
        let gpu = HeadlessGpu::new();
        let mut vbo = vertex_buffer(&gpu);
        let mut layout = VertexLayout::create(&gpu, "mesh").unwrap();

        let stride = 8 * 4;
        for (expected, (size, offset)) in [(3, 0), (3, 12), (2, 24)].into_iter().enumerate() {
            let attribute = VertexAttribute::floats(size, stride, offset);
            let slot = layout.declare_attribute(&gpu, &vbo, attribute).unwrap();
            assert_eq!(slot as usize, expected);
        }
        layout.enable_all(&gpu).unwrap();

        let vao = layout.handle().unwrap();
        assert_eq!(gpu.enabled_slots(vao), vec![0, 1, 2]);
        let offsets: Vec<u32> = gpu.attributes(vao).iter().map(|a| a.offset_bytes).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        assert!(gpu.errors().is_empty(), "unexpected: {:?}", gpu.errors());

        layout.release(&gpu).unwrap();
        vbo.release(&gpu).unwrap();
    }

    #[test]
    fn seventeenth_attribute_exceeds_limit() {
        let gpu = HeadlessGpu::new();
        let mut vbo = vertex_buffer(&gpu);
        let mut layout = VertexLayout::create(&gpu, "wide").unwrap();
        for _ in 0..MAX_VERTEX_ATTRIBUTES {
            layout
                .declare_attribute(&gpu, &vbo, VertexAttribute::floats(1, 0, 0))
                .unwrap();
        }
        let err = layout
            .declare_attribute(&gpu, &vbo, VertexAttribute::floats(1, 0, 0))
            .unwrap_err();
        assert!(matches!(err, GlError::AttributeLimitExceeded { limit: 16 }));
        assert_eq!(layout.attributes().len(), 16);
        layout.release(&gpu).unwrap();
        vbo.release(&gpu).unwrap();
    }

    #[test]
    fn overrunning_stride_is_rejected() {
        let gpu = HeadlessGpu::new();
        let mut vbo = vertex_buffer(&gpu);
        let mut layout = VertexLayout::create(&gpu, "l").unwrap();
        let err = layout
            .declare_attribute(&gpu, &vbo, VertexAttribute::floats(3, 12, 4))
            .unwrap_err();
        assert!(matches!(err, GlError::InvalidArgument(_)));
        assert!(layout.attributes().is_empty());
        layout.release(&gpu).unwrap();
        vbo.release(&gpu).unwrap();
    }

    #[test]
    fn zero_or_five_components_are_rejected() {
        let gpu = HeadlessGpu::new();
        let mut vbo = vertex_buffer(&gpu);
        let mut layout = VertexLayout::create(&gpu, "l").unwrap();
        for n in [0, 5] {
            let err = layout
                .declare_attribute(&gpu, &vbo, VertexAttribute::floats(n, 0, 0))
                .unwrap_err();
            assert!(matches!(err, GlError::InvalidArgument(_)), "n = {n}");
        }
        layout.release(&gpu).unwrap();
        vbo.release(&gpu).unwrap();
    }

    #[test]
    fn index_buffer_cannot_feed_attributes() {
        let gpu = HeadlessGpu::new();
        let (kind, usage) = (BufferKind::Index, BufferUsage::Static);
        let mut ebo = GpuBuffer::create(&gpu, "ebo", kind, usage, &[0; 24]).unwrap();
        let mut layout = VertexLayout::create(&gpu, "l").unwrap();
        let err = layout
            .declare_attribute(&gpu, &ebo, VertexAttribute::floats(3, 0, 0))
            .unwrap_err();
        assert!(matches!(err, GlError::InvalidArgument(_)));
        layout.release(&gpu).unwrap();
        ebo.release(&gpu).unwrap();
    }

    #[test]
    fn released_buffer_cannot_feed_attributes() {
        let gpu = HeadlessGpu::new();
        let mut vbo = vertex_buffer(&gpu);
        vbo.release(&gpu).unwrap();
        let mut layout = VertexLayout::create(&gpu, "l").unwrap();
        let err = layout
            .declare_attribute(&gpu, &vbo, VertexAttribute::floats(3, 0, 0))
            .unwrap_err();
        assert!(matches!(err, GlError::UseAfterRelease { .. }));
        layout.release(&gpu).unwrap();
    }

    #[test]
    fn display_lists_every_attribute() {
        let gpu = HeadlessGpu::new();
        let mut vbo = vertex_buffer(&gpu);
        let mut layout = VertexLayout::create(&gpu, "quad").unwrap();
        layout.declare_attribute(&gpu, &vbo, VertexAttribute::floats(3, 32, 0)).unwrap();
        layout.declare_attribute(&gpu, &vbo, VertexAttribute::floats(2, 32, 24)).unwrap();
        let table = layout.to_string();
        assert!(table.contains("'quad' (2 attributes)"), "got:\n{table}");
        assert_eq!(table.lines().count(), 4, "got:\n{table}");
        layout.release(&gpu).unwrap();
        vbo.release(&gpu).unwrap();
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn component_type() -> impl Strategy<Value = ComponentType> {
            prop_oneof![
                Just(ComponentType::Float),
                Just(ComponentType::UnsignedByte),
                Just(ComponentType::Short),
                Just(ComponentType::Int),
            ]
        }

        proptest! {
            #[test]
            fn valid_declarations_get_sequential_slots(
                specs in prop::collection::vec(
                    (1u32..=4, component_type(), 0u32..64, 0u32..32),
                    1..16,
                ),
            ) {
                let gpu = HeadlessGpu::new();
                let mut vbo = vertex_buffer(&gpu);
                let mut layout = VertexLayout::create(&gpu, "p").unwrap();
                for (i, (components, ty, offset, padding)) in specs.iter().copied().enumerate() {
                    let stride = offset + components * ty.size_bytes() + padding;
                    let attr = VertexAttribute {
                        components,
                        component_type: ty,
                        normalized: false,
                        stride_bytes: stride,
                        offset_bytes: offset,
                    };
                    let slot = layout.declare_attribute(&gpu, &vbo, attr).unwrap();
                    prop_assert_eq!(slot, i as u32);
                }
                layout.release(&gpu).unwrap();
                vbo.release(&gpu).unwrap();
            }
        }
    }
}

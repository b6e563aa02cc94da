//! GPU-resident data buffers.
//!
//! A [`GpuBuffer`] owns exactly one vertex or index buffer object. It is
//! created with its full contents, can be re-uploaded with data of the
//! same size, and is destroyed exactly once by [`GpuBuffer::release`].

use crate::error::GlError;
use crate::gpu::{BufferKind, BufferUsage, GlHandle, Gpu};

/// A vertex or index buffer living on the GPU.
///
/// Move-only: the handle cannot be duplicated, and once released every
/// further call fails with [`GlError::UseAfterRelease`].
#[derive(Debug)]
pub struct GpuBuffer {
    handle: Option<GlHandle>,
    kind: BufferKind,
    usage: BufferUsage,
    len: usize,
    label: String,
}

impl GpuBuffer {
    /// Allocates a buffer, binds it to the target for `kind` and uploads
    /// all of `data`.
    ///
    /// Creating an index buffer while a [`VertexLayout`](crate::VertexLayout)
    /// is bound attaches it to that layout, as GL does.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::Allocation`] if the backend cannot create the object.
    pub fn create(
        gpu: &dyn Gpu,
        label: &str,
        kind: BufferKind,
        usage: BufferUsage,
        data: &[u8],
    ) -> Result<Self, GlError> {
        let handle = gpu
            .create_buffer()
            .map_err(|e| GlError::allocation(format!("{kind} buffer '{label}'"), e))?;

        gpu.bind_buffer(kind, Some(handle));
        gpu.buffer_data(kind, data, usage);
        log::debug!(
            "created {kind} buffer '{label}' {handle} ({} bytes)",
            data.len()
        );

        Ok(Self {
            handle: Some(handle),
            kind,
            usage,
            len: data.len(),
            label: label.to_string(),
        })
    }

    /// Like [`create`](Self::create), taking a slice of plain-old-data
    /// elements such as `f32`, `u32` or [`Vertex`](crate::mesh::Vertex).
    ///
    /// # Errors
    ///
    /// Returns [`GlError::Allocation`] if the backend cannot create the object.
    pub fn from_slice<T: bytemuck::Pod>(
        gpu: &dyn Gpu,
        label: &str,
        kind: BufferKind,
        usage: BufferUsage,
        data: &[T],
    ) -> Result<Self, GlError> {
        Self::create(gpu, label, kind, usage, bytemuck::cast_slice(data))
    }

    /// The GPU handle, `None` once released.
    pub fn handle(&self) -> Option<GlHandle> {
        self.handle
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Size of the uploaded contents in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Binds the buffer to its target.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] after [`release`](Self::release).
    pub fn bind(&self, gpu: &dyn Gpu) -> Result<(), GlError> {
        let handle = self.live()?;
        gpu.bind_buffer(self.kind, Some(handle));
        Ok(())
    }

    /// Clears the binding of this buffer's target.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] after [`release`](Self::release).
    pub fn unbind(&self, gpu: &dyn Gpu) -> Result<(), GlError> {
        self.live()?;
        gpu.bind_buffer(self.kind, None);
        Ok(())
    }

    /// Replaces the contents. The byte length is fixed at creation.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] on a length mismatch (nothing is
    /// uploaded) and [`GlError::UseAfterRelease`] after release.
    pub fn update(&mut self, gpu: &dyn Gpu, data: &[u8]) -> Result<(), GlError> {
        let handle = self.live()?;
        if data.len() != self.len {
            return Err(GlError::InvalidArgument(format!(
                "{} is {} bytes, update has {}",
                self.describe(),
                self.len,
                data.len()
            )));
        }
        gpu.bind_buffer(self.kind, Some(handle));
        gpu.buffer_data(self.kind, data, self.usage);
        Ok(())
    }

    /// Deletes the GPU object. The handle is invalid afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] if already released.
    pub fn release(&mut self, gpu: &dyn Gpu) -> Result<(), GlError> {
        let handle = self.live()?;
        gpu.delete_buffer(handle);
        self.handle = None;
        log::debug!("released {}", self.describe());
        Ok(())
    }

    pub(crate) fn live(&self) -> Result<GlHandle, GlError> {
        self.handle
            .ok_or_else(|| GlError::use_after_release(self.describe()))
    }

    fn describe(&self) -> String {
        format!("{} buffer '{}'", self.kind, self.label)
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!("{} {handle} dropped without release", self.describe());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessGpu;

    const QUAD: [f32; 12] = [
        0.5, 0.5, 0.0, 0.5, -0.5, 0.0, -0.5, -0.5, 0.0, -0.5, 0.5, 0.0,
    ];

    #[test]
    fn create_uploads_all_bytes() {
        let gpu = HeadlessGpu::new();
        let mut buf =
            GpuBuffer::from_slice(&gpu, "quad", BufferKind::Vertex, BufferUsage::Static, &QUAD)
                .unwrap();
        let handle = buf.handle().unwrap();
        assert_eq!(buf.len(), 48);
        assert_eq!(gpu.buffer_len(handle), Some(48));
        assert_eq!(gpu.buffer_usage(handle), Some(BufferUsage::Static));
        buf.release(&gpu).unwrap();
    }

    #[test]
    fn failed_allocation_names_the_buffer() {
        let gpu = HeadlessGpu::new();
        gpu.set_fail_allocations(true);
        let err = GpuBuffer::create(&gpu, "quad", BufferKind::Index, BufferUsage::Static, &[])
            .unwrap_err();
        assert!(matches!(err, GlError::Allocation { .. }));
        let msg = format!("{err}");
        assert!(msg.contains("index buffer 'quad'"), "got: {msg}");
    }

    #[test]
    fn bind_after_release_fails() {
        let gpu = HeadlessGpu::new();
        let mut buf =
            GpuBuffer::create(&gpu, "b", BufferKind::Vertex, BufferUsage::Static, &[1, 2, 3, 4])
                .unwrap();
        buf.release(&gpu).unwrap();
        assert!(!buf.is_live());
        assert_eq!(gpu.live_buffers(), 0);
        assert!(matches!(
            buf.bind(&gpu),
            Err(GlError::UseAfterRelease { .. })
        ));
    }

    #[test]
    fn second_release_fails_and_deletes_nothing() {
        let gpu = HeadlessGpu::new();
        let mut buf =
            GpuBuffer::create(&gpu, "b", BufferKind::Vertex, BufferUsage::Static, &[0; 8]).unwrap();
        buf.release(&gpu).unwrap();
        assert!(matches!(
            buf.release(&gpu),
            Err(GlError::UseAfterRelease { .. })
        ));
        assert!(gpu.errors().is_empty(), "unexpected: {:?}", gpu.errors());
    }

    #[test]
    fn update_rejects_size_change() {
        let gpu = HeadlessGpu::new();
        let mut buf =
            GpuBuffer::create(&gpu, "b", BufferKind::Vertex, BufferUsage::Dynamic, &[0; 8])
                .unwrap();
        let err = buf.update(&gpu, &[0; 4]).unwrap_err();
        assert!(matches!(err, GlError::InvalidArgument(_)));
        assert!(buf.update(&gpu, &[1; 8]).is_ok());
        buf.release(&gpu).unwrap();
    }

    #[test]
    fn unbind_clears_target() {
        let gpu = HeadlessGpu::new();
        let mut buf =
            GpuBuffer::create(&gpu, "b", BufferKind::Vertex, BufferUsage::Static, &[0; 4]).unwrap();
        buf.bind(&gpu).unwrap();
        assert_eq!(gpu.bound_buffer(BufferKind::Vertex), buf.handle());
        buf.unbind(&gpu).unwrap();
        assert_eq!(gpu.bound_buffer(BufferKind::Vertex), None);
        buf.release(&gpu).unwrap();
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_call_after_release_is_rejected(len in 0usize..256, which in 0u8..3) {
                let gpu = HeadlessGpu::new();
                let data = vec![0u8; len];
                let mut buf = GpuBuffer::create(
                    &gpu, "p", BufferKind::Vertex, BufferUsage::Static, &data,
                ).unwrap();
                buf.release(&gpu).unwrap();
                let result = match which {
                    0 => buf.bind(&gpu),
                    1 => buf.unbind(&gpu),
                    _ => buf.update(&gpu, &data),
                };
                let is_use_after_release = matches!(result, Err(GlError::UseAfterRelease { .. }));
                prop_assert!(is_use_after_release);
            }
        }
    }
}

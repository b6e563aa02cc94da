//! Ordered registry of GPU resources owned by a frame loop.
//!
//! Scenes register what they create during setup; the loop releases it all
//! at shutdown in reverse registration order, so objects that were built
//! from others go first.

use crate::buffer::GpuBuffer;
use crate::error::GlError;
use crate::gpu::Gpu;
use crate::layout::VertexLayout;
use crate::mesh::Mesh;
use crate::model::Model;
use crate::shader::ShaderProgram;
use crate::texture::Texture2D;
use std::fmt;
use std::marker::PhantomData;

/// Anything the registry can hold.
#[derive(Debug)]
pub enum Resource {
    Buffer(GpuBuffer),
    Layout(VertexLayout),
    Texture(Texture2D),
    Program(ShaderProgram),
    Mesh(Mesh),
    Model(Model),
}

impl Resource {
    fn release(&mut self, gpu: &dyn Gpu) -> Result<(), GlError> {
        match self {
            Resource::Buffer(r) => r.release(gpu),
            Resource::Layout(r) => r.release(gpu),
            Resource::Texture(r) => r.release(gpu),
            Resource::Program(r) => r.release(gpu),
            Resource::Mesh(r) => r.release(gpu),
            Resource::Model(r) => r.release(gpu),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Resource::Buffer(_) => "buffer",
            Resource::Layout(_) => "vertex layout",
            Resource::Texture(_) => "texture",
            Resource::Program(_) => "shader program",
            Resource::Mesh(_) => "mesh",
            Resource::Model(_) => "model",
        }
    }
}

/// Types that can be stored in [`Resources`].
pub trait Managed: Sized {
    fn into_resource(self) -> Resource;
    fn from_resource(resource: &Resource) -> Option<&Self>;
    fn from_resource_mut(resource: &mut Resource) -> Option<&mut Self>;
}

macro_rules! managed {
    ($ty:ty, $variant:ident) => {
        impl Managed for $ty {
            fn into_resource(self) -> Resource {
                Resource::$variant(self)
            }

            fn from_resource(resource: &Resource) -> Option<&Self> {
                match resource {
                    Resource::$variant(r) => Some(r),
                    _ => None,
                }
            }

            fn from_resource_mut(resource: &mut Resource) -> Option<&mut Self> {
                match resource {
                    Resource::$variant(r) => Some(r),
                    _ => None,
                }
            }
        }
    };
}

managed!(GpuBuffer, Buffer);
managed!(VertexLayout, Layout);
managed!(Texture2D, Texture);
managed!(ShaderProgram, Program);
managed!(Mesh, Mesh);
managed!(Model, Model);

/// Typed index into a [`Resources`] registry.
pub struct ResourceKey<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ResourceKey<T> {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for ResourceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ResourceKey<T> {}

impl<T> PartialEq for ResourceKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for ResourceKey<T> {}

impl<T> fmt::Debug for ResourceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey({})", self.index)
    }
}

/// Owns resources in registration order.
#[derive(Debug, Default)]
pub struct Resources {
    entries: Vec<Option<Resource>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Managed>(&mut self, value: T) -> ResourceKey<T> {
        self.entries.push(Some(value.into_resource()));
        ResourceKey {
            index: self.entries.len() - 1,
            _marker: PhantomData,
        }
    }

    /// `None` once the registry has been released.
    pub fn get<T: Managed>(&self, key: ResourceKey<T>) -> Option<&T> {
        self.entries
            .get(key.index)
            .and_then(Option::as_ref)
            .and_then(T::from_resource)
    }

    pub fn get_mut<T: Managed>(&mut self, key: ResourceKey<T>) -> Option<&mut T> {
        self.entries
            .get_mut(key.index)
            .and_then(Option::as_mut)
            .and_then(T::from_resource_mut)
    }

    /// Entries not yet released.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases every entry, newest first, and returns the failures.
    ///
    /// Each entry is taken out of the registry before it is released, so a
    /// second call finds nothing to do.
    pub fn release_all(&mut self, gpu: &dyn Gpu) -> Vec<GlError> {
        let mut failures = Vec::new();
        let mut released = 0usize;
        for slot in self.entries.iter_mut().rev() {
            let Some(mut resource) = slot.take() else {
                continue;
            };
            match resource.release(gpu) {
                Ok(()) => released += 1,
                Err(e) => {
                    log::error!("failed to release {}: {e}", resource.kind());
                    failures.push(e);
                }
            }
        }
        log::debug!(
            "released {released} resources ({} failures)",
            failures.len()
        );
        failures
    }
}

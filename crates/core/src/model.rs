//! glTF 2.0 model loading.
//!
//! Every triangle primitive in the default scene becomes one [`Mesh`] with
//! its node's world transform baked into the vertices. Material textures map
//! onto [`TextureKind`]s: base colour to diffuse, `KHR_materials_specular`
//! to specular, normal to normal and occlusion to height. An image used by
//! several primitives with the same kind is uploaded once.

use crate::error::GlError;
use crate::gpu::{Gpu, PixelFormat};
use crate::mesh::{Mesh, Vertex};
use crate::shader::ShaderProgram;
use crate::texture::{Texture2D, TextureKind};
use glam::{Mat3, Mat4, Vec2, Vec3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Meshes plus the textures they share.
#[derive(Debug)]
pub struct Model {
    path: PathBuf,
    meshes: Vec<Mesh>,
    textures: Vec<Texture2D>,
    bounds: (Vec3, Vec3),
}

impl Model {
    /// Loads a `.gltf` or `.glb` file. External buffers and images resolve
    /// relative to the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::ModelLoad`] if the file cannot be parsed, its
    /// buffers cannot be read, or it holds no triangle geometry. GPU errors
    /// while building meshes propagate after everything built so far has
    /// been released. Textures that fail to load are replaced by
    /// [`Texture2D::placeholder`] instead of failing the model.
    pub fn load(gpu: &dyn Gpu, path: impl AsRef<Path>) -> Result<Self, GlError> {
        let path = path.as_ref();
        let model_err = |reason: String| GlError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };

        let gltf::Gltf { document, blob } =
            gltf::Gltf::open(path).map_err(|e| model_err(e.to_string()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let buffers = gltf::import_buffers(&document, Some(base), blob)
            .map_err(|e| model_err(format!("buffers: {e}")))?;

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| model_err("file has no scenes".to_string()))?;

        let mut builder = Builder {
            gpu,
            path,
            base,
            buffers: &buffers,
            meshes: Vec::new(),
            textures: Vec::new(),
            loaded: HashMap::new(),
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        };
        for node in scene.nodes() {
            if let Err(e) = builder.visit(node, Mat4::IDENTITY) {
                builder.discard();
                return Err(e);
            }
        }
        if builder.meshes.is_empty() {
            builder.discard();
            return Err(model_err("no triangle primitives in default scene".to_string()));
        }

        log::info!(
            "loaded model '{}': {} meshes, {} textures",
            path.display(),
            builder.meshes.len(),
            builder.textures.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            meshes: builder.meshes,
            textures: builder.textures,
            bounds: (builder.min, builder.max),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn textures(&self) -> &[Texture2D] {
        &self.textures
    }

    /// World-space `(min, max)` corners of all vertices.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.bounds
    }

    /// Draws every mesh with `program`.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first mesh error.
    pub fn draw(&self, gpu: &dyn Gpu, program: &ShaderProgram) -> Result<(), GlError> {
        for mesh in &self.meshes {
            mesh.draw(gpu, program, &self.textures)?;
        }
        Ok(())
    }

    /// Releases all meshes, then all textures.
    ///
    /// # Errors
    ///
    /// Returns the first failure; every object is still attempted.
    pub fn release(&mut self, gpu: &dyn Gpu) -> Result<(), GlError> {
        let mut first = None;
        let results = self
            .meshes
            .iter_mut()
            .map(|m| m.release(gpu))
            .chain(self.textures.iter_mut().map(|t| t.release(gpu)))
            .collect::<Vec<_>>();
        for result in results {
            if let Err(e) = result {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

struct Builder<'a> {
    gpu: &'a dyn Gpu,
    path: &'a Path,
    base: &'a Path,
    buffers: &'a [gltf::buffer::Data],
    meshes: Vec<Mesh>,
    textures: Vec<Texture2D>,
    /// (image index, kind) -> position in `textures`
    loaded: HashMap<(usize, TextureKind), usize>,
    min: Vec3,
    max: Vec3,
}

impl Builder<'_> {
    fn visit(&mut self, node: gltf::Node<'_>, parent: Mat4) -> Result<(), GlError> {
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::debug!(
                        "skipping {:?} primitive {} of mesh {}",
                        primitive.mode(),
                        primitive.index(),
                        mesh.index()
                    );
                    continue;
                }
                let label = format!(
                    "{}#{}",
                    mesh.name().unwrap_or("mesh"),
                    primitive.index()
                );
                self.primitive(&label, &primitive, world)?;
            }
        }
        for child in node.children() {
            self.visit(child, world)?;
        }
        Ok(())
    }

    fn primitive(
        &mut self,
        label: &str,
        primitive: &gltf::Primitive<'_>,
        world: Mat4,
    ) -> Result<(), GlError> {
        let buffers = self.buffers;
        let reader =
            primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            log::warn!("primitive '{label}' has no positions, skipped");
            return Ok(());
        };
        let positions: Vec<Vec3> = positions
            .map(|p| world.transform_point3(Vec3::from(p)))
            .collect();
        let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
        let normals: Vec<Vec3> = reader
            .read_normals()
            .map(|n| n.map(|n| (normal_matrix * Vec3::from(n)).normalize_or_zero()).collect())
            .unwrap_or_default();
        // Texture rows are uploaded bottom-up, glTF addresses them top-down.
        let uvs: Vec<Vec2> = reader
            .read_tex_coords(0)
            .map(|t| t.into_f32().map(|[u, v]| Vec2::new(u, 1.0 - v)).collect())
            .unwrap_or_default();
        let indices: Vec<u32> = match reader.read_indices() {
            Some(i) => i.into_u32().collect(),
            None => sequential_indices(positions.len()).ok_or_else(|| GlError::ModelLoad {
                path: self.path.to_path_buf(),
                reason: format!(
                    "primitive '{label}' has {} vertices, more than 32-bit indices address",
                    positions.len()
                ),
            })?,
        };

        let vertices: Vec<Vertex> = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                self.min = self.min.min(p);
                self.max = self.max.max(p);
                Vertex::new(
                    p,
                    normals.get(i).copied().unwrap_or(Vec3::ZERO),
                    uvs.get(i).copied().unwrap_or(Vec2::ZERO),
                )
            })
            .collect();

        let material = primitive.material();
        let mut textures = Vec::new();
        if let Some(info) = material.pbr_metallic_roughness().base_color_texture() {
            textures.push(self.texture(info.texture().source(), TextureKind::Diffuse)?);
        }
        if let Some(info) = material.specular().and_then(|s| s.specular_texture()) {
            textures.push(self.texture(info.texture().source(), TextureKind::Specular)?);
        }
        if let Some(normal) = material.normal_texture() {
            textures.push(self.texture(normal.texture().source(), TextureKind::Normal)?);
        }
        if let Some(occlusion) = material.occlusion_texture() {
            textures.push(self.texture(occlusion.texture().source(), TextureKind::Height)?);
        }

        let mesh = Mesh::create(self.gpu, label, &vertices, &indices, textures)?;
        self.meshes.push(mesh);
        Ok(())
    }

    /// Index of the texture for `image`, loading it on first use.
    fn texture(&mut self, image: gltf::Image<'_>, kind: TextureKind) -> Result<usize, GlError> {
        let key = (image.index(), kind);
        if let Some(&index) = self.loaded.get(&key) {
            return Ok(index);
        }
        let format = match kind {
            TextureKind::Normal => PixelFormat::Rgb,
            _ => PixelFormat::Rgba,
        };
        let loaded = match image.source() {
            gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                Err(GlError::TextureLoad {
                    path: PathBuf::from(format!("image #{}", image.index())),
                    reason: "data URIs are not supported".to_string(),
                })
            }
            gltf::image::Source::Uri { uri, .. } => {
                Texture2D::load(self.gpu, self.base.join(uri), format, kind)
            }
            gltf::image::Source::View { view, .. } => {
                let start = view.offset();
                let end = start + view.length();
                let label = format!("embedded image #{}", image.index());
                match self
                    .buffers
                    .get(view.buffer().index())
                    .and_then(|d| d.0.get(start..end))
                {
                    Some(bytes) => Texture2D::from_encoded(self.gpu, &label, bytes, format, kind),
                    None => Err(GlError::TextureLoad {
                        path: PathBuf::from(label),
                        reason: format!("buffer view {start}..{end} out of range"),
                    }),
                }
            }
        };
        let texture = match loaded {
            Ok(t) => t,
            Err(e) => {
                log::warn!("{e}; using placeholder");
                Texture2D::placeholder(self.gpu, kind)?
            }
        };
        self.textures.push(texture);
        let index = self.textures.len() - 1;
        self.loaded.insert(key, index);
        Ok(index)
    }

    fn discard(&mut self) {
        for mesh in &mut self.meshes {
            if let Err(e) = mesh.release(self.gpu) {
                log::warn!("cleanup after failed model load: {e}");
            }
        }
        for texture in &mut self.textures {
            if let Err(e) = texture.release(self.gpu) {
                log::warn!("cleanup after failed model load: {e}");
            }
        }
    }
}

/// `0..count` as indices for non-indexed geometry, or `None` if `count`
/// does not fit in `u32`.
fn sequential_indices(count: usize) -> Option<Vec<u32>> {
    u32::try_from(count).ok().map(|n| (0..n).collect())
}

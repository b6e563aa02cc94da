//! 2D textures decoded from image files or built from raw pixels.
//!
//! Decoded pixel data is owned only for the duration of the upload: it is
//! dropped before [`Texture2D::load`] returns. The GPU object is deleted
//! exactly once by [`Texture2D::release`].

use crate::error::GlError;
use crate::gpu::{GlHandle, Gpu, PixelFormat, Sampler};
use std::fmt;
use std::path::{Path, PathBuf};

/// Highest texture unit [`Texture2D::bind`] accepts.
pub const MAX_TEXTURE_UNIT: u32 = 31;

/// What a texture is used for in a material. Shaders name their samplers
/// after it (`texture_diffuse1`, `texture_specular1`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureKind {
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureKind {
    /// Sampler uniform prefix; the shader appends a 1-based index.
    pub fn uniform_prefix(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Specular => "texture_specular",
            TextureKind::Normal => "texture_normal",
            TextureKind::Height => "texture_height",
        }
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uniform_prefix().trim_start_matches("texture_"))
    }
}

/// A mipmapped 2D texture with repeat wrapping and trilinear filtering.
#[derive(Debug)]
pub struct Texture2D {
    handle: Option<GlHandle>,
    path: PathBuf,
    format: PixelFormat,
    kind: TextureKind,
    width: u32,
    height: u32,
}

impl Texture2D {
    /// Decodes the image at `path`, converts it to `format` and uploads it.
    ///
    /// The file is decoded before any GPU object exists, so a failure leaves
    /// nothing allocated. Rows are flipped so that texture coordinate
    /// `(0, 0)` addresses the bottom-left pixel.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::TextureLoad`] if the file cannot be read or
    /// decoded, or if the backend refuses to create the texture.
    pub fn load(
        gpu: &dyn Gpu,
        path: impl AsRef<Path>,
        format: PixelFormat,
        kind: TextureKind,
    ) -> Result<Self, GlError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| GlError::TextureLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let (width, height, pixels) = flatten(image, format);

        let texture = Self::upload(gpu, path, width, height, format, kind, &pixels)?;
        log::debug!(
            "loaded {kind} texture '{}' {width}x{height} {format:?}",
            path.display()
        );
        Ok(texture)
    }

    /// Decodes an in-memory PNG or JPEG (for example an image embedded in
    /// a binary glTF) and uploads it like [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// Returns [`GlError::TextureLoad`] labelled with `label` if decoding or
    /// allocation fails.
    pub fn from_encoded(
        gpu: &dyn Gpu,
        label: &str,
        bytes: &[u8],
        format: PixelFormat,
        kind: TextureKind,
    ) -> Result<Self, GlError> {
        let image = image::load_from_memory(bytes).map_err(|e| GlError::TextureLoad {
            path: PathBuf::from(label),
            reason: e.to_string(),
        })?;
        let (width, height, pixels) = flatten(image, format);
        Self::upload(gpu, Path::new(label), width, height, format, kind, &pixels)
    }

    /// Uploads tightly packed 8-bit `pixels`, bottom row first.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] for zero dimensions or a pixel
    /// count that does not match, and [`GlError::TextureLoad`] if the
    /// backend refuses the allocation.
    pub fn from_pixels(
        gpu: &dyn Gpu,
        label: &str,
        kind: TextureKind,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<Self, GlError> {
        if width == 0 || height == 0 {
            return Err(GlError::InvalidArgument(format!(
                "texture '{label}' must have non-zero size, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * format.channels() as usize;
        if pixels.len() != expected {
            return Err(GlError::InvalidArgument(format!(
                "texture '{label}' needs {expected} bytes for {width}x{height} {format:?}, got {}",
                pixels.len()
            )));
        }
        Self::upload(gpu, Path::new(label), width, height, format, kind, pixels)
    }

    /// A 2x2 magenta/black checker that stands in for a texture that
    /// failed to load.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::TextureLoad`] if the backend refuses the allocation.
    pub fn placeholder(gpu: &dyn Gpu, kind: TextureKind) -> Result<Self, GlError> {
        const MAGENTA: [u8; 4] = [255, 0, 255, 255];
        const BLACK: [u8; 4] = [0, 0, 0, 255];
        let pixels: Vec<u8> = [MAGENTA, BLACK, BLACK, MAGENTA].concat();
        Self::from_pixels(gpu, "<placeholder>", kind, 2, 2, PixelFormat::Rgba, &pixels)
    }

    fn upload(
        gpu: &dyn Gpu,
        path: &Path,
        width: u32,
        height: u32,
        format: PixelFormat,
        kind: TextureKind,
        pixels: &[u8],
    ) -> Result<Self, GlError> {
        let handle = gpu.create_texture().map_err(|e| GlError::TextureLoad {
            path: path.to_path_buf(),
            reason: e,
        })?;
        gpu.active_texture(0);
        gpu.bind_texture(Some(handle));
        gpu.set_sampler(&Sampler::MIPMAPPED_REPEAT);
        if let Err(reason) = gpu.tex_image_2d(width, height, format, pixels) {
            gpu.bind_texture(None);
            gpu.delete_texture(handle);
            return Err(GlError::TextureLoad {
                path: path.to_path_buf(),
                reason,
            });
        }
        gpu.generate_mipmap();
        gpu.bind_texture(None);

        Ok(Self {
            handle: Some(handle),
            path: path.to_path_buf(),
            format,
            kind,
            width,
            height,
        })
    }

    pub fn handle(&self) -> Option<GlHandle> {
        self.handle
    }

    /// File the texture was decoded from, or the label it was built with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Binds the texture to texture unit `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`GlError::InvalidArgument`] for a unit above
    /// [`MAX_TEXTURE_UNIT`] and [`GlError::UseAfterRelease`] after release.
    pub fn bind(&self, gpu: &dyn Gpu, unit: u32) -> Result<(), GlError> {
        let handle = self.live()?;
        if unit > MAX_TEXTURE_UNIT {
            return Err(GlError::InvalidArgument(format!(
                "texture unit {unit} out of range 0..={MAX_TEXTURE_UNIT}"
            )));
        }
        gpu.active_texture(unit);
        gpu.bind_texture(Some(handle));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`GlError::UseAfterRelease`] if already released.
    pub fn release(&mut self, gpu: &dyn Gpu) -> Result<(), GlError> {
        let handle = self.live()?;
        gpu.delete_texture(handle);
        self.handle = None;
        log::debug!("released texture '{}'", self.path.display());
        Ok(())
    }

    fn live(&self) -> Result<GlHandle, GlError> {
        self.handle.ok_or_else(|| {
            GlError::use_after_release(format!("texture '{}'", self.path.display()))
        })
    }
}

/// Flips rows to bottom-first and converts to `format`'s channel layout.
fn flatten(image: image::DynamicImage, format: PixelFormat) -> (u32, u32, Vec<u8>) {
    let image = image.flipv();
    let (width, height) = (image.width(), image.height());
    let pixels = match format {
        PixelFormat::Red => image.into_luma8().into_raw(),
        PixelFormat::Rgb => image.into_rgb8().into_raw(),
        PixelFormat::Rgba => image.into_rgba8().into_raw(),
    };
    (width, height, pixels)
}

impl Drop for Texture2D {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            log::warn!(
                "texture '{}' {handle} dropped without release",
                self.path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessGpu;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        let img = image::RgbaImage::from_fn(w, h, |x, y| image::Rgba([x as u8, y as u8, 0, 255]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn load_missing_file_allocates_nothing() {
        let gpu = HeadlessGpu::new();
        let missing = "does/not/exist.png";
        let err =
            Texture2D::load(&gpu, missing, PixelFormat::Rgb, TextureKind::Diffuse).unwrap_err();
        match err {
            GlError::TextureLoad { path, .. } => assert_eq!(path, PathBuf::from(missing)),
            other => panic!("expected TextureLoad, got {other:?}"),
        }
        assert_eq!(gpu.live_textures(), 0);
    }

    #[test]
    fn load_uploads_mipmapped_texture_with_fixed_sampler() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "checker.png", 4, 2);
        let gpu = HeadlessGpu::new();
        let mut tex = Texture2D::load(&gpu, &path, PixelFormat::Rgb, TextureKind::Diffuse).unwrap();

        let handle = tex.handle().unwrap();
        assert_eq!((tex.width(), tex.height()), (4, 2));
        assert_eq!(gpu.texture_size(handle), Some((4, 2)));
        assert_eq!(gpu.texture_format(handle), Some(PixelFormat::Rgb));
        assert_eq!(gpu.texture_sampler(handle), Some(Sampler::MIPMAPPED_REPEAT));
        assert!(gpu.texture_mipmapped(handle));
        assert!(gpu.errors().is_empty(), "unexpected: {:?}", gpu.errors());
        tex.release(&gpu).unwrap();
        assert_eq!(gpu.live_textures(), 0);
    }

    #[test]
    fn corrupt_file_is_texture_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        let gpu = HeadlessGpu::new();
        let err =
            Texture2D::load(&gpu, &path, PixelFormat::Rgba, TextureKind::Diffuse).unwrap_err();
        assert!(matches!(err, GlError::TextureLoad { .. }));
        assert_eq!(gpu.live_textures(), 0);
    }

    #[test]
    fn refused_allocation_is_texture_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "ok.png", 1, 1);
        let gpu = HeadlessGpu::new();
        gpu.set_fail_allocations(true);
        let err =
            Texture2D::load(&gpu, &path, PixelFormat::Rgba, TextureKind::Specular).unwrap_err();
        assert!(matches!(err, GlError::TextureLoad { .. }));
    }

    #[test]
    fn failed_upload_deletes_the_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "big.png", 2, 2);
        let gpu = HeadlessGpu::new();
        gpu.set_fail_uploads(true);
        let err =
            Texture2D::load(&gpu, &path, PixelFormat::Rgba, TextureKind::Diffuse).unwrap_err();
        match err {
            GlError::TextureLoad { path: p, reason } => {
                assert_eq!(p, path);
                assert!(reason.contains("out of memory"), "{reason}");
            }
            other => panic!("expected TextureLoad, got {other:?}"),
        }
        assert_eq!(gpu.live_textures(), 0);
        assert_eq!(gpu.bound_texture(0), None);
    }

    #[test]
    fn bind_rejects_unit_32() {
        let gpu = HeadlessGpu::new();
        let mut tex = Texture2D::placeholder(&gpu, TextureKind::Diffuse).unwrap();
        assert!(tex.bind(&gpu, 31).is_ok());
        assert_eq!(gpu.bound_texture(31), tex.handle());
        assert!(matches!(tex.bind(&gpu, 32), Err(GlError::InvalidArgument(_))));
        tex.release(&gpu).unwrap();
    }

    #[test]
    fn bind_after_release_fails() {
        let gpu = HeadlessGpu::new();
        let mut tex = Texture2D::placeholder(&gpu, TextureKind::Normal).unwrap();
        tex.release(&gpu).unwrap();
        assert!(matches!(tex.bind(&gpu, 0), Err(GlError::UseAfterRelease { .. })));
    }

    #[test]
    fn from_pixels_checks_length() {
        let gpu = HeadlessGpu::new();
        let err =
            Texture2D::from_pixels(&gpu, "g", TextureKind::Height, 2, 2, PixelFormat::Red, &[0; 3])
                .unwrap_err();
        assert!(matches!(err, GlError::InvalidArgument(_)));
        assert_eq!(gpu.live_textures(), 0);
    }

    #[test]
    fn from_encoded_decodes_png_bytes() {
        let mut bytes = Vec::new();
        image::RgbaImage::from_pixel(3, 1, image::Rgba([9, 9, 9, 255]))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let gpu = HeadlessGpu::new();
        let (format, kind) = (PixelFormat::Rgba, TextureKind::Diffuse);
        let mut tex = Texture2D::from_encoded(&gpu, "embedded#0", &bytes, format, kind).unwrap();
        assert_eq!((tex.width(), tex.height()), (3, 1));
        tex.release(&gpu).unwrap();

        let err = Texture2D::from_encoded(&gpu, "junk", b"xx", format, kind).unwrap_err();
        assert!(matches!(err, GlError::TextureLoad { .. }));
    }

    #[test]
    fn uniform_prefixes_follow_kind() {
        assert_eq!(TextureKind::Diffuse.uniform_prefix(), "texture_diffuse");
        assert_eq!(TextureKind::Height.uniform_prefix(), "texture_height");
        assert_eq!(TextureKind::Specular.to_string(), "specular");
    }
}

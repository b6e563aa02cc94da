//! PNG output of a captured frame.
//!
//! Feature-gated behind `png` (default on) so the scenes can be built
//! without the `image` crate. Row flipping lives in [`crate::pixel`].

use crate::pixel::capture_to_rgba;
use learngl_core::frame_loop::Capture;
use learngl_core::GlError;
use std::path::Path;

/// Writes `capture` as an RGBA PNG, top row first.
///
/// Returns `GlError::InvalidArgument` if the pixel buffer does not match
/// the capture size, or `GlError::Io` on encode or write failure.
pub fn write_png(capture: &Capture, path: &Path) -> Result<(), GlError> {
    let rgba = capture_to_rgba(capture);
    let img = image::RgbaImage::from_raw(capture.width, capture.height, rgba).ok_or_else(|| {
        GlError::InvalidArgument(format!(
            "capture is {}x{} but holds {} bytes",
            capture.width,
            capture.height,
            capture.pixels.len()
        ))
    })?;
    img.save(path).map_err(|e| GlError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    log::info!(
        "wrote {}x{} snapshot to '{}'",
        capture.width,
        capture.height,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_png_puts_bottom_row_last() {
        // Bottom row red, top row blue.
        let capture = Capture {
            width: 1,
            height: 2,
            pixels: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");

        write_png(&capture, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!((img.width(), img.height()), (1, 2));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(0, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let capture = Capture {
            width: 4,
            height: 4,
            pixels: vec![0; 10],
        };
        let dir = tempfile::tempdir().unwrap();
        let err = write_png(&capture, &dir.path().join("x.png")).unwrap_err();
        assert!(matches!(err, GlError::InvalidArgument(_)));
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let capture = Capture {
            width: 1,
            height: 1,
            pixels: vec![0; 4],
        };
        let err = write_png(&capture, Path::new("/nonexistent/dir/frame.png")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("frame.png"), "should name the path: {msg}");
    }
}

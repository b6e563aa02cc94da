//! Row-order conversion for frames read back from the GPU.
//!
//! Always available so that callers without the `png` feature can still
//! turn a [`Capture`] into top-down RGBA rows.

use learngl_core::frame_loop::Capture;

/// Reverses the row order of a tightly packed RGBA8 image.
///
/// GL reads pixels bottom row first; image files expect the top row first.
/// A buffer whose length does not match `width * height * 4` is returned
/// unchanged.
pub fn flip_rows(pixels: &[u8], width: u32, height: u32) -> Vec<u8> {
    let row = width as usize * 4;
    if row == 0 || pixels.len() != row * height as usize {
        return pixels.to_vec();
    }
    pixels.chunks_exact(row).rev().flatten().copied().collect()
}

/// The capture's pixels, top row first.
pub fn capture_to_rgba(capture: &Capture) -> Vec<u8> {
    flip_rows(&capture.pixels, capture.width, capture.height)
}

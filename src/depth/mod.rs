//! Depth storage.
//!
//! Depth values are NDC `z` in `[0, 1]`, smaller is nearer. Buffers are
//! cleared to [`FAR_DEPTH`].
//!
//! - [`ZBuffer`]: one value per pixel.
//! - [`DepthPyramid`]: a hierarchical Z-buffer whose coarse levels hold a
//!   conservative (farthest) bound over their footprint.

mod pyramid;
mod zbuffer;

pub use pyramid::{DepthPyramid, PixelRect};
pub use zbuffer::ZBuffer;

/// Value depth buffers are cleared to.
pub const FAR_DEPTH: f32 = 1.0;

/// Per-pixel depth access used by the rasterizer.
///
/// Coordinates are pixel space and must be inside the buffer; the rasterizer
/// clamps before every access.
pub trait DepthStore {
    fn depth(&self, x: usize, y: usize) -> f32;

    /// Overwrite the depth at `(x, y)`. The caller has already decided that
    /// `z` is nearer than the stored value.
    fn store(&mut self, x: usize, y: usize, z: f32);
}

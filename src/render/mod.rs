//! Depth-resolving mesh renderers.
//!
//! Every strategy draws flat-colored triangles into a [`PixelTarget`] and
//! resolves visibility with nearer-wins depth testing. They differ only in how
//! much work they avoid:
//!
//! - [`SimpleRenderer`]: one depth value per pixel, every triangle rasterized
//! - [`ScanlineRenderer`]: edge table and active edge list, depth stepped
//!   along each span
//! - [`HierarchicalRenderer`]: a depth pyramid rejects triangles before
//!   rasterization
//! - [`OcclusionRenderer`]: the pyramid plus an NDC octree, so hidden regions
//!   of the mesh are skipped a node at a time
//!
//! Renderers are selected at runtime through [`DepthAlgorithm`] and
//! [`create_renderer`].

mod hierarchical;
mod occlusion;
mod project;
pub(crate) mod raster;
mod scanline;
mod simple;
mod stats;

pub use hierarchical::HierarchicalRenderer;
pub use occlusion::OcclusionRenderer;
pub use project::{outside_view_volume, ProjectedMesh};
pub use raster::{edge_function, rasterize, setup_triangle, Plane, ScreenTriangle, Setup};
pub use scanline::ScanlineRenderer;
pub use simple::SimpleRenderer;
pub use stats::FrameStats;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::color::Color;
use crate::math::Mat4;
use crate::mesh::Mesh;
use crate::target::PixelTarget;

/// Available depth strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthAlgorithm {
    /// Flat per-pixel Z-buffer.
    Simple,
    /// Scanline Z-buffer with an active edge list.
    Scanline,
    /// Per-triangle rejection against a depth pyramid.
    Hierarchical,
    /// Pyramid plus an octree rebuilt on every draw.
    #[default]
    Octree,
    /// Pyramid plus an octree cached per transform slot.
    OctreeFixed,
}

impl DepthAlgorithm {
    pub const ALL: [DepthAlgorithm; 5] = [
        DepthAlgorithm::Simple,
        DepthAlgorithm::Scanline,
        DepthAlgorithm::Hierarchical,
        DepthAlgorithm::Octree,
        DepthAlgorithm::OctreeFixed,
    ];

    /// Short name accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            DepthAlgorithm::Simple => "simple",
            DepthAlgorithm::Scanline => "scanline",
            DepthAlgorithm::Hierarchical => "hiez",
            DepthAlgorithm::Octree => "octz",
            DepthAlgorithm::OctreeFixed => "octzf",
        }
    }
}

impl fmt::Display for DepthAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown depth algorithm `{0}` (expected simple, scanline, hiez, octz or octzf)")]
pub struct ParseAlgorithmError(pub String);

impl FromStr for DepthAlgorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DepthAlgorithm::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseAlgorithmError(s.to_string()))
    }
}

/// Per-draw options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawOptions {
    /// Octree cache slot. Only the fixed octree strategy uses it; other
    /// strategies ignore it.
    pub slot: Option<usize>,
    /// Outline the octree nodes over the image after drawing.
    pub show_octree: bool,
    pub octree_color: Color,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            slot: None,
            show_octree: false,
            octree_color: Color::GREEN,
        }
    }
}

impl DrawOptions {
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_octree(mut self, color: Color) -> Self {
        self.show_octree = true;
        self.octree_color = color;
        self
    }
}

/// A depth strategy bound to a fixed target size.
pub trait DepthRenderer {
    fn algorithm(&self) -> DepthAlgorithm;

    /// Start a new depth epoch: everything drawn before is forgotten.
    fn clear_depth(&mut self);

    /// Draw `mesh` transformed by `mvp`, one color per triangle.
    ///
    /// Meshes drawn in the same epoch depth-test against each other.
    /// `target` must have the size the renderer was created with.
    fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        colors: &[Color],
        mvp: &Mat4,
        target: &mut dyn PixelTarget,
        options: &DrawOptions,
    ) -> FrameStats;
}

pub fn create_renderer(algorithm: DepthAlgorithm, width: usize, height: usize) -> Box<dyn DepthRenderer> {
    match algorithm {
        DepthAlgorithm::Simple => Box::new(SimpleRenderer::new(width, height)),
        DepthAlgorithm::Scanline => Box::new(ScanlineRenderer::new(width, height)),
        DepthAlgorithm::Hierarchical => Box::new(HierarchicalRenderer::new(width, height)),
        DepthAlgorithm::Octree => Box::new(OcclusionRenderer::new(width, height)),
        DepthAlgorithm::OctreeFixed => Box::new(OcclusionRenderer::fixed(width, height)),
    }
}

/// Color for triangle `index`, falling back to white when the table is short.
#[inline]
pub(crate) fn triangle_color(colors: &[Color], index: usize) -> Color {
    colors.get(index).copied().unwrap_or(Color::WHITE)
}

/// Tally a non-ready setup outcome.
pub(crate) fn count_rejection(stats: &mut FrameStats, setup: &Setup) {
    match setup {
        Setup::Ready(_) => {}
        Setup::BackFacing => stats.back_facing += 1,
        Setup::OffScreen => stats.off_screen += 1,
        Setup::Degenerate => stats.degenerate += 1,
    }
}

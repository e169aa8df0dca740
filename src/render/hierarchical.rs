//! Hierarchical Z-buffer without spatial subdivision.
//!
//! Each triangle's nearest depth is compared with the pyramid's bound over its
//! screen rectangle; triangles that are entirely behind what is already drawn
//! never reach the rasterizer. Pixel writes go through the pyramid, so the
//! bounds tighten as the frame fills in.

use log::trace;

use super::project::ProjectedMesh;
use super::raster::{rasterize, setup_triangle, ScreenTriangle, Setup};
use super::{count_rejection, triangle_color, DepthAlgorithm, DepthRenderer, DrawOptions, FrameStats};
use crate::color::Color;
use crate::depth::{DepthPyramid, FAR_DEPTH};
use crate::math::Mat4;
use crate::mesh::Mesh;
use crate::target::PixelTarget;

pub struct HierarchicalRenderer {
    pyramid: DepthPyramid,
    projected: ProjectedMesh,
}

/// True if the pyramid proves `tri` is hidden everywhere on screen.
#[inline]
pub(crate) fn occluded_by(pyramid: &DepthPyramid, tri: &ScreenTriangle) -> bool {
    pyramid.depth_bound(tri.rect).is_some_and(|bound| tri.min_z > bound)
}

impl HierarchicalRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pyramid: DepthPyramid::new(width, height),
            projected: ProjectedMesh::new(),
        }
    }

    pub fn pyramid(&self) -> &DepthPyramid {
        &self.pyramid
    }

    pub fn pyramid_mut(&mut self) -> &mut DepthPyramid {
        &mut self.pyramid
    }
}

impl DepthRenderer for HierarchicalRenderer {
    fn algorithm(&self) -> DepthAlgorithm {
        DepthAlgorithm::Hierarchical
    }

    fn clear_depth(&mut self) {
        self.pyramid.clear(FAR_DEPTH);
    }

    fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        colors: &[Color],
        mvp: &Mat4,
        target: &mut dyn PixelTarget,
        _options: &DrawOptions,
    ) -> FrameStats {
        let mut stats = FrameStats {
            triangles: mesh.triangle_count(),
            ..Default::default()
        };
        let (width, height) = (self.pyramid.width(), self.pyramid.height());
        debug_assert_eq!((target.width() as usize, target.height() as usize), (width, height));

        self.projected.project(mesh, mvp);
        if self.projected.outside_view_volume() {
            trace!("mesh `{}` outside the view volume", mesh.name());
            stats.meshes_culled += 1;
            return stats;
        }

        for (i, &indices) in mesh.indices().iter().enumerate() {
            let setup = setup_triangle(self.projected.triangle(indices), i, width, height);
            let Setup::Ready(tri) = setup else {
                count_rejection(&mut stats, &setup);
                continue;
            };
            if occluded_by(&self.pyramid, &tri) {
                stats.hiz_rejected += 1;
                continue;
            }
            stats.rasterized += 1;
            stats.pixels_written += rasterize(&tri, &mut self.pyramid, target, triangle_color(colors, i));
        }
        stats
    }
}

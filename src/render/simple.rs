use log::trace;

use super::project::ProjectedMesh;
use super::raster::{rasterize, setup_triangle, Setup};
use super::{count_rejection, triangle_color, DepthAlgorithm, DepthRenderer, DrawOptions, FrameStats};
use crate::color::Color;
use crate::depth::{ZBuffer, FAR_DEPTH};
use crate::math::Mat4;
use crate::mesh::Mesh;
use crate::target::PixelTarget;

/// Flat Z-buffer: every front-facing on-screen triangle is rasterized.
pub struct SimpleRenderer {
    depth: ZBuffer,
    projected: ProjectedMesh,
}

impl SimpleRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            depth: ZBuffer::new(width, height),
            projected: ProjectedMesh::new(),
        }
    }

    pub fn depth(&self) -> &ZBuffer {
        &self.depth
    }
}

impl DepthRenderer for SimpleRenderer {
    fn algorithm(&self) -> DepthAlgorithm {
        DepthAlgorithm::Simple
    }

    fn clear_depth(&mut self) {
        self.depth.clear(FAR_DEPTH);
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
        let (width, height) = (self.depth.width(), self.depth.height());
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
            stats.rasterized += 1;
            stats.pixels_written += rasterize(&tri, &mut self.depth, target, triangle_color(colors, i));
        }
        stats
    }
}

//! Scanline Z-buffer.
//!
//! # Algorithm Overview
//!
//! 1. Every non-horizontal triangle edge goes into the edge-table bucket of
//!    the row holding its lower endpoint
//! 2. Rows are visited bottom to top; each row appends its bucket to the
//!    active edge list
//! 3. The active list is sorted by (triangle, x) so the two edges of each
//!    triangle sit next to each other, and the span between them is filled
//! 4. Edges step one row up and leave the list after their top row
//!
//! Depth starts at each edge's lower vertex and moves along the triangle
//! plane: `dz/dx` per pixel across a span, `dz/dx * dx/dy + dz/dy` per row
//! along an edge.
//!
//! A lower endpoint whose two neighbours lie on opposite sides in y is shared
//! by an edge ending there, so its upward edge starts one row later and that
//! row is covered once.

use log::trace;

use super::project::ProjectedMesh;
use super::raster::{setup_triangle, ScreenTriangle, Setup};
use super::{count_rejection, triangle_color, DepthAlgorithm, DepthRenderer, DrawOptions, FrameStats};
use crate::color::Color;
use crate::depth::{ZBuffer, FAR_DEPTH};
use crate::math::Mat4;
use crate::mesh::Mesh;
use crate::target::PixelTarget;

#[derive(Clone, Copy, Debug)]
struct Edge {
    x: f32,
    dx: f32,
    y_max: i64,
    /// Triangle index in the mesh.
    id: usize,
    z: f32,
    dzdx: f32,
    dzdy: f32,
}

impl Edge {
    #[inline]
    fn advance(&mut self, rows: f32) {
        self.x += self.dx * rows;
        self.z += (self.dzdx * self.dx + self.dzdy) * rows;
    }
}

pub struct ScanlineRenderer {
    width: usize,
    height: usize,
    depth: ZBuffer,
    projected: ProjectedMesh,
    edge_table: Vec<Vec<Edge>>,
    active: Vec<Edge>,
}

impl ScanlineRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            depth: ZBuffer::new(width, height),
            projected: ProjectedMesh::new(),
            edge_table: vec![Vec::new(); height],
            active: Vec::new(),
        }
    }

    pub fn depth(&self) -> &ZBuffer {
        &self.depth
    }

    fn add_edges(&mut self, tri: &ScreenTriangle) {
        let px = tri.points.map(|p| p.x as i64);
        let py = tri.points.map(|p| p.y as i64);
        let (dzdx, dzdy) = (tri.plane.dz_dx(), tri.plane.dz_dy());

        for a in 0..3 {
            let b = (a + 1) % 3;
            if py[a] == py[b] {
                continue;
            }
            let (lo, hi) = if py[a] < py[b] { (a, b) } else { (b, a) };
            let other = 3 - lo - hi;

            let mut edge = Edge {
                x: px[lo] as f32 + 0.5,
                dx: (px[hi] - px[lo]) as f32 / (py[hi] - py[lo]) as f32,
                y_max: py[hi],
                id: tri.color_index,
                z: tri.points[lo].z,
                dzdx,
                dzdy,
            };
            let mut y_start = py[lo];
            if py[other] < py[lo] {
                edge.advance(1.0);
                y_start += 1;
            }

            if edge.y_max < 0 || y_start >= self.height as i64 {
                continue;
            }
            if y_start < 0 {
                edge.advance(-y_start as f32);
                y_start = 0;
            }
            self.edge_table[y_start as usize].push(edge);
        }
    }

    fn scan(&mut self, colors: &[Color], target: &mut dyn PixelTarget) -> usize {
        let mut written = 0;
        self.active.clear();

        for y in 0..self.height {
            self.active.append(&mut self.edge_table[y]);
            if self.active.is_empty() {
                continue;
            }
            self.active.sort_by(|a, b| a.id.cmp(&b.id).then(a.x.total_cmp(&b.x)));

            let row = self.depth.row_mut(y);
            let mut i = 0;
            while i + 1 < self.active.len() {
                let (left, right) = (&self.active[i], &self.active[i + 1]);
                if left.id != right.id {
                    // Lone edge; its partner starts on a later row.
                    i += 1;
                    continue;
                }
                written += fill_span(row, y, left, right, target, triangle_color(colors, left.id));
                i += 2;
            }

            let row_index = y as i64;
            self.active.retain_mut(|edge| {
                if edge.y_max == row_index {
                    return false;
                }
                edge.advance(1.0);
                true
            });
        }
        written
    }
}

/// Fill row `y` from `left` to `right` inclusive. Returns pixels written.
fn fill_span(
    row: &mut [f32],
    y: usize,
    left: &Edge,
    right: &Edge,
    target: &mut dyn PixelTarget,
    color: Color,
) -> usize {
    let last = row.len() as i64 - 1;
    let x_end = (right.x.floor() as i64).min(last);
    let mut x = left.x.floor() as i64;
    let mut z = left.z;
    if x < 0 {
        z += left.dzdx * (-x) as f32;
        x = 0;
    }

    let mut written = 0;
    while x <= x_end {
        let stored = &mut row[x as usize];
        if (0.0..=1.0).contains(&z) && z < *stored {
            *stored = z;
            target.set_pixel(x as i32, y as i32, color);
            written += 1;
        }
        z += left.dzdx;
        x += 1;
    }
    written
}

impl DepthRenderer for ScanlineRenderer {
    fn algorithm(&self) -> DepthAlgorithm {
        DepthAlgorithm::Scanline
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
        debug_assert_eq!((target.width() as usize, target.height() as usize), (self.width, self.height));

        self.projected.project(mesh, mvp);
        if self.projected.outside_view_volume() {
            trace!("mesh `{}` outside the view volume", mesh.name());
            stats.meshes_culled += 1;
            return stats;
        }

        for bucket in &mut self.edge_table {
            bucket.clear();
        }
        for (i, &indices) in mesh.indices().iter().enumerate() {
            let setup = setup_triangle(self.projected.triangle(indices), i, self.width, self.height);
            let Setup::Ready(tri) = setup else {
                count_rejection(&mut stats, &setup);
                continue;
            };
            stats.rasterized += 1;
            self.add_edges(&tri);
        }

        stats.pixels_written = self.scan(colors, target);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::DepthStore;
    use crate::math::Vec3;
    use crate::target::Image;

    /// NDC point landing on pixel `(px, py)` of a 16x16 target.
    fn at(px: f32, py: f32, z: f32) -> Vec3 {
        Vec3::new((px + 0.25) / 8.0 - 1.0, (py + 0.25) / 8.0 - 1.0, z)
    }

    fn draw(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> (ScanlineRenderer, Image, FrameStats) {
        let mesh = Mesh::new("test", vertices, indices);
        let colors = vec![Color::RED; mesh.triangle_count()];
        let mut renderer = ScanlineRenderer::new(16, 16);
        let mut image = Image::new(16, 16);
        let stats = renderer.draw_mesh(&mesh, &colors, &Mat4::identity(), &mut image, &DrawOptions::default());
        (renderer, image, stats)
    }

    fn written_in_row(renderer: &ScanlineRenderer, y: usize) -> Vec<usize> {
        (0..16).filter(|&x| renderer.depth().depth(x, y) < FAR_DEPTH).collect()
    }

    #[test]
    fn full_screen_quad_covers_every_pixel() {
        let vertices = vec![
            Vec3::new(-1.0, -1.0, 0.5),
            Vec3::new(1.0, -1.0, 0.5),
            Vec3::new(1.0, 1.0, 0.5),
            Vec3::new(-1.0, 1.0, 0.5),
        ];
        let (renderer, _, stats) = draw(vertices, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(stats.rasterized, 2);
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(renderer.depth().depth(x, y), 0.5, "pixel ({x}, {y})");
            }
        }
        // The shared diagonal is written once.
        assert_eq!(stats.pixels_written, 256);
    }

    #[test]
    fn pass_through_vertex_leaves_no_gap() {
        let vertices = vec![at(2.0, 2.0, 0.5), at(12.0, 7.0, 0.5), at(4.0, 14.0, 0.5)];
        let (renderer, image, _) = draw(vertices, vec![[0, 1, 2]]);
        for y in 2..14 {
            let row = written_in_row(&renderer, y);
            assert!(!row.is_empty(), "row {y} is empty");
            assert_eq!(row.len(), row[row.len() - 1] - row[0] + 1, "row {y} has a hole");
        }
        assert!(written_in_row(&renderer, 15).is_empty());
        assert_eq!(image.pixel(7, 7), Some([255, 0, 0]));
    }

    #[test]
    fn edges_starting_below_the_image_are_clipped() {
        let vertices = vec![at(2.0, -6.0, 0.5), at(14.0, -6.0, 0.5), at(8.0, 10.0, 0.5)];
        let (renderer, _, stats) = draw(vertices, vec![[0, 1, 2]]);
        assert_eq!(stats.rasterized, 1);
        let bottom = written_in_row(&renderer, 0);
        assert!(bottom.contains(&8));
        assert!(!bottom.contains(&0));
        assert!(written_in_row(&renderer, 12).is_empty());
    }

    #[test]
    fn depth_follows_the_plane() {
        let vertices = vec![
            Vec3::new(-1.0, -1.0, 0.2),
            Vec3::new(1.0, -1.0, 0.6),
            Vec3::new(-1.0, 1.0, 0.2),
        ];
        let (renderer, _, _) = draw(vertices, vec![[0, 1, 2]]);
        let left = renderer.depth().depth(0, 4);
        let right = renderer.depth().depth(8, 4);
        assert!((left - 0.2).abs() < 0.03, "left depth {left}");
        assert!(right > left);
    }

    #[test]
    fn nearer_triangle_wins_regardless_of_order() {
        let near = [at(2.0, 2.0, 0.2), at(13.0, 2.0, 0.2), at(7.0, 13.0, 0.2)];
        let far = [at(2.0, 2.0, 0.8), at(13.0, 2.0, 0.8), at(7.0, 13.0, 0.8)];
        let vertices: Vec<Vec3> = far.iter().chain(near.iter()).copied().collect();
        let mesh = Mesh::new("pair", vertices, vec![[0, 1, 2], [3, 4, 5]]);
        let colors = [Color::BLUE, Color::GREEN];

        let mut renderer = ScanlineRenderer::new(16, 16);
        let mut image = Image::new(16, 16);
        renderer.draw_mesh(&mesh, &colors, &Mat4::identity(), &mut image, &DrawOptions::default());
        assert_eq!(image.pixel(7, 6), Some([0, 255, 0]));
        assert_eq!(renderer.depth().depth(7, 6), 0.2);
    }
}

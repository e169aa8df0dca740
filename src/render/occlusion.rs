//! Octree-accelerated hierarchical Z-buffer.
//!
//! # Algorithm Overview
//!
//! 1. Project the mesh into NDC and reject it whole if its bounding box misses
//!    the view volume
//! 2. Sort its triangles into an [`Octree`] over that bounding box (or reuse a
//!    cached one in fixed mode)
//! 3. Walk the tree front to back: draw the triangles stored at a node, then
//!    visit its children in near/far pairs
//! 4. Before entering a node, compare its nearest depth with the depth
//!    pyramid's bound over its screen rectangle; if everything there is
//!    already nearer, the node and its whole subtree are skipped
//!
//! Near and far children of a pair cover the same screen rectangle, and the
//! far one starts where the near one ends in depth. Once the near child is
//! occluded its far sibling must be too, so it is skipped without a test.
//!
//! # Fixed mode
//!
//! An octree depends on the MVP it was built under. In fixed mode octrees are
//! cached per [`DrawOptions::slot`] together with that MVP; drawing a slot with
//! a different MVP rebuilds its octree and logs a warning.

use log::{debug, trace, warn};

use super::hierarchical::occluded_by;
use super::project::{outside_view_volume, ProjectedMesh};
use super::raster::{clamp_span, ndc_to_pixel, rasterize, setup_triangle, Setup};
use super::{count_rejection, triangle_color, DepthAlgorithm, DepthRenderer, DrawOptions, FrameStats};
use crate::color::Color;
use crate::depth::{DepthPyramid, PixelRect, FAR_DEPTH};
use crate::math::{Mat4, Vec3};
use crate::mesh::Mesh;
use crate::octree::{CacheLookup, NodeId, Octant, Octree, OctreeCache, OctreeNode, OctreeTriangle, ROOT};
use crate::target::PixelTarget;

pub struct OcclusionRenderer {
    width: usize,
    height: usize,
    pyramid: DepthPyramid,
    projected: ProjectedMesh,
    /// Rebuilt on every uncached draw.
    octree: Octree,
    /// Present in fixed mode.
    cache: Option<OctreeCache>,
}

impl OcclusionRenderer {
    /// Renderer that rebuilds the octree on every draw.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pyramid: DepthPyramid::new(width, height),
            projected: ProjectedMesh::new(),
            octree: Octree::new(Vec3::ZERO, Vec3::ZERO),
            cache: None,
        }
    }

    /// Fixed-mode renderer with an empty octree cache.
    pub fn fixed(width: usize, height: usize) -> Self {
        Self::with_cache(width, height, OctreeCache::new())
    }

    /// Fixed-mode renderer using `cache`, e.g. one kept from an earlier
    /// renderer of the same size.
    pub fn with_cache(width: usize, height: usize, cache: OctreeCache) -> Self {
        Self {
            cache: Some(cache),
            ..Self::new(width, height)
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.cache.is_some()
    }

    pub fn cache(&self) -> Option<&OctreeCache> {
        self.cache.as_ref()
    }

    pub fn cache_mut(&mut self) -> Option<&mut OctreeCache> {
        self.cache.as_mut()
    }

    pub fn pyramid(&self) -> &DepthPyramid {
        &self.pyramid
    }

    pub fn pyramid_mut(&mut self) -> &mut DepthPyramid {
        &mut self.pyramid
    }

    /// The octree of the last uncached draw.
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    fn rebuild_cached(&mut self, slot: usize, mesh: &Mesh, mvp: &Mat4) {
        let Some(cache) = self.cache.as_mut() else {
            return;
        };
        let mut tree = cache
            .take(slot)
            .unwrap_or_else(|| Octree::new(self.projected.min(), self.projected.max()));
        fill_octree(&mut tree, &self.projected, mesh);
        debug!("cached octree for `{}` in slot {slot}: {} nodes", mesh.name(), tree.nodes().len());
        cache.insert(slot, *mvp, tree);
    }
}

/// Refill `tree` with every triangle of the projected mesh.
fn fill_octree(tree: &mut Octree, projected: &ProjectedMesh, mesh: &Mesh) {
    tree.reset(projected.min(), projected.max());
    tree.extend(
        mesh.indices()
            .iter()
            .enumerate()
            .map(|(i, &indices)| OctreeTriangle::new(projected.triangle(indices), i as u32)),
    );
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visibility {
    Visible,
    /// Behind what the pyramid already holds.
    Occluded,
    /// Off screen or outside the depth range.
    Outside,
}

struct Traversal<'a> {
    octree: &'a Octree,
    pyramid: &'a mut DepthPyramid,
    target: &'a mut dyn PixelTarget,
    colors: &'a [Color],
    stats: &'a mut FrameStats,
    width: usize,
    height: usize,
}

impl Traversal<'_> {
    fn node_visibility(&self, node: &OctreeNode) -> Visibility {
        let (min, max) = (node.min(), node.max());
        if max.z < 0.0 || min.z > 1.0 {
            return Visibility::Outside;
        }

        let xs = clamp_span(ndc_to_pixel(min.x, self.width), ndc_to_pixel(max.x, self.width), self.width);
        let ys = clamp_span(ndc_to_pixel(min.y, self.height), ndc_to_pixel(max.y, self.height), self.height);
        let (Some((x_min, x_max)), Some((y_min, y_max))) = (xs, ys) else {
            return Visibility::Outside;
        };

        match self.pyramid.depth_bound(PixelRect::new(x_min, x_max, y_min, y_max)) {
            Some(bound) if min.z > bound => Visibility::Occluded,
            _ => Visibility::Visible,
        }
    }

    /// Test a node and descend into it if visible. `None` for empty subtrees.
    fn enter(&mut self, id: NodeId) -> Option<Visibility> {
        let node = self.octree.node(id);
        if node.subtree_len() == 0 {
            return None;
        }
        let visibility = self.node_visibility(node);
        match visibility {
            Visibility::Visible => self.visit(id),
            Visibility::Occluded | Visibility::Outside => self.stats.nodes_culled += 1,
        }
        Some(visibility)
    }

    fn visit(&mut self, id: NodeId) {
        let octree = self.octree;
        let node = octree.node(id);
        self.stats.nodes_visited += 1;

        for tri in node.triangles() {
            self.draw_triangle(tri);
        }

        let Some(children) = node.children() else {
            return;
        };
        for near in Octant::NEAR {
            let far = children[near.depth_sibling().index()];
            if self.enter(children[near.index()]) == Some(Visibility::Occluded) {
                if octree.node(far).subtree_len() > 0 {
                    self.stats.siblings_skipped += 1;
                }
                continue;
            }
            self.enter(far);
        }
    }

    fn draw_triangle(&mut self, tri: &OctreeTriangle) {
        let setup = setup_triangle(tri.vertices, tri.index as usize, self.width, self.height);
        let Setup::Ready(screen) = setup else {
            count_rejection(self.stats, &setup);
            return;
        };
        if occluded_by(self.pyramid, &screen) {
            self.stats.hiz_rejected += 1;
            return;
        }
        self.stats.rasterized += 1;
        let color = triangle_color(self.colors, screen.color_index);
        self.stats.pixels_written += rasterize(&screen, &mut *self.pyramid, &mut *self.target, color);
    }
}

impl DepthRenderer for OcclusionRenderer {
    fn algorithm(&self) -> DepthAlgorithm {
        if self.is_fixed() {
            DepthAlgorithm::OctreeFixed
        } else {
            DepthAlgorithm::Octree
        }
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
        options: &DrawOptions,
    ) -> FrameStats {
        let mut stats = FrameStats {
            triangles: mesh.triangle_count(),
            ..Default::default()
        };
        debug_assert_eq!((target.width() as usize, target.height() as usize), (self.width, self.height));

        let cached = match (&self.cache, options.slot) {
            (Some(cache), Some(slot)) => Some((slot, cache.lookup(slot, mvp))),
            _ => None,
        };

        // A cache hit already knows the mesh's NDC bounds.
        let reused_bounds = match cached {
            Some((slot, CacheLookup::Hit)) => self
                .cache
                .as_ref()
                .and_then(|cache| cache.get(slot))
                .map(|tree| (tree.root().min(), tree.root().max())),
            _ => None,
        };
        let reuse = reused_bounds.is_some();
        let (min, max) = reused_bounds.unwrap_or_else(|| {
            self.projected.project(mesh, mvp);
            (self.projected.min(), self.projected.max())
        });

        if outside_view_volume(min, max) {
            debug!("mesh `{}` outside the view volume", mesh.name());
            stats.meshes_culled += 1;
            return stats;
        }

        match cached {
            Some((slot, _)) if reuse => {
                trace!("reusing octree in slot {slot}");
                stats.octrees_reused += 1;
            }
            Some((slot, lookup)) => {
                if lookup == CacheLookup::Stale {
                    warn!("octree in slot {slot} was built under a different transform, rebuilding");
                }
                self.rebuild_cached(slot, mesh, mvp);
                stats.octrees_built += 1;
            }
            None => {
                fill_octree(&mut self.octree, &self.projected, mesh);
                stats.octrees_built += 1;
            }
        }

        let octree = match (cached, &self.cache) {
            (Some((slot, _)), Some(cache)) => cache.get(slot),
            _ => Some(&self.octree),
        };
        let Some(octree) = octree else {
            return stats;
        };

        let mut traversal = Traversal {
            octree,
            pyramid: &mut self.pyramid,
            target: &mut *target,
            colors,
            stats: &mut stats,
            width: self.width,
            height: self.height,
        };
        traversal.enter(ROOT);

        if options.show_octree {
            octree.draw_wireframe(target, options.octree_color);
        }
        stats
    }
}

//! Octree over a projected mesh in NDC.
//!
//! Nodes live in one arena ([`Octree::nodes`]) and refer to their children by
//! index, so a tree can be cleared and refilled without freeing its storage.
//! Each node's box is the whole node volume; a triangle is stored at the
//! deepest node whose box contains its NDC bounding box entirely.
//!
//! A leaf holds up to [`SUBDIVISION_THRESHOLD`] triangles. Inserting one more
//! splits it into eight children, after which the residents and the newcomer
//! are pushed down as far as they fit. Triangles straddling a split plane stay
//! behind in the interior node. Splitting stops at [`MAX_DEPTH`] so stacks of
//! identical triangles cannot recurse forever.

mod cache;
mod octant;

pub use cache::{CacheLookup, OctreeCache};
pub use octant::Octant;

use crate::color::Color;
use crate::math::Vec3;
use crate::render::raster::ndc_to_pixel;
use crate::target::{clip_segment, PixelTarget};

/// Leaf capacity before a split.
pub const SUBDIVISION_THRESHOLD: usize = 4;

/// Nodes at this depth never split.
pub const MAX_DEPTH: u32 = 16;

/// Index of a node in [`Octree::nodes`].
pub type NodeId = u32;

pub const ROOT: NodeId = 0;

/// A mesh triangle in NDC with its bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctreeTriangle {
    pub vertices: [Vec3; 3],
    pub min: Vec3,
    pub max: Vec3,
    /// Position of the triangle in the source mesh.
    pub index: u32,
}

impl OctreeTriangle {
    pub fn new(vertices: [Vec3; 3], index: u32) -> Self {
        Self {
            vertices,
            min: vertices[0].min(vertices[1]).min(vertices[2]),
            max: vertices[0].max(vertices[1]).max(vertices[2]),
            index,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OctreeNode {
    min: Vec3,
    max: Vec3,
    depth: u32,
    children: Option<[NodeId; 8]>,
    triangles: Vec<OctreeTriangle>,
    subtree_len: usize,
}

impl OctreeNode {
    fn new(min: Vec3, max: Vec3, depth: u32) -> Self {
        Self {
            min,
            max,
            depth,
            children: None,
            triangles: Vec::new(),
            subtree_len: 0,
        }
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Child indices in [`Octant`] order.
    pub fn children(&self) -> Option<&[NodeId; 8]> {
        self.children.as_ref()
    }

    pub fn child(&self, octant: Octant) -> Option<NodeId> {
        self.children.map(|c| c[octant.index()])
    }

    /// Triangles stored at this node itself.
    pub fn triangles(&self) -> &[OctreeTriangle] {
        &self.triangles
    }

    /// Triangles stored in this node and all of its descendants.
    pub fn subtree_len(&self) -> usize {
        self.subtree_len
    }
}

#[derive(Clone, Debug)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
}

impl Octree {
    /// An empty tree whose root covers `[min, max]`.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            nodes: vec![OctreeNode::new(min, max, 0)],
        }
    }

    pub fn build<I>(min: Vec3, max: Vec3, triangles: I) -> Self
    where
        I: IntoIterator<Item = OctreeTriangle>,
    {
        let mut tree = Self::new(min, max);
        tree.extend(triangles);
        tree
    }

    /// Drop every node and start over with an empty root, keeping the arena's
    /// allocation.
    pub fn reset(&mut self, min: Vec3, max: Vec3) {
        self.nodes.clear();
        self.nodes.push(OctreeNode::new(min, max, 0));
    }

    pub fn extend<I>(&mut self, triangles: I)
    where
        I: IntoIterator<Item = OctreeTriangle>,
    {
        for tri in triangles {
            self.insert(tri);
        }
    }

    pub fn insert(&mut self, tri: OctreeTriangle) {
        self.insert_from(ROOT, tri);
    }

    fn insert_from(&mut self, start: NodeId, tri: OctreeTriangle) {
        let mut id = start as usize;
        loop {
            self.nodes[id].subtree_len += 1;

            let node = &self.nodes[id];
            if node.is_leaf() {
                if node.triangles.len() < SUBDIVISION_THRESHOLD || node.depth >= MAX_DEPTH {
                    self.nodes[id].triangles.push(tri);
                    return;
                }
                self.subdivide(id);
            }

            let node = &self.nodes[id];
            match (node.children, Octant::classify(tri.min, tri.max, node.center())) {
                (Some(children), Some(octant)) => id = children[octant.index()] as usize,
                _ => {
                    self.nodes[id].triangles.push(tri);
                    return;
                }
            }
        }
    }

    fn subdivide(&mut self, id: usize) {
        let (min, max, depth) = {
            let node = &self.nodes[id];
            (node.min, node.max, node.depth)
        };
        let center = (min + max) * 0.5;

        let first = self.nodes.len() as NodeId;
        for octant in Octant::ALL {
            let (lo, hi) = octant.child_bounds(min, center, max);
            self.nodes.push(OctreeNode::new(lo, hi, depth + 1));
        }
        self.nodes[id].children = Some(std::array::from_fn(|i| first + i as NodeId));

        let residents = std::mem::take(&mut self.nodes[id].triangles);
        self.nodes[id].subtree_len -= residents.len();
        for tri in residents {
            self.insert_from(id as NodeId, tri);
        }
    }

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[ROOT as usize]
    }

    pub fn node(&self, id: NodeId) -> &OctreeNode {
        &self.nodes[id as usize]
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Number of stored triangles.
    pub fn len(&self) -> usize {
        self.root().subtree_len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw the x/y outline of every node box into `target`.
    pub fn draw_wireframe<T: PixelTarget + ?Sized>(&self, target: &mut T, color: Color) {
        let (width, height) = (target.width(), target.height());
        let to_pixel = |v: Vec3| {
            (
                f64::from(ndc_to_pixel(v.x, width as usize)),
                f64::from(ndc_to_pixel(v.y, height as usize)),
            )
        };

        for node in &self.nodes {
            let corner = |i: usize| {
                Vec3::new(
                    if i & 0b100 != 0 { node.max.x } else { node.min.x },
                    if i & 0b010 != 0 { node.max.y } else { node.min.y },
                    if i & 0b001 != 0 { node.max.z } else { node.min.z },
                )
            };
            for i in 0..8 {
                for bit in [0b100, 0b010, 0b001] {
                    if i & bit == 0 {
                        // Boxes of meshes reaching far outside the view map
                        // to huge pixel coordinates; clip before going integer.
                        let edge = clip_segment(to_pixel(corner(i)), to_pixel(corner(i | bit)), width, height);
                        if let Some(((x0, y0), (x1, y1))) = edge {
                            target.draw_line(x0, y0, x1, y1, color);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Image;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn tri_at(center: Vec3, size: f32, index: u32) -> OctreeTriangle {
        OctreeTriangle::new(
            [
                center + Vec3::new(-size, -size, 0.0),
                center + Vec3::new(size, -size, 0.0),
                center + Vec3::new(0.0, size, 0.0),
            ],
            index,
        )
    }

    fn random_tree(seed: u64, count: u32) -> Octree {
        let mut rng = StdRng::seed_from_u64(seed);
        let tris = (0..count).map(|i| {
            let mut vertices = [Vec3::ZERO; 3];
            let base = Vec3::new(
                rng.random_range(-0.9..0.9),
                rng.random_range(-0.9..0.9),
                rng.random_range(0.05..0.95),
            );
            for vertex in &mut vertices {
                *vertex = base
                    + Vec3::new(
                        rng.random_range(-0.1..0.1),
                        rng.random_range(-0.1..0.1),
                        rng.random_range(-0.05..0.05),
                    );
            }
            OctreeTriangle::new(vertices, i)
        });
        let tris: Vec<_> = tris.collect();
        Octree::build(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 1.0), tris)
    }

    fn contains(node: &OctreeNode, tri: &OctreeTriangle) -> bool {
        let (lo, hi) = (node.min(), node.max());
        tri.min.x >= lo.x
            && tri.min.y >= lo.y
            && tri.min.z >= lo.z
            && tri.max.x <= hi.x
            && tri.max.y <= hi.y
            && tri.max.z <= hi.z
    }

    #[test]
    fn small_sets_stay_in_the_root() {
        let mut tree = Octree::new(Vec3::splat(-1.0), Vec3::ONE);
        for i in 0..SUBDIVISION_THRESHOLD as u32 {
            tree.insert(tri_at(Vec3::new(0.5, 0.5, 0.5), 0.1, i));
        }
        assert!(tree.root().is_leaf());
        assert_eq!(tree.root().triangles().len(), SUBDIVISION_THRESHOLD);
        assert_eq!(tree.len(), SUBDIVISION_THRESHOLD);
    }

    #[test]
    fn overflow_splits_and_pushes_residents_down() {
        let mut tree = Octree::new(Vec3::splat(-1.0), Vec3::ONE);
        let spots = [
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(-0.5, 0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
        ];
        for (i, &spot) in spots.iter().enumerate() {
            tree.insert(tri_at(spot, 0.1, i as u32));
        }
        // Straddles every split plane.
        let big = OctreeTriangle::new(
            [Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, -0.5, 0.5), Vec3::new(0.0, 0.5, 0.0)],
            4,
        );
        tree.insert(big);

        let root = tree.root();
        assert!(!root.is_leaf());
        assert_eq!(root.triangles(), &[big]);
        assert_eq!(root.subtree_len(), 5);
        assert_eq!(tree.nodes().len(), 9);

        let child = tree.node(root.child(Octant::RightTopFar).unwrap_or(ROOT));
        assert_eq!(child.triangles().len(), 1);
        assert_eq!(child.triangles()[0].index, 3);
        assert_eq!(child.depth(), 1);
        assert_eq!(child.min(), Vec3::ZERO);
    }

    #[test]
    fn identical_triangles_stop_at_max_depth() {
        let mut tree = Octree::new(Vec3::splat(-1.0), Vec3::ONE);
        let tri = tri_at(Vec3::new(0.3, 0.3, 0.3), 0.0, 0);
        for _ in 0..64 {
            tree.insert(tri);
        }
        assert_eq!(tree.len(), 64);
        let deepest = tree.nodes().iter().map(OctreeNode::depth).max().unwrap_or(0);
        assert_eq!(deepest, MAX_DEPTH);
    }

    #[test]
    fn every_triangle_sits_in_a_containing_node() {
        let tree = random_tree(7, 500);
        let mut seen = vec![false; 500];
        for node in tree.nodes() {
            for tri in node.triangles() {
                assert!(contains(node, tri), "triangle {} escapes its node", tri.index);
                // Deepest fit: no child could have taken it.
                if !node.is_leaf() {
                    assert_eq!(Octant::classify(tri.min, tri.max, node.center()), None);
                }
                if node.is_leaf() {
                    assert!(node.triangles().len() <= SUBDIVISION_THRESHOLD || node.depth() == MAX_DEPTH);
                }
                assert!(!seen[tri.index as usize]);
                seen[tri.index as usize] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn subtree_counts_add_up() {
        let tree = random_tree(11, 300);
        assert_eq!(tree.len(), 300);
        for node in tree.nodes() {
            let below: usize = node
                .children()
                .map(|c| c.iter().map(|&id| tree.node(id).subtree_len()).sum())
                .unwrap_or(0);
            assert_eq!(node.subtree_len(), node.triangles().len() + below);
        }
    }

    #[test]
    fn reset_empties_the_tree() {
        let mut tree = random_tree(3, 100);
        tree.reset(Vec3::ZERO, Vec3::ONE);
        assert!(tree.is_empty());
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.root().max(), Vec3::ONE);
    }

    struct LineCounter {
        lines: usize,
    }

    impl PixelTarget for LineCounter {
        fn width(&self) -> u32 {
            16
        }

        fn height(&self) -> u32 {
            16
        }

        fn set_pixel(&mut self, _x: i32, _y: i32, _color: Color) {}

        fn draw_line(&mut self, _x0: i32, _y0: i32, _x1: i32, _y1: i32, _color: Color) {
            self.lines += 1;
        }
    }

    #[test]
    fn wireframe_draws_twelve_edges_per_node() {
        let tree = random_tree(5, 40);
        let mut target = LineCounter { lines: 0 };
        tree.draw_wireframe(&mut target, Color::GREEN);
        assert_eq!(target.lines, 12 * tree.nodes().len());
    }

    #[test]
    fn wireframe_of_a_box_far_wider_than_the_view_is_clipped() {
        let tri = OctreeTriangle::new(
            [
                Vec3::new(-1.0e9, -0.5, 0.5),
                Vec3::new(0.5, -0.5, 0.5),
                Vec3::new(0.5, 0.5, 0.5),
            ],
            0,
        );
        let mut tree = Octree::new(tri.min, tri.max);
        tree.insert(tri);

        let mut image = Image::new(16, 16);
        tree.draw_wireframe(&mut image, Color::GREEN);

        // Right edge of the box at x = 0.5 is on screen, the left one is not.
        assert_eq!(image.pixel(12, 8), Some([0, 255, 0]));
        assert_eq!(image.pixel(0, 4), Some([0, 255, 0]));
        assert_eq!(image.pixel(0, 8), Some([0, 0, 0]));
    }
}

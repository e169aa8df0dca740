use std::fmt;
use std::ops::AddAssign;

/// Counters collected by one `draw_mesh` call.
///
/// Counters a strategy has no use for stay zero (a plain Z-buffer never
/// visits octree nodes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Triangles submitted with the mesh.
    pub triangles: usize,
    pub back_facing: usize,
    pub off_screen: usize,
    /// Zero area after snapping to pixels.
    pub degenerate: usize,
    /// Triangles rejected by the per-triangle depth pyramid test.
    pub hiz_rejected: usize,
    /// Triangles that reached the rasterizer.
    pub rasterized: usize,
    pub pixels_written: usize,
    pub nodes_visited: usize,
    /// Occluded or out-of-view octree nodes.
    pub nodes_culled: usize,
    /// Far siblings skipped because their near sibling was occluded.
    pub siblings_skipped: usize,
    pub octrees_built: usize,
    pub octrees_reused: usize,
    /// Meshes rejected whole against the view volume.
    pub meshes_culled: usize,
}

impl AddAssign for FrameStats {
    fn add_assign(&mut self, rhs: Self) {
        self.triangles += rhs.triangles;
        self.back_facing += rhs.back_facing;
        self.off_screen += rhs.off_screen;
        self.degenerate += rhs.degenerate;
        self.hiz_rejected += rhs.hiz_rejected;
        self.rasterized += rhs.rasterized;
        self.pixels_written += rhs.pixels_written;
        self.nodes_visited += rhs.nodes_visited;
        self.nodes_culled += rhs.nodes_culled;
        self.siblings_skipped += rhs.siblings_skipped;
        self.octrees_built += rhs.octrees_built;
        self.octrees_reused += rhs.octrees_reused;
        self.meshes_culled += rhs.meshes_culled;
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tris: {} rasterized, {} back-facing, {} off-screen, {} degenerate, {} hi-z rejected; \
             {} pixels; nodes {} visited / {} culled / {} skipped; octrees {} built / {} reused; {} meshes culled",
            self.triangles,
            self.rasterized,
            self.back_facing,
            self.off_screen,
            self.degenerate,
            self.hiz_rejected,
            self.pixels_written,
            self.nodes_visited,
            self.nodes_culled,
            self.siblings_skipped,
            self.octrees_built,
            self.octrees_reused,
            self.meshes_culled,
        )
    }
}

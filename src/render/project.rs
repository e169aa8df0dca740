//! Vertex projection and whole-mesh view-volume rejection.

use crate::math::{Mat4, Vec3, Vec4};
use crate::mesh::Mesh;

/// A mesh's vertices after the MVP transform and perspective divide.
///
/// Kept by each renderer as a scratch buffer so repeated draws do not
/// reallocate.
#[derive(Clone, Debug, Default)]
pub struct ProjectedMesh {
    ndc: Vec<Vec3>,
    min: Vec3,
    max: Vec3,
}

impl ProjectedMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `mesh` projected by `mvp`.
    pub fn project(&mut self, mesh: &Mesh, mvp: &Mat4) {
        self.ndc.clear();
        self.ndc
            .extend(mesh.vertices().iter().map(|&v| (*mvp * Vec4::point(v)).perspective_divide()));

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for &v in &self.ndc {
            min = min.min(v);
            max = max.max(v);
        }
        self.min = min;
        self.max = max;
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.ndc
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    #[inline]
    pub fn triangle(&self, indices: [u32; 3]) -> [Vec3; 3] {
        indices.map(|i| self.ndc[i as usize])
    }

    pub fn outside_view_volume(&self) -> bool {
        outside_view_volume(self.min, self.max)
    }
}

/// True if the NDC box `[min, max]` lies entirely outside
/// `x, y ∈ [-1, 1]`, `z ∈ [0, 1]`.
///
/// Empty boxes (`min > max`) are always outside.
pub fn outside_view_volume(min: Vec3, max: Vec3) -> bool {
    !(min.x <= 1.0 && max.x >= -1.0 && min.y <= 1.0 && max.y >= -1.0 && min.z <= 1.0 && max.z >= 0.0)
}

//! Per-triangle flat shading.
//!
//! The renderers take one color per triangle; this is the usual way to
//! produce that table.

use crate::color::Color;
use crate::math::Vec3;
use crate::mesh::Mesh;

/// A directional light that illuminates the scene uniformly from a direction.
pub struct DirectionalLight {
    /// The normalized direction the light is pointing (not where it comes from).
    pub direction: Vec3,
    pub ambient_intensity: f32,
    /// Multiplier for the diffuse lighting contribution (default: 1.0)
    pub diffuse_strength: f32,
}

impl DirectionalLight {
    /// Create a new directional light pointing in the given direction.
    /// The direction will be normalized automatically.
    pub fn new(direction: Vec3) -> Self {
        DirectionalLight {
            direction: direction.normalize(),
            ambient_intensity: 0.1,
            diffuse_strength: 1.0,
        }
    }

    /// Lambert term in `[0, 1]` for a surface normal.
    pub fn intensity(&self, normal: Vec3) -> f32 {
        // Negate direction: light pointing at surface = positive dot product
        (-self.direction).dot(normal.normalize()).max(0.0)
    }

    /// One shaded color per triangle of `mesh`, in index order.
    pub fn face_colors(&self, mesh: &Mesh, base: Color) -> Vec<Color> {
        (0..mesh.triangle_count())
            .map(|i| {
                let [a, b, c] = mesh.triangle(i);
                let normal = (b - a).cross(c - a);
                let k = self.ambient_intensity + self.diffuse_strength * self.intensity(normal);
                base * k.min(1.0)
            })
            .collect()
    }
}

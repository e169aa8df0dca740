//! Indexed triangle meshes.

use std::f32::consts::PI;
use std::path::Path;

use thiserror::Error;

use crate::math::Vec3;

/// Errors that can occur while loading a mesh from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to parse OBJ file: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("OBJ file contains no triangles")]
    Empty,
}

/// A triangle mesh: world-space positions plus 0-based triangle indices.
///
/// Triangles are counter-clockwise when seen from their front side.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    name: String,
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(name: impl Into<String>, vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        debug_assert!(
            indices.iter().flatten().all(|&i| (i as usize) < vertices.len()),
            "triangle index out of range"
        );
        Self {
            name: name.into(),
            vertices,
            indices,
        }
    }

    /// Axis-aligned cube from -1 to 1 on every axis (8 vertices, 12 triangles).
    ///
    /// The first two triangles form the +Z face.
    pub fn cube() -> Self {
        let vertices = vec![
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ];
        let indices = vec![
            // +Z
            [4, 5, 6],
            [4, 6, 7],
            // -Z
            [1, 0, 3],
            [1, 3, 2],
            // +X
            [5, 1, 2],
            [5, 2, 6],
            // -X
            [0, 4, 7],
            [0, 7, 3],
            // +Y
            [7, 6, 2],
            [7, 2, 3],
            // -Y
            [0, 1, 5],
            [0, 5, 4],
        ];
        Self::new("cube", vertices, indices)
    }

    /// Unit sphere tessellated into `stacks` latitude bands and `slices`
    /// longitude segments.
    pub fn uv_sphere(stacks: u32, slices: u32) -> Self {
        let stacks = stacks.max(2);
        let slices = slices.max(3);

        let mut vertices = Vec::with_capacity(((stacks + 1) * slices) as usize);
        for i in 0..=stacks {
            let phi = PI * i as f32 / stacks as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            for j in 0..slices {
                let theta = 2.0 * PI * j as f32 / slices as f32;
                let (sin_theta, cos_theta) = theta.sin_cos();
                vertices.push(Vec3::new(sin_phi * cos_theta, cos_phi, -sin_phi * sin_theta));
            }
        }

        let at = |i: u32, j: u32| i * slices + j % slices;
        let mut indices = Vec::with_capacity((stacks * slices * 2) as usize);
        for i in 0..stacks {
            for j in 0..slices {
                let (a, b) = (at(i, j), at(i, j + 1));
                let (c, d) = (at(i + 1, j), at(i + 1, j + 1));
                // Skip the zero-area triangles collapsed onto the poles.
                if i != 0 {
                    indices.push([a, c, b]);
                }
                if i != stacks - 1 {
                    indices.push([b, c, d]);
                }
            }
        }

        Self::new("sphere", vertices, indices)
    }

    /// Load every object of an OBJ file into one mesh.
    ///
    /// Faces are triangulated; texture coordinates and normals are ignored.
    pub fn from_obj<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )?;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for model in &models {
            let base = vertices.len() as u32;
            vertices.extend(
                model
                    .mesh
                    .positions
                    .chunks_exact(3)
                    .map(|p| Vec3::new(p[0], p[1], p[2])),
            );
            indices.extend(
                model
                    .mesh
                    .indices
                    .chunks_exact(3)
                    .map(|t| [base + t[0], base + t[1], base + t[2]]),
            );
        }

        if indices.is_empty() {
            return Err(LoadError::Empty);
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::debug!(
            "loaded {name}: {} vertices, {} triangles from {} objects",
            vertices.len(),
            indices.len(),
            models.len()
        );
        Ok(Self::new(name, vertices, indices))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// The three corner positions of triangle `i`.
    #[inline]
    pub fn triangle(&self, i: usize) -> [Vec3; 3] {
        self.indices[i].map(|v| self.vertices[v as usize])
    }

    /// Axis-aligned bounds as `(min, max)`. An empty mesh yields inverted
    /// infinite bounds.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), &v| (min.min(v), max.max(v)),
        )
    }

    /// Mean of all vertex positions.
    pub fn center(&self) -> Vec3 {
        if self.vertices.is_empty() {
            return Vec3::ZERO;
        }
        let sum = self.vertices.iter().fold(Vec3::ZERO, |acc, &v| acc + v);
        sum / self.vertices.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face_normal(mesh: &Mesh, i: usize) -> Vec3 {
        let [a, b, c] = mesh.triangle(i);
        (b - a).cross(c - a)
    }

    #[test]
    fn cube_faces_point_outwards() {
        let cube = Mesh::cube();
        assert_eq!(cube.triangle_count(), 12);
        for i in 0..cube.triangle_count() {
            let [a, b, c] = cube.triangle(i);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal(&cube, i).dot(centroid) > 0.0, "triangle {i} faces inwards");
        }
    }

    #[test]
    fn cube_starts_with_front_face() {
        let cube = Mesh::cube();
        for i in 0..2 {
            let n = face_normal(&cube, i).normalize();
            assert_relative_eq!(n.z, 1.0);
        }
    }

    #[test]
    fn sphere_faces_point_outwards() {
        let sphere = Mesh::uv_sphere(8, 12);
        assert_eq!(sphere.triangle_count(), 2 * 12 * (8 - 1));
        for i in 0..sphere.triangle_count() {
            let [a, b, c] = sphere.triangle(i);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal(&sphere, i).dot(centroid) > 0.0, "triangle {i} faces inwards");
        }
    }

    #[test]
    fn bounds_and_center() {
        let cube = Mesh::cube();
        let (min, max) = cube.bounds();
        assert_eq!(min, Vec3::splat(-1.0));
        assert_eq!(max, Vec3::splat(1.0));
        assert_eq!(cube.center(), Vec3::ZERO);
    }

    #[test]
    fn missing_obj_is_an_error() {
        let err = Mesh::from_obj("does/not/exist.obj").unwrap_err();
        assert!(matches!(err, LoadError::Obj(_)));
    }
}

//! Edge-function triangle rasterization with perspective-correct depth.
//!
//! # Edge Function
//!
//! For an edge from point A to point B, the edge function at point P is:
//!
//! ```text
//! E(P) = (P.x - A.x) * (B.y - A.y) - (P.y - A.y) * (B.x - A.x)
//! ```
//!
//! This is the 2D cross product (B - A) × (P - A). A pixel is inside the
//! triangle when the three edge functions do not disagree in sign; a value of
//! zero (pixel exactly on an edge) counts as inside.
//!
//! # Depth
//!
//! Each vertex carries `1/z` of its NDC depth. The per-pixel depth is the
//! barycentric interpolation of those reciprocals, reciprocated back:
//!
//! ```text
//! z = 1 / (λ0/z0 + λ1/z1 + λ2/z2)        λi = Ei / area
//! ```
//!
//! Depths outside `[0, 1]` are discarded, and a pixel is written only if its
//! depth is strictly nearer than the stored value.

use crate::color::Color;
use crate::depth::{DepthStore, PixelRect};
use crate::math::Vec3;
use crate::target::PixelTarget;

/// Plane `normal · p = offset` through a triangle in screen space
/// (x, y in pixels, z in NDC depth).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub fn through(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let normal = (b - a).cross(c - a);
        Self {
            normal,
            offset: normal.dot(a),
        }
    }

    /// Depth change per pixel step in x. Zero for planes seen edge-on.
    pub fn dz_dx(&self) -> f32 {
        if self.normal.z == 0.0 {
            0.0
        } else {
            -self.normal.x / self.normal.z
        }
    }

    /// Depth change per pixel step in y. Zero for planes seen edge-on.
    pub fn dz_dy(&self) -> f32 {
        if self.normal.z == 0.0 {
            0.0
        } else {
            -self.normal.y / self.normal.z
        }
    }
}

/// A triangle ready for rasterization in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenTriangle {
    /// Integer pixel positions in x/y, NDC depth in z.
    pub points: [Vec3; 3],
    /// `1/z` per vertex.
    pub inv_z: [f32; 3],
    /// Twice the signed area, `edge_function(p0, p1, p2)`. Never zero.
    pub area: f32,
    /// Bounding rectangle clamped to the target.
    pub rect: PixelRect,
    /// Nearest vertex depth.
    pub min_z: f32,
    pub plane: Plane,
    /// Index into the per-triangle color table.
    pub color_index: usize,
}

/// Outcome of triangle setup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Setup {
    Ready(ScreenTriangle),
    BackFacing,
    OffScreen,
    /// Zero signed area after snapping to pixels.
    Degenerate,
}

#[inline]
pub fn edge_function(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (p.x - a.x) * (b.y - a.y) - (p.y - a.y) * (b.x - a.x)
}

/// Edge weights of `p`, or `None` if it lies outside the triangle.
///
/// Only a mix of strictly negative and strictly positive weights rejects, so
/// pixels on an edge belong to the triangle regardless of winding.
#[inline]
pub fn inside_weights(v0: Vec3, v1: Vec3, v2: Vec3, p: Vec3) -> Option<[f32; 3]> {
    let w0 = edge_function(v1, v2, p);
    let w1 = edge_function(v2, v0, p);
    let w2 = edge_function(v0, v1, p);

    let has_neg = w0 < 0.0 || w1 < 0.0 || w2 < 0.0;
    let has_pos = w0 > 0.0 || w1 > 0.0 || w2 > 0.0;
    if has_neg && has_pos {
        None
    } else {
        Some([w0, w1, w2])
    }
}

/// Counter-clockwise in y-up NDC is front-facing.
#[inline]
pub fn is_back_facing(ndc: &[Vec3; 3]) -> bool {
    let normal = (ndc[1] - ndc[0]).cross(ndc[2] - ndc[0]);
    normal.z < 0.0
}

/// Map an NDC coordinate in `[-1, 1]` onto `[0, extent)` pixels, floored.
#[inline]
pub fn ndc_to_pixel(v: f32, extent: usize) -> f32 {
    ((v * 0.5 + 0.5) * extent as f32).floor()
}

/// Clamp a floored pixel span to `[0, extent)`, or `None` if it misses
/// entirely.
#[inline]
pub fn clamp_span(min: f32, max: f32, extent: usize) -> Option<(usize, usize)> {
    if extent == 0 || max < 0.0 || min >= extent as f32 || min.is_nan() || max.is_nan() {
        return None;
    }
    let last = (extent - 1) as f32;
    Some((min.clamp(0.0, last) as usize, max.clamp(0.0, last) as usize))
}

/// Back-face cull, snap to pixels and precompute everything the rasterizer
/// needs for one NDC triangle.
pub fn setup_triangle(ndc: [Vec3; 3], color_index: usize, width: usize, height: usize) -> Setup {
    if is_back_facing(&ndc) {
        return Setup::BackFacing;
    }

    let points = ndc.map(|v| Vec3::new(ndc_to_pixel(v.x, width), ndc_to_pixel(v.y, height), v.z));
    let min = points[0].min(points[1]).min(points[2]);
    let max = points[0].max(points[1]).max(points[2]);

    let (Some((x_min, x_max)), Some((y_min, y_max))) =
        (clamp_span(min.x, max.x, width), clamp_span(min.y, max.y, height))
    else {
        return Setup::OffScreen;
    };

    let area = edge_function(points[0], points[1], points[2]);
    if area == 0.0 {
        return Setup::Degenerate;
    }

    Setup::Ready(ScreenTriangle {
        points,
        inv_z: ndc.map(|v| 1.0 / v.z),
        area,
        rect: PixelRect::new(x_min, x_max, y_min, y_max),
        min_z: min.z,
        plane: Plane::through(points[0], points[1], points[2]),
        color_index,
    })
}

/// Fill `tri` into `target`, depth-testing against `depth`.
///
/// Returns the number of pixels written.
pub fn rasterize<D, T>(tri: &ScreenTriangle, depth: &mut D, target: &mut T, color: Color) -> usize
where
    D: DepthStore + ?Sized,
    T: PixelTarget + ?Sized,
{
    let [v0, v1, v2] = tri.points;
    let [iz0, iz1, iz2] = tri.inv_z;
    let inv_area = 1.0 / tri.area;
    let rect = tri.rect;
    let mut written = 0;

    for y in rect.y_min..=rect.y_max {
        for x in rect.x_min..=rect.x_max {
            let p = Vec3::new(x as f32, y as f32, 0.0);
            let Some([w0, w1, w2]) = inside_weights(v0, v1, v2, p) else {
                continue;
            };

            let z = 1.0 / ((w0 * iz0 + w1 * iz1 + w2 * iz2) * inv_area);
            if !(0.0..=1.0).contains(&z) {
                continue;
            }

            if z < depth.depth(x, y) {
                depth.store(x, y, z);
                target.set_pixel(x as i32, y as i32, color);
                written += 1;
            }
        }
    }
    written
}

//! Projection parameters.
//!
//! The [`Projection`] enum is the single source of truth for how view space
//! maps to NDC. Both variants produce NDC depth in `[0, 1]`, which is the range
//! the depth buffers are cleared to and tested against.

use crate::math::Mat4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        /// Width divided by height.
        aspect_ratio: f32,
        z_near: f32,
        z_far: f32,
    },
    Orthographic {
        /// Half the visible height in view units.
        half_height: f32,
        aspect_ratio: f32,
        z_near: f32,
        z_far: f32,
    },
}

impl Projection {
    /// Perspective projection from a field of view in degrees.
    pub fn perspective_degrees(fov_y_degrees: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect_ratio,
            z_near,
            z_far,
        }
    }

    pub fn orthographic(half_height: f32, aspect_ratio: f32, z_near: f32, z_far: f32) -> Self {
        Projection::Orthographic {
            half_height,
            aspect_ratio,
            z_near,
            z_far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect_ratio,
                z_near,
                z_far,
            } => Mat4::perspective_rh(fov_y, aspect_ratio, z_near, z_far),
            Projection::Orthographic {
                half_height,
                aspect_ratio,
                z_near,
                z_far,
            } => {
                let half_width = half_height * aspect_ratio;
                Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, z_near, z_far)
            }
        }
    }
}

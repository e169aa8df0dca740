//! A CPU software rasterizer with hierarchical depth and octree occlusion
//! culling.
//!
//! Meshes are drawn as flat-colored triangles into any [`PixelTarget`]. Five
//! interchangeable depth strategies resolve visibility, from a plain Z-buffer
//! up to an octree walk that skips whole regions of a mesh hidden behind what
//! is already drawn.
//!
//! # Quick Start
//!
//! ```no_run
//! use hizraster::prelude::*;
//!
//! let (width, height) = (640, 480);
//! let mesh = Mesh::cube();
//! let colors = DirectionalLight::new(Vec3::new(-0.3, -0.5, -1.0)).face_colors(&mesh, Color::WHITE);
//!
//! let projection = Projection::perspective_degrees(60.0, width as f32 / height as f32, 0.1, 100.0);
//! let view = Mat4::look_at_rh(Vec3::new(3.0, 2.0, 4.0), Vec3::ZERO, Vec3::UP);
//! let mvp = projection.matrix() * view;
//!
//! let mut image = Image::new(width, height);
//! let mut renderer = create_renderer(DepthAlgorithm::Octree, width as usize, height as usize);
//! renderer.clear_depth();
//! let stats = renderer.draw_mesh(&mesh, &colors, &mvp, &mut image, &DrawOptions::default());
//! println!("{stats}");
//! image.save_png("cube.png").unwrap();
//! ```

pub mod color;
pub mod depth;
pub mod light;
pub mod math;
pub mod mesh;
pub mod octree;
pub mod projection;
pub mod render;
pub mod target;

pub use color::Color;
pub use mesh::{LoadError, Mesh};
pub use projection::Projection;
pub use render::{create_renderer, DepthAlgorithm, DepthRenderer, DrawOptions, FrameStats};
pub use target::{Image, PixelTarget};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use hizraster::prelude::*;
/// ```
pub mod prelude {
    // Math
    pub use crate::math::{Mat4, Vec3, Vec4};

    // Scene
    pub use crate::color::Color;
    pub use crate::light::DirectionalLight;
    pub use crate::mesh::{LoadError, Mesh};
    pub use crate::projection::Projection;

    // Output
    pub use crate::target::{Image, PixelTarget};

    // Rendering
    pub use crate::render::{
        create_renderer, DepthAlgorithm, DepthRenderer, DrawOptions, FrameStats, HierarchicalRenderer,
        OcclusionRenderer, ScanlineRenderer, SimpleRenderer,
    };
}

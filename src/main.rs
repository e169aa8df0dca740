//! Renders a block of mesh instances with each depth strategy and writes one
//! PNG per strategy.
//!
//! ```text
//! hizraster [model.obj|cube|sphere] [all|simple|scanline|hiez|octz|octzf] [grid] [layers] [p|o] [frames] [octree]
//! ```
//!
//! `grid`×`grid` instances are drawn per layer, `layers` layers recede from
//! the camera (default 3 and 1). `p` or `o` picks a perspective or
//! orthographic camera. Every strategy renders `frames` frames (default 3);
//! the statistics of the last one are logged.
//!
//! Logging goes through `env_logger`; set `RUST_LOG=info` (or `debug`) to see
//! timings and statistics.

use std::env;
use std::time::Instant;

use hizraster::prelude::*;
use log::{info, warn};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

fn load_mesh(arg: Option<&str>) -> Result<Mesh, String> {
    match arg {
        None | Some("cube") => Ok(Mesh::cube()),
        Some("sphere") => Ok(Mesh::uv_sphere(32, 64)),
        Some(path) => Mesh::from_obj(path).map_err(|e| format!("{path}: {e}")),
    }
}

fn parse_algorithms(arg: Option<&str>) -> Result<Vec<DepthAlgorithm>, String> {
    match arg {
        None | Some("all") => Ok(DepthAlgorithm::ALL.to_vec()),
        Some(name) => name.parse::<DepthAlgorithm>().map(|a| vec![a]).map_err(|e| e.to_string()),
    }
}

fn parse_count(arg: Option<&str>, what: &str, default: usize) -> Result<usize, String> {
    let Some(arg) = arg else {
        return Ok(default);
    };
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{what} must be a positive integer, got `{arg}`")),
    }
}

/// `true` for an orthographic camera.
fn parse_orthographic(arg: Option<&str>) -> Result<bool, String> {
    match arg {
        None | Some("p") => Ok(false),
        Some("o") => Ok(true),
        Some(other) => Err(format!("projection must be `p` or `o`, got `{other}`")),
    }
}

/// `grid`×`grid` instances per layer, `layers` layers receding in depth, and
/// a camera in front of the block looking down its middle.
fn layout(mesh: &Mesh, grid: usize, layers: usize, orthographic: bool) -> (Vec<Mat4>, Mat4) {
    let (min, max) = mesh.bounds();
    let center = mesh.center();
    let radius = ((max - min) * 0.5).magnitude().max(f32::EPSILON);
    let spacing = 2.5 * radius;
    let half = (grid as f32 - 1.0) * 0.5;

    let mut models = Vec::with_capacity(grid * grid * layers);
    for layer in 0..layers {
        for row in 0..grid {
            for col in 0..grid {
                let turn = models.len() as f32 * 0.35;
                models.push(
                    Mat4::translation(
                        (col as f32 - half) * spacing,
                        (row as f32 - half) * spacing,
                        -(layer as f32) * spacing,
                    ) * Mat4::rotation_y(turn)
                        * Mat4::rotation_x(0.4)
                        * Mat4::translation(-center.x, -center.y, -center.z),
                );
            }
        }
    }

    // Half the height of the block's front face.
    let extent = half * spacing + radius;
    let depth = (layers as f32 - 1.0) * spacing;
    let eye = Vec3::new(0.0, 0.2 * extent, radius + 1.8 * extent);
    let target = Vec3::new(0.0, 0.0, -0.5 * depth);
    let (z_near, z_far) = (0.1 * radius, eye.z + depth + 2.0 * radius);
    let aspect_ratio = WIDTH as f32 / HEIGHT as f32;

    let projection = if orthographic {
        Projection::orthographic(1.1 * extent, aspect_ratio, z_near, z_far)
    } else {
        Projection::perspective_degrees(60.0, aspect_ratio, z_near, z_far)
    };
    let view_projection = projection.matrix() * Mat4::look_at_rh(eye, target, Vec3::UP);
    (models, view_projection)
}

fn main() -> Result<(), String> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let arg = |i: usize| args.get(i).map(String::as_str);

    let mesh = load_mesh(arg(0))?;
    let algorithms = parse_algorithms(arg(1))?;
    let grid = parse_count(arg(2), "grid size", 3)?;
    let layers = parse_count(arg(3), "layer count", 1)?;
    let orthographic = parse_orthographic(arg(4))?;
    let frames = parse_count(arg(5), "frame count", 3)?;
    let options = match arg(6) {
        Some("octree") => DrawOptions::default().with_octree(Color::GREEN),
        Some(other) => {
            warn!("ignoring unknown option `{other}`");
            DrawOptions::default()
        }
        None => DrawOptions::default(),
    };

    let colors = DirectionalLight::new(Vec3::new(-0.4, -0.6, -1.0)).face_colors(&mesh, Color::new(0.9, 0.7, 0.4));
    let (models, view_projection) = layout(&mesh, grid, layers, orthographic);
    info!(
        "{}: {} triangles, {} instances, {}x{}, {} projection",
        mesh.name(),
        mesh.triangle_count(),
        models.len(),
        WIDTH,
        HEIGHT,
        if orthographic { "orthographic" } else { "perspective" }
    );

    for algorithm in algorithms {
        let mut renderer = create_renderer(algorithm, WIDTH as usize, HEIGHT as usize);
        let mut image = Image::new(WIDTH, HEIGHT);

        let start = Instant::now();
        for frame in 0..frames {
            image.fill(Color::BACKGROUND);
            renderer.clear_depth();

            let frame_start = Instant::now();
            let mut stats = FrameStats::default();
            for (slot, model) in models.iter().enumerate() {
                let mvp = view_projection * *model;
                stats += renderer.draw_mesh(&mesh, &colors, &mvp, &mut image, &options.with_slot(slot));
            }
            info!("{algorithm} frame {frame}: {:.2?}", frame_start.elapsed());
            if frame + 1 == frames {
                info!("{algorithm}: {stats}");
            }
        }
        info!("{algorithm}: {frames} frames in {:.2?}", start.elapsed());

        let path = format!("{algorithm}.png");
        image.save_png(&path).map_err(|e| format!("{path}: {e}"))?;
        info!("wrote {path}");
    }
    Ok(())
}

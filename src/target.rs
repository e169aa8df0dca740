//! Render targets.
//!
//! The renderers only ever write pixels; they never read them back. Anything
//! that can accept a colored pixel at integer coordinates can be a target, which
//! is what [`PixelTarget`] captures. [`Image`] is the standard RGB8 target and
//! can be written out as PNG.
//!
//! Pixel space has its origin at the bottom-left corner with `y` pointing up,
//! matching NDC. [`Image`] flips rows when storing so the saved picture is
//! upright.

use std::path::Path;

use image::{ImageError, RgbImage};

use crate::color::Color;

/// Something the renderers can draw into.
pub trait PixelTarget {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Write one pixel. Out-of-bounds coordinates are silently ignored.
    fn set_pixel(&mut self, x: i32, y: i32, color: Color);

    /// Draws a line between two points using Bresenham's line algorithm.
    ///
    /// Bresenham's algorithm efficiently determines which pixels to illuminate
    /// by using only integer arithmetic. It tracks an error term representing
    /// the distance between the ideal line and the current pixel, and steps
    /// diagonally whenever that error crosses a threshold.
    ///
    /// The line is clipped to the target first, so endpoints far outside it
    /// cost nothing.
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Color) {
        let Some(((x0, y0), (x1, y1))) =
            clip_segment((x0 as f64, y0 as f64), (x1 as f64, y1 as f64), self.width(), self.height())
        else {
            return;
        };
        let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);

        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let x_step = if x0 < x1 { 1 } else { -1 };
        let y_step = if y0 < y1 { 1 } else { -1 };

        // Positive error favors x movement, negative favors y.
        let mut err = dx - dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            self.set_pixel(x as i32, y as i32, color);
            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += x_step;
            }
            if e2 < dx {
                err += dx;
                y += y_step;
            }
        }
    }
}

/// Clip the segment `a`-`b` to the pixel rectangle of a `width`×`height`
/// target (Liang-Barsky) and round the result to pixels.
///
/// `None` if nothing of the segment is on the target or a coordinate is not
/// finite. Segments already inside come back unchanged.
pub fn clip_segment(a: (f64, f64), b: (f64, f64), width: u32, height: u32) -> Option<((i32, i32), (i32, i32))> {
    if width == 0 || height == 0 || ![a.0, a.1, b.0, b.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (x_max, y_max) = (f64::from(width - 1), f64::from(height - 1));
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);

    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, a.0), (dx, x_max - a.0), (-dy, a.1), (dy, y_max - a.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }

    let at = |t: f64| {
        (
            (a.0 + t * dx).round().clamp(0.0, x_max) as i32,
            (a.1 + t * dy).round().clamp(0.0, y_max) as i32,
        )
    };
    Some((at(t0), at(t1)))
}

/// An RGB8 image.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Image {
    const CHANNELS: usize = 3;

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize * Self::CHANNELS],
            width,
            height,
        }
    }

    pub fn fill(&mut self, color: Color) {
        let rgb = color.to_rgb8();
        for px in self.data.chunks_exact_mut(Self::CHANNELS) {
            px.copy_from_slice(&rgb);
        }
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let row = (self.height as i32 - 1 - y) as usize;
        Some((row * self.width as usize + x as usize) * Self::CHANNELS)
    }

    /// Get the color at (x, y) in pixel space, or None if out of bounds.
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 3]> {
        self.offset(x, y)
            .map(|o| [self.data[o], self.data[o + 1], self.data[o + 2]])
    }

    /// Raw RGB8 bytes, top row first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Encode the image as PNG.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        self.to_rgb_image().save(path)
    }
}

impl PixelTarget for Image {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(o) = self.offset(x, y) {
            self.data[o..o + Self::CHANNELS].copy_from_slice(&color.to_rgb8());
        }
    }
}

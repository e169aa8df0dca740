//! Hierarchical Z-buffer.
//!
//! Level 0 is the full-resolution depth buffer and the only ground truth.
//! Level `k` is `floor(w / 2^k) × floor(h / 2^k)` texels, and every coarse
//! texel holds the **maximum** (farthest) of the four texels below it. A
//! coarse texel is therefore a conservative bound: nothing inside its
//! footprint is farther than the stored value, so a primitive whose nearest
//! depth is beyond it cannot pass a single per-pixel depth test there.
//!
//! Coarse levels are kept consistent on every [`DepthPyramid::write`]:
//!
//! ```text
//! level 2   [ max ]
//!            /   \
//! level 1  [a b] [..]        a = max(p, q, r, s)
//!          [c d]
//!           |
//! level 0  [p q]  <- write
//!          [r s]
//! ```
//!
//! If the written value is larger than the parent it simply raises the parent
//! and continues upward. Otherwise the parent's maximum may have come from the
//! texel that was just lowered, so the four children are re-read; propagation
//! stops as soon as a parent ends up unchanged. Most writes stop after one or
//! two levels.
//!
//! With odd dimensions the last row/column of a level has no parent; those
//! texels are only represented at finer levels.

use super::{DepthStore, FAR_DEPTH};

/// Inclusive pixel-space rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x_min: usize,
    pub x_max: usize,
    pub y_min: usize,
    pub y_max: usize,
}

impl PixelRect {
    pub fn new(x_min: usize, x_max: usize, y_min: usize, y_max: usize) -> Self {
        debug_assert!(x_min <= x_max && y_min <= y_max);
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// The same rectangle in texel coordinates of pyramid level `level`.
    #[inline]
    fn at_level(&self, level: usize) -> Self {
        Self {
            x_min: self.x_min >> level,
            x_max: self.x_max >> level,
            y_min: self.y_min >> level,
            y_max: self.y_max >> level,
        }
    }
}

#[derive(Clone, Debug)]
struct Level {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl Level {
    #[inline]
    fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Maximum of the 2×2 block whose top-left texel is `(x, y)`.
    #[inline]
    fn max4(&self, x: usize, y: usize) -> f32 {
        let row0 = y * self.width + x;
        let row1 = row0 + self.width;
        self.data[row0]
            .max(self.data[row0 + 1])
            .max(self.data[row1])
            .max(self.data[row1 + 1])
    }

    /// True when the rectangle (already at this level) spans at most 2×2
    /// texels that all exist.
    #[inline]
    fn holds_block(&self, r: &PixelRect) -> bool {
        r.x_max - r.x_min <= 1 && r.y_max - r.y_min <= 1 && r.x_max < self.width && r.y_max < self.height
    }

    /// True when the rectangle (already at this level) falls on one
    /// existing texel.
    #[inline]
    fn holds_texel(&self, r: &PixelRect) -> bool {
        r.x_min == r.x_max && r.y_min == r.y_max && r.x_max < self.width && r.y_max < self.height
    }
}

/// A mip chain of depth buffers with max-reduction.
#[derive(Clone, Debug)]
pub struct DepthPyramid {
    levels: Vec<Level>,
}

impl DepthPyramid {
    pub fn new(width: usize, height: usize) -> Self {
        let mut levels = Vec::new();
        let (mut w, mut h) = (width, height);
        while w > 0 && h > 0 {
            levels.push(Level {
                data: vec![FAR_DEPTH; w * h],
                width: w,
                height: h,
            });
            w /= 2;
            h /= 2;
        }
        Self { levels }
    }

    pub fn width(&self) -> usize {
        self.levels.first().map_or(0, |l| l.width)
    }

    pub fn height(&self) -> usize {
        self.levels.first().map_or(0, |l| l.height)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// `(width, height)` of level `level` in texels.
    pub fn level_size(&self, level: usize) -> (usize, usize) {
        let l = &self.levels[level];
        (l.width, l.height)
    }

    /// All texels of one level, row-major.
    pub fn level_texels(&self, level: usize) -> &[f32] {
        &self.levels[level].data
    }

    /// Set every texel of every level to `z`.
    pub fn clear(&mut self, z: f32) {
        for level in &mut self.levels {
            level.data.fill(z);
        }
    }

    /// Overwrite the level-0 depth at `(x, y)` and bring the coarse levels
    /// back in line.
    ///
    /// This does not compare against the stored value; the depth test is the
    /// caller's job.
    pub fn write(&mut self, x: usize, y: usize, z: f32) {
        debug_assert!(x < self.width() && y < self.height(), "write out of bounds");

        let base = &mut self.levels[0];
        base.data[y * base.width + x] = z;

        let (mut x, mut y) = (x, y);
        let mut value = z;
        for k in 1..self.levels.len() {
            let (cx, cy) = (x >> 1, y >> 1);
            let (finer, coarser) = self.levels.split_at_mut(k);
            let fine = &finer[k - 1];
            let coarse = &mut coarser[0];
            if cx >= coarse.width || cy >= coarse.height {
                // Odd last row/column: no parent.
                return;
            }

            let slot = &mut coarse.data[cy * coarse.width + cx];
            if value > *slot {
                *slot = value;
            } else {
                let max = fine.max4(cx * 2, cy * 2);
                if max == *slot {
                    return;
                }
                *slot = max;
                value = max;
            }
            x = cx;
            y = cy;
        }
    }

    /// The texel of `level` covering base-resolution pixel `(x, y)`.
    #[inline]
    pub fn sample(&self, x: usize, y: usize, level: usize) -> f32 {
        let l = &self.levels[level];
        let (lx, ly) = (x >> level, y >> level);
        debug_assert!(lx < l.width && ly < l.height, "sample out of bounds");
        l.at(lx, ly)
    }

    /// Finest level with a single texel covering all of `rect`.
    ///
    /// One [`sample`](Self::sample) of any pixel of `rect` at that level is
    /// a conservative bound for the whole rectangle. `None` when no texel
    /// covers it, e.g. when it reaches into the parentless last row/column
    /// of an odd-sized level.
    pub fn min_bounding_level(&self, rect: PixelRect) -> Option<usize> {
        self.levels
            .iter()
            .enumerate()
            .find(|(k, level)| level.holds_texel(&rect.at_level(*k)))
            .map(|(k, _)| k)
    }

    /// Finest level at which `rect` lies within a block of at most 2×2
    /// existing texels.
    fn block_level(&self, rect: PixelRect) -> Option<usize> {
        self.levels
            .iter()
            .enumerate()
            .find(|(k, level)| level.holds_block(&rect.at_level(*k)))
            .map(|(k, _)| k)
    }

    /// Conservative farthest depth over `rect`: every level-0 depth inside
    /// the rectangle is `<=` the returned value.
    ///
    /// Reads up to 2×2 texels, one level finer than
    /// [`min_bounding_level`](Self::min_bounding_level) when the rectangle
    /// straddles a texel boundary, so it is never looser than the single
    /// sample there. `None` when no level can bound the rectangle; callers
    /// must then treat the region as potentially visible.
    pub fn depth_bound(&self, rect: PixelRect) -> Option<f32> {
        let k = self.block_level(rect)?;
        let level = &self.levels[k];
        let r = rect.at_level(k);

        let mut bound = f32::NEG_INFINITY;
        for y in r.y_min..=r.y_max {
            for x in r.x_min..=r.x_max {
                bound = bound.max(level.at(x, y));
            }
        }
        Some(bound)
    }
}

impl DepthStore for DepthPyramid {
    #[inline]
    fn depth(&self, x: usize, y: usize) -> f32 {
        self.levels[0].at(x, y)
    }

    #[inline]
    fn store(&mut self, x: usize, y: usize, z: f32) {
        self.write(x, y, z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Every coarse texel equals the max of its four children.
    fn assert_consistent(p: &DepthPyramid) {
        for k in 1..p.level_count() {
            let (w, h) = p.level_size(k);
            let (fw, _) = p.level_size(k - 1);
            let fine = p.level_texels(k - 1);
            let coarse = p.level_texels(k);
            for y in 0..h {
                for x in 0..w {
                    let i = (2 * y) * fw + 2 * x;
                    let expected = fine[i].max(fine[i + 1]).max(fine[i + fw]).max(fine[i + fw + 1]);
                    assert_eq!(coarse[y * w + x], expected, "level {k} texel ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn level_sizes_halve_until_a_dimension_vanishes() {
        let p = DepthPyramid::new(640, 480);
        assert_eq!(p.level_count(), 9);
        assert_eq!(p.level_size(0), (640, 480));
        assert_eq!(p.level_size(6), (10, 7));
        assert_eq!(p.level_size(8), (2, 1));

        let square = DepthPyramid::new(64, 64);
        assert_eq!(square.level_count(), 7);
        assert_eq!(square.level_size(6), (1, 1));
    }

    #[test]
    fn clear_resets_all_levels() {
        let mut p = DepthPyramid::new(16, 8);
        p.write(3, 3, 0.2);
        p.clear(0.7);
        for k in 0..p.level_count() {
            assert!(p.level_texels(k).iter().all(|&z| z == 0.7));
        }
    }

    #[test]
    fn lowering_one_texel_keeps_coarse_levels_far() {
        let mut p = DepthPyramid::new(8, 8);
        p.write(0, 0, 0.3);
        // Three siblings are still at the clear value.
        assert_eq!(p.sample(0, 0, 1), 1.0);
        assert_eq!(p.sample(0, 0, 3), 1.0);

        p.write(1, 0, 0.3);
        p.write(0, 1, 0.4);
        p.write(1, 1, 0.2);
        assert_eq!(p.sample(0, 0, 1), 0.4);
        assert_eq!(p.sample(0, 0, 2), 1.0);
        assert_consistent(&p);
    }

    #[test]
    fn raising_a_texel_raises_ancestors() {
        let mut p = DepthPyramid::new(4, 4);
        p.clear(0.1);
        p.write(2, 3, 0.9);
        assert_eq!(p.sample(2, 3, 1), 0.9);
        assert_eq!(p.sample(0, 0, 2), 0.9);
        // Lowering it again recomputes the true max instead of keeping 0.9.
        p.write(2, 3, 0.5);
        assert_eq!(p.sample(0, 0, 2), 0.5);
        p.write(2, 3, 0.05);
        assert_eq!(p.sample(0, 0, 2), 0.1);
        assert_consistent(&p);
    }

    #[test]
    fn random_writes_keep_invariant() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for &(w, h) in &[(32, 32), (37, 21), (5, 4), (1, 7)] {
            let mut p = DepthPyramid::new(w, h);
            for step in 0..2000 {
                if step % 500 == 499 {
                    p.clear(rng.random_range(0.5..1.0));
                }
                let x = rng.random_range(0..w);
                let y = rng.random_range(0..h);
                let before: Vec<f32> = (0..p.level_count())
                    .filter(|&k| (x >> k) < p.level_size(k).0 && (y >> k) < p.level_size(k).1)
                    .map(|k| p.sample(x, y, k))
                    .collect();
                let old = p.depth(x, y);
                let z: f32 = rng.random_range(0.0..1.0);
                p.write(x, y, z);

                for (k, &prev) in before.iter().enumerate().skip(1) {
                    let now = p.sample(x, y, k);
                    if z > old {
                        assert!(now >= prev, "raising a texel lowered level {k}");
                    } else {
                        assert!(now <= prev, "lowering a texel raised level {k}");
                    }
                }
                if step % 97 == 0 {
                    assert_consistent(&p);
                }
            }
            assert_consistent(&p);
        }
    }

    #[test]
    fn min_bounding_level_picks_finest_covering_texel() {
        let p = DepthPyramid::new(64, 64);
        assert_eq!(p.min_bounding_level(PixelRect::new(10, 10, 20, 20)), Some(0));
        assert_eq!(p.min_bounding_level(PixelRect::new(3, 4, 7, 8)), Some(4));
        assert_eq!(p.min_bounding_level(PixelRect::new(0, 3, 0, 3)), Some(2));
        assert_eq!(p.min_bounding_level(PixelRect::new(0, 7, 2, 5)), Some(3));
        assert_eq!(p.min_bounding_level(PixelRect::new(0, 63, 0, 63)), Some(6));
        assert_eq!(p.min_bounding_level(PixelRect::new(16, 48, 16, 48)), Some(6));
    }

    #[test]
    fn one_sample_at_min_bounding_level_covers_the_rect() {
        let mut p = DepthPyramid::new(64, 64);
        p.clear(0.1);
        p.write(3, 3, 0.9);

        let rect = PixelRect::new(0, 3, 0, 3);
        let level = p.min_bounding_level(rect).unwrap();
        assert_eq!(p.sample(1, 1, level), 0.9);
        assert_eq!(p.depth_bound(rect), Some(0.9));
    }

    #[test]
    fn nothing_bounds_a_rect_over_the_parentless_edge() {
        let p = DepthPyramid::new(5, 4);
        // Column 4 has no parent at level 1, and the rect is 4 rows tall.
        assert_eq!(p.min_bounding_level(PixelRect::new(3, 4, 0, 3)), None);
        assert_eq!(p.depth_bound(PixelRect::new(3, 4, 0, 3)), None);
        // A small rect there is still bounded by a block at level 0.
        assert_eq!(p.min_bounding_level(PixelRect::new(4, 4, 0, 1)), None);
        assert_eq!(p.depth_bound(PixelRect::new(4, 4, 0, 1)), Some(1.0));
    }

    #[test]
    fn depth_bound_never_underestimates() {
        let mut rng = StdRng::seed_from_u64(42);
        let (w, h) = (48, 40);
        let mut p = DepthPyramid::new(w, h);
        for _ in 0..3000 {
            p.write(rng.random_range(0..w), rng.random_range(0..h), rng.random_range(0.0..1.0));
        }
        for _ in 0..2000 {
            let (a, b) = (rng.random_range(0..w), rng.random_range(0..w));
            let (c, d) = (rng.random_range(0..h), rng.random_range(0..h));
            let rect = PixelRect::new(a.min(b), a.max(b), c.min(d), c.max(d));
            let (cx, cy) = ((rect.x_min + rect.x_max) / 2, (rect.y_min + rect.y_max) / 2);
            let sampled = p.min_bounding_level(rect).map(|k| p.sample(cx, cy, k));
            let bound = p.depth_bound(rect);
            if let (Some(sampled), Some(bound)) = (sampled, bound) {
                assert!(bound <= sampled, "{rect:?}: block bound looser than one sample");
            }
            for y in rect.y_min..=rect.y_max {
                for x in rect.x_min..=rect.x_max {
                    let z = p.depth(x, y);
                    if let Some(bound) = bound {
                        assert!(z <= bound, "{rect:?} bound underestimates at ({x}, {y})");
                    }
                    if let Some(sampled) = sampled {
                        assert!(z <= sampled, "{rect:?} sample underestimates at ({x}, {y})");
                    }
                }
            }
        }
    }
}

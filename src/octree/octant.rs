//! Octant classification.
//!
//! A box is compared against a node center on each axis, once for its min
//! corner and once for its max corner. Packing the "above center" bits gives a
//! 6-bit code: the max-corner bits in the high three, the min-corner bits in
//! the low three. The box fits a single child exactly when both halves agree,
//! which a 64-entry table collapses to that child or to `None`.

use crate::math::Vec3;

/// One of the eight children of a node.
///
/// The discriminant is `x << 2 | y << 1 | z`, where a set bit means the upper
/// half of that axis. A set `z` bit is the far half since NDC depth grows
/// away from the viewer, so every near octant is even and its far sibling is
/// the next odd index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Octant {
    LeftBottomNear = 0b000,
    LeftBottomFar = 0b001,
    LeftTopNear = 0b010,
    LeftTopFar = 0b011,
    RightBottomNear = 0b100,
    RightBottomFar = 0b101,
    RightTopNear = 0b110,
    RightTopFar = 0b111,
}

const CLASSIFICATION: [Option<Octant>; 64] = classification_table();

const fn classification_table() -> [Option<Octant>; 64] {
    let mut table = [None; 64];
    let mut i = 0;
    while i < 8 {
        table[(i << 3) | i] = Some(Octant::ALL[i]);
        i += 1;
    }
    table
}

#[inline]
fn above(v: Vec3, center: Vec3) -> usize {
    ((v.x > center.x) as usize) << 2 | ((v.y > center.y) as usize) << 1 | (v.z > center.z) as usize
}

impl Octant {
    /// All octants in index order.
    pub const ALL: [Octant; 8] = [
        Octant::LeftBottomNear,
        Octant::LeftBottomFar,
        Octant::LeftTopNear,
        Octant::LeftTopFar,
        Octant::RightBottomNear,
        Octant::RightBottomFar,
        Octant::RightTopNear,
        Octant::RightTopFar,
    ];

    /// The near half of each near/far pair, in index order.
    pub const NEAR: [Octant; 4] = [
        Octant::LeftBottomNear,
        Octant::LeftTopNear,
        Octant::RightBottomNear,
        Octant::RightTopNear,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn is_far(self) -> bool {
        self as u8 & 1 == 1
    }

    /// The octant sharing this one's x/y footprint on the other side in depth.
    #[inline]
    pub const fn depth_sibling(self) -> Octant {
        Octant::ALL[self as usize ^ 1]
    }

    /// The child that fully contains the box `[min, max]`, or `None` if the
    /// box straddles `center` on any axis.
    ///
    /// A coordinate equal to the center counts as the lower half.
    #[inline]
    pub fn classify(min: Vec3, max: Vec3, center: Vec3) -> Option<Octant> {
        CLASSIFICATION[above(max, center) << 3 | above(min, center)]
    }

    /// Bounds of this child within the parent box `[min, max]` split at
    /// `center`.
    pub fn child_bounds(self, min: Vec3, center: Vec3, max: Vec3) -> (Vec3, Vec3) {
        let i = self as u8;
        let pick = |bit: u8, lo: f32, mid: f32, hi: f32| if i & bit != 0 { (mid, hi) } else { (lo, mid) };
        let (x0, x1) = pick(0b100, min.x, center.x, max.x);
        let (y0, y1) = pick(0b010, min.y, center.y, max.y);
        let (z0, z1) = pick(0b001, min.z, center.z, max.z);
        (Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_only_accepts_agreeing_halves() {
        let valid = CLASSIFICATION.iter().filter(|o| o.is_some()).count();
        assert_eq!(valid, 8);
        for (code, entry) in CLASSIFICATION.iter().enumerate() {
            assert_eq!(entry.is_some(), code >> 3 == code & 7, "code {code:#08b}");
            if let Some(o) = entry {
                assert_eq!(o.index(), code & 7);
            }
        }
    }

    #[test]
    fn classify_fitting_and_straddling_boxes() {
        let c = Vec3::ZERO;
        let near = Octant::classify(Vec3::new(0.1, -0.9, -0.5), Vec3::new(0.4, -0.2, -0.1), c);
        assert_eq!(near, Some(Octant::RightBottomNear));

        let far = Octant::classify(Vec3::new(-0.9, 0.2, 0.3), Vec3::new(-0.1, 0.8, 0.9), c);
        assert_eq!(far, Some(Octant::LeftTopFar));

        // Straddles z.
        assert_eq!(Octant::classify(Vec3::new(0.1, 0.1, -0.1), Vec3::new(0.2, 0.2, 0.1), c), None);
        // Touching the center counts as the lower half.
        assert_eq!(
            Octant::classify(Vec3::new(-0.5, -0.5, -0.5), Vec3::ZERO, c),
            Some(Octant::LeftBottomNear)
        );
    }

    #[test]
    fn near_far_pairs() {
        for near in Octant::NEAR {
            let far = near.depth_sibling();
            assert!(!near.is_far());
            assert!(far.is_far());
            assert_eq!(far.index(), near.index() + 1);
            assert_eq!(far.depth_sibling(), near);
        }
    }

    #[test]
    fn children_tile_the_parent() {
        let min = Vec3::new(-1.0, -2.0, 0.0);
        let max = Vec3::new(1.0, 2.0, 1.0);
        let center = (min + max) * 0.5;
        let mut volume = 0.0;
        for o in Octant::ALL {
            let (lo, hi) = o.child_bounds(min, center, max);
            let size = hi - lo;
            volume += size.x * size.y * size.z;
            let mid = (lo + hi) * 0.5;
            assert_eq!(Octant::classify(mid, mid, center), Some(o));
        }
        assert_eq!(volume, 8.0);
    }
}

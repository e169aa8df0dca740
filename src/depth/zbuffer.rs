use super::DepthStore;

/// A flat depth buffer.
#[derive(Clone, Debug)]
pub struct ZBuffer {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl ZBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![super::FAR_DEPTH; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, z: f32) {
        self.data.fill(z);
    }

    /// One row of depths, `y` in pixel space.
    pub fn row_mut(&mut self, y: usize) -> &mut [f32] {
        debug_assert!(y < self.height);
        &mut self.data[y * self.width..(y + 1) * self.width]
    }
}

impl DepthStore for ZBuffer {
    #[inline]
    fn depth(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x]
    }

    #[inline]
    fn store(&mut self, x: usize, y: usize, z: f32) {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x] = z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_far_and_clears() {
        let mut zb = ZBuffer::new(3, 2);
        assert_eq!(zb.depth(2, 1), 1.0);
        zb.store(2, 1, 0.25);
        assert_eq!(zb.depth(2, 1), 0.25);
        assert_eq!(zb.row_mut(1)[2], 0.25);
        zb.clear(0.5);
        assert_eq!(zb.depth(2, 1), 0.5);
    }
}

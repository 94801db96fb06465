/// Per-pixel world distance written by the perspective renderer.
/// Same dimensions and indexing as the pixel buffer it shadows.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffer {
    depths: Vec<f64>,
    width: u32,
    height: u32,
}

impl DepthBuffer {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            depths: vec![0.0; width as usize * height as usize],
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Depth at (x, y), or None if out of bounds
    #[inline]
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f64> {
        if x < self.width && y < self.height {
            Some(self.depths[x as usize + y as usize * self.width as usize])
        } else {
            None
        }
    }

    #[inline]
    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    #[inline]
    pub fn depths_mut(&mut self) -> &mut [f64] {
        &mut self.depths
    }
}

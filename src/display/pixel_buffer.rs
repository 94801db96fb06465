use super::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::{Error, Result};

/// Pixel value that `composite` treats as "do not draw".
pub const TRANSPARENT: u32 = 0;

// ============================================================================
// Utility Functions
// ============================================================================

/// Pack 8-bit channels into `0x00RRGGBB`
#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Split a packed pixel into (r, g, b). The upper byte is ignored.
#[inline]
pub fn unpack_rgb(color: u32) -> (u8, u8, u8) {
    ((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

// ============================================================================
// PixelBuffer
// ============================================================================

/// Packed 24-bit RGB pixel buffer for software rendering.
/// Every stage of the frame renders into or composites one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Create a new pixel buffer with default resolution
    pub fn new() -> Self {
        Self::with_size(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    /// Create a zero-filled pixel buffer with custom resolution
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![0; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Wrap existing packed pixels. The length must equal `width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        if pixels.len() != width as usize * height as usize {
            return Err(Error::invalid(format!(
                "pixel buffer {}x{} needs {} pixels, got {}",
                width,
                height,
                width as usize * height as usize,
                pixels.len()
            )));
        }
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Check if coordinates are within bounds
    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32
    }

    /// Row-major index of (x, y)
    #[inline]
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        x as usize + y as usize * self.width as usize
    }

    /// Fill every pixel with one packed color
    pub fn clear(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Set a single pixel (bounds checked)
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if self.in_bounds(x, y) {
            let idx = self.pixel_index(x as u32, y as u32);
            self.pixels[idx] = color;
        }
    }

    /// Read a pixel from the buffer (bounds checked)
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<u32> {
        if self.in_bounds(x, y) {
            Some(self.pixels[self.pixel_index(x as u32, y as u32)])
        } else {
            None
        }
    }

    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Raw bytes in native endianness, ready for an `RGB888` texture upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Alpha-keyed copy of `src` onto this buffer with its top-left corner at
    /// (dst_x, dst_y). Source pixels equal to `TRANSPARENT` are skipped and
    /// anything landing outside this buffer is clipped.
    pub fn composite(&mut self, src: &PixelBuffer, dst_x: i32, dst_y: i32) {
        let src_w = src.width() as i32;
        let src_h = src.height() as i32;
        let dst_w = self.width as i32;
        let dst_h = self.height as i32;

        // Whole source off-screen
        if dst_x >= dst_w || dst_y >= dst_h || dst_x + src_w <= 0 || dst_y + src_h <= 0 {
            return;
        }

        let x_start = 0.max(-dst_x);
        let x_end = src_w.min(dst_w - dst_x);

        for sy in 0..src_h {
            let dy = dst_y + sy;
            if dy < 0 || dy >= dst_h {
                continue;
            }

            let src_row = src.pixel_index(0, sy as u32);
            let dst_row = self.pixel_index(0, dy as u32);

            for sx in x_start..x_end {
                let color = src.pixels[src_row + sx as usize];
                if color == TRANSPARENT {
                    continue;
                }
                self.pixels[dst_row + (sx + dst_x) as usize] = color;
            }
        }
    }
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self::new()
    }
}

use super::depth::DepthBuffer;
use crate::display::{pack_rgb, unpack_rgb, PixelBuffer};
use crate::error::{Error, Result};
use rayon::prelude::*;

pub const DEFAULT_FOG_DENSITY: f64 = 2.0;

/// Linear distance fog: a pixel at depth `d` keeps `255 - d * density` out
/// of 255 of its brightness, clamped to [0, 255].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthFogFilter {
    pub density: f64,
    pub parallel: bool,
}

impl DepthFogFilter {
    pub fn new(density: f64) -> Self {
        Self {
            density,
            parallel: false,
        }
    }

    /// Brightness in [0, 255] for a given depth. NaN counts as fully fogged.
    #[inline]
    pub fn brightness(&self, depth: f64) -> f64 {
        let b = 255.0 - depth * self.density;
        if b.is_nan() {
            0.0
        } else {
            b.clamp(0.0, 255.0)
        }
    }

    #[inline]
    fn shade(&self, color: u32, depth: f64) -> u32 {
        let brightness = self.brightness(depth);
        let (r, g, b) = unpack_rgb(color);
        let scale = |c: u8| (c as f64 / 255.0 * brightness) as u8;
        pack_rgb(scale(r), scale(g), scale(b))
    }

    /// Darken `buffer` in place by the matching entries of `depth`
    pub fn apply(&self, buffer: &mut PixelBuffer, depth: &DepthBuffer) -> Result<()> {
        if buffer.width() != depth.width() || buffer.height() != depth.height() {
            return Err(Error::invalid(format!(
                "fog needs matching buffers, got {}x{} pixels and {}x{} depths",
                buffer.width(),
                buffer.height(),
                depth.width(),
                depth.height()
            )));
        }

        let pixels = buffer.pixels_mut();
        let depths = depth.depths();
        if self.parallel {
            pixels
                .par_iter_mut()
                .zip(depths.par_iter())
                .for_each(|(p, &d)| *p = self.shade(*p, d));
        } else {
            for (p, &d) in pixels.iter_mut().zip(depths) {
                *p = self.shade(*p, d);
            }
        }
        Ok(())
    }
}

impl Default for DepthFogFilter {
    fn default() -> Self {
        Self::new(DEFAULT_FOG_DENSITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(color: u32, d: f64) -> u32 {
        let mut buffer = PixelBuffer::with_size(1, 1);
        buffer.set_pixel(0, 0, color);
        let mut depth = DepthBuffer::with_size(1, 1);
        depth.depths_mut()[0] = d;
        DepthFogFilter::default().apply(&mut buffer, &depth).unwrap();
        buffer.pixels()[0]
    }

    #[test]
    fn test_far_pixel_goes_black() {
        // 255 - 200 * 2 = -145, clamped to 0
        assert_eq!(single(0xFFFFFF, 200.0), 0);
        assert_eq!(single(0x80C0FF, 200.0), 0);
    }

    #[test]
    fn test_zero_depth_keeps_color() {
        assert_eq!(single(0x123456, 0.0), 0x123456);
    }

    #[test]
    fn test_negative_depth_clamps_to_full() {
        assert_eq!(single(0xFFFFFF, -50.0), 0xFFFFFF);
    }

    #[test]
    fn test_truncates_channels() {
        // brightness 127.5: 255 -> 127, 101 -> 50
        assert_eq!(single(0xFF6500, 63.75), pack_rgb(127, 50, 0));
    }

    #[test]
    fn test_brightness_monotonic_and_bounded() {
        let fog = DepthFogFilter::default();
        let mut previous = f64::INFINITY;
        for i in -100..400 {
            let b = fog.brightness(i as f64 * 0.5);
            assert!((0.0..=255.0).contains(&b));
            assert!(b <= previous);
            previous = b;
        }
        assert_eq!(fog.brightness(f64::NAN), 0.0);
        assert_eq!(fog.brightness(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut buffer = PixelBuffer::with_size(16, 8);
        let mut depth = DepthBuffer::with_size(16, 8);
        for (i, (p, d)) in buffer
            .pixels_mut()
            .iter_mut()
            .zip(depth.depths_mut())
            .enumerate()
        {
            *p = (i as u32).wrapping_mul(0x9E3779B1) & 0xFFFFFF;
            *d = i as f64;
        }

        let mut sequential = buffer.clone();
        DepthFogFilter::default().apply(&mut sequential, &depth).unwrap();
        let fog = DepthFogFilter {
            parallel: true,
            ..DepthFogFilter::default()
        };
        fog.apply(&mut buffer, &depth).unwrap();
        assert_eq!(buffer, sequential);
    }

    #[test]
    fn test_mismatched_sizes_rejected() {
        let mut buffer = PixelBuffer::with_size(2, 2);
        let depth = DepthBuffer::with_size(3, 2);
        assert!(DepthFogFilter::default().apply(&mut buffer, &depth).is_err());
    }
}

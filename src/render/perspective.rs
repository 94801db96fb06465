//! Perspective Floor Renderer
//!
//! Inverse-perspective raycaster for an infinite floor and ceiling plane.
//! Every screen row maps to one distance ahead of the camera; every column
//! widens that distance sideways. The camera-relative offsets are rotated by
//! the yaw, translated to world space and used to pick a texel from a
//! bitmask-wrapped 16x16 atlas tile.

use super::decoration::DecorationRegion;
use super::depth::DepthBuffer;
use crate::camera::CameraState;
use crate::display::PixelBuffer;
use crate::error::{Error, Result};
use crate::texture::{AtlasTile, TextureAtlas};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Distance from eye level down to the floor plane at `z == 0`
pub const FLOOR_HEIGHT: f64 = 6.0;
/// Distance from eye level up to the ceiling plane at `z == 0`
pub const CEIL_HEIGHT: f64 = 6.0;
/// Depth recorded for the horizon row, where the rays never meet a plane
pub const HORIZON_DEPTH: f64 = 1.0e6;

/// Floor semantics for world -> tile conversion: -0.5 is tile -1, not 0.
/// Out-of-range values saturate and NaN maps to 0.
#[inline]
pub fn tile_index(world: f64) -> i64 {
    world.floor() as i64
}

/// Tunables for a `PerspectiveRenderer`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// Focal length in pixels; `None` uses the buffer height
    pub fov: Option<f64>,
    pub floor_height: f64,
    pub ceil_height: f64,
    /// Atlas tile sampled everywhere a decoration doesn't apply
    pub base_tile: AtlasTile,
    /// Applied in order, later matches win
    pub decorations: Vec<DecorationRegion>,
    /// Render rows on the rayon pool
    pub parallel: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            fov: None,
            floor_height: FLOOR_HEIGHT,
            ceil_height: CEIL_HEIGHT,
            base_tile: AtlasTile::default(),
            decorations: Vec::new(),
            parallel: false,
        }
    }
}

/// Owns the frame it renders plus the matching depth buffer
pub struct PerspectiveRenderer {
    pixels: PixelBuffer,
    depth: DepthBuffer,
    atlas: Arc<TextureAtlas>,
    fov: f64,
    floor_height: f64,
    ceil_height: f64,
    base_tile: AtlasTile,
    decorations: Vec<DecorationRegion>,
    parallel: bool,
}

impl PerspectiveRenderer {
    /// Renderer with default options: fov = height, no decorations
    pub fn new(width: u32, height: u32, atlas: Arc<TextureAtlas>) -> Result<Self> {
        Self::with_options(width, height, atlas, &RendererOptions::default())
    }

    pub fn with_options(
        width: u32,
        height: u32,
        atlas: Arc<TextureAtlas>,
        options: &RendererOptions,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!(
                "renderer size {}x{} must be non-zero",
                width, height
            )));
        }

        let fov = options.fov.unwrap_or(height as f64);
        if !fov.is_finite() || fov <= 0.0 {
            return Err(Error::invalid(format!("fov must be positive, got {}", fov)));
        }
        if !options.floor_height.is_finite() || !options.ceil_height.is_finite() {
            return Err(Error::invalid("floor and ceiling heights must be finite"));
        }
        if !atlas.contains_tile(options.base_tile) {
            return Err(missing_tile(&atlas, options.base_tile));
        }
        check_decorations(&atlas, &options.decorations)?;

        tracing::debug!(
            width,
            height,
            fov,
            decorations = options.decorations.len(),
            parallel = options.parallel,
            "perspective renderer created"
        );

        Ok(Self {
            pixels: PixelBuffer::with_size(width, height),
            depth: DepthBuffer::with_size(width, height),
            atlas,
            fov,
            floor_height: options.floor_height,
            ceil_height: options.ceil_height,
            base_tile: options.base_tile,
            decorations: options.decorations.clone(),
            parallel: options.parallel,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn fov(&self) -> f64 {
        self.fov
    }

    pub fn atlas(&self) -> &Arc<TextureAtlas> {
        &self.atlas
    }

    /// Last rendered frame
    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Depths of the last rendered frame
    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    /// Frame (mutable) and depth together, for in-place post-processing
    pub fn buffers_mut(&mut self) -> (&mut PixelBuffer, &DepthBuffer) {
        (&mut self.pixels, &self.depth)
    }

    pub fn decorations(&self) -> &[DecorationRegion] {
        &self.decorations
    }

    pub fn set_decorations(&mut self, decorations: Vec<DecorationRegion>) -> Result<()> {
        check_decorations(&self.atlas, &decorations)?;
        self.decorations = decorations;
        Ok(())
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    /// Render the floor and ceiling as seen from `camera`
    pub fn render(&mut self, camera: &CameraState) {
        let width = self.pixels.width() as usize;
        let height = self.pixels.height();
        let projection = Projection {
            atlas: &self.atlas,
            decorations: &self.decorations,
            base_tile: self.base_tile,
            fov: self.fov,
            half_w: i64::from(self.pixels.width() / 2),
            half_h: i64::from(height / 2),
            floor_height: self.floor_height,
            ceil_height: self.ceil_height,
            cam_x: camera.x,
            cam_y: camera.y,
            cam_z: camera.z,
            sin: camera.yaw.sin(),
            cos: camera.yaw.cos(),
        };

        let rows = self.pixels.pixels_mut();
        let depths = self.depth.depths_mut();

        if self.parallel {
            rows.par_chunks_mut(width)
                .zip(depths.par_chunks_mut(width))
                .enumerate()
                .for_each(|(y, (row, depth))| projection.render_row(y as u32, row, depth));
        } else {
            for (y, (row, depth)) in rows
                .chunks_mut(width)
                .zip(depths.chunks_mut(width))
                .enumerate()
            {
                projection.render_row(y as u32, row, depth);
            }
        }
    }
}

fn missing_tile(atlas: &TextureAtlas, tile: AtlasTile) -> Error {
    let (cols, rows) = atlas.tile_grid();
    Error::invalid(format!(
        "atlas tile ({}, {}) is outside the {}x{} tile atlas",
        tile.column, tile.row, cols, rows
    ))
}

fn check_decorations(atlas: &TextureAtlas, decorations: &[DecorationRegion]) -> Result<()> {
    match decorations.iter().find(|d| !atlas.contains_tile(d.atlas_tile)) {
        Some(d) => Err(missing_tile(atlas, d.atlas_tile)),
        None => Ok(()),
    }
}

/// Camera snapshot and constants shared read-only by every row
struct Projection<'a> {
    atlas: &'a TextureAtlas,
    decorations: &'a [DecorationRegion],
    base_tile: AtlasTile,
    fov: f64,
    half_w: i64,
    half_h: i64,
    floor_height: f64,
    ceil_height: f64,
    cam_x: f64,
    cam_y: f64,
    cam_z: f64,
    sin: f64,
    cos: f64,
}

impl Projection<'_> {
    /// Distance ahead of the camera for vertical offset `yd`.
    /// None on the horizon or when the camera pose is not finite.
    #[inline]
    fn row_depth(&self, yd: f64) -> Option<f64> {
        let zd = if yd > 0.0 {
            (self.floor_height + self.cam_z) / yd
        } else if yd < 0.0 {
            (self.ceil_height - self.cam_z) / -yd
        } else {
            return None;
        };
        zd.is_finite().then_some(zd)
    }

    fn render_row(&self, y: u32, pixels: &mut [u32], depths: &mut [f64]) {
        let yd = (i64::from(y) - self.half_h) as f64 / self.fov;

        let Some(zd) = self.row_depth(yd) else {
            pixels.fill(0);
            depths.fill(HORIZON_DEPTH);
            return;
        };

        for (x, (pixel, depth)) in pixels.iter_mut().zip(depths.iter_mut()).enumerate() {
            let xd = (x as i64 - self.half_w) as f64 / self.fov * zd;

            let world_x = xd * self.cos - zd * self.sin + self.cam_x;
            let world_y = xd * self.sin + zd * self.cos + self.cam_y;
            let tx = tile_index(world_x);
            let ty = tile_index(world_y);

            let mut color = self.atlas.sample_tile(self.base_tile, tx, ty);
            for region in self.decorations {
                if region.applies_to_row(yd) && region.contains(xd, zd) {
                    color = self.atlas.sample_tile(region.atlas_tile, tx, ty);
                }
            }

            *pixel = color;
            *depth = zd;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Surface;
    use std::f64::consts::FRAC_PI_2;

    /// Every texel unique: pixel i holds i + 1
    fn numbered_atlas(tiles: u32) -> Arc<TextureAtlas> {
        let (w, h) = (16 * tiles, 16);
        let pixels = (1..=w * h).collect();
        Arc::new(TextureAtlas::from_pixels(w, h, pixels).unwrap())
    }

    fn atlas_pixel(atlas: &TextureAtlas, x: u32, y: u32) -> u32 {
        atlas.pixels()[(x + y * atlas.width()) as usize]
    }

    /// 1x4 renderer, fov 4: row 3 has yd = 0.25, row 2 is the horizon
    fn column_renderer(atlas: Arc<TextureAtlas>) -> PerspectiveRenderer {
        PerspectiveRenderer::new(1, 4, atlas).unwrap()
    }

    #[test]
    fn test_tile_index_floors() {
        assert_eq!(tile_index(-0.5), -1);
        assert_eq!(tile_index(0.5), 0);
        assert_eq!(tile_index(-16.0), -16);
        assert_eq!(tile_index(-16.0001), -17);
        assert_eq!(tile_index(f64::NAN), 0);
        assert_eq!(tile_index(f64::INFINITY), i64::MAX);
    }

    #[test]
    fn test_floor_ray_samples_left_tile() {
        let atlas = numbered_atlas(2);
        let mut renderer = column_renderer(atlas.clone());
        // z = -2: zd = (6 - 2) / 0.25 = 16, world (0, 16) wraps to texel (0, 0)
        renderer.render(&CameraState::new(0.0, 0.0, -2.0, 0.0));

        assert_eq!(renderer.depth().depth_at(0, 3), Some(16.0));
        assert_eq!(renderer.pixels().get_pixel(0, 3), Some(atlas_pixel(&atlas, 0, 0)));
        assert_ne!(renderer.pixels().get_pixel(0, 3), Some(atlas_pixel(&atlas, 16, 0)));
    }

    #[test]
    fn test_ceiling_depth_uses_ceiling_height() {
        let atlas = numbered_atlas(1);
        let mut renderer = column_renderer(atlas);
        renderer.render(&CameraState::new(0.0, 0.0, 2.0, 0.0));
        // Row 0: yd = -0.5, zd = (6 - 2) / 0.5
        assert_eq!(renderer.depth().depth_at(0, 0), Some(8.0));
        // Row 3: yd = 0.25, zd = (6 + 2) / 0.25
        assert_eq!(renderer.depth().depth_at(0, 3), Some(32.0));
    }

    #[test]
    fn test_horizon_row_is_finite_and_blank() {
        let atlas = numbered_atlas(1);
        let mut renderer = PerspectiveRenderer::new(8, 8, atlas).unwrap();
        renderer.render(&CameraState::default());

        assert!(renderer.depth().depths().iter().all(|d| d.is_finite()));
        for x in 0..8 {
            assert_eq!(renderer.depth().depth_at(x, 4), Some(HORIZON_DEPTH));
            assert_eq!(renderer.pixels().get_pixel(x as i32, 4), Some(0));
        }
    }

    #[test]
    fn test_negative_world_coordinate_floors() {
        let atlas = numbered_atlas(1);
        let mut renderer = column_renderer(atlas.clone());
        // zd = 12; world (-0.5, 12) is tile (-1, 12), texel (15, 12)
        renderer.render(&CameraState::new(-0.5, 0.0, -3.0, 0.0));
        assert_eq!(renderer.pixels().get_pixel(0, 3), Some(atlas_pixel(&atlas, 15, 12)));
    }

    #[test]
    fn test_yaw_rotates_world_coordinates() {
        let atlas = numbered_atlas(1);
        let mut renderer = column_renderer(atlas.clone());
        // Quarter turn: the forward ray points down -x, world (-12, ~0)
        renderer.render(&CameraState::new(0.0, 0.0, -3.0, FRAC_PI_2));
        assert_eq!(renderer.pixels().get_pixel(0, 3), Some(atlas_pixel(&atlas, 4, 0)));
    }

    #[test]
    fn test_perspective_widens_with_distance() {
        let atlas = numbered_atlas(1);
        let mut renderer = PerspectiveRenderer::new(8, 8, atlas).unwrap();
        renderer.render(&CameraState::new(0.0, 0.0, 0.0, 0.0));
        // Row 7 (yd = 3/8) is nearer than row 5 (yd = 1/8)
        let near = renderer.depth().depth_at(0, 7).unwrap();
        let far = renderer.depth().depth_at(0, 5).unwrap();
        assert!(near < far);
        assert_eq!(far, 48.0);
    }

    #[test]
    fn test_decoration_replaces_floor_texel() {
        let atlas = numbered_atlas(2);
        let options = RendererOptions {
            decorations: vec![DecorationRegion::new(0, 0, Surface::Floor)],
            ..RendererOptions::default()
        };
        let mut renderer =
            PerspectiveRenderer::with_options(1, 4, atlas.clone(), &options).unwrap();
        // zd = 12 lies in [0, 16): texel (0, 12) of the right-hand tile
        renderer.render(&CameraState::new(0.0, 0.0, -3.0, 0.0));
        assert_eq!(renderer.pixels().get_pixel(0, 3), Some(atlas_pixel(&atlas, 16, 12)));
    }

    #[test]
    fn test_decoration_respects_surface() {
        let atlas = numbered_atlas(2);
        // Camera at z = 0: ceiling row 1 (yd = -0.25) has zd = 24, floor row 3 has zd = 24
        let cam = CameraState::new(0.0, 0.0, 0.0, 0.0);
        let base = atlas_pixel(&atlas, 0, 8);
        let decorated = atlas_pixel(&atlas, 16, 8);

        for (surface, ceiling, floor) in [
            (Surface::Floor, base, decorated),
            (Surface::Ceiling, decorated, base),
            (Surface::Both, decorated, decorated),
        ] {
            let options = RendererOptions {
                decorations: vec![DecorationRegion::new(0, 1, surface)],
                ..RendererOptions::default()
            };
            let mut renderer =
                PerspectiveRenderer::with_options(1, 4, atlas.clone(), &options).unwrap();
            renderer.render(&cam);
            assert_eq!(renderer.pixels().get_pixel(0, 1), Some(ceiling), "{:?}", surface);
            assert_eq!(renderer.pixels().get_pixel(0, 3), Some(floor), "{:?}", surface);
        }
    }

    #[test]
    fn test_decorations_last_match_wins() {
        let atlas = numbered_atlas(3);
        let options = RendererOptions {
            decorations: vec![
                DecorationRegion::new(0, 0, Surface::Floor).with_atlas_tile(AtlasTile::new(1, 0)),
                DecorationRegion::new(0, 0, Surface::Both).with_atlas_tile(AtlasTile::new(2, 0)),
            ],
            ..RendererOptions::default()
        };
        let mut renderer =
            PerspectiveRenderer::with_options(1, 4, atlas.clone(), &options).unwrap();
        renderer.render(&CameraState::new(0.0, 0.0, -3.0, 0.0));
        assert_eq!(renderer.pixels().get_pixel(0, 3), Some(atlas_pixel(&atlas, 32, 12)));
    }

    #[test]
    fn test_rejects_missing_tiles_and_bad_fov() {
        let atlas = numbered_atlas(1);
        let options = RendererOptions {
            decorations: DecorationRegion::default_layout(),
            ..RendererOptions::default()
        };
        assert!(matches!(
            PerspectiveRenderer::with_options(4, 4, atlas.clone(), &options),
            Err(Error::InvalidConfiguration(_))
        ));

        for fov in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let options = RendererOptions {
                fov: Some(fov),
                ..RendererOptions::default()
            };
            assert!(PerspectiveRenderer::with_options(4, 4, atlas.clone(), &options).is_err());
        }
        assert!(PerspectiveRenderer::new(0, 4, atlas.clone()).is_err());

        let mut renderer = PerspectiveRenderer::new(4, 4, atlas).unwrap();
        assert!(renderer.set_decorations(DecorationRegion::default_layout()).is_err());
        assert!(renderer.decorations().is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let atlas = Arc::new(TextureAtlas::procedural());
        let options = RendererOptions {
            decorations: DecorationRegion::default_layout(),
            ..RendererOptions::default()
        };
        let mut sequential =
            PerspectiveRenderer::with_options(64, 48, atlas.clone(), &options).unwrap();
        let mut parallel = PerspectiveRenderer::with_options(64, 48, atlas, &options).unwrap();
        parallel.set_parallel(true);

        let cam = CameraState::new(3.7, -12.25, 1.5, 0.8);
        sequential.render(&cam);
        parallel.render(&cam);

        assert_eq!(sequential.pixels(), parallel.pixels());
        assert_eq!(sequential.depth(), parallel.depth());
    }

    #[test]
    fn test_non_finite_camera_never_reaches_buffers() {
        let atlas = numbered_atlas(1);
        let mut renderer = PerspectiveRenderer::new(8, 8, atlas).unwrap();
        renderer.render(&CameraState::new(f64::NAN, 0.0, f64::NAN, 0.0));
        assert!(renderer.depth().depths().iter().all(|d| d.is_finite()));
    }
}

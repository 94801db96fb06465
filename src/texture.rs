//! Texture Atlas
//!
//! Decoded RGB texture split into 16x16 tiles. Loading, validation and
//! bitmask-wrapped tile sampling, plus a couple of procedural atlases.

use crate::display::pack_rgb;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Edge length of one atlas tile. Must stay a power of two for the wrap mask.
pub const TILE_SIZE: u32 = 16;
const TILE_MASK: i64 = TILE_SIZE as i64 - 1;

/// Column/row of a 16x16 tile inside the atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasTile {
    pub column: u32,
    pub row: u32,
}

impl AtlasTile {
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

impl Default for AtlasTile {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Immutable packed-RGB texture whose dimensions are multiples of `TILE_SIZE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureAtlas {
    width: u32,
    height: u32,
    pixels: Vec<u32>, // 0x00RRGGBB
}

impl TextureAtlas {
    /// Build an atlas from packed pixels. The alpha byte is stripped.
    pub fn from_pixels(width: u32, height: u32, mut pixels: Vec<u32>) -> Result<Self> {
        validate_dimensions(width, height)?;
        if pixels.len() != width as usize * height as usize {
            return Err(Error::invalid(format!(
                "atlas {}x{} needs {} pixels, got {}",
                width,
                height,
                width as usize * height as usize,
                pixels.len()
            )));
        }
        for p in &mut pixels {
            *p &= 0x00FF_FFFF;
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Load and decode an image file (png, jpeg, bmp)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let atlas = Self::from_image(&img)?;
        tracing::info!(
            path = %path.display(),
            width = atlas.width,
            height = atlas.height,
            tiles = atlas.tile_count(),
            "loaded texture atlas"
        );
        Ok(atlas)
    }

    /// Decode an in-memory image; `name` is only used in error messages
    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self> {
        let img = image::load_from_memory(bytes).map_err(|source| Error::Decode {
            path: PathBuf::from(name),
            source,
        })?;
        Self::from_image(&img)
    }

    fn from_image(img: &image::DynamicImage) -> Result<Self> {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let pixels = rgb.pixels().map(|p| pack_rgb(p[0], p[1], p[2])).collect();
        Self::from_pixels(width, height, pixels)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Tiles per row and per column
    pub fn tile_grid(&self) -> (u32, u32) {
        (self.width / TILE_SIZE, self.height / TILE_SIZE)
    }

    pub fn tile_count(&self) -> u32 {
        let (cols, rows) = self.tile_grid();
        cols * rows
    }

    pub fn contains_tile(&self, tile: AtlasTile) -> bool {
        let (cols, rows) = self.tile_grid();
        tile.column < cols && tile.row < rows
    }

    /// Sample `tile` at world tile indices (tx, ty), wrapped with a bitmask.
    /// Negative indices wrap through two's complement, so -1 maps to texel 15.
    /// `tile` must be inside the atlas.
    #[inline]
    pub fn sample_tile(&self, tile: AtlasTile, tx: i64, ty: i64) -> u32 {
        let x = (tx & TILE_MASK) as usize + (tile.column * TILE_SIZE) as usize;
        let y = (ty & TILE_MASK) as usize + (tile.row * TILE_SIZE) as usize;
        self.pixels[x + y * self.width as usize]
    }
}

fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 || width % TILE_SIZE != 0 || height % TILE_SIZE != 0 {
        return Err(Error::invalid(format!(
            "atlas is {}x{}, dimensions must be non-zero multiples of {}",
            width, height, TILE_SIZE
        )));
    }
    Ok(())
}

// ============================================================================
// Procedural Atlases
// ============================================================================

impl TextureAtlas {
    /// One tile of checkerboard, `check` texels per square
    pub fn checkerboard(check: u32, c1: u32, c2: u32) -> Self {
        let check = check.max(1);
        let (c1, c2) = (c1 & 0x00FF_FFFF, c2 & 0x00FF_FFFF);
        let pixels = (0..TILE_SIZE * TILE_SIZE)
            .map(|i| {
                let (x, y) = (i % TILE_SIZE, i / TILE_SIZE);
                if ((x / check) + (y / check)) % 2 == 0 {
                    c1
                } else {
                    c2
                }
            })
            .collect();
        Self {
            width: TILE_SIZE,
            height: TILE_SIZE,
            pixels,
        }
    }

    /// Two tiles side by side: stone flags on the left, a warm brick
    /// decoration tile on the right
    pub fn procedural() -> Self {
        let width = TILE_SIZE * 2;
        let height = TILE_SIZE;
        let mut pixels = vec![0; (width * height) as usize];

        for y in 0..height {
            for x in 0..TILE_SIZE {
                // Flagstones: 8x8 slabs with dark grout and a per-slab shade
                let grout = x % 8 == 0 || y % 8 == 0;
                let slab = ((x / 8) * 7 + (y / 8) * 13) & 0x1F;
                let v = if grout { 40 } else { 110 + slab as u8 };
                pixels[(x + y * width) as usize] = pack_rgb(v, v, (v as u16 * 9 / 10) as u8);

                // Bricks: 8x4 with half-offset rows
                let row = y / 4;
                let offset = if row % 2 == 0 { 0 } else { 4 };
                let mortar = (x + offset) % 8 == 0 || y % 4 == 0;
                let color = if mortar {
                    pack_rgb(40, 38, 35)
                } else {
                    let brick_id = (row * 13 + ((x + offset) / 8) * 29) & 0x3F;
                    let v = 130 + brick_id as u8;
                    pack_rgb(v, (v as f32 * 0.75) as u8, (v as f32 * 0.55) as u8)
                };
                pixels[(x + TILE_SIZE + y * width) as usize] = color;
            }
        }

        Self {
            width,
            height,
            pixels,
        }
    }
}

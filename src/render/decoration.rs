use crate::texture::AtlasTile;
use serde::{Deserialize, Serialize};

/// Edge length of a decoration region in camera-relative world units
pub const REGION_SIZE: f64 = 16.0;

/// Which half of the view a region paints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Floor,
    Ceiling,
    #[default]
    Both,
}

/// A 16x16 area whose base texture is swapped for another atlas tile.
///
/// Bounds are tested against the unrotated, camera-relative ray offsets
/// (`xd` sideways, `zd` ahead), so a region stays put relative to the view
/// while the textured floor scrolls and turns underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorationRegion {
    /// Region origin in 16-unit steps
    pub tile_x: i32,
    pub tile_y: i32,
    #[serde(default)]
    pub surface: Surface,
    /// Replacement tile; (1, 0) is the tile right of the base tile
    #[serde(default = "default_atlas_tile")]
    pub atlas_tile: AtlasTile,
}

fn default_atlas_tile() -> AtlasTile {
    AtlasTile::new(1, 0)
}

impl DecorationRegion {
    pub fn new(tile_x: i32, tile_y: i32, surface: Surface) -> Self {
        Self {
            tile_x,
            tile_y,
            surface,
            atlas_tile: default_atlas_tile(),
        }
    }

    pub fn with_atlas_tile(mut self, tile: AtlasTile) -> Self {
        self.atlas_tile = tile;
        self
    }

    /// Four regions two to four tiles ahead, just right of the view centre,
    /// on both floor and ceiling.
    pub fn default_layout() -> Vec<Self> {
        [(0, 2), (0, 3), (1, 2), (1, 3)]
            .into_iter()
            .map(|(x, y)| Self::new(x, y, Surface::Both))
            .collect()
    }

    /// Whether the row with vertical offset `yd` is on this region's surface.
    /// The horizon row (`yd == 0`) belongs to neither.
    #[inline]
    pub fn applies_to_row(&self, yd: f64) -> bool {
        match self.surface {
            Surface::Floor => yd > 0.0,
            Surface::Ceiling => yd < 0.0,
            Surface::Both => yd != 0.0,
        }
    }

    /// Half-open bounds test on camera-relative offsets
    #[inline]
    pub fn contains(&self, xd: f64, zd: f64) -> bool {
        let x0 = self.tile_x as f64 * REGION_SIZE;
        let z0 = self.tile_y as f64 * REGION_SIZE;
        xd >= x0 && xd < x0 + REGION_SIZE && zd >= z0 && zd < z0 + REGION_SIZE
    }
}

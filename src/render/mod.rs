//! Floor/ceiling raycasting and its post-process passes

mod decoration;
mod depth;
mod fog;
mod perspective;

pub use decoration::{DecorationRegion, Surface, REGION_SIZE};
pub use depth::DepthBuffer;
pub use fog::{DepthFogFilter, DEFAULT_FOG_DENSITY};
pub use perspective::{
    tile_index, PerspectiveRenderer, RendererOptions, CEIL_HEIGHT, FLOOR_HEIGHT, HORIZON_DEPTH,
};

//! Inverse-perspective floor and ceiling renderer.
//!
//! A `PerspectiveRenderer` raycasts every pixel of its frame onto an infinite
//! floor/ceiling plane, samples a 16x16-tiled `TextureAtlas` and records the
//! distance in a `DepthBuffer`. A `DepthFogFilter` darkens by that distance
//! and a `FrameCompositor` ties it together once per frame, driven by a
//! pluggable `CameraPolicy`.

pub mod camera;
pub mod compositor;
pub mod config;
pub mod display;
pub mod error;
pub mod remote;
pub mod render;
pub mod texture;
pub mod util;

pub use camera::{CameraPolicy, CameraState};
pub use compositor::{FrameCompositor, OffsetAnimation};
pub use config::Settings;
pub use display::PixelBuffer;
pub use error::{Error, Result};
pub use render::{DecorationRegion, DepthBuffer, DepthFogFilter, PerspectiveRenderer, Surface};
pub use texture::{AtlasTile, TextureAtlas, TILE_SIZE};

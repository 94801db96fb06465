//! JSON settings file
//!
//! Everything needed to build a `FrameCompositor`: output size, texture,
//! renderer tunables, fog, camera policy, composite offset and MQTT broker.

use crate::camera::{CameraPolicy, CameraState, ManualControl, Spin, Stationary, Walk};
use crate::compositor::{FrameCompositor, OffsetAnimation};
use crate::display::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::{Error, Result};
use crate::remote::{self, RemoteCamera};
use crate::render::{DecorationRegion, DepthFogFilter, PerspectiveRenderer, RendererOptions};
use crate::texture::TextureAtlas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the atlas comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TextureSource {
    /// Built-in two-tile flagstone/brick atlas
    Procedural,
    /// Built-in single checkerboard tile
    Checkerboard,
    File { path: PathBuf },
}

impl TextureSource {
    pub fn load(&self) -> Result<TextureAtlas> {
        match self {
            Self::Procedural => Ok(TextureAtlas::procedural()),
            Self::Checkerboard => Ok(TextureAtlas::checkerboard(8, 0xE0E0E0, 0x303050)),
            Self::File { path } => TextureAtlas::load(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogSettings {
    pub enabled: bool,
    pub density: f64,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            density: crate::render::DEFAULT_FOG_DENSITY,
        }
    }
}

/// Camera update policy by name, with its parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyKind {
    Stationary,
    Spin { turn_rate: f64 },
    Walk {
        speed: f64,
        turn_rate: f64,
        bob: f64,
    },
    Manual,
    Remote,
}

impl PolicyKind {
    fn is_finite(&self) -> bool {
        match *self {
            Self::Spin { turn_rate } => turn_rate.is_finite(),
            Self::Walk {
                speed,
                turn_rate,
                bob,
            } => speed.is_finite() && turn_rate.is_finite() && bob.is_finite(),
            Self::Stationary | Self::Manual | Self::Remote => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub start: CameraState,
    pub policy: PolicyKind,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            start: CameraState::default(),
            policy: PolicyKind::Stationary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub topic: String,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: remote::DEFAULT_HOST.to_string(),
            port: remote::DEFAULT_PORT,
            topic: remote::DEFAULT_TOPIC.to_string(),
        }
    }
}

/// Top-level settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    /// Window pixels per frame pixel
    pub scale: u32,
    pub vsync: bool,
    pub texture: TextureSource,
    pub renderer: RendererOptions,
    pub fog: FogSettings,
    pub camera: CameraSettings,
    pub offset: OffsetAnimation,
    pub mqtt: MqttSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            scale: 3,
            vsync: true,
            texture: TextureSource::Procedural,
            renderer: RendererOptions {
                decorations: DecorationRegion::default_layout(),
                ..RendererOptions::default()
            },
            fog: FogSettings::default(),
            camera: CameraSettings::default(),
            offset: OffsetAnimation::default(),
            mqtt: MqttSettings::default(),
        }
    }
}

impl Settings {
    /// Plain rotating checkerboard: no texture file, decorations or fog
    pub fn checkerboard() -> Self {
        Self {
            texture: TextureSource::Checkerboard,
            renderer: RendererOptions::default(),
            fog: FogSettings {
                enabled: false,
                ..FogSettings::default()
            },
            camera: CameraSettings {
                start: CameraState::default(),
                policy: PolicyKind::Spin { turn_rate: 0.01 },
            },
            ..Self::default()
        }
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that don't need the atlas; tile references are checked when
    /// the renderer is built.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid(format!(
                "output size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if self.scale == 0 {
            return Err(Error::invalid("scale must be at least 1"));
        }
        if let Some(fov) = self.renderer.fov {
            if !fov.is_finite() || fov <= 0.0 {
                return Err(Error::invalid(format!("fov must be positive, got {}", fov)));
            }
        }
        if !self.fog.density.is_finite() || self.fog.density < 0.0 {
            return Err(Error::invalid(format!(
                "fog density must be non-negative, got {}",
                self.fog.density
            )));
        }
        if !self.camera.policy.is_finite() {
            return Err(Error::invalid("camera policy parameters must be finite"));
        }
        let start = self.camera.start;
        if ![start.x, start.y, start.z, start.yaw].iter().all(|v| v.is_finite()) {
            return Err(Error::invalid("camera start pose must be finite"));
        }
        Ok(())
    }

    pub fn fog_filter(&self) -> Option<DepthFogFilter> {
        self.fog.enabled.then(|| DepthFogFilter {
            density: self.fog.density,
            parallel: self.renderer.parallel,
        })
    }

    /// Build the configured camera policy. `Remote` connects to the broker.
    pub fn camera_policy(&self) -> Result<Box<dyn CameraPolicy>> {
        Ok(match self.camera.policy {
            PolicyKind::Stationary => Box::new(Stationary),
            PolicyKind::Spin { turn_rate } => Box::new(Spin { turn_rate }),
            PolicyKind::Walk {
                speed,
                turn_rate,
                bob,
            } => Box::new(Walk {
                speed,
                turn_rate,
                bob,
            }),
            PolicyKind::Manual => Box::new(self.manual_control()),
            PolicyKind::Remote => Box::new(RemoteCamera::connect(
                &self.mqtt.host,
                self.mqtt.port,
                &self.mqtt.topic,
            )?),
        })
    }

    /// Keyboard policy bounded so the eye stays between floor and ceiling
    pub fn manual_control(&self) -> ManualControl {
        ManualControl::new(self.renderer.floor_height.min(self.renderer.ceil_height))
    }

    /// Load the atlas, build the renderer and wire everything into a compositor
    pub fn build_compositor(&self) -> Result<FrameCompositor> {
        self.validate()?;
        let atlas = Arc::new(self.texture.load()?);
        let renderer =
            PerspectiveRenderer::with_options(self.width, self.height, atlas, &self.renderer)?;
        let policy = self.camera_policy()?;

        tracing::info!(
            width = self.width,
            height = self.height,
            camera = policy.name(),
            fog = self.fog.enabled,
            "compositor ready"
        );

        Ok(
            FrameCompositor::new(self.width, self.height, renderer, self.camera.start, policy)
                .with_fog(self.fog_filter())
                .with_offset(self.offset),
        )
    }
}

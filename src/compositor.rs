//! Frame Compositor
//!
//! Runs one frame end to end: clear, move the camera, raycast, fog, then
//! composite the raycast image into the output buffer handed to the display.

use crate::camera::{CameraPolicy, CameraState};
use crate::display::PixelBuffer;
use crate::error::Result;
use crate::render::{DepthFogFilter, PerspectiveRenderer};
use serde::{Deserialize, Serialize};

/// Where the rendered view lands inside the output buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OffsetAnimation {
    Fixed { x: i32, y: i32 },
    /// Circles around the origin: `(sin(t / period), cos(t / period)) * amplitude`
    Orbit { amplitude: f64, period: f64 },
}

impl OffsetAnimation {
    pub fn at(&self, t: u64) -> (i32, i32) {
        match *self {
            Self::Fixed { x, y } => (x, y),
            Self::Orbit { amplitude, period } => {
                let phase = if period == 0.0 { 0.0 } else { t as f64 / period };
                (
                    (phase.sin() * amplitude) as i32,
                    (phase.cos() * amplitude) as i32,
                )
            }
        }
    }
}

impl Default for OffsetAnimation {
    fn default() -> Self {
        Self::Fixed { x: 0, y: 0 }
    }
}

/// Owns the final output buffer, the renderer and the camera
pub struct FrameCompositor {
    output: PixelBuffer,
    renderer: PerspectiveRenderer,
    camera: CameraState,
    policy: Box<dyn CameraPolicy>,
    fog: Option<DepthFogFilter>,
    offset: OffsetAnimation,
    frame: u64,
}

impl FrameCompositor {
    pub fn new(
        width: u32,
        height: u32,
        renderer: PerspectiveRenderer,
        camera: CameraState,
        policy: Box<dyn CameraPolicy>,
    ) -> Self {
        Self {
            output: PixelBuffer::with_size(width, height),
            renderer,
            camera,
            policy,
            fog: None,
            offset: OffsetAnimation::default(),
            frame: camera.t,
        }
    }

    pub fn with_fog(mut self, fog: Option<DepthFogFilter>) -> Self {
        self.fog = fog;
        self
    }

    pub fn with_offset(mut self, offset: OffsetAnimation) -> Self {
        self.offset = offset;
        self
    }

    /// Produce the next frame and return it, ready to display
    pub fn render_frame(&mut self) -> Result<&PixelBuffer> {
        self.output.clear(0);

        self.frame += 1;
        self.camera = self.policy.update(self.frame, &self.camera);
        self.camera.t = self.frame;

        let camera = self.camera;
        self.renderer.render(&camera);

        if let Some(fog) = &self.fog {
            let (pixels, depth) = self.renderer.buffers_mut();
            fog.apply(pixels, depth)?;
        }

        let (ox, oy) = self.offset.at(self.frame);
        self.output.composite(self.renderer.pixels(), ox, oy);
        Ok(&self.output)
    }

    /// Output of the last `render_frame`
    pub fn output(&self) -> &PixelBuffer {
        &self.output
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: CameraState) {
        self.camera = camera;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn renderer(&self) -> &PerspectiveRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut PerspectiveRenderer {
        &mut self.renderer
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Swap the camera policy, returning the old one
    pub fn set_policy(&mut self, policy: Box<dyn CameraPolicy>) -> Box<dyn CameraPolicy> {
        tracing::debug!(from = self.policy.name(), to = policy.name(), "camera policy changed");
        std::mem::replace(&mut self.policy, policy)
    }

    pub fn policy_mut(&mut self) -> &mut dyn CameraPolicy {
        self.policy.as_mut()
    }

    pub fn fog(&self) -> Option<&DepthFogFilter> {
        self.fog.as_ref()
    }

    pub fn set_fog(&mut self, fog: Option<DepthFogFilter>) {
        self.fog = fog;
    }

    pub fn set_offset(&mut self, offset: OffsetAnimation) {
        self.offset = offset;
    }
}

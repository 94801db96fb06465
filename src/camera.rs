//! Camera state and the per-frame update policies that drive it.
//!
//! The renderer only ever reads a `CameraState` snapshot. Everything that
//! moves the camera (a fixed animation, the keyboard, a remote controller)
//! is a `CameraPolicy` plugged into the compositor.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Camera pose for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraState {
    /// World position on the floor plane
    pub x: f64,
    pub y: f64,
    /// Eye height bias: raises the eye away from the floor toward the ceiling
    pub z: f64,
    /// Rotation around the vertical axis, radians
    pub yaw: f64,
    /// Frame counter
    #[serde(skip)]
    pub t: u64,
}

impl CameraState {
    pub const fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self { x, y, z, yaw, t: 0 }
    }

    /// Unit vector the camera looks along, in world space
    pub fn forward(&self) -> (f64, f64) {
        (-self.yaw.sin(), self.yaw.cos())
    }

    /// Unit vector to the camera's right, in world space
    pub fn right(&self) -> (f64, f64) {
        (self.yaw.cos(), self.yaw.sin())
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(0.0, 0.0, 3.0, 0.0)
    }
}

/// Strategy producing the camera for frame `frame` from the previous one.
pub trait CameraPolicy {
    fn update(&mut self, frame: u64, previous: &CameraState) -> CameraState;

    /// Name for logs/window title
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> CameraPolicy for F
where
    F: FnMut(u64, &CameraState) -> CameraState,
{
    fn update(&mut self, frame: u64, previous: &CameraState) -> CameraState {
        self(frame, previous)
    }
}

// ============================================================================
// Deterministic policies
// ============================================================================

/// Holds the camera still; only the frame counter advances
#[derive(Debug, Clone, Copy, Default)]
pub struct Stationary;

impl CameraPolicy for Stationary {
    fn update(&mut self, frame: u64, previous: &CameraState) -> CameraState {
        CameraState {
            t: frame,
            ..*previous
        }
    }

    fn name(&self) -> &str {
        "stationary"
    }
}

/// Turns in place at a constant rate
#[derive(Debug, Clone, Copy)]
pub struct Spin {
    /// Radians per frame
    pub turn_rate: f64,
}

impl CameraPolicy for Spin {
    fn update(&mut self, frame: u64, previous: &CameraState) -> CameraState {
        CameraState {
            yaw: (previous.yaw + self.turn_rate).rem_euclid(TAU),
            t: frame,
            ..*previous
        }
    }

    fn name(&self) -> &str {
        "spin"
    }
}

/// Walks forward while slowly turning and bobbing; a pure function of the
/// frame counter and the starting pose.
#[derive(Debug, Clone, Copy)]
pub struct Walk {
    /// World units per frame
    pub speed: f64,
    /// Radians per frame
    pub turn_rate: f64,
    /// Peak eye-height change
    pub bob: f64,
}

impl CameraPolicy for Walk {
    fn update(&mut self, frame: u64, previous: &CameraState) -> CameraState {
        let (fx, fy) = previous.forward();
        let bob_prev = self.bob_at(previous.t);
        CameraState {
            x: previous.x + fx * self.speed,
            y: previous.y + fy * self.speed,
            z: previous.z - bob_prev + self.bob_at(frame),
            yaw: (previous.yaw + self.turn_rate).rem_euclid(TAU),
            t: frame,
        }
    }

    fn name(&self) -> &str {
        "walk"
    }
}

impl Walk {
    fn bob_at(&self, frame: u64) -> f64 {
        (frame as f64 / 8.0).sin() * self.bob
    }
}

// ============================================================================
// Keyboard
// ============================================================================

/// Held-key state for interactive control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub forward: bool,
    pub back: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub rise: bool,
    pub sink: bool,
}

/// Moves the camera from held keys
#[derive(Debug, Clone, Copy)]
pub struct ManualControl {
    pub controls: Controls,
    /// World units per frame
    pub move_speed: f64,
    /// Radians per frame
    pub turn_speed: f64,
    /// Height units per frame
    pub climb_speed: f64,
    /// Eye height is kept inside (-limit, limit) so neither plane is crossed
    pub height_limit: f64,
}

impl ManualControl {
    pub fn new(height_limit: f64) -> Self {
        Self {
            controls: Controls::default(),
            move_speed: 0.25,
            turn_speed: 0.03,
            climb_speed: 0.05,
            height_limit,
        }
    }
}

fn axis(positive: bool, negative: bool) -> f64 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

impl CameraPolicy for ManualControl {
    fn update(&mut self, frame: u64, previous: &CameraState) -> CameraState {
        let c = self.controls;
        let yaw =
            (previous.yaw + axis(c.turn_right, c.turn_left) * self.turn_speed).rem_euclid(TAU);
        let mut next = CameraState {
            yaw,
            t: frame,
            ..*previous
        };

        let (fx, fy) = next.forward();
        let (rx, ry) = next.right();
        let walk = axis(c.forward, c.back) * self.move_speed;
        let strafe = axis(c.strafe_right, c.strafe_left) * self.move_speed;
        next.x += fx * walk + rx * strafe;
        next.y += fy * walk + ry * strafe;

        let limit = (self.height_limit - 0.1).max(0.0);
        next.z = (next.z + axis(c.rise, c.sink) * self.climb_speed).clamp(-limit, limit);
        next
    }

    fn name(&self) -> &str {
        "manual"
    }
}

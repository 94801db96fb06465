//! Frame timing

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling frame-time statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub avg_fps: f32,
    pub min_fps: f32,
    pub max_fps: f32,
    pub avg_ms: f32,
}

/// FPS counter with rolling average
pub struct FpsCounter {
    frame_times: VecDeque<f32>,
    last_frame: Instant,
    sample_count: usize,
}

impl FpsCounter {
    /// Create a new FPS counter with specified sample window
    pub fn new(sample_count: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(sample_count),
            last_frame: Instant::now(),
            sample_count: sample_count.max(1),
        }
    }

    /// Call once per frame; returns the time since the previous call
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;
        self.record(dt.as_secs_f32());
        dt
    }

    fn record(&mut self, dt: f32) {
        self.frame_times.push_back(dt);
        if self.frame_times.len() > self.sample_count {
            self.frame_times.pop_front();
        }
    }

    pub fn stats(&self) -> FrameStats {
        let rate = |dt: f32| if dt > 0.0 { 1.0 / dt } else { 0.0 };

        if self.frame_times.is_empty() {
            return FrameStats {
                avg_fps: 0.0,
                min_fps: 0.0,
                max_fps: 0.0,
                avg_ms: 0.0,
            };
        }

        let avg_dt = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        let min_dt = self.frame_times.iter().copied().fold(f32::INFINITY, f32::min);
        let max_dt = self.frame_times.iter().copied().fold(0.0, f32::max);

        FrameStats {
            avg_fps: rate(avg_dt),
            min_fps: rate(max_dt),
            max_fps: rate(min_dt),
            avg_ms: avg_dt * 1000.0,
        }
    }
}

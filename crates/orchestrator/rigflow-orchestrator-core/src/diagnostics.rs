use serde::{Deserialize, Serialize};

/// Frames-per-second estimate refreshed every `window` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRateMeter {
    pub window: f32,
    frames: u32,
    elapsed: f32,
    fps: Option<f32>,
}

impl Default for FrameRateMeter {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl FrameRateMeter {
    pub fn new(window: f32) -> Self {
        Self {
            window,
            frames: 0,
            elapsed: 0.0,
            fps: None,
        }
    }

    /// Count one frame of length `dt`. Returns the new estimate when a window closes.
    pub fn tick(&mut self, dt: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed < self.window || self.elapsed <= 0.0 {
            return None;
        }
        let fps = self.frames as f32 / self.elapsed;
        self.frames = 0;
        self.elapsed = 0.0;
        self.fps = Some(fps);
        Some(fps)
    }

    /// Estimate from the last completed window.
    pub fn fps(&self) -> Option<f32> {
        self.fps
    }
}

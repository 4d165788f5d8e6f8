//! Playback clock driving the time parameter.
//!
//! Clock time is in the units of the time parameter (milliseconds for the
//! default `[0, 7000]` range); [`PlaybackClock::advance`] takes seconds.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Stop at the end of the range.
    #[default]
    Once,
    /// Wrap back to the start.
    Loop,
    /// Bounce between the ends.
    PingPong,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackClock {
    start: f32,
    end: f32,
    time: f32,
    speed: f32,
    mode: LoopMode,
    playing: bool,
    /// +1 or -1; only ping-pong flips it.
    direction: f32,
}

impl PlaybackClock {
    pub fn new(range: [f32; 2], mode: LoopMode) -> Self {
        let [a, b] = range;
        let (start, end) = (a.min(b), a.max(b));
        Self {
            start,
            end,
            time: start,
            speed: 1.0,
            mode,
            playing: false,
            direction: 1.0,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn range(&self) -> [f32; 2] {
        [self.start, self.end]
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        // a finished one-shot restarts from the beginning
        if self.mode == LoopMode::Once && self.at_end() {
            self.time = if self.speed < 0.0 { self.end } else { self.start };
        }
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Jump to `time`, clamped into the range.
    pub fn seek(&mut self, time: f32) {
        self.time = time.clamp(self.start, self.end);
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Playback rate relative to real time. Negative plays backwards.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.mode
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.mode = mode;
        if mode != LoopMode::PingPong {
            self.direction = 1.0;
        }
    }

    fn at_end(&self) -> bool {
        if self.speed < 0.0 {
            self.time <= self.start
        } else {
            self.time >= self.end
        }
    }

    /// Move the clock forward by `dt` seconds and return the new time.
    /// A paused clock does not move.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if !self.playing {
            return self.time;
        }
        let span = self.end - self.start;
        if span <= 0.0 {
            self.time = self.start;
            return self.time;
        }
        let delta = dt * 1000.0 * self.speed;

        match self.mode {
            LoopMode::Once => {
                let t = self.time + delta;
                self.time = t.clamp(self.start, self.end);
                if t != self.time || self.at_end() {
                    self.playing = false;
                }
            }
            LoopMode::Loop => {
                self.time = self.start + (self.time - self.start + delta).rem_euclid(span);
            }
            LoopMode::PingPong => {
                // position along an unfolded forward-then-back cycle of length 2 * span
                let offset = self.time - self.start;
                let unfolded = if self.direction > 0.0 { offset } else { 2.0 * span - offset };
                let phase = (unfolded + delta).rem_euclid(2.0 * span);
                if phase <= span {
                    self.time = self.start + phase;
                    self.direction = 1.0;
                } else {
                    self.time = self.start + 2.0 * span - phase;
                    self.direction = -1.0;
                }
            }
        }
        self.time
    }
}

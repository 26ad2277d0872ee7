//! Frame timing

use std::time::{Duration, Instant};

/// Frame clock updated once per redraw
#[derive(Debug, Clone)]
pub struct Time {
    start: Instant,
    last_frame: Instant,
    delta: Duration,
    frame_count: u64,
    /// Frames counted since `window_start`
    window_frames: u32,
    window_start: Instant,
    fps: f32,
}

impl Time {
    /// Create a new clock starting now
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            delta: Duration::ZERO,
            frame_count: 0,
            window_frames: 0,
            window_start: now,
            fps: 0.0,
        }
    }

    /// Advance to the current instant
    pub fn update(&mut self) {
        self.advance(Instant::now());
    }

    fn advance(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.frame_count += 1;

        self.window_frames += 1;
        let window = now.saturating_duration_since(self.window_start);
        if window >= Duration::from_secs(1) {
            self.fps = self.window_frames as f32 / window.as_secs_f32();
            self.window_frames = 0;
            self.window_start = now;
        }
    }

    /// Time since the previous frame
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Time since the previous frame in seconds
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Seconds since the clock started
    pub fn elapsed_seconds(&self) -> f32 {
        self.last_frame.saturating_duration_since(self.start).as_secs_f32()
    }

    /// Frames since the clock started
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second over the last full second
    pub fn fps(&self) -> f32 {
        self.fps
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut time = Time::new();
        let start = time.last_frame;

        time.advance(start + Duration::from_millis(16));
        assert_eq!(time.delta(), Duration::from_millis(16));
        assert_eq!(time.frame_count(), 1);
        assert!((time.elapsed_seconds() - 0.016).abs() < 1e-6);
        assert_eq!(time.fps(), 0.0);
    }

    #[test]
    fn test_fps_over_one_second() {
        let mut time = Time::new();
        let start = time.last_frame;

        for frame in 1..=50 {
            time.advance(start + Duration::from_millis(20 * frame));
        }
        assert!((time.fps() - 50.0).abs() < 0.5);
    }
}

//! Fixed-timestep accumulator.
//!
//! Converts variable frame deltas into a whole number of fixed simulation
//! ticks, with a clamp on both the frame delta and the ticks per frame so a
//! long stall never turns into a spiral of death.

use std::collections::VecDeque;

/// Frame-to-tick converter.
#[derive(Debug, Clone)]
pub struct FixedStep {
    /// Fixed timestep delta
    fixed_dt: f32,
    /// Accumulated, not yet simulated time
    accumulator: f32,
    /// Maximum frame delta accepted
    max_dt: f32,
    /// Maximum ticks per frame
    max_steps: u32,
    /// Recent frame deltas for averaging
    frame_times: VecDeque<f32>,
    /// Maximum samples for averaging
    max_samples: usize,
    /// Frames whose backlog was discarded
    dropped_frames: u64,
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

impl FixedStep {
    /// Create an accumulator ticking every `fixed_dt` seconds.
    #[must_use]
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            fixed_dt: fixed_dt.max(0.001),
            accumulator: 0.0,
            max_dt: 0.25,
            max_steps: 10,
            frame_times: VecDeque::with_capacity(120),
            max_samples: 120,
            dropped_frames: 0,
        }
    }

    /// Set the frame delta clamp.
    #[must_use]
    pub fn with_max_dt(mut self, max_dt: f32) -> Self {
        self.max_dt = max_dt.max(self.fixed_dt);
        self
    }

    /// Set the ticks-per-frame limit.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Get the fixed timestep value.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Accumulate a frame delta.
    /// Returns the number of fixed ticks that should be run.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        let dt = if frame_dt.is_finite() {
            frame_dt.clamp(0.0, self.max_dt)
        } else {
            0.0
        };

        self.frame_times.push_back(dt);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }

        self.accumulator += dt;
        let mut count = 0;
        while self.accumulator >= self.fixed_dt && count < self.max_steps {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Still behind: drop the backlog rather than chase it.
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
            self.dropped_frames += 1;
        }

        count
    }

    /// Fraction of a tick left in the accumulator, for render interpolation.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.fixed_dt).clamp(0.0, 1.0)
    }

    /// Get the average frame time in milliseconds.
    #[must_use]
    pub fn average_frame_time_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }

        (self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32) * 1000.0
    }

    /// Frames whose backlog was discarded.
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Reset timing (call after pause or loading).
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.frame_times.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_ticks_only() {
        let mut step = FixedStep::new(0.01);
        assert_eq!(step.accumulate(0.025), 2);
        assert!((step.alpha() - 0.5).abs() < 1e-3);
        assert_eq!(step.accumulate(0.006), 1);
    }

    #[test]
    fn test_fast_frames_accumulate() {
        let mut step = FixedStep::new(1.0 / 60.0);
        let ticks: u32 = (0..144).map(|_| step.accumulate(1.0 / 144.0)).sum();
        // One second of frames is roughly sixty ticks.
        assert!((59..=60).contains(&ticks));
    }

    #[test]
    fn test_stall_is_clamped() {
        let mut step = FixedStep::new(0.01).with_max_dt(0.04).with_max_steps(3);
        assert_eq!(step.accumulate(10.0), 3);
        assert_eq!(step.dropped_frames(), 0);
        assert!(step.alpha() <= 1.0);
    }

    #[test]
    fn test_backlog_is_dropped() {
        let mut step = FixedStep::new(0.01).with_max_dt(1.0).with_max_steps(2);
        assert_eq!(step.accumulate(0.5), 2);
        assert_eq!(step.dropped_frames(), 1);
        assert_eq!(step.alpha(), 0.0);
    }

    #[test]
    fn test_bad_delta_is_ignored() {
        let mut step = FixedStep::new(0.01);
        assert_eq!(step.accumulate(f32::NAN), 0);
        assert_eq!(step.accumulate(-1.0), 0);
    }

    #[test]
    fn test_average_frame_time() {
        let mut step = FixedStep::new(0.01);
        step.accumulate(0.02);
        step.accumulate(0.04);
        assert!((step.average_frame_time_ms() - 30.0).abs() < 1e-3);
        step.reset();
        assert_eq!(step.average_frame_time_ms(), 0.0);
    }
}

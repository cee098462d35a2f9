//! Trail history for tracer rendering.
//!
//! The kernel only keeps the samples; drawing them is the host's job. The
//! history is cleared whenever an instance is acquired, fired or released so
//! a previous flight never bleeds into the next one.

use std::collections::VecDeque;

use glam::Vec3;

use crate::profile::{TrailParams, MAX_TRAIL_LENGTH};

/// A timestamped trail sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    /// Sampled position
    pub position: Vec3,
    /// Flight time of the sample (seconds)
    pub time: f32,
}

/// Bounded history of recent positions, newest first.
#[derive(Debug, Clone, Default)]
pub struct TrailHistory {
    points: VecDeque<TrailPoint>,
    length: usize,
    lifetime: f32,
    active: bool,
}

impl TrailHistory {
    /// Create an empty, inactive history.
    #[must_use]
    pub fn new(params: TrailParams) -> Self {
        Self {
            points: VecDeque::with_capacity(params.length.min(MAX_TRAIL_LENGTH)),
            length: params.length,
            lifetime: params.lifetime,
            active: false,
        }
    }

    /// Apply new sampling parameters. Clears the history.
    pub fn configure(&mut self, params: TrailParams) {
        self.length = params.length;
        self.lifetime = params.lifetime;
        self.clear();
    }

    /// Drop every sample and stop recording.
    pub fn clear(&mut self) {
        self.points.clear();
        self.active = false;
    }

    /// Start recording from `origin`.
    pub fn activate(&mut self, origin: Vec3) {
        self.clear();
        self.active = true;
        self.points.push_front(TrailPoint {
            position: origin,
            time: 0.0,
        });
    }

    /// Record a sample. Ignored while inactive.
    pub fn record(&mut self, position: Vec3, time: f32) {
        if !self.active || self.length == 0 {
            return;
        }
        if self.points.len() == self.length {
            self.points.pop_back();
        }
        self.points.push_front(TrailPoint { position, time });
    }

    /// Samples still within their lifetime at `now`, newest first.
    ///
    /// Empty unless at least two samples are live (a single point draws nothing).
    #[must_use]
    pub fn visible_points(&self, now: f32) -> Vec<Vec3> {
        let live: Vec<Vec3> = self
            .points
            .iter()
            .take_while(|p| now - p.time < self.lifetime)
            .map(|p| p.position)
            .collect();
        if live.len() >= 2 {
            live
        } else {
            Vec::new()
        }
    }

    /// Whether the history is recording.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Number of stored samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no samples are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

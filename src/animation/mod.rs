//! Time-indexed trajectory playback.
//!
//! [`AnimationDriver`] owns the trajectory table and a fixed
//! [`AnimationConfig`]. It can produce frames synchronously ([`AnimationDriver::frames`])
//! or run as a tokio task ([`AnimationDriver::spawn`]) controlled through an
//! [`AnimationHandle`].

mod driver;
mod sink;

pub use driver::{AnimationHandle, AnimationSummary, Playback};
pub use sink::FrameSink;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::records::TripPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationConfig {
    /// Clock increment per tick, in trajectory time units (seconds).
    pub time_step: i64,
    /// Width of the trailing window drawn at each tick.
    pub trail_length: i64,
    /// Wall-clock wait between two ticks.
    pub frame_delay: Duration,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            time_step: 60,
            trail_length: 120,
            frame_delay: Duration::from_millis(100),
        }
    }
}

impl AnimationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.time_step <= 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "time_step must be positive, got {}",
                self.time_step
            )));
        }
        if self.trail_length < 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "trail_length must not be negative, got {}",
                self.trail_length
            )));
        }
        Ok(())
    }
}

/// The part of one trajectory inside the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleTrail {
    pub path_index: usize,
    pub coordinates: Vec<[f64; 2]>,
    pub timestamps: Vec<i64>,
}

/// What the map renders at one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderInstruction {
    pub current_time: i64,
    pub trail_length: i64,
    pub trajectories: Vec<VisibleTrail>,
}

/// Largest timestamp across all trajectories.
pub fn max_time(paths: &[TripPath]) -> Option<i64> {
    paths.iter().filter_map(TripPath::last_timestamp).max()
}

/// Points of `path` with `current_time - trail_length <= t <= current_time`.
pub fn visible_trail(
    path_index: usize,
    path: &TripPath,
    current_time: i64,
    trail_length: i64,
) -> Option<VisibleTrail> {
    let timestamps = path.timestamps();
    let window_start = current_time.saturating_sub(trail_length);
    let start = timestamps.partition_point(|&t| t < window_start);
    let end = timestamps.partition_point(|&t| t <= current_time);
    if start >= end {
        return None;
    }

    Some(VisibleTrail {
        path_index,
        coordinates: path.coordinates()[start..end].to_vec(),
        timestamps: timestamps[start..end].to_vec(),
    })
}

/// Animation clock: yields `0, step, 2*step, ...` while `<= max_time`.
#[derive(Debug, Clone)]
pub struct TickClock {
    current: i64,
    step: i64,
    max_time: Option<i64>,
}

impl TickClock {
    pub fn new(max_time: Option<i64>, step: i64) -> Self {
        Self {
            current: 0,
            step,
            max_time,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.max_time.is_none_or(|max| self.current > max)
    }
}

impl Iterator for TickClock {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.is_finished() {
            return None;
        }
        let tick = self.current;
        match tick.checked_add(self.step) {
            Some(next) => self.current = next,
            None => self.max_time = None,
        }
        Some(tick)
    }
}

pub struct AnimationDriver {
    paths: Arc<Vec<TripPath>>,
    config: AnimationConfig,
}

impl AnimationDriver {
    pub fn new(paths: Arc<Vec<TripPath>>, config: AnimationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { paths, config })
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn max_time(&self) -> Option<i64> {
        max_time(&self.paths)
    }

    pub fn ticks(&self) -> TickClock {
        TickClock::new(self.max_time(), self.config.time_step)
    }

    pub fn frame_at(&self, current_time: i64) -> RenderInstruction {
        let trail_length = self.config.trail_length;
        RenderInstruction {
            current_time,
            trail_length,
            trajectories: self
                .paths
                .iter()
                .enumerate()
                .filter_map(|(i, path)| visible_trail(i, path, current_time, trail_length))
                .collect(),
        }
    }

    /// Every frame in order, without waiting between them.
    pub fn frames(&self) -> impl Iterator<Item = RenderInstruction> + '_ {
        self.ticks().map(|t| self.frame_at(t))
    }
}

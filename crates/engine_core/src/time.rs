//! Fixed-step simulation clock.
//!
//! The host hands over whatever wall time elapsed since its last call; the
//! clock banks it and releases it in constant `fixed_timestep` slices so that
//! physics and gameplay advance deterministically regardless of frame rate.

use std::time::Duration;

/// Default fixed timestep (60 Hz).
pub const DEFAULT_FIXED_TIMESTEP: Duration = Duration::from_nanos(16_666_667);

/// Manages the simulated time line and the fixed-step accumulator.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Simulated time consumed by completed fixed steps.
    now: Duration,
    /// Constant step length.
    fixed_timestep: Duration,
    /// Banked host time not yet consumed.
    accumulator: Duration,
    /// Fixed steps completed since the last reset.
    step_count: u64,
    /// Upper bound on steps released per `advance` (spiral-of-death guard).
    max_steps_per_advance: u32,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_TIMESTEP)
    }
}

impl SimClock {
    /// Create a clock with the given step length. A zero step is raised to
    /// one nanosecond so `should_fixed_update` always drains.
    pub fn new(fixed_timestep: Duration) -> Self {
        if fixed_timestep.is_zero() {
            log::warn!("Zero fixed timestep; using 1ns");
        }
        Self {
            now: Duration::ZERO,
            fixed_timestep: fixed_timestep.max(Duration::from_nanos(1)),
            accumulator: Duration::ZERO,
            step_count: 0,
            max_steps_per_advance: 8,
        }
    }

    /// Limit how many fixed steps a single `advance` may release.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps_per_advance = max_steps.max(1);
        self
    }

    /// Bank host time. Backlog beyond `max_steps_per_advance` steps is dropped
    /// so one long hitch cannot stall the host for many frames.
    pub fn advance(&mut self, elapsed: Duration) {
        self.accumulator += elapsed;
        let cap = self.fixed_timestep * self.max_steps_per_advance;
        if self.accumulator > cap {
            log::debug!(
                "Dropping {:?} of simulation backlog",
                self.accumulator - cap
            );
            self.accumulator = cap;
        }
    }

    /// Check if a fixed update should run and consume the time.
    pub fn should_fixed_update(&mut self) -> bool {
        if self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            self.now += self.fixed_timestep;
            self.step_count += 1;
            true
        } else {
            false
        }
    }

    /// Simulated time at the end of the last completed step.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Step length.
    pub fn fixed_timestep(&self) -> Duration {
        self.fixed_timestep
    }

    /// Fixed steps completed since the last reset.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Rewind to time zero and discard banked time (session restart).
    pub fn reset(&mut self) {
        self.now = Duration::ZERO;
        self.accumulator = Duration::ZERO;
        self.step_count = 0;
    }
}

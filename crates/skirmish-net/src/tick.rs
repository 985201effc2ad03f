//! Fixed-rate tick scheduler.
//!
//! The [`TickScheduler`] turns irregular frame deltas into whole logical
//! ticks. Elapsed time is accumulated as a [`Duration`] (integer
//! nanoseconds), so the number of ticks produced for a given sequence of
//! deltas does not depend on floating-point rounding.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use skirmish_net::tick::{TickConfig, TickScheduler};
//!
//! let mut scheduler = TickScheduler::new(TickConfig::default());
//! let mut ran = Vec::new();
//! scheduler.advance(Duration::from_millis(40), |tick| ran.push(tick));
//! assert_eq!(ran, vec![0, 1]);
//! assert_eq!(scheduler.current_tick(), 2);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-rate scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f64,
}

impl Default for TickConfig {
    /// Defaults to 60 Hz.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
        }
    }
}

impl TickConfig {
    /// Whether `fixed_dt` is usable.
    pub fn is_valid(&self) -> bool {
        self.fixed_dt > 0.0 && self.fixed_dt.is_finite()
    }
}

// ---------------------------------------------------------------------------
// TickScheduler
// ---------------------------------------------------------------------------

/// Accumulates real time and runs one callback per elapsed fixed tick.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    fixed_dt: f64,
    step: Duration,
    accumulator: Duration,
    /// The next tick to run.
    tick_counter: u64,
}

impl TickScheduler {
    /// Create a scheduler starting at tick 0.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn new(config: TickConfig) -> Self {
        Self::starting_at(config, 0)
    }

    /// Create a scheduler whose first tick is `tick`.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite.
    pub fn starting_at(config: TickConfig, tick: u64) -> Self {
        assert!(
            config.is_valid(),
            "fixed_dt must be positive and finite, got {}",
            config.fixed_dt
        );
        let step = Duration::from_secs_f64(config.fixed_dt);
        assert!(!step.is_zero(), "fixed_dt {} is below clock resolution", config.fixed_dt);
        Self {
            fixed_dt: config.fixed_dt,
            step,
            accumulator: Duration::ZERO,
            tick_counter: tick,
        }
    }

    /// Add `elapsed` to the accumulator and run `on_tick` once for every
    /// whole tick now due, in order. Returns the number of ticks run.
    pub fn advance(&mut self, elapsed: Duration, mut on_tick: impl FnMut(u64)) -> u64 {
        self.accumulator += elapsed;
        let mut ran = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            on_tick(self.tick_counter);
            self.tick_counter += 1;
            ran += 1;
        }
        ran
    }

    /// The next tick that will run.
    pub fn current_tick(&self) -> u64 {
        self.tick_counter
    }

    /// Fixed time step in seconds.
    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    /// Fraction of a tick currently accumulated, in `[0, 1)`. Useful for
    /// render interpolation.
    pub fn alpha(&self) -> f64 {
        self.accumulator.as_secs_f64() / self.step.as_secs_f64()
    }
}

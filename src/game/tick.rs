//! Fixed-Step Loop Driver
//!
//! Splits variable frame time into a fixed number of simulation steps.
//!
//! ```text
//! frame(elapsed):
//!   pre_update(elapsed)                      input, outgoing events
//!   while acc >= step: fixed_update(step)    network drain, reducer, physics
//!   post_update(acc)                         cleanup, win checks, countdown
//! ```
//!
//! Steps beyond `max_steps_per_frame` are dropped so a long stall cannot
//! snowball into ever longer frames.

use std::time::Duration;
use serde::{Serialize, Deserialize};
use tracing::warn;

/// The three phases of a frame.
pub trait LoopPhases {
    /// Once per frame, before any fixed step. Only place input is sampled.
    fn pre_update(&mut self, elapsed: Duration);

    /// Zero or more times per frame, always with the same `step`.
    fn fixed_update(&mut self, step: Duration);

    /// Once per frame, after the fixed steps. `remainder` is the unsimulated time.
    fn post_update(&mut self, remainder: Duration);
}

/// Loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Fixed steps per second.
    pub tick_rate: u32,
    /// Upper bound on fixed steps run in one frame.
    pub max_steps_per_frame: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_rate: crate::TICK_RATE,
            max_steps_per_frame: crate::MAX_STEPS_PER_FRAME,
        }
    }
}

/// Accumulates frame time and runs fixed steps.
#[derive(Debug, Clone)]
pub struct FixedStepDriver {
    fixed_step: Duration,
    accumulator: Duration,
    max_steps: u32,
}

impl FixedStepDriver {
    /// Driver for `config`. A zero tick rate is treated as 1 Hz.
    pub fn new(config: &LoopConfig) -> Self {
        let rate = config.tick_rate.max(1);
        Self {
            fixed_step: Duration::from_nanos(1_000_000_000 / rate as u64),
            accumulator: Duration::ZERO,
            max_steps: config.max_steps_per_frame.max(1),
        }
    }

    /// Length of one fixed step.
    pub fn fixed_step(&self) -> Duration {
        self.fixed_step
    }

    /// Time carried over to the next frame.
    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    /// Run one frame. Returns how many fixed steps ran.
    pub fn advance<P: LoopPhases + ?Sized>(&mut self, elapsed: Duration, phases: &mut P) -> u32 {
        phases.pre_update(elapsed);

        self.accumulator += elapsed;
        let mut steps = 0;
        while self.accumulator >= self.fixed_step && steps < self.max_steps {
            phases.fixed_update(self.fixed_step);
            self.accumulator -= self.fixed_step;
            steps += 1;
        }
        if self.accumulator >= self.fixed_step {
            let step_nanos = self.fixed_step.as_nanos();
            let dropped = self.accumulator.as_nanos() / step_nanos;
            warn!("Frame overran by {} fixed steps; dropping them", dropped);
            self.accumulator = Duration::from_nanos((self.accumulator.as_nanos() % step_nanos) as u64);
        }

        phases.post_update(self.accumulator);
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl LoopPhases for Recorder {
        fn pre_update(&mut self, elapsed: Duration) {
            self.calls.push(format!("pre {}", elapsed.as_millis()));
        }
        fn fixed_update(&mut self, step: Duration) {
            self.calls.push(format!("fixed {}", step.as_millis()));
        }
        fn post_update(&mut self, remainder: Duration) {
            self.calls.push(format!("post {}", remainder.as_millis()));
        }
    }

    fn driver(rate: u32, cap: u32) -> FixedStepDriver {
        FixedStepDriver::new(&LoopConfig { tick_rate: rate, max_steps_per_frame: cap })
    }

    #[test]
    fn test_phase_order() {
        let mut d = driver(10, 5);
        let mut r = Recorder::default();
        assert_eq!(d.advance(Duration::from_millis(250), &mut r), 2);
        assert_eq!(r.calls, vec!["pre 250", "fixed 100", "fixed 100", "post 50"]);
    }

    #[test]
    fn test_short_frames_run_zero_steps() {
        let mut d = driver(10, 5);
        let mut r = Recorder::default();
        assert_eq!(d.advance(Duration::from_millis(40), &mut r), 0);
        assert_eq!(r.calls, vec!["pre 40", "post 40"]);

        // The remainder carries into the next frame.
        r.calls.clear();
        assert_eq!(d.advance(Duration::from_millis(70), &mut r), 1);
        assert_eq!(d.accumulator(), Duration::from_millis(10));
    }

    #[test]
    fn test_step_cap_drops_excess() {
        let mut d = driver(10, 3);
        let mut r = Recorder::default();
        assert_eq!(d.advance(Duration::from_millis(1_050), &mut r), 3);
        assert_eq!(d.accumulator(), Duration::from_millis(50));
        assert_eq!(r.calls.last().map(String::as_str), Some("post 50"));
    }

    #[test]
    fn test_default_rate() {
        let d = FixedStepDriver::new(&LoopConfig::default());
        assert_eq!(d.fixed_step(), Duration::from_nanos(1_000_000_000 / 60));
    }
}

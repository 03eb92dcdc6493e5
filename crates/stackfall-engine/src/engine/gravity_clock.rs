use std::time::Duration;

use crate::FrameConfig;

/// Gravity steps due in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepPlan {
    pub steps_to_run: u32,
    /// Accumulated time discarded because the step cap was reached.
    pub dropped_backlog: Duration,
}

/// Fixed-step gravity accumulator.
///
/// Each frame adds the (capped) time since the previous frame and yields the
/// number of whole gravity steps that fit, up to `max_steps_per_frame`. Time
/// left over after the cap is discarded so a stall never turns into a burst
/// of catch-up steps.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use stackfall_engine::{FrameConfig, GravityClock};
///
/// let ms = Duration::from_millis;
/// let mut clock = GravityClock::new(&FrameConfig::default(), ms(20));
///
/// assert_eq!(clock.advance(ms(0)).steps_to_run, 0); // first frame
/// assert_eq!(clock.advance(ms(16)).steps_to_run, 0);
/// assert_eq!(clock.advance(ms(32)).steps_to_run, 1);
/// ```
#[derive(Debug, Clone)]
pub struct GravityClock {
    accumulator: Duration,
    last_frame: Option<Duration>,
    step: Duration,
    max_frame_delta: Duration,
    max_steps_per_frame: u32,
}

impl GravityClock {
    #[must_use]
    pub fn new(frame: &FrameConfig, step: Duration) -> Self {
        let mut this = Self {
            accumulator: Duration::ZERO,
            last_frame: None,
            step,
            max_frame_delta: Duration::ZERO,
            max_steps_per_frame: 0,
        };
        this.apply_frame_config(frame);
        this.set_step(step);
        this
    }

    pub fn apply_frame_config(&mut self, frame: &FrameConfig) {
        self.max_frame_delta = frame.max_frame_delta();
        self.max_steps_per_frame = frame.max_steps_per_frame.max(1);
    }

    /// Current time between gravity steps.
    #[must_use]
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Changes the gravity step, e.g. after a level up. Accumulated time is kept.
    pub fn set_step(&mut self, step: Duration) {
        self.step = step.max(Duration::from_nanos(1));
    }

    #[must_use]
    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    /// Forgets the previous frame so the next one contributes no time.
    ///
    /// Used when resuming from pause.
    pub fn resync(&mut self) {
        self.last_frame = None;
    }

    /// Restarts accumulation from zero.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
        self.last_frame = None;
    }

    /// Time since the previous frame, capped to two frame intervals.
    ///
    /// The first frame after construction or [`Self::resync`] yields zero.
    fn frame_delta(&mut self, now: Duration) -> Duration {
        let delta = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.last_frame = Some(now);
        delta.min(self.max_frame_delta)
    }

    /// Adds this frame's time and consumes the gravity steps that are due.
    pub fn advance(&mut self, now: Duration) -> StepPlan {
        let delta = self.frame_delta(now);
        self.accumulator = self.accumulator.saturating_add(delta);

        let mut steps_to_run = 0u32;
        while self.accumulator >= self.step && steps_to_run < self.max_steps_per_frame {
            self.accumulator -= self.step;
            steps_to_run += 1;
        }

        let mut dropped_backlog = Duration::ZERO;
        if self.accumulator >= self.step {
            dropped_backlog = self.accumulator;
            self.accumulator = Duration::ZERO;
            tracing::debug!(
                ?dropped_backlog,
                steps_to_run,
                "gravity backlog dropped"
            );
        }

        StepPlan {
            steps_to_run,
            dropped_backlog,
        }
    }
}

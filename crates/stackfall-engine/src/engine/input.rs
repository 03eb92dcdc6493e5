//! DAS/ARR input scheduling.
//!
//! Turns key edges into actions. Left, right and soft drop fire once on
//! press and then auto-repeat; every other action fires once per press.
//! All timestamps are game-clock `Duration`s supplied by the caller.

use std::time::Duration;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::HandlingConfig;

/// Logical action a physical key is bound to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    MoveLeft,
    MoveRight,
    SoftDrop,
    RotateClockwise,
    RotateCounterClockwise,
    HardDrop,
    Hold,
    Pause,
}

impl Action {
    pub const LEN: usize = 8;

    const fn index(self) -> usize {
        self as usize
    }
}

/// Upper bound on repeats one direction fires in a single update.
pub const MAX_REPEATS_PER_UPDATE: usize = 4;

/// Repeats fired by one [`InputScheduler::update`], grouped by direction.
pub type RepeatActions = ArrayVec<Action, { 3 * MAX_REPEATS_PER_UPDATE }>;

/// Auto-repeat state for one direction.
#[derive(Debug, Clone, Copy, Default)]
struct RepeatTimer {
    held: bool,
    pressed_at: Duration,
    /// Due time of the next repeat once DAS has elapsed.
    next_repeat: Option<Duration>,
    last_press: Option<Duration>,
}

impl RepeatTimer {
    fn press(&mut self, now: Duration, debounce: Duration) -> bool {
        if self.held {
            return false;
        }
        if self
            .last_press
            .is_some_and(|last| now.saturating_sub(last) < debounce)
        {
            return false;
        }
        *self = Self {
            held: true,
            pressed_at: now,
            next_repeat: None,
            last_press: Some(now),
        };
        true
    }

    fn release(&mut self) {
        self.held = false;
        self.next_repeat = None;
    }

    /// Returns the number of repeats due at `now`.
    ///
    /// Due times advance by `interval` from `pressed_at + das`, so the cadence
    /// does not depend on the update rate. A zero interval fires once per
    /// update. Backlog beyond [`MAX_REPEATS_PER_UPDATE`] is dropped.
    fn poll(&mut self, now: Duration, das: Duration, interval: Duration) -> usize {
        if !self.held {
            return 0;
        }
        let mut due = self
            .next_repeat
            .unwrap_or_else(|| self.pressed_at.saturating_add(das));
        if due > now {
            return 0;
        }
        if interval.is_zero() {
            self.next_repeat = Some(now);
            return 1;
        }

        let mut count = 0;
        while due <= now && count < MAX_REPEATS_PER_UPDATE {
            due = due.saturating_add(interval);
            count += 1;
        }
        if due <= now {
            due = now.saturating_add(interval);
        }
        self.next_repeat = Some(due);
        count
    }
}

/// Per-session DAS/ARR scheduler.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use stackfall_engine::{Action, HandlingConfig, InputScheduler};
///
/// let ms = Duration::from_millis;
/// let mut input = InputScheduler::new(&HandlingConfig::default(), ms(1000));
///
/// assert_eq!(input.key_down(Action::MoveLeft, ms(0)), Some(Action::MoveLeft));
/// assert!(input.update(ms(100)).is_empty());
/// assert_eq!(input.update(ms(170)).as_slice(), &[Action::MoveLeft]);
///
/// input.key_up(Action::MoveLeft);
/// assert!(input.update(ms(400)).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct InputScheduler {
    handling: HandlingConfig,
    soft_drop_interval: Duration,
    left: RepeatTimer,
    right: RepeatTimer,
    soft_drop: RepeatTimer,
    held: [bool; Action::LEN],
}

impl InputScheduler {
    /// Creates a scheduler using `gravity_step` to derive the soft-drop rate.
    #[must_use]
    pub fn new(handling: &HandlingConfig, gravity_step: Duration) -> Self {
        Self {
            handling: handling.clone(),
            soft_drop_interval: handling.soft_drop_interval(gravity_step),
            left: RepeatTimer::default(),
            right: RepeatTimer::default(),
            soft_drop: RepeatTimer::default(),
            held: [false; Action::LEN],
        }
    }

    /// Applies new handling settings. Held keys stay armed.
    pub fn apply_handling(&mut self, handling: &HandlingConfig, gravity_step: Duration) {
        self.handling = handling.clone();
        self.set_gravity_step(gravity_step);
    }

    /// Re-derives the soft-drop repeat interval after a level change.
    pub fn set_gravity_step(&mut self, gravity_step: Duration) {
        self.soft_drop_interval = self.handling.soft_drop_interval(gravity_step);
    }

    #[must_use]
    pub fn soft_drop_interval(&self) -> Duration {
        self.soft_drop_interval
    }

    #[must_use]
    pub fn is_held(&self, action: Action) -> bool {
        self.held[action.index()]
    }

    fn timer_mut(&mut self, action: Action) -> Option<&mut RepeatTimer> {
        match action {
            Action::MoveLeft => Some(&mut self.left),
            Action::MoveRight => Some(&mut self.right),
            Action::SoftDrop => Some(&mut self.soft_drop),
            _ => None,
        }
    }

    /// Handles a key-down edge and returns the action to fire immediately.
    ///
    /// Returns `None` for OS repeats of a held key and for debounced presses.
    pub fn key_down(&mut self, action: Action, now: Duration) -> Option<Action> {
        if self.held[action.index()] {
            return None;
        }
        let debounce = self.handling.debounce();
        if let Some(timer) = self.timer_mut(action)
            && !timer.press(now, debounce)
        {
            return None;
        }
        self.held[action.index()] = true;
        Some(action)
    }

    /// Handles a key-up edge. The repeat timer is disarmed immediately.
    pub fn key_up(&mut self, action: Action) {
        self.held[action.index()] = false;
        if let Some(timer) = self.timer_mut(action) {
            timer.release();
        }
    }

    /// Releases every key, e.g. on restart.
    pub fn release_all(&mut self) {
        self.held = [false; Action::LEN];
        for timer in [&mut self.left, &mut self.right, &mut self.soft_drop] {
            timer.release();
        }
    }

    /// Fires due auto-repeats, at most [`MAX_REPEATS_PER_UPDATE`] per direction.
    pub fn update(&mut self, now: Duration) -> RepeatActions {
        let (das, arr) = (self.handling.das(), self.handling.arr());
        let soft_drop_das = self.handling.soft_drop_das();
        let counts = [
            (Action::MoveLeft, self.left.poll(now, das, arr)),
            (Action::MoveRight, self.right.poll(now, das, arr)),
            (
                Action::SoftDrop,
                self.soft_drop
                    .poll(now, soft_drop_das, self.soft_drop_interval),
            ),
        ];
        counts
            .into_iter()
            .flat_map(|(action, count)| std::iter::repeat_n(action, count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn scheduler(das_ms: u64, arr_ms: u64) -> InputScheduler {
        let handling = HandlingConfig {
            das_ms,
            arr_ms,
            ..HandlingConfig::default()
        };
        InputScheduler::new(&handling, ms(1000))
    }

    /// Runs updates every `tick` ms over `(from, to]` and returns fire times.
    fn run(input: &mut InputScheduler, from: u64, to: u64, tick: u64) -> Vec<(u64, Action)> {
        let mut fired = vec![];
        let mut t = from + tick;
        while t <= to {
            for action in input.update(ms(t)) {
                fired.push((t, action));
            }
            t += tick;
        }
        fired
    }

    #[test]
    fn test_press_fires_once_immediately() {
        let mut input = scheduler(170, 50);
        assert_eq!(input.key_down(Action::MoveRight, ms(0)), Some(Action::MoveRight));
        assert!(input.update(ms(0)).is_empty());
        assert!(input.is_held(Action::MoveRight));
    }

    #[test]
    fn test_os_repeat_is_ignored() {
        let mut input = scheduler(170, 50);
        input.key_down(Action::MoveLeft, ms(0));
        assert_eq!(input.key_down(Action::MoveLeft, ms(30)), None);
        assert_eq!(input.key_down(Action::RotateClockwise, ms(30)), Some(Action::RotateClockwise));
        assert_eq!(input.key_down(Action::RotateClockwise, ms(60)), None);
        input.key_up(Action::RotateClockwise);
        assert_eq!(input.key_down(Action::RotateClockwise, ms(90)), Some(Action::RotateClockwise));
    }

    #[test]
    fn test_debounce_rejects_quick_double_press() {
        let mut input = scheduler(170, 50);
        input.key_down(Action::MoveLeft, ms(100));
        input.key_up(Action::MoveLeft);
        assert_eq!(input.key_down(Action::MoveLeft, ms(105)), None);
        assert!(!input.is_held(Action::MoveLeft));
        assert_eq!(input.key_down(Action::MoveLeft, ms(110)), Some(Action::MoveLeft));
    }

    #[test]
    fn test_hold_fires_repeats_spaced_by_arr() {
        let mut input = scheduler(170, 50);
        input.key_down(Action::MoveLeft, ms(0));
        let fired = run(&mut input, 0, 170 + 3 * 50, 10);
        let times: Vec<u64> = fired.iter().map(|&(t, _)| t).collect();
        assert_eq!(times, [170, 220, 270, 320]);
        assert!(fired.iter().all(|&(_, a)| a == Action::MoveLeft));

        input.key_up(Action::MoveLeft);
        assert!(run(&mut input, 320, 1000, 10).is_empty());
    }

    #[test]
    fn test_late_update_catches_up_to_the_cap() {
        let mut input = scheduler(170, 50);
        input.key_down(Action::MoveRight, ms(0));
        // Due at 170, 220 and 270.
        assert_eq!(input.update(ms(290)).as_slice(), &[Action::MoveRight; 3]);
        assert!(input.update(ms(300)).is_empty());
        assert_eq!(input.update(ms(320)).len(), 1);

        // A long stall fires the cap and drops the rest.
        assert_eq!(input.update(ms(2000)).len(), MAX_REPEATS_PER_UPDATE);
        assert!(input.update(ms(2040)).is_empty());
        assert_eq!(input.update(ms(2050)).len(), 1);
    }

    #[test]
    fn test_arr_cadence_is_independent_of_frame_rate() {
        let mut input = scheduler(170, 40);
        input.key_down(Action::MoveLeft, ms(0));
        let mut repeats = 0;
        for f in 1..=60u64 {
            repeats += input.update(Duration::from_micros(f * 16_667)).len();
        }
        // Due at 170, 210, ..., 970 within the first second.
        assert_eq!(repeats, 21);
    }

    #[test]
    fn test_zero_arr_fires_every_update() {
        let mut input = scheduler(100, 0);
        input.key_down(Action::MoveRight, ms(0));
        let fired = run(&mut input, 0, 150, 10);
        let times: Vec<u64> = fired.iter().map(|&(t, _)| t).collect();
        assert_eq!(times, [100, 110, 120, 130, 140, 150]);
    }

    #[test]
    fn test_directions_repeat_independently() {
        let mut input = scheduler(100, 50);
        input.key_down(Action::MoveLeft, ms(0));
        input.key_down(Action::SoftDrop, ms(20));
        // Soft drop DAS is 50ms, interval 1000 / 20 = 50ms.
        assert_eq!(input.update(ms(70)).as_slice(), &[Action::SoftDrop]);
        assert_eq!(input.update(ms(100)).as_slice(), &[Action::MoveLeft]);
        assert_eq!(
            input.update(ms(150)).as_slice(),
            &[Action::MoveLeft, Action::SoftDrop]
        );
    }

    #[test]
    fn test_soft_drop_interval_follows_gravity() {
        let mut input = scheduler(170, 50);
        assert_eq!(input.soft_drop_interval(), ms(50));
        input.set_gravity_step(ms(500));
        assert_eq!(input.soft_drop_interval(), ms(25));
    }

    #[test]
    fn test_release_all_disarms_timers() {
        let mut input = scheduler(100, 50);
        input.key_down(Action::MoveLeft, ms(0));
        input.key_down(Action::Hold, ms(0));
        input.release_all();
        assert!(!input.is_held(Action::Hold));
        assert!(run(&mut input, 0, 500, 10).is_empty());
    }
}

//! Engine settings supplied by the host.
//!
//! Every field has a default, so a partial JSON (or any other serde format)
//! document is enough to build an [`EngineConfig`]:
//!
//! ```
//! use std::time::Duration;
//! use stackfall_engine::EngineConfig;
//!
//! let config: EngineConfig = serde_json::from_str(r#"{ "handling": { "das_ms": 120 } }"#).unwrap();
//! assert_eq!(config.handling.das(), Duration::from_millis(120));
//! assert_eq!(config.handling.arr(), Duration::from_millis(50));
//! ```

use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Action;

/// Lower bound of the soft-drop DAS.
const MIN_SOFT_DROP_DAS: Duration = Duration::from_millis(16);

/// Converts float seconds to a `Duration`, saturating at `Duration::MAX`.
///
/// Negative and NaN values yield zero.
fn saturating_from_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub handling: HandlingConfig,
    pub lock: LockConfig,
    pub gravity: GravityConfig,
    pub frame: FrameConfig,
    pub display: DisplayConfig,
    pub key_bindings: KeyBindings,
}

/// DAS/ARR tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlingConfig {
    /// Delay after key-down before auto-repeat begins.
    pub das_ms: u64,
    /// Interval between auto-repeats; `0` repeats on every update.
    pub arr_ms: u64,
    /// Soft-drop speed as a multiple of gravity. Non-positive values repeat
    /// soft drop at `arr_ms` instead.
    pub soft_drop_factor: f64,
    /// Presses of the same direction closer than this are rejected.
    pub debounce_ms: u64,
}

impl Default for HandlingConfig {
    fn default() -> Self {
        Self {
            das_ms: 170,
            arr_ms: 50,
            soft_drop_factor: 20.0,
            debounce_ms: 10,
        }
    }
}

impl HandlingConfig {
    #[must_use]
    pub fn das(&self) -> Duration {
        Duration::from_millis(self.das_ms)
    }

    #[must_use]
    pub fn arr(&self) -> Duration {
        Duration::from_millis(self.arr_ms)
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Soft-drop DAS: half the lateral DAS, never below 16ms.
    #[must_use]
    pub fn soft_drop_das(&self) -> Duration {
        (self.das() / 2).max(MIN_SOFT_DROP_DAS)
    }

    /// Soft-drop repeat interval for the given gravity step.
    ///
    /// Without a positive factor soft drop repeats at the ARR.
    #[must_use]
    pub fn soft_drop_interval(&self, gravity_step: Duration) -> Duration {
        if self.soft_drop_factor > 0.0 {
            saturating_from_secs(gravity_step.as_secs_f64() / self.soft_drop_factor)
        } else {
            self.arr()
        }
    }
}

/// Lock-delay tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Grace period before a piece grounded by gravity locks.
    pub delay_ms: u64,
    /// Move/rotate resets honored per grounding.
    pub max_resets: u32,
    /// Multiplier of `delay_ms` when grounding came from soft drop.
    ///
    /// `0.0` locks on soft-drop contact.
    pub soft_drop_factor: f64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            max_resets: 15,
            soft_drop_factor: 0.0,
        }
    }
}

impl LockConfig {
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    #[must_use]
    pub fn soft_drop_delay(&self) -> Duration {
        saturating_from_secs(self.delay().as_secs_f64() * self.soft_drop_factor)
    }
}

/// Gravity curve: milliseconds per row as a function of level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityConfig {
    pub base_ms: u64,
    pub decrement_ms: u64,
    pub min_ms: u64,
    /// Explicit per-level steps, starting at level 1. Levels past the end use
    /// the last entry. Overrides the linear curve when non-empty.
    pub table_ms: Vec<u64>,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            base_ms: 1000,
            decrement_ms: 100,
            min_ms: 100,
            table_ms: Vec::new(),
        }
    }
}

impl GravityConfig {
    /// Time between gravity steps at `level` (1-based).
    ///
    /// ```
    /// use std::time::Duration;
    /// use stackfall_engine::GravityConfig;
    ///
    /// let gravity = GravityConfig::default();
    /// assert_eq!(gravity.step_for_level(1), Duration::from_millis(1000));
    /// assert_eq!(gravity.step_for_level(4), Duration::from_millis(700));
    /// assert_eq!(gravity.step_for_level(30), Duration::from_millis(100));
    /// ```
    #[must_use]
    pub fn step_for_level(&self, level: usize) -> Duration {
        let index = level.saturating_sub(1);
        let ms = if let Some(&last) = self.table_ms.last() {
            self.table_ms.get(index).copied().unwrap_or(last)
        } else {
            let index = u64::try_from(index).unwrap_or(u64::MAX);
            self.base_ms
                .saturating_sub(index.saturating_mul(self.decrement_ms))
                .max(self.min_ms)
        };
        // A zero step would stall the accumulator loop.
        Duration::from_millis(ms.max(1))
    }
}

/// Frame pacing of the simulation clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Expected time between updates. `0` disables the frame-delta cap.
    pub frame_interval_us: u64,
    /// Upper bound on gravity steps applied in one update.
    pub max_steps_per_frame: u32,
    /// Number of upcoming pieces published in the snapshot (at most 7).
    pub preview_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frame_interval_us: 16_667,
            max_steps_per_frame: 4,
            preview_len: 5,
        }
    }
}

impl FrameConfig {
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(self.frame_interval_us)
    }

    /// Largest frame delta fed to the simulation: two frame intervals, or
    /// uncapped when the interval is zero.
    #[must_use]
    pub fn max_frame_delta(&self) -> Duration {
        if self.frame_interval_us == 0 {
            return Duration::MAX;
        }
        self.frame_interval().saturating_mul(2)
    }
}

/// Presentation flags passed through to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub ghost_piece: bool,
    pub grid_lines: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            ghost_piece: true,
            grid_lines: false,
        }
    }
}

/// Physical key identifier → logical action.
///
/// Several keys may map to the same action. Unbound keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings(BTreeMap<String, Action>);

impl Default for KeyBindings {
    fn default() -> Self {
        [
            ("ArrowLeft", Action::MoveLeft),
            ("ArrowRight", Action::MoveRight),
            ("ArrowDown", Action::SoftDrop),
            ("ArrowUp", Action::RotateClockwise),
            ("x", Action::RotateClockwise),
            ("z", Action::RotateCounterClockwise),
            ("Space", Action::HardDrop),
            ("c", Action::Hold),
            ("Shift", Action::Hold),
            ("p", Action::Pause),
            ("Escape", Action::Pause),
        ]
        .into_iter()
        .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Action)> for KeyBindings {
    fn from_iter<T: IntoIterator<Item = (K, Action)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, a)| (k.into(), a)).collect())
    }
}

impl KeyBindings {
    #[must_use]
    pub fn action(&self, key: &str) -> Option<Action> {
        self.0.get(key).copied()
    }

    pub fn bind(&mut self, key: impl Into<String>, action: Action) -> Option<Action> {
        self.0.insert(key.into(), action)
    }

    pub fn unbind(&mut self, key: &str) -> Option<Action> {
        self.0.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Action)> {
        self.0.iter().map(|(k, &a)| (k.as_str(), a))
    }
}

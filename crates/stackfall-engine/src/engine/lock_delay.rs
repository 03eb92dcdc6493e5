use std::time::Duration;

use crate::LockConfig;

/// What pushed the piece onto the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum GroundCause {
    Gravity,
    SoftDrop,
}

/// Lock-delay state of the falling piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum LockState {
    /// The last downward step succeeded.
    Airborne,
    /// A downward step failed at `since` (game clock).
    Grounded {
        since: Duration,
        resets: u32,
        cause: GroundCause,
    },
    /// The delay expired; the piece must be merged.
    Locked,
}

/// Lock-delay state machine.
///
/// ```text
/// Airborne --drop fails--> Grounded --delay expires--> Locked
///     ^                       |  ^
///     +--move leaves ground---+  +--move/rotate while grounded (reset)
/// ```
///
/// Resets refresh the contact time and are honored at most `max_resets`
/// times per grounding. Past the ceiling the piece locks once the delay
/// expires no matter how it is moved.
#[derive(Debug, Clone)]
pub struct LockDelay {
    state: LockState,
    delay: Duration,
    soft_drop_delay: Duration,
    max_resets: u32,
}

impl LockDelay {
    #[must_use]
    pub fn new(config: &LockConfig) -> Self {
        Self {
            state: LockState::Airborne,
            delay: config.delay(),
            soft_drop_delay: config.soft_drop_delay(),
            max_resets: config.max_resets,
        }
    }

    /// Applies new settings. The current state is kept.
    pub fn apply_config(&mut self, config: &LockConfig) {
        self.delay = config.delay();
        self.soft_drop_delay = config.soft_drop_delay();
        self.max_resets = config.max_resets;
    }

    #[must_use]
    pub fn state(&self) -> LockState {
        self.state
    }

    /// Delay that applies to a grounding of the given cause.
    #[must_use]
    pub fn threshold(&self, cause: GroundCause) -> Duration {
        match cause {
            GroundCause::Gravity => self.delay,
            GroundCause::SoftDrop => self.soft_drop_delay,
        }
    }

    /// Starts over for a freshly spawned piece.
    pub fn reset(&mut self) {
        self.state = LockState::Airborne;
    }

    /// A downward step was blocked.
    ///
    /// Grounds an airborne piece. A blocked soft drop on an already grounded
    /// piece switches the cause without refreshing the contact time.
    pub fn on_drop_blocked(&mut self, now: Duration, cause: GroundCause) {
        self.state = match self.state {
            LockState::Airborne => LockState::Grounded {
                since: now,
                resets: 0,
                cause,
            },
            LockState::Grounded { since, resets, .. } if cause.is_soft_drop() => {
                LockState::Grounded {
                    since,
                    resets,
                    cause,
                }
            }
            state => state,
        };
    }

    /// A lateral move or rotation succeeded.
    ///
    /// `grounded` tells whether the piece rests on the stack afterwards.
    /// Returns `true` if the move refreshed the lock timer.
    pub fn on_piece_moved(&mut self, now: Duration, grounded: bool) -> bool {
        match self.state {
            LockState::Grounded { .. } if !grounded => {
                self.state = LockState::Airborne;
                false
            }
            LockState::Grounded {
                resets, cause, ..
            } if resets < self.max_resets => {
                self.state = LockState::Grounded {
                    since: now,
                    resets: resets + 1,
                    cause,
                };
                true
            }
            _ => false,
        }
    }

    /// A downward step succeeded.
    pub fn on_piece_fell(&mut self) {
        if self.state.is_grounded() {
            self.state = LockState::Airborne;
        }
    }

    /// Transitions to [`LockState::Locked`] once the delay has expired.
    ///
    /// Returns `true` if the piece is locked.
    pub fn poll(&mut self, now: Duration) -> bool {
        if let LockState::Grounded { since, cause, .. } = self.state
            && now.saturating_sub(since) >= self.threshold(cause)
        {
            self.state = LockState::Locked;
        }
        self.state.is_locked()
    }

    /// Locks immediately, e.g. on hard drop.
    pub fn force_lock(&mut self) {
        self.state = LockState::Locked;
    }
}

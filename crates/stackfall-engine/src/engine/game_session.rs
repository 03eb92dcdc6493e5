use std::time::Duration;

use arrayvec::ArrayVec;

use crate::{
    Action, DisplayConfig, EngineConfig, GameEvent, GameOverCause, HoldError, LockState,
    core::{
        board::Board,
        piece::{Piece, PieceKind, RotationDirection},
    },
};

use super::{
    GameStats,
    game_field::GameField,
    gravity_clock::GravityClock,
    input::InputScheduler,
    lock_delay::{GroundCause, LockDelay},
    piece_buffer::PieceSeed,
};

/// Largest preview published in a [`GameSnapshot`].
pub const MAX_PREVIEW_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum SessionState {
    Playing,
    Paused,
    GameOver,
}

/// Read-only view of a session, republished once per frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub board: Board,
    pub falling_piece: Piece,
    /// Landing position of the falling piece, if the ghost is enabled.
    pub ghost_piece: Option<Piece>,
    pub held_piece: Option<PieceKind>,
    pub can_hold: bool,
    pub next_pieces: ArrayVec<PieceKind, MAX_PREVIEW_LEN>,
    pub score: usize,
    pub lines: usize,
    pub level: usize,
    pub combo: usize,
    pub lock_state: LockState,
    pub session_state: SessionState,
    pub display: DisplayConfig,
}

/// One game, from first spawn to game over.
///
/// The session owns all engine state. The host forwards key edges through
/// [`GameSession::key_down`] / [`GameSession::key_up`] and calls
/// [`GameSession::update`] once per frame with a monotonic timestamp.
///
/// Time only advances while the session is playing: paused time never
/// reaches gravity, lock delay or auto-repeat.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use stackfall_engine::{EngineConfig, GameSession, PieceSeed};
///
/// let mut session = GameSession::with_seed(EngineConfig::default(), PieceSeed::from_bytes([1; 16]));
/// let start_y = session.snapshot().falling_piece.position().y();
///
/// // One second of 60Hz frames: one gravity step at level 1.
/// for frame in 0..=60 {
///     session.update(Duration::from_micros(frame * 16_667));
/// }
/// assert_eq!(session.snapshot().falling_piece.position().y(), start_y + 1);
///
/// session.key_down("Space");
/// assert!(session.drain_events().any(|e| e.is_piece_locked()));
/// ```
#[derive(Debug, Clone)]
pub struct GameSession {
    config: EngineConfig,
    seed: Option<PieceSeed>,
    field: GameField,
    stats: GameStats,
    lock: LockDelay,
    gravity: GravityClock,
    input: InputScheduler,
    session_state: SessionState,
    game_over_cause: Option<GameOverCause>,
    game_time: Duration,
    last_update: Option<Duration>,
    events: Vec<GameEvent>,
    snapshot: GameSnapshot,
}

impl GameSession {
    /// Starts a session with a random piece sequence.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::build(config, None, GameField::new())
    }

    /// Starts a session whose piece sequence (and that of every restart) is
    /// determined by `seed`.
    #[must_use]
    pub fn with_seed(config: EngineConfig, seed: PieceSeed) -> Self {
        Self::build(config, Some(seed), GameField::with_seed(seed))
    }

    /// Starts a session from a prepared field. Restarts use a random seed.
    #[must_use]
    pub fn with_field(config: EngineConfig, field: GameField) -> Self {
        Self::build(config, None, field)
    }

    fn build(config: EngineConfig, seed: Option<PieceSeed>, field: GameField) -> Self {
        let stats = GameStats::new();
        let lock = LockDelay::new(&config.lock);
        let step = config.gravity.step_for_level(stats.level());
        let snapshot = snapshot_of(&config, &field, &stats, &lock, SessionState::Playing);
        tracing::info!(seeded = seed.is_some(), ?step, "game started");
        Self {
            gravity: GravityClock::new(&config.frame, step),
            input: InputScheduler::new(&config.handling, step),
            config,
            seed,
            field,
            stats,
            lock,
            session_state: SessionState::Playing,
            game_over_cause: None,
            game_time: Duration::ZERO,
            last_update: None,
            events: Vec::new(),
            snapshot,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn field(&self) -> &GameField {
        &self.field
    }

    #[must_use]
    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    /// Why the game ended, once it has.
    #[must_use]
    pub fn game_over_cause(&self) -> Option<GameOverCause> {
        self.game_over_cause
    }

    #[must_use]
    pub fn lock_state(&self) -> LockState {
        self.lock.state()
    }

    /// Time spent playing, excluding pauses.
    #[must_use]
    pub fn game_time(&self) -> Duration {
        self.game_time
    }

    /// The snapshot published by the last update or state change.
    #[must_use]
    pub fn snapshot(&self) -> &GameSnapshot {
        &self.snapshot
    }

    /// Removes and returns all queued events, oldest first.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GameEvent> {
        self.events.drain(..)
    }

    /// Applies new settings to the running game.
    ///
    /// Held keys stay armed and the lock timer keeps its state.
    pub fn apply_config(&mut self, config: EngineConfig) {
        let step = config.gravity.step_for_level(self.stats.level());
        self.lock.apply_config(&config.lock);
        self.gravity.apply_frame_config(&config.frame);
        self.gravity.set_step(step);
        self.input.apply_handling(&config.handling, step);
        self.config = config;
        self.publish_snapshot();
        tracing::debug!("configuration applied");
    }

    /// Throws the current game away and starts a new one.
    pub fn restart(&mut self) {
        let field = self.seed.map_or_else(GameField::new, GameField::with_seed);
        *self = Self::build(self.config.clone(), self.seed, field);
    }

    pub fn toggle_pause(&mut self) {
        self.session_state = match self.session_state {
            SessionState::Playing => {
                self.events.push(GameEvent::Paused);
                SessionState::Paused
            }
            SessionState::Paused => {
                self.gravity.resync();
                self.events.push(GameEvent::Resumed);
                SessionState::Playing
            }
            SessionState::GameOver => SessionState::GameOver, // No change from game over
        };
        self.last_update = None;
        self.publish_snapshot();
    }

    /// Handles a key-down edge for a physical key identifier, timed at the
    /// last update.
    ///
    /// Unbound keys are ignored. While paused only the pause key is honored.
    pub fn key_down(&mut self, key: &str) {
        self.press(key, self.game_time);
    }

    /// Like [`GameSession::key_down`], with the host time the key went down.
    ///
    /// Debounce and DAS are measured from `now` instead of the last update,
    /// so two presses within one frame keep their real spacing. `now` uses
    /// the same clock as [`GameSession::update`].
    pub fn key_down_at(&mut self, key: &str, now: Duration) {
        self.press(key, self.game_time_at(now));
    }

    /// Game-clock reading for host time `now`, without advancing the clock.
    fn game_time_at(&self, now: Duration) -> Duration {
        match self.last_update {
            Some(last) if self.session_state.is_playing() => {
                self.game_time.saturating_add(now.saturating_sub(last))
            }
            _ => self.game_time,
        }
    }

    fn press(&mut self, key: &str, at: Duration) {
        let Some(action) = self.config.key_bindings.action(key) else {
            return;
        };
        if action.is_pause() {
            if self.input.key_down(action, at).is_some() {
                self.toggle_pause();
            }
            return;
        }
        if !self.session_state.is_playing() {
            return;
        }
        if let Some(action) = self.input.key_down(action, at) {
            self.perform(action);
        }
    }

    /// Handles a key-up edge. Releases are honored in every state.
    pub fn key_up(&mut self, key: &str) {
        if let Some(action) = self.config.key_bindings.action(key) {
            self.input.key_up(action);
        }
    }

    /// Advances the session to host time `now` and republishes the snapshot.
    ///
    /// Within one update, auto-repeats run before gravity. The first update
    /// and the first update after a pause contribute no time.
    pub fn update(&mut self, now: Duration) -> &GameSnapshot {
        if self.session_state.is_playing() {
            let delta = self
                .last_update
                .map_or(Duration::ZERO, |last| now.saturating_sub(last));
            self.game_time += delta;
            self.last_update = Some(now);
            self.step_simulation();
        }
        self.publish_snapshot();
        &self.snapshot
    }

    fn step_simulation(&mut self) {
        let now = self.game_time;
        for action in self.input.update(now) {
            if !self.session_state.is_playing() {
                return;
            }
            self.perform(action);
        }

        let plan = self.gravity.advance(now);
        for _ in 0..plan.steps_to_run {
            if !self.session_state.is_playing() {
                return;
            }
            self.gravity_step();
            self.check_lock();
        }
        if self.session_state.is_playing() {
            self.check_lock();
        }
    }

    /// Applies one action to the falling piece, as if its key was pressed.
    pub fn perform(&mut self, action: Action) {
        if action.is_pause() {
            self.toggle_pause();
            return;
        }
        if !self.session_state.is_playing() {
            return;
        }
        match action {
            Action::MoveLeft => self.try_shift(-1),
            Action::MoveRight => self.try_shift(1),
            Action::SoftDrop => self.soft_drop(),
            Action::RotateClockwise => self.try_rotate(RotationDirection::Clockwise),
            Action::RotateCounterClockwise => {
                self.try_rotate(RotationDirection::CounterClockwise);
            }
            Action::HardDrop => self.hard_drop(),
            Action::Hold => {
                if let Err(e) = self.try_hold() {
                    tracing::debug!(error = %e, "hold rejected");
                }
            }
            Action::Pause => {}
        }
    }

    fn try_shift(&mut self, dx: i32) {
        if self.field.try_shift(dx, 0) {
            self.lock.on_piece_moved(self.game_time, self.field.is_grounded());
        }
    }

    fn try_rotate(&mut self, direction: RotationDirection) {
        if self.field.try_rotate(direction) {
            self.lock.on_piece_moved(self.game_time, self.field.is_grounded());
        }
    }

    fn gravity_step(&mut self) {
        if self.field.try_shift(0, 1) {
            self.lock.on_piece_fell();
        } else {
            self.lock.on_drop_blocked(self.game_time, GroundCause::Gravity);
        }
    }

    fn soft_drop(&mut self) {
        if self.field.try_shift(0, 1) {
            self.lock.on_piece_fell();
        } else {
            self.lock.on_drop_blocked(self.game_time, GroundCause::SoftDrop);
            self.check_lock();
        }
    }

    fn hard_drop(&mut self) {
        let distance = self.field.hard_drop();
        self.events.push(GameEvent::HardDrop { distance });
        self.lock.force_lock();
        self.lock_and_spawn();
    }

    pub fn try_hold(&mut self) -> Result<(), HoldError> {
        if !self.session_state.is_playing() {
            return Err(HoldError::NotPlaying);
        }
        self.field.try_hold()?;
        self.lock.reset();
        self.events.push(GameEvent::Hold);
        Ok(())
    }

    fn check_lock(&mut self) {
        if self.lock.poll(self.game_time) {
            self.lock_and_spawn();
        }
    }

    fn lock_and_spawn(&mut self) {
        let piece = self.field.falling_piece();
        let rows = match self.field.lock_piece() {
            Ok(rows) => rows,
            Err(cause) => {
                self.end_game(cause);
                return;
            }
        };
        self.events.push(GameEvent::PieceLocked {
            piece: self.field.falling_piece(),
        });

        let outcome = self.stats.complete_piece_drop(rows.len());
        if !rows.is_empty() {
            tracing::debug!(kind = ?piece.kind(), rows = ?rows.as_slice(), "lines cleared");
            self.events.push(GameEvent::LinesCleared {
                count: rows.len(),
                rows,
            });
        }
        if outcome.score_delta > 0 {
            self.events.push(GameEvent::ScoreChanged {
                delta: outcome.score_delta,
                total: self.stats.score(),
            });
        }
        if outcome.combo >= 2 {
            self.events.push(GameEvent::Combo {
                count: outcome.combo,
            });
        }
        if let Some(level) = outcome.level_up {
            let step = self.config.gravity.step_for_level(level);
            self.gravity.set_step(step);
            self.input.set_gravity_step(step);
            self.events.push(GameEvent::LevelUp { level });
            tracing::info!(level, ?step, "level up");
        }

        self.lock.reset();
        if let Err(cause) = self.field.spawn_next() {
            self.end_game(cause);
        }
    }

    fn end_game(&mut self, cause: GameOverCause) {
        let final_score = self.stats.score();
        if cause.is_fault() {
            tracing::error!(%cause, final_score, "game aborted");
        } else {
            tracing::info!(%cause, final_score, lines = self.stats.total_cleared_lines(), "game over");
        }
        self.session_state = SessionState::GameOver;
        self.game_over_cause = Some(cause);
        self.input.release_all();
        self.events.push(GameEvent::GameOver { final_score });
    }

    fn publish_snapshot(&mut self) {
        self.snapshot = snapshot_of(
            &self.config,
            &self.field,
            &self.stats,
            &self.lock,
            self.session_state,
        );
    }
}

fn snapshot_of(
    config: &EngineConfig,
    field: &GameField,
    stats: &GameStats,
    lock: &LockDelay,
    session_state: SessionState,
) -> GameSnapshot {
    let preview_len = config.frame.preview_len.min(MAX_PREVIEW_LEN);
    GameSnapshot {
        board: field.board().clone(),
        falling_piece: field.falling_piece(),
        ghost_piece: config.display.ghost_piece.then(|| field.ghost_piece()),
        held_piece: field.held_piece(),
        can_hold: field.can_hold(),
        next_pieces: field.next_pieces().take(preview_len).collect(),
        score: stats.score(),
        lines: stats.total_cleared_lines(),
        level: stats.level(),
        combo: stats.combo(),
        lock_state: lock.state(),
        session_state,
        display: config.display.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FrameConfig, GravityConfig, HandlingConfig, LockConfig};

    const SEED: PieceSeed = PieceSeed::from_bytes([5; 16]);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn session() -> GameSession {
        GameSession::with_seed(EngineConfig::default(), SEED)
    }

    #[test]
    fn test_new_session_is_playing() {
        let session = session();
        assert!(session.session_state().is_playing());
        assert_eq!(session.snapshot().level, 1);
        assert_eq!(session.snapshot().next_pieces.len(), 5);
        assert!(session.snapshot().ghost_piece.is_some());
        assert_eq!(session.game_over_cause(), None);
    }

    #[test]
    fn test_unbound_keys_are_ignored() {
        let mut session = session();
        let before = session.snapshot().clone();
        session.key_down("F13");
        session.key_up("F13");
        session.update(ms(0));
        assert_eq!(session.snapshot(), &before);
    }

    #[test]
    fn test_move_key_shifts_piece_immediately() {
        let mut session = session();
        let x = session.field().falling_piece().position().x();
        session.key_down("ArrowLeft");
        assert_eq!(session.field().falling_piece().position().x(), x - 1);
    }

    #[test]
    fn test_timed_key_edges_keep_spacing_within_a_frame() {
        let mut session = session();
        let x = session.field().falling_piece().position().x();
        session.update(ms(0));

        session.key_down_at("ArrowLeft", ms(2));
        session.key_up("ArrowLeft");
        // Within the 10ms debounce of the first press.
        session.key_down_at("ArrowLeft", ms(8));
        session.key_up("ArrowLeft");
        session.key_down_at("ArrowLeft", ms(14));
        assert_eq!(session.field().falling_piece().position().x(), x - 2);

        // DAS counts from the press at 14ms, not from the last update.
        session.update(ms(180));
        assert_eq!(session.field().falling_piece().position().x(), x - 2);
        session.update(ms(184));
        assert_eq!(session.field().falling_piece().position().x(), x - 3);
    }

    #[test]
    fn test_untimed_presses_within_a_frame_are_debounced() {
        let mut session = session();
        let x = session.field().falling_piece().position().x();
        session.update(ms(0));
        session.key_down("ArrowLeft");
        session.key_up("ArrowLeft");
        session.key_down("ArrowLeft");
        assert_eq!(session.field().falling_piece().position().x(), x - 1);
    }

    #[test]
    fn test_pause_blocks_actions_but_not_release() {
        let mut session = session();
        session.key_down("p");
        assert!(session.session_state().is_paused());
        let piece = session.field().falling_piece();
        session.key_down("ArrowLeft");
        assert_eq!(session.field().falling_piece(), piece);
        session.key_up("p");
        session.key_down("Escape");
        assert!(session.session_state().is_playing());
        let events: Vec<_> = session.drain_events().collect();
        assert_eq!(events, [GameEvent::Paused, GameEvent::Resumed]);
    }

    #[test]
    fn test_game_time_excludes_pause() {
        let mut session = session();
        session.update(ms(0));
        session.update(ms(100));
        session.toggle_pause();
        session.update(ms(5000));
        session.toggle_pause();
        session.update(ms(6000));
        session.update(ms(6050));
        assert_eq!(session.game_time(), ms(150));
    }

    #[test]
    fn test_hold_emits_event_and_is_limited() {
        let mut session = session();
        session.key_down("c");
        session.update(ms(0));
        assert_eq!(session.try_hold(), Err(HoldError::HoldAlreadyUsed));
        assert!(session.snapshot().held_piece.is_some());
        assert!(!session.snapshot().can_hold);
        assert!(session.drain_events().any(|e| e == GameEvent::Hold));
    }

    #[test]
    fn test_hard_drop_locks_and_spawns() {
        let mut session = session();
        let first = session.field().falling_piece();
        let next = session.field().next_pieces().next().unwrap();
        session.key_down("Space");
        let events: Vec<_> = session.drain_events().collect();
        assert!(matches!(events[0], GameEvent::HardDrop { distance } if distance > 0));
        assert!(matches!(events[1], GameEvent::PieceLocked { piece } if piece.kind() == first.kind()));
        assert_eq!(session.field().falling_piece().kind(), next);
        assert!(session.lock_state().is_airborne());
    }

    #[test]
    fn test_ghost_piece_can_be_disabled() {
        let mut session = session();
        let mut config = session.config().clone();
        config.display.ghost_piece = false;
        config.display.grid_lines = true;
        session.apply_config(config);
        assert_eq!(session.snapshot().ghost_piece, None);
        assert!(session.snapshot().display.grid_lines);
    }

    #[test]
    fn test_apply_config_changes_gravity() {
        let mut session = session();
        let config = EngineConfig {
            gravity: GravityConfig {
                table_ms: vec![10],
                ..GravityConfig::default()
            },
            ..EngineConfig::default()
        };
        session.apply_config(config);
        let y = session.field().falling_piece().position().y();
        session.update(ms(0));
        session.update(ms(16));
        assert_eq!(session.field().falling_piece().position().y(), y + 1);
    }

    #[test]
    fn test_extreme_soft_drop_factors_keep_session_running() {
        let config: EngineConfig = serde_json::from_str(
            r#"{
                "handling": { "soft_drop_factor": 1e-300 },
                "lock": { "soft_drop_factor": 1e300 }
            }"#,
        )
        .unwrap();
        let mut session = GameSession::with_seed(config.clone(), SEED);
        session.apply_config(config);

        session.key_down("ArrowDown");
        for t in 0..=20 {
            session.update(ms(t * 100));
        }
        assert!(session.session_state().is_playing());

        let fast = EngineConfig {
            handling: HandlingConfig {
                soft_drop_factor: 1e300,
                ..HandlingConfig::default()
            },
            ..EngineConfig::default()
        };
        session.apply_config(fast);
        session.update(ms(2100));
        assert!(session.session_state().is_playing());
    }

    #[test]
    fn test_zero_frame_interval_keeps_gravity_running() {
        let config = EngineConfig {
            frame: FrameConfig {
                frame_interval_us: 0,
                ..FrameConfig::default()
            },
            ..EngineConfig::default()
        };
        let mut session = GameSession::with_seed(config, SEED);
        let y = session.field().falling_piece().position().y();
        for f in 0..=600 {
            session.update(Duration::from_micros(f * 16_667));
        }
        assert_eq!(session.field().falling_piece().position().y(), y + 10);
    }

    #[test]
    fn test_soft_drop_contact_locks_immediately() {
        let mut session = session();
        let config = EngineConfig {
            lock: LockConfig {
                soft_drop_factor: 0.0,
                ..LockConfig::default()
            },
            ..EngineConfig::default()
        };
        session.apply_config(config);
        // Walk the piece down to the floor one soft drop at a time.
        for _ in 0..40 {
            session.perform(Action::SoftDrop);
            if session.stats().completed_pieces() == 1 {
                break;
            }
        }
        assert_eq!(session.stats().completed_pieces(), 1);
    }

    #[test]
    fn test_unrepairable_lock_position_ends_game_once() {
        let mut field = GameField::with_seed(SEED);
        field
            .set_falling_piece(Piece::new(PieceKind::O).at(4, 16))
            .unwrap();
        // The stack now covers the piece and the three rows above it.
        *field.board_mut() = Board::from_ascii(&"....##....\n".repeat(8));
        let mut session = GameSession::with_field(EngineConfig::default(), field);

        session.key_down("Space");
        session.update(ms(0));
        session.update(ms(100));

        assert!(session.session_state().is_game_over());
        let cause = session.game_over_cause().unwrap();
        assert_eq!(cause, GameOverCause::UnfixablePosition);
        assert!(cause.is_fault());
        let events: Vec<_> = session.drain_events().collect();
        assert!(!events.iter().any(GameEvent::is_piece_locked));
        let game_overs: Vec<_> = events.iter().filter(|e| e.is_game_over()).collect();
        assert_eq!(game_overs, [&GameEvent::GameOver { final_score: 0 }]);
    }

    #[test]
    fn test_restart_with_seed_repeats_sequence() {
        let mut session = session();
        let first = session.field().falling_piece().kind();
        session.key_down("Space");
        session.key_down("ArrowLeft");
        session.restart();
        assert_eq!(session.field().falling_piece().kind(), first);
        assert_eq!(session.stats().completed_pieces(), 0);
        assert_eq!(session.drain_events().count(), 0);
    }
}

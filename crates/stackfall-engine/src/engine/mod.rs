//! Real-time game logic built on the core data structures.
//!
//! - [`GameSession`] - Owns a running game: key edges in, snapshots and events out
//! - [`GameField`] - Board, falling piece, piece buffer and the lock pipeline
//! - [`GameStats`] - Score, lines, level and combo
//! - [`LockDelay`] - Airborne/grounded/locked state machine
//! - [`GravityClock`] - Fixed-step gravity accumulator with a per-frame cap
//! - [`InputScheduler`] - DAS/ARR auto-repeat
//! - [`PieceBuffer`] - 7-bag piece generation and hold slot
//! - [`EngineConfig`] - Settings supplied by the host
//!
//! # Frame Flow
//!
//! Each call to [`GameSession::update`]:
//!
//! 1. Advances the game clock (only while playing)
//! 2. Fires due auto-repeats from the [`InputScheduler`]
//! 3. Runs the gravity steps the [`GravityClock`] reports, checking the lock
//!    delay after each
//! 4. Checks the lock delay once more
//! 5. Republishes the [`GameSnapshot`]
//!
//! Key edges are applied as soon as they arrive, between updates.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use stackfall_engine::{EngineConfig, GameEvent, GameSession};
//!
//! let mut session = GameSession::new(EngineConfig::default());
//!
//! session.key_down("ArrowLeft");
//! session.key_up("ArrowLeft");
//! session.key_down("Space");
//! session.update(Duration::ZERO);
//!
//! for event in session.drain_events() {
//!     if let GameEvent::GameOver { final_score } = event {
//!         println!("Game over: {final_score}");
//!     }
//! }
//! ```

pub use self::{
    config::*, game_event::*, game_field::*, game_session::*, game_stats::*, gravity_clock::*,
    input::*, lock_delay::*, piece_buffer::*,
};

mod config;
mod game_event;
mod game_field;
mod game_session;
mod game_stats;
mod gravity_clock;
mod input;
mod lock_delay;
mod piece_buffer;

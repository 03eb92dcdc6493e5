//! Real-time falling-block engine: SRS rotation, gravity, lock delay and a
//! DAS/ARR input scheduler, driven one frame at a time by a host.
//!
//! The crate has no rendering, audio or I/O. A presentation layer feeds it
//! key edges and frame timestamps, then reads back a [`GameSnapshot`] and
//! drains [`GameEvent`]s.

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

/// A lock attempted to write onto an occupied or out-of-bounds cell.
///
/// This means the collision checks and the lock state machine disagree about
/// where the piece is; the session treats it as a fatal fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("illegal merge: cell ({x}, {y}) is occupied or out of bounds")]
pub struct IllegalMergeError {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("piece colliding when setting falling piece")]
pub struct PieceCollisionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum HoldError {
    #[display("piece colliding when holding piece")]
    PieceCollision(PieceCollisionError),
    #[display("hold already used in this turn")]
    HoldAlreadyUsed,
    #[display("session is not playing")]
    NotPlaying,
}

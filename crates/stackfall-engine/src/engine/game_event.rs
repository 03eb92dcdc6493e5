use crate::{IllegalMergeError, Piece, RowIndices};

/// Notifications queued by [`GameSession`](crate::GameSession) for the host.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::IsVariant)]
pub enum GameEvent {
    /// The falling piece was merged into the board.
    PieceLocked { piece: Piece },
    /// Rows cleared by the last lock, as indices before compaction.
    LinesCleared { count: usize, rows: RowIndices },
    ScoreChanged { delta: usize, total: usize },
    LevelUp { level: usize },
    /// Second or later consecutive clearing lock.
    Combo { count: usize },
    /// Rows travelled by a hard drop.
    HardDrop { distance: u32 },
    Hold,
    Paused,
    Resumed,
    GameOver { final_score: usize },
}

/// Why a game ended.
///
/// Hosts only see [`GameEvent::GameOver`]; the cause is kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum GameOverCause {
    #[display("spawned piece collides with the stack")]
    SpawnCollision,
    #[display("piece locked above the visible board")]
    CeilingTopOut,
    #[display("{_0}")]
    IllegalMerge(IllegalMergeError),
    #[display("piece position could not be repaired before locking")]
    UnfixablePosition,
}

impl GameOverCause {
    /// Whether the cause is an engine fault rather than a normal top-out.
    #[must_use]
    pub fn is_fault(self) -> bool {
        matches!(
            self,
            GameOverCause::IllegalMerge(_) | GameOverCause::UnfixablePosition
        )
    }
}

use crate::{
    GameOverCause, HoldError, PieceCollisionError,
    core::{
        board::{Board, RowIndices},
        collision::{self, Move},
        piece::{Piece, PieceKind, RotationDirection},
    },
};

use super::piece_buffer::{PieceBuffer, PieceSeed};

/// Board, falling piece and piece buffer of one game.
///
/// Moves that would collide are rejected and leave the field unchanged.
#[derive(Debug, Clone)]
pub struct GameField {
    board: Board,
    falling_piece: Piece,
    piece_buffer: PieceBuffer,
    hold_used: bool,
}

impl Default for GameField {
    fn default() -> Self {
        Self::new()
    }
}

impl GameField {
    #[must_use]
    pub fn new() -> Self {
        Self::from_buffer(Board::EMPTY, PieceBuffer::new())
    }

    #[must_use]
    pub fn with_seed(seed: PieceSeed) -> Self {
        Self::from_buffer(Board::EMPTY, PieceBuffer::with_seed(seed))
    }

    /// Starts a game on a pre-filled board.
    #[must_use]
    pub fn with_board(board: Board, seed: PieceSeed) -> Self {
        Self::from_buffer(board, PieceBuffer::with_seed(seed))
    }

    fn from_buffer(board: Board, mut piece_buffer: PieceBuffer) -> Self {
        let falling_piece = Piece::new(piece_buffer.pop_next());
        Self {
            board,
            falling_piece,
            piece_buffer,
            hold_used: false,
        }
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    #[must_use]
    pub fn falling_piece(&self) -> Piece {
        self.falling_piece
    }

    pub fn set_falling_piece(&mut self, piece: Piece) -> Result<(), PieceCollisionError> {
        if !collision::fits(&self.board, &piece) {
            return Err(PieceCollisionError);
        }
        self.falling_piece = piece;
        Ok(())
    }

    #[must_use]
    pub fn held_piece(&self) -> Option<PieceKind> {
        self.piece_buffer.held_piece()
    }

    pub fn next_pieces(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.piece_buffer.next_pieces()
    }

    /// Hard-drop landing position of the falling piece.
    #[must_use]
    pub fn ghost_piece(&self) -> Piece {
        collision::hard_drop_position(&self.board, &self.falling_piece).0
    }

    #[must_use]
    pub fn is_grounded(&self) -> bool {
        collision::is_grounded(&self.board, &self.falling_piece)
    }

    /// Moves the falling piece by `(dx, dy)` if the target is free.
    pub fn try_shift(&mut self, dx: i32, dy: i32) -> bool {
        let moved = collision::apply_move(&self.board, &self.falling_piece, Move::shift(dx, dy));
        let changed = moved != self.falling_piece;
        self.falling_piece = moved;
        changed
    }

    /// Rotates the falling piece with wall kicks.
    pub fn try_rotate(&mut self, direction: RotationDirection) -> bool {
        match collision::rotate(&self.board, &self.falling_piece, direction) {
            Some(piece) => {
                self.falling_piece = piece;
                true
            }
            None => false,
        }
    }

    /// Drops the falling piece to its landing row and returns the distance.
    pub fn hard_drop(&mut self) -> u32 {
        let (piece, distance) = collision::hard_drop_position(&self.board, &self.falling_piece);
        self.falling_piece = piece;
        distance
    }

    #[must_use]
    pub fn hold_used(&self) -> bool {
        self.hold_used
    }

    #[must_use]
    pub fn can_hold(&self) -> bool {
        !self.hold_used && self.check_hold().is_ok()
    }

    fn check_hold(&self) -> Result<Piece, PieceCollisionError> {
        let piece = Piece::new(self.piece_buffer.peek_hold_result());
        if collision::is_game_over(&self.board, &piece) {
            return Err(PieceCollisionError);
        }
        Ok(piece)
    }

    /// Swaps the falling piece with the hold slot. Allowed once per piece.
    pub fn try_hold(&mut self) -> Result<(), HoldError> {
        if self.hold_used {
            return Err(HoldError::HoldAlreadyUsed);
        }
        self.check_hold().map_err(HoldError::PieceCollision)?;

        let next_piece = self.piece_buffer.hold(self.falling_piece.kind());
        self.falling_piece = Piece::new(next_piece);
        self.hold_used = true;
        Ok(())
    }

    /// Merges the falling piece into the board and clears full rows.
    ///
    /// An invalid lock position is first repaired by lifting the piece. The
    /// board is left without the piece if it cannot be merged.
    pub fn lock_piece(&mut self) -> Result<RowIndices, GameOverCause> {
        let piece = collision::validate_piece_position(&self.board, &self.falling_piece)
            .ok_or(GameOverCause::UnfixablePosition)?;
        if piece != self.falling_piece {
            tracing::warn!(
                kind = ?piece.kind(),
                from = ?self.falling_piece.position(),
                to = ?piece.position(),
                "repaired invalid lock position"
            );
            self.falling_piece = piece;
        }

        self.board
            .merge_piece(piece)
            .map_err(GameOverCause::IllegalMerge)?;
        if collision::would_lock_above_ceiling(&piece) {
            return Err(GameOverCause::CeilingTopOut);
        }
        Ok(self.board.clear_lines())
    }

    /// Spawns the next piece from the queue.
    ///
    /// The piece is placed even when it overlaps the stack so the final
    /// position stays visible.
    pub fn spawn_next(&mut self) -> Result<(), GameOverCause> {
        self.falling_piece = Piece::new(self.piece_buffer.pop_next());
        self.hold_used = false;
        if collision::is_game_over(&self.board, &self.falling_piece) {
            return Err(GameOverCause::SpawnCollision);
        }
        Ok(())
    }
}

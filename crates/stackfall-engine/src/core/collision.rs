//! Position validity, SRS wall kicks, and top-out checks.
//!
//! Every function here is pure: it reads the board and a piece and returns a
//! verdict or a new piece. Invalid requests are never errors; they produce
//! `false`, `None`, or the unchanged piece.

use super::{
    WIDTH_I32,
    board::Board,
    piece::{Piece, PieceKind, RotationDirection},
};

/// A combined movement request applied by [`apply_move`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub dx: i32,
    pub dy: i32,
    pub rotation: Option<RotationDirection>,
}

impl Move {
    #[must_use]
    pub const fn shift(dx: i32, dy: i32) -> Self {
        Self {
            dx,
            dy,
            rotation: None,
        }
    }

    #[must_use]
    pub const fn rotate(direction: RotationDirection) -> Self {
        Self {
            dx: 0,
            dy: 0,
            rotation: Some(direction),
        }
    }
}

/// Checks whether `piece`, placed with its box at `(x, y)`, fits on the board.
///
/// A cell is rejected when its column leaves `[0, WIDTH)`, its row reaches
/// `HEIGHT`, or it lands on an occupied visible cell. Rows above the grid
/// are skipped for occupancy.
#[must_use]
pub fn is_valid_position(board: &Board, piece: &Piece, x: i32, y: i32) -> bool {
    piece
        .kind()
        .occupied_offsets(piece.rotation())
        .all(|(dx, dy)| board.is_cell_empty(x + dx, y + dy))
}

/// Checks whether the piece fits where it currently is.
#[must_use]
pub fn fits(board: &Board, piece: &Piece) -> bool {
    let pos = piece.position();
    is_valid_position(board, piece, pos.x(), pos.y())
}

/// A piece is grounded when it cannot move one row down.
#[must_use]
pub fn is_grounded(board: &Board, piece: &Piece) -> bool {
    let pos = piece.position();
    !is_valid_position(board, piece, pos.x(), pos.y() + 1)
}

/// Rotates the piece using the SRS kick tables.
///
/// Kick offsets are tried in table order and the first valid one wins. While
/// the piece can still fall, offsets that would push it upward are skipped so
/// a floating piece cannot climb by rotating.
///
/// Returns `None` when every offset fails.
#[must_use]
pub fn rotate(board: &Board, piece: &Piece, direction: RotationDirection) -> Option<Piece> {
    let grounded = is_grounded(board, piece);
    let rotated = piece.rotated(direction);
    let pos = piece.position();
    kick_offsets(piece.kind(), piece.rotation().as_usize(), direction)
        .iter()
        .filter(|&&(_, dy)| grounded || dy >= 0)
        .map(|&(dx, dy)| (pos.x() + dx, pos.y() + dy))
        .find(|&(x, y)| is_valid_position(board, &rotated, x, y))
        .map(|(x, y)| rotated.at(x, y))
}

/// Applies rotation, then horizontal, then vertical movement.
///
/// Each part is attempted independently and silently skipped when invalid, so
/// this never fails; it returns the original piece when nothing could move.
#[must_use]
pub fn apply_move(board: &Board, piece: &Piece, request: Move) -> Piece {
    let mut piece = *piece;
    if let Some(direction) = request.rotation {
        if let Some(rotated) = rotate(board, &piece, direction) {
            piece = rotated;
        }
    }
    for (dx, dy) in [(request.dx, 0), (0, request.dy)] {
        if (dx, dy) == (0, 0) {
            continue;
        }
        let moved = piece.shifted(dx, dy);
        if fits(board, &moved) {
            piece = moved;
        }
    }
    piece
}

/// Returns the lowest valid row strictly below the current row, or `None`
/// when the piece is already resting.
#[must_use]
pub fn ghost_row(board: &Board, piece: &Piece) -> Option<i32> {
    let pos = piece.position();
    let mut y = pos.y();
    while is_valid_position(board, piece, pos.x(), y + 1) {
        y += 1;
    }
    (y > pos.y()).then_some(y)
}

/// Moves the piece to its landing row and returns it with the distance
/// dropped.
#[must_use]
pub fn hard_drop_position(board: &Board, piece: &Piece) -> (Piece, u32) {
    match ghost_row(board, piece) {
        Some(y) => {
            let distance = (y - piece.position().y()).unsigned_abs();
            (piece.at(piece.position().x(), y), distance)
        }
        None => (*piece, 0),
    }
}

/// True when any occupied cell is still above the visible grid.
#[must_use]
pub fn would_lock_above_ceiling(piece: &Piece) -> bool {
    piece.occupied_positions().any(|(_, y)| y < 0)
}

/// Spawn check for a freshly created piece.
///
/// True when a cell leaves the horizontal bounds, or a visible cell overlaps
/// an occupied board cell.
#[must_use]
pub fn is_game_over(board: &Board, piece: &Piece) -> bool {
    piece.occupied_positions().any(|(x, y)| {
        !(0..WIDTH_I32).contains(&x) || (y >= 0 && !board.is_cell_empty(x, y))
    })
}

/// Lock-time repair for a piece whose position has become invalid.
///
/// Returns the piece unchanged when it fits, otherwise the first placement
/// 1 to 3 rows higher that fits. `None` means the state is unrecoverable.
#[must_use]
pub fn validate_piece_position(board: &Board, piece: &Piece) -> Option<Piece> {
    (0..=MAX_REPAIR_LIFT)
        .map(|lift| piece.shifted(0, -lift))
        .find(|candidate| fits(board, candidate))
}

const MAX_REPAIR_LIFT: i32 = 3;

/// Kick offsets `(dx, dy)` for one rotation transition, `y` growing downward.
type KickTable = [[(i32, i32); 5]; 8];

/// Row index into a [`KickTable`] for a transition.
///
/// Rows are ordered `0→1, 0→3, 1→2, 1→0, 2→3, 2→1, 3→0, 3→2`.
const fn kick_index(from: usize, direction: RotationDirection) -> usize {
    match direction {
        RotationDirection::Clockwise => from * 2,
        RotationDirection::CounterClockwise => from * 2 + 1,
    }
}

fn kick_offsets(
    kind: PieceKind,
    from: usize,
    direction: RotationDirection,
) -> &'static [(i32, i32); 5] {
    let table = match kind {
        PieceKind::I => &I_KICKS,
        PieceKind::O => &O_KICKS,
        _ => &JLSTZ_KICKS,
    };
    &table[kick_index(from, direction)]
}

const O_KICKS: KickTable = [[(0, 0); 5]; 8];

// Standard SRS data with the vertical component negated for a downward y axis.
const JLSTZ_KICKS: KickTable = [
    // 0->1
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
    // 0->3
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    // 1->2
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
    // 1->0
    [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)],
    // 2->3
    [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)],
    // 2->1
    [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)],
    // 3->0
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
    // 3->2
    [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)],
];

const I_KICKS: KickTable = [
    // 0->1
    [(0, 0), (-2, 0), (1, 0), (-2, 1), (1, -2)],
    // 0->3
    [(0, 0), (-1, 0), (2, 0), (-1, -2), (2, 1)],
    // 1->2
    [(0, 0), (-1, 0), (2, 0), (-1, -2), (2, 1)],
    // 1->0
    [(0, 0), (2, 0), (-1, 0), (2, -1), (-1, 2)],
    // 2->3
    [(0, 0), (2, 0), (-1, 0), (2, -1), (-1, 2)],
    // 2->1
    [(0, 0), (1, 0), (-2, 0), (1, 2), (-2, -1)],
    // 3->0
    [(0, 0), (1, 0), (-2, 0), (1, 2), (-2, -1)],
    // 3->2
    [(0, 0), (-2, 0), (1, 0), (-2, 1), (1, -2)],
];

//! Board, piece catalog and the collision/rotation rules that connect them.
//!
//! Coordinates follow screen order: `x` grows to the right, `y` grows
//! downward, and row `0` is the topmost visible row. Rows with a negative
//! index form the spawn buffer above the visible grid.

pub use self::{board::*, collision::*, piece::*};

pub(crate) mod board;
pub(crate) mod collision;
pub(crate) mod piece;

/// Number of columns on the board.
pub const BOARD_WIDTH: usize = 10;
/// Number of visible rows on the board.
pub const BOARD_HEIGHT: usize = 20;

#[expect(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
const WIDTH_I32: i32 = BOARD_WIDTH as i32;
#[expect(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
const HEIGHT_I32: i32 = BOARD_HEIGHT as i32;

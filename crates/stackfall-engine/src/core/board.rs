use arrayvec::ArrayVec;

use crate::IllegalMergeError;

use super::{BOARD_HEIGHT, BOARD_WIDTH, HEIGHT_I32, WIDTH_I32, piece::Piece, piece::PieceKind};

/// A single cell of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Block {
    /// Empty cell.
    #[default]
    Empty,
    /// Locked cell of a specific piece type.
    Piece(PieceKind),
}

impl Block {
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Block::Empty
    }

    /// Color index of the cell: `0` when empty, the piece's color otherwise.
    #[must_use]
    pub fn color_index(self) -> u8 {
        match self {
            Block::Empty => 0,
            Block::Piece(kind) => kind.color_index(),
        }
    }
}

/// A single row of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardRow {
    cells: [Block; BOARD_WIDTH],
}

impl BoardRow {
    pub const EMPTY: Self = Self {
        cells: [Block::Empty; BOARD_WIDTH],
    };

    #[must_use]
    pub fn cells(&self) -> &[Block; BOARD_WIDTH] {
        &self.cells
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.cells.iter().all(|b| !b.is_empty())
    }
}

/// Indices of rows, ascending from top to bottom.
pub type RowIndices = ArrayVec<usize, BOARD_HEIGHT>;

/// The playfield: 20 visible rows of 10 cells.
///
/// Rows above row 0 (negative indices) form the spawn buffer. They are not
/// stored: reads treat them as empty and merges never write them.
///
/// The board is only mutated by [`Board::merge_piece`] and the line-clear
/// operations.
///
/// # Example
///
/// ```
/// use stackfall_engine::{Board, Piece, PieceKind};
///
/// let mut board = Board::EMPTY;
/// board.merge_piece(Piece::new(PieceKind::O).shifted(0, 18)).unwrap();
/// assert!(!board.is_cell_empty(4, 19));
/// assert!(board.is_cell_empty(4, -3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: [BoardRow; BOARD_HEIGHT],
}

impl Default for Board {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Board {
    pub const WIDTH: usize = BOARD_WIDTH;
    pub const HEIGHT: usize = BOARD_HEIGHT;

    pub const EMPTY: Self = Self {
        rows: [BoardRow::EMPTY; BOARD_HEIGHT],
    };

    /// Returns an iterator over the visible rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &BoardRow> {
        self.rows.iter()
    }

    /// Returns the block at `(x, y)`, or `None` outside the stored grid.
    #[must_use]
    pub fn block(&self, x: i32, y: i32) -> Option<Block> {
        let (x, y) = (usize::try_from(x).ok()?, usize::try_from(y).ok()?);
        self.rows.get(y)?.cells.get(x).copied()
    }

    /// Bounds-checked emptiness query.
    ///
    /// Columns outside `[0, WIDTH)` and rows at or below `HEIGHT` are never
    /// empty. Rows above the visible grid are always empty.
    #[must_use]
    pub fn is_cell_empty(&self, x: i32, y: i32) -> bool {
        if !(0..WIDTH_I32).contains(&x) || y >= HEIGHT_I32 {
            return false;
        }
        if y < 0 {
            return true;
        }
        self.block(x, y).is_some_and(Block::is_empty)
    }

    /// Writes the piece's cells into the grid.
    ///
    /// Every visible target cell is checked before anything is written, so a
    /// failed merge leaves the board untouched. Cells in the spawn buffer are
    /// dropped.
    pub fn merge_piece(&mut self, piece: Piece) -> Result<(), IllegalMergeError> {
        for (x, y) in piece.occupied_positions() {
            if !self.is_cell_empty(x, y) {
                return Err(IllegalMergeError { x, y });
            }
        }
        for (x, y) in piece.occupied_positions() {
            if let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) {
                self.rows[y].cells[x] = Block::Piece(piece.kind());
            }
        }
        Ok(())
    }

    /// Returns the indices of every filled row, top to bottom.
    #[must_use]
    pub fn full_rows(&self) -> RowIndices {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_filled())
            .map(|(y, _)| y)
            .collect()
    }

    /// Removes the given rows and shifts every row above them down.
    ///
    /// Remaining rows keep their relative order and empty rows are inserted
    /// at the top. Returns the number of rows removed.
    pub fn compact(&mut self, rows: &[usize]) -> usize {
        let mut removed = 0;
        for y in (0..BOARD_HEIGHT).rev() {
            if rows.contains(&y) {
                removed += 1;
                continue;
            }
            if removed > 0 {
                self.rows[y + removed] = self.rows[y];
            }
        }
        self.rows[..removed].fill(BoardRow::EMPTY);
        removed
    }

    /// Clears filled lines and returns their indices (before compaction).
    pub fn clear_lines(&mut self) -> RowIndices {
        let rows = self.full_rows();
        self.compact(&rows);
        rows
    }

    /// Creates a board from ASCII art for testing.
    ///
    /// `#` (or a piece letter) is an occupied cell and `.` an empty one. Each
    /// line must have exactly 10 cells. Lines are bottom-aligned: the last
    /// line becomes row 19.
    #[must_use]
    pub fn from_ascii(art: &str) -> Self {
        let mut board = Self::EMPTY;
        let lines: Vec<&str> = art.lines().filter(|line| !line.trim().is_empty()).collect();
        assert!(lines.len() <= BOARD_HEIGHT, "too many rows: {}", lines.len());

        let top = BOARD_HEIGHT - lines.len();
        for (i, line) in lines.iter().enumerate() {
            let cells: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            assert_eq!(
                cells.len(),
                BOARD_WIDTH,
                "Each row must have exactly {BOARD_WIDTH} cells, got {} at line {i}",
                cells.len(),
            );
            for (x, &ch) in cells.iter().enumerate() {
                board.rows[top + i].cells[x] = match ch {
                    '.' => Block::Empty,
                    '#' => Block::Piece(PieceKind::I),
                    c => Block::Piece(
                        PieceKind::from_char(c).unwrap_or_else(|| panic!("invalid cell {c:?}")),
                    ),
                };
            }
        }
        board
    }
}

use serde::{Deserialize, Serialize};

use super::BOARD_WIDTH;

/// A falling piece (tetromino) with position, rotation, and type.
///
/// Pieces are immutable values - movement and rotation operations return new
/// `Piece` instances, and validity against a board is checked by the
/// functions in [`collision`](super::collision).
///
/// # Coordinate System
///
/// - Position is the top-left corner of the piece's 4×4 bounding box
/// - `y` may be negative while the piece is in the spawn buffer
/// - Rotation is tracked as 0 (spawn), 1 (right), 2 (180°), 3 (left)
///
/// # Example
///
/// ```
/// use stackfall_engine::{Piece, PieceKind, RotationDirection};
///
/// let piece = Piece::new(PieceKind::T);
/// let moved = piece.shifted(1, 0);
/// let rotated = moved.rotated(RotationDirection::Clockwise);
/// assert_eq!(rotated.position().x(), piece.position().x() + 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    position: PiecePosition,
    rotation: Rotation,
    kind: PieceKind,
}

impl Piece {
    /// Creates a piece of the given kind at its spawn position and rotation.
    #[must_use]
    pub fn new(kind: PieceKind) -> Self {
        Self {
            position: kind.spawn_position(),
            rotation: Rotation::SPAWN,
            kind,
        }
    }

    #[must_use]
    pub const fn from_parts(kind: PieceKind, rotation: Rotation, position: PiecePosition) -> Self {
        Self {
            position,
            rotation,
            kind,
        }
    }

    #[must_use]
    pub fn position(&self) -> PiecePosition {
        self.position
    }

    #[must_use]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    #[must_use]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    #[must_use]
    pub fn shape(&self) -> &'static PieceShape {
        self.kind.shape(self.rotation)
    }

    /// Returns the absolute board coordinates of the occupied cells.
    pub fn occupied_positions(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.kind
            .occupied_offsets(self.rotation)
            .map(move |(dx, dy)| (self.position.x + dx, self.position.y + dy))
    }

    /// Returns the same piece placed at `(x, y)`.
    #[must_use]
    pub fn at(&self, x: i32, y: i32) -> Self {
        Self {
            position: PiecePosition::new(x, y),
            ..*self
        }
    }

    #[must_use]
    pub fn shifted(&self, dx: i32, dy: i32) -> Self {
        self.at(self.position.x + dx, self.position.y + dy)
    }

    /// Returns the piece in the next rotation state, without any kick.
    #[must_use]
    pub fn rotated(&self, direction: RotationDirection) -> Self {
        Self {
            rotation: self.rotation.rotated(direction),
            ..*self
        }
    }
}

/// Position of a piece's bounding box on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PiecePosition {
    x: i32,
    y: i32,
}

impl PiecePosition {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub const fn x(self) -> i32 {
        self.x
    }

    #[must_use]
    pub const fn y(self) -> i32 {
        self.y
    }
}

/// Rotation state of a piece.
///
/// - `0`: spawn orientation
/// - `1`: 90° clockwise
/// - `2`: 180°
/// - `3`: 270° clockwise (90° counterclockwise)
///
/// Rotation operations wrap around modulo 4.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rotation(u8);

impl Rotation {
    pub const SPAWN: Self = Self(0);

    #[must_use]
    pub const fn new(state: u8) -> Option<Self> {
        if state < 4 { Some(Self(state)) } else { None }
    }

    #[must_use]
    pub const fn state(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn rotated(self, direction: RotationDirection) -> Self {
        match direction {
            RotationDirection::Clockwise => Self((self.0 + 1) % 4),
            RotationDirection::CounterClockwise => Self((self.0 + 3) % 4),
        }
    }

    pub(crate) const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Direction of a rotation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

impl RotationDirection {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// Enum representing the type of piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[repr(u8)]
pub enum PieceKind {
    /// I-piece.
    I = 0,
    /// O-piece.
    O = 1,
    /// S-piece.
    S = 2,
    /// Z-piece.
    Z = 3,
    /// J-piece.
    J = 4,
    /// L-piece.
    L = 5,
    /// T-piece.
    T = 6,
}

impl PieceKind {
    /// Number of piece types (7).
    pub const LEN: usize = 7;

    pub const ALL: [Self; Self::LEN] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
        PieceKind::T,
    ];

    /// Stable, strictly positive color index used by the board cells.
    ///
    /// `0` is reserved for empty cells.
    #[must_use]
    pub const fn color_index(self) -> u8 {
        self as u8 + 1
    }

    /// Side length of the square the shape rotates in.
    #[must_use]
    pub const fn box_size(self) -> usize {
        match self {
            PieceKind::I => 4,
            PieceKind::O => 2,
            _ => 3,
        }
    }

    #[must_use]
    pub fn shape(self, rotation: Rotation) -> &'static PieceShape {
        &PIECE_SHAPES[self as usize][rotation.as_usize()]
    }

    /// Returns an iterator of occupied offsets inside the bounding box.
    pub fn occupied_offsets(self, rotation: Rotation) -> impl Iterator<Item = (i32, i32)> {
        let shape = self.shape(rotation);
        (0..4i32).flat_map(move |dy| {
            (0..4i32).filter_map(move |dx| shape[dy as usize][dx as usize].then_some((dx, dy)))
        })
    }

    /// Spawn position: horizontally centered, with the first non-empty row of
    /// the spawn shape sitting on row 0.
    ///
    /// ```
    /// use stackfall_engine::PieceKind;
    ///
    /// // The I-piece's cells live on the second row of its box.
    /// let pos = PieceKind::I.spawn_position();
    /// assert_eq!((pos.x(), pos.y()), (3, -1));
    /// ```
    #[must_use]
    #[expect(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn spawn_position(self) -> PiecePosition {
        let x = (BOARD_WIDTH - self.box_size()) / 2;
        let first_row = self
            .shape(Rotation::SPAWN)
            .iter()
            .position(|row| row.iter().any(|&cell| cell))
            .unwrap_or(0);
        PiecePosition::new(x as i32, -(first_row as i32))
    }

    /// Returns the single character representation of this piece kind.
    ///
    /// ```
    /// use stackfall_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::I.as_char(), 'I');
    /// assert_eq!(PieceKind::T.as_char(), 'T');
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::O => 'O',
            PieceKind::S => 'S',
            PieceKind::Z => 'Z',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
            PieceKind::T => 'T',
        }
    }

    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(PieceKind::I),
            'O' => Some(PieceKind::O),
            'S' => Some(PieceKind::S),
            'Z' => Some(PieceKind::Z),
            'J' => Some(PieceKind::J),
            'L' => Some(PieceKind::L),
            'T' => Some(PieceKind::T),
            _ => None,
        }
    }
}

/// Occupancy of a piece inside its 4×4 bounding box, indexed `[row][column]`.
pub type PieceShape = [[bool; 4]; 4];

/// Generates all 4 rotation states of a shape by rotating 90° clockwise.
///
/// # Arguments
///
/// * `size` - Effective size of the piece (4 for I, 2 for O, 3 otherwise)
/// * `shape` - Spawn orientation
const fn shape_rotations(size: usize, shape: &PieceShape) -> [PieceShape; 4] {
    let mut rotates = [*shape; 4];
    let mut i = 1;
    while i < 4 {
        let mut new_shape = [[false; 4]; 4];
        let mut y = 0;
        while y < size {
            let mut x = 0;
            while x < size {
                new_shape[y][x] = rotates[i - 1][size - 1 - x][y];
                x += 1;
            }
            y += 1;
        }
        rotates[i] = new_shape;
        i += 1;
    }
    rotates
}

const PIECE_SHAPES: [[PieceShape; 4]; PieceKind::LEN] = {
    const C: bool = true;
    const E: bool = false;
    const EEEE: [bool; 4] = [E; 4];
    [
        // I-piece
        shape_rotations(4, &[EEEE, [C, C, C, C], EEEE, EEEE]),
        // O-piece
        shape_rotations(2, &[[C, C, E, E], [C, C, E, E], EEEE, EEEE]),
        // S-piece
        shape_rotations(3, &[[E, C, C, E], [C, C, E, E], EEEE, EEEE]),
        // Z-piece
        shape_rotations(3, &[[C, C, E, E], [E, C, C, E], EEEE, EEEE]),
        // J-piece
        shape_rotations(3, &[[C, E, E, E], [C, C, C, E], EEEE, EEEE]),
        // L-piece
        shape_rotations(3, &[[E, E, C, E], [C, C, C, E], EEEE, EEEE]),
        // T-piece
        shape_rotations(3, &[[E, C, E, E], [C, C, C, E], EEEE, EEEE]),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(kind: PieceKind, state: u8) -> Vec<(i32, i32)> {
        kind.occupied_offsets(Rotation::new(state).unwrap()).collect()
    }

    #[test]
    fn test_every_rotation_has_four_cells() {
        for kind in PieceKind::ALL {
            for state in 0..4 {
                assert_eq!(offsets(kind, state).len(), 4, "{kind:?} rotation {state}");
            }
        }
    }

    #[test]
    fn test_t_piece_rotation_states() {
        assert_eq!(offsets(PieceKind::T, 0), [(1, 0), (0, 1), (1, 1), (2, 1)]);
        assert_eq!(offsets(PieceKind::T, 1), [(1, 0), (1, 1), (2, 1), (1, 2)]);
        assert_eq!(offsets(PieceKind::T, 2), [(0, 1), (1, 1), (2, 1), (1, 2)]);
        assert_eq!(offsets(PieceKind::T, 3), [(1, 0), (0, 1), (1, 1), (1, 2)]);
    }

    #[test]
    fn test_i_piece_rotation_states() {
        assert_eq!(offsets(PieceKind::I, 0), [(0, 1), (1, 1), (2, 1), (3, 1)]);
        assert_eq!(offsets(PieceKind::I, 1), [(2, 0), (2, 1), (2, 2), (2, 3)]);
        assert_eq!(offsets(PieceKind::I, 2), [(0, 2), (1, 2), (2, 2), (3, 2)]);
        assert_eq!(offsets(PieceKind::I, 3), [(1, 0), (1, 1), (1, 2), (1, 3)]);
    }

    #[test]
    fn test_o_piece_is_rotation_invariant() {
        for state in 1..4 {
            assert_eq!(offsets(PieceKind::O, state), offsets(PieceKind::O, 0));
        }
    }

    #[test]
    fn test_spawn_positions() {
        let spawn = |kind: PieceKind| {
            let p = kind.spawn_position();
            (p.x(), p.y())
        };
        assert_eq!(spawn(PieceKind::I), (3, -1));
        assert_eq!(spawn(PieceKind::O), (4, 0));
        for kind in [PieceKind::S, PieceKind::Z, PieceKind::J, PieceKind::L, PieceKind::T] {
            assert_eq!(spawn(kind), (3, 0));
        }
    }

    #[test]
    fn test_spawned_top_row_is_row_zero() {
        for kind in PieceKind::ALL {
            let top = Piece::new(kind)
                .occupied_positions()
                .map(|(_, y)| y)
                .min()
                .unwrap();
            assert_eq!(top, 0, "{kind:?}");
        }
    }

    #[test]
    fn test_rotation_wraps() {
        let r = Rotation::SPAWN;
        assert_eq!(r.rotated(RotationDirection::CounterClockwise).state(), 3);
        assert_eq!(
            r.rotated(RotationDirection::Clockwise)
                .rotated(RotationDirection::CounterClockwise),
            r
        );
        assert_eq!(Rotation::new(4), None);
    }

    #[test]
    fn test_color_indices_are_positive_and_distinct() {
        let mut seen = Vec::new();
        for kind in PieceKind::ALL {
            let color = kind.color_index();
            assert!(color > 0);
            assert!(!seen.contains(&color));
            seen.push(color);
        }
    }

    #[test]
    fn test_piece_kind_char_conversion() {
        for kind in PieceKind::ALL {
            assert_eq!(PieceKind::from_char(kind.as_char()), Some(kind));
        }
        assert_eq!(PieceKind::from_char('X'), None);
        assert_eq!(PieceKind::from_char('t'), None);
    }
}

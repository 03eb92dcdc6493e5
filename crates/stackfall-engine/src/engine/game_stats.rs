/// Base score values for line clears, multiplied by the level.
///
/// Index corresponds to number of lines cleared simultaneously:
/// - 0 lines: 0 points
/// - 1 line: 100 points
/// - 2 lines: 300 points
/// - 3 lines: 500 points
/// - 4 lines: 800 points
const SCORE_TABLE: [usize; 5] = [0, 100, 300, 500, 800];

/// Bonus per combo step beyond the first clear, multiplied by the level.
const COMBO_BONUS: usize = 50;

/// Lines needed to advance one level.
const LINES_PER_LEVEL: usize = 10;

/// What a single lock changed in the statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockOutcome {
    /// Points awarded for this lock (line clear plus combo bonus).
    pub score_delta: usize,
    /// Combo length after this lock; `0` when no lines were cleared.
    pub combo: usize,
    /// New level, if this lock crossed a level boundary.
    pub level_up: Option<usize>,
}

/// Game statistics tracking score, lines, level, combo and piece count.
///
/// # Scoring
///
/// - Line clears award `SCORE_TABLE[lines] × level`, using the level before
///   the clear is counted
/// - Consecutive clearing locks form a combo; the `n`-th lock of a combo adds
///   `50 × (n - 1) × level`
/// - A lock that clears nothing ends the combo
/// - Drops do not award points
///
/// Level starts at 1 and increases by 1 for every 10 lines cleared.
///
/// # Example
///
/// ```
/// use stackfall_engine::GameStats;
///
/// let mut stats = GameStats::new();
/// let outcome = stats.complete_piece_drop(4); // Tetris (4 lines)
///
/// assert_eq!(outcome.score_delta, 800);
/// assert_eq!(stats.score(), 800);
/// assert_eq!(stats.total_cleared_lines(), 4);
/// assert_eq!(stats.line_cleared_counter()[4], 1);
/// ```
#[derive(Debug, Clone)]
pub struct GameStats {
    score: usize,
    completed_pieces: usize,
    total_cleared_lines: usize,
    combo: usize,
    line_cleared_counter: [usize; 5],
}

impl Default for GameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStats {
    /// Creates a new game statistics tracker at level 1 with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            score: 0,
            completed_pieces: 0,
            total_cleared_lines: 0,
            combo: 0,
            line_cleared_counter: [0; 5],
        }
    }

    #[must_use]
    pub const fn score(&self) -> usize {
        self.score
    }

    /// Returns the current level: `1 + total_cleared_lines / 10`.
    #[must_use]
    pub const fn level(&self) -> usize {
        1 + self.total_cleared_lines / LINES_PER_LEVEL
    }

    /// Returns the length of the running combo (`0` when none).
    #[must_use]
    pub const fn combo(&self) -> usize {
        self.combo
    }

    #[must_use]
    pub const fn completed_pieces(&self) -> usize {
        self.completed_pieces
    }

    #[must_use]
    pub const fn total_cleared_lines(&self) -> usize {
        self.total_cleared_lines
    }

    /// Returns a histogram of locks by number of lines cleared (index 0–4).
    #[must_use]
    pub const fn line_cleared_counter(&self) -> &[usize; 5] {
        &self.line_cleared_counter
    }

    /// Updates statistics after a piece locks.
    ///
    /// # Arguments
    ///
    /// * `cleared_lines` - Number of lines cleared by the lock (0-4)
    pub fn complete_piece_drop(&mut self, cleared_lines: usize) -> LockOutcome {
        let level = self.level();
        let cleared_lines = cleared_lines.min(SCORE_TABLE.len() - 1);

        self.completed_pieces += 1;
        self.line_cleared_counter[cleared_lines] += 1;

        if cleared_lines == 0 {
            self.combo = 0;
            return LockOutcome::default();
        }

        self.combo += 1;
        self.total_cleared_lines += cleared_lines;
        let score_delta = (SCORE_TABLE[cleared_lines] + COMBO_BONUS * (self.combo - 1)) * level;
        self.score += score_delta;

        let new_level = self.level();
        LockOutcome {
            score_delta,
            combo: self.combo,
            level_up: (new_level > level).then_some(new_level),
        }
    }
}

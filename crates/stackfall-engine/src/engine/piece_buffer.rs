use std::{collections::VecDeque, fmt::Write as _};

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
    seq::SliceRandom,
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PieceKind;

/// Returns one shuffled permutation of all seven piece kinds.
pub fn generate_bag<R: Rng + ?Sized>(rng: &mut R) -> [PieceKind; PieceKind::LEN] {
    let mut bag = PieceKind::ALL;
    bag.shuffle(rng);
    bag
}

/// Upcoming pieces and the hold slot, fed by the 7-bag randomizer.
///
/// # 7-Bag System
///
/// 1. A "bag" holds all 7 piece kinds (I, O, S, Z, J, L, T)
/// 2. The bag is shuffled and appended to the queue
/// 3. Pieces are drawn from the front of the queue
/// 4. A new bag is appended whenever fewer than 7 pieces remain
///
/// Bags are only ever appended whole, so every bag contains each kind exactly
/// once and any 14 consecutive draws contain each kind at most twice.
///
/// # Hold System
///
/// - First hold stores the current piece and draws from the queue
/// - Subsequent holds swap the current piece with the held piece
///
/// # Example
///
/// ```
/// use stackfall_engine::PieceBuffer;
///
/// let mut buffer = PieceBuffer::new();
///
/// let first = buffer.pop_next();
/// let upcoming: Vec<_> = buffer.next_pieces().take(5).collect();
/// assert_eq!(upcoming.len(), 5);
/// # let _ = first;
/// ```
#[derive(Debug, Clone)]
pub struct PieceBuffer {
    rng: Pcg32,
    queue: VecDeque<PieceKind>,
    held: Option<PieceKind>,
}

impl Default for PieceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Seed for deterministic piece generation.
///
/// A 128-bit seed for the piece RNG. The same seed always produces the same
/// piece sequence. Serialized as a 32-character hex string.
///
/// # Example
///
/// ```
/// use stackfall_engine::{PieceBuffer, PieceSeed};
/// use rand::Rng as _;
///
/// let seed: PieceSeed = rand::rng().random();
/// let mut a = PieceBuffer::with_seed(seed);
/// let mut b = PieceBuffer::with_seed(seed);
/// assert_eq!(a.pop_next(), b.pop_next());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceSeed([u8; 16]);

impl PieceSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }
}

impl Serialize for PieceSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let num = u128::from_be_bytes(self.0);
        let mut hex_str = String::with_capacity(2 * self.0.len());
        write!(&mut hex_str, "{num:032x}").map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&hex_str)
    }
}

impl<'de> Deserialize<'de> for PieceSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        if hex_str.len() != 32 {
            return Err(serde::de::Error::custom(format!(
                "invalid hex: expected 32 characters, got {}",
                hex_str.len()
            )));
        }
        let num = u128::from_str_radix(&hex_str, 16)
            .map_err(|e| serde::de::Error::custom(format!("invalid hex: {hex_str} ({e})")))?;
        Ok(Self(num.to_be_bytes()))
    }
}

/// Allows generating random `PieceSeed` values with `rng.random()`.
impl Distribution<PieceSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        PieceSeed(seed)
    }
}

impl PieceBuffer {
    /// Creates a new piece buffer with a random seed.
    ///
    /// For deterministic piece generation, use [`Self::with_seed`] instead.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    /// Like [`Self::new`], but with a specific seed for deterministic piece generation.
    #[must_use]
    pub fn with_seed(seed: PieceSeed) -> Self {
        let mut this = Self {
            rng: Pcg32::from_seed(seed.0),
            queue: VecDeque::with_capacity(PieceKind::LEN * 2),
            held: None,
        };
        this.refill();
        this
    }

    /// Appends whole bags until at least 7 pieces are queued.
    fn refill(&mut self) {
        while self.queue.len() < PieceKind::LEN {
            let bag = generate_bag(&mut self.rng);
            self.queue.extend(bag);
        }
    }

    /// Draws the next piece from the queue.
    ///
    /// The queue is refilled afterwards, so the preview never drops below 7.
    pub fn pop_next(&mut self) -> PieceKind {
        self.refill();
        let kind = self.queue.pop_front().unwrap_or(PieceKind::I);
        self.refill();
        kind
    }

    /// Returns an iterator over the upcoming pieces in draw order.
    ///
    /// The iterator always yields at least 7 elements.
    pub fn next_pieces(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.queue.iter().copied()
    }

    /// Returns what piece would be received if hold is used now.
    #[must_use]
    pub fn peek_hold_result(&self) -> PieceKind {
        self.held
            .or_else(|| self.queue.front().copied())
            .unwrap_or(PieceKind::I)
    }

    /// Stores `current` in the hold slot.
    ///
    /// Returns the previously held piece, or the next queued piece on the
    /// first hold.
    pub fn hold(&mut self, current: PieceKind) -> PieceKind {
        self.held
            .replace(current)
            .unwrap_or_else(|| self.pop_next())
    }

    /// Returns the currently held piece, if any.
    #[must_use]
    pub fn held_piece(&self) -> Option<PieceKind> {
        self.held
    }
}

#[cfg(test)]
mod tests {
    use proptest::{prelude::any, prop_assert, prop_assert_eq, proptest};
    use rand::SeedableRng as _;

    use super::*;

    fn seed_from_bytes(bytes: [u8; 16]) -> PieceSeed {
        PieceSeed(bytes)
    }

    #[test]
    fn test_generate_bag_is_a_permutation() {
        let mut rng = Pcg32::from_seed([7; 16]);
        for _ in 0..50 {
            let mut bag = generate_bag(&mut rng);
            bag.sort();
            assert_eq!(bag, PieceKind::ALL);
        }
    }

    #[test]
    fn test_preview_never_shorter_than_a_bag() {
        let mut buffer = PieceBuffer::with_seed(seed_from_bytes([3; 16]));
        for _ in 0..100 {
            assert!(buffer.next_pieces().count() >= PieceKind::LEN);
            buffer.pop_next();
        }
    }

    #[test]
    fn test_preview_matches_draw_order() {
        let mut buffer = PieceBuffer::with_seed(seed_from_bytes([9; 16]));
        let preview: Vec<_> = buffer.next_pieces().take(7).collect();
        let drawn: Vec<_> = (0..7).map(|_| buffer.pop_next()).collect();
        assert_eq!(preview, drawn);
    }

    #[test]
    fn test_first_hold_draws_from_queue() {
        let mut buffer = PieceBuffer::with_seed(seed_from_bytes([1; 16]));
        let next = buffer.peek_hold_result();
        assert_eq!(buffer.hold(PieceKind::T), next);
        assert_eq!(buffer.held_piece(), Some(PieceKind::T));
    }

    #[test]
    fn test_second_hold_swaps() {
        let mut buffer = PieceBuffer::with_seed(seed_from_bytes([1; 16]));
        buffer.hold(PieceKind::T);
        let queued: Vec<_> = buffer.next_pieces().collect();
        assert_eq!(buffer.peek_hold_result(), PieceKind::T);
        assert_eq!(buffer.hold(PieceKind::S), PieceKind::T);
        assert_eq!(buffer.held_piece(), Some(PieceKind::S));
        assert_eq!(buffer.next_pieces().collect::<Vec<_>>(), queued);
    }

    proptest! {
        #[test]
        fn every_bag_holds_each_kind_once(seed in any::<[u8; 16]>()) {
            let mut buffer = PieceBuffer::with_seed(PieceSeed(seed));
            for _ in 0..20 {
                let mut bag: Vec<_> = (0..PieceKind::LEN).map(|_| buffer.pop_next()).collect();
                bag.sort();
                prop_assert_eq!(bag, PieceKind::ALL.to_vec());
            }
        }

        #[test]
        fn any_fourteen_draws_repeat_a_kind_at_most_twice(seed in any::<[u8; 16]>()) {
            let mut buffer = PieceBuffer::with_seed(PieceSeed(seed));
            let draws: Vec<_> = (0..140).map(|_| buffer.pop_next()).collect();
            for window in draws.windows(14) {
                for kind in PieceKind::ALL {
                    let count = window.iter().filter(|&&k| k == kind).count();
                    prop_assert!(count <= 2, "{kind:?} appeared {count} times in {window:?}");
                }
            }
        }
    }

    mod piece_seed_serialization {
        use rand::Rng as _;

        use super::*;

        #[test]
        fn test_roundtrip_random_seed() {
            let seed: PieceSeed = rand::rng().random();
            let serialized = serde_json::to_string(&seed).unwrap();
            let deserialized: PieceSeed = serde_json::from_str(&serialized).unwrap();
            assert_eq!(seed, deserialized);
        }

        #[test]
        fn test_known_value_sequential_bytes() {
            // Big-endian: bytes appear in order as hex pairs
            let seed = seed_from_bytes([
                0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0xFE, 0xDC, 0xBA, 0x98, 0x76, 0x54,
                0x32, 0x10,
            ]);
            let serialized = serde_json::to_string(&seed).unwrap();
            assert_eq!(serialized, "\"0123456789abcdeffedcba9876543210\"");
            let deserialized: PieceSeed = serde_json::from_str(&serialized).unwrap();
            assert_eq!(deserialized, seed);
        }

        #[test]
        fn test_deserialize_uppercase_hex() {
            let json = "\"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\"";
            let deserialized: PieceSeed = serde_json::from_str(json).unwrap();
            assert_eq!(deserialized.to_bytes(), [0xFF; 16]);
        }

        #[test]
        fn test_error_invalid_hex_characters() {
            let json = "\"ghijklmnopqrstuvwxyzghijklmnopqr\""; // 32 chars but not hex
            let err = serde_json::from_str::<PieceSeed>(json).unwrap_err();
            assert!(err.to_string().contains("invalid hex"));
        }

        #[test]
        fn test_error_wrong_length() {
            for json in ["\"\"", "\"0123456789abcdef0123456789abcde\""] {
                let err = serde_json::from_str::<PieceSeed>(json).unwrap_err();
                assert!(err.to_string().contains("invalid hex"));
            }
        }

        #[test]
        fn test_deterministic_piece_generation() {
            let seed = seed_from_bytes([
                0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
                0x77, 0x88,
            ]);
            let mut buffer1 = PieceBuffer::with_seed(seed);
            let mut buffer2 = PieceBuffer::with_seed(seed);
            for _ in 0..20 {
                assert_eq!(buffer1.pop_next(), buffer2.pop_next());
            }
        }
    }
}

//! Square and move codec.
//!
//! Translates between the board representations used by move sources
//! (0-63 indices, one-hot occupancy masks, algebraic labels in either
//! case) and the canonical [`Square`], and assembles moves into the
//! 5-byte ASCII command frames the arm firmware consumes. All inputs are
//! normalized here, once, at the boundary; nothing downstream branches
//! on representation.

use shakmaty::Square;
use thiserror::Error;

/// Length of a command frame on the wire: two labels plus a separator.
pub const COMMAND_LEN: usize = 5;

/// Length of a single square label on the wire.
pub const LABEL_LEN: usize = 2;

/// Error when decoding a square or assembling a move.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Square index outside the 64-square board.
    #[error("square index {0} outside 0-63")]
    IndexOutOfRange(u32),

    /// Mask with zero or more than one bit set.
    #[error("mask {0:#018x} is not a one-hot square")]
    NotOneHot(u64),

    /// Label that does not match `[a-h][1-8]` in either case.
    #[error("invalid square label {0:?}")]
    InvalidLabel(String),

    /// Origin and destination name the same square.
    #[error("origin and destination are both {0}")]
    NullMove(Square),
}

/// The two non-label forms a move source may supply a square in.
///
/// Consumed exactly once at the boundary via [`square_from_repr`];
/// everything past that point holds a canonical [`Square`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquareRepr {
    /// Plain 0-63 board index.
    Index(u32),
    /// One-hot 64-bit occupancy mask, bit `n` set for square `n`.
    Mask(u64),
}

/// Normalize an index or one-hot mask to a canonical square.
pub fn square_from_repr(repr: SquareRepr) -> Result<Square, CodecError> {
    match repr {
        SquareRepr::Index(index) => {
            if index > 63 {
                return Err(CodecError::IndexOutOfRange(index));
            }
            Ok(Square::new(index))
        }
        SquareRepr::Mask(mask) => {
            if mask.count_ones() != 1 {
                return Err(CodecError::NotOneHot(mask));
            }
            Ok(Square::new(mask.trailing_zeros()))
        }
    }
}

/// Parse an algebraic label, accepting upper or lower case.
pub fn square_from_label(label: &str) -> Result<Square, CodecError> {
    label
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| CodecError::InvalidLabel(label.to_string()))
}

/// Decode a raw 2-byte label as read off the wire.
pub fn square_from_wire(bytes: &[u8; LABEL_LEN]) -> Result<Square, CodecError> {
    match std::str::from_utf8(bytes) {
        Ok(label) => square_from_label(label),
        Err(_) => Err(CodecError::InvalidLabel(
            String::from_utf8_lossy(bytes).into_owned(),
        )),
    }
}

/// Lower-case 2-byte label for transmission.
pub fn wire_label(square: Square) -> [u8; LABEL_LEN] {
    [square.file().char() as u8, square.rank().char() as u8]
}

/// A move intent for the arm: origin, destination, capture flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmMove {
    origin: Square,
    destination: Square,
    capture: bool,
}

impl ArmMove {
    /// Build a move, rejecting a same-square pair.
    pub fn new(origin: Square, destination: Square, capture: bool) -> Result<Self, CodecError> {
        if origin == destination {
            return Err(CodecError::NullMove(origin));
        }
        Ok(Self {
            origin,
            destination,
            capture,
        })
    }

    /// Build a move from boundary representations (index or mask pairs).
    pub fn from_reprs(
        origin: SquareRepr,
        destination: SquareRepr,
        capture: bool,
    ) -> Result<Self, CodecError> {
        Self::new(
            square_from_repr(origin)?,
            square_from_repr(destination)?,
            capture,
        )
    }

    /// Build a move from algebraic labels in either case.
    pub fn from_labels(origin: &str, destination: &str, capture: bool) -> Result<Self, CodecError> {
        Self::new(
            square_from_label(origin)?,
            square_from_label(destination)?,
            capture,
        )
    }

    #[inline]
    pub fn origin(&self) -> Square {
        self.origin
    }

    #[inline]
    pub fn destination(&self) -> Square {
        self.destination
    }

    #[inline]
    pub fn is_capture(&self) -> bool {
        self.capture
    }
}

impl std::fmt::Display for ArmMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sep = if self.capture { 'x' } else { ',' };
        write!(f, "{}{}{}", self.origin, sep, self.destination)
    }
}

/// An immutable 5-byte command frame, ready for the wire.
///
/// `"<origin>,<destination>"` for a plain move, `"<origin>x<destination>"`
/// for a capture, labels always lower-case. The frame does not own the
/// channel; [`crate::link::LinkSession`] transmits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; COMMAND_LEN],
}

impl CommandFrame {
    /// Encode a move into its wire bytes.
    pub fn encode(mv: &ArmMove) -> Self {
        let origin = wire_label(mv.origin());
        let destination = wire_label(mv.destination());
        let sep = if mv.is_capture() { b'x' } else { b',' };
        Self {
            bytes: [origin[0], origin[1], sep, destination[0], destination[1]],
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Frame bytes are ASCII by construction
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn index_label_round_trip_all_squares() {
        for index in 0..64u32 {
            let square = square_from_repr(SquareRepr::Index(index)).unwrap();
            let label = wire_label(square);
            let back = square_from_wire(&label).unwrap();
            assert_eq!(u32::from(back), index, "label {:?}", label);
        }
    }

    #[test]
    fn mask_round_trip_all_squares() {
        for index in 0..64u32 {
            let square = square_from_repr(SquareRepr::Mask(1u64 << index)).unwrap();
            assert_eq!(u32::from(square), index);
        }
    }

    #[test_case("a1", Square::A1; "first square")]
    #[test_case("h8", Square::H8; "last square")]
    #[test_case("E4", Square::E4; "upper case accepted")]
    #[test_case("C2", Square::C2; "vision style label")]
    fn label_parsing(label: &str, expected: Square) {
        assert_eq!(square_from_label(label).unwrap(), expected);
    }

    #[test_case("z9"; "bad file and rank")]
    #[test_case("e"; "truncated")]
    #[test_case("e44"; "too long")]
    #[test_case("a0"; "rank below board")]
    #[test_case("i1"; "file off board")]
    #[test_case(""; "empty")]
    fn invalid_labels_rejected(label: &str) {
        assert_eq!(
            square_from_label(label),
            Err(CodecError::InvalidLabel(label.to_string()))
        );
    }

    #[test]
    fn out_of_range_index_rejected() {
        assert_eq!(
            square_from_repr(SquareRepr::Index(64)),
            Err(CodecError::IndexOutOfRange(64))
        );
    }

    #[test_case(0; "no bits")]
    #[test_case(0b11; "two bits")]
    #[test_case(u64::MAX; "all bits")]
    fn non_one_hot_mask_rejected(mask: u64) {
        assert_eq!(
            square_from_repr(SquareRepr::Mask(mask)),
            Err(CodecError::NotOneHot(mask))
        );
    }

    #[test]
    fn wire_labels_are_lower_case() {
        for index in 0..64u32 {
            let label = wire_label(Square::new(index));
            assert!(label[0].is_ascii_lowercase());
            assert!(label[1].is_ascii_digit());
        }
    }

    #[test]
    fn plain_move_frame_bytes() {
        let mv = ArmMove::from_labels("e2", "e4", false).unwrap();
        assert_eq!(CommandFrame::encode(&mv).as_bytes(), b"e2,e4");
    }

    #[test]
    fn capture_move_frame_bytes() {
        let mv = ArmMove::from_labels("e4", "d5", true).unwrap();
        assert_eq!(CommandFrame::encode(&mv).as_bytes(), b"e4xd5");
    }

    #[test]
    fn upper_case_labels_lowered_on_the_wire() {
        let mv = ArmMove::from_labels("E2", "E4", false).unwrap();
        assert_eq!(CommandFrame::encode(&mv).as_bytes(), b"e2,e4");
    }

    #[test]
    fn null_move_rejected() {
        assert_eq!(
            ArmMove::from_labels("e2", "e2", false),
            Err(CodecError::NullMove(Square::E2))
        );
    }

    #[test]
    fn mixed_representations_build_the_same_move() {
        let from_index = ArmMove::from_reprs(
            SquareRepr::Index(12), // e2
            SquareRepr::Index(28), // e4
            false,
        )
        .unwrap();
        let from_mask =
            ArmMove::from_reprs(SquareRepr::Mask(1 << 12), SquareRepr::Mask(1 << 28), false)
                .unwrap();
        let from_labels = ArmMove::from_labels("e2", "e4", false).unwrap();
        assert_eq!(from_index, from_mask);
        assert_eq!(from_mask, from_labels);
    }
}

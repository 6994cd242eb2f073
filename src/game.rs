//! Game driver: ties the move source and the link together.
//!
//! Owns the logical [`Chess`] position and alternates between asking the
//! move source for the arm's move (then commanding the arm) and blocking
//! on the link for the opponent's move (then applying it). The rules
//! engine itself is a collaborator behind [`MoveSource`]; the built-in
//! [`GreedySource`] only exists so the binary runs without one.

use shakmaty::{Chess, Color, File, Move, Position, Square};
use thiserror::Error;

use crate::LinkChannel;
use crate::codec::{ArmMove, CodecError};
use crate::link::{LinkError, LinkSession};

/// External rules/search engine boundary.
///
/// Implementations pick the arm's next move for the given position, or
/// `None` when no legal move exists.
pub trait MoveSource {
    fn best_move(&mut self, position: &Chess) -> Option<Move>;
}

/// Fallback move source: first capture if one exists, otherwise the
/// first legal move. Keeps the binary playable without an engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedySource;

impl MoveSource for GreedySource {
    fn best_move(&mut self, position: &Chess) -> Option<Move> {
        let moves = position.legal_moves();
        moves
            .iter()
            .find(|mv| mv.is_capture())
            .or_else(|| moves.first())
            .cloned()
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The received square pair matches no legal move in the position.
    /// Never coerced to some other move; the caller aborts or re-reads.
    #[error("no legal move from {origin} to {destination} in the current position")]
    IllegalMove { origin: Square, destination: Square },

    /// The move source produced nothing for a position with no legal
    /// moves (mate or stalemate reached mid-turn).
    #[error("no move available for {0:?}")]
    NoMove(Color),
}

/// Drives one game between the arm and its opponent.
#[derive(Debug)]
pub struct GameDriver<S> {
    position: Chess,
    arm_color: Color,
    source: S,
}

impl<S: MoveSource> GameDriver<S> {
    pub fn new(arm_color: Color, source: S) -> Self {
        Self {
            position: Chess::default(),
            arm_color,
            source,
        }
    }

    #[inline]
    pub fn position(&self) -> &Chess {
        &self.position
    }

    #[inline]
    pub fn is_arm_turn(&self) -> bool {
        self.position.turn() == self.arm_color
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        self.position.is_game_over()
    }

    /// Pick the arm's move, command the arm, and apply the move locally.
    ///
    /// The command goes out before the local position advances, so a
    /// link failure leaves the logical board consistent with the
    /// physical one.
    pub fn play_arm_turn<C: LinkChannel>(
        &mut self,
        session: &mut LinkSession<C>,
    ) -> Result<ArmMove, GameError> {
        let mv = self
            .source
            .best_move(&self.position)
            .ok_or(GameError::NoMove(self.arm_color))?;
        let (origin, destination) = wire_squares(&mv).ok_or(GameError::NoMove(self.arm_color))?;
        let arm_move = ArmMove::new(origin, destination, mv.is_capture())?;

        session.send_move(&arm_move)?;
        log::info!("arm plays {arm_move}");
        self.position.play_unchecked(mv);
        Ok(arm_move)
    }

    /// Block for the opponent's move on the link and apply it.
    ///
    /// The inbound square pair is matched against the legal moves of the
    /// position, the same way the arm's own sensors would resolve a
    /// physical move; a pair with no legal counterpart is surfaced as
    /// [`GameError::IllegalMove`].
    pub fn play_opponent_turn<C: LinkChannel>(
        &mut self,
        session: &mut LinkSession<C>,
    ) -> Result<Move, GameError> {
        let received = session.await_move()?;
        let legal = self
            .position
            .legal_moves()
            .into_iter()
            .find(|mv| wire_squares(mv) == Some((received.origin(), received.destination())))
            .ok_or(GameError::IllegalMove {
                origin: received.origin(),
                destination: received.destination(),
            })?;
        log::info!("opponent plays {received}");
        self.position.play_unchecked(legal.clone());
        Ok(legal)
    }
}

/// The origin/destination pair a move occupies on the wire.
///
/// Castling is expressed as the king's travel (the rook is the
/// firmware's business); drops have no origin and cannot be expressed.
fn wire_squares(mv: &Move) -> Option<(Square, Square)> {
    match *mv {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() {
                File::G
            } else {
                File::C
            };
            Some((king, Square::from_coords(file, king.rank())))
        }
        ref mv => mv.from().map(|from| (from, mv.to())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedChannel;
    use shakmaty::Role;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn session() -> LinkSession<ScriptedChannel> {
        LinkSession::over(ScriptedChannel::new(), TIMEOUT)
    }

    /// Source that always plays a fixed UCI-style square pair.
    struct Fixed(&'static str);

    impl MoveSource for Fixed {
        fn best_move(&mut self, position: &Chess) -> Option<Move> {
            let origin: Square = self.0[..2].parse().ok()?;
            let destination: Square = self.0[2..].parse().ok()?;
            position
                .legal_moves()
                .into_iter()
                .find(|mv| mv.from() == Some(origin) && mv.to() == destination)
        }
    }

    #[test]
    fn arm_turn_sends_frame_and_advances_position() {
        let mut driver = GameDriver::new(Color::White, Fixed("e2e4"));
        let mut session = session();
        session.channel_mut().push_incoming(b"arm ready");

        let played = driver.play_arm_turn(&mut session).expect("played");
        assert_eq!(played.origin(), Square::E2);
        assert_eq!(session.channel_ref().sent(), vec![b"e2,e4".to_vec()]);
        assert!(!driver.is_arm_turn(), "turn passes to the opponent");
        assert_eq!(
            driver
                .position()
                .board()
                .piece_at(Square::E4)
                .map(|p| p.role),
            Some(Role::Pawn)
        );
    }

    #[test]
    fn link_failure_leaves_position_untouched() {
        let mut driver = GameDriver::new(Color::White, Fixed("e2e4"));
        let mut session = session();
        // No scripted ack: send_move times out.

        let err = driver.play_arm_turn(&mut session).unwrap_err();
        assert!(matches!(err, GameError::Link(LinkError::AckTimeout { .. })));
        assert!(driver.is_arm_turn(), "failed command must not advance the game");
    }

    #[test]
    fn capture_is_derived_from_the_position() {
        // 1. e4 d5 2. exd5 — the arm's second move is a capture.
        let mut driver = GameDriver::new(Color::White, Fixed("e2e4"));
        let mut session = session();
        session.channel_mut().push_incoming(b"arm ready");
        driver.play_arm_turn(&mut session).expect("e4");

        session.channel_mut().push_incoming(b"d7d5");
        driver.play_opponent_turn(&mut session).expect("d5");

        driver.source = Fixed("e4d5");
        session.channel_mut().push_incoming(b"arm ready");
        let played = driver.play_arm_turn(&mut session).expect("exd5");
        assert!(played.is_capture());
        assert_eq!(session.channel_ref().sent().last().unwrap(), b"e4xd5");
    }

    #[test]
    fn opponent_move_is_applied_from_the_wire() {
        let mut driver = GameDriver::new(Color::Black, GreedySource);
        let mut session = session();
        session.channel_mut().push_incoming(b"e2e4");

        let mv = driver.play_opponent_turn(&mut session).expect("applied");
        assert_eq!(mv.to(), Square::E4);
        assert!(driver.is_arm_turn(), "arm (black) to move after e4");
    }

    #[test]
    fn upper_case_opponent_labels_are_accepted() {
        let mut driver = GameDriver::new(Color::Black, GreedySource);
        let mut session = session();
        session.channel_mut().push_incoming(b"E2E4");

        let mv = driver.play_opponent_turn(&mut session).expect("applied");
        assert_eq!(mv.to(), Square::E4);
    }

    #[test]
    fn illegal_opponent_move_is_rejected() {
        let mut driver = GameDriver::new(Color::Black, GreedySource);
        let mut session = session();
        session.channel_mut().push_incoming(b"e2e5"); // pawns cannot triple-step

        let err = driver.play_opponent_turn(&mut session).unwrap_err();
        assert!(matches!(
            err,
            GameError::IllegalMove {
                origin: Square::E2,
                destination: Square::E5,
            }
        ));
        assert!(!driver.is_arm_turn(), "position must not change");
    }

    #[test]
    fn greedy_source_prefers_captures() {
        let mut driver = GameDriver::new(Color::White, GreedySource);
        let mut session = session();

        // Walk into a position where white has a capture available.
        for frames in [&b"arm ready"[..], b"d7d5", b"arm ready"] {
            session.channel_mut().push_incoming(frames);
        }
        driver.source = GreedySource;
        driver.play_arm_turn(&mut session).expect("first move");
        driver.play_opponent_turn(&mut session).expect("reply");
        let second = driver.play_arm_turn(&mut session).expect("second move");

        // Whatever the move, a capture must be flagged as one on the wire.
        if second.is_capture() {
            let frame = session.channel_ref().sent().last().unwrap();
            assert_eq!(frame[2], b'x');
        }
    }
}

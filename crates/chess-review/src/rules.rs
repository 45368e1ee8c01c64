//! Chess rules oracle.
//!
//! The review core never generates moves itself; it asks a [`RulesOracle`]
//! for notation, resulting positions and legal replies. [`StandardRules`]
//! answers with `shakmaty`.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position, Role};
use thiserror::Error;

pub use chess_openings::position_key;

/// FEN of the standard initial position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    #[error("Illegal move {lan} in {fen}")]
    IllegalMove { fen: String, lan: String },
}

/// Outcome of playing one move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    /// FEN after the move.
    pub fen: String,
    /// The move in SAN, with check suffix.
    pub san: String,
    /// Legal replies in SAN.
    pub legal_moves: Vec<String>,
}

/// Chess rules consumed by the review core.
pub trait RulesOracle: Send + Sync {
    /// Converts a line of LAN moves to SAN, stopping at the first move that
    /// is not legal. The result may be shorter than `lans`.
    fn san_line(&self, fen: &str, lans: &[String]) -> Result<Vec<String>, RulesError>;

    /// Plays a LAN move from `fen`.
    fn play(&self, fen: &str, lan: &str) -> Result<PlayedMove, RulesError>;

    /// Legal moves in SAN.
    fn legal_moves(&self, fen: &str) -> Result<Vec<String>, RulesError>;

    /// Material the side to move gives up by playing `lan`, after the
    /// opponent's `reply` when one is given. Positive means material lost.
    fn material_swing(&self, fen: &str, lan: &str, reply: Option<&str>) -> Result<i32, RulesError>;
}

/// Side to move according to the second FEN field.
pub fn side_to_move(fen: &str) -> Color {
    match fen.split_whitespace().nth(1) {
        Some("b") => Color::Black,
        _ => Color::White,
    }
}

/// Rules backed by `shakmaty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl StandardRules {
    fn position(fen: &str) -> Result<Chess, RulesError> {
        let setup: Fen = fen.parse().map_err(|_| RulesError::InvalidFen(fen.to_string()))?;
        setup
            .into_position(CastlingMode::Standard)
            .map_err(|_| RulesError::InvalidFen(fen.to_string()))
    }

    fn to_move(pos: &Chess, lan: &str) -> Option<Move> {
        let uci: UciMove = lan.parse().ok()?;
        uci.to_move(pos).ok()
    }

    fn illegal(fen: &str, lan: &str) -> RulesError {
        RulesError::IllegalMove {
            fen: fen.to_string(),
            lan: lan.to_string(),
        }
    }

    /// SAN of `mv` and the position after it.
    fn play_san(pos: Chess, mv: Move) -> Option<(String, Chess)> {
        let mut san = San::from_move(&pos, mv.clone()).to_string();
        let next = pos.play(mv).ok()?;
        if next.is_checkmate() {
            san.push('#');
        } else if next.is_check() {
            san.push('+');
        }
        Some((san, next))
    }

    fn san_moves(pos: &Chess) -> Vec<String> {
        pos.legal_moves()
            .iter()
            .map(|mv| San::from_move(pos, mv.clone()).to_string())
            .collect()
    }
}

impl RulesOracle for StandardRules {
    fn san_line(&self, fen: &str, lans: &[String]) -> Result<Vec<String>, RulesError> {
        let mut pos = Self::position(fen)?;
        let mut sans = Vec::with_capacity(lans.len());

        for lan in lans {
            let Some(mv) = Self::to_move(&pos, lan) else {
                break;
            };
            let Some((san, next)) = Self::play_san(pos, mv) else {
                break;
            };
            sans.push(san);
            pos = next;
        }

        Ok(sans)
    }

    fn play(&self, fen: &str, lan: &str) -> Result<PlayedMove, RulesError> {
        let pos = Self::position(fen)?;
        let mv = Self::to_move(&pos, lan).ok_or_else(|| Self::illegal(fen, lan))?;
        let (san, next) = Self::play_san(pos, mv).ok_or_else(|| Self::illegal(fen, lan))?;

        Ok(PlayedMove {
            fen: Fen::from_position(&next, EnPassantMode::Legal).to_string(),
            san,
            legal_moves: Self::san_moves(&next),
        })
    }

    fn legal_moves(&self, fen: &str) -> Result<Vec<String>, RulesError> {
        Ok(Self::san_moves(&Self::position(fen)?))
    }

    fn material_swing(&self, fen: &str, lan: &str, reply: Option<&str>) -> Result<i32, RulesError> {
        let pos = Self::position(fen)?;
        let mover = pos.turn();
        let before = material_balance(&pos, mover);

        let mv = Self::to_move(&pos, lan).ok_or_else(|| Self::illegal(fen, lan))?;
        let mut after = pos.play(mv).map_err(|_| Self::illegal(fen, lan))?;

        if let Some(reply) = reply {
            if let Some(mv) = Self::to_move(&after, reply) {
                if let Ok(next) = after.clone().play(mv) {
                    after = next;
                }
            }
        }

        Ok(before - material_balance(&after, mover))
    }
}

fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 1,
        Role::Knight | Role::Bishop => 3,
        Role::Rook => 5,
        Role::Queen => 9,
        Role::King => 0,
    }
}

/// Material of `color` minus material of the opponent, in pawns.
fn material_balance(pos: &Chess, color: Color) -> i32 {
    let board = pos.board();
    board
        .occupied()
        .into_iter()
        .filter_map(|sq| board.piece_at(sq))
        .map(|piece| {
            let value = piece_value(piece.role);
            if piece.color == color {
                value
            } else {
                -value
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lans(moves: &str) -> Vec<String> {
        moves.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_side_to_move() {
        assert_eq!(side_to_move(STARTING_FEN), Color::White);
        assert_eq!(
            side_to_move("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"),
            Color::Black
        );
    }

    #[test]
    fn test_san_line() {
        let sans = StandardRules
            .san_line(STARTING_FEN, &lans("e2e4 e7e5 g1f3 b8c6 f1b5"))
            .unwrap();
        assert_eq!(sans, vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);
    }

    #[test]
    fn test_san_line_stops_at_illegal_move() {
        let sans = StandardRules
            .san_line(STARTING_FEN, &lans("e2e4 e7e5 e1e3 b8c6"))
            .unwrap();
        assert_eq!(sans, vec!["e4", "e5"]);
    }

    #[test]
    fn test_san_line_marks_checks_and_mate() {
        let sans = StandardRules
            .san_line(STARTING_FEN, &lans("f2f3 e7e5 g2g4 d8h4"))
            .unwrap();
        assert_eq!(sans.last().map(String::as_str), Some("Qh4#"));
    }

    #[test]
    fn test_play() {
        let played = StandardRules.play(STARTING_FEN, "g1f3").unwrap();
        assert_eq!(played.san, "Nf3");
        assert_eq!(side_to_move(&played.fen), Color::Black);
        assert_eq!(played.legal_moves.len(), 20);
    }

    #[test]
    fn test_play_rejects_illegal_move() {
        let err = StandardRules.play(STARTING_FEN, "e2e5").unwrap_err();
        assert!(matches!(err, RulesError::IllegalMove { .. }));
        assert!(matches!(
            StandardRules.play("not a fen", "e2e4").unwrap_err(),
            RulesError::InvalidFen(_)
        ));
    }

    #[test]
    fn test_legal_moves_at_start() {
        assert_eq!(StandardRules.legal_moves(STARTING_FEN).unwrap().len(), 20);
    }

    #[test]
    fn test_material_swing_of_sacrifice() {
        // White bishop takes f7 and the king recaptures.
        let fen = "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 2 3";
        let swing = StandardRules.material_swing(fen, "c4f7", Some("e8f7")).unwrap();
        assert_eq!(swing, 2);
    }

    #[test]
    fn test_material_swing_of_quiet_move() {
        assert_eq!(StandardRules.material_swing(STARTING_FEN, "e2e4", Some("e7e5")).unwrap(), 0);
        assert_eq!(StandardRules.material_swing(STARTING_FEN, "e2e4", None).unwrap(), 0);
    }

    #[test]
    fn test_material_swing_ignores_illegal_reply() {
        assert_eq!(StandardRules.material_swing(STARTING_FEN, "e2e4", Some("a1a1")).unwrap(), 0);
    }
}

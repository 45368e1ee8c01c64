//! Chess position evaluation types.

use std::fmt;

use serde::{Deserialize, Serialize};
use shakmaty::Color;

/// Evaluation of a position from White's point of view.
///
/// `score` is in centipawns, or the signed mate distance when `is_mate` is
/// set (positive = White mates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AbsoluteEvaluation {
    pub score: i32,
    pub is_mate: bool,
}

impl AbsoluteEvaluation {
    /// Centipawn evaluation (positive = White advantage).
    pub const fn centipawns(cp: i32) -> Self {
        Self {
            score: cp,
            is_mate: false,
        }
    }

    /// Mate in `n` (positive = White mates, negative = Black mates).
    pub const fn mate(n: i32) -> Self {
        Self {
            score: n,
            is_mate: true,
        }
    }

    /// Score from `color`'s point of view.
    pub fn for_side(&self, color: Color) -> i32 {
        match color {
            Color::White => self.score,
            Color::Black => self.score.saturating_neg(),
        }
    }

    /// Returns true if this is a forced mate delivered by `color`.
    pub fn is_mate_for(&self, color: Color) -> bool {
        self.is_mate && self.for_side(color) > 0
    }
}

impl fmt::Display for AbsoluteEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mate {
            write!(f, "#{}", self.score)
        } else {
            write!(f, "{:+.2}", f64::from(self.score) / 100.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_side() {
        let eval = AbsoluteEvaluation::centipawns(45);
        assert_eq!(eval.for_side(Color::White), 45);
        assert_eq!(eval.for_side(Color::Black), -45);
    }

    #[test]
    fn test_for_side_saturates() {
        let eval = AbsoluteEvaluation::centipawns(i32::MIN);
        assert_eq!(eval.for_side(Color::Black), i32::MAX);
        assert!(!AbsoluteEvaluation::mate(i32::MIN).is_mate_for(Color::White));
        assert!(AbsoluteEvaluation::mate(i32::MIN).is_mate_for(Color::Black));
    }

    #[test]
    fn test_is_mate_for() {
        let white_mates = AbsoluteEvaluation::mate(3);
        assert!(white_mates.is_mate_for(Color::White));
        assert!(!white_mates.is_mate_for(Color::Black));

        let black_mates = AbsoluteEvaluation::mate(-2);
        assert!(black_mates.is_mate_for(Color::Black));

        assert!(!AbsoluteEvaluation::centipawns(900).is_mate_for(Color::White));
        assert!(!AbsoluteEvaluation::mate(0).is_mate_for(Color::White));
        assert!(!AbsoluteEvaluation::mate(0).is_mate_for(Color::Black));
    }

    #[test]
    fn test_default_is_level() {
        let eval = AbsoluteEvaluation::default();
        assert_eq!(eval, AbsoluteEvaluation::centipawns(0));
    }

    #[test]
    fn test_display() {
        assert_eq!(AbsoluteEvaluation::centipawns(45).to_string(), "+0.45");
        assert_eq!(AbsoluteEvaluation::centipawns(-130).to_string(), "-1.30");
        assert_eq!(AbsoluteEvaluation::mate(-3).to_string(), "#-3");
    }
}

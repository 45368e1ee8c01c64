//! Move classification.
//!
//! [`classify`] labels the move that leads from one [`Line`] to the next.
//! The decision itself lives in [`classify_move`], which works on plain
//! [`MoveFacts`] so it can be exercised without building lines.
//!
//! Order of decisions:
//!
//! 1. `Book` if the resulting position is known theory
//! 2. `Forced` if the previous position had a single legal move
//! 3. `Best` if the move is the engine's preferred move
//! 4. Otherwise the continuous grade from [`classify_evaluations`]
//!
//! followed by the overrides `Brilliant`, `MissedWin` and `Miss`, first
//! match wins.

use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::classification::Classification;
use crate::evaluation::AbsoluteEvaluation;
use crate::grade::classify_evaluations;
use crate::line::Line;

/// Material (in pawns) a move must give up to count as a sacrifice.
pub const SACRIFICE_THRESHOLD: i32 = 2;

/// Tunable classifier behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierOptions {
    /// Upgrade best moves that give up material to `Brilliant`.
    pub detect_sacrifices: bool,
    /// Grade a slower but still winning mate as `Good`.
    pub soften_slower_mates: bool,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            detect_sacrifices: true,
            soften_slower_mates: true,
        }
    }
}

/// Everything the classifier looks at for one move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveFacts<'a> {
    /// The move played (LAN).
    pub played: &'a str,
    /// Side that played it.
    pub mover: Color,
    /// Engine's preferred move in the previous position.
    pub previous_best: &'a str,
    /// Number of legal moves in the previous position.
    pub previous_legal_moves: usize,
    pub previous_evaluation: AbsoluteEvaluation,
    pub current_evaluation: AbsoluteEvaluation,
    /// Label given to the move before this one.
    pub previous_classification: Option<Classification>,
    /// Resulting position is known opening theory.
    pub in_theory: bool,
    pub is_sacrifice: bool,
}

/// Labels a move from its facts. Pure.
pub fn classify_move(facts: &MoveFacts<'_>, options: &ClassifierOptions) -> Classification {
    let base = if facts.in_theory {
        Classification::Book
    } else if facts.previous_legal_moves == 1 {
        Classification::Forced
    } else if facts.played == facts.previous_best {
        Classification::Best
    } else {
        classify_evaluations(
            facts.mover,
            facts.previous_evaluation,
            facts.current_evaluation,
            options,
        )
    };

    let mate_slipped = facts.previous_evaluation.is_mate_for(facts.mover)
        && !facts.current_evaluation.is_mate_for(facts.mover);

    if facts.is_sacrifice && base == Classification::Best {
        Classification::Brilliant
    } else if mate_slipped {
        Classification::MissedWin
    } else if is_repeated_error(facts.previous_classification, base) {
        Classification::Miss
    } else {
        base
    }
}

fn is_repeated_error(previous: Option<Classification>, current: Classification) -> bool {
    matches!(
        (previous, current),
        (Some(Classification::Blunder), Classification::Blunder)
            | (Some(Classification::Mistake), Classification::Mistake)
    )
}

/// Collects the facts for the move leading from `previous` to `current`.
pub fn move_facts<'a>(previous: &'a Line, current: &'a Line, is_sacrifice: bool) -> MoveFacts<'a> {
    MoveFacts {
        played: current.lan(),
        mover: previous.turn(),
        previous_best: previous.best_move(),
        previous_legal_moves: previous.legal_moves().len(),
        previous_evaluation: previous.evaluation(),
        current_evaluation: current.evaluation(),
        previous_classification: previous.classification(),
        in_theory: current.is_in_theory(),
        is_sacrifice,
    }
}

/// Labels the move that leads from `previous` to `current`.
///
/// Both lines are expected to have a confirmed best move. Nothing is
/// written back; committing the label is up to the caller.
pub fn classify(
    previous: &Line,
    current: &Line,
    is_sacrifice: bool,
    options: &ClassifierOptions,
) -> Classification {
    classify_move(&move_facts(previous, current, is_sacrifice), options)
}

/// Whether a material swing counts as a sacrifice.
pub fn is_sacrifice(material_swing: i32) -> bool {
    material_swing >= SACRIFICE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> MoveFacts<'static> {
        MoveFacts {
            played: "g1f3",
            mover: Color::White,
            previous_best: "e2e4",
            previous_legal_moves: 20,
            previous_evaluation: AbsoluteEvaluation::centipawns(50),
            current_evaluation: AbsoluteEvaluation::centipawns(45),
            previous_classification: None,
            in_theory: false,
            is_sacrifice: false,
        }
    }

    fn label(facts: &MoveFacts<'_>) -> Classification {
        classify_move(facts, &ClassifierOptions::default())
    }

    #[test]
    fn test_small_loss_is_excellent() {
        assert_eq!(label(&facts()), Classification::Excellent);
    }

    #[test]
    fn test_book_comes_first() {
        let f = MoveFacts {
            in_theory: true,
            previous_legal_moves: 1,
            ..facts()
        };
        assert_eq!(label(&f), Classification::Book);
    }

    #[test]
    fn test_single_reply_is_forced_whatever_the_loss() {
        let f = MoveFacts {
            previous_legal_moves: 1,
            current_evaluation: AbsoluteEvaluation::centipawns(-900),
            ..facts()
        };
        assert_eq!(label(&f), Classification::Forced);
    }

    #[test]
    fn test_engine_move_is_best() {
        let f = MoveFacts {
            played: "e2e4",
            ..facts()
        };
        assert_eq!(label(&f), Classification::Best);
    }

    #[test]
    fn test_sacrifice_upgrades_best_only() {
        let best = MoveFacts {
            played: "e2e4",
            is_sacrifice: true,
            ..facts()
        };
        assert_eq!(label(&best), Classification::Brilliant);

        let not_best = MoveFacts {
            is_sacrifice: true,
            ..facts()
        };
        assert_eq!(label(&not_best), Classification::Excellent);
    }

    #[test]
    fn test_missed_win_overrides_grade() {
        let f = MoveFacts {
            previous_evaluation: AbsoluteEvaluation::mate(3),
            current_evaluation: AbsoluteEvaluation::centipawns(600),
            ..facts()
        };
        assert_eq!(label(&f), Classification::MissedWin);
    }

    #[test]
    fn test_missed_win_for_black() {
        let f = MoveFacts {
            mover: Color::Black,
            previous_evaluation: AbsoluteEvaluation::mate(-2),
            current_evaluation: AbsoluteEvaluation::centipawns(-300),
            ..facts()
        };
        assert_eq!(label(&f), Classification::MissedWin);
    }

    #[test]
    fn test_keeping_the_mate_is_not_missed() {
        let f = MoveFacts {
            previous_evaluation: AbsoluteEvaluation::mate(3),
            current_evaluation: AbsoluteEvaluation::mate(2),
            ..facts()
        };
        assert_ne!(label(&f), Classification::MissedWin);
    }

    #[test]
    fn test_repeated_blunder_is_miss() {
        let f = MoveFacts {
            previous_evaluation: AbsoluteEvaluation::centipawns(100),
            current_evaluation: AbsoluteEvaluation::centipawns(-300),
            ..facts()
        };
        assert_eq!(label(&f), Classification::Blunder);

        let repeated = MoveFacts {
            previous_classification: Some(Classification::Blunder),
            ..f
        };
        assert_eq!(label(&repeated), Classification::Miss);

        let after_mistake = MoveFacts {
            previous_classification: Some(Classification::Mistake),
            ..f
        };
        assert_eq!(label(&after_mistake), Classification::Blunder);
    }

    #[test]
    fn test_repeated_mistake_is_miss() {
        let f = MoveFacts {
            previous_evaluation: AbsoluteEvaluation::centipawns(150),
            current_evaluation: AbsoluteEvaluation::centipawns(0),
            ..facts()
        };
        assert_eq!(label(&f), Classification::Mistake);

        let repeated = MoveFacts {
            previous_classification: Some(Classification::Mistake),
            ..f
        };
        assert_eq!(label(&repeated), Classification::Miss);

        let after_blunder = MoveFacts {
            previous_classification: Some(Classification::Blunder),
            ..f
        };
        assert_eq!(label(&after_blunder), Classification::Mistake);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let f = facts();
        assert_eq!(label(&f), label(&f));
    }

    #[test]
    fn test_sacrifice_threshold() {
        assert!(!is_sacrifice(0));
        assert!(!is_sacrifice(1));
        assert!(is_sacrifice(2));
        assert!(is_sacrifice(9));
    }
}

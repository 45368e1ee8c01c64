//! Continuous move grading.
//!
//! Maps the change in evaluation caused by a move onto one of the six
//! continuous tiers. The cutoff polynomials and grade ranges are fitted
//! constants and are reproduced exactly; do not simplify them.

use serde::Serialize;
use shakmaty::Color;

use crate::classification::Classification;
use crate::classifier::ClassifierOptions;
use crate::evaluation::AbsoluteEvaluation;

/// Differences are clamped to this many pawns.
pub const MAX_DIFFERENCE: f64 = 1000.0;

/// Pseudo-pawn value of an immediate mate.
const MATE_VALUE: f64 = 1000.0;

/// Rational falloff of the blunder band.
const BLUNDER_NUMERATOR: f64 = 4.9;
const BLUNDER_DENOMINATOR: f64 = 0.1215;

/// Grade band, from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeLetter {
    Blunder,
    Mistake,
    Inaccuracy,
    Good,
    Excellent,
    Best,
}

impl GradeLetter {
    const BANDS: [GradeLetter; 6] = [
        GradeLetter::Blunder,
        GradeLetter::Mistake,
        GradeLetter::Inaccuracy,
        GradeLetter::Good,
        GradeLetter::Excellent,
        GradeLetter::Best,
    ];

    /// Grade number range covered by this band.
    pub fn range(self) -> (f64, f64) {
        match self {
            GradeLetter::Blunder => (0.0, 40.0),
            GradeLetter::Mistake => (40.0, 60.0),
            GradeLetter::Inaccuracy => (60.0, 80.0),
            GradeLetter::Good => (80.0, 95.0),
            GradeLetter::Excellent => (95.0, 98.0),
            GradeLetter::Best => (98.0, 100.0),
        }
    }
}

/// Result of the grade curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoveGrade {
    pub letter: GradeLetter,
    /// 0-100, cosmetic.
    pub number: f64,
    /// 0 = blunder .. 5 = best.
    pub index: usize,
}

/// Difference cutoffs for a resulting score, most severe first.
pub fn sdiff_cutoffs(score: f64) -> [f64; 5] {
    let value = score.abs().min(20.0);
    [
        0.001776052 * value.powf(3.0) + -0.018218136 * value.powf(2.0) + 0.303967449 * value + 2.0,
        0.001304692 * value.powf(3.0) + -0.011609068 * value.powf(2.0) + 0.205317058 * value + 1.1,
        4461266e-10 * value.powf(3.0) + 0.0041181833 * value.powf(2.0) + 0.0141864828 * value + 0.5,
        2172109e-10 * value.powf(3.0) + -0.0010745878 * value.powf(2.0) + 0.0295840731 * value + 0.1,
        0.0,
    ]
}

/// Grades a move from the pawn difference it conceded and the resulting score.
pub fn move_grade(difference: f64, current_score: f64) -> MoveGrade {
    if difference <= 0.0 {
        return MoveGrade {
            letter: GradeLetter::Best,
            number: 100.0,
            index: 5,
        };
    }

    let difference = difference.min(MAX_DIFFERENCE);
    let cutoffs = sdiff_cutoffs(current_score);
    let index = cutoffs.iter().position(|&c| difference >= c).unwrap_or(0);
    let letter = GradeLetter::BANDS[index];

    let number = if letter == GradeLetter::Blunder {
        let sdiff = cutoffs[0];
        let (_, higher) = letter.range();
        let scaled = (MAX_DIFFERENCE / (MAX_DIFFERENCE - sdiff) * (difference - sdiff)).min(MAX_DIFFERENCE);
        higher - BLUNDER_NUMERATOR * scaled / (1.0 + BLUNDER_DENOMINATOR * scaled)
    } else {
        let (lower, higher) = letter.range();
        let previous = cutoffs[index - 1];
        lower + (difference - previous) / (cutoffs[index] - previous) * (higher - lower)
    };

    MoveGrade {
        letter,
        number: number.clamp(0.0, 100.0),
        index,
    }
}

/// Score in pawns from the mover's point of view, with mates mapped onto
/// `±(1000 - 10·n)`.
fn mover_score(eval: AbsoluteEvaluation, multiplier: f64) -> f64 {
    let pawns = f64::from(eval.score) * multiplier / 100.0;
    if !eval.is_mate {
        return pawns;
    }
    if eval.score == 0 {
        // Mate 0 carries no sign; pawns is always zero here.
        return if pawns > 0.0 { MATE_VALUE } else { -MATE_VALUE };
    }
    (MATE_VALUE - 10.0 * f64::from(eval.score.abs())) * f64::from(eval.score.signum()) * multiplier
}

/// Grades the transition from `previous` to `current` for the side `mover`.
///
/// The ceiling step and the floor step are evaluated as a single ordered
/// chain; the first matching threshold wins.
pub fn classify_evaluations(
    mover: Color,
    previous: AbsoluteEvaluation,
    current: AbsoluteEvaluation,
    options: &ClassifierOptions,
) -> Classification {
    let multiplier = match mover {
        Color::White => 1.0,
        Color::Black => -1.0,
    };
    let mut previous_score = mover_score(previous, multiplier);
    let current_score = mover_score(current, multiplier);

    if previous_score < current_score {
        previous_score = current_score;
    }

    let mut ceiling = tier(Classification::Blunder);
    let mut floor = tier(Classification::Best);

    if current_score >= 10.0 {
        ceiling = tier(Classification::Excellent);
    } else if current_score >= 7.0 {
        ceiling = tier(Classification::Good);
    } else if current_score >= 6.0 {
        ceiling = tier(Classification::Inaccuracy);
    } else if current_score >= 5.0 {
        ceiling = tier(Classification::Mistake);
    } else if current_score <= -25.0 && previous_score >= -5.0 {
        floor = tier(Classification::Blunder);
    } else if current_score <= -25.0 && previous_score >= -10.0 {
        floor = tier(Classification::Mistake);
    } else if current_score <= -20.0 && previous_score >= -15.0 {
        floor = tier(Classification::Inaccuracy);
    }

    let difference = (((previous_score - current_score) * 100.0).round() / 100.0).abs();
    let grade = move_grade(difference, current_score);

    let mut result = 5 - grade.index as u8;
    if result > ceiling {
        result = ceiling;
    } else if result < floor {
        result = floor;
    }

    if options.soften_slower_mates && is_slower_mate(previous, current, mover) {
        return Classification::Good;
    }

    Classification::from_tier(result)
}

/// Both evaluations are winning mates for `mover` and the new one takes longer.
fn is_slower_mate(previous: AbsoluteEvaluation, current: AbsoluteEvaluation, mover: Color) -> bool {
    if !(previous.is_mate && current.is_mate) || previous.score == current.score {
        return false;
    }
    let before = previous.for_side(mover);
    let after = current.for_side(mover);
    before > 0 && after > 0 && before < after
}

fn tier(c: Classification) -> u8 {
    c.tier().unwrap_or(5)
}

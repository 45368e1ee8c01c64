//! Per-ply evaluation state.
//!
//! A [`Line`] is one ply of the game: the position reached by a move plus
//! everything the engine has said about it so far.

use std::cmp::Ordering;

use shakmaty::Color;
use thiserror::Error;
use tracing::trace;

use crate::accuracy::{accuracy, win_chance, win_percent};
use crate::classification::Classification;
use crate::evaluation::AbsoluteEvaluation;
use crate::pv::{PrincipalVariation, RawPv};
use crate::rules::{side_to_move, RulesError, RulesOracle};

/// Best move reported for a line with no PVs.
pub const NO_MOVE: &str = "a1a1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("Best move {lan} is not among the tracked PVs")]
    BestMoveNotFound { lan: String },
    #[error("Line is already classified as {existing}")]
    AlreadyClassified { existing: Classification },
}

/// Search progress of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    /// No PV yet.
    Pending,
    /// PVs arriving, best move not confirmed.
    Searching,
    /// Best move confirmed.
    Finalized,
}

#[derive(Debug, Clone)]
pub struct Line {
    fen: String,
    lan: String,
    san: String,
    side: Color,
    turn: Color,
    legal_moves: Vec<String>,
    is_in_theory: bool,
    multi_pv: usize,

    pvs: Vec<PrincipalVariation>,
    best_move_found: bool,
    classification: Option<Classification>,
    accuracy: f64,
    win_chance: f64,
}

impl Line {
    /// A line for the position `fen`, reached by `lan`/`san`.
    ///
    /// `legal_moves` are the replies available in `fen`. `multi_pv` bounds
    /// how many PVs at the best depth are kept.
    pub fn new(
        fen: impl Into<String>,
        lan: impl Into<String>,
        san: impl Into<String>,
        legal_moves: Vec<String>,
        is_in_theory: bool,
        multi_pv: usize,
    ) -> Self {
        let fen = fen.into();
        let turn = side_to_move(&fen);

        Self {
            fen,
            lan: lan.into(),
            san: san.into(),
            side: turn.other(),
            turn,
            legal_moves,
            is_in_theory,
            multi_pv,
            pvs: Vec::new(),
            best_move_found: false,
            classification: None,
            accuracy: 100.0,
            win_chance: 0.0,
        }
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn lan(&self) -> &str {
        &self.lan
    }

    pub fn san(&self) -> &str {
        &self.san
    }

    /// Side that played the move.
    pub fn side(&self) -> Color {
        self.side
    }

    /// Side to move next.
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Legal replies in SAN.
    pub fn legal_moves(&self) -> &[String] {
        &self.legal_moves
    }

    pub fn is_in_theory(&self) -> bool {
        self.is_in_theory
    }

    pub fn multi_pv(&self) -> usize {
        self.multi_pv
    }

    /// PVs, best first.
    pub fn pvs(&self) -> &[PrincipalVariation] {
        &self.pvs
    }

    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }

    /// 0-100.
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// In (-1, 1), positive favours White.
    pub fn win_chance(&self) -> f64 {
        self.win_chance
    }

    /// Win chance as a 0-100 percentage for `color`.
    pub fn win_chance_for(&self, color: Color) -> f64 {
        win_percent(self.win_chance, color)
    }

    /// Adds or replaces the PV for `raw.lan`, then re-sorts and prunes.
    ///
    /// When `previous` has been evaluated, accuracy is recomputed against
    /// it. Returns whether pruning found a cut point, which means the
    /// leading candidates may have changed.
    pub fn update_pv<R>(&mut self, raw: RawPv, previous: Option<&Line>, rules: &R) -> Result<bool, RulesError>
    where
        R: RulesOracle + ?Sized,
    {
        let pv = PrincipalVariation::build(&self.fen, raw, rules)?;

        match self.pvs.iter_mut().find(|existing| existing.lan == pv.lan) {
            Some(existing) => *existing = pv,
            None => self.pvs.push(pv),
        }

        let purged = self.sort_pvs();
        self.update_win_chance();

        if let Some(previous) = previous.filter(|p| !p.has_no_evaluation()) {
            self.update_accuracy(previous.win_chance_for(previous.turn));
        }

        Ok(purged)
    }

    /// Confirms the engine's final choice, moving it to the front.
    pub fn update_best_move(&mut self, lan: &str) -> Result<(), LineError> {
        let index = self
            .pvs
            .iter()
            .position(|pv| pv.lan == lan)
            .ok_or_else(|| LineError::BestMoveNotFound { lan: lan.to_string() })?;

        if index > 0 {
            let pv = self.pvs.remove(index);
            self.pvs.insert(0, pv);
            self.update_win_chance();
        }
        self.best_move_found = true;
        Ok(())
    }

    /// Records the classification. A line is classified at most once.
    pub fn set_classification(&mut self, classification: Classification) -> Result<(), LineError> {
        if let Some(existing) = self.classification {
            return Err(LineError::AlreadyClassified { existing });
        }
        self.classification = Some(classification);
        Ok(())
    }

    /// Evaluation of the leading PV, level when there is none.
    pub fn evaluation(&self) -> AbsoluteEvaluation {
        self.best_pv().map(PrincipalVariation::evaluation).unwrap_or_default()
    }

    /// Leading move (LAN), or [`NO_MOVE`] when there is none.
    pub fn best_move(&self) -> &str {
        self.best_pv().map_or(NO_MOVE, |pv| pv.lan.as_str())
    }

    pub fn best_pv(&self) -> Option<&PrincipalVariation> {
        self.pvs.first()
    }

    pub fn find_pv(&self, lan: &str) -> Option<&PrincipalVariation> {
        self.pvs.iter().find(|pv| pv.lan == lan)
    }

    /// PVs searched as deep as the leading one.
    pub fn candidates(&self) -> impl Iterator<Item = &PrincipalVariation> {
        let depth = self.best_pv().map_or(0, |pv| pv.depth);
        self.pvs.iter().filter(move |pv| pv.depth >= depth)
    }

    /// Whether the leading PV is a forced mate, delivered by `color` if given.
    pub fn is_mate(&self, color: Option<Color>) -> bool {
        let eval = match self.best_pv() {
            Some(pv) if pv.is_mate => pv.evaluation(),
            _ => return false,
        };
        match color {
            None => true,
            Some(color) => eval.is_mate_for(color),
        }
    }

    pub fn is_evaluation_finished(&self) -> bool {
        self.best_move_found
    }

    pub fn has_no_evaluation(&self) -> bool {
        self.pvs.is_empty()
    }

    pub fn is_game_over(&self) -> bool {
        self.legal_moves.is_empty()
    }

    pub fn state(&self) -> LineState {
        if self.best_move_found {
            LineState::Finalized
        } else if self.pvs.is_empty() {
            LineState::Pending
        } else {
            LineState::Searching
        }
    }

    /// Sorts best first and prunes. Returns true if a cut point was found.
    fn sort_pvs(&mut self) -> bool {
        if self.pvs.is_empty() {
            return false;
        }

        self.pvs.sort_by(compare_pvs);

        let cut = prune_index(&self.pvs, self.multi_pv.min(self.legal_moves.len()));
        if let Some(cut) = cut {
            self.pvs.truncate(cut);
            trace!(fen = %self.fen, kept = self.pvs.len(), "pruned PVs");
        }
        cut.is_some()
    }

    fn update_win_chance(&mut self) {
        self.win_chance = self
            .best_pv()
            .map_or(0.0, |pv| win_chance(f64::from(pv.absolute_score)));
    }

    fn update_accuracy(&mut self, previous_win_percent: f64) {
        self.accuracy = accuracy(previous_win_percent, self.win_chance_for(self.side));
    }
}

/// Orders PVs of one position, best first, from the side to move.
///
/// Winning mates (fastest first), then plain scores (deepest first, then
/// highest score), then losing mates (longest resistance first). Remaining
/// ties fall back to the engine rank and the move itself so the order does
/// not depend on arrival.
pub fn compare_pvs(a: &PrincipalVariation, b: &PrincipalVariation) -> Ordering {
    fn group(pv: &PrincipalVariation) -> u8 {
        match (pv.is_mate, pv.score > 0) {
            (true, true) => 0,
            (false, _) => 1,
            (true, false) => 2,
        }
    }

    group(a)
        .cmp(&group(b))
        .then_with(|| match group(a) {
            0 | 2 => a.score.cmp(&b.score),
            _ => b.depth.cmp(&a.depth).then_with(|| b.score.cmp(&a.score)),
        })
        .then_with(|| a.multipv.cmp(&b.multipv))
        .then_with(|| a.lan.cmp(&b.lan))
}

/// Where to cut a sorted PV list, if anywhere.
///
/// Scanning from index 1: cut right after the entry that brings the number
/// of entries at the best depth to `limit`, or right before the first entry
/// searched two or more plies shallower than the best.
fn prune_index(pvs: &[PrincipalVariation], limit: usize) -> Option<usize> {
    let best_depth = pvs.first()?.depth;
    let limit = limit.max(1);

    if limit == 1 {
        return (pvs.len() > 1).then_some(1);
    }

    let mut at_best_depth = 1;
    for (idx, pv) in pvs.iter().enumerate().skip(1) {
        if pv.depth == best_depth {
            at_best_depth += 1;
            if at_best_depth >= limit {
                return Some(idx + 1);
            }
        } else if pv.depth + 2 <= best_depth {
            return Some(idx);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{StandardRules, STARTING_FEN};

    fn start_line(multi_pv: usize) -> Line {
        let legal = StandardRules.legal_moves(STARTING_FEN).unwrap();
        Line::new(STARTING_FEN, "", "", legal, false, multi_pv)
    }

    fn raw(lan: &str, depth: u32, score: i32, is_mate: bool, multipv: u32) -> RawPv {
        RawPv {
            lan: lan.to_string(),
            line: vec![lan.to_string()],
            depth,
            seldepth: depth,
            multipv,
            score,
            absolute_score: score,
            is_mate,
            nodes: 1000,
            nps: 1000,
        }
    }

    fn lans(line: &Line) -> Vec<&str> {
        line.pvs().iter().map(|pv| pv.lan.as_str()).collect()
    }

    #[test]
    fn test_new_line_identity() {
        let line = start_line(3);
        assert_eq!(line.turn(), Color::White);
        assert_eq!(line.side(), Color::Black);
        assert_eq!(line.state(), LineState::Pending);
        assert_eq!(line.accuracy(), 100.0);
        assert_eq!(line.win_chance(), 0.0);
        assert_eq!(line.best_move(), NO_MOVE);
        assert_eq!(line.evaluation(), AbsoluteEvaluation::default());
    }

    #[test]
    fn test_update_replaces_same_move() {
        let mut line = start_line(3);
        line.update_pv(raw("e2e4", 10, 20, false, 1), None, &StandardRules).unwrap();
        line.update_pv(raw("e2e4", 11, 35, false, 1), None, &StandardRules).unwrap();

        assert_eq!(line.pvs().len(), 1);
        assert_eq!(line.pvs()[0].depth, 11);
        assert_eq!(line.state(), LineState::Searching);
    }

    #[test]
    fn test_sort_deeper_then_higher() {
        let mut line = start_line(5);
        line.update_pv(raw("d2d4", 12, 40, false, 2), None, &StandardRules).unwrap();
        line.update_pv(raw("e2e4", 12, 55, false, 1), None, &StandardRules).unwrap();
        line.update_pv(raw("c2c4", 13, 10, false, 3), None, &StandardRules).unwrap();

        assert_eq!(lans(&line), vec!["c2c4", "e2e4", "d2d4"]);
    }

    #[test]
    fn test_sort_mates() {
        let mut line = start_line(5);
        line.update_pv(raw("e2e4", 20, 300, false, 1), None, &StandardRules).unwrap();
        line.update_pv(raw("d2d4", 20, -3, true, 2), None, &StandardRules).unwrap();
        line.update_pv(raw("c2c4", 20, 5, true, 3), None, &StandardRules).unwrap();
        line.update_pv(raw("g1f3", 20, 2, true, 4), None, &StandardRules).unwrap();
        line.update_pv(raw("b1c3", 20, -6, true, 5), None, &StandardRules).unwrap();

        assert_eq!(lans(&line), vec!["g1f3", "c2c4", "e2e4", "b1c3", "d2d4"]);
    }

    #[test]
    fn test_prune_shallow_entries() {
        let mut line = start_line(5);
        line.update_pv(raw("e2e4", 10, 30, false, 1), None, &StandardRules).unwrap();
        line.update_pv(raw("d2d4", 9, 20, false, 2), None, &StandardRules).unwrap();
        let purged = line.update_pv(raw("c2c4", 12, 25, false, 3), None, &StandardRules).unwrap();

        assert!(purged);
        assert_eq!(lans(&line), vec!["c2c4"]);
    }

    #[test]
    fn test_prune_at_multi_pv() {
        let mut line = start_line(2);
        line.update_pv(raw("e2e4", 10, 30, false, 1), None, &StandardRules).unwrap();
        let purged = line.update_pv(raw("d2d4", 10, 20, false, 2), None, &StandardRules).unwrap();
        assert!(purged);

        line.update_pv(raw("c2c4", 10, 10, false, 3), None, &StandardRules).unwrap();
        assert_eq!(lans(&line), vec!["e2e4", "d2d4"]);
    }

    #[test]
    fn test_no_cut_reports_not_purged() {
        let mut line = start_line(3);
        assert!(!line.update_pv(raw("e2e4", 10, 30, false, 1), None, &StandardRules).unwrap());
        assert!(!line.update_pv(raw("d2d4", 9, 20, false, 2), None, &StandardRules).unwrap());
    }

    #[test]
    fn test_single_legal_move_keeps_one() {
        // White king on f7 leaves Kh7 as the only move.
        let fen = "7k/5K2/8/8/8/8/8/8 b - - 0 1";
        let legal = StandardRules.legal_moves(fen).unwrap();
        assert_eq!(legal, vec!["Kh7"]);

        let mut line = Line::new(fen, "", "", legal, false, 3);
        line.update_pv(raw("h8h7", 10, 0, false, 1), None, &StandardRules).unwrap();
        assert_eq!(line.pvs().len(), 1);
    }

    #[test]
    fn test_update_rejects_illegal_pv() {
        let mut line = start_line(3);
        let err = line.update_pv(raw("e2e5", 10, 30, false, 1), None, &StandardRules);
        assert!(err.is_err());
        assert!(line.has_no_evaluation());
    }

    #[test]
    fn test_best_move_moves_to_front() {
        let mut line = start_line(5);
        line.update_pv(raw("e2e4", 10, 30, false, 1), None, &StandardRules).unwrap();
        line.update_pv(raw("d2d4", 10, 20, false, 2), None, &StandardRules).unwrap();

        line.update_best_move("d2d4").unwrap();
        assert_eq!(line.best_move(), "d2d4");
        assert!(line.is_evaluation_finished());
        assert_eq!(line.state(), LineState::Finalized);
        assert!((line.win_chance() - win_chance(20.0)).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_best_move_is_an_error() {
        let mut line = start_line(3);
        line.update_pv(raw("e2e4", 10, 30, false, 1), None, &StandardRules).unwrap();

        let err = line.update_best_move("g1f3").unwrap_err();
        assert_eq!(err, LineError::BestMoveNotFound { lan: "g1f3".to_string() });
        assert!(!line.is_evaluation_finished());
    }

    #[test]
    fn test_classification_is_not_overwritten() {
        let mut line = start_line(3);
        line.set_classification(Classification::Good).unwrap();

        let err = line.set_classification(Classification::Blunder).unwrap_err();
        assert_eq!(
            err,
            LineError::AlreadyClassified {
                existing: Classification::Good
            }
        );
        assert_eq!(line.classification(), Some(Classification::Good));
    }

    #[test]
    fn test_win_chance_and_accuracy() {
        let mut previous = start_line(3);
        previous.update_pv(raw("e2e4", 10, 30, false, 1), None, &StandardRules).unwrap();

        let played = StandardRules.play(STARTING_FEN, "a2a3").unwrap();
        let mut line = Line::new(played.fen, "a2a3", played.san, played.legal_moves, false, 3);
        let mut reply = raw("e7e5", 10, 50, false, 1);
        // Black to move, so White's view is negated.
        reply.absolute_score = -50;
        line.update_pv(reply, Some(&previous), &StandardRules).unwrap();

        assert_eq!(line.side(), Color::White);
        assert!(line.win_chance() < 0.0);
        let expected = accuracy(
            previous.win_chance_for(Color::White),
            line.win_chance_for(Color::White),
        );
        assert_eq!(line.accuracy(), expected);
        assert!(line.accuracy() < 100.0);
    }

    #[test]
    fn test_accuracy_waits_for_evaluated_previous() {
        let previous = start_line(3);
        let played = StandardRules.play(STARTING_FEN, "a2a3").unwrap();
        let mut line = Line::new(played.fen, "a2a3", played.san, played.legal_moves, false, 3);
        line.update_pv(raw("e7e5", 10, 500, false, 1), Some(&previous), &StandardRules)
            .unwrap();
        assert_eq!(line.accuracy(), 100.0);
    }

    #[test]
    fn test_is_mate() {
        let mut line = start_line(3);
        line.update_pv(raw("e2e4", 20, 4, true, 1), None, &StandardRules).unwrap();

        assert!(line.is_mate(None));
        assert!(line.is_mate(Some(Color::White)));
        assert!(!line.is_mate(Some(Color::Black)));
    }

    #[test]
    fn test_candidates_share_best_depth() {
        let mut line = start_line(5);
        line.update_pv(raw("e2e4", 12, 30, false, 1), None, &StandardRules).unwrap();
        line.update_pv(raw("d2d4", 12, 20, false, 2), None, &StandardRules).unwrap();
        line.update_pv(raw("c2c4", 11, 40, false, 3), None, &StandardRules).unwrap();

        let candidates: Vec<&str> = line.candidates().map(|pv| pv.lan.as_str()).collect();
        assert_eq!(candidates, vec!["e2e4", "d2d4"]);
    }
}

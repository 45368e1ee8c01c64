//! Principal variations reported by the engine.

use serde::Serialize;
use tracing::warn;
use uci::{is_move_token, EngineInfo, Score};

use crate::evaluation::AbsoluteEvaluation;
use crate::rules::{RulesError, RulesOracle};

/// One PV update parsed from an engine `info` line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawPv {
    /// First move of the line (LAN).
    pub lan: String,
    /// The whole line (LAN).
    pub line: Vec<String>,
    pub depth: u32,
    pub seldepth: u32,
    /// Rank reported by the engine (1 = best).
    pub multipv: u32,
    /// Score from the side to move.
    pub score: i32,
    /// Score from White.
    pub absolute_score: i32,
    pub is_mate: bool,
    pub nodes: u64,
    pub nps: u64,
}

impl RawPv {
    /// Converts a parsed `info` line searched at `ply`.
    ///
    /// Ply `-1` is the starting position (White to move); even plies have
    /// Black to move. Returns `None` for lines without depth, score or PV,
    /// and for bound scores.
    pub fn from_info(info: &EngineInfo, ply: i32) -> Option<Self> {
        if !info.is_exact_pv() {
            return None;
        }
        let depth = info.depth?;
        let (score, is_mate) = match info.score? {
            Score::Cp(cp) => (cp, false),
            Score::Mate(n) => (n, true),
        };
        let lan = info.pv.first().filter(|m| is_move_token(m))?.clone();

        Some(Self {
            lan,
            line: info.pv.clone(),
            depth,
            seldepth: info.seldepth.unwrap_or(0),
            multipv: info.multipv.unwrap_or(1),
            score,
            absolute_score: absolute_score(score, ply),
            is_mate,
            nodes: info.nodes.unwrap_or(0),
            nps: info.nps.unwrap_or(0),
        })
    }
}

/// Normalises a side-to-move score to White's point of view.
pub fn absolute_score(score: i32, ply: i32) -> i32 {
    if ply % 2 == 0 {
        score.saturating_neg()
    } else {
        score
    }
}

/// A PV enriched with notation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrincipalVariation {
    pub lan: String,
    pub line: Vec<String>,
    pub san: String,
    pub line_san: Vec<String>,
    pub from: String,
    pub to: String,
    pub promotion: Option<char>,
    pub depth: u32,
    pub seldepth: u32,
    pub multipv: u32,
    pub score: i32,
    pub absolute_score: i32,
    pub is_mate: bool,
    pub nodes: u64,
    pub nps: u64,
}

impl PrincipalVariation {
    /// Builds a PV for the position `fen`, replaying the line for SAN.
    ///
    /// Replay stops at the first illegal move; the PV keeps the full LAN
    /// line but only the legal SAN prefix. Fails if the first move is illegal.
    pub fn build<R>(fen: &str, raw: RawPv, rules: &R) -> Result<Self, RulesError>
    where
        R: RulesOracle + ?Sized,
    {
        let line_san = rules.san_line(fen, &raw.line)?;
        let Some(san) = line_san.first().cloned() else {
            return Err(RulesError::IllegalMove {
                fen: fen.to_string(),
                lan: raw.lan,
            });
        };
        if line_san.len() < raw.line.len() {
            warn!(
                lan = %raw.lan,
                legal = line_san.len(),
                total = raw.line.len(),
                "PV contains an illegal move, truncating SAN line"
            );
        }

        Ok(Self {
            from: raw.lan.get(0..2).unwrap_or_default().to_string(),
            to: raw.lan.get(2..4).unwrap_or_default().to_string(),
            promotion: raw.lan.chars().nth(4),
            san,
            line_san,
            lan: raw.lan,
            line: raw.line,
            depth: raw.depth,
            seldepth: raw.seldepth,
            multipv: raw.multipv,
            score: raw.score,
            absolute_score: raw.absolute_score,
            is_mate: raw.is_mate,
            nodes: raw.nodes,
            nps: raw.nps,
        })
    }

    /// Evaluation from White's point of view.
    pub fn evaluation(&self) -> AbsoluteEvaluation {
        AbsoluteEvaluation {
            score: self.absolute_score,
            is_mate: self.is_mate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{StandardRules, STARTING_FEN};
    use uci::{InfoBuilder, ScoreBound};

    #[test]
    fn test_from_info() {
        let info = EngineInfo::parse(
            "info depth 16 seldepth 22 multipv 2 score cp 31 nodes 120000 nps 800000 pv d2d4 d7d5 c2c4",
        )
        .unwrap();
        let raw = RawPv::from_info(&info, -1).unwrap();

        assert_eq!(raw.lan, "d2d4");
        assert_eq!(raw.line.len(), 3);
        assert_eq!(raw.depth, 16);
        assert_eq!(raw.seldepth, 22);
        assert_eq!(raw.multipv, 2);
        assert_eq!(raw.score, 31);
        assert_eq!(raw.absolute_score, 31);
        assert!(!raw.is_mate);
        assert_eq!(raw.nodes, 120000);
        assert_eq!(raw.nps, 800000);
    }

    #[test]
    fn test_absolute_score_follows_ply_parity() {
        assert_eq!(absolute_score(40, -1), 40);
        assert_eq!(absolute_score(40, 0), -40);
        assert_eq!(absolute_score(40, 1), 40);
        assert_eq!(absolute_score(-3, 4), 3);
    }

    #[test]
    fn test_absolute_score_saturates() {
        assert_eq!(absolute_score(i32::MIN, 0), i32::MAX);
        assert_eq!(absolute_score(i32::MIN, 1), i32::MIN);
        assert_eq!(absolute_score(i32::MAX, 2), -i32::MAX);
    }

    #[test]
    fn test_from_info_mate() {
        let info = InfoBuilder::new().depth(20).score_mate(-2).pv(&["e8e7"]).build();
        let raw = RawPv::from_info(&info, 0).unwrap();
        assert!(raw.is_mate);
        assert_eq!(raw.score, -2);
        assert_eq!(raw.absolute_score, 2);
        assert_eq!(raw.multipv, 1);
    }

    #[test]
    fn test_from_info_rejects_incomplete_lines() {
        let no_pv = InfoBuilder::new().depth(10).score_cp(5).build();
        assert!(RawPv::from_info(&no_pv, 0).is_none());

        let no_score = InfoBuilder::new().depth(10).pv(&["e2e4"]).build();
        assert!(RawPv::from_info(&no_score, 0).is_none());

        let bound = InfoBuilder::new()
            .depth(10)
            .score_cp(5)
            .bound(ScoreBound::Upper)
            .pv(&["e2e4"])
            .build();
        assert!(RawPv::from_info(&bound, 0).is_none());

        let garbage = InfoBuilder::new().depth(10).score_cp(5).pv(&["xyz"]).build();
        assert!(RawPv::from_info(&garbage, 0).is_none());
    }

    #[test]
    fn test_build_adds_notation() {
        let info = InfoBuilder::new()
            .depth(12)
            .score_cp(25)
            .pv(&["g1f3", "d7d5", "d2d4"])
            .build();
        let raw = RawPv::from_info(&info, -1).unwrap();
        let pv = PrincipalVariation::build(STARTING_FEN, raw, &StandardRules).unwrap();

        assert_eq!(pv.san, "Nf3");
        assert_eq!(pv.line_san, vec!["Nf3", "d5", "d4"]);
        assert_eq!(pv.from, "g1");
        assert_eq!(pv.to, "f3");
        assert_eq!(pv.promotion, None);
        assert_eq!(pv.evaluation(), AbsoluteEvaluation::centipawns(25));
    }

    #[test]
    fn test_build_promotion() {
        let fen = "8/P7/8/8/8/7k/8/4K3 w - - 0 1";
        let info = InfoBuilder::new().depth(30).score_mate(5).pv(&["a7a8q"]).build();
        let raw = RawPv::from_info(&info, -1).unwrap();
        let pv = PrincipalVariation::build(fen, raw, &StandardRules).unwrap();

        assert_eq!(pv.san, "a8=Q");
        assert_eq!(pv.promotion, Some('q'));
    }

    #[test]
    fn test_build_truncates_illegal_tail() {
        let info = InfoBuilder::new()
            .depth(12)
            .score_cp(25)
            .pv(&["e2e4", "e2e4"])
            .build();
        let raw = RawPv::from_info(&info, -1).unwrap();
        let pv = PrincipalVariation::build(STARTING_FEN, raw, &StandardRules).unwrap();

        assert_eq!(pv.line.len(), 2);
        assert_eq!(pv.line_san, vec!["e4"]);
    }

    #[test]
    fn test_build_rejects_illegal_first_move() {
        let info = InfoBuilder::new().depth(12).score_cp(25).pv(&["e2e5"]).build();
        let raw = RawPv::from_info(&info, -1).unwrap();
        assert!(PrincipalVariation::build(STARTING_FEN, raw, &StandardRules).is_err());
    }
}

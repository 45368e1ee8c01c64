//! Reports handed to whatever renders the review.

use serde::Serialize;
use shakmaty::Color;
use tokio::sync::mpsc;

use crate::classification::Classification;
use crate::evaluation::AbsoluteEvaluation;
use crate::line::Line;
use crate::pv::PrincipalVariation;

/// One ranked PV as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PvReport {
    pub rank: usize,
    pub lan: String,
    pub san: String,
    pub line_san: Vec<String>,
    pub from: String,
    pub to: String,
    pub promotion: Option<char>,
    pub depth: u32,
    pub evaluation: AbsoluteEvaluation,
    /// Searched as deep as the best PV.
    pub candidate: bool,
}

impl PvReport {
    fn new(rank: usize, pv: &PrincipalVariation, best_depth: u32) -> Self {
        Self {
            rank,
            lan: pv.lan.clone(),
            san: pv.san.clone(),
            line_san: pv.line_san.clone(),
            from: pv.from.clone(),
            to: pv.to.clone(),
            promotion: pv.promotion,
            depth: pv.depth,
            evaluation: pv.evaluation(),
            candidate: pv.depth >= best_depth,
        }
    }
}

/// State of one ply after the review core touched it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineReport {
    /// -1 for the starting position.
    pub ply: i32,
    pub lan: String,
    pub san: String,
    pub classification: Option<Classification>,
    pub accuracy: f64,
    /// 0-100.
    pub win_chance_white: f64,
    pub evaluation: AbsoluteEvaluation,
    pub finished: bool,
    pub pvs: Vec<PvReport>,
}

impl LineReport {
    pub fn from_line(ply: i32, line: &Line, show_classification: bool) -> Self {
        let best_depth = line.best_pv().map_or(0, |pv| pv.depth);

        Self {
            ply,
            lan: line.lan().to_string(),
            san: line.san().to_string(),
            classification: line.classification().filter(|_| show_classification),
            accuracy: line.accuracy(),
            win_chance_white: line.win_chance_for(Color::White),
            evaluation: line.evaluation(),
            finished: line.is_evaluation_finished(),
            pvs: line
                .pvs()
                .iter()
                .enumerate()
                .map(|(idx, pv)| PvReport::new(idx + 1, pv, best_depth))
                .collect(),
        }
    }
}

/// Receives a report whenever the analyser runs for a ply.
pub trait PresentationSink {
    fn on_line(&mut self, report: &LineReport);
}

/// Drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn on_line(&mut self, _report: &LineReport) {}
}

impl PresentationSink for Vec<LineReport> {
    fn on_line(&mut self, report: &LineReport) {
        self.push(report.clone());
    }
}

/// Forwards reports to another task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<LineReport>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<LineReport>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LineReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PresentationSink for ChannelSink {
    fn on_line(&mut self, report: &LineReport) {
        // A closed receiver only means nobody is watching any more.
        let _ = self.tx.send(report.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pv::RawPv;
    use crate::rules::{RulesOracle, StandardRules, STARTING_FEN};

    fn raw(lan: &str, depth: u32, score: i32, multipv: u32) -> RawPv {
        RawPv {
            lan: lan.to_string(),
            line: vec![lan.to_string()],
            depth,
            seldepth: depth,
            multipv,
            score,
            absolute_score: score,
            is_mate: false,
            nodes: 0,
            nps: 0,
        }
    }

    fn searched_line() -> Line {
        let legal = StandardRules.legal_moves(STARTING_FEN).unwrap();
        let mut line = Line::new(STARTING_FEN, "", "", legal, false, 5);
        line.update_pv(raw("e2e4", 14, 30, 1), None, &StandardRules).unwrap();
        line.update_pv(raw("d2d4", 14, 25, 2), None, &StandardRules).unwrap();
        line.update_pv(raw("g1f3", 13, 20, 3), None, &StandardRules).unwrap();
        line.set_classification(Classification::Best).unwrap();
        line
    }

    #[test]
    fn test_report_ranks_and_candidates() {
        let report = LineReport::from_line(-1, &searched_line(), true);

        assert_eq!(report.ply, -1);
        assert_eq!(report.classification, Some(Classification::Best));
        assert_eq!(report.evaluation, AbsoluteEvaluation::centipawns(30));
        assert!(!report.finished);

        let ranks: Vec<(usize, &str, bool)> = report
            .pvs
            .iter()
            .map(|pv| (pv.rank, pv.san.as_str(), pv.candidate))
            .collect();
        assert_eq!(ranks, vec![(1, "e4", true), (2, "d4", true), (3, "Nf3", false)]);
        assert_eq!(report.pvs[0].from, "e2");
        assert_eq!(report.pvs[0].to, "e4");
    }

    #[test]
    fn test_hidden_classification() {
        let report = LineReport::from_line(-1, &searched_line(), false);
        assert_eq!(report.classification, None);
    }

    #[test]
    fn test_sinks_collect() {
        let report = LineReport::from_line(-1, &searched_line(), true);

        let mut reports: Vec<LineReport> = Vec::new();
        reports.on_line(&report);
        assert_eq!(reports.len(), 1);

        let (mut sink, mut rx) = ChannelSink::channel();
        sink.on_line(&report);
        assert_eq!(rx.try_recv().unwrap(), report);

        drop(rx);
        sink.on_line(&report);
        NullSink.on_line(&report);
    }

    #[test]
    fn test_report_serializes() {
        let report = LineReport::from_line(-1, &searched_line(), true);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["classification"], "best");
        assert_eq!(json["pvs"][0]["lan"], "e2e4");
    }
}

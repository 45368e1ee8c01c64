//! Game history and routing of engine results to plies.

use std::sync::Arc;

use chess_openings::BookLookup;
use tracing::{debug, trace, warn};

use crate::classifier::{classify, is_sacrifice, ClassifierOptions};
use crate::line::{Line, LineError};
use crate::pv::RawPv;
use crate::rules::{position_key, RulesError, RulesOracle, STARTING_FEN};
use crate::sink::{LineReport, PresentationSink};

/// Analysis knobs that reach the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// PVs kept per position at the best depth.
    pub multi_pv: usize,
    /// Include classifications in reports.
    pub show_classification: bool,
    pub classifier: ClassifierOptions,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            multi_pv: 3,
            show_classification: true,
            classifier: ClassifierOptions::default(),
        }
    }
}

/// The game being reviewed.
///
/// Plies are numbered from 0 for the first move; -1 is the starting
/// position, which is kept across games.
pub struct Position {
    start_line: Line,
    lines: Vec<Line>,
    current_node: i32,
    settings: AnalysisSettings,
    rules: Arc<dyn RulesOracle>,
    book: Arc<dyn BookLookup + Send + Sync>,
}

impl Position {
    pub fn new(
        rules: Arc<dyn RulesOracle>,
        book: Arc<dyn BookLookup + Send + Sync>,
        settings: AnalysisSettings,
    ) -> Result<Self, RulesError> {
        let start_line = Line::new(
            STARTING_FEN,
            "",
            "",
            rules.legal_moves(STARTING_FEN)?,
            book.is_theory(&position_key(STARTING_FEN)),
            settings.multi_pv,
        );

        Ok(Self {
            start_line,
            lines: Vec::new(),
            current_node: -1,
            settings,
            rules,
            book,
        })
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Applies to lines created from now on; reports pick it up at once.
    pub fn set_settings(&mut self, settings: AnalysisSettings) {
        self.settings = settings;
    }

    pub fn rules(&self) -> &dyn RulesOracle {
        self.rules.as_ref()
    }

    /// Drops all moves and moves the cursor back to the start.
    pub fn new_game(&mut self) {
        self.lines.clear();
        self.current_node = -1;
        debug!("new game");
    }

    /// Plays `lan` after the last move and moves the cursor to it.
    pub fn play(&mut self, lan: &str) -> Result<&Line, RulesError> {
        let played = self.rules.play(self.current_line().fen(), lan)?;
        let in_theory = self.book.is_theory(&position_key(&played.fen));

        self.lines.push(Line::new(
            played.fen,
            lan,
            played.san,
            played.legal_moves,
            in_theory,
            self.settings.multi_pv,
        ));
        self.current_node = self.last_ply();
        trace!(ply = self.current_node, lan, in_theory, "played move");

        Ok(&self.lines[self.lines.len() - 1])
    }

    /// Line at `ply`; any negative ply is the starting position.
    pub fn line(&self, ply: i32) -> Option<&Line> {
        if ply < 0 {
            return Some(&self.start_line);
        }
        self.lines.get(ply as usize)
    }

    fn line_mut(&mut self, ply: i32) -> Option<&mut Line> {
        if ply < 0 {
            return Some(&mut self.start_line);
        }
        self.lines.get_mut(ply as usize)
    }

    /// Line after the last move played.
    pub fn current_line(&self) -> &Line {
        self.lines.last().unwrap_or(&self.start_line)
    }

    pub fn current_node(&self) -> i32 {
        self.current_node
    }

    /// Ply of the last move, -1 before the first.
    pub fn last_ply(&self) -> i32 {
        self.lines.len() as i32 - 1
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lan_moves(&self) -> Vec<String> {
        self.lines.iter().map(|line| line.lan().to_string()).collect()
    }

    /// Moves up to and including `ply`.
    pub fn lan_moves_at(&self, ply: i32) -> Vec<String> {
        if ply < 0 {
            return Vec::new();
        }
        self.lines
            .iter()
            .take(ply as usize + 1)
            .map(|line| line.lan().to_string())
            .collect()
    }

    /// Feeds a PV for `ply`. Runs the analyser when the PV list was pruned.
    pub fn on_update_pv(&mut self, ply: i32, raw: RawPv, sink: &mut dyn PresentationSink) -> Result<(), RulesError> {
        let Some((previous, line)) = split_line_mut(&mut self.start_line, &mut self.lines, ply) else {
            trace!(ply, "PV for unknown ply");
            return Ok(());
        };
        let previous = previous.filter(|p| !p.has_no_evaluation());

        if line.update_pv(raw, previous, self.rules.as_ref())? {
            self.update_analyser(ply, sink);
        }
        Ok(())
    }

    /// Confirms the engine's best move for `ply`, then runs the analyser.
    ///
    /// When the move is not among the tracked PVs the line stays
    /// unconfirmed and the error is returned after the analyser ran.
    pub fn on_best_move(&mut self, ply: i32, lan: &str, sink: &mut dyn PresentationSink) -> Result<(), LineError> {
        let Some(line) = self.line_mut(ply) else {
            trace!(ply, "best move for unknown ply");
            return Ok(());
        };

        let result = line.update_best_move(lan);
        if let Err(err) = &result {
            warn!(ply, %err, "could not confirm best move");
        }
        self.update_analyser(ply, sink);
        result
    }

    /// Moves the cursor to `ply`. Returns `None` when there is no such ply.
    pub fn select_node(&mut self, ply: i32, sink: &mut dyn PresentationSink) -> Option<&Line> {
        let ply = ply.max(-1);
        self.line(ply)?;

        self.current_node = ply;
        self.update_analyser(ply, sink);
        self.line(ply)
    }

    /// Classifies and reports `ply`.
    ///
    /// Data arriving for the ply just before the cursor unblocks the move at
    /// the cursor, so that move is handled instead.
    pub fn update_analyser(&mut self, ply: i32, sink: &mut dyn PresentationSink) {
        let ply = if ply == self.current_node - 1 { ply + 1 } else { ply };

        let Some(line) = self.line(ply).filter(|l| !l.has_no_evaluation()) else {
            return;
        };
        let previous = if ply >= 0 {
            self.line(ply - 1).filter(|p| !p.has_no_evaluation())
        } else {
            None
        };

        let pending = match previous {
            Some(previous)
                if line.classification().is_none()
                    && line.is_evaluation_finished()
                    && previous.is_evaluation_finished() =>
            {
                let sacrifice = self.is_sacrifice(previous, line);
                Some(classify(previous, line, sacrifice, &self.settings.classifier))
            }
            _ => None,
        };

        if let Some(classification) = pending {
            if let Some(line) = self.line_mut(ply) {
                match line.set_classification(classification) {
                    Ok(()) => debug!(ply, san = line.san(), %classification, "classified move"),
                    Err(err) => warn!(ply, %err, "classification dropped"),
                }
            }
        }

        if let Some(line) = self.line(ply) {
            sink.on_line(&LineReport::from_line(ply, line, self.settings.show_classification));
        }
    }

    /// Whether the move into `line` gave up material once the engine's
    /// reply is taken into account.
    fn is_sacrifice(&self, previous: &Line, line: &Line) -> bool {
        if !self.settings.classifier.detect_sacrifices {
            return false;
        }
        let reply = line.best_pv().map(|pv| pv.lan.as_str());
        match self.rules.material_swing(previous.fen(), line.lan(), reply) {
            Ok(swing) => is_sacrifice(swing),
            Err(err) => {
                warn!(%err, "could not measure material swing");
                false
            }
        }
    }
}

/// The line at `ply` together with the one before it.
fn split_line_mut<'a>(
    start: &'a mut Line,
    lines: &'a mut [Line],
    ply: i32,
) -> Option<(Option<&'a Line>, &'a mut Line)> {
    if ply < 0 {
        return Some((None, start));
    }
    let idx = ply as usize;
    if idx >= lines.len() {
        return None;
    }
    let (head, tail) = lines.split_at_mut(idx);
    let previous = match head.last() {
        Some(previous) => previous,
        None => &*start,
    };
    Some((Some(previous), &mut tail[0]))
}

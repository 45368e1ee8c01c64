//! Review coordinator.
//!
//! [`Reviewer`] reacts to the three external triggers (a move was played,
//! the user navigated, a new game was loaded) and to engine output. It owns
//! the [`Position`] and the [`EngineDriver`] and returns the commands to
//! send to the engine; it never does I/O itself.

use std::sync::Arc;

use chess_openings::{BookLookup, OpeningBook};
use tracing::{debug, warn};
use uci::{EngineMessage, GuiCommand};

use crate::config::ReviewConfig;
use crate::engine::{DriverOutput, EngineDriver, FeedEvent};
use crate::position::Position;
use crate::rules::{RulesError, RulesOracle, StandardRules, STARTING_FEN};
use crate::sink::PresentationSink;

pub struct Reviewer {
    position: Position,
    driver: EngineDriver,
    depth: Option<u32>,
}

impl Reviewer {
    pub fn new(
        config: &ReviewConfig,
        rules: Arc<dyn RulesOracle>,
        book: Arc<dyn BookLookup + Send + Sync>,
    ) -> Result<Self, RulesError> {
        Ok(Self {
            position: Position::new(rules, book, config.analysis_settings())?,
            driver: EngineDriver::new(config.engine_options()),
            depth: search_depth(config.depth),
        })
    }

    /// Standard rules and the bundled opening book.
    pub fn with_defaults(config: &ReviewConfig) -> Result<Self, RulesError> {
        Self::new(config, Arc::new(StandardRules), Arc::new(OpeningBook::builtin()))
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn driver(&self) -> &EngineDriver {
        &self.driver
    }

    /// Commands that initialise the engine.
    pub fn start(&mut self) -> Vec<GuiCommand> {
        self.driver.start()
    }

    /// A move was played after the last one. Analyses the new position
    /// unless the game is over.
    pub fn on_move(&mut self, lan: &str) -> Result<Vec<GuiCommand>, RulesError> {
        if self.position.play(lan)?.is_game_over() {
            debug!(lan, "game over, nothing to analyse");
            return Ok(Vec::new());
        }
        Ok(self.driver.go(self.position.lan_moves(), self.depth))
    }

    /// The user navigated to `ply`. Returns `None` when there is no such ply.
    pub fn on_select_node(&mut self, ply: i32, sink: &mut dyn PresentationSink) -> Option<Vec<GuiCommand>> {
        let finished = self.position.select_node(ply, sink)?.is_evaluation_finished();
        let ply = self.position.current_node();

        if finished {
            Some(self.evaluate_previous_line_if_needed(ply))
        } else {
            Some(self.driver.go(self.position.lan_moves_at(ply), self.depth))
        }
    }

    /// A game was loaded. Replaying the moves already under review does
    /// nothing. A list with an illegal move is rejected and leaves the
    /// review untouched.
    pub fn on_new_game(&mut self, lans: &[String]) -> Result<Vec<GuiCommand>, RulesError> {
        if self.position.lan_moves() == lans {
            debug!(moves = lans.len(), "same game, keeping analysis");
            return Ok(Vec::new());
        }

        let mut fen = STARTING_FEN.to_string();
        for lan in lans {
            fen = self.position.rules().play(&fen, lan)?.fen;
        }

        self.position.new_game();
        let mut commands = self.driver.new_game();
        for lan in lans {
            self.position.play(lan)?;
        }
        commands.extend(self.driver.go(self.position.lan_moves(), self.depth));
        Ok(commands)
    }

    /// Processes one line of engine output.
    pub fn on_engine_message(&mut self, message: &EngineMessage, sink: &mut dyn PresentationSink) -> Vec<GuiCommand> {
        let mut commands = Vec::new();

        for output in self.driver.handle(message) {
            match output {
                DriverOutput::Send(command) => commands.push(command),
                DriverOutput::Feed(FeedEvent::PvUpdate { ply, pv }) => {
                    if let Err(err) = self.position.on_update_pv(ply, pv, sink) {
                        warn!(ply, %err, "dropping PV");
                    }
                }
                DriverOutput::Feed(FeedEvent::BestMove { ply, lan }) => {
                    // Failure is logged by the position; the previous ply may still need a search.
                    let _ = self.position.on_best_move(ply, &lan, sink);
                    if ply != -1 && ply == self.position.current_node() {
                        commands.extend(self.evaluate_previous_line_if_needed(ply));
                    }
                }
            }
        }

        commands
    }

    /// Searches the ply before `ply` if it has no confirmed best move yet,
    /// so the move at `ply` can be classified.
    pub fn evaluate_previous_line_if_needed(&mut self, ply: i32) -> Vec<GuiCommand> {
        if ply == -1 {
            return Vec::new();
        }
        match self.position.line(ply - 1) {
            Some(line) if !line.is_evaluation_finished() => {
                debug!(ply = ply - 1, "previous ply unfinished, searching it");
                self.driver.go(self.position.lan_moves_at(ply - 1), self.depth)
            }
            _ => Vec::new(),
        }
    }

    /// Picks up a configuration change.
    pub fn apply_config(&mut self, config: &ReviewConfig) -> Vec<GuiCommand> {
        self.depth = search_depth(config.depth);
        self.position.set_settings(config.analysis_settings());
        self.driver.apply_options(config.engine_options())
    }

    pub fn quit(&mut self) -> Vec<GuiCommand> {
        self.driver.quit()
    }
}

/// Depth 0 searches until stopped.
fn search_depth(depth: u32) -> Option<u32> {
    (depth > 0).then_some(depth)
}

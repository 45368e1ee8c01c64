//! UCI engine driver.
//!
//! [`EngineDriver`] is a state machine without I/O. It turns search requests
//! into [`GuiCommand`]s and engine output into [`FeedEvent`]s tagged with the
//! ply they belong to. Whoever owns the transport writes the commands and
//! feeds the parsed lines back through [`EngineDriver::handle`].
//!
//! Requests are serialised through two pending slots. A search requested
//! before the engine is ready waits in `after_ready`; one requested while
//! another is running stops it and waits in `after_stop`. Output of a
//! stopped search is dropped.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};
use uci::{EngineMessage, GoOptions, GuiCommand};

use crate::pv::RawPv;

/// Printed by Stockfish when its network finishes loading. A search started
/// before that never reports `bestmove`.
const EVAL_FILE_LOADED: &str = "Load eval file success: 1";

/// Errors from the engine transport.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process.
    #[error("Failed to spawn engine {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The engine exited or closed its output.
    #[error("Engine closed")]
    Closed,
    /// A command could not be delivered to the engine.
    #[error("Failed to send command: {0}")]
    Send(String),
}

/// Engine options sent with `setoption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// MB.
    pub hash: u32,
    pub threads: u32,
    pub multi_pv: u32,
    pub ponder: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            hash: 1024,
            threads: 4,
            multi_pv: 3,
            ponder: false,
        }
    }
}

impl EngineOptions {
    fn commands(&self) -> Vec<GuiCommand> {
        vec![
            GuiCommand::set_option("Hash", self.hash),
            GuiCommand::set_option("Threads", self.threads),
            GuiCommand::set_option("MultiPV", self.multi_pv),
            GuiCommand::set_option("Ponder", self.ponder),
        ]
    }

    /// Commands for the options that differ from `previous`.
    fn changes(&self, previous: &EngineOptions) -> Vec<GuiCommand> {
        let mut commands = Vec::new();
        if self.hash != previous.hash {
            commands.push(GuiCommand::set_option("Hash", self.hash));
        }
        if self.threads != previous.threads {
            commands.push(GuiCommand::set_option("Threads", self.threads));
        }
        if self.multi_pv != previous.multi_pv {
            commands.push(GuiCommand::set_option("MultiPV", self.multi_pv));
        }
        if self.ponder != previous.ponder {
            commands.push(GuiCommand::set_option("Ponder", self.ponder));
        }
        commands
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Busy,
    /// `stop` sent, waiting for `bestmove`.
    Stopping,
}

/// Search of the position after `moves`, played from the initial position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub moves: Vec<String>,
    pub depth: Option<u32>,
}

impl SearchRequest {
    /// Ply of the searched position, -1 for the initial position.
    pub fn ply(&self) -> i32 {
        self.moves.len() as i32 - 1
    }
}

/// Structured engine feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    PvUpdate { ply: i32, pv: RawPv },
    BestMove { ply: i32, lan: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DriverOutput {
    Send(GuiCommand),
    Feed(FeedEvent),
}

#[derive(Debug)]
pub struct EngineDriver {
    state: EngineState,
    loaded: bool,
    ready: bool,
    awaiting_ready: bool,
    after_ready: Option<SearchRequest>,
    after_stop: Option<SearchRequest>,
    current_ply: i32,
    options: EngineOptions,
    engine_name: Option<String>,
}

impl EngineDriver {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            state: EngineState::Idle,
            loaded: false,
            ready: false,
            awaiting_ready: false,
            after_ready: None,
            after_stop: None,
            current_ply: 0,
            options,
            engine_name: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// `uciok` received.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Ply of the running (or last) search.
    pub fn current_ply(&self) -> i32 {
        self.current_ply
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.engine_name.as_deref()
    }

    /// Handshake and initial options.
    pub fn start(&mut self) -> Vec<GuiCommand> {
        let mut commands = vec![GuiCommand::Uci];
        commands.extend(self.options.commands());
        commands
    }

    /// Tells the engine a new game starts. The next search waits for `readyok`.
    ///
    /// A running search belongs to the old game: it is stopped and its
    /// output discarded. Requests queued for the old game are dropped.
    pub fn new_game(&mut self) -> Vec<GuiCommand> {
        self.ready = false;
        self.after_ready = None;
        self.after_stop = None;

        let mut commands = Vec::new();
        if self.state == EngineState::Busy {
            debug!(ply = self.current_ply, "stopping search of the previous game");
            self.state = EngineState::Stopping;
            commands.push(GuiCommand::Stop);
        }
        commands.push(GuiCommand::UciNewGame);
        commands
    }

    /// Requests a search of the position after `moves`.
    pub fn go(&mut self, moves: Vec<String>, depth: Option<u32>) -> Vec<GuiCommand> {
        let request = SearchRequest { moves, depth };

        if self.ready {
            return self.dispatch(request);
        }

        self.after_ready = Some(request);
        if self.awaiting_ready {
            Vec::new()
        } else {
            self.awaiting_ready = true;
            vec![GuiCommand::IsReady]
        }
    }

    /// Sends `setoption` for options that changed.
    pub fn apply_options(&mut self, options: EngineOptions) -> Vec<GuiCommand> {
        let commands = options.changes(&self.options);
        if !commands.is_empty() {
            debug!(?options, "engine options changed");
        }
        self.options = options;
        commands
    }

    pub fn quit(&mut self) -> Vec<GuiCommand> {
        let mut commands = Vec::new();
        if self.state == EngineState::Busy {
            commands.push(GuiCommand::Stop);
        }
        commands.push(GuiCommand::Quit);
        self.state = EngineState::Idle;
        self.after_ready = None;
        self.after_stop = None;
        commands
    }

    /// Processes one line of engine output.
    pub fn handle(&mut self, message: &EngineMessage) -> Vec<DriverOutput> {
        match message {
            EngineMessage::Id { name: Some(name), .. } => {
                self.engine_name = Some(name.clone());
                Vec::new()
            }
            EngineMessage::UciOk => {
                self.loaded = true;
                debug!(engine = self.engine_name.as_deref().unwrap_or("unknown"), "engine loaded");
                Vec::new()
            }
            EngineMessage::ReadyOk => {
                self.ready = true;
                self.awaiting_ready = false;
                match self.after_ready.take() {
                    Some(request) => sends(self.dispatch(request)),
                    None => Vec::new(),
                }
            }
            EngineMessage::Info(info) => {
                if self.state != EngineState::Busy {
                    return Vec::new();
                }
                match RawPv::from_info(info, self.current_ply) {
                    Some(pv) => {
                        trace!(ply = self.current_ply, lan = %pv.lan, depth = pv.depth, "pv");
                        vec![DriverOutput::Feed(FeedEvent::PvUpdate {
                            ply: self.current_ply,
                            pv,
                        })]
                    }
                    None => Vec::new(),
                }
            }
            EngineMessage::BestMove { mv, .. } => {
                let was = self.state;
                self.state = EngineState::Idle;

                let mut outputs = Vec::new();
                if let (EngineState::Busy, Some(lan)) = (was, mv) {
                    debug!(ply = self.current_ply, lan = %lan, "best move");
                    outputs.push(DriverOutput::Feed(FeedEvent::BestMove {
                        ply: self.current_ply,
                        lan: lan.clone(),
                    }));
                }
                if let Some(request) = self.after_stop.take() {
                    outputs.extend(sends(self.begin(request)));
                }
                outputs
            }
            EngineMessage::Other(line) if line == EVAL_FILE_LOADED && self.state != EngineState::Idle => {
                debug!("eval file loaded mid-search, resetting");
                self.state = EngineState::Idle;
                match self.after_stop.take() {
                    Some(request) => sends(self.begin(request)),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    fn dispatch(&mut self, request: SearchRequest) -> Vec<GuiCommand> {
        match self.state {
            EngineState::Idle => self.begin(request),
            EngineState::Busy => {
                debug!(ply = request.ply(), "stopping running search");
                self.state = EngineState::Stopping;
                self.after_stop = Some(request);
                vec![GuiCommand::Stop]
            }
            EngineState::Stopping => {
                self.after_stop = Some(request);
                Vec::new()
            }
        }
    }

    fn begin(&mut self, request: SearchRequest) -> Vec<GuiCommand> {
        self.state = EngineState::Busy;
        self.current_ply = request.ply();
        debug!(ply = self.current_ply, depth = ?request.depth, "search started");

        vec![
            GuiCommand::startpos(&request.moves),
            GuiCommand::Go(GoOptions::depth(request.depth)),
        ]
    }
}

fn sends(commands: Vec<GuiCommand>) -> Vec<DriverOutput> {
    commands.into_iter().map(DriverOutput::Send).collect()
}

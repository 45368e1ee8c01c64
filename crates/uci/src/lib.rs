//! UCI (Universal Chess Interface) protocol vocabulary for analysis front ends.
//!
//! This crate covers the GUI side of the protocol: it formats the commands a
//! front end sends to an engine and parses the lines the engine prints back.
//!
//! # Commands (GUI to engine)
//!
//! - `uci` - Initialize engine, get id and options
//! - `setoption name <name> value <value>` - Configure the engine
//! - `ucinewgame` - Forget everything about the previous game
//! - `isready` / `readyok` - Synchronization
//! - `position startpos [moves <move>...]` / `position fen <fen> [moves ...]`
//! - `go [depth <d>] [movetime <ms>] [infinite]` - Start search
//! - `stop` - Stop search
//! - `quit` - Exit engine
//!
//! # Messages (engine to GUI)
//!
//! - `id name|author ...`, `uciok`, `readyok`
//! - `info ...` - Search progress, see [`EngineInfo`]
//! - `bestmove <move> [ponder <move>]`

mod command;
mod info;

pub use command::{GoOptions, GuiCommand};
pub use info::{EngineInfo, InfoBuilder, Score, ScoreBound};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Messages sent from engine to GUI.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    /// Engine identification.
    Id { name: Option<String>, author: Option<String> },
    /// UCI initialization complete.
    UciOk,
    /// Engine is ready.
    ReadyOk,
    /// Search information.
    Info(EngineInfo),
    /// Search finished. `mv` is `None` for `bestmove (none)` or a malformed move.
    BestMove { mv: Option<String>, ponder: Option<String> },
    /// Anything else the engine prints (option lists, banners, notices).
    Other(String),
}

impl EngineMessage {
    /// Parse one line of engine output.
    ///
    /// Parsing never fails: lines that are not understood come back as
    /// [`EngineMessage::Other`] so callers can skip them.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut parts = line.split_whitespace();

        match parts.next() {
            Some("uciok") => EngineMessage::UciOk,
            Some("readyok") => EngineMessage::ReadyOk,
            Some("info") => match EngineInfo::parse(line) {
                Some(info) => EngineMessage::Info(info),
                None => EngineMessage::Other(line.to_string()),
            },
            Some("bestmove") => {
                let mv = parts.next().filter(|m| is_move_token(m)).map(str::to_string);
                let ponder = match parts.next() {
                    Some("ponder") => parts.next().filter(|m| is_move_token(m)).map(str::to_string),
                    _ => None,
                };
                EngineMessage::BestMove { mv, ponder }
            }
            Some("id") => {
                let rest: Vec<&str> = parts.collect();
                match rest.split_first() {
                    Some((&"name", value)) => EngineMessage::Id {
                        name: Some(value.join(" ")),
                        author: None,
                    },
                    Some((&"author", value)) => EngineMessage::Id {
                        name: None,
                        author: Some(value.join(" ")),
                    },
                    _ => EngineMessage::Other(line.to_string()),
                }
            }
            _ => EngineMessage::Other(line.to_string()),
        }
    }

    /// Format message as the engine would print it.
    pub fn to_uci(&self) -> String {
        match self {
            EngineMessage::Id { name, author } => {
                let mut parts = Vec::new();
                if let Some(n) = name {
                    parts.push(format!("id name {}", n));
                }
                if let Some(a) = author {
                    parts.push(format!("id author {}", a));
                }
                parts.join("\n")
            }
            EngineMessage::UciOk => "uciok".to_string(),
            EngineMessage::ReadyOk => "readyok".to_string(),
            EngineMessage::Info(info) => info.to_uci(),
            EngineMessage::BestMove { mv, ponder } => {
                let mv = mv.as_deref().unwrap_or("(none)");
                match ponder {
                    Some(p) => format!("bestmove {} ponder {}", mv, p),
                    None => format!("bestmove {}", mv),
                }
            }
            EngineMessage::Other(line) => line.clone(),
        }
    }
}

/// Returns true for a move in long algebraic notation, e.g. `e2e4` or `e7e8q`.
pub fn is_move_token(s: &str) -> bool {
    let b = s.as_bytes();
    let square = |file: u8, rank: u8| (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank);

    match b.len() {
        4 => square(b[0], b[1]) && square(b[2], b[3]),
        5 => square(b[0], b[1]) && square(b[2], b[3]) && matches!(b[4], b'q' | b'r' | b'b' | b'n'),
        _ => false,
    }
}

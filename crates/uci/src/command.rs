//! UCI commands sent from the GUI to the engine.

use std::fmt;

/// Commands sent from GUI to engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    /// Initialize UCI mode.
    Uci,
    /// Check if engine is ready.
    IsReady,
    /// Tell the engine the next search is from a different game.
    UciNewGame,
    /// Set an engine option.
    SetOption { name: String, value: String },
    /// Set up position. `fen: None` means the standard starting position.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start calculating.
    Go(GoOptions),
    /// Stop calculating.
    Stop,
    /// Quit the engine.
    Quit,
}

/// Options for the `go` command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    /// Search to this depth.
    pub depth: Option<u32>,
    /// Search for exactly this time in milliseconds.
    pub movetime: Option<u64>,
    /// Search this many nodes.
    pub nodes: Option<u64>,
    /// Search indefinitely until `stop`.
    pub infinite: bool,
}

impl GoOptions {
    /// Search to a fixed depth, or until stopped when `depth` is `None`.
    pub fn depth(depth: Option<u32>) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }
}

impl GuiCommand {
    /// `setoption` with any displayable value.
    pub fn set_option(name: &str, value: impl fmt::Display) -> Self {
        GuiCommand::SetOption {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// `position startpos moves ...` for a game from the initial position.
    pub fn startpos(moves: &[String]) -> Self {
        GuiCommand::Position {
            fen: None,
            moves: moves.to_vec(),
        }
    }

    /// Format as the line written to the engine's stdin.
    pub fn to_uci(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for GuiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuiCommand::Uci => write!(f, "uci"),
            GuiCommand::IsReady => write!(f, "isready"),
            GuiCommand::UciNewGame => write!(f, "ucinewgame"),
            GuiCommand::SetOption { name, value } => {
                write!(f, "setoption name {} value {}", name, value)
            }
            GuiCommand::Position { fen, moves } => {
                match fen {
                    Some(fen) => write!(f, "position fen {}", fen)?,
                    None => write!(f, "position startpos")?,
                }
                if !moves.is_empty() {
                    write!(f, " moves {}", moves.join(" "))?;
                }
                Ok(())
            }
            GuiCommand::Go(opts) => {
                write!(f, "go")?;
                if let Some(d) = opts.depth {
                    write!(f, " depth {}", d)?;
                }
                if let Some(t) = opts.movetime {
                    write!(f, " movetime {}", t)?;
                }
                if let Some(n) = opts.nodes {
                    write!(f, " nodes {}", n)?;
                }
                if opts.infinite {
                    write!(f, " infinite")?;
                }
                Ok(())
            }
            GuiCommand::Stop => write!(f, "stop"),
            GuiCommand::Quit => write!(f, "quit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_simple_commands() {
        assert_eq!(GuiCommand::Uci.to_uci(), "uci");
        assert_eq!(GuiCommand::IsReady.to_uci(), "isready");
        assert_eq!(GuiCommand::UciNewGame.to_uci(), "ucinewgame");
        assert_eq!(GuiCommand::Stop.to_uci(), "stop");
        assert_eq!(GuiCommand::Quit.to_uci(), "quit");
    }

    #[test]
    fn format_startpos() {
        assert_eq!(GuiCommand::startpos(&[]).to_uci(), "position startpos");

        let moves = vec!["e2e4".to_string(), "e7e5".to_string()];
        assert_eq!(
            GuiCommand::startpos(&moves).to_uci(),
            "position startpos moves e2e4 e7e5"
        );
    }

    #[test]
    fn format_position_fen() {
        let cmd = GuiCommand::Position {
            fen: Some("8/8/8/8/8/8/8/K6k w - - 0 1".to_string()),
            moves: vec!["a1a2".to_string()],
        };
        assert_eq!(
            cmd.to_uci(),
            "position fen 8/8/8/8/8/8/8/K6k w - - 0 1 moves a1a2"
        );
    }

    #[test]
    fn format_go() {
        assert_eq!(GuiCommand::Go(GoOptions::depth(Some(16))).to_uci(), "go depth 16");
        assert_eq!(GuiCommand::Go(GoOptions::depth(None)).to_uci(), "go");

        let opts = GoOptions {
            movetime: Some(500),
            infinite: true,
            ..GoOptions::default()
        };
        assert_eq!(GuiCommand::Go(opts).to_uci(), "go movetime 500 infinite");
    }

    #[test]
    fn format_setoption() {
        assert_eq!(
            GuiCommand::set_option("MultiPV", 3).to_uci(),
            "setoption name MultiPV value 3"
        );
        assert_eq!(
            GuiCommand::set_option("Ponder", true).to_uci(),
            "setoption name Ponder value true"
        );
    }
}

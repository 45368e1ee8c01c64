use chess_openings::BookError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::line::LineError;
use crate::rules::RulesError;

/// Top-level error of the review crate.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error(transparent)]
    Line(#[from] LineError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Book(#[from] BookError),
}

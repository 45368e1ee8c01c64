//! Opening book membership.
//!
//! Positions are identified by a truncated FEN: piece placement, side to
//! move and castling rights. Move counters and the en passant square are
//! dropped so transpositions resolve to the same key.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, EnPassantMode, Position};
use thiserror::Error;

use crate::builtin::builtin_openings;
use crate::opening::Opening;

/// Errors that can occur when building an opening book.
#[derive(Debug, Error)]
pub enum BookError {
    /// Failed to read the book file.
    #[error("failed to read opening book: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A move in an opening line is not legal in the position it is played from.
    #[error("illegal move {mv} in opening {opening}")]
    IllegalMove { opening: String, mv: String },
}

/// Anything that can answer "is this position known theory".
pub trait BookLookup {
    /// Returns true if the truncated position key is a known theory position.
    fn is_theory(&self, key: &str) -> bool;
}

/// Truncates a FEN to its first three fields (board, side to move, castling).
#[must_use]
pub fn position_key(fen: &str) -> String {
    fen.split_whitespace().take(3).collect::<Vec<_>>().join(" ")
}

/// A set of theory positions, optionally labelled with opening names.
#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    keys: HashSet<String>,
    named: HashMap<String, Opening>,
}

impl OpeningBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Book made from the bundled opening lines.
    #[must_use]
    pub fn builtin() -> Self {
        let mut book = Self::new();
        for opening in builtin_openings() {
            // Bundled lines are covered by tests; a bad one is simply left out.
            let _ = book.add_opening(opening);
        }
        book
    }

    /// Builds a book from named opening lines.
    pub fn from_openings(openings: impl IntoIterator<Item = Opening>) -> Result<Self, BookError> {
        let mut book = Self::new();
        for opening in openings {
            book.add_opening(opening)?;
        }
        Ok(book)
    }

    /// Builds a book from position keys. Full FENs are truncated.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys.into_iter().map(|k| position_key(k.as_ref())).collect(),
            named: HashMap::new(),
        }
    }

    /// Loads a JSON array of position keys.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, BookError> {
        let keys: Vec<String> = serde_json::from_reader(reader)?;
        Ok(Self::from_keys(keys))
    }

    /// Adds every position reached along an opening line.
    ///
    /// The position at the end of the line is labelled with the opening. On
    /// error the book is left unchanged.
    pub fn add_opening(&mut self, opening: Opening) -> Result<(), BookError> {
        let mut pos = Chess::default();
        let mut reached = Vec::with_capacity(opening.moves.len());

        for lan in &opening.moves {
            let illegal = || BookError::IllegalMove {
                opening: opening.name.clone(),
                mv: lan.clone(),
            };
            let uci: UciMove = lan.parse().map_err(|_| illegal())?;
            let mv = uci.to_move(&pos).map_err(|_| illegal())?;
            pos = pos.play(mv).map_err(|_| illegal())?;
            reached.push(position_key(
                &Fen::from_position(&pos, EnPassantMode::Legal).to_string(),
            ));
        }

        if let Some(last) = reached.last() {
            self.named.entry(last.clone()).or_insert_with(|| opening.clone());
        }
        self.keys.extend(reached);
        Ok(())
    }

    /// Returns true if the position key is in the book.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(&position_key(key))
    }

    /// The named opening whose main line ends in this position, if any.
    #[must_use]
    pub fn opening_for(&self, key: &str) -> Option<&Opening> {
        self.named.get(&position_key(key))
    }

    /// Number of positions in the book.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the book has no positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl BookLookup for OpeningBook {
    fn is_theory(&self, key: &str) -> bool {
        self.contains(key)
    }
}

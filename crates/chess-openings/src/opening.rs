//! Named opening lines.

use serde::{Deserialize, Serialize};

/// An opening as an ECO code, a name and the moves (LAN) that reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    pub eco: String,
    pub name: String,
    pub moves: Vec<String>,
}

impl Opening {
    #[must_use]
    pub fn new(eco: impl Into<String>, name: impl Into<String>, moves: Vec<String>) -> Self {
        Self {
            eco: eco.into(),
            name: name.into(),
            moves,
        }
    }

    /// Parses a whitespace separated move list such as `"e2e4 c7c5"`.
    #[must_use]
    pub fn from_line(eco: &str, name: &str, line: &str) -> Self {
        Self::new(eco, name, line.split_whitespace().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_line_splits_moves() {
        let opening = Opening::from_line("B20", "Sicilian Defense", " e2e4  c7c5 ");
        assert_eq!(opening.eco, "B20");
        assert_eq!(opening.moves, vec!["e2e4", "c7c5"]);
    }

    #[test]
    fn test_serde_shape() {
        let opening = Opening::from_line("C20", "King's Pawn Game", "e2e4 e7e5");
        let json = serde_json::to_value(&opening).unwrap();
        assert_eq!(json["name"], "King's Pawn Game");
        assert_eq!(json["moves"][1], "e7e5");
    }
}

//! Move classification labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a played move.
///
/// The first six variants form the continuous tiers, ordered from no loss
/// of advantage (`Best`) to severe loss (`Blunder`). The rest are labels
/// that override the tiers under specific conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The engine's preferred move
    Best,
    /// Minimal loss
    Excellent,
    /// Small loss
    Good,
    /// Noticeable loss
    Inaccuracy,
    /// Significant loss
    Mistake,
    /// Major loss
    Blunder,
    /// The only legal move
    Forced,
    /// Still in known opening theory
    Book,
    /// Best move that sacrifices material
    Brilliant,
    /// Reserved for a critical only-good move; never produced by the classifier
    Great,
    /// Same severe error as the previous move, read as a missed punishment
    Miss,
    /// A forced mate was let slip
    MissedWin,
}

impl Classification {
    /// Every label, tiers first.
    pub const ALL: [Classification; 12] = [
        Classification::Best,
        Classification::Excellent,
        Classification::Good,
        Classification::Inaccuracy,
        Classification::Mistake,
        Classification::Blunder,
        Classification::Forced,
        Classification::Book,
        Classification::Brilliant,
        Classification::Great,
        Classification::Miss,
        Classification::MissedWin,
    ];

    /// Tier index for the continuous labels (Best = 0 .. Blunder = 5).
    pub fn tier(self) -> Option<u8> {
        match self {
            Classification::Best => Some(0),
            Classification::Excellent => Some(1),
            Classification::Good => Some(2),
            Classification::Inaccuracy => Some(3),
            Classification::Mistake => Some(4),
            Classification::Blunder => Some(5),
            _ => None,
        }
    }

    /// Continuous label for a tier index. Indices above 5 saturate at `Blunder`.
    pub fn from_tier(tier: u8) -> Self {
        match tier {
            0 => Classification::Best,
            1 => Classification::Excellent,
            2 => Classification::Good,
            3 => Classification::Inaccuracy,
            4 => Classification::Mistake,
            _ => Classification::Blunder,
        }
    }

    /// Move annotation symbol, if the label has one.
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            Classification::Brilliant => Some("!!"),
            Classification::Great => Some("!"),
            Classification::Inaccuracy => Some("?!"),
            Classification::Mistake => Some("?"),
            Classification::Blunder => Some("??"),
            Classification::Miss | Classification::MissedWin => Some("?"),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Classification::Best => "Best",
            Classification::Excellent => "Excellent",
            Classification::Good => "Good",
            Classification::Inaccuracy => "Inaccuracy",
            Classification::Mistake => "Mistake",
            Classification::Blunder => "Blunder",
            Classification::Forced => "Forced",
            Classification::Book => "Book",
            Classification::Brilliant => "Brilliant",
            Classification::Great => "Great",
            Classification::Miss => "Miss",
            Classification::MissedWin => "Missed Win",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_round_trip() {
        for tier in 0..=5u8 {
            assert_eq!(Classification::from_tier(tier).tier(), Some(tier));
        }
        assert_eq!(Classification::from_tier(9), Classification::Blunder);
    }

    #[test]
    fn test_override_labels_have_no_tier() {
        for c in [
            Classification::Forced,
            Classification::Book,
            Classification::Brilliant,
            Classification::Great,
            Classification::Miss,
            Classification::MissedWin,
        ] {
            assert_eq!(c.tier(), None);
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Classification::MissedWin).unwrap();
        assert_eq!(json, "\"missed_win\"");
    }

    #[test]
    fn test_display() {
        assert_eq!(Classification::MissedWin.to_string(), "Missed Win");
        assert_eq!(Classification::Blunder.symbol(), Some("??"));
        assert_eq!(Classification::Best.symbol(), None);
    }
}

//! Per-side summary of a review.

use std::collections::BTreeMap;
use std::fmt;

use chess_review::LineReport;
use serde::Serialize;

/// Statistics for one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerStats {
    /// Total moves reviewed
    pub total_moves: u32,
    /// Mean move accuracy (0-100)
    pub accuracy_percent: f64,
    /// Moves per classification name
    pub classifications: BTreeMap<&'static str, u32>,
}

impl PlayerStats {
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a LineReport>) -> Self {
        let mut stats = Self::default();
        let mut accuracy_sum = 0.0;

        for report in reports {
            stats.total_moves += 1;
            accuracy_sum += report.accuracy;
            if let Some(classification) = report.classification {
                *stats.classifications.entry(classification.name()).or_default() += 1;
            }
        }

        if stats.total_moves > 0 {
            stats.accuracy_percent = accuracy_sum / f64::from(stats.total_moves);
        }
        stats
    }
}

impl fmt::Display for PlayerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}% accuracy over {} moves", self.accuracy_percent, self.total_moves)?;
        for (name, count) in &self.classifications {
            write!(f, ", {count} {name}")?;
        }
        Ok(())
    }
}

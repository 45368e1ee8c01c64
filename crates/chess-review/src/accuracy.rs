//! Win chance and move accuracy.
//!
//! Both curves follow the published Lichess approximations
//! (<https://lichess.org/page/accuracy>).

use shakmaty::Color;

const WIN_CHANCE_K: f64 = 0.00368208;

/// Logistic win chance in (-1, 1) for a White-positive centipawn score.
pub fn win_chance(centipawns: f64) -> f64 {
    2.0 / (1.0 + (-WIN_CHANCE_K * centipawns).exp()) - 1.0
}

/// Maps a win chance in [-1, 1] to a 0-100 percentage for `color`.
pub fn win_percent(win_chance: f64, color: Color) -> f64 {
    match color {
        Color::White => (win_chance + 1.0) / 2.0 * 100.0,
        Color::Black => (win_chance - 1.0) / 2.0 * -100.0,
    }
}

/// Share of the available winning chances a move kept, clamped to [0, 100].
///
/// Both arguments are percentages from the point of view of the side that
/// made the move.
pub fn accuracy(previous_win_percent: f64, current_win_percent: f64) -> f64 {
    let raw = 103.1668 * (-0.04354 * (previous_win_percent - current_win_percent)).exp() - 3.1669;
    raw.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_position() {
        assert_eq!(win_chance(0.0), 0.0);
        assert_eq!(win_percent(0.0, Color::White), 50.0);
        assert_eq!(win_percent(0.0, Color::Black), 50.0);
    }

    #[test]
    fn test_win_percent_sides_sum_to_hundred() {
        for cp in [-800.0, -120.0, 35.0, 410.0] {
            let wc = win_chance(cp);
            let total = win_percent(wc, Color::White) + win_percent(wc, Color::Black);
            assert!((total - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_win_chance_is_bounded() {
        assert!(win_chance(10_000.0) <= 1.0);
        assert!(win_chance(-10_000.0) >= -1.0);
        assert!(win_chance(100.0) > 0.0);
    }

    #[test]
    fn test_accuracy_no_loss_is_full() {
        assert!((accuracy(60.0, 60.0) - 100.0).abs() < 1e-3);
        assert_eq!(accuracy(40.0, 70.0), 100.0);
    }

    #[test]
    fn test_accuracy_drops_with_loss() {
        let small = accuracy(60.0, 55.0);
        let large = accuracy(60.0, 20.0);
        assert!(small > large);
        assert!((small - 79.817).abs() < 0.01);
        assert_eq!(accuracy(100.0, 0.0), 0.0);
    }
}

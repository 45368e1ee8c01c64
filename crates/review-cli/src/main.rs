//! Review CLI - classifies every move of a game with a UCI engine.
//!
//! Moves are given in long algebraic notation: as arguments, as one
//! `--pgn-moves` string, or in a whitespace separated file. Settings come
//! from `review.toml` and can be overridden on the command line.

mod stats;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chess_review::{spawn_session, ChannelSink, ConfigHandle, LineReport, MoveAck, ReviewConfig};
use clap::Parser;
use serde::Serialize;
use stats::PlayerStats;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "review-cli")]
#[command(about = "Review a chess game move by move with a UCI engine")]
struct Args {
    /// Moves in long algebraic notation (e2e4 e7e5 ...)
    moves: Vec<String>,

    /// Moves as a single string ("e2e4 e7e5 ...")
    #[arg(long, conflicts_with = "file")]
    pgn_moves: Option<String>,

    /// Read moves from a file instead
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, default_value = "review.toml")]
    config: PathBuf,

    /// Engine command, overrides the configuration
    #[arg(long)]
    engine: Option<String>,

    /// Search depth (0 searches until stopped)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Number of principal variations
    #[arg(long)]
    multipv: Option<u32>,

    /// Seconds to wait for each search
    #[arg(long, default_value = "120")]
    timeout: u64,

    /// Print the review as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Review {
    moves: Vec<LineReport>,
    white: PlayerStats,
    black: PlayerStats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = ReviewConfig::load_from(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(engine) = args.engine {
        config.engine_path = engine;
    }
    if let Some(depth) = args.depth {
        config.depth = depth;
    }
    if let Some(multipv) = args.multipv {
        config.multipv = multipv;
    }

    let moves = match (&args.file, args.pgn_moves) {
        (Some(path), _) => split_moves(
            &std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        ),
        (None, Some(line)) => split_moves(&line),
        (None, None) => args.moves,
    };
    if moves.is_empty() {
        bail!("no moves given");
    }

    tracing::info!(engine = %config.engine_path, depth = config.depth, moves = moves.len(), "starting review");

    let handle = ConfigHandle::new(config);
    let (sink, mut reports) = ChannelSink::channel();
    let session = spawn_session(&handle, Box::new(sink)).await?;
    let wait = Duration::from_secs(args.timeout);

    session.select(-1).await?;
    let start = finished(&mut reports, -1, wait).await?;

    let mut reviewed: Vec<LineReport> = Vec::with_capacity(moves.len());
    for lan in &moves {
        let ack = session.play(lan).await.with_context(|| format!("playing {lan}"))?;
        let report = if ack.game_over {
            tracing::info!(ply = ack.ply, san = %ack.san, "game over");
            final_move_report(&ack, lan, reviewed.last().unwrap_or(&start))
        } else {
            finished(&mut reports, ack.ply, wait).await?
        };
        if !args.json {
            print_move(&report);
        }
        reviewed.push(report);
        if ack.game_over {
            break;
        }
    }

    session.shutdown().await?;

    let review = Review {
        white: PlayerStats::from_reports(reviewed.iter().filter(|r| r.ply % 2 == 0)),
        black: PlayerStats::from_reports(reviewed.iter().filter(|r| r.ply % 2 == 1)),
        moves: reviewed,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&review)?);
    } else {
        println!();
        println!("White: {}", review.white);
        println!("Black: {}", review.black);
    }

    Ok(())
}

fn split_moves(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Waits for the completed report of `ply`.
async fn finished(
    reports: &mut mpsc::UnboundedReceiver<LineReport>,
    ply: i32,
    wait: Duration,
) -> anyhow::Result<LineReport> {
    let report = tokio::time::timeout(wait, async {
        while let Some(report) = reports.recv().await {
            if report.ply == ply && report.finished {
                return Some(report);
            }
        }
        None
    })
    .await
    .with_context(|| format!("timed out waiting for ply {ply}"))?;

    report.context("review session ended")
}

/// Report for a move that ended the game. It is never searched, so it
/// carries no label and keeps the evaluation that led to it.
fn final_move_report(ack: &MoveAck, lan: &str, previous: &LineReport) -> LineReport {
    LineReport {
        ply: ack.ply,
        lan: lan.to_string(),
        san: ack.san.clone(),
        classification: None,
        accuracy: 100.0,
        win_chance_white: previous.win_chance_white,
        evaluation: previous.evaluation,
        finished: true,
        pvs: Vec::new(),
    }
}

fn print_move(report: &LineReport) {
    let number = report.ply / 2 + 1;
    let prefix = if report.ply % 2 == 0 {
        format!("{number}.")
    } else {
        format!("{number}...")
    };
    let label = report.classification.map_or("-", |c| c.name());

    println!(
        "{:<7} {:<8} {:<11} {:>6.1}% {:>7}",
        prefix,
        report.san,
        label,
        report.accuracy,
        report.evaluation.to_string()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_review::{AbsoluteEvaluation, Classification};

    #[test]
    fn test_mating_move_is_reported_and_counted() {
        let before = LineReport {
            ply: 4,
            lan: "f1c4".to_string(),
            san: "Bc4".to_string(),
            classification: Some(Classification::Best),
            accuracy: 90.0,
            win_chance_white: 100.0,
            evaluation: AbsoluteEvaluation::mate(1),
            finished: true,
            pvs: Vec::new(),
        };
        let ack = MoveAck {
            ply: 6,
            san: "Qxf7#".to_string(),
            game_over: true,
        };

        let report = final_move_report(&ack, "h5f7", &before);
        assert_eq!((report.ply, report.san.as_str()), (6, "Qxf7#"));
        assert_eq!(report.classification, None);
        assert_eq!(report.evaluation, AbsoluteEvaluation::mate(1));
        assert!(report.finished);

        let white = PlayerStats::from_reports([&before, &report]);
        assert_eq!(white.total_moves, 2);
        assert!((white.accuracy_percent - 95.0).abs() < 1e-9);
        assert_eq!(white.classifications.values().sum::<u32>(), 1);
    }

    #[test]
    fn test_split_moves() {
        assert_eq!(split_moves(" e2e4\ne7e5  g1f3 "), vec!["e2e4", "e7e5", "g1f3"]);
    }
}

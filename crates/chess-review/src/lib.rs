//! Chess move review.
//!
//! Drives a UCI engine over a game, keeps the engine's principal variations
//! per ply, derives win chance and accuracy, and labels every move
//! ("Best", "Mistake", "Brilliant", ...).
//!
//! # Example
//!
//! ```
//! use chess_review::{classify_evaluations, AbsoluteEvaluation, Classification, ClassifierOptions};
//! use shakmaty::Color;
//!
//! let label = classify_evaluations(
//!     Color::White,
//!     AbsoluteEvaluation::centipawns(50),
//!     AbsoluteEvaluation::centipawns(45),
//!     &ClassifierOptions::default(),
//! );
//! assert_eq!(label, Classification::Excellent);
//! ```

pub mod accuracy;
pub mod classification;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod grade;
pub mod line;
pub mod position;
pub mod pv;
pub mod review;
pub mod rules;
pub mod session;
pub mod sink;

pub use accuracy::{accuracy, win_chance, win_percent};
pub use classification::Classification;
pub use classifier::{classify, classify_move, ClassifierOptions, MoveFacts};
pub use config::{ConfigError, ConfigHandle, ReviewConfig};
pub use engine::{DriverOutput, EngineDriver, EngineError, EngineOptions, EngineState, FeedEvent, SearchRequest};
pub use error::ReviewError;
pub use evaluation::AbsoluteEvaluation;
pub use grade::{classify_evaluations, move_grade, GradeLetter, MoveGrade};
pub use line::{Line, LineError, LineState};
pub use position::{AnalysisSettings, Position};
pub use pv::{PrincipalVariation, RawPv};
pub use review::Reviewer;
pub use rules::{position_key, PlayedMove, RulesError, RulesOracle, StandardRules, STARTING_FEN};
pub use session::{spawn_session, start_session, EngineTransport, MoveAck, SessionHandle};
pub use sink::{ChannelSink, LineReport, NullSink, PresentationSink, PvReport};

pub use shakmaty::Color;

//! Review configuration.
//!
//! [`ReviewConfig`] is loaded from a TOML file (`review.toml` by default).
//! A running review shares it through a [`ConfigHandle`], which lets the
//! engine session pick up changes without any global state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::classifier::ClassifierOptions;
use crate::engine::EngineOptions;
use crate::position::AnalysisSettings;

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Engine and review settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReviewConfig {
    /// Path to the UCI engine. Defaults to "stockfish" (assumes it's in PATH).
    #[serde(default = "default_engine_path")]
    pub engine_path: String,
    /// Search depth per position.
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Number of PVs the engine reports per position.
    #[serde(default = "default_multipv")]
    pub multipv: u32,
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Hash table size in MB.
    #[serde(default = "default_hash")]
    pub hash: u32,
    #[serde(default)]
    pub ponder: bool,
    #[serde(default = "default_true")]
    pub show_classification: bool,
    #[serde(default = "default_true")]
    pub detect_sacrifices: bool,
    #[serde(default = "default_true")]
    pub soften_slower_mates: bool,
}

fn default_engine_path() -> String {
    "stockfish".to_string()
}

fn default_depth() -> u32 {
    16
}

fn default_multipv() -> u32 {
    3
}

fn default_threads() -> u32 {
    4
}

fn default_hash() -> u32 {
    1024
}

fn default_true() -> bool {
    true
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            engine_path: default_engine_path(),
            depth: default_depth(),
            multipv: default_multipv(),
            threads: default_threads(),
            hash: default_hash(),
            ponder: false,
            show_classification: true,
            detect_sacrifices: true,
            soften_slower_mates: true,
        }
    }
}

impl ReviewConfig {
    /// Default configuration file, `review.toml` in the working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("review.toml")
    }

    /// Loads [`Self::config_path()`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads `path`, or returns the defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            hash: self.hash,
            threads: self.threads,
            multi_pv: self.multipv,
            ponder: self.ponder,
        }
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            multi_pv: self.multipv.max(1) as usize,
            show_classification: self.show_classification,
            classifier: ClassifierOptions {
                detect_sacrifices: self.detect_sacrifices,
                soften_slower_mates: self.soften_slower_mates,
            },
        }
    }
}

/// Shared, observable configuration.
///
/// Cloning the handle shares the same configuration.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    tx: Arc<watch::Sender<ReviewConfig>>,
}

impl ConfigHandle {
    pub fn new(config: ReviewConfig) -> Self {
        let (tx, _rx) = watch::channel(config);
        Self { tx: Arc::new(tx) }
    }

    /// Current configuration.
    pub fn get(&self) -> ReviewConfig {
        self.tx.borrow().clone()
    }

    /// Changes the configuration. Subscribers are only woken when something
    /// actually changed.
    pub fn update(&self, f: impl FnOnce(&mut ReviewConfig)) {
        self.tx.send_if_modified(|config| {
            let before = config.clone();
            f(config);
            *config != before
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<ReviewConfig> {
        self.tx.subscribe()
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(ReviewConfig::default())
    }
}

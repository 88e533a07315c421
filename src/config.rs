//! Application configuration constants.
//!
//! This module centralizes the tunable values for scheduling, routing,
//! label placement and unlock pacing, plus database path resolution.

use serde::Deserialize;
use std::path::PathBuf;

// ==================== Database Configuration ====================

/// Configuration file structure for config.toml
#[derive(Debug, Deserialize)]
struct AppConfig {
  database: Option<DatabaseConfig>,
}

#[derive(Debug, Deserialize)]
struct DatabaseConfig {
  path: Option<String>,
}

/// Default database location when nothing else is configured
pub const DEFAULT_DATABASE_PATH: &str = "data/hanzi.db";

/// Load database path with priority: config.toml > .env > default
pub fn load_database_path() -> PathBuf {
  let _ = dotenvy::dotenv();

  if let Some(path) = std::fs::read_to_string("config.toml")
    .ok()
    .and_then(|contents| database_path_from_toml(&contents))
  {
    tracing::info!("Using database from config.toml: {}", path.display());
    return path;
  }

  if let Ok(path) = std::env::var("DATABASE_PATH") {
    tracing::info!("Using database from DATABASE_PATH env: {}", path);
    return PathBuf::from(path);
  }

  let default = PathBuf::from(DEFAULT_DATABASE_PATH);
  tracing::info!("Using default database path: {}", default.display());
  default
}

fn database_path_from_toml(contents: &str) -> Option<PathBuf> {
  let config = toml::from_str::<AppConfig>(contents).ok()?;
  config.database?.path.map(PathBuf::from)
}

// ==================== Server Configuration ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const SERVER_PORT: u16 = 3000;

/// Get the full server bind address
pub fn server_bind_addr() -> String {
  format!("{}:{}", SERVER_ADDR, SERVER_PORT)
}

// ==================== Session Configuration ====================

/// Study session expiration time in hours of inactivity
pub const SESSION_EXPIRY_HOURS: i64 = 2;

/// Probability threshold for session cleanup (0-255, lower = more frequent)
/// Value of 25 means ~10% chance (25/256) on each session access
pub const SESSION_CLEANUP_THRESHOLD: u8 = 25;

/// Cards handed to a self-study session
pub const SELF_STUDY_CARD_LIMIT: i64 = 20;

// ==================== Arrow Track (SM-2) ====================

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const INITIAL_EASE_FACTOR: f64 = 2.5;
pub const INITIAL_INTERVAL_DAYS: i64 = 1;

/// Difficulty used when the caller does not grade the answer
pub const DEFAULT_DIFFICULTY: u8 = 3;

/// Ease penalty applied on an incorrect answer (both tracks)
pub const EASE_PENALTY: f64 = 0.2;

/// Default number of due arrows per study round
pub const DEFAULT_DUE_LIMIT: usize = 20;

// ==================== Character Track ====================

const HOUR_IN_DAYS: f64 = 1.0 / 24.0;

/// Interval handed to an item that has just been introduced (1 hour)
pub const INTRODUCTORY_INTERVAL_DAYS: f64 = HOUR_IN_DAYS;

/// Fixed interval ladder: 1h, 12h, 1d, 3d, 7d
pub const CHARACTER_INTERVAL_LADDER: [f64; 5] = [HOUR_IN_DAYS, 0.5, 1.0, 3.0, 7.0];

/// Interval at which an item counts as retained (milestone)
pub const MILESTONE_INTERVAL_DAYS: f64 = 7.0;

/// Ease cap for the character track
pub const MAX_CHARACTER_EASE: f64 = 2.25;

/// Character-track intervals closer than this are treated as equal
pub const INTERVAL_EPSILON_DAYS: f64 = 1e-4;

// ==================== Unlock Pacing ====================

/// Hours between time-based unlock batches
pub const UNLOCK_INTERVAL_HOURS: i64 = 24;

/// New items unlocked per time-based batch
pub const UNLOCK_BATCH_SIZE: u32 = 5;

/// Unlocked-but-unstudied items allowed at once
pub const MAX_READY_TO_LEARN: u32 = 10;

/// New items unlocked for each milestone reached
pub const MILESTONE_UNLOCK_CREDIT: u32 = 1;

// ==================== Edge Routing ====================

/// Default side dimensions when a side has no explicit size
pub const DEFAULT_SIDE_WIDTH: f64 = 120.0;
pub const DEFAULT_SIDE_HEIGHT: f64 = 80.0;

/// First leg length as a fraction of the straight-line distance
pub const ROUTE_TRAVEL_FRACTION: f64 = 0.2;

/// Minimum first leg length
pub const ROUTE_MIN_TRAVEL: f64 = 40.0;

/// Multipliers tried in each direction when the middle segment collides
pub const ROUTE_RETRY_MULTIPLIERS: [f64; 5] = [1.5, 2.0, 2.5, 3.0, 3.5];

/// Center distance under which two arrows compete for the same slot rank
pub const SLOT_TIE_TOLERANCE: f64 = 5.0;

/// Slot range along an edge (10% to 90%)
pub const SLOT_EDGE_MARGIN: f64 = 0.1;
pub const SLOT_EDGE_SPAN: f64 = 0.8;

/// Hit-test tolerance for clicking an arrow
pub const ARROW_HIT_TOLERANCE: f64 = 5.0;

// ==================== Label Placement ====================

/// Label box size used when the caller does not measure the text
pub const DEFAULT_LABEL_WIDTH: f64 = 60.0;
pub const DEFAULT_LABEL_HEIGHT: f64 = 20.0;

/// Candidate percentages along the path, tried in order
pub const LABEL_CANDIDATE_PERCENTS: [u8; 9] = [50, 45, 55, 40, 60, 35, 65, 30, 70];

pub const LABEL_MIN_PERCENT: u8 = 30;
pub const LABEL_MAX_PERCENT: u8 = 70;
pub const LABEL_PERCENT_STEP: usize = 5;

/// Collision weights for the fallback score
pub const LABEL_SIDE_PENALTY: u32 = 100;
pub const LABEL_ARROW_PENALTY: u32 = 10;

// ==================== Documents ====================

/// Format version written into new documents
pub const DOCUMENT_VERSION: &str = "1.0.0";

/// Format version of progress side-files
pub const PROGRESS_FILE_VERSION: &str = "1.0.0";

/// Undo history depth
pub const HISTORY_CAPACITY: usize = 50;

// ==================== Network Study ====================

/// Number of distractor choices in multiple choice mode
pub const DISTRACTOR_COUNT: usize = 3;

/// Maximum depth of a custom-path traversal
pub const CUSTOM_PATH_MAX_DEPTH: usize = 5;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_database_path_from_toml() {
    let path = database_path_from_toml("[database]\npath = \"/tmp/x.db\"\n");
    assert_eq!(path, Some(PathBuf::from("/tmp/x.db")));
  }

  #[test]
  fn test_database_path_missing_section() {
    assert_eq!(database_path_from_toml("[other]\nkey = 1\n"), None);
    assert_eq!(database_path_from_toml("not toml ["), None);
  }

  #[test]
  fn test_ladder_ends_at_milestone() {
    assert_eq!(CHARACTER_INTERVAL_LADDER[CHARACTER_INTERVAL_LADDER.len() - 1], MILESTONE_INTERVAL_DAYS);
    assert_eq!(CHARACTER_INTERVAL_LADDER[0], INTRODUCTORY_INTERVAL_DAYS);
  }
}

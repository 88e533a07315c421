pub mod items;
pub mod practice;
pub mod schema;
pub mod stats;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::LearningItem;

// Re-export all public items from submodules
pub use items::*;
pub use practice::*;
pub use schema::run_migrations;
pub use stats::*;

pub type DbPool = Arc<Mutex<Connection>>;

/// Extension trait for logging errors before discarding them
pub trait LogOnError<T> {
  /// Log the error at warn level and return None
  fn log_warn(self, context: &str) -> Option<T>;
  /// Log the error at warn level and return the default
  fn log_warn_default(self, context: &str) -> T
  where
    T: Default;
}

impl<T, E: std::fmt::Display> LogOnError<T> for std::result::Result<T, E> {
  fn log_warn(self, context: &str) -> Option<T> {
    match self {
      Ok(v) => Some(v),
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        None
      }
    }
  }

  fn log_warn_default(self, context: &str) -> T
  where
    T: Default,
  {
    match self {
      Ok(v) => v,
      Err(e) => {
        tracing::warn!("{}: {}", context, e);
        T::default()
      }
    }
  }
}

/// Error returned when database lock cannot be acquired
#[derive(Debug)]
pub struct DbLockError;

impl std::fmt::Display for DbLockError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "Database unavailable")
  }
}

impl std::error::Error for DbLockError {}

/// Try to acquire the database lock, returning an error if poisoned
pub fn try_lock(pool: &DbPool) -> std::result::Result<MutexGuard<'_, Connection>, DbLockError> {
  pool.lock().map_err(|_: PoisonError<_>| {
    tracing::error!("Database mutex poisoned - a thread panicked while holding the lock");
    DbLockError
  })
}

pub fn init_db(path: &Path) -> Result<DbPool> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).log_warn("Could not create database directory");
  }

  // Create backup before migrations if database exists
  if path.exists() {
    let backup_path = path.with_extension("db.backup");
    std::fs::copy(path, &backup_path).log_warn("Could not create database backup");
  }

  let conn = Connection::open(path)?;
  run_migrations(&conn)?;
  Ok(Arc::new(Mutex::new(conn)))
}

// ==================== Timestamps ====================

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexically
pub(crate) fn to_sql_time(t: DateTime<Utc>) -> String {
  t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_time(s: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(s)
    .map(|t| t.with_timezone(&Utc))
    .unwrap_or_else(|e| {
      tracing::warn!("Unparseable timestamp '{}': {}", s, e);
      Utc::now()
    })
}

// ==================== Settings ====================

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
  conn
    .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
    .optional()
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![key, value],
  )?;
  Ok(())
}

// ==================== Seed data ====================

pub fn seed_characters(conn: &Connection) -> Result<()> {
  let count: i64 = conn.query_row("SELECT COUNT(*) FROM characters", [], |row| row.get(0))?;
  if count > 0 {
    return Ok(());
  }

  for item in starter_characters() {
    insert_item(conn, &item)?;
  }
  tracing::info!("Seeded starter characters");
  Ok(())
}

fn starter_characters() -> Vec<LearningItem> {
  let rows: [(&str, &str, &str); 20] = [
    ("的", "de", "possessive particle; of"),
    ("一", "yī", "one; a"),
    ("是", "shì", "to be; yes"),
    ("不", "bù", "not; no"),
    ("了", "le", "completed action particle"),
    ("人", "rén", "person; people"),
    ("我", "wǒ", "I; me"),
    ("在", "zài", "at; in; to exist"),
    ("有", "yǒu", "to have; there is"),
    ("他", "tā", "he; him"),
    ("这", "zhè", "this"),
    ("中", "zhōng", "middle; center; China"),
    ("大", "dà", "big; large"),
    ("来", "lái", "to come"),
    ("上", "shàng", "above; up; on"),
    ("国", "guó", "country; nation"),
    ("个", "gè", "measure word (general)"),
    ("到", "dào", "to arrive; to reach"),
    ("说", "shuō", "to speak; to say"),
    ("学", "xué", "to study; to learn"),
  ];

  rows
    .iter()
    .enumerate()
    .map(|(i, (character, pinyin, definition))| LearningItem {
      id: i as i64 + 1,
      character: character.to_string(),
      pinyin: pinyin.to_string(),
      definition: definition.to_string(),
      frequency_rank: i as i64 + 1,
      introduction_score: None,
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_seed_is_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    seed_characters(&conn).unwrap();
    seed_characters(&conn).unwrap();
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM characters", [], |r| r.get(0)).unwrap();
    assert_eq!(count, 20);
  }

  #[test]
  fn test_time_round_trip() {
    let t = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    assert_eq!(parse_time(&to_sql_time(t)), t);
  }

  #[test]
  fn test_settings() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    assert_eq!(get_setting(&conn, "missing").unwrap(), None);
    set_setting(&conn, "k", "v1").unwrap();
    set_setting(&conn, "k", "v2").unwrap();
    assert_eq!(get_setting(&conn, "k").unwrap().as_deref(), Some("v2"));
  }

  #[test]
  fn test_sql_time_sorts_lexically() {
    let early = DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap();
    let late = DateTime::from_timestamp(1_700_000_001, 0).unwrap();
    assert!(to_sql_time(early) < to_sql_time(late));
  }

  #[test]
  fn test_log_warn_default() {
    let r: std::result::Result<i32, String> = Err("boom".into());
    assert_eq!(r.log_warn_default("ctx"), 0);
    let ok: std::result::Result<i32, String> = Ok(3);
    assert_eq!(ok.log_warn("ctx"), Some(3));
  }
}

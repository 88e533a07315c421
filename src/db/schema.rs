use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // Create tables with COMPLETE schema for new databases
  // Migrations below handle upgrades for existing databases
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS characters (
      id INTEGER PRIMARY KEY,
      character TEXT NOT NULL,
      pinyin TEXT NOT NULL,
      definition TEXT NOT NULL,
      frequency_rank INTEGER NOT NULL,
      introduction_score REAL
    );

    CREATE TABLE IF NOT EXISTS user_progress (
      character_id INTEGER PRIMARY KEY,
      introduced INTEGER NOT NULL DEFAULT 0,
      introduced_at TEXT,
      times_reviewed INTEGER NOT NULL DEFAULT 0,
      times_correct INTEGER NOT NULL DEFAULT 0,
      times_incorrect INTEGER NOT NULL DEFAULT 0,
      current_interval_days REAL NOT NULL,
      previous_interval_days REAL NOT NULL DEFAULT 0,
      ease_factor REAL NOT NULL DEFAULT 2.5,
      next_review_date TEXT NOT NULL,
      last_reviewed TEXT,
      has_reached_week INTEGER NOT NULL DEFAULT 0,
      unlocked_at TEXT NOT NULL,
      FOREIGN KEY (character_id) REFERENCES characters(id)
    );

    CREATE TABLE IF NOT EXISTS practice_log (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      character_id INTEGER NOT NULL,
      practice_mode TEXT NOT NULL,
      question_type TEXT NOT NULL,
      user_answer TEXT NOT NULL,
      is_correct INTEGER NOT NULL,
      practiced_at TEXT NOT NULL,
      FOREIGN KEY (character_id) REFERENCES characters(id)
    );

    CREATE TABLE IF NOT EXISTS study_sessions (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      mode TEXT NOT NULL,
      started_at TEXT NOT NULL,
      ended_at TEXT,
      cards_studied INTEGER NOT NULL DEFAULT 0,
      cards_correct INTEGER NOT NULL DEFAULT 0,
      cards_incorrect INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS settings (
      key TEXT PRIMARY KEY,
      value TEXT NOT NULL
    );

    -- Default settings
    INSERT OR IGNORE INTO settings (key, value) VALUES ('claimed_milestones', '0');

    -- Indexes
    CREATE INDEX IF NOT EXISTS idx_characters_rank ON characters(frequency_rank);
    CREATE INDEX IF NOT EXISTS idx_progress_next_review ON user_progress(next_review_date);
    CREATE INDEX IF NOT EXISTS idx_practice_log_character ON practice_log(character_id);
    CREATE INDEX IF NOT EXISTS idx_practice_log_practiced_at ON practice_log(practiced_at);
    "#,
  )?;

  // ============================================================
  // MIGRATIONS FOR EXISTING DATABASES
  // These are no-ops for new databases (columns already exist)
  // ============================================================

  // Migration: introduction ordering score (added after the first release)
  add_column_if_missing(conn, "characters", "introduction_score", "REAL")?;

  // Migration: previous interval for the fall-back-on-miss rule
  add_column_if_missing(conn, "user_progress", "previous_interval_days", "REAL NOT NULL DEFAULT 0")?;

  Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
  conn
    .prepare(&format!("SELECT {} FROM {} LIMIT 1", column, table))
    .is_ok()
}

/// Add a column if it doesn't already exist
fn add_column_if_missing(conn: &Connection, table: &str, column: &str, column_def: &str) -> Result<()> {
  if !column_exists(conn, table, column) {
    conn.execute(
      &format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, column_def),
      [],
    )?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_migrations_are_idempotent() {
    let conn = Connection::open_in_memory().unwrap();
    run_migrations(&conn).unwrap();
    run_migrations(&conn).unwrap();
    assert!(column_exists(&conn, "user_progress", "has_reached_week"));
  }

  #[test]
  fn test_upgrade_adds_missing_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn
      .execute_batch(
        "CREATE TABLE characters (id INTEGER PRIMARY KEY, character TEXT NOT NULL, pinyin TEXT NOT NULL,
         definition TEXT NOT NULL, frequency_rank INTEGER NOT NULL);",
      )
      .unwrap();
    assert!(!column_exists(&conn, "characters", "introduction_score"));
    run_migrations(&conn).unwrap();
    assert!(column_exists(&conn, "characters", "introduction_score"));
  }
}

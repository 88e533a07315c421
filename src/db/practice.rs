//! Practice logging and study session bookkeeping

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

use super::{parse_time, to_sql_time};
use crate::domain::{PracticeRecord, QuestionType, SessionMode};

pub fn record_practice(conn: &Connection, record: &PracticeRecord) -> Result<i64> {
  conn.execute(
    r#"
    INSERT INTO practice_log (character_id, practice_mode, question_type, user_answer, is_correct, practiced_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#,
    params![
      record.item_id,
      record.mode.as_str(),
      record.question_type.as_str(),
      record.user_answer,
      record.is_correct,
      to_sql_time(record.practiced_at),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

/// Most recent practice entries for an item, newest first
pub fn recent_practice(conn: &Connection, item_id: i64, limit: i64) -> Result<Vec<PracticeRecord>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT character_id, practice_mode, question_type, user_answer, is_correct, practiced_at
    FROM practice_log
    WHERE character_id = ?1
    ORDER BY practiced_at DESC, id DESC
    LIMIT ?2
    "#,
  )?;

  let rows = stmt.query_map(params![item_id, limit], |row| {
    let mode: String = row.get(1)?;
    let question_type: String = row.get(2)?;
    let practiced_at: String = row.get(5)?;
    Ok(PracticeRecord {
      item_id: row.get(0)?,
      mode: SessionMode::from_str(&mode).unwrap_or(SessionMode::SelfStudy),
      question_type: QuestionType::from_str(&question_type).unwrap_or(QuestionType::Meaning),
      user_answer: row.get(3)?,
      is_correct: row.get(4)?,
      practiced_at: parse_time(&practiced_at),
    })
  })?;
  rows.collect()
}

// ==================== Study sessions ====================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudySessionRecord {
  pub id: i64,
  pub mode: SessionMode,
  pub started_at: DateTime<Utc>,
  pub ended_at: Option<DateTime<Utc>>,
  pub cards_studied: i64,
  pub cards_correct: i64,
  pub cards_incorrect: i64,
}

pub fn start_session(conn: &Connection, mode: SessionMode, now: DateTime<Utc>) -> Result<i64> {
  conn.execute(
    "INSERT INTO study_sessions (mode, started_at) VALUES (?1, ?2)",
    params![mode.as_str(), to_sql_time(now)],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn end_session(
  conn: &Connection,
  session_id: i64,
  studied: usize,
  correct: usize,
  incorrect: usize,
  now: DateTime<Utc>,
) -> Result<()> {
  conn.execute(
    r#"
    UPDATE study_sessions
    SET ended_at = ?1, cards_studied = ?2, cards_correct = ?3, cards_incorrect = ?4
    WHERE id = ?5
    "#,
    params![to_sql_time(now), studied as i64, correct as i64, incorrect as i64, session_id],
  )?;
  Ok(())
}

pub fn get_session(conn: &Connection, session_id: i64) -> Result<Option<StudySessionRecord>> {
  conn
    .query_row(
      r#"
      SELECT id, mode, started_at, ended_at, cards_studied, cards_correct, cards_incorrect
      FROM study_sessions WHERE id = ?1
      "#,
      params![session_id],
      row_to_session,
    )
    .optional()
}

pub fn recent_sessions(conn: &Connection, limit: i64) -> Result<Vec<StudySessionRecord>> {
  let mut stmt = conn.prepare(
    r#"
    SELECT id, mode, started_at, ended_at, cards_studied, cards_correct, cards_incorrect
    FROM study_sessions
    ORDER BY started_at DESC, id DESC
    LIMIT ?1
    "#,
  )?;
  let rows = stmt.query_map(params![limit], row_to_session)?;
  rows.collect()
}

fn row_to_session(row: &rusqlite::Row) -> Result<StudySessionRecord> {
  let mode: String = row.get(1)?;
  let started_at: String = row.get(2)?;
  let ended_at: Option<String> = row.get(3)?;
  Ok(StudySessionRecord {
    id: row.get(0)?,
    mode: SessionMode::from_str(&mode).unwrap_or(SessionMode::SelfStudy),
    started_at: parse_time(&started_at),
    ended_at: ended_at.as_deref().map(parse_time),
    cards_studied: row.get(4)?,
    cards_correct: row.get(5)?,
    cards_incorrect: row.get(6)?,
  })
}

//! Study sessions driven over HTTP.
//!
//! The runner lives in [`crate::session::SessionStore`]; each request locks the
//! database first and then the session, so scheduler writes and session state
//! change together.

use axum::{
  extract::{Path, State},
  Json,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState};
use crate::config::{DEFAULT_DUE_LIMIT, MAX_READY_TO_LEARN, SELF_STUDY_CARD_LIMIT};
use crate::db::{self, try_lock};
use crate::domain::{LearningItem, SessionMode};
use crate::error::{SessionError, SrsError};
use crate::session::{AnswerOutcome, SessionPhase, SessionRunner, SessionSummary};

#[derive(Deserialize)]
pub struct StartRequest {
  pub mode: SessionMode,
  pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct StartResponse {
  pub session_id: String,
  #[serde(flatten)]
  pub phase: SessionPhase,
}

fn session_items(conn: &Connection, mode: SessionMode, limit: Option<usize>, now: DateTime<Utc>) -> rusqlite::Result<Vec<LearningItem>> {
  match mode {
    SessionMode::Review => Ok(
      db::get_due_items(conn, now, Some(limit.unwrap_or(DEFAULT_DUE_LIMIT)))?
        .into_iter()
        .map(|due| due.item)
        .collect(),
    ),
    SessionMode::InitialStudy => {
      let limit = limit.map_or(i64::from(MAX_READY_TO_LEARN), |l| l as i64);
      db::get_ready_to_learn(conn, limit)
    }
    SessionMode::SelfStudy => db::get_self_study_items(conn, limit.map_or(SELF_STUDY_CARD_LIMIT, |l| l as i64)),
  }
}

fn load_runner(mode: SessionMode, items: Vec<LearningItem>) -> Result<SessionRunner, SessionError> {
  let mut runner = SessionRunner::new(mode);
  runner.load(items, &mut rand::rng())?;
  Ok(runner)
}

pub async fn start(State(state): State<AppState>, Json(req): Json<StartRequest>) -> ApiResult<StartResponse> {
  let now = Utc::now();
  let conn = try_lock(&state.db)?;
  let items = session_items(&conn, req.mode, req.limit, now)?;
  let runner = load_runner(req.mode, items)?;
  let phase = runner.current().clone();
  let record_id = db::start_session(&conn, req.mode, now)?;
  let session_id = state.sessions.insert(runner, Some(record_id), now)?;
  tracing::debug!(session_id = %session_id, mode = req.mode.as_str(), "started study session");
  Ok(Json(StartResponse { session_id, phase }))
}

pub async fn current(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionPhase> {
  let phase = state.sessions.with(&id, Utc::now(), |runner, _| Ok(runner.current().clone()))?;
  Ok(Json(phase))
}

#[derive(Deserialize)]
pub struct AnswerRequest {
  pub answer: String,
}

pub async fn answer(
  State(state): State<AppState>,
  Path(id): Path<String>,
  Json(req): Json<AnswerRequest>,
) -> ApiResult<AnswerOutcome> {
  let now = Utc::now();
  let conn = try_lock(&state.db)?;
  let outcome = state
    .sessions
    .with(&id, now, |runner, _| runner.submit_answer(&req.answer, &*conn, now))?;
  Ok(Json(outcome))
}

pub async fn advance(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionPhase> {
  let phase = state
    .sessions
    .with(&id, Utc::now(), |runner, _| runner.advance().cloned())?;
  Ok(Json(phase))
}

pub async fn finish(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<SessionSummary> {
  let now = Utc::now();
  let conn = try_lock(&state.db)?;
  let summary = state.sessions.with(&id, now, |runner, record_id| {
    let summary = runner.finish(&*conn, now)?;
    if let Some(record_id) = record_id {
      db::end_session(
        &conn,
        record_id,
        summary.cards_completed,
        summary.cards_correct,
        summary.cards_incorrect,
        now,
      )
      .map_err(SrsError::from)?;
    }
    Ok(summary)
  })?;
  Ok(Json(summary))
}

//! Learning items: unlocking, introduction, scheduling and answer checks.

use axum::{
  extract::{Path, Query, State},
  Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResult, AppState};
use crate::config::{DEFAULT_DUE_LIMIT, MAX_READY_TO_LEARN};
use crate::db::{self, try_lock, DashboardStats, UnlockStatus};
use crate::domain::{DueItem, LearningItem, PracticeRecord, ProgressRecord, QuestionType, SessionMode};
use crate::validation::{self, AnswerResult};

pub async fn dashboard(State(state): State<AppState>) -> ApiResult<DashboardStats> {
  let conn = try_lock(&state.db)?;
  Ok(Json(db::get_dashboard_stats(&conn, &state.unlock_policy, Utc::now())?))
}

pub async fn check_unlock(State(state): State<AppState>) -> ApiResult<UnlockStatus> {
  let conn = try_lock(&state.db)?;
  Ok(Json(db::check_and_unlock(&conn, &state.unlock_policy, Utc::now())?))
}

#[derive(Deserialize)]
pub struct IdsQuery {
  /// Comma-separated item ids
  pub ids: String,
}

pub async fn items_for_ids(State(state): State<AppState>, Query(query): Query<IdsQuery>) -> ApiResult<Vec<LearningItem>> {
  let ids = query
    .ids
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| s.parse::<i64>().map_err(|_| ApiError::BadRequest(format!("invalid item id '{}'", s))))
    .collect::<Result<Vec<_>, _>>()?;
  let conn = try_lock(&state.db)?;
  Ok(Json(db::get_items_for_ids(&conn, &ids)?))
}

#[derive(Deserialize)]
pub struct LimitQuery {
  pub limit: Option<usize>,
}

pub async fn due_items(State(state): State<AppState>, Query(query): Query<LimitQuery>) -> ApiResult<Vec<DueItem>> {
  let conn = try_lock(&state.db)?;
  let limit = query.limit.unwrap_or(DEFAULT_DUE_LIMIT);
  Ok(Json(db::get_due_items(&conn, Utc::now(), Some(limit))?))
}

pub async fn ready_to_learn(State(state): State<AppState>) -> ApiResult<Vec<LearningItem>> {
  let conn = try_lock(&state.db)?;
  Ok(Json(db::get_ready_to_learn(&conn, i64::from(MAX_READY_TO_LEARN))?))
}

pub async fn unlock_next(State(state): State<AppState>) -> ApiResult<Option<LearningItem>> {
  let conn = try_lock(&state.db)?;
  Ok(Json(db::unlock_next_item(&conn, Utc::now())?))
}

pub async fn introduce(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<ProgressRecord> {
  let conn = try_lock(&state.db)?;
  Ok(Json(db::introduce_item(&conn, id, Utc::now())?))
}

#[derive(Deserialize)]
pub struct AnswerRequest {
  pub correct: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
  pub reached_milestone: bool,
}

pub async fn submit_answer(
  State(state): State<AppState>,
  Path(id): Path<i64>,
  Json(req): Json<AnswerRequest>,
) -> ApiResult<AnswerResponse> {
  let conn = try_lock(&state.db)?;
  let reached_milestone = db::submit_answer(&conn, id, req.correct, Utc::now())?;
  Ok(Json(AnswerResponse { reached_milestone }))
}

#[derive(Deserialize)]
pub struct PracticeRequest {
  pub item_id: i64,
  pub mode: SessionMode,
  pub question_type: QuestionType,
  pub user_answer: String,
  pub is_correct: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PracticeResponse {
  pub id: i64,
}

pub async fn record_practice(State(state): State<AppState>, Json(req): Json<PracticeRequest>) -> ApiResult<PracticeResponse> {
  let conn = try_lock(&state.db)?;
  let id = db::record_practice(
    &conn,
    &PracticeRecord {
      item_id: req.item_id,
      mode: req.mode,
      question_type: req.question_type,
      user_answer: req.user_answer,
      is_correct: req.is_correct,
      practiced_at: Utc::now(),
    },
  )?;
  Ok(Json(PracticeResponse { id }))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
  pub answer: String,
  pub reference: String,
  pub question_type: QuestionType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
  pub result: AnswerResult,
  pub correct: bool,
  /// Reference with tone marks, for pronunciation questions
  pub display: String,
}

pub async fn verify(Json(req): Json<VerifyRequest>) -> Json<VerifyResponse> {
  let result = validation::check_answer(&req.answer, &req.reference, req.question_type);
  let display = match req.question_type {
    QuestionType::Pronunciation => validation::convert_tone_numbers_to_marks(&req.reference),
    QuestionType::Meaning => req.reference,
  };
  Json(VerifyResponse {
    result,
    correct: result.is_correct(),
    display,
  })
}

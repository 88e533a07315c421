//! JSON API over the scheduler, the study session runner and network layout.

pub mod items;
pub mod network;
pub mod sessions;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::db::{DbLockError, DbPool};
use crate::error::{SessionError, SrsError, StoreError, ValidationError};
use crate::session::SessionStore;
use crate::srs::UnlockPolicy;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
  pub db: DbPool,
  pub sessions: Arc<SessionStore>,
  pub unlock_policy: UnlockPolicy,
}

impl AppState {
  pub fn new(db: DbPool) -> Self {
    Self {
      db,
      sessions: Arc::new(SessionStore::new()),
      unlock_policy: UnlockPolicy::default(),
    }
  }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Resource not found: {0}")]
  NotFound(String),

  #[error("Invalid request: {0}")]
  BadRequest(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Internal server error: {0}")]
  Internal(String),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error_code, message) = match self {
      ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
      ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
      ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
      ApiError::Internal(msg) => {
        tracing::error!("{}", msg);
        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
      }
    };
    (status, Json(json!({ "error": error_code, "message": message }))).into_response()
  }
}

impl From<DbLockError> for ApiError {
  fn from(e: DbLockError) -> Self {
    ApiError::Internal(e.to_string())
  }
}

impl From<rusqlite::Error> for ApiError {
  fn from(e: rusqlite::Error) -> Self {
    ApiError::Internal(format!("database error: {}", e))
  }
}

impl From<SrsError> for ApiError {
  fn from(e: SrsError) -> Self {
    match e {
      SrsError::NotIntroduced(_) => ApiError::Conflict(e.to_string()),
      SrsError::UnknownItem(_) => ApiError::NotFound(e.to_string()),
      SrsError::Database(_) | SrsError::Lock(_) => ApiError::Internal(e.to_string()),
    }
  }
}

impl From<SessionError> for ApiError {
  fn from(e: SessionError) -> Self {
    match e {
      SessionError::WrongPhase(..) => ApiError::Conflict(e.to_string()),
      SessionError::UnknownSession(_) => ApiError::NotFound(e.to_string()),
      SessionError::Srs(inner) => inner.into(),
    }
  }
}

impl From<ValidationError> for ApiError {
  fn from(e: ValidationError) -> Self {
    ApiError::BadRequest(e.to_string())
  }
}

impl From<StoreError> for ApiError {
  fn from(e: StoreError) -> Self {
    match e {
      StoreError::Json(_) | StoreError::Validation(_) => ApiError::BadRequest(e.to_string()),
      StoreError::Io(_) | StoreError::NoLocation(_) => ApiError::Internal(e.to_string()),
    }
  }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn routes(state: AppState) -> Router {
  Router::new()
    .route("/api/stats", get(items::dashboard))
    .route("/api/unlock", post(items::check_unlock))
    .route("/api/items", get(items::items_for_ids))
    .route("/api/items/due", get(items::due_items))
    .route("/api/items/ready", get(items::ready_to_learn))
    .route("/api/items/unlock-next", post(items::unlock_next))
    .route("/api/items/{id}/introduce", post(items::introduce))
    .route("/api/items/{id}/answer", post(items::submit_answer))
    .route("/api/practice", post(items::record_practice))
    .route("/api/verify", post(items::verify))
    .route("/api/sessions", post(sessions::start))
    .route("/api/sessions/{id}", get(sessions::current))
    .route("/api/sessions/{id}/answer", post(sessions::answer))
    .route("/api/sessions/{id}/next", post(sessions::advance))
    .route("/api/sessions/{id}/finish", post(sessions::finish))
    .route("/api/network/layout", post(network::layout))
    .route("/api/network/validate", post(network::validate))
    .route("/api/network/questions", post(network::questions))
    .route("/api/network/check", post(network::check))
    .route("/api/network/path", post(network::custom_path))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
  use axum_test::TestServer;
  use rusqlite::Connection;
  use std::sync::{Arc, Mutex};

  use super::{routes, AppState};
  use crate::db;

  /// Server over an in-memory database with the starter characters.
  pub fn server() -> (TestServer, AppState) {
    let conn = Connection::open_in_memory().unwrap();
    db::run_migrations(&conn).unwrap();
    db::seed_characters(&conn).unwrap();
    let state = AppState::new(Arc::new(Mutex::new(conn)));
    (TestServer::new(routes(state.clone())).unwrap(), state)
  }
}

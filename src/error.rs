//! Error types shared across the crate.

use thiserror::Error;

use crate::db::DbLockError;

/// A document or template failed structural validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
  #[error("malformed document: {0}")]
  Malformed(String),

  #[error("duplicate side id '{0}'")]
  DuplicateSide(String),

  #[error("arrow '{arrow}' references unknown side '{side}'")]
  DanglingArrow { arrow: String, side: String },

  #[error("template arrow {arrow} references side index {index} but template has {sides} sides")]
  TemplateIndex { arrow: usize, index: usize, sides: usize },

  #[error("{0} must not be empty")]
  Empty(&'static str),
}

/// Failures from scheduler operations against the persistent store.
#[derive(Error, Debug)]
pub enum SrsError {
  #[error("item {0} has not been introduced")]
  NotIntroduced(i64),

  #[error("unknown item {0}")]
  UnknownItem(i64),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error(transparent)]
  Lock(#[from] DbLockError),
}

/// Failures loading or saving documents, templates and progress files.
#[derive(Error, Debug)]
pub enum StoreError {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("no storage location for '{0}'")]
  NoLocation(String),
}

/// Session state machine misuse or persistence failure during a session.
#[derive(Error, Debug)]
pub enum SessionError {
  #[error("session is {0}, cannot {1}")]
  WrongPhase(&'static str, &'static str),

  #[error("unknown session '{0}'")]
  UnknownSession(String),

  #[error(transparent)]
  Srs(#[from] SrsError),
}

//! Flashcard network endpoints: arrow layout, document validation and
//! arrow-based study questions.

use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::ApiResult;
use crate::config::{CUSTOM_PATH_MAX_DEPTH, DEFAULT_DUE_LIMIT};
use crate::domain::{Flashcard, FlashcardSet, StudyProgress};
use crate::routing::{self, RoutedArrow};
use crate::store::{self, ProgressMap};
use crate::study::{self, StudyMode, StudyQuestion};

pub async fn layout(Json(card): Json<Flashcard>) -> Json<Vec<RoutedArrow>> {
  Json(routing::layout(&card))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
  pub name: String,
  pub flashcards: usize,
  pub arrows: usize,
}

/// Parse and validate a raw document body.
pub async fn validate(body: String) -> ApiResult<ValidateResponse> {
  let set: FlashcardSet = store::parse_document(&body)?;
  Ok(Json(ValidateResponse {
    flashcards: set.flashcards.len(),
    arrows: set.arrow_ids().count(),
    name: set.name,
  }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsRequest {
  pub flashcards: Vec<Flashcard>,
  pub mode: StudyMode,
  pub count: Option<usize>,
  #[serde(default)]
  pub progress: ProgressMap,
}

pub async fn questions(Json(req): Json<QuestionsRequest>) -> Json<Vec<StudyQuestion>> {
  let count = req.count.unwrap_or(DEFAULT_DUE_LIMIT);
  let mut rng = rand::rng();
  let questions = match req.mode {
    StudyMode::SpacedRepetition => {
      study::generate_due_questions(&req.flashcards, &req.progress, Utc::now(), count, &mut rng)
    }
    StudyMode::CustomPath => req
      .flashcards
      .iter()
      .flat_map(study::default_custom_path)
      .take(count)
      .collect(),
    mode => study::generate_questions(&req.flashcards, mode, count, &mut rng),
  };
  Json(questions)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
  pub question: StudyQuestion,
  pub answer: String,
  /// Progress to update with the result
  pub progress: Option<ProgressMap>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
  pub correct: bool,
  pub correct_answer: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub arrow_progress: Option<StudyProgress>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub progress: Option<ProgressMap>,
}

pub async fn check(Json(req): Json<CheckRequest>) -> Json<CheckResponse> {
  let correct = study::validate_answer(&req.question, &req.answer);
  let (arrow_progress, progress) = match req.progress {
    Some(mut progress) => {
      let updated = study::record_result(&mut progress, &req.question.arrow_id, correct, Utc::now());
      (Some(updated), Some(progress))
    }
    None => (None, None),
  };
  Json(CheckResponse {
    correct,
    correct_answer: req.question.correct_answer,
    arrow_progress,
    progress,
  })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRequest {
  pub flashcard: Flashcard,
  pub start_side_id: Option<String>,
  pub max_depth: Option<usize>,
}

pub async fn custom_path(Json(req): Json<PathRequest>) -> Json<Vec<StudyQuestion>> {
  let questions = match req.start_side_id {
    Some(start) => study::custom_path(&req.flashcard, &start, req.max_depth.unwrap_or(CUSTOM_PATH_MAX_DEPTH)),
    None => study::default_custom_path(&req.flashcard),
  };
  Json(questions)
}

//! Study questions generated from flashcard networks.
//!
//! Every arrow is a question: given the source side and the arrow label,
//! name the destination side.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::{CUSTOM_PATH_MAX_DEPTH, DISTRACTOR_COUNT};
use crate::domain::{Arrow, Flashcard, StudyProgress};
use crate::srs::sm2;
use crate::store::ProgressMap;
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudyMode {
  SelfTest,
  SpacedRepetition,
  Flash,
  MultipleChoice,
  CustomPath,
}

impl StudyMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::SelfTest => "self-test",
      Self::SpacedRepetition => "spaced-repetition",
      Self::Flash => "flash",
      Self::MultipleChoice => "multiple-choice",
      Self::CustomPath => "custom-path",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "self-test" => Some(Self::SelfTest),
      "spaced-repetition" | "srs" => Some(Self::SpacedRepetition),
      "flash" => Some(Self::Flash),
      "multiple-choice" => Some(Self::MultipleChoice),
      "custom-path" => Some(Self::CustomPath),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyQuestion {
  pub id: String,
  pub arrow_id: String,
  pub flashcard_id: String,
  pub source_value: String,
  pub arrow_label: String,
  pub correct_answer: String,
  pub mode: StudyMode,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
}

fn question_for(card: &Flashcard, arrow: &Arrow, mode: StudyMode, id: String) -> Option<StudyQuestion> {
  let source = card.side(&arrow.source_id)?;
  let destination = card.side(&arrow.destination_id)?;
  Some(StudyQuestion {
    id,
    arrow_id: arrow.id.clone(),
    flashcard_id: card.id.clone(),
    source_value: source.value.clone(),
    arrow_label: arrow.label.clone(),
    correct_answer: destination.value.clone(),
    mode,
    options: None,
  })
}

/// Up to `count` questions over randomly chosen arrows of `flashcards`.
pub fn generate_questions<R: Rng>(
  flashcards: &[Flashcard],
  mode: StudyMode,
  count: usize,
  rng: &mut R,
) -> Vec<StudyQuestion> {
  let mut arrows: Vec<(&Flashcard, &Arrow)> = flashcards
    .iter()
    .flat_map(|card| card.arrows.iter().map(move |arrow| (card, arrow)))
    .collect();
  arrows.shuffle(rng);
  arrows.truncate(count);
  build_questions(arrows, mode, rng)
}

/// Questions for the arrows due at `now`. Arrows never studied are always due.
pub fn generate_due_questions<R: Rng>(
  flashcards: &[Flashcard],
  progress: &ProgressMap,
  now: DateTime<Utc>,
  count: usize,
  rng: &mut R,
) -> Vec<StudyQuestion> {
  let all: Vec<&str> = flashcards.iter().flat_map(|c| c.arrows.iter().map(|a| a.id.as_str())).collect();
  let ready: HashSet<&str> = sm2::ready_arrows(all, progress, now).into_iter().collect();

  let mut arrows: Vec<(&Flashcard, &Arrow)> = flashcards
    .iter()
    .flat_map(|card| card.arrows.iter().map(move |arrow| (card, arrow)))
    .filter(|(_, arrow)| ready.contains(arrow.id.as_str()))
    .collect();
  arrows.shuffle(rng);
  arrows.truncate(count);
  build_questions(arrows, StudyMode::SpacedRepetition, rng)
}

fn build_questions<R: Rng>(arrows: Vec<(&Flashcard, &Arrow)>, mode: StudyMode, rng: &mut R) -> Vec<StudyQuestion> {
  arrows
    .into_iter()
    .enumerate()
    .filter_map(|(i, (card, arrow))| {
      let mut question = question_for(card, arrow, mode, format!("q{}", i))?;
      if mode == StudyMode::MultipleChoice {
        question.options = Some(multiple_choice_options(&question.correct_answer, card, &arrow.label, rng));
      }
      Some(question)
    })
    .collect()
}

/// The correct answer plus up to three distractors, shuffled.
///
/// Distractors come from destinations of arrows with the same label first,
/// then from any other side of the flashcard.
pub fn multiple_choice_options<R: Rng>(correct: &str, card: &Flashcard, label: &str, rng: &mut R) -> Vec<String> {
  let mut distractors: Vec<String> = Vec::new();
  let push = |value: &str, distractors: &mut Vec<String>| {
    if value != correct && distractors.len() < DISTRACTOR_COUNT && !distractors.iter().any(|d| d == value) {
      distractors.push(value.to_string());
    }
  };

  let same_label = card
    .arrows
    .iter()
    .filter(|a| a.label == label)
    .filter_map(|a| card.side(&a.destination_id));
  for side in same_label {
    push(&side.value, &mut distractors);
  }
  for side in &card.sides {
    push(&side.value, &mut distractors);
  }

  let mut options = Vec::with_capacity(distractors.len() + 1);
  options.push(correct.to_string());
  options.extend(distractors);
  options.shuffle(rng);
  options
}

/// Depth-first walk of outgoing arrows from `start_side_id`, one question
/// per arrow, visiting each side at most once.
pub fn custom_path(card: &Flashcard, start_side_id: &str, max_depth: usize) -> Vec<StudyQuestion> {
  fn walk<'a>(
    card: &'a Flashcard,
    side_id: &'a str,
    depth: usize,
    max_depth: usize,
    visited: &mut HashSet<&'a str>,
    path: &mut Vec<StudyQuestion>,
  ) {
    if depth >= max_depth || !visited.insert(side_id) {
      return;
    }
    for (i, arrow) in card.outgoing(side_id).enumerate() {
      if let Some(question) = question_for(card, arrow, StudyMode::CustomPath, format!("path{}-{}", depth, i)) {
        path.push(question);
      }
      walk(card, &arrow.destination_id, depth + 1, max_depth, visited, path);
    }
  }

  let mut path = Vec::new();
  walk(card, start_side_id, 0, max_depth, &mut HashSet::new(), &mut path);
  path
}

/// Custom path starting from the most connected side.
pub fn default_custom_path(card: &Flashcard) -> Vec<StudyQuestion> {
  card
    .most_connected_side()
    .map(|side| custom_path(card, &side.id, CUSTOM_PATH_MAX_DEPTH))
    .unwrap_or_default()
}

/// Typo-tolerant check of a typed answer.
pub fn validate_answer(question: &StudyQuestion, answer: &str) -> bool {
  validation::fuzzy_match(answer, &question.correct_answer)
}

/// Apply one answer to the arrow's progress, creating it on first study.
pub fn record_result(progress: &mut ProgressMap, arrow_id: &str, correct: bool, now: DateTime<Utc>) -> StudyProgress {
  let current = progress
    .get(arrow_id)
    .cloned()
    .unwrap_or_else(|| sm2::initialize(arrow_id, now));
  let next = sm2::compute_next_state(&current, correct, now);
  progress.insert(arrow_id.to_string(), next.clone());
  next
}

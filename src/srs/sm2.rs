//! SM-2 scheduling for arrows of a flashcard network (integer-day intervals).

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::config::{
  DEFAULT_DIFFICULTY, EASE_PENALTY, INITIAL_EASE_FACTOR, INITIAL_INTERVAL_DAYS, MIN_EASE_FACTOR,
};
use crate::domain::StudyProgress;

/// Fresh progress for an arrow that has never been studied; due immediately.
pub fn initialize(arrow_id: &str, now: DateTime<Utc>) -> StudyProgress {
  StudyProgress {
    arrow_id: arrow_id.to_string(),
    times_studied: 0,
    times_correct: 0,
    last_studied: now,
    next_review: now,
    ease_factor: INITIAL_EASE_FACTOR,
    interval: INITIAL_INTERVAL_DAYS,
  }
}

/// Next state after one answer, graded with the default difficulty.
pub fn compute_next_state(progress: &StudyProgress, was_correct: bool, now: DateTime<Utc>) -> StudyProgress {
  compute_next_state_with_difficulty(progress, was_correct, DEFAULT_DIFFICULTY, now)
}

/// Next state after one answer.
///
/// `difficulty` is the SM-2 quality (0-5) and only affects correct answers.
pub fn compute_next_state_with_difficulty(
  progress: &StudyProgress,
  was_correct: bool,
  difficulty: u8,
  now: DateTime<Utc>,
) -> StudyProgress {
  let (interval, ease_factor) = if was_correct {
    let interval = match progress.times_studied {
      0 => 1,
      1 => 6,
      _ => ((progress.interval as f64) * progress.ease_factor).round() as i64,
    };
    // EF' = EF + (0.1 - (5 - d) * (0.08 + (5 - d) * 0.02))
    let d = f64::from(difficulty.min(5));
    let delta = 0.1 - (5.0 - d) * (0.08 + (5.0 - d) * 0.02);
    (interval, (progress.ease_factor + delta).max(MIN_EASE_FACTOR))
  } else {
    (1, (progress.ease_factor - EASE_PENALTY).max(MIN_EASE_FACTOR))
  };

  StudyProgress {
    arrow_id: progress.arrow_id.clone(),
    times_studied: progress.times_studied + 1,
    times_correct: progress.times_correct + u32::from(was_correct),
    last_studied: now,
    next_review: now + Duration::days(interval),
    ease_factor,
    interval,
  }
}

/// Fraction of answers that were correct (0 when never studied).
pub fn retention_rate(progress: &StudyProgress) -> f64 {
  if progress.times_studied == 0 {
    0.0
  } else {
    f64::from(progress.times_correct) / f64::from(progress.times_studied)
  }
}

/// Arrows that may be studied now. Arrows without progress are always ready.
pub fn ready_arrows<'a>(
  arrow_ids: impl IntoIterator<Item = &'a str>,
  progress: &BTreeMap<String, StudyProgress>,
  now: DateTime<Utc>,
) -> Vec<&'a str> {
  arrow_ids
    .into_iter()
    .filter(|id| progress.get(*id).is_none_or(|p| p.next_review <= now))
    .collect()
}

/// Estimated difficulty in 0.0..=1.0 from accuracy and response time.
///
/// New arrows sit in the middle. Accuracy weighs 70%, response time 30%
/// (saturating at ten seconds).
pub fn estimate_difficulty(times_studied: u32, times_correct: u32, average_response_ms: Option<u64>) -> f64 {
  if times_studied == 0 {
    return 0.5;
  }
  let accuracy = f64::from(times_correct) / f64::from(times_studied);
  let time_factor = average_response_ms
    .map(|ms| (ms as f64 / 10_000.0).min(1.0))
    .unwrap_or(0.5);
  ((1.0 - accuracy) * 0.7 + time_factor * 0.3).clamp(0.0, 1.0)
}

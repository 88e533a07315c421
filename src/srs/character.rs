//! Character-track scheduling with fractional-day intervals.
//!
//! Intervals climb a fixed ladder (1h, 12h, 1d, 3d, 7d) and then grow by the
//! ease factor. Reaching the 7-day rung for the first time is the milestone
//! that earns new unlocks.

use chrono::{DateTime, Duration, Utc};

use crate::config::{
  CHARACTER_INTERVAL_LADDER, EASE_PENALTY, INITIAL_EASE_FACTOR, INTERVAL_EPSILON_DAYS,
  INTRODUCTORY_INTERVAL_DAYS, MAX_CHARACTER_EASE, MILESTONE_INTERVAL_DAYS, MIN_EASE_FACTOR,
};
use crate::domain::ProgressRecord;
use crate::error::SrsError;

/// Result of scheduling one answer.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterOutcome {
  pub progress: ProgressRecord,
  pub reached_milestone_first_time: bool,
}

pub fn days_to_duration(days: f64) -> Duration {
  Duration::milliseconds((days * 86_400_000.0).round() as i64)
}

/// Progress for an item that has been unlocked but not yet introduced.
pub fn unlocked(item_id: i64, now: DateTime<Utc>) -> ProgressRecord {
  ProgressRecord {
    item_id,
    introduced: false,
    introduced_at: None,
    times_reviewed: 0,
    times_correct: 0,
    times_incorrect: 0,
    current_interval_days: INTRODUCTORY_INTERVAL_DAYS,
    previous_interval_days: 0.0,
    ease_factor: INITIAL_EASE_FACTOR,
    next_review: now,
    last_reviewed: None,
    has_reached_milestone: false,
  }
}

/// Introduce an item: it becomes reviewable after the introductory interval.
pub fn introduce(progress: &ProgressRecord, now: DateTime<Utc>) -> ProgressRecord {
  ProgressRecord {
    introduced: true,
    introduced_at: progress.introduced_at.or(Some(now)),
    current_interval_days: INTRODUCTORY_INTERVAL_DAYS,
    previous_interval_days: 0.0,
    last_reviewed: Some(now),
    next_review: now + days_to_duration(INTRODUCTORY_INTERVAL_DAYS),
    ..progress.clone()
  }
}

/// Introduce an item whose initial study was cut short; it is due at once.
pub fn mark_reviewable(progress: &ProgressRecord, now: DateTime<Utc>) -> ProgressRecord {
  ProgressRecord {
    introduced: true,
    introduced_at: progress.introduced_at.or(Some(now)),
    next_review: now,
    ..progress.clone()
  }
}

/// The ladder rung after `current`, or `None` past the top rung.
fn next_rung(current: f64) -> Option<f64> {
  CHARACTER_INTERVAL_LADDER
    .iter()
    .copied()
    .find(|rung| *rung > current + INTERVAL_EPSILON_DAYS)
}

/// The ladder rung below `current`, never less than the introductory interval.
fn rung_below(current: f64) -> f64 {
  CHARACTER_INTERVAL_LADDER
    .iter()
    .copied()
    .rev()
    .find(|rung| *rung < current - INTERVAL_EPSILON_DAYS)
    .unwrap_or(INTRODUCTORY_INTERVAL_DAYS)
}

/// Schedule one answer for an introduced item.
pub fn compute_next_state(
  progress: &ProgressRecord,
  was_correct: bool,
  now: DateTime<Utc>,
) -> Result<CharacterOutcome, SrsError> {
  if !progress.introduced {
    return Err(SrsError::NotIntroduced(progress.item_id));
  }

  let current = progress.current_interval_days;
  let (interval, previous, ease) = if was_correct {
    let ease = progress.ease_factor.min(MAX_CHARACTER_EASE);
    let interval = next_rung(current).unwrap_or(current * ease);
    (interval, current, ease)
  } else {
    let interval = progress.previous_interval_days.max(INTRODUCTORY_INTERVAL_DAYS);
    let ease = (progress.ease_factor - EASE_PENALTY).max(MIN_EASE_FACTOR);
    (interval, rung_below(interval), ease)
  };

  let crossed = interval + INTERVAL_EPSILON_DAYS >= MILESTONE_INTERVAL_DAYS;
  let reached_milestone_first_time = !progress.has_reached_milestone && crossed;

  let next = ProgressRecord {
    times_reviewed: progress.times_reviewed + 1,
    times_correct: progress.times_correct + i64::from(was_correct),
    times_incorrect: progress.times_incorrect + i64::from(!was_correct),
    current_interval_days: interval,
    previous_interval_days: previous,
    ease_factor: ease,
    last_reviewed: Some(now),
    next_review: now + days_to_duration(interval),
    has_reached_milestone: progress.has_reached_milestone || crossed,
    ..progress.clone()
  };

  Ok(CharacterOutcome {
    progress: next,
    reached_milestone_first_time,
  })
}

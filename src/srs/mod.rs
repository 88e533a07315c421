//! Review scheduling.
//!
//! Two policies live side by side: [`sm2`] schedules arrows of a flashcard
//! network in whole days, [`character`] schedules learning items on a
//! fractional-day ladder with milestone detection. [`unlock`] paces the
//! introduction of new items.

pub mod character;
pub mod sm2;
pub mod unlock;

use chrono::{DateTime, Utc};

use crate::domain::{DueItem, ProgressRecord, StudyProgress};

pub use character::CharacterOutcome;
pub use unlock::{UnlockDecision, UnlockPolicy, UnlockSnapshot};

/// Anything with a review date, for due selection across both policies.
pub trait Scheduled {
  fn next_review(&self) -> DateTime<Utc>;
  /// Stable tie-breaker for items due at the same instant.
  fn sort_key(&self) -> String;
}

impl Scheduled for StudyProgress {
  fn next_review(&self) -> DateTime<Utc> {
    self.next_review
  }

  fn sort_key(&self) -> String {
    self.arrow_id.clone()
  }
}

impl Scheduled for ProgressRecord {
  fn next_review(&self) -> DateTime<Utc> {
    self.next_review
  }

  fn sort_key(&self) -> String {
    format!("{:020}", self.item_id)
  }
}

impl Scheduled for DueItem {
  fn next_review(&self) -> DateTime<Utc> {
    self.progress.next_review
  }

  fn sort_key(&self) -> String {
    self.progress.sort_key()
  }
}

/// Items due at `now`, most overdue first, optionally capped.
pub fn due_items<'a, T: Scheduled>(
  items: impl IntoIterator<Item = &'a T>,
  now: DateTime<Utc>,
  limit: Option<usize>,
) -> Vec<&'a T>
where
  T: 'a,
{
  let mut due: Vec<&T> = items.into_iter().filter(|p| p.next_review() <= now).collect();
  due.sort_by(|a, b| {
    a.next_review()
      .cmp(&b.next_review())
      .then_with(|| a.sort_key().cmp(&b.sort_key()))
  });
  if let Some(limit) = limit {
    due.truncate(limit);
  }
  due
}

/// Overall retention across arrow progress records.
pub fn overall_retention<'a>(progress: impl IntoIterator<Item = &'a StudyProgress>) -> f64 {
  let (studied, correct) = progress
    .into_iter()
    .fold((0u64, 0u64), |(s, c), p| (s + u64::from(p.times_studied), c + u64::from(p.times_correct)));
  if studied == 0 { 0.0 } else { correct as f64 / studied as f64 }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A character (or word) that can be learned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningItem {
  pub id: i64,
  pub character: String,
  pub pinyin: String,
  pub definition: String,
  pub frequency_rank: i64,
  pub introduction_score: Option<f64>,
}

/// Scheduling state of a learning item on the character track.
///
/// Created when the item is first unlocked, mutated only through
/// [`crate::srs::character`], never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
  pub item_id: i64,
  pub introduced: bool,
  pub introduced_at: Option<DateTime<Utc>>,
  pub times_reviewed: i64,
  pub times_correct: i64,
  pub times_incorrect: i64,
  pub current_interval_days: f64,
  pub previous_interval_days: f64,
  pub ease_factor: f64,
  pub next_review: DateTime<Utc>,
  pub last_reviewed: Option<DateTime<Utc>>,
  pub has_reached_milestone: bool,
}

/// An item joined with its progress, as handed to a study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueItem {
  #[serde(flatten)]
  pub item: LearningItem,
  pub progress: ProgressRecord,
}

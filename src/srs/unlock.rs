//! Drip-feed pacing for unlocking new items.
//!
//! Two sources of new items: every milestone reached earns an immediate
//! unlock, and a time-based batch opens once per interval provided the
//! learner has worked through everything already introduced.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockPolicy {
  pub interval_hours: i64,
  pub batch_size: u32,
  pub max_ready_to_learn: u32,
  pub milestone_credit: u32,
}

impl Default for UnlockPolicy {
  fn default() -> Self {
    Self {
      interval_hours: config::UNLOCK_INTERVAL_HOURS,
      batch_size: config::UNLOCK_BATCH_SIZE,
      max_ready_to_learn: config::MAX_READY_TO_LEARN,
      milestone_credit: config::MILESTONE_UNLOCK_CREDIT,
    }
  }
}

/// What the store knows about the learner's pipeline of new items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnlockSnapshot {
  /// When the last time-based batch was unlocked
  pub last_batch_at: Option<DateTime<Utc>>,
  /// Unlocked but not yet introduced
  pub ready_to_learn: u32,
  /// Introduced but never reviewed since introduction
  pub awaiting_first_review: u32,
  /// Milestones reached that have not yet been turned into unlocks
  pub unclaimed_milestones: u32,
  /// Items that could still be unlocked
  pub remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum UnlockBlock {
  /// The next batch opens in this many hours (rounded up)
  Waiting { hours: i64 },
  /// Introduced items still need their first review
  Unreviewed { count: u32 },
  /// Too many items are already waiting to be learned
  Backlog,
  /// Nothing left to unlock
  Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockDecision {
  /// Items to unlock now
  pub unlock: u32,
  /// Whether the unlock consumes the time-based batch
  pub starts_batch: bool,
  /// Why the time-based batch did not open, if it did not
  pub blocked: Option<UnlockBlock>,
}

impl UnlockDecision {
  pub fn hours_until_next_unlock(&self) -> Option<i64> {
    match self.blocked {
      Some(UnlockBlock::Waiting { hours }) => Some(hours),
      _ => None,
    }
  }
}

/// Decide how many items may be unlocked at `now`.
pub fn evaluate(policy: &UnlockPolicy, snapshot: &UnlockSnapshot, now: DateTime<Utc>) -> UnlockDecision {
  if snapshot.remaining == 0 {
    return UnlockDecision {
      unlock: 0,
      starts_batch: false,
      blocked: Some(UnlockBlock::Exhausted),
    };
  }

  let room = policy.max_ready_to_learn.saturating_sub(snapshot.ready_to_learn);
  let earned = snapshot.unclaimed_milestones.saturating_mul(policy.milestone_credit);

  let batch = if room == 0 {
    Err(UnlockBlock::Backlog)
  } else if snapshot.awaiting_first_review > 0 {
    Err(UnlockBlock::Unreviewed {
      count: snapshot.awaiting_first_review,
    })
  } else {
    match snapshot.last_batch_at {
      Some(last) if now < last + Duration::hours(policy.interval_hours) => {
        let remaining = last + Duration::hours(policy.interval_hours) - now;
        let hours = (remaining.num_minutes() + 59) / 60;
        Err(UnlockBlock::Waiting { hours: hours.max(1) })
      }
      _ => Ok(policy.batch_size),
    }
  };

  let (batch_size, blocked) = match batch {
    Ok(size) => (size, None),
    Err(block) => (0, Some(block)),
  };

  // Milestone unlocks ignore the backlog cap; batches respect it
  let unlock = (earned + batch_size.min(room)).min(snapshot.remaining);
  UnlockDecision {
    unlock,
    starts_batch: batch_size > 0 && unlock > 0,
    blocked,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
  }

  fn snapshot() -> UnlockSnapshot {
    UnlockSnapshot {
      last_batch_at: None,
      ready_to_learn: 0,
      awaiting_first_review: 0,
      unclaimed_milestones: 0,
      remaining: 100,
    }
  }

  #[test]
  fn test_first_batch_opens_immediately() {
    let decision = evaluate(&UnlockPolicy::default(), &snapshot(), now());
    assert_eq!(decision.unlock, config::UNLOCK_BATCH_SIZE);
    assert!(decision.starts_batch);
    assert_eq!(decision.blocked, None);
  }

  #[test]
  fn test_batch_waits_for_interval() {
    let s = UnlockSnapshot {
      last_batch_at: Some(now() - Duration::hours(20)),
      ..snapshot()
    };
    let decision = evaluate(&UnlockPolicy::default(), &s, now());
    assert_eq!(decision.unlock, 0);
    assert_eq!(decision.hours_until_next_unlock(), Some(4));
  }

  #[test]
  fn test_partial_hour_rounds_up() {
    let s = UnlockSnapshot {
      last_batch_at: Some(now() - Duration::hours(23) - Duration::minutes(30)),
      ..snapshot()
    };
    let decision = evaluate(&UnlockPolicy::default(), &s, now());
    assert_eq!(decision.hours_until_next_unlock(), Some(1));
  }

  #[test]
  fn test_unreviewed_items_block_batch() {
    let s = UnlockSnapshot {
      awaiting_first_review: 2,
      ..snapshot()
    };
    let decision = evaluate(&UnlockPolicy::default(), &s, now());
    assert_eq!(decision.unlock, 0);
    assert_eq!(decision.blocked, Some(UnlockBlock::Unreviewed { count: 2 }));
    assert_eq!(decision.hours_until_next_unlock(), None);
  }

  #[test]
  fn test_milestones_unlock_even_when_waiting() {
    let s = UnlockSnapshot {
      last_batch_at: Some(now()),
      unclaimed_milestones: 2,
      ..snapshot()
    };
    let decision = evaluate(&UnlockPolicy::default(), &s, now());
    assert_eq!(decision.unlock, 2);
    assert!(!decision.starts_batch);
  }

  #[test]
  fn test_backlog_caps_batch() {
    let s = UnlockSnapshot {
      ready_to_learn: config::MAX_READY_TO_LEARN - 2,
      ..snapshot()
    };
    let decision = evaluate(&UnlockPolicy::default(), &s, now());
    assert_eq!(decision.unlock, 2);

    let full = UnlockSnapshot {
      ready_to_learn: config::MAX_READY_TO_LEARN,
      ..snapshot()
    };
    assert_eq!(evaluate(&UnlockPolicy::default(), &full, now()).blocked, Some(UnlockBlock::Backlog));
  }

  #[test]
  fn test_never_unlocks_more_than_remaining() {
    let s = UnlockSnapshot {
      remaining: 3,
      unclaimed_milestones: 1,
      ..snapshot()
    };
    assert_eq!(evaluate(&UnlockPolicy::default(), &s, now()).unlock, 3);

    let empty = UnlockSnapshot { remaining: 0, ..snapshot() };
    let decision = evaluate(&UnlockPolicy::default(), &empty, now());
    assert_eq!(decision.unlock, 0);
    assert_eq!(decision.blocked, Some(UnlockBlock::Exhausted));
  }
}

//! Learning items, their progress records, and unlocking.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::Serialize;

use super::{get_setting, parse_time, set_setting, to_sql_time};
use crate::domain::{DueItem, LearningItem, ProgressRecord};
use crate::error::SrsError;
use crate::srs::unlock::{self, UnlockBlock, UnlockPolicy, UnlockSnapshot};
use crate::srs::{self, character};

const ITEM_COLUMNS: &str = "c.id, c.character, c.pinyin, c.definition, c.frequency_rank, c.introduction_score";

const PROGRESS_COLUMNS: &str = "p.character_id, p.introduced, p.introduced_at, p.times_reviewed, p.times_correct,
  p.times_incorrect, p.current_interval_days, p.previous_interval_days, p.ease_factor, p.next_review_date,
  p.last_reviewed, p.has_reached_week";

/// Number of columns in ITEM_COLUMNS, for reading joined rows
const ITEM_COLUMN_COUNT: usize = 6;

/// Order for introducing new items: explicit score first, then frequency
const INTRODUCTION_ORDER: &str =
  "c.introduction_score IS NULL, c.introduction_score DESC, c.frequency_rank ASC, c.id ASC";

fn row_to_item(row: &Row) -> Result<LearningItem> {
  Ok(LearningItem {
    id: row.get(0)?,
    character: row.get(1)?,
    pinyin: row.get(2)?,
    definition: row.get(3)?,
    frequency_rank: row.get(4)?,
    introduction_score: row.get(5)?,
  })
}

fn row_to_progress(row: &Row, offset: usize) -> Result<ProgressRecord> {
  let introduced_at: Option<String> = row.get(offset + 2)?;
  let next_review: String = row.get(offset + 9)?;
  let last_reviewed: Option<String> = row.get(offset + 10)?;
  Ok(ProgressRecord {
    item_id: row.get(offset)?,
    introduced: row.get(offset + 1)?,
    introduced_at: introduced_at.as_deref().map(parse_time),
    times_reviewed: row.get(offset + 3)?,
    times_correct: row.get(offset + 4)?,
    times_incorrect: row.get(offset + 5)?,
    current_interval_days: row.get(offset + 6)?,
    previous_interval_days: row.get(offset + 7)?,
    ease_factor: row.get(offset + 8)?,
    next_review: parse_time(&next_review),
    last_reviewed: last_reviewed.as_deref().map(parse_time),
    has_reached_milestone: row.get(offset + 11)?,
  })
}

// ==================== Items ====================

pub fn insert_item(conn: &Connection, item: &LearningItem) -> Result<()> {
  conn.execute(
    r#"
    INSERT OR REPLACE INTO characters (id, character, pinyin, definition, frequency_rank, introduction_score)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    "#,
    params![
      item.id,
      item.character,
      item.pinyin,
      item.definition,
      item.frequency_rank,
      item.introduction_score
    ],
  )?;
  Ok(())
}

pub fn get_item(conn: &Connection, id: i64) -> Result<Option<LearningItem>> {
  conn
    .query_row(
      &format!("SELECT {} FROM characters c WHERE c.id = ?1", ITEM_COLUMNS),
      params![id],
      row_to_item,
    )
    .optional()
}

/// Items for the given ids, in the order requested. Unknown ids are skipped.
pub fn get_items_for_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<LearningItem>> {
  let mut stmt = conn.prepare(&format!("SELECT {} FROM characters c WHERE c.id = ?1", ITEM_COLUMNS))?;
  let mut items = Vec::with_capacity(ids.len());
  for id in ids {
    if let Some(item) = stmt.query_row(params![id], row_to_item).optional()? {
      items.push(item);
    }
  }
  Ok(items)
}

// ==================== Progress ====================

pub fn get_progress(conn: &Connection, item_id: i64) -> Result<Option<ProgressRecord>> {
  conn
    .query_row(
      &format!("SELECT {} FROM user_progress p WHERE p.character_id = ?1", PROGRESS_COLUMNS),
      params![item_id],
      |row| row_to_progress(row, 0),
    )
    .optional()
}

/// Insert or update a progress record. `unlocked_at` is only written on insert.
pub fn save_progress(conn: &Connection, progress: &ProgressRecord, now: DateTime<Utc>) -> Result<()> {
  conn.execute(
    r#"
    INSERT INTO user_progress (
      character_id, introduced, introduced_at, times_reviewed, times_correct, times_incorrect,
      current_interval_days, previous_interval_days, ease_factor, next_review_date, last_reviewed,
      has_reached_week, unlocked_at
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
    ON CONFLICT(character_id) DO UPDATE SET
      introduced = excluded.introduced,
      introduced_at = excluded.introduced_at,
      times_reviewed = excluded.times_reviewed,
      times_correct = excluded.times_correct,
      times_incorrect = excluded.times_incorrect,
      current_interval_days = excluded.current_interval_days,
      previous_interval_days = excluded.previous_interval_days,
      ease_factor = excluded.ease_factor,
      next_review_date = excluded.next_review_date,
      last_reviewed = excluded.last_reviewed,
      has_reached_week = excluded.has_reached_week
    "#,
    params![
      progress.item_id,
      progress.introduced,
      progress.introduced_at.map(to_sql_time),
      progress.times_reviewed,
      progress.times_correct,
      progress.times_incorrect,
      progress.current_interval_days,
      progress.previous_interval_days,
      progress.ease_factor,
      to_sql_time(progress.next_review),
      progress.last_reviewed.map(to_sql_time),
      progress.has_reached_milestone,
      to_sql_time(now),
    ],
  )?;
  Ok(())
}

/// Introduce an item so it enters the review pool. Already-introduced items
/// are returned unchanged.
pub fn introduce_item(conn: &Connection, item_id: i64, now: DateTime<Utc>) -> std::result::Result<ProgressRecord, SrsError> {
  if get_item(conn, item_id)?.is_none() {
    return Err(SrsError::UnknownItem(item_id));
  }
  let existing = get_progress(conn, item_id)?;
  if let Some(p) = existing.as_ref().filter(|p| p.introduced) {
    return Ok(p.clone());
  }

  let base = existing.unwrap_or_else(|| character::unlocked(item_id, now));
  let progress = character::introduce(&base, now);
  save_progress(conn, &progress, now)?;
  tracing::info!(item_id, "introduced item");
  Ok(progress)
}

/// Introduced items due at `now`, most overdue first.
pub fn get_due_items(conn: &Connection, now: DateTime<Utc>, limit: Option<usize>) -> Result<Vec<DueItem>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {}, {}
    FROM characters c
    JOIN user_progress p ON p.character_id = c.id
    WHERE p.introduced = 1 AND p.next_review_date <= ?1
    "#,
    ITEM_COLUMNS, PROGRESS_COLUMNS
  ))?;
  let rows = stmt
    .query_map(params![to_sql_time(now)], |row| {
      Ok(DueItem {
        item: row_to_item(row)?,
        progress: row_to_progress(row, ITEM_COLUMN_COUNT)?,
      })
    })?
    .collect::<Result<Vec<_>>>()?;

  Ok(srs::due_items(&rows, now, limit).into_iter().cloned().collect())
}

/// Schedule one answer. Returns whether the item reached its milestone for
/// the first time.
pub fn submit_answer(
  conn: &Connection,
  item_id: i64,
  was_correct: bool,
  now: DateTime<Utc>,
) -> std::result::Result<bool, SrsError> {
  let progress = get_progress(conn, item_id)?.ok_or(SrsError::NotIntroduced(item_id))?;
  let outcome = character::compute_next_state(&progress, was_correct, now)?;
  save_progress(conn, &outcome.progress, now)?;
  if outcome.reached_milestone_first_time {
    tracing::info!(item_id, "item reached milestone");
  }
  Ok(outcome.reached_milestone_first_time)
}

/// Finish initial study for a batch: each item gets the introductory interval.
///
/// Items must already be unlocked. Items introduced in the meantime keep their
/// schedule.
pub fn complete_initial_study(
  conn: &Connection,
  item_ids: &[i64],
  now: DateTime<Utc>,
) -> std::result::Result<(), SrsError> {
  introduce_batch(conn, item_ids, now, character::introduce)
}

/// Introduce items whose initial study was cut short; they are due immediately.
pub fn mark_reviewable(conn: &Connection, item_ids: &[i64], now: DateTime<Utc>) -> std::result::Result<(), SrsError> {
  introduce_batch(conn, item_ids, now, character::mark_reviewable)
}

fn introduce_batch(
  conn: &Connection,
  item_ids: &[i64],
  now: DateTime<Utc>,
  introduce: fn(&ProgressRecord, DateTime<Utc>) -> ProgressRecord,
) -> std::result::Result<(), SrsError> {
  let tx = conn.unchecked_transaction()?;
  for &id in item_ids {
    let progress = match get_progress(&tx, id)? {
      Some(p) => p,
      None if get_item(&tx, id)?.is_none() => return Err(SrsError::UnknownItem(id)),
      None => return Err(SrsError::NotIntroduced(id)),
    };
    if progress.introduced {
      tracing::debug!(item_id = id, "item already introduced, keeping its schedule");
      continue;
    }
    save_progress(&tx, &introduce(&progress, now), now)?;
  }
  tx.commit()?;
  Ok(())
}

// ==================== Unlocking ====================

/// Unlock up to `count` new items in introduction order.
pub fn unlock_next_items(conn: &Connection, count: u32, now: DateTime<Utc>) -> Result<Vec<LearningItem>> {
  if count == 0 {
    return Ok(Vec::new());
  }
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {}
    FROM characters c
    WHERE c.id NOT IN (SELECT character_id FROM user_progress)
    ORDER BY {}
    LIMIT ?1
    "#,
    ITEM_COLUMNS, INTRODUCTION_ORDER
  ))?;
  let items = stmt
    .query_map(params![i64::from(count)], row_to_item)?
    .collect::<Result<Vec<_>>>()?;

  for item in &items {
    save_progress(conn, &character::unlocked(item.id, now), now)?;
  }
  Ok(items)
}

pub fn unlock_next_item(conn: &Connection, now: DateTime<Utc>) -> Result<Option<LearningItem>> {
  Ok(unlock_next_items(conn, 1, now)?.into_iter().next())
}

/// Unlocked items waiting to be introduced.
pub fn get_ready_to_learn(conn: &Connection, limit: i64) -> Result<Vec<LearningItem>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {}
    FROM characters c
    JOIN user_progress p ON p.character_id = c.id
    WHERE p.introduced = 0
    ORDER BY p.unlocked_at ASC, {}
    LIMIT ?1
    "#,
    ITEM_COLUMNS, INTRODUCTION_ORDER
  ))?;
  stmt
    .query_map(params![limit], row_to_item)?
    .collect::<Result<Vec<_>>>()
}

/// Random sample of introduced items for practice.
pub fn get_self_study_items(conn: &Connection, limit: i64) -> Result<Vec<LearningItem>> {
  let mut stmt = conn.prepare(&format!(
    r#"
    SELECT {}
    FROM characters c
    JOIN user_progress p ON p.character_id = c.id
    WHERE p.introduced = 1
    ORDER BY RANDOM()
    LIMIT ?1
    "#,
    ITEM_COLUMNS
  ))?;
  stmt
    .query_map(params![limit], row_to_item)?
    .collect::<Result<Vec<_>>>()
}

fn count(conn: &Connection, sql: &str) -> Result<u32> {
  let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
  Ok(u32::try_from(n).unwrap_or(u32::MAX))
}

pub fn unlock_snapshot(conn: &Connection) -> Result<UnlockSnapshot> {
  let reached = count(conn, "SELECT COUNT(*) FROM user_progress WHERE has_reached_week = 1")?;
  let claimed: u32 = get_setting(conn, "claimed_milestones")?
    .and_then(|v| v.parse().ok())
    .unwrap_or(0);

  Ok(UnlockSnapshot {
    last_batch_at: get_setting(conn, "last_unlock_at")?.as_deref().map(parse_time),
    ready_to_learn: count(conn, "SELECT COUNT(*) FROM user_progress WHERE introduced = 0")?,
    awaiting_first_review: count(
      conn,
      "SELECT COUNT(*) FROM user_progress WHERE introduced = 1 AND times_reviewed = 0",
    )?,
    unclaimed_milestones: reached.saturating_sub(claimed),
    remaining: count(
      conn,
      "SELECT COUNT(*) FROM characters WHERE id NOT IN (SELECT character_id FROM user_progress)",
    )?,
  })
}

/// Outcome of an unlock check, as shown on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct UnlockStatus {
  pub unlocked: Vec<LearningItem>,
  pub unlocked_count: usize,
  pub ready_to_learn_count: u32,
  pub hours_until_next_unlock: Option<i64>,
  pub blocked: Option<UnlockBlock>,
}

/// Unlock whatever the pacing policy allows right now.
pub fn check_and_unlock(conn: &Connection, policy: &UnlockPolicy, now: DateTime<Utc>) -> Result<UnlockStatus> {
  let snapshot = unlock_snapshot(conn)?;
  let decision = unlock::evaluate(policy, &snapshot, now);

  let tx = conn.unchecked_transaction()?;
  let unlocked = unlock_next_items(&tx, decision.unlock, now)?;
  if snapshot.unclaimed_milestones > 0 {
    let reached = count(&tx, "SELECT COUNT(*) FROM user_progress WHERE has_reached_week = 1")?;
    set_setting(&tx, "claimed_milestones", &reached.to_string())?;
  }
  if decision.starts_batch {
    set_setting(&tx, "last_unlock_at", &to_sql_time(now))?;
  }
  tx.commit()?;

  if !unlocked.is_empty() {
    tracing::info!(count = unlocked.len(), "unlocked new items");
  }

  Ok(UnlockStatus {
    unlocked_count: unlocked.len(),
    unlocked,
    ready_to_learn_count: snapshot.ready_to_learn + decision.unlock,
    hours_until_next_unlock: decision.hours_until_next_unlock(),
    blocked: decision.blocked,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::TestEnv;
  use chrono::Duration;

  fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
  }

  #[test]
  fn test_get_items_for_ids_keeps_order_and_skips_unknown() {
    let env = TestEnv::seeded().unwrap();
    let items = get_items_for_ids(&env.conn, &[3, 999, 1]).unwrap();
    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![3, 1]);
  }

  #[test]
  fn test_submit_without_progress_is_not_introduced() {
    let env = TestEnv::seeded().unwrap();
    let err = submit_answer(&env.conn, 1, true, now());
    assert!(matches!(err, Err(SrsError::NotIntroduced(1))));
  }

  #[test]
  fn test_submit_for_unlocked_item_is_not_introduced() {
    let env = TestEnv::seeded().unwrap();
    unlock_next_item(&env.conn, now()).unwrap();
    assert!(matches!(submit_answer(&env.conn, 1, true, now()), Err(SrsError::NotIntroduced(1))));
  }

  #[test]
  fn test_introduce_unknown_item() {
    let env = TestEnv::seeded().unwrap();
    assert!(matches!(introduce_item(&env.conn, 999, now()), Err(SrsError::UnknownItem(999))));
  }

  #[test]
  fn test_introduce_then_due_after_an_hour() {
    let env = TestEnv::seeded().unwrap();
    introduce_item(&env.conn, 2, now()).unwrap();

    assert!(get_due_items(&env.conn, now(), None).unwrap().is_empty());
    let due = get_due_items(&env.conn, now() + Duration::hours(1), None).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].item.character, "一");
    assert!(due[0].progress.introduced);
  }

  #[test]
  fn test_introduce_is_idempotent() {
    let env = TestEnv::seeded().unwrap();
    let first = introduce_item(&env.conn, 2, now()).unwrap();
    let again = introduce_item(&env.conn, 2, now() + Duration::hours(5)).unwrap();
    assert_eq!(first, again);
  }

  #[test]
  fn test_submit_answer_persists_schedule() {
    let env = TestEnv::seeded().unwrap();
    introduce_item(&env.conn, 1, now()).unwrap();
    let reached = submit_answer(&env.conn, 1, true, now()).unwrap();
    assert!(!reached);

    let p = get_progress(&env.conn, 1).unwrap().unwrap();
    assert_eq!(p.times_reviewed, 1);
    assert_eq!(p.current_interval_days, 0.5);
    assert_eq!(p.next_review, now() + Duration::hours(12));
  }

  #[test]
  fn test_milestone_reported_once() {
    let env = TestEnv::seeded().unwrap();
    introduce_item(&env.conn, 1, now()).unwrap();
    let results: Vec<bool> = (0..5).map(|_| submit_answer(&env.conn, 1, true, now()).unwrap()).collect();
    assert_eq!(results, vec![false, false, false, true, false]);
  }

  #[test]
  fn test_due_items_ordered_and_limited() {
    let env = TestEnv::seeded().unwrap();
    for (id, hours_ago) in [(1, 1), (2, 5), (3, 3)] {
      let p = character::mark_reviewable(&character::unlocked(id, now()), now() - Duration::hours(hours_ago));
      save_progress(&env.conn, &p, now()).unwrap();
    }
    let due = get_due_items(&env.conn, now(), Some(2)).unwrap();
    let ids: Vec<i64> = due.iter().map(|d| d.item.id).collect();
    assert_eq!(ids, vec![2, 3]);
  }

  #[test]
  fn test_initial_study_batch_and_reviewable() {
    let env = TestEnv::seeded().unwrap();
    unlock_next_items(&env.conn, 3, now()).unwrap();
    complete_initial_study(&env.conn, &[1, 2], now()).unwrap();
    mark_reviewable(&env.conn, &[3], now()).unwrap();

    let due_now: Vec<i64> = get_due_items(&env.conn, now(), None).unwrap().iter().map(|d| d.item.id).collect();
    assert_eq!(due_now, vec![3]);
    let later = get_due_items(&env.conn, now() + Duration::hours(1), None).unwrap();
    assert_eq!(later.len(), 3);
  }

  #[test]
  fn test_initial_study_keeps_schedule_of_introduced_item() {
    let env = TestEnv::seeded().unwrap();
    introduce_item(&env.conn, 1, now()).unwrap();
    let mut at = now();
    for _ in 0..4 {
      at = get_progress(&env.conn, 1).unwrap().unwrap().next_review;
      submit_answer(&env.conn, 1, true, at).unwrap();
    }
    let before = get_progress(&env.conn, 1).unwrap().unwrap();
    assert_eq!(before.current_interval_days, 7.0);

    complete_initial_study(&env.conn, &[1], at).unwrap();
    mark_reviewable(&env.conn, &[1], at).unwrap();
    assert_eq!(get_progress(&env.conn, 1).unwrap().unwrap(), before);
  }

  #[test]
  fn test_initial_study_rejects_items_without_progress() {
    let env = TestEnv::seeded().unwrap();
    unlock_next_items(&env.conn, 1, now()).unwrap();

    let err = complete_initial_study(&env.conn, &[1, 2], now());
    assert!(matches!(err, Err(SrsError::NotIntroduced(2))));
    assert!(matches!(mark_reviewable(&env.conn, &[999], now()), Err(SrsError::UnknownItem(999))));
    assert_eq!(get_progress(&env.conn, 2).unwrap(), None);
    // The failed batch rolled back
    assert!(!get_progress(&env.conn, 1).unwrap().unwrap().introduced);
  }

  #[test]
  fn test_unlock_follows_frequency_and_score() {
    let env = TestEnv::seeded().unwrap();
    env
      .conn
      .execute("UPDATE characters SET introduction_score = 9.0 WHERE id = 20", [])
      .unwrap();
    let items = unlock_next_items(&env.conn, 3, now()).unwrap();
    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![20, 1, 2]);

    // Already unlocked items are skipped
    let next = unlock_next_item(&env.conn, now()).unwrap().unwrap();
    assert_eq!(next.id, 3);
    assert_eq!(get_ready_to_learn(&env.conn, 10).unwrap().len(), 4);
  }

  #[test]
  fn test_check_and_unlock_batches_and_waits() {
    let env = TestEnv::seeded().unwrap();
    let policy = UnlockPolicy::default();

    let first = check_and_unlock(&env.conn, &policy, now()).unwrap();
    assert_eq!(first.unlocked_count, policy.batch_size as usize);
    assert_eq!(first.ready_to_learn_count, policy.batch_size);

    // Introduce and review everything so only time blocks the next batch
    for item in &first.unlocked {
      introduce_item(&env.conn, item.id, now()).unwrap();
      submit_answer(&env.conn, item.id, true, now()).unwrap();
    }
    let second = check_and_unlock(&env.conn, &policy, now() + Duration::hours(2)).unwrap();
    assert_eq!(second.unlocked_count, 0);
    assert_eq!(second.hours_until_next_unlock, Some(22));

    let third = check_and_unlock(&env.conn, &policy, now() + Duration::hours(24)).unwrap();
    assert_eq!(third.unlocked_count, policy.batch_size as usize);
  }

  #[test]
  fn test_milestone_earns_unlock_once() {
    let env = TestEnv::seeded().unwrap();
    let policy = UnlockPolicy::default();
    check_and_unlock(&env.conn, &policy, now()).unwrap();

    introduce_item(&env.conn, 1, now()).unwrap();
    for _ in 0..4 {
      submit_answer(&env.conn, 1, true, now()).unwrap();
    }
    let snapshot = unlock_snapshot(&env.conn).unwrap();
    assert_eq!(snapshot.unclaimed_milestones, 1);

    let status = check_and_unlock(&env.conn, &policy, now() + Duration::hours(1)).unwrap();
    assert_eq!(status.unlocked_count, 1);
    assert_eq!(unlock_snapshot(&env.conn).unwrap().unclaimed_milestones, 0);
  }
}

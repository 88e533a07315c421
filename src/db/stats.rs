//! Dashboard statistics

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result};
use serde::Serialize;

use super::to_sql_time;
use crate::config::MILESTONE_INTERVAL_DAYS;
use crate::srs::unlock::{self, UnlockPolicy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
  pub total_items: i64,
  pub introduced: i64,
  /// Items whose interval has reached the milestone
  pub mastered: i64,
  pub due_now: i64,
  pub ready_to_learn: i64,
  pub reviews_today: i64,
  pub accuracy_today: Option<f64>,
  pub hours_until_next_unlock: Option<i64>,
}

pub fn get_dashboard_stats(conn: &Connection, policy: &UnlockPolicy, now: DateTime<Utc>) -> Result<DashboardStats> {
  let total_items: i64 = conn.query_row("SELECT COUNT(*) FROM characters", [], |r| r.get(0))?;

  let (introduced, mastered, due_now, ready_to_learn): (i64, i64, i64, i64) = conn.query_row(
    r#"
    SELECT
      COALESCE(SUM(introduced), 0),
      COALESCE(SUM(CASE WHEN introduced = 1 AND current_interval_days >= ?1 THEN 1 ELSE 0 END), 0),
      COALESCE(SUM(CASE WHEN introduced = 1 AND next_review_date <= ?2 THEN 1 ELSE 0 END), 0),
      COALESCE(SUM(CASE WHEN introduced = 0 THEN 1 ELSE 0 END), 0)
    FROM user_progress
    "#,
    params![MILESTONE_INTERVAL_DAYS, to_sql_time(now)],
    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
  )?;

  let day_start = now
    .date_naive()
    .and_hms_opt(0, 0, 0)
    .map(|d| d.and_utc())
    .unwrap_or(now);
  let (reviews_today, correct_today): (i64, i64) = conn.query_row(
    r#"
    SELECT COUNT(*), COALESCE(SUM(is_correct), 0)
    FROM practice_log
    WHERE practiced_at >= ?1 AND practiced_at <= ?2
    "#,
    params![to_sql_time(day_start), to_sql_time(now)],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;

  let snapshot = super::unlock_snapshot(conn)?;
  let decision = unlock::evaluate(policy, &snapshot, now);

  Ok(DashboardStats {
    total_items,
    introduced,
    mastered,
    due_now,
    ready_to_learn,
    reviews_today,
    accuracy_today: (reviews_today > 0).then(|| correct_today as f64 / reviews_today as f64),
    hours_until_next_unlock: decision.hours_until_next_unlock(),
  })
}

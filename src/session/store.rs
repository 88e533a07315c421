//! In-memory storage for active study sessions.
//!
//! Runners are keyed by a random session id handed to the client.
//! Sessions expire after a configurable duration of inactivity.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::runner::SessionRunner;
use crate::config;
use crate::domain::random_token;
use crate::error::SessionError;

/// Session entry with last access time for expiration
struct SessionEntry {
  runner: SessionRunner,
  /// Row in the study_sessions table, if one was opened
  record_id: Option<i64>,
  last_access: DateTime<Utc>,
}

#[derive(Default)]
pub struct SessionStore {
  sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Store a runner and return its new session id
  pub fn insert(&self, runner: SessionRunner, record_id: Option<i64>, now: DateTime<Utc>) -> Result<String, SessionError> {
    let mut sessions = self.lock()?;

    // Clean up expired sessions occasionally (~10% chance)
    if rand::random::<u8>() < config::SESSION_CLEANUP_THRESHOLD {
      cleanup_expired(&mut sessions, now);
    }

    let id = generate_session_id();
    sessions.insert(
      id.clone(),
      SessionEntry {
        runner,
        record_id,
        last_access: now,
      },
    );
    Ok(id)
  }

  /// Run `f` against a live session, refreshing its access time
  pub fn with<R>(
    &self,
    session_id: &str,
    now: DateTime<Utc>,
    f: impl FnOnce(&mut SessionRunner, Option<i64>) -> Result<R, SessionError>,
  ) -> Result<R, SessionError> {
    let mut sessions = self.lock()?;
    let entry = sessions
      .get_mut(session_id)
      .filter(|e| !is_expired(e, now))
      .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
    entry.last_access = now;
    f(&mut entry.runner, entry.record_id)
  }

  pub fn remove(&self, session_id: &str) -> Result<bool, SessionError> {
    Ok(self.lock()?.remove(session_id).is_some())
  }

  pub fn cleanup(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
    let mut sessions = self.lock()?;
    let before = sessions.len();
    cleanup_expired(&mut sessions, now);
    Ok(before - sessions.len())
  }

  pub fn len(&self) -> usize {
    self.sessions.lock().map(|s| s.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, SessionEntry>>, SessionError> {
    self.sessions.lock().map_err(|_| {
      tracing::error!("Session store mutex poisoned");
      SessionError::UnknownSession("session store unavailable".to_string())
    })
  }
}

fn is_expired(entry: &SessionEntry, now: DateTime<Utc>) -> bool {
  entry.last_access <= now - Duration::hours(config::SESSION_EXPIRY_HOURS)
}

/// Clean up expired sessions
fn cleanup_expired(sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>) {
  sessions.retain(|_, entry| !is_expired(entry, now));
}

/// Generate a new session ID
pub fn generate_session_id() -> String {
  random_token(32)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::SessionMode;

  fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
  }

  #[test]
  fn test_session_ids_are_distinct() {
    let a = generate_session_id();
    assert_eq!(a.len(), 32);
    assert!(a.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    assert_ne!(a, generate_session_id());
  }

  #[test]
  fn test_with_refreshes_and_expires() {
    let store = SessionStore::new();
    let id = store.insert(SessionRunner::new(SessionMode::Review), Some(4), now()).unwrap();

    let later = now() + Duration::hours(config::SESSION_EXPIRY_HOURS) - Duration::minutes(1);
    let record = store.with(&id, later, |runner, record| {
      assert_eq!(runner.mode(), SessionMode::Review);
      Ok(record)
    });
    assert_eq!(record.unwrap(), Some(4));

    // Access time was refreshed, so the session outlives the original expiry
    let refreshed = now() + Duration::hours(config::SESSION_EXPIRY_HOURS) + Duration::minutes(1);
    assert!(store.with(&id, refreshed, |_, _| Ok(())).is_ok());

    let expired = refreshed + Duration::hours(config::SESSION_EXPIRY_HOURS);
    assert!(matches!(
      store.with(&id, expired, |_, _| Ok(())),
      Err(SessionError::UnknownSession(_))
    ));
    assert_eq!(store.cleanup(expired).unwrap(), 1);
    assert!(store.is_empty());
  }

  #[test]
  fn test_remove() {
    let store = SessionStore::new();
    let id = store.insert(SessionRunner::new(SessionMode::SelfStudy), None, now()).unwrap();
    assert!(store.remove(&id).unwrap());
    assert!(!store.remove(&id).unwrap());
  }
}

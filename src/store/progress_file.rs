//! Arrow-track progress kept beside its document.
//!
//! With filesystem access and a document path, progress lives in
//! `<name>.progress.json` next to the document so the pair can be shared.
//! Otherwise it falls back to a keyed in-memory store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::PROGRESS_FILE_VERSION;
use crate::domain::StudyProgress;
use crate::error::StoreError;

pub type ProgressMap = BTreeMap<String, StudyProgress>;

/// What the host environment allows the store to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
  pub filesystem: bool,
}

impl Capabilities {
  pub const DESKTOP: Self = Self { filesystem: true };
  pub const KEYED_ONLY: Self = Self { filesystem: false };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
  pub flashcard_set_id: String,
  pub flashcard_set_name: String,
  pub progress: ProgressMap,
  pub last_updated: DateTime<Utc>,
  pub version: String,
}

impl ProgressData {
  fn is_consistent(&self) -> bool {
    !self.version.is_empty()
      && self
        .progress
        .iter()
        .all(|(arrow_id, p)| *arrow_id == p.arrow_id && p.ease_factor.is_finite())
  }
}

/// `deck.json` -> `deck.progress.json` in the same directory
pub fn progress_path(document: &Path) -> PathBuf {
  let stem = document
    .file_name()
    .map(|n| n.to_string_lossy())
    .map(|n| n.strip_suffix(".json").map(str::to_string).unwrap_or_else(|| n.to_string()))
    .unwrap_or_default();
  document.with_file_name(format!("{}.progress.json", stem))
}

pub struct ProgressStore {
  capabilities: Capabilities,
  keyed: Mutex<HashMap<String, String>>,
}

const KEY_PREFIX: &str = "hanzi-notebook-progress-";

impl ProgressStore {
  pub fn new(capabilities: Capabilities) -> Self {
    Self {
      capabilities,
      keyed: Mutex::new(HashMap::new()),
    }
  }

  pub fn capabilities(&self) -> Capabilities {
    self.capabilities
  }

  fn file_for(&self, document: Option<&Path>) -> Option<PathBuf> {
    document.filter(|_| self.capabilities.filesystem).map(progress_path)
  }

  fn key(set_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, set_id)
  }

  /// Load progress for a set. Missing or invalid data yields empty progress.
  pub async fn load(&self, set_id: &str, document: Option<&Path>) -> ProgressMap {
    let raw = match self.file_for(document) {
      Some(path) => match tokio::fs::read_to_string(&path).await {
        Ok(json) => Some(json),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
          tracing::warn!("Could not read progress file {}: {}", path.display(), e);
          None
        }
      },
      None => self.keyed_get(set_id),
    };

    let Some(raw) = raw else {
      return ProgressMap::new();
    };

    match serde_json::from_str::<ProgressData>(&raw) {
      Ok(data) if data.is_consistent() => data.progress,
      result => {
        if let Err(e) = result {
          tracing::warn!("Invalid progress data for set {}, resetting progress: {}", set_id, e);
        } else {
          tracing::warn!("Inconsistent progress data for set {}, resetting progress", set_id);
        }
        if self.file_for(document).is_none() {
          self.keyed_remove(set_id);
        }
        ProgressMap::new()
      }
    }
  }

  pub async fn save(
    &self,
    set_id: &str,
    set_name: &str,
    progress: &ProgressMap,
    document: Option<&Path>,
    now: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    let data = ProgressData {
      flashcard_set_id: set_id.to_string(),
      flashcard_set_name: set_name.to_string(),
      progress: progress.clone(),
      last_updated: now,
      version: PROGRESS_FILE_VERSION.to_string(),
    };
    let json = serde_json::to_string_pretty(&data)?;

    match self.file_for(document) {
      Some(path) => tokio::fs::write(&path, json).await?,
      None => self.keyed_insert(set_id, json)?,
    }
    tracing::debug!(set_id, arrows = progress.len(), "saved progress");
    Ok(())
  }

  /// Reset progress: an empty file beside the document, or drop the key.
  pub async fn clear(&self, set_id: &str, document: Option<&Path>, now: DateTime<Utc>) -> Result<(), StoreError> {
    if self.file_for(document).is_some() {
      return self.save(set_id, "", &ProgressMap::new(), document, now).await;
    }
    self.keyed_remove(set_id);
    Ok(())
  }

  fn keyed_get(&self, set_id: &str) -> Option<String> {
    self.keyed.lock().ok()?.get(&Self::key(set_id)).cloned()
  }

  fn keyed_insert(&self, set_id: &str, json: String) -> Result<(), StoreError> {
    let mut keyed = self
      .keyed
      .lock()
      .map_err(|_| StoreError::NoLocation(set_id.to_string()))?;
    keyed.insert(Self::key(set_id), json);
    Ok(())
  }

  fn keyed_remove(&self, set_id: &str) {
    if let Ok(mut keyed) = self.keyed.lock() {
      keyed.remove(&Self::key(set_id));
    }
  }
}

//! Flashcard set documents on disk.

use std::path::Path;

use crate::domain::FlashcardSet;
use crate::error::StoreError;

/// Parse and validate a document. Nothing is returned unless the whole
/// document is well formed.
pub fn parse_document(json: &str) -> Result<FlashcardSet, StoreError> {
  let set: FlashcardSet = serde_json::from_str(json)?;
  set.validate()?;
  Ok(set)
}

pub async fn load_document(path: &Path) -> Result<FlashcardSet, StoreError> {
  let json = tokio::fs::read_to_string(path).await?;
  let set = parse_document(&json)?;
  tracing::info!(path = %path.display(), flashcards = set.flashcards.len(), "loaded document");
  Ok(set)
}

pub async fn save_document(set: &FlashcardSet, path: &Path) -> Result<(), StoreError> {
  set.validate()?;
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent).await?;
  }
  let json = serde_json::to_string_pretty(set)?;
  tokio::fs::write(path, json).await?;
  tracing::info!(path = %path.display(), "saved document");
  Ok(())
}

//! Bounded undo/redo history of immutable snapshots.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::HISTORY_CAPACITY;

#[derive(Debug, Clone)]
pub struct History<T> {
  snapshots: VecDeque<Arc<T>>,
  /// Index of the current snapshot; `None` when empty
  cursor: Option<usize>,
  capacity: usize,
}

impl<T> Default for History<T> {
  fn default() -> Self {
    Self::with_capacity(HISTORY_CAPACITY)
  }
}

impl<T> History<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      snapshots: VecDeque::new(),
      cursor: None,
      capacity: capacity.max(1),
    }
  }

  /// Record a new state, discarding anything that could have been redone.
  pub fn push(&mut self, state: T) {
    let keep = self.cursor.map_or(0, |c| c + 1);
    self.snapshots.truncate(keep);
    self.snapshots.push_back(Arc::new(state));
    if self.snapshots.len() > self.capacity {
      self.snapshots.pop_front();
    }
    self.cursor = Some(self.snapshots.len() - 1);
  }

  pub fn undo(&mut self) -> Option<Arc<T>> {
    if !self.can_undo() {
      return None;
    }
    let cursor = self.cursor? - 1;
    self.cursor = Some(cursor);
    self.snapshots.get(cursor).cloned()
  }

  pub fn redo(&mut self) -> Option<Arc<T>> {
    if !self.can_redo() {
      return None;
    }
    let cursor = self.cursor.map_or(0, |c| c + 1);
    self.cursor = Some(cursor);
    self.snapshots.get(cursor).cloned()
  }

  pub fn can_undo(&self) -> bool {
    self.cursor.is_some_and(|c| c > 0)
  }

  pub fn can_redo(&self) -> bool {
    self.cursor.map_or(0, |c| c + 1) < self.snapshots.len()
  }

  pub fn current(&self) -> Option<Arc<T>> {
    self.snapshots.get(self.cursor?).cloned()
  }

  pub fn clear(&mut self) {
    self.snapshots.clear();
    self.cursor = None;
  }

  pub fn len(&self) -> usize {
    self.snapshots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.snapshots.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_undo_redo() {
    let mut history = History::new();
    assert!(!history.can_undo());
    assert_eq!(history.current(), None);

    history.push(1);
    history.push(2);
    history.push(3);
    assert_eq!(history.undo().as_deref(), Some(&2));
    assert_eq!(history.undo().as_deref(), Some(&1));
    assert_eq!(history.undo(), None);
    assert_eq!(history.redo().as_deref(), Some(&2));
    assert!(history.can_redo());
  }

  #[test]
  fn test_push_discards_redo_branch() {
    let mut history = History::new();
    history.push("a");
    history.push("b");
    history.undo();
    history.push("c");
    assert!(!history.can_redo());
    assert_eq!(history.len(), 2);
    assert_eq!(history.undo().as_deref(), Some(&"a"));
  }

  #[test]
  fn test_capacity_drops_oldest() {
    let mut history = History::new();
    for i in 0..60 {
      history.push(i);
    }
    assert_eq!(history.len(), HISTORY_CAPACITY);
    assert_eq!(history.current().as_deref(), Some(&59));
    while history.can_undo() {
      history.undo();
    }
    assert_eq!(history.current().as_deref(), Some(&10));
  }

  #[test]
  fn test_clear() {
    let mut history = History::with_capacity(3);
    history.push(1);
    history.clear();
    assert!(history.is_empty());
    assert!(!history.can_redo());
    assert_eq!(history.undo(), None);
  }
}

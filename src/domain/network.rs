//! Flashcard networks: sides connected by labeled arrows.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config;
use crate::error::ValidationError;
use crate::geometry::{self, Point, Rect};

/// Random lowercase alphanumeric token of `len` characters.
pub fn random_token(len: usize) -> String {
  rand::rng()
    .sample_iter(Alphanumeric)
    .take(len)
    .map(|b| char::from(b).to_ascii_lowercase())
    .collect()
}

/// Generate a short random identifier for sides, arrows and documents.
pub fn generate_id() -> String {
  random_token(9)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowStyle {
  #[default]
  Solid,
  Dashed,
  Dotted,
}

/// A node in the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Side {
  pub id: String,
  pub value: String,
  pub position: Point,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub font_size: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub width: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub height: Option<f64>,
}

impl Side {
  pub fn new(value: impl Into<String>, position: Point) -> Self {
    Self {
      id: generate_id(),
      value: value.into(),
      position,
      color: None,
      font_size: None,
      width: None,
      height: None,
    }
  }

  /// Bounding box, falling back to the default side size.
  pub fn bounds(&self) -> Rect {
    Rect::new(
      self.position.x,
      self.position.y,
      self.width.unwrap_or(config::DEFAULT_SIDE_WIDTH),
      self.height.unwrap_or(config::DEFAULT_SIDE_HEIGHT),
    )
  }
}

/// A directed, labeled edge between two sides of the same flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrow {
  pub id: String,
  pub source_id: String,
  pub destination_id: String,
  #[serde(default)]
  pub label: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub style: Option<ArrowStyle>,
}

impl Arrow {
  pub fn new(source_id: &str, destination_id: &str, label: impl Into<String>) -> Self {
    Self {
      id: generate_id(),
      source_id: source_id.to_string(),
      destination_id: destination_id.to_string(),
      label: label.into(),
      color: None,
      style: None,
    }
  }

  pub fn touches(&self, side_id: &str) -> bool {
    self.source_id == side_id || self.destination_id == side_id
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
  pub id: String,
  pub name: String,
  pub sides: Vec<Side>,
  pub arrows: Vec<Arrow>,
  pub created_at: DateTime<Utc>,
  pub modified_at: DateTime<Utc>,
}

impl Flashcard {
  pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      id: generate_id(),
      name: name.into(),
      sides: Vec::new(),
      arrows: Vec::new(),
      created_at: now,
      modified_at: now,
    }
  }

  pub fn side(&self, id: &str) -> Option<&Side> {
    self.sides.iter().find(|s| s.id == id)
  }

  pub fn arrow(&self, id: &str) -> Option<&Arrow> {
    self.arrows.iter().find(|a| a.id == id)
  }

  /// Add a side and return its id.
  pub fn add_side(&mut self, side: Side, now: DateTime<Utc>) -> String {
    let id = side.id.clone();
    self.sides.push(side);
    self.modified_at = now;
    id
  }

  pub fn move_side(&mut self, id: &str, position: Point, now: DateTime<Utc>) -> bool {
    match self.sides.iter_mut().find(|s| s.id == id) {
      Some(side) => {
        side.position = position;
        self.modified_at = now;
        true
      }
      None => false,
    }
  }

  /// Remove a side and every arrow touching it.
  pub fn remove_side(&mut self, id: &str, now: DateTime<Utc>) -> bool {
    let before = self.sides.len();
    self.sides.retain(|s| s.id != id);
    if self.sides.len() == before {
      return false;
    }
    self.arrows.retain(|a| !a.touches(id));
    self.modified_at = now;
    true
  }

  /// Connect two existing sides. Duplicate arrows between the same pair are allowed.
  pub fn add_arrow(&mut self, arrow: Arrow, now: DateTime<Utc>) -> Result<String, ValidationError> {
    for side_id in [&arrow.source_id, &arrow.destination_id] {
      if self.side(side_id).is_none() {
        return Err(ValidationError::DanglingArrow {
          arrow: arrow.id.clone(),
          side: side_id.clone(),
        });
      }
    }
    let id = arrow.id.clone();
    self.arrows.push(arrow);
    self.modified_at = now;
    Ok(id)
  }

  pub fn remove_arrow(&mut self, id: &str, now: DateTime<Utc>) -> bool {
    let before = self.arrows.len();
    self.arrows.retain(|a| a.id != id);
    let removed = self.arrows.len() != before;
    if removed {
      self.modified_at = now;
    }
    removed
  }

  pub fn outgoing<'a>(&'a self, side_id: &'a str) -> impl Iterator<Item = &'a Arrow> + 'a {
    self.arrows.iter().filter(move |a| a.source_id == side_id)
  }

  /// Topmost side under `point` (later sides draw above earlier ones).
  pub fn side_at(&self, point: Point) -> Option<&Side> {
    self.sides.iter().rev().find(|s| s.bounds().contains(point))
  }

  /// Side with the most arrows touching it.
  pub fn most_connected_side(&self) -> Option<&Side> {
    self
      .sides
      .iter()
      .map(|s| (s, self.arrows.iter().filter(|a| a.touches(&s.id)).count()))
      .fold(None, |best: Option<(&Side, usize)>, (side, count)| match best {
        Some((_, best_count)) if best_count >= count => best,
        _ => Some((side, count)),
      })
      .map(|(side, _)| side)
  }

  /// Whether `point` lies on a straight line drawn between an arrow's side centers.
  pub fn arrow_near(&self, point: Point, tolerance: f64) -> Option<&Arrow> {
    self.arrows.iter().find(|a| {
      match (self.side(&a.source_id), self.side(&a.destination_id)) {
        (Some(src), Some(dst)) => {
          geometry::distance_to_segment(point, src.bounds().center(), dst.bounds().center())
            <= tolerance
        }
        _ => false,
      }
    })
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    let mut ids = HashSet::new();
    for side in &self.sides {
      if !ids.insert(side.id.as_str()) {
        return Err(ValidationError::DuplicateSide(side.id.clone()));
      }
      if !side.position.x.is_finite() || !side.position.y.is_finite() {
        return Err(ValidationError::Malformed(format!(
          "side '{}' has a non-finite position",
          side.id
        )));
      }
    }
    for arrow in &self.arrows {
      for side_id in [&arrow.source_id, &arrow.destination_id] {
        if !ids.contains(side_id.as_str()) {
          return Err(ValidationError::DanglingArrow {
            arrow: arrow.id.clone(),
            side: side_id.clone(),
          });
        }
      }
    }
    Ok(())
  }
}

/// A document: an ordered collection of flashcards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSet {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub version: String,
  pub created_at: DateTime<Utc>,
  pub modified_at: DateTime<Utc>,
  pub flashcards: Vec<Flashcard>,
}

impl FlashcardSet {
  pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      id: generate_id(),
      name: name.into(),
      description: None,
      version: config::DOCUMENT_VERSION.to_string(),
      created_at: now,
      modified_at: now,
      flashcards: Vec::new(),
    }
  }

  pub fn flashcard(&self, id: &str) -> Option<&Flashcard> {
    self.flashcards.iter().find(|f| f.id == id)
  }

  pub fn flashcard_mut(&mut self, id: &str) -> Option<&mut Flashcard> {
    self.flashcards.iter_mut().find(|f| f.id == id)
  }

  /// Every arrow id across all flashcards.
  pub fn arrow_ids(&self) -> impl Iterator<Item = &str> {
    self.flashcards.iter().flat_map(|f| f.arrows.iter().map(|a| a.id.as_str()))
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.id.trim().is_empty() {
      return Err(ValidationError::Empty("document id"));
    }
    self.flashcards.iter().try_for_each(Flashcard::validate)
  }
}

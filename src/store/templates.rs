//! Flashcard templates: the layout of a flashcard without its content.
//!
//! A template keeps side geometry and styling, and addresses arrow endpoints
//! by side index so it can be stamped out with fresh ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::domain::{generate_id, Arrow, ArrowStyle, Flashcard, Side};
use crate::error::{StoreError, ValidationError};
use crate::geometry::Point;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSide {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateArrow {
  pub source_index: usize,
  pub destination_index: usize,
  #[serde(default)]
  pub label: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub style: Option<ArrowStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardTemplate {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub sides: Vec<TemplateSide>,
  pub arrows: Vec<TemplateArrow>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePreview {
  pub name: String,
  pub description: Option<String>,
  pub side_count: usize,
  pub arrow_count: usize,
}

impl FlashcardTemplate {
  /// Capture the structure of `card`: positions, styling and connections.
  pub fn from_flashcard(card: &Flashcard, name: impl Into<String>, description: Option<String>, now: DateTime<Utc>) -> Self {
    let index: HashMap<&str, usize> = card
      .sides
      .iter()
      .enumerate()
      .map(|(i, s)| (s.id.as_str(), i))
      .collect();

    let arrows = card
      .arrows
      .iter()
      .filter_map(|arrow| {
        Some(TemplateArrow {
          source_index: *index.get(arrow.source_id.as_str())?,
          destination_index: *index.get(arrow.destination_id.as_str())?,
          label: arrow.label.clone(),
          color: arrow.color.clone(),
          style: arrow.style,
        })
      })
      .collect();

    Self {
      id: format!("template-{}", generate_id()),
      name: name.into(),
      description,
      sides: card
        .sides
        .iter()
        .map(|s| TemplateSide {
          position: s.position,
          color: s.color.clone(),
          font_size: s.font_size,
          width: s.width,
          height: s.height,
        })
        .collect(),
      arrows,
      created_at: now,
    }
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.id.trim().is_empty() {
      return Err(ValidationError::Empty("template id"));
    }
    if self.name.trim().is_empty() {
      return Err(ValidationError::Empty("template name"));
    }
    if self.sides.is_empty() {
      return Err(ValidationError::Empty("template sides"));
    }
    for (i, arrow) in self.arrows.iter().enumerate() {
      for index in [arrow.source_index, arrow.destination_index] {
        if index >= self.sides.len() {
          return Err(ValidationError::TemplateIndex {
            arrow: i,
            index,
            sides: self.sides.len(),
          });
        }
      }
    }
    Ok(())
  }

  /// Stamp out a new flashcard with fresh ids and empty side values.
  pub fn apply(&self, name: impl Into<String>, now: DateTime<Utc>) -> Result<Flashcard, ValidationError> {
    self.validate()?;
    let sides: Vec<Side> = self
      .sides
      .iter()
      .map(|t| Side {
        color: t.color.clone(),
        font_size: t.font_size,
        width: t.width,
        height: t.height,
        ..Side::new("", t.position)
      })
      .collect();

    let arrows = self
      .arrows
      .iter()
      .map(|t| Arrow {
        color: t.color.clone(),
        style: t.style,
        ..Arrow::new(&sides[t.source_index].id, &sides[t.destination_index].id, t.label.clone())
      })
      .collect();

    Ok(Flashcard {
      sides,
      arrows,
      ..Flashcard::new(name, now)
    })
  }

  pub fn preview(&self) -> TemplatePreview {
    TemplatePreview {
      name: self.name.clone(),
      description: self.description.clone(),
      side_count: self.sides.len(),
      arrow_count: self.arrows.len(),
    }
  }
}

/// Copy a flashcard's structure under fresh ids, clearing side values and
/// arrow labels.
pub fn duplicate_as_skeleton(card: &Flashcard, name: impl Into<String>, now: DateTime<Utc>) -> Flashcard {
  let ids: HashMap<&str, String> = card.sides.iter().map(|s| (s.id.as_str(), generate_id())).collect();
  let fresh = |old: &str| ids.get(old).cloned().unwrap_or_else(generate_id);

  Flashcard {
    sides: card
      .sides
      .iter()
      .map(|s| Side {
        id: fresh(&s.id),
        value: String::new(),
        ..s.clone()
      })
      .collect(),
    arrows: card
      .arrows
      .iter()
      .map(|a| Arrow {
        id: generate_id(),
        source_id: fresh(&a.source_id),
        destination_id: fresh(&a.destination_id),
        label: String::new(),
        ..a.clone()
      })
      .collect(),
    ..Flashcard::new(name, now)
  }
}

pub fn parse_template(json: &str) -> Result<FlashcardTemplate, StoreError> {
  let template: FlashcardTemplate = serde_json::from_str(json)?;
  template.validate()?;
  Ok(template)
}

pub async fn load_template(path: &Path) -> Result<FlashcardTemplate, StoreError> {
  let json = tokio::fs::read_to_string(path).await?;
  parse_template(&json)
}

pub async fn save_template(template: &FlashcardTemplate, path: &Path) -> Result<(), StoreError> {
  template.validate()?;
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent).await?;
  }
  tokio::fs::write(path, serde_json::to_string_pretty(template)?).await?;
  tracing::info!(path = %path.display(), name = %template.name, "saved template");
  Ok(())
}

//! Arrow routing and label placement for flashcard networks.

pub mod label;
pub mod router;

use serde::Serialize;

use crate::domain::Flashcard;
use crate::geometry::Point;

pub use label::{LabelPlacement, LabelPlacer};
pub use router::{determine_edge, Edge, EdgeRouter};

/// A drawable arrow: its path and, when labeled, where the label goes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedArrow {
  pub arrow_id: String,
  pub path: Vec<Point>,
  pub label: Option<LabelPlacement>,
}

/// Route every arrow of a flashcard. Arrows with missing endpoints get an empty path.
pub fn layout(card: &Flashcard) -> Vec<RoutedArrow> {
  let router = EdgeRouter::new(card);
  let placer = LabelPlacer::new(&router);

  card
    .arrows
    .iter()
    .enumerate()
    .map(|(i, arrow)| {
      let path = router.route(i);
      let label = (!arrow.label.is_empty() && !path.is_empty()).then(|| placer.place(i, &path));
      RoutedArrow {
        arrow_id: arrow.id.clone(),
        path,
        label,
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Arrow, Side};
  use chrono::Utc;

  #[test]
  fn test_layout_skips_labels_for_unlabeled_and_broken_arrows() {
    let now = Utc::now();
    let mut card = Flashcard::new("学", now);
    let a = card.add_side(Side::new("学", Point::new(0.0, 0.0)), now);
    let b = card.add_side(Side::new("xué", Point::new(400.0, 0.0)), now);
    card.add_arrow(Arrow::new(&a, &b, "pinyin"), now).unwrap();
    card.add_arrow(Arrow::new(&b, &a, ""), now).unwrap();
    card.arrows.push(Arrow::new(&a, "gone", "dangling"));

    let routed = layout(&card);
    assert_eq!(routed.len(), 3);
    assert!(routed[0].label.is_some());
    assert!(routed[1].label.is_none());
    assert!(routed[2].path.is_empty());
    assert!(routed[2].label.is_none());
  }
}

//! Orthogonal arrow routing between rectangular sides.
//!
//! Every drawable arrow becomes a four-point path: the source connection
//! point, one leg straight out of the source edge, a corner aligned with the
//! destination, and the destination connection point. Arrows sharing a side
//! edge are spread across it so they do not overlap.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config;
use crate::domain::{Arrow, Flashcard, Side};
use crate::geometry::{self, Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
  Top,
  Right,
  Bottom,
  Left,
}

impl Edge {
  /// Top and bottom edges run along the x axis.
  pub fn runs_horizontally(self) -> bool {
    matches!(self, Self::Top | Self::Bottom)
  }

  fn outward(self) -> (f64, f64) {
    match self {
      Self::Top => (0.0, -1.0),
      Self::Right => (1.0, 0.0),
      Self::Bottom => (0.0, 1.0),
      Self::Left => (-1.0, 0.0),
    }
  }
}

/// The edge of `from` crossed by the vector from its center to the center of `to`.
///
/// Swapping the arguments gives the entry edge on `to`. Coincident centers
/// resolve to [`Edge::Right`].
pub fn determine_edge(from: &Rect, to: &Rect) -> Edge {
  let origin = from.center();
  let target = to.center();
  let dx = target.x - origin.x;
  let dy = target.y - origin.y;
  let half_w = from.width / 2.0;
  let half_h = from.height / 2.0;

  let mut best = (Edge::Right, f64::INFINITY);
  let mut consider = |edge: Edge, t: f64, on_edge: bool| {
    if on_edge {
      let distance = (t * dx).hypot(t * dy);
      if distance < best.1 {
        best = (edge, distance);
      }
    }
  };

  if dx > 0.0 {
    let t = half_w / dx;
    let y = origin.y + t * dy;
    consider(Edge::Right, t, y >= from.y && y <= from.bottom());
  }
  if dx < 0.0 {
    let t = -half_w / dx;
    let y = origin.y + t * dy;
    consider(Edge::Left, t, y >= from.y && y <= from.bottom());
  }
  if dy > 0.0 {
    let t = half_h / dy;
    let x = origin.x + t * dx;
    consider(Edge::Bottom, t, x >= from.x && x <= from.right());
  }
  if dy < 0.0 {
    let t = -half_h / dy;
    let x = origin.x + t * dx;
    consider(Edge::Top, t, x >= from.x && x <= from.right());
  }

  best.0
}

/// An arrow end attached to a particular side edge.
struct SlotEntry<'a> {
  arrow_index: usize,
  other_id: &'a str,
  other_center: Point,
  is_source: bool,
}

/// Routes the arrows of one flashcard.
///
/// Arrows are addressed by their index in the arrow slice so that duplicate
/// ids still route as distinct arrows.
pub struct EdgeRouter<'a> {
  sides: &'a [Side],
  arrows: &'a [Arrow],
}

impl<'a> EdgeRouter<'a> {
  pub fn new(card: &'a Flashcard) -> Self {
    Self::from_parts(&card.sides, &card.arrows)
  }

  pub fn from_parts(sides: &'a [Side], arrows: &'a [Arrow]) -> Self {
    Self { sides, arrows }
  }

  pub fn sides(&self) -> &'a [Side] {
    self.sides
  }

  pub fn arrows(&self) -> &'a [Arrow] {
    self.arrows
  }

  fn side(&self, id: &str) -> Option<&'a Side> {
    self.sides.iter().find(|s| s.id == id)
  }

  fn endpoints(&self, arrow: &Arrow) -> Option<(&'a Side, &'a Side)> {
    Some((self.side(&arrow.source_id)?, self.side(&arrow.destination_id)?))
  }

  /// Index of the first arrow with `id`.
  pub fn index_of(&self, id: &str) -> Option<usize> {
    self.arrows.iter().position(|a| a.id == id)
  }

  /// Source exit edge and destination entry edge, if both sides exist.
  pub fn arrow_edges(&self, arrow_index: usize) -> Option<(Edge, Edge)> {
    let arrow = self.arrows.get(arrow_index)?;
    let (src, dst) = self.endpoints(arrow)?;
    let (src_rect, dst_rect) = (src.bounds(), dst.bounds());
    Some((determine_edge(&src_rect, &dst_rect), determine_edge(&dst_rect, &src_rect)))
  }

  /// All arrow ends on `edge` of `side`, in slot order.
  fn edge_slots(&self, side: &Side, edge: Edge) -> Vec<SlotEntry<'a>> {
    let mut slots = Vec::new();
    for (index, arrow) in self.arrows.iter().enumerate() {
      let Some((src, dst)) = self.endpoints(arrow) else {
        continue;
      };
      if arrow.source_id == side.id {
        if determine_edge(&src.bounds(), &dst.bounds()) == edge {
          slots.push(SlotEntry {
            arrow_index: index,
            other_id: &dst.id,
            other_center: dst.bounds().center(),
            is_source: true,
          });
        }
      } else if arrow.destination_id == side.id
        && determine_edge(&dst.bounds(), &src.bounds()) == edge
      {
        slots.push(SlotEntry {
          arrow_index: index,
          other_id: &src.id,
          other_center: src.bounds().center(),
          is_source: false,
        });
      }
    }

    // The tie band makes the comparator intransitive, so use a plain stable
    // insertion sort rather than slice::sort_by.
    let horizontal = edge.runs_horizontally();
    for i in 1..slots.len() {
      let mut j = i;
      while j > 0 && slot_order(&slots[j - 1], &slots[j], horizontal) == Ordering::Greater {
        slots.swap(j - 1, j);
        j -= 1;
      }
    }
    slots
  }

  /// Ordinal of the arrow among the ends on this edge, and the number of ends.
  pub fn slot(&self, arrow_index: usize, side: &Side, edge: Edge) -> (Option<usize>, usize) {
    let slots = self.edge_slots(side, edge);
    let ordinal = slots.iter().position(|s| s.arrow_index == arrow_index);
    (ordinal, slots.len())
  }

  /// Where the arrow attaches to `edge` of `side`.
  pub fn connection_point(&self, arrow_index: usize, side: &Side, edge: Edge) -> Point {
    let (ordinal, total) = self.slot(arrow_index, side, edge);
    let fraction = match ordinal {
      Some(i) if total > 1 => {
        config::SLOT_EDGE_MARGIN + (i as f64 / (total - 1) as f64) * config::SLOT_EDGE_SPAN
      }
      _ => 0.5,
    };
    edge_point(&side.bounds(), edge, fraction)
  }

  fn endpoints_for_path(&self, arrow_index: usize) -> Option<(Point, Point, Edge)> {
    let arrow = self.arrows.get(arrow_index)?;
    let (src, dst) = self.endpoints(arrow)?;
    let (src_edge, dst_edge) = self.arrow_edges(arrow_index)?;
    let start = self.connection_point(arrow_index, src, src_edge);
    let end = self.connection_point(arrow_index, dst, dst_edge);
    Some((start, end, src_edge))
  }

  /// Path without collision avoidance. Empty when an endpoint is missing.
  pub fn route_direct(&self, arrow_index: usize) -> Vec<Point> {
    match self.endpoints_for_path(arrow_index) {
      Some((start, end, edge)) => orthogonal_path(start, end, edge, 1.0),
      None => Vec::new(),
    }
  }

  /// Path whose middle segment avoids other sides and other arrows when possible.
  pub fn route(&self, arrow_index: usize) -> Vec<Point> {
    let Some((start, end, edge)) = self.endpoints_for_path(arrow_index) else {
      return Vec::new();
    };
    let direct = orthogonal_path(start, end, edge, 1.0);
    if !self.middle_collides(arrow_index, direct[1], direct[2]) {
      return direct;
    }

    for sign in [1.0, -1.0] {
      for multiplier in config::ROUTE_RETRY_MULTIPLIERS {
        let candidate = orthogonal_path(start, end, edge, sign * multiplier);
        if !self.middle_collides(arrow_index, candidate[1], candidate[2]) {
          return candidate;
        }
      }
    }

    tracing::debug!(
      arrow = %self.arrows[arrow_index].id,
      "no collision-free route, keeping direct path"
    );
    direct
  }

  /// Route by arrow id (first match).
  pub fn route_arrow(&self, arrow_id: &str) -> Vec<Point> {
    self.index_of(arrow_id).map(|i| self.route(i)).unwrap_or_default()
  }

  fn middle_collides(&self, arrow_index: usize, a: Point, b: Point) -> bool {
    let arrow = &self.arrows[arrow_index];
    let hits_side = self
      .sides
      .iter()
      .filter(|s| !arrow.touches(&s.id))
      .any(|s| geometry::segment_intersects_rect(a, b, &s.bounds()));
    if hits_side {
      return true;
    }

    (0..self.arrows.len())
      .filter(|&j| j != arrow_index)
      .any(|j| {
        self
          .route_direct(j)
          .windows(2)
          .any(|w| geometry::segments_intersect(a, b, w[0], w[1]))
      })
  }

  /// First arrow whose routed path passes within `tolerance` of `point`.
  pub fn arrow_at(&self, point: Point, tolerance: f64) -> Option<&'a Arrow> {
    (0..self.arrows.len())
      .find(|&i| geometry::is_point_near_path(point, &self.route(i), tolerance))
      .map(|i| &self.arrows[i])
  }
}

fn slot_order(a: &SlotEntry<'_>, b: &SlotEntry<'_>, horizontal: bool) -> Ordering {
  let (a_primary, b_primary, a_secondary, b_secondary) = if horizontal {
    (a.other_center.x, b.other_center.x, a.other_center.y, b.other_center.y)
  } else {
    (a.other_center.y, b.other_center.y, a.other_center.x, b.other_center.x)
  };

  // Descending by the other side's coordinate
  let diff = b_primary - a_primary;
  if diff.abs() > config::SLOT_TIE_TOLERANCE {
    return if diff > 0.0 { Ordering::Greater } else { Ordering::Less };
  }

  if a.other_id == b.other_id && a.is_source != b.is_source {
    return if a.is_source { Ordering::Greater } else { Ordering::Less };
  }

  a_secondary
    .abs()
    .partial_cmp(&b_secondary.abs())
    .unwrap_or(Ordering::Equal)
}

/// Point at `fraction` along an edge. Bottom and right edges run in reverse.
fn edge_point(rect: &Rect, edge: Edge, fraction: f64) -> Point {
  match edge {
    Edge::Top => Point::new(rect.x + rect.width * fraction, rect.y),
    Edge::Bottom => Point::new(rect.x + rect.width * (1.0 - fraction), rect.bottom()),
    Edge::Left => Point::new(rect.x, rect.y + rect.height * fraction),
    Edge::Right => Point::new(rect.right(), rect.y + rect.height * (1.0 - fraction)),
  }
}

/// Four-point path leaving `start` perpendicular to `edge`.
///
/// A negative multiplier sends the first leg back across the edge.
fn orthogonal_path(start: Point, end: Point, edge: Edge, multiplier: f64) -> Vec<Point> {
  let travel =
    (start.distance(&end) * config::ROUTE_TRAVEL_FRACTION).max(config::ROUTE_MIN_TRAVEL) * multiplier;
  let (ox, oy) = edge.outward();

  if edge.runs_horizontally() {
    let first = Point::new(start.x, start.y + oy * travel);
    vec![start, first, Point::new(end.x, first.y), end]
  } else {
    let first = Point::new(start.x + ox * travel, start.y);
    vec![start, first, Point::new(first.x, end.y), end]
  }
}

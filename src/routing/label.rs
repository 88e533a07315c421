//! Arrow label placement along a routed path.

use serde::{Deserialize, Serialize};

use crate::config;
use crate::geometry::{self, Point, Rect};

use super::router::EdgeRouter;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelPlacement {
  /// Center of the label box
  pub position: Point,
  /// Fraction of the path's arc length
  pub percent: f64,
  /// Weighted collision score (0 when clear)
  pub score: u32,
}

pub struct LabelPlacer<'r, 'a> {
  router: &'r EdgeRouter<'a>,
  width: f64,
  height: f64,
}

impl<'r, 'a> LabelPlacer<'r, 'a> {
  pub fn new(router: &'r EdgeRouter<'a>) -> Self {
    Self::with_size(router, config::DEFAULT_LABEL_WIDTH, config::DEFAULT_LABEL_HEIGHT)
  }

  pub fn with_size(router: &'r EdgeRouter<'a>, width: f64, height: f64) -> Self {
    Self { router, width, height }
  }

  /// Pick the label position for an arrow whose routed path is `path`.
  ///
  /// The first collision-free candidate wins; otherwise the lowest-scoring
  /// position in the allowed window, preferring the center on ties.
  pub fn place(&self, arrow_index: usize, path: &[Point]) -> LabelPlacement {
    if path.len() < 2 {
      return LabelPlacement {
        position: path.first().copied().unwrap_or_default(),
        percent: 0.0,
        score: 0,
      };
    }

    let other_paths: Vec<Vec<Point>> = (0..self.router.arrows().len())
      .filter(|&j| j != arrow_index)
      .map(|j| self.router.route_direct(j))
      .collect();

    let evaluate = |percent: u8| {
      let fraction = f64::from(percent) / 100.0;
      let position = geometry::point_at_percent(path, fraction);
      let score = self.score(arrow_index, position, &other_paths);
      LabelPlacement { position, percent: fraction, score }
    };

    for percent in config::LABEL_CANDIDATE_PERCENTS {
      let candidate = evaluate(percent);
      if candidate.score == 0 {
        return candidate;
      }
    }

    let mut best = evaluate(config::LABEL_CANDIDATE_PERCENTS[0]);
    for percent in
      (config::LABEL_MIN_PERCENT..=config::LABEL_MAX_PERCENT).step_by(config::LABEL_PERCENT_STEP)
    {
      let candidate = evaluate(percent);
      if candidate.score < best.score {
        best = candidate;
      }
    }
    best
  }

  fn label_rect(&self, center: Point) -> Rect {
    Rect::centered_at(center, self.width, self.height)
  }

  fn score(&self, arrow_index: usize, center: Point, other_paths: &[Vec<Point>]) -> u32 {
    let rect = self.label_rect(center);
    let arrow = &self.router.arrows()[arrow_index];

    let side_hits = self
      .router
      .sides()
      .iter()
      .filter(|s| !arrow.touches(&s.id))
      .filter(|s| rect.overlaps(&s.bounds()))
      .count() as u32;

    let segment_hits = other_paths
      .iter()
      .flat_map(|p| p.windows(2))
      .filter(|w| geometry::segment_intersects_rect(w[0], w[1], &rect))
      .count() as u32;

    side_hits * config::LABEL_SIDE_PENALTY + segment_hits * config::LABEL_ARROW_PENALTY
  }
}

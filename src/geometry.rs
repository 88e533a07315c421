//! Planar geometry primitives shared by arrow routing and label placement.
//!
//! Coordinates follow the canvas convention: x grows to the right, y grows
//! downwards. All functions are pure and never panic on degenerate input.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub const fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  pub fn distance(&self, other: &Point) -> f64 {
    (other.x - self.x).hypot(other.y - self.y)
  }

  /// Snap to the nearest multiple of `grid` on both axes.
  pub fn snap_to_grid(&self, grid: f64) -> Point {
    if grid <= 0.0 {
      return *self;
    }
    Point::new((self.x / grid).round() * grid, (self.y / grid).round() * grid)
  }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}

impl Rect {
  pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
    Self { x, y, width, height }
  }

  /// Rectangle of the given size centered on `center`.
  pub fn centered_at(center: Point, width: f64, height: f64) -> Self {
    Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
  }

  pub fn right(&self) -> f64 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f64 {
    self.y + self.height
  }

  pub fn center(&self) -> Point {
    Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
  }

  pub fn contains(&self, p: Point) -> bool {
    p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
  }

  /// Touching edges count as overlap.
  pub fn overlaps(&self, other: &Rect) -> bool {
    !(self.right() < other.x
      || other.right() < self.x
      || self.bottom() < other.y
      || other.bottom() < self.y)
  }

  /// Top, right, bottom, left edges as segments.
  pub fn edges(&self) -> [(Point, Point); 4] {
    let tl = Point::new(self.x, self.y);
    let tr = Point::new(self.right(), self.y);
    let br = Point::new(self.right(), self.bottom());
    let bl = Point::new(self.x, self.bottom());
    [(tl, tr), (tr, br), (br, bl), (bl, tl)]
  }
}

/// Whether segment `p1-p2` crosses segment `p3-p4`.
///
/// Parallel (including collinear) segments never intersect.
pub fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
  let denom = (p4.y - p3.y) * (p2.x - p1.x) - (p4.x - p3.x) * (p2.y - p1.y);
  if denom == 0.0 {
    return false;
  }

  let ua = ((p4.x - p3.x) * (p1.y - p3.y) - (p4.y - p3.y) * (p1.x - p3.x)) / denom;
  let ub = ((p2.x - p1.x) * (p1.y - p3.y) - (p2.y - p1.y) * (p1.x - p3.x)) / denom;

  (0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub)
}

/// Whether a segment crosses any edge of `rect` or lies inside it.
pub fn segment_intersects_rect(a: Point, b: Point, rect: &Rect) -> bool {
  if rect.contains(a) || rect.contains(b) {
    return true;
  }
  rect
    .edges()
    .iter()
    .any(|(e1, e2)| segments_intersect(a, b, *e1, *e2))
}

/// Shortest distance from `p` to the segment `a-b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
  let dx = b.x - a.x;
  let dy = b.y - a.y;
  let len_sq = dx * dx + dy * dy;
  if len_sq == 0.0 {
    return p.distance(&a);
  }

  let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
  p.distance(&Point::new(a.x + t * dx, a.y + t * dy))
}

/// Total length of a polyline.
pub fn path_length(path: &[Point]) -> f64 {
  path.windows(2).map(|w| w[0].distance(&w[1])).sum()
}

/// Point at `percent` (0.0..=1.0) of the polyline's arc length.
///
/// Paths with fewer than two points yield their first point, or the origin
/// when empty.
pub fn point_at_percent(path: &[Point], percent: f64) -> Point {
  match path {
    [] => return Point::default(),
    [only] => return *only,
    _ => {}
  }

  let target = path_length(path) * percent.clamp(0.0, 1.0);
  let mut travelled = 0.0;

  for w in path.windows(2) {
    let (start, end) = (w[0], w[1]);
    let segment = start.distance(&end);
    if travelled + segment >= target {
      if segment == 0.0 {
        return start;
      }
      let t = (target - travelled) / segment;
      return Point::new(start.x + (end.x - start.x) * t, start.y + (end.y - start.y) * t);
    }
    travelled += segment;
  }

  path[path.len() - 1]
}

/// Whether `p` lies within `tolerance` of any segment of the polyline.
pub fn is_point_near_path(p: Point, path: &[Point], tolerance: f64) -> bool {
  path
    .windows(2)
    .any(|w| distance_to_segment(p, w[0], w[1]) <= tolerance)
}

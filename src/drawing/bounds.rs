//! Axis-aligned bounds and the 2D coordinate type

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 2D coordinate in drawing units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const ORIGIN: Coord = Coord { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another coordinate
    pub fn distance(&self, other: Coord) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point on a circle of `radius` around `self` at `degrees` (counter-clockwise from +x)
    pub fn polar(&self, radius: f64, degrees: f64) -> Coord {
        let rad = degrees.to_radians();
        Coord::new(self.x + radius * rad.cos(), self.y + radius * rad.sin())
    }
}

impl From<[f64; 2]> for Coord {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Coord> for [f64; 2] {
    fn from(c: Coord) -> Self {
        [c.x, c.y]
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl Add for Coord {
    type Output = Coord;

    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coord {
    type Output = Coord;

    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Coord {
    type Output = Coord;

    fn mul(self, rhs: f64) -> Coord {
        Coord::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Coord {
    type Output = Coord;

    fn neg(self) -> Coord {
        Coord::new(-self.x, -self.y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A bounding box representing the spatial extent of a set of entities
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A zero-sized box at a single point
    pub fn at(point: Coord) -> Self {
        Self::new(point.x, point.y, 0.0, 0.0)
    }

    /// Smallest box containing every point, or `None` for an empty input
    pub fn from_points(points: impl IntoIterator<Item = Coord>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::at(first), |bb, p| bb.expand_to_include(p)))
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Top edge y-coordinate (y grows upward in drawing space)
    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// Minimum corner
    pub fn min(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    /// Maximum corner
    pub fn max(&self) -> Coord {
        Coord::new(self.right(), self.top())
    }

    pub fn corners(&self) -> [Coord; 4] {
        [
            self.min(),
            Coord::new(self.right(), self.y),
            self.max(),
            Coord::new(self.x, self.top()),
        ]
    }

    /// Compute the union of two bounding boxes (smallest box containing both)
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let top = self.top().max(other.top());
        BoundingBox::new(x, y, right - x, top - y)
    }

    /// Expand this bounding box to include a point
    pub fn expand_to_include(&self, point: Coord) -> BoundingBox {
        let x = self.x.min(point.x);
        let y = self.y.min(point.y);
        let right = self.right().max(point.x);
        let top = self.top().max(point.y);
        BoundingBox::new(x, y, right - x, top - y)
    }

    pub fn translated(&self, delta: Coord) -> BoundingBox {
        BoundingBox::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }
}

/// Bounds of a circular arc running counter-clockwise from `start_angle` to
/// `end_angle` (degrees)
pub fn arc_bounds(center: Coord, radius: f64, start_angle: f64, end_angle: f64) -> BoundingBox {
    let start = start_angle.rem_euclid(360.0);
    let mut sweep = (end_angle - start_angle).rem_euclid(360.0);
    if sweep == 0.0 {
        sweep = 360.0;
    }

    let mut points = vec![center.polar(radius, start), center.polar(radius, start + sweep)];
    for quadrant in [0.0, 90.0, 180.0, 270.0, 360.0, 450.0, 540.0, 630.0] {
        if quadrant > start && quadrant < start + sweep {
            points.push(center.polar(radius, quadrant));
        }
    }

    // polar() on the axis angles leaves ~1e-16 noise; snap axis extremes exactly
    let bb = BoundingBox::from_points(points).unwrap_or_else(|| BoundingBox::at(center));
    let snap = |v: f64, exact: f64| if (v - exact).abs() < 1e-9 { exact } else { v };
    let x = snap(bb.x, center.x - radius);
    let y = snap(bb.y, center.y - radius);
    let right = snap(bb.right(), center.x + radius);
    let top = snap(bb.top(), center.y + radius);
    BoundingBox::new(x, y, right - x, top - y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let bb = BoundingBox::from_points([
            Coord::new(1.0, 5.0),
            Coord::new(-2.0, 3.0),
            Coord::new(4.0, -1.0),
        ])
        .unwrap();
        assert_eq!(bb, BoundingBox::new(-2.0, -1.0, 6.0, 6.0));
    }

    #[test]
    fn test_from_no_points() {
        assert_eq!(BoundingBox::from_points(Vec::new()), None);
    }

    #[test]
    fn test_union() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(2.0, -1.0, 1.0, 1.0);
        assert_eq!(a.union(&b), BoundingBox::new(0.0, -1.0, 3.0, 2.0));
    }

    #[test]
    fn test_quarter_arc_bounds() {
        let bb = arc_bounds(Coord::ORIGIN, 1.0, 0.0, 90.0);
        assert!((bb.x - 0.0).abs() < 1e-12);
        assert!((bb.y - 0.0).abs() < 1e-12);
        assert!((bb.right() - 1.0).abs() < 1e-12);
        assert!((bb.top() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_arc_crossing_zero_degrees() {
        let bb = arc_bounds(Coord::ORIGIN, 2.0, 270.0, 90.0);
        assert!((bb.right() - 2.0).abs() < 1e-12);
        assert_eq!(bb.y, -2.0);
        assert!((bb.top() - 2.0).abs() < 1e-12);
        assert!(bb.x.abs() < 1e-12);
    }

    #[test]
    fn test_full_arc_is_circle() {
        let bb = arc_bounds(Coord::new(1.0, 1.0), 1.0, 30.0, 30.0);
        assert_eq!(bb, BoundingBox::new(0.0, 0.0, 2.0, 2.0));
    }
}

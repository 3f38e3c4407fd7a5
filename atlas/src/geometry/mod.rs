//! Plain-value detection geometry in the shared image coordinate space.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;

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

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Lexicographic total order (x, then y).
    pub fn total_cmp(&self, other: &Point) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

/// Axis-aligned bounding box. Edges are inclusive, so touching boxes intersect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn around(center: Point, half_extent: f64) -> Self {
        Self {
            min: Point::new(center.x - half_extent, center.y - half_extent),
            max: Point::new(center.x + half_extent, center.y + half_extent),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let w = self.max.x.min(other.max.x) - self.min.x.max(other.min.x);
        let h = self.max.y.min(other.max.y) - self.min.y.max(other.min.y);
        if w <= 0.0 || h <= 0.0 {
            return 0.0;
        }
        w * h
    }

    /// Intersection over union; 0 when both boxes are degenerate.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    pub fn total_cmp(&self, other: &BoundingBox) -> Ordering {
        self.min
            .total_cmp(&other.min)
            .then_with(|| self.max.total_cmp(&other.max))
    }
}

/// Outline of a detected object.
///
/// A circle with zero radius is a point detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Geometry {
    Circle { centroid: Point, radius: f64 },
    Polygon { vertices: Vec<Point> },
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Self::Circle {
            centroid: Point::new(x, y),
            radius: 0.0,
        }
    }

    pub fn circle(x: f64, y: f64, radius: f64) -> Self {
        Self::Circle {
            centroid: Point::new(x, y),
            radius,
        }
    }

    /// Axis-aligned rectangle polygon.
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::Polygon {
            vertices: vec![
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Circle { centroid, radius } => {
                if !centroid.is_finite() {
                    return Err("centroid is not finite".to_string());
                }
                if !radius.is_finite() || *radius < 0.0 {
                    return Err(format!("radius {radius} is not a finite non-negative number"));
                }
            }
            Self::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(format!(
                        "polygon has {} vertices, expected at least 3",
                        vertices.len()
                    ));
                }
                if let Some(bad) = vertices.iter().position(|v| !v.is_finite()) {
                    return Err(format!("vertex {bad} is not finite"));
                }
            }
        }
        Ok(())
    }

    /// Signed shoelace area of a polygon ring.
    fn signed_area(vertices: &[Point]) -> f64 {
        let n = vertices.len();
        let mut acc = 0.0;
        for i in 0..n {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            acc += a.x * b.y - b.x * a.y;
        }
        acc * 0.5
    }

    pub fn area(&self) -> f64 {
        match self {
            Self::Circle { radius, .. } => std::f64::consts::PI * radius * radius,
            Self::Polygon { vertices } => Self::signed_area(vertices).abs(),
        }
    }

    /// Area centroid; degenerate polygons fall back to the vertex mean.
    pub fn centroid(&self) -> Point {
        match self {
            Self::Circle { centroid, .. } => *centroid,
            Self::Polygon { vertices } => {
                let area = Self::signed_area(vertices);
                let n = vertices.len();
                if area.abs() <= f64::EPSILON {
                    let sum = vertices
                        .iter()
                        .fold(Point::default(), |acc, v| Point::new(acc.x + v.x, acc.y + v.y));
                    return Point::new(sum.x / n as f64, sum.y / n as f64);
                }

                let mut cx = 0.0;
                let mut cy = 0.0;
                for i in 0..n {
                    let a = vertices[i];
                    let b = vertices[(i + 1) % n];
                    let cross = a.x * b.y - b.x * a.y;
                    cx += (a.x + b.x) * cross;
                    cy += (a.y + b.y) * cross;
                }
                Point::new(cx / (6.0 * area), cy / (6.0 * area))
            }
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        match self {
            Self::Circle { centroid, radius } => BoundingBox::around(*centroid, *radius),
            Self::Polygon { vertices } => {
                let first = vertices.first().copied().unwrap_or_default();
                vertices.iter().fold(
                    BoundingBox {
                        min: first,
                        max: first,
                    },
                    |acc, v| BoundingBox {
                        min: Point::new(acc.min.x.min(v.x), acc.min.y.min(v.y)),
                        max: Point::new(acc.max.x.max(v.x), acc.max.y.max(v.y)),
                    },
                )
            }
        }
    }

    /// Whether `point` lies inside the shape (boundary included for circles).
    ///
    /// A point detection contains only its own centroid.
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Self::Circle { centroid, radius } => centroid.distance(point) <= *radius,
            Self::Polygon { vertices } => {
                if !self.bounds().contains(point) {
                    return false;
                }
                // Even-odd ray casting.
                let n = vertices.len();
                let mut inside = false;
                let mut j = n - 1;
                for i in 0..n {
                    let a = vertices[i];
                    let b = vertices[j];
                    if (a.y > point.y) != (b.y > point.y)
                        && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
                    {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
        }
    }

    /// Total order used to canonicalize detections; not geometrically meaningful.
    pub fn total_cmp(&self, other: &Geometry) -> Ordering {
        match (self, other) {
            (
                Self::Circle {
                    centroid: c1,
                    radius: r1,
                },
                Self::Circle {
                    centroid: c2,
                    radius: r2,
                },
            ) => c1.total_cmp(c2).then_with(|| r1.total_cmp(r2)),
            (Self::Circle { .. }, Self::Polygon { .. }) => Ordering::Less,
            (Self::Polygon { .. }, Self::Circle { .. }) => Ordering::Greater,
            (Self::Polygon { vertices: v1 }, Self::Polygon { vertices: v2 }) => v1
                .iter()
                .zip(v2)
                .map(|(a, b)| a.total_cmp(b))
                .find(|ord| ord.is_ne())
                .unwrap_or_else(|| v1.len().cmp(&v2.len())),
        }
    }
}

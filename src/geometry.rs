//! Planar coordinates and the Euclidean metric.

/// A position in the plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl Coordinates {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        euclidean_distance(self.x, self.y, other.x, other.y)
    }
}

/// `√((x2−x1)² + (y2−y1)²)`.
///
/// Non-finite inputs propagate as NaN or infinity; callers check the result
/// with [`f64::is_finite`] rather than trusting it.
#[inline]
pub fn euclidean_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    (dx * dx + dy * dy).sqrt()
}

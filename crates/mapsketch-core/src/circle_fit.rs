//! Circle construction from two or three clicked points.

use crate::geodesic::{self, LatLng, Projection, calc_middle_latlng, circumcenter};
use crate::shapes::Circle;
use serde::{Deserialize, Serialize};

/// A fitted circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleFit {
    pub center: LatLng,
    /// Radius in metres.
    pub radius: f64,
}

impl CircleFit {
    pub fn to_circle(self) -> Circle {
        Circle::new(self.center, self.radius)
    }
}

/// Circle whose diameter is the segment A–B.
///
/// The center is the midpoint in projected space; the radius is the geodesic
/// distance from it to A.
pub fn fit_circle_two_point(projection: &Projection, a: LatLng, b: LatLng) -> CircleFit {
    let center = calc_middle_latlng(projection, a, b);
    CircleFit {
        center,
        radius: geodesic::distance(center, a),
    }
}

/// Circle through three points, solved in projected space.
///
/// Returns `None` when the points are collinear (or coincide).
pub fn fit_circle_three_point(
    projection: &Projection,
    a: LatLng,
    b: LatLng,
    c: LatLng,
) -> Option<CircleFit> {
    let center = circumcenter(
        projection.project(a),
        projection.project(b),
        projection.project(c),
    )?;
    let center = projection.unproject(center);
    let radius = geodesic::distance(center, a);
    if !radius.is_finite() {
        return None;
    }
    Some(CircleFit { center, radius })
}

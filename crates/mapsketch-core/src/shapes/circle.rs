//! Circle shape.

use super::{Polygon, ShapeFlags, ShapeId, ShapeKind, ShapeStyle, ShapeTrait, Vertex};
use crate::geodesic::{self, LatLng, LatLngBounds};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use uuid::Uuid;

/// A geodesic circle: every boundary point lies `radius` metres from `center`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub(crate) id: ShapeId,
    /// Center coordinate.
    pub center: LatLng,
    /// Radius in metres.
    pub radius: f64,
    /// Style properties.
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: ShapeFlags,
}

impl Circle {
    /// Create a new circle.
    pub fn new(center: LatLng, radius: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            center,
            radius,
            style: ShapeStyle::default(),
            flags: ShapeFlags::default(),
        }
    }

    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }

    /// Boundary point at `bearing` degrees clockwise from north.
    pub fn point_at(&self, bearing: f64) -> LatLng {
        geodesic::destination_point(self.center, self.radius, bearing)
    }

    /// Polygon approximation with `sides` vertices spaced evenly by bearing.
    /// The polygon inherits the circle's style.
    pub fn to_polygon(&self, sides: usize) -> Polygon {
        let sides = sides.max(3);
        let vertices = (0..sides)
            .map(|i| Vertex::new(self.point_at(i as f64 * 360.0 / sides as f64)))
            .collect();
        Polygon::new(vertices).with_style(self.style.clone())
    }

    /// Planar area of the geodesic disc in square metres.
    pub fn area(&self) -> f64 {
        PI * self.radius * self.radius
    }

    pub fn circumference(&self) -> f64 {
        2.0 * PI * self.radius
    }
}

impl ShapeTrait for Circle {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Circle
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points([0.0, 90.0, 180.0, 270.0].map(|b| self.point_at(b)))
    }

    fn latlngs(&self) -> Vec<LatLng> {
        vec![self.center]
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn flags(&self) -> &ShapeFlags {
        &self.flags
    }

    fn flags_mut(&mut self) -> &mut ShapeFlags {
        &mut self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_polygon_equidistant() {
        let circle = Circle::new(LatLng::new(47.0, 8.0), 500.0);
        let polygon = circle.to_polygon(64);
        assert_eq!(polygon.vertices.len(), 64);
        for v in &polygon.vertices {
            let d = geodesic::distance(circle.center, v.latlng);
            assert!((d - 500.0).abs() < 1e-3, "distance = {d}");
        }
        assert_eq!(polygon.style, circle.style);
    }

    #[test]
    fn test_bounds_contain_center() {
        let circle = Circle::new(LatLng::new(0.0, 0.0), 1000.0);
        let bounds = circle.bounds().unwrap();
        assert!(bounds.contains(circle.center));
        assert!(bounds.north_east.lat > 0.0089 && bounds.north_east.lat < 0.0091);
    }

    #[test]
    fn test_zero_radius() {
        let circle = Circle::new(LatLng::new(1.0, 1.0), 0.0);
        assert!(circle.area().abs() < f64::EPSILON);
        let polygon = circle.to_polygon(8);
        assert!(polygon.vertices.iter().all(|v| v.latlng.approx_eq(circle.center, 1e-12)));
    }
}

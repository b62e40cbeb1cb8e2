//! Polygon shape.

use super::{ShapeFlags, ShapeId, ShapeKind, ShapeStyle, ShapeTrait, Vertex};
use crate::boolean::Geometry;
use crate::geodesic::{self, LatLng, LatLngBounds};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A closed ring. Vertices are stored open: the closing coordinate is implied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub(crate) id: ShapeId,
    /// Ring vertices without the repeated first coordinate.
    pub vertices: Vec<Vertex>,
    /// Style properties.
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: ShapeFlags,
}

impl Polygon {
    /// Create a polygon from ring vertices. A trailing copy of the first vertex is dropped.
    pub fn new(mut vertices: Vec<Vertex>) -> Self {
        if vertices.len() > 1 {
            let first = vertices[0].latlng;
            if vertices[vertices.len() - 1].latlng == first {
                vertices.pop();
            }
        }
        Self {
            id: Uuid::new_v4(),
            vertices,
            style: ShapeStyle::default(),
            flags: ShapeFlags::default(),
        }
    }

    /// Create a polygon from bare coordinates.
    pub fn from_latlngs(latlngs: Vec<LatLng>) -> Self {
        Self::new(latlngs.into_iter().map(Vertex::new).collect())
    }

    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }

    /// Ring coordinates with the first coordinate repeated at the end.
    pub fn closed_ring(&self) -> Vec<LatLng> {
        let mut ring = self.latlngs();
        if let Some(&first) = ring.first() {
            ring.push(first);
        }
        ring
    }

    /// Area in square metres.
    pub fn area(&self) -> f64 {
        geodesic::ring_area(&self.latlngs())
    }

    /// Perimeter in metres, closing edge included.
    pub fn perimeter(&self) -> f64 {
        self.closed_ring()
            .windows(2)
            .map(|w| geodesic::distance(w[0], w[1]))
            .sum()
    }

    pub fn to_geometry(&self) -> Geometry {
        Geometry::Polygon(vec![
            self.closed_ring().into_iter().map(LatLng::to_position).collect(),
        ])
    }
}

impl ShapeTrait for Polygon {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Polygon
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(self.vertices.iter().map(|v| v.latlng))
    }

    fn latlngs(&self) -> Vec<LatLng> {
        self.vertices.iter().map(|v| v.latlng).collect()
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

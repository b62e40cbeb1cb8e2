//! Polyline shape.

use super::{ShapeFlags, ShapeId, ShapeKind, ShapeStyle, ShapeTrait, Vertex};
use crate::boolean::Geometry;
use crate::geodesic::{self, LatLng, LatLngBounds};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An open path of two or more vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub(crate) id: ShapeId,
    /// Ordered vertices.
    pub vertices: Vec<Vertex>,
    /// Spacing in metres of distance markers, `None` for a plain line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_interval: Option<f64>,
    /// Style properties.
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: ShapeFlags,
}

impl Polyline {
    /// Create a polyline from vertices.
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vertices,
            distance_interval: None,
            style: ShapeStyle {
                fill_color: None,
                ..ShapeStyle::default()
            },
            flags: ShapeFlags::default(),
        }
    }

    /// Create a polyline from bare coordinates.
    pub fn from_latlngs(latlngs: Vec<LatLng>) -> Self {
        Self::new(latlngs.into_iter().map(Vertex::new).collect())
    }

    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_distance_interval(mut self, interval: f64) -> Self {
        self.distance_interval = Some(interval);
        self
    }

    /// Geodesic length in metres.
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| geodesic::distance(w[0].latlng, w[1].latlng))
            .sum()
    }

    /// Markers placed every `distance_interval` metres along the path.
    pub fn distance_markers(&self) -> Vec<LatLng> {
        match self.distance_interval {
            Some(interval) => geodesic::distance_markers(&self.latlngs(), interval),
            None => Vec::new(),
        }
    }

    pub fn to_geometry(&self) -> Geometry {
        Geometry::LineString(self.vertices.iter().map(|v| v.latlng.to_position()).collect())
    }
}

impl ShapeTrait for Polyline {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Polyline
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

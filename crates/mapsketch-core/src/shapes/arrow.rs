//! Arrow shape.

use super::{ShapeFlags, ShapeId, ShapeKind, ShapeStyle, ShapeTrait, Vertex};
use crate::geodesic::{LatLng, LatLngBounds, Projection};
use kurbo::Vec2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default arrowhead wing length in pixels.
pub const DEFAULT_HEAD_SIZE: f64 = 12.0;
/// Default full opening angle of the arrowhead in degrees.
pub const DEFAULT_HEAD_ANGLE: f64 = 60.0;

/// A polyline with an arrowhead at its last vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub(crate) id: ShapeId,
    /// Ordered vertices; the head sits on the last one.
    pub vertices: Vec<Vertex>,
    /// Size of the arrowhead in pixels.
    pub head_size: f64,
    /// Opening angle of the arrowhead in degrees.
    pub head_angle: f64,
    /// Style properties.
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: ShapeFlags,
}

impl Arrow {
    /// Create a new arrow.
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vertices,
            head_size: DEFAULT_HEAD_SIZE,
            head_angle: DEFAULT_HEAD_ANGLE,
            style: ShapeStyle {
                fill_color: None,
                ..ShapeStyle::default()
            },
            flags: ShapeFlags::default(),
        }
    }

    pub fn from_latlngs(latlngs: Vec<LatLng>) -> Self {
        Self::new(latlngs.into_iter().map(Vertex::new).collect())
    }

    pub fn with_head(mut self, size: f64, angle: f64) -> Self {
        self.head_size = size;
        self.head_angle = angle;
        self
    }

    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }

    /// The two wing tips of the arrowhead, computed in pixel space.
    /// `None` with fewer than two vertices.
    pub fn arrowhead(&self, projection: &Projection) -> Option<(LatLng, LatLng)> {
        let n = self.vertices.len();
        if n < 2 {
            return None;
        }
        let from = projection.project(self.vertices[n - 2].latlng);
        let tip = projection.project(self.vertices[n - 1].latlng);
        let line_angle = (tip - from).atan2();
        let half = self.head_angle.to_radians() / 2.0;
        let wing = |angle: f64| projection.unproject(tip + Vec2::from_angle(angle) * self.head_size);
        Some((
            wing(line_angle + std::f64::consts::PI - half),
            wing(line_angle + std::f64::consts::PI + half),
        ))
    }
}

impl ShapeTrait for Arrow {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Arrow
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

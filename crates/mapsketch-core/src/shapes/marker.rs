//! Marker shape.

use super::{ShapeFlags, ShapeId, ShapeKind, ShapeStyle, ShapeTrait};
use crate::geodesic::{LatLng, LatLngBounds};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single pinned coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub(crate) id: ShapeId,
    /// Position of the marker.
    pub latlng: LatLng,
    /// Style properties.
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: ShapeFlags,
}

impl Marker {
    /// Create a new marker.
    pub fn new(latlng: LatLng) -> Self {
        Self {
            id: Uuid::new_v4(),
            latlng,
            style: ShapeStyle::default(),
            flags: ShapeFlags::default(),
        }
    }

    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }
}

impl ShapeTrait for Marker {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Marker
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        Some(LatLngBounds::new(self.latlng, self.latlng))
    }

    fn latlngs(&self) -> Vec<LatLng> {
        vec![self.latlng]
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

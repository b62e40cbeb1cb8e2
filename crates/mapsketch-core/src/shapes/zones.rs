//! Concentric hazard zones around a single point.

use super::{Circle, SerializableColor, ShapeFlags, ShapeId, ShapeKind, ShapeStyle, ShapeTrait};
use crate::boolean::Geometry;
use crate::geodesic::{self, LatLng, LatLngBounds};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bearing of the zone labels, clockwise from north.
pub const LABEL_BEARING: f64 = 45.0;

/// Stroke width of the zone circles in pixels.
const ZONE_STROKE_WIDTH: f64 = 2.0;

/// One ring of a zone group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Radius in metres.
    pub distance: f64,
    pub color: SerializableColor,
    pub fill_opacity: f64,
}

impl Zone {
    pub fn new(distance: f64, color: SerializableColor, fill_opacity: f64) -> Self {
        Self {
            distance,
            color,
            fill_opacity,
        }
    }

    /// Red, orange, yellow and green rings at 30, 60, 300 and 1000 m.
    pub fn defaults() -> Vec<Zone> {
        vec![
            Zone::new(30.0, SerializableColor::new(0xff, 0x00, 0x00, 255), 0.3),
            Zone::new(60.0, SerializableColor::new(0xff, 0x88, 0x00, 255), 0.25),
            Zone::new(300.0, SerializableColor::new(0xff, 0xff, 0x00, 255), 0.2),
            Zone::new(1000.0, SerializableColor::new(0x4a, 0xfb, 0x49, 255), 0.15),
        ]
    }

    pub fn is_valid(&self) -> bool {
        self.distance.is_finite() && self.distance > 0.0
    }

    /// Text shown on the zone label.
    pub fn label(&self) -> String {
        format!("{}m", self.distance)
    }
}

/// Replace invalid distances with the default zone at the same index.
/// Invalid zones past the defaults are dropped.
pub fn resolve_zones(configured: &[Zone]) -> Vec<Zone> {
    let defaults = Zone::defaults();
    configured
        .iter()
        .enumerate()
        .filter_map(|(i, zone)| {
            if zone.is_valid() {
                Some(*zone)
            } else {
                defaults.get(i).map(|fallback| Zone {
                    distance: fallback.distance,
                    ..*zone
                })
            }
        })
        .collect()
}

/// Circles of several radii sharing one center, committed as a single shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneGroup {
    pub(crate) id: ShapeId,
    pub center: LatLng,
    /// Zones ordered from the largest to the smallest.
    pub zones: Vec<Zone>,
    /// Base style the zone circles are derived from.
    pub style: ShapeStyle,
    #[serde(default)]
    pub flags: ShapeFlags,
}

impl ZoneGroup {
    pub fn new(center: LatLng, zones: &[Zone]) -> Self {
        let mut zones = resolve_zones(zones);
        zones.sort_by(|a, b| b.distance.total_cmp(&a.distance));
        Self {
            id: Uuid::new_v4(),
            center,
            zones,
            style: ShapeStyle::default(),
            flags: ShapeFlags::default(),
        }
    }

    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn outer_radius(&self) -> f64 {
        self.zones.first().map_or(0.0, |z| z.distance)
    }

    /// One circle per zone, largest first. The circles are not editable on their own.
    pub fn circles(&self) -> Vec<Circle> {
        self.zones
            .iter()
            .map(|zone| {
                let mut circle = Circle::new(self.center, zone.distance).with_style(ShapeStyle {
                    stroke_color: zone.color,
                    stroke_width: ZONE_STROKE_WIDTH,
                    fill_color: Some(zone.color),
                    fill_opacity: zone.fill_opacity,
                    ..self.style.clone()
                });
                circle.flags.ignore = true;
                circle
            })
            .collect()
    }

    /// Label anchors on each circle's perimeter, with their text.
    pub fn labels(&self) -> Vec<(LatLng, String)> {
        self.zones
            .iter()
            .map(|zone| {
                let anchor = geodesic::destination_point(self.center, zone.distance, LABEL_BEARING);
                (anchor, zone.label())
            })
            .collect()
    }

    pub fn to_geometry(&self, sides: usize) -> Geometry {
        let mut parts: Vec<Geometry> = self
            .circles()
            .iter()
            .map(|c| c.to_polygon(sides).to_geometry())
            .collect();
        parts.push(Geometry::Point(self.center.to_position()));
        Geometry::GeometryCollection(parts)
    }
}

impl ShapeTrait for ZoneGroup {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn kind(&self) -> ShapeKind {
        ShapeKind::Zones
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        let outer = Circle::new(self.center, self.outer_radius());
        outer.bounds()
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

//! Shape definitions for the map surface.

mod arrow;
mod circle;
mod marker;
mod polygon;
mod polyline;
mod zones;

pub use arrow::{Arrow, DEFAULT_HEAD_ANGLE, DEFAULT_HEAD_SIZE};
pub use circle::Circle;
pub use marker::Marker;
pub use polygon::Polygon;
pub use polyline::Polyline;
pub use zones::{LABEL_BEARING, Zone, ZoneGroup, resolve_zones};

use crate::boolean::Geometry;
use crate::geodesic::{LatLng, LatLngBounds};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// The default stroke blue of web map overlays.
    pub fn overlay_blue() -> Self {
        Self::new(0x33, 0x88, 0xff, 255)
    }
}

/// Style properties for shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Stroke color.
    pub stroke_color: SerializableColor,
    /// Stroke width in pixels.
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    #[serde(default)]
    pub fill_color: Option<SerializableColor>,
    /// Fill opacity applied on top of the fill color alpha.
    #[serde(default = "default_fill_opacity")]
    pub fill_opacity: f64,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

fn default_fill_opacity() -> f64 {
    0.2
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::overlay_blue(),
            stroke_width: 3.0,
            fill_color: Some(SerializableColor::overlay_blue()),
            fill_opacity: default_fill_opacity(),
            opacity: 1.0,
        }
    }
}

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// The kind of a shape, used for snapping priorities and cut eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Marker,
    Polyline,
    Polygon,
    Circle,
    Arrow,
    /// Concentric hazard zones.
    Zones,
}

impl ShapeKind {
    /// Kinds that can be snapped to, in default priority order.
    pub const SNAPPABLE: [ShapeKind; 5] = [
        ShapeKind::Marker,
        ShapeKind::Polyline,
        ShapeKind::Arrow,
        ShapeKind::Polygon,
        ShapeKind::Circle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Marker => "Marker",
            ShapeKind::Polyline => "Line",
            ShapeKind::Polygon => "Polygon",
            ShapeKind::Circle => "Circle",
            ShapeKind::Arrow => "Arrow",
            ShapeKind::Zones => "DangerousGoodsZones",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-shape behaviour flags shared by every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeFlags {
    /// Scratch/preview geometry that never enters the collection.
    #[serde(default)]
    pub temporary: bool,
    /// Opt out of snapping and cutting.
    #[serde(default)]
    pub ignore: bool,
    /// Whether a cut may replace this shape.
    #[serde(default = "default_allow_cutting")]
    pub allow_cutting: bool,
}

fn default_allow_cutting() -> bool {
    true
}

impl Default for ShapeFlags {
    fn default() -> Self {
        Self {
            temporary: false,
            ignore: false,
            allow_cutting: true,
        }
    }
}

impl ShapeFlags {
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            ..Self::default()
        }
    }
}

/// Where a vertex was snapped from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapInfo {
    /// Shape the vertex was attached to.
    pub shape: ShapeId,
    /// Owning segment, `None` for a vertex match.
    pub segment: Option<(LatLng, LatLng)>,
    /// Pixel distance between the cursor and the matched point.
    pub distance: f64,
}

/// One coordinate of a shape boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub latlng: LatLng,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap: Option<SnapInfo>,
}

impl Vertex {
    pub fn new(latlng: LatLng) -> Self {
        Self { latlng, snap: None }
    }

    pub fn snapped(latlng: LatLng, snap: SnapInfo) -> Self {
        Self {
            latlng,
            snap: Some(snap),
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.snap.is_some()
    }
}

impl From<LatLng> for Vertex {
    fn from(latlng: LatLng) -> Self {
        Self::new(latlng)
    }
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Get the shape kind.
    fn kind(&self) -> ShapeKind;

    /// Get the geographic bounds.
    fn bounds(&self) -> Option<LatLngBounds>;

    /// Coordinates that make up the shape outline (open ring for polygons).
    fn latlngs(&self) -> Vec<LatLng>;

    /// Get the style.
    fn style(&self) -> &ShapeStyle;

    /// Get mutable style.
    fn style_mut(&mut self) -> &mut ShapeStyle;

    fn flags(&self) -> &ShapeFlags;

    fn flags_mut(&mut self) -> &mut ShapeFlags;
}

/// Enum wrapper for all shape types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Marker(Marker),
    Polyline(Polyline),
    Polygon(Polygon),
    Circle(Circle),
    Arrow(Arrow),
    Zones(ZoneGroup),
}

impl Shape {
    fn as_trait(&self) -> &dyn ShapeTrait {
        match self {
            Shape::Marker(s) => s,
            Shape::Polyline(s) => s,
            Shape::Polygon(s) => s,
            Shape::Circle(s) => s,
            Shape::Arrow(s) => s,
            Shape::Zones(s) => s,
        }
    }

    fn as_trait_mut(&mut self) -> &mut dyn ShapeTrait {
        match self {
            Shape::Marker(s) => s,
            Shape::Polyline(s) => s,
            Shape::Polygon(s) => s,
            Shape::Circle(s) => s,
            Shape::Arrow(s) => s,
            Shape::Zones(s) => s,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.as_trait().id()
    }

    /// Give the shape a fresh identity, e.g. for a copy.
    pub(crate) fn regenerate_id(&mut self) {
        let id = Uuid::new_v4();
        match self {
            Shape::Marker(s) => s.id = id,
            Shape::Polyline(s) => s.id = id,
            Shape::Polygon(s) => s.id = id,
            Shape::Circle(s) => s.id = id,
            Shape::Arrow(s) => s.id = id,
            Shape::Zones(s) => s.id = id,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.as_trait().kind()
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.as_trait().bounds()
    }

    pub fn latlngs(&self) -> Vec<LatLng> {
        self.as_trait().latlngs()
    }

    pub fn style(&self) -> &ShapeStyle {
        self.as_trait().style()
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        self.as_trait_mut().style_mut()
    }

    pub fn flags(&self) -> &ShapeFlags {
        self.as_trait().flags()
    }

    pub fn flags_mut(&mut self) -> &mut ShapeFlags {
        self.as_trait_mut().flags_mut()
    }

    pub fn is_temporary(&self) -> bool {
        self.flags().temporary
    }

    /// Whether snapping and cutting should look at this shape at all.
    pub fn is_editable(&self) -> bool {
        let flags = self.flags();
        !flags.temporary && !flags.ignore
    }

    /// Boundary segments. Polygons include their closing edge.
    pub fn segments(&self) -> Vec<(LatLng, LatLng)> {
        match self {
            Shape::Marker(_) | Shape::Circle(_) | Shape::Zones(_) => Vec::new(),
            Shape::Polyline(_) | Shape::Arrow(_) => {
                self.latlngs().windows(2).map(|w| (w[0], w[1])).collect()
            }
            Shape::Polygon(p) => ring_segments(&p.latlngs()),
        }
    }

    /// Geometry handed to the boolean-operations collaborator.
    /// Circles are approximated with `circle_segments` sides; markers have none.
    pub fn to_geometry(&self, circle_segments: usize) -> Option<Geometry> {
        match self {
            Shape::Marker(m) => Some(Geometry::Point(m.latlng.to_position())),
            Shape::Polyline(l) => Some(l.to_geometry()),
            Shape::Arrow(a) => Some(Geometry::LineString(
                a.latlngs().into_iter().map(LatLng::to_position).collect(),
            )),
            Shape::Polygon(p) => Some(p.to_geometry()),
            Shape::Circle(c) => Some(c.to_polygon(circle_segments).to_geometry()),
            Shape::Zones(z) => Some(z.to_geometry(circle_segments)),
        }
    }

    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Shape::Polygon(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_circle(&self) -> Option<&Circle> {
        match self {
            Shape::Circle(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_zones(&self) -> Option<&ZoneGroup> {
        match self {
            Shape::Zones(z) => Some(z),
            _ => None,
        }
    }
}

/// Parse a shape kind from its display name.
impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Marker" => Ok(ShapeKind::Marker),
            "Line" | "Polyline" => Ok(ShapeKind::Polyline),
            "Polygon" => Ok(ShapeKind::Polygon),
            "Circle" => Ok(ShapeKind::Circle),
            "Arrow" => Ok(ShapeKind::Arrow),
            "DangerousGoodsZones" => Ok(ShapeKind::Zones),
            other => Err(other.to_string()),
        }
    }
}

/// Segments of a closed ring given without its repeated closing coordinate.
pub fn ring_segments(ring: &[LatLng]) -> Vec<(LatLng, LatLng)> {
    if ring.len() < 2 {
        return Vec::new();
    }
    (0..ring.len())
        .map(|i| (ring[i], ring[(i + 1) % ring.len()]))
        .collect()
}

/// Closest point to `point` on segment a→b, with the clamped parameter t.
pub fn closest_point_on_segment(point: Point, a: Point, b: Point) -> (Point, f64) {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return (a, 0.0);
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    (a + seg * t, t)
}

/// Test if two line segments (a-b) and (c-d) intersect.
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let cross = |o: Point, p: Point, q: Point| -> f64 {
        (p.x - o.x) * (q.y - o.y) - (p.y - o.y) * (q.x - o.x)
    };
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    // Collinear cases: check if endpoint lies on the other segment
    let on_segment = |p: Point, q: Point, r: Point| -> bool {
        r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
    };
    (d1.abs() < 1e-10 && on_segment(c, d, a))
        || (d2.abs() < 1e-10 && on_segment(c, d, b))
        || (d3.abs() < 1e-10 && on_segment(a, b, c))
        || (d4.abs() < 1e-10 && on_segment(a, b, d))
}

fn planar(latlng: LatLng) -> Point {
    Point::new(latlng.lng, latlng.lat)
}

/// Whether a path crosses itself. Adjacent segments sharing a vertex do not count.
pub fn self_intersects(points: &[LatLng], closed: bool) -> bool {
    let pts: Vec<Point> = points.iter().copied().map(planar).collect();
    let n = pts.len();
    if n < 4 && !(closed && n == 3) {
        return false;
    }
    let segment_count = if closed { n } else { n - 1 };
    let seg = |i: usize| (pts[i], pts[(i + 1) % n]);
    for i in 0..segment_count {
        for j in (i + 1)..segment_count {
            let adjacent = j == i + 1 || (closed && i == 0 && j == segment_count - 1);
            if adjacent {
                continue;
            }
            let (a, b) = seg(i);
            let (c, d) = seg(j);
            if segments_intersect(a, b, c, d) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ll(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng)
    }

    #[test]
    fn test_closest_point_clamped() {
        let (p, t) = closest_point_on_segment(
            Point::new(-5.0, 3.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        );
        assert_eq!(p, Point::new(0.0, 0.0));
        assert!(t.abs() < f64::EPSILON);

        let (p, t) = closest_point_on_segment(
            Point::new(4.0, 3.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        );
        assert!((p.x - 4.0).abs() < f64::EPSILON);
        assert!((t - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_self_intersects_bowtie() {
        let bowtie = [ll(0.0, 0.0), ll(1.0, 1.0), ll(1.0, 0.0), ll(0.0, 1.0)];
        assert!(self_intersects(&bowtie, true));
        assert!(self_intersects(&bowtie, false));
    }

    #[test]
    fn test_self_intersects_square() {
        let square = [ll(0.0, 0.0), ll(0.0, 1.0), ll(1.0, 1.0), ll(1.0, 0.0)];
        assert!(!self_intersects(&square, true));
        assert!(!self_intersects(&square, false));
    }

    #[test]
    fn test_ring_segments_closes() {
        let ring = [ll(0.0, 0.0), ll(0.0, 1.0), ll(1.0, 1.0)];
        let segments = ring_segments(&ring);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2], (ll(1.0, 1.0), ll(0.0, 0.0)));
    }

    #[test]
    fn test_shape_kind_from_str() {
        assert_eq!("Line".parse::<ShapeKind>(), Ok(ShapeKind::Polyline));
        assert!("Rectangle".parse::<ShapeKind>().is_err());
    }

    #[test]
    fn test_style_json_defaults() {
        let style: ShapeStyle = serde_json::from_str(
            r#"{"stroke_color": {"r": 255, "g": 0, "b": 0, "a": 255}, "stroke_width": 2.0}"#,
        )
        .unwrap();
        assert!(style.fill_color.is_none());
        assert!((style.fill_opacity - 0.2).abs() < f64::EPSILON);
        assert!((style.opacity - 1.0).abs() < f64::EPSILON);
    }
}

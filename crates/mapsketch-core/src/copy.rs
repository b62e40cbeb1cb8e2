//! Copy mode: pick a source shape, preview it under the cursor, place copies.

use crate::collection::ShapeCollection;
use crate::geodesic::{self, LatLng, Projection};
use crate::shapes::{Shape, ShapeFlags, ShapeId, Vertex};

/// Pixel radius within which a click selects a marker.
pub const MARKER_HIT_RADIUS: f64 = 10.0;

const PREVIEW_OPACITY: f64 = 0.5;
const PREVIEW_FILL_OPACITY: f64 = 0.3;

/// Shapes a copy can be made of.
pub fn is_copyable(shape: &Shape) -> bool {
    shape.is_editable() && !matches!(shape, Shape::Zones(_))
}

/// The point a copy is positioned by: the anchor of markers and circles,
/// otherwise the center of the bounds.
pub fn source_center(shape: &Shape) -> Option<LatLng> {
    match shape {
        Shape::Marker(marker) => Some(marker.latlng),
        Shape::Circle(circle) => Some(circle.center),
        Shape::Zones(zones) => Some(zones.center),
        _ => shape.bounds().map(|b| b.center()),
    }
}

/// Whether a click at `latlng` lands on `shape`.
///
/// Markers use a pixel tolerance, circles their geodesic radius, and every
/// other shape its bounding box.
pub fn shape_contains_point(shape: &Shape, latlng: LatLng, projection: &Projection) -> bool {
    match shape {
        Shape::Marker(marker) => projection.pixel_distance(marker.latlng, latlng) < MARKER_HIT_RADIUS,
        Shape::Circle(circle) => geodesic::distance(circle.center, latlng) <= circle.radius,
        _ => shape.bounds().is_some_and(|b| b.contains(latlng)),
    }
}

/// Shift `latlng` by the planar offset from `from` to `to`.
pub fn offset_latlng(latlng: LatLng, from: LatLng, to: LatLng) -> LatLng {
    LatLng::new(latlng.lat + (to.lat - from.lat), latlng.lng + (to.lng - from.lng))
}

fn offset_vertices(vertices: &mut [Vertex], from: LatLng, to: LatLng) {
    for vertex in vertices {
        *vertex = Vertex::new(offset_latlng(vertex.latlng, from, to));
    }
}

/// Move `shape` in place so that `from` lands on `to`.
/// Snap provenance does not survive the move.
pub fn offset_shape(shape: &mut Shape, from: LatLng, to: LatLng) {
    match shape {
        Shape::Marker(marker) => marker.latlng = offset_latlng(marker.latlng, from, to),
        Shape::Circle(circle) => circle.center = offset_latlng(circle.center, from, to),
        Shape::Zones(zones) => zones.center = offset_latlng(zones.center, from, to),
        Shape::Polyline(line) => offset_vertices(&mut line.vertices, from, to),
        Shape::Arrow(arrow) => offset_vertices(&mut arrow.vertices, from, to),
        Shape::Polygon(polygon) => offset_vertices(&mut polygon.vertices, from, to),
    }
}

/// A copy of `shape` moved so that `from` lands on `to`, with a new identity.
pub fn translated(shape: &Shape, from: LatLng, to: LatLng) -> Shape {
    let mut copy = shape.clone();
    offset_shape(&mut copy, from, to);
    copy.regenerate_id();
    *copy.flags_mut() = ShapeFlags::default();
    copy
}

/// State of the copy mode.
#[derive(Debug, Clone, Default)]
pub struct CopyTool {
    /// Selected shape and its center.
    source: Option<(ShapeId, LatLng)>,
    preview: Option<Shape>,
}

impl CopyTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<ShapeId> {
        self.source.map(|(id, _)| id)
    }

    /// Semi-transparent copy following the cursor.
    pub fn preview(&self) -> Option<&Shape> {
        self.preview.as_ref()
    }

    /// Topmost copyable shape under `latlng`.
    pub fn pick(shapes: &ShapeCollection, latlng: LatLng, projection: &Projection) -> Option<ShapeId> {
        let ordered: Vec<&Shape> = shapes.ordered().collect();
        ordered
            .into_iter()
            .rev()
            .find(|s| is_copyable(s) && shape_contains_point(s, latlng, projection))
            .map(Shape::id)
    }

    /// Make `shape` the source. Returns `false` when it already is.
    pub fn select(&mut self, shape: &Shape) -> bool {
        if self.source() == Some(shape.id()) {
            return false;
        }
        let Some(center) = source_center(shape) else {
            return false;
        };
        self.source = Some((shape.id(), center));
        let mut preview = translated(shape, center, center);
        let style = preview.style_mut();
        style.opacity = PREVIEW_OPACITY;
        style.fill_opacity = PREVIEW_FILL_OPACITY;
        *preview.flags_mut() = ShapeFlags::temporary();
        log::debug!("copy source {}", shape.id());
        self.preview = Some(preview);
        true
    }

    /// Move the preview so the source center sits at `latlng`.
    pub fn pointer_move(&mut self, latlng: LatLng) -> Option<&Shape> {
        let preview = self.preview.as_mut()?;
        let anchor = source_center(preview)?;
        offset_shape(preview, anchor, latlng);
        self.preview.as_ref()
    }

    /// A full copy of the source centred on `latlng`.
    pub fn place(&self, shapes: &ShapeCollection, latlng: LatLng) -> Option<Shape> {
        let (id, center) = self.source?;
        let source = shapes.get(id)?;
        Some(translated(source, center, latlng))
    }

    pub fn reset(&mut self) {
        self.source = None;
        self.preview = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Circle, Marker, Polygon, Polyline, SnapInfo, Zone, ZoneGroup};

    fn ll(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng)
    }

    fn square() -> Shape {
        Shape::Polygon(Polygon::from_latlngs(vec![
            ll(0.0, 0.0),
            ll(0.0, 1.0),
            ll(1.0, 1.0),
            ll(1.0, 0.0),
        ]))
    }

    #[test]
    fn test_source_center() {
        assert_eq!(source_center(&square()), Some(ll(0.5, 0.5)));
        let circle = Shape::Circle(Circle::new(ll(3.0, 4.0), 10.0));
        assert_eq!(source_center(&circle), Some(ll(3.0, 4.0)));
    }

    #[test]
    fn test_contains_point() {
        let projection = Projection::default();
        assert!(shape_contains_point(&square(), ll(0.2, 0.9), &projection));
        assert!(!shape_contains_point(&square(), ll(1.2, 0.9), &projection));

        let circle = Shape::Circle(Circle::new(ll(0.0, 0.0), 1000.0));
        assert!(shape_contains_point(&circle, ll(0.005, 0.0), &projection));
        assert!(!shape_contains_point(&circle, ll(0.0, 0.01), &projection));

        let marker = Shape::Marker(Marker::new(ll(0.0, 0.0)));
        let near = projection.unproject(projection.project(ll(0.0, 0.0)) + kurbo::Vec2::new(6.0, 0.0));
        let far = projection.unproject(projection.project(ll(0.0, 0.0)) + kurbo::Vec2::new(12.0, 0.0));
        assert!(shape_contains_point(&marker, near, &projection));
        assert!(!shape_contains_point(&marker, far, &projection));
    }

    #[test]
    fn test_translated_offsets_every_vertex() {
        let source = square();
        let copy = translated(&source, ll(0.5, 0.5), ll(10.5, 20.5));
        assert_ne!(copy.id(), source.id());
        assert_eq!(
            copy.latlngs(),
            vec![ll(10.0, 20.0), ll(10.0, 21.0), ll(11.0, 21.0), ll(11.0, 20.0)]
        );
        assert_eq!(copy.style(), source.style());
    }

    #[test]
    fn test_translated_drops_snap_info() {
        let snapped = Vertex::snapped(
            ll(0.0, 0.0),
            SnapInfo {
                shape: uuid::Uuid::new_v4(),
                segment: None,
                distance: 1.0,
            },
        );
        let line = Shape::Polyline(Polyline::new(vec![snapped, Vertex::new(ll(0.0, 1.0))]));
        let Shape::Polyline(copy) = translated(&line, ll(0.0, 0.0), ll(1.0, 0.0)) else {
            panic!("expected a polyline");
        };
        assert!(copy.vertices.iter().all(|v| !v.is_snapped()));
    }

    #[test]
    fn test_tool_select_preview_place() {
        let mut shapes = ShapeCollection::new();
        let id = shapes.add(square()).unwrap();
        let projection = Projection::default();

        let mut tool = CopyTool::new();
        assert!(tool.place(&shapes, ll(5.0, 5.0)).is_none());
        assert_eq!(CopyTool::pick(&shapes, ll(0.5, 0.5), &projection), Some(id));
        assert!(tool.select(shapes.get(id).unwrap()));
        assert!(!tool.select(shapes.get(id).unwrap()));

        let preview = tool.pointer_move(ll(2.5, 2.5)).unwrap().clone();
        assert!(preview.is_temporary());
        assert!((preview.style().opacity - 0.5).abs() < f64::EPSILON);
        assert_eq!(source_center(&preview), Some(ll(2.5, 2.5)));

        let copy = tool.place(&shapes, ll(2.5, 2.5)).unwrap();
        assert!(!copy.is_temporary());
        assert!((copy.style().opacity - 1.0).abs() < f64::EPSILON);
        assert_eq!(copy.latlngs()[0], ll(2.0, 2.0));

        tool.reset();
        assert!(tool.source().is_none() && tool.preview().is_none());
    }

    #[test]
    fn test_zones_not_copyable() {
        let zones = Shape::Zones(ZoneGroup::new(ll(0.0, 0.0), &Zone::defaults()));
        assert!(!is_copyable(&zones));
        assert!(is_copyable(&square()));
    }
}

//! Snap functionality for attaching the cursor to nearby shape geometry.
//!
//! All distances are measured in projected pixel space so that a threshold of
//! 20 means 20 screen pixels regardless of zoom level.

use crate::geodesic::{self, LatLng, Projection};
use crate::shapes::{Shape, ShapeId, ShapeKind, SnapInfo, closest_point_on_segment};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Default snap threshold in pixels.
pub const DEFAULT_SNAP_DISTANCE: f64 = 20.0;

/// Distances closer than this are considered tied.
const TIE_EPSILON: f64 = 1e-9;

/// Type of snap target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapTargetKind {
    /// A stored vertex (or a marker's position).
    Vertex,
    /// The projection of the cursor onto an edge.
    Edge,
    /// Circle center.
    Center,
    /// Closest point on a circle's circumference.
    Circumference,
}

impl SnapTargetKind {
    /// Point-like targets win ties against edge-like ones.
    fn rank(self) -> u8 {
        match self {
            SnapTargetKind::Vertex | SnapTargetKind::Center => 0,
            SnapTargetKind::Edge | SnapTargetKind::Circumference => 1,
        }
    }
}

/// A snap target point produced from one shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTarget {
    pub latlng: LatLng,
    /// Projected position in pixels.
    pub point: Point,
    pub kind: SnapTargetKind,
    /// Owning segment for edge targets.
    pub segment: Option<(LatLng, LatLng)>,
}

/// The best attachable point found for a cursor position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapCandidate {
    pub shape: ShapeId,
    pub shape_kind: ShapeKind,
    pub latlng: LatLng,
    pub target: SnapTargetKind,
    /// `None` for vertex matches.
    pub segment: Option<(LatLng, LatLng)>,
    /// Pixel distance from the cursor.
    pub distance: f64,
}

impl SnapCandidate {
    pub fn is_vertex(&self) -> bool {
        self.target.rank() == 0
    }

    /// Provenance recorded on the vertex placed at this candidate.
    pub fn snap_info(&self) -> SnapInfo {
        SnapInfo {
            shape: self.shape,
            segment: self.segment,
            distance: self.distance,
        }
    }
}

/// Parameters of a snap search.
#[derive(Debug, Clone, Copy)]
pub struct SnapQuery<'a> {
    /// Maximum pixel distance (inclusive).
    pub threshold: f64,
    /// Shape kinds that may be snapped to, earlier entries win ties.
    pub priority: &'a [ShapeKind],
    /// A vertex no further than this beyond the best edge point is taken instead.
    pub vertex_bias: f64,
}

impl<'a> SnapQuery<'a> {
    pub fn new(threshold: f64, priority: &'a [ShapeKind]) -> Self {
        Self {
            threshold,
            priority,
            vertex_bias: 0.0,
        }
    }

    pub fn with_vertex_bias(mut self, bias: f64) -> Self {
        self.vertex_bias = bias.max(0.0);
        self
    }

    fn rank(&self, kind: ShapeKind) -> Option<usize> {
        self.priority.iter().position(|k| *k == kind)
    }
}

/// Snap targets of `shape` nearest to `cursor`: every vertex, plus the
/// clamped projection onto every edge.
pub fn snap_targets(shape: &Shape, cursor: Point, projection: &Projection) -> Vec<SnapTarget> {
    let target = |latlng: LatLng, kind, segment| SnapTarget {
        latlng,
        point: projection.project(latlng),
        kind,
        segment,
    };

    match shape {
        Shape::Circle(circle) => {
            let cursor_latlng = projection.unproject(cursor);
            let bearing = if cursor_latlng.approx_eq(circle.center, 1e-12) {
                0.0
            } else {
                geodesic::bearing(circle.center, cursor_latlng)
            };
            vec![
                target(circle.center, SnapTargetKind::Center, None),
                target(circle.point_at(bearing), SnapTargetKind::Circumference, None),
            ]
        }
        _ => {
            let mut targets: Vec<SnapTarget> = shape
                .latlngs()
                .into_iter()
                .map(|ll| target(ll, SnapTargetKind::Vertex, None))
                .collect();
            for (a, b) in shape.segments() {
                let pa = projection.project(a);
                let pb = projection.project(b);
                let (closest, _) = closest_point_on_segment(cursor, pa, pb);
                targets.push(SnapTarget {
                    latlng: projection.unproject(closest),
                    point: closest,
                    kind: SnapTargetKind::Edge,
                    segment: Some((a, b)),
                });
            }
            targets
        }
    }
}

/// Find the closest attachable point within `query.threshold` pixels of `cursor`.
///
/// Temporary and ignored shapes, and kinds missing from the priority list,
/// are skipped. Returns `None` when nothing is close enough.
pub fn find_snap<'s, I>(
    cursor: LatLng,
    candidates: I,
    query: &SnapQuery<'_>,
    projection: &Projection,
) -> Option<SnapCandidate>
where
    I: IntoIterator<Item = &'s Shape>,
{
    let cursor_px = projection.project(cursor);
    let mut best: Option<(SnapCandidate, usize)> = None;
    let mut vertices: Vec<(SnapCandidate, usize)> = Vec::new();

    for shape in candidates {
        if !shape.is_editable() {
            continue;
        }
        let Some(rank) = query.rank(shape.kind()) else {
            continue;
        };
        for target in snap_targets(shape, cursor_px, projection) {
            let distance = cursor_px.distance(target.point);
            if !distance.is_finite() || distance > query.threshold {
                continue;
            }
            let candidate = SnapCandidate {
                shape: shape.id(),
                shape_kind: shape.kind(),
                latlng: target.latlng,
                target: target.kind,
                segment: target.segment,
                distance,
            };
            if candidate.is_vertex() {
                vertices.push((candidate, rank));
            }
            if best
                .as_ref()
                .is_none_or(|current| is_better((&candidate, rank), (&current.0, current.1)))
            {
                best = Some((candidate, rank));
            }
        }
    }

    let (best, _) = best?;
    if best.is_vertex() || query.vertex_bias <= 0.0 {
        return Some(best);
    }

    // Prefer an endpoint of the winning segment when it is nearly as close.
    let Some((a, b)) = best.segment else {
        return Some(best);
    };
    let endpoint = vertices
        .into_iter()
        .filter(|(v, _)| v.shape == best.shape && (v.latlng == a || v.latlng == b))
        .filter(|(v, _)| v.distance - best.distance < query.vertex_bias)
        .min_by(|x, y| x.0.distance.total_cmp(&y.0.distance));
    Some(endpoint.map_or(best, |(v, _)| v))
}

fn is_better(a: (&SnapCandidate, usize), b: (&SnapCandidate, usize)) -> bool {
    let (ca, ra) = a;
    let (cb, rb) = b;
    if (ca.distance - cb.distance).abs() > TIE_EPSILON {
        return ca.distance < cb.distance;
    }
    if ra != rb {
        return ra < rb;
    }
    ca.target.rank() < cb.target.rank()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Circle, Marker, Polygon, Polyline};

    const PRIORITY: [ShapeKind; 5] = [
        ShapeKind::Marker,
        ShapeKind::Polyline,
        ShapeKind::Arrow,
        ShapeKind::Polygon,
        ShapeKind::Circle,
    ];

    fn projection() -> Projection {
        Projection::new(13.0)
    }

    /// Coordinate `dx`, `dy` pixels away from `origin`.
    fn offset(origin: LatLng, dx: f64, dy: f64) -> LatLng {
        let p = projection();
        p.unproject(p.project(origin) + kurbo::Vec2::new(dx, dy))
    }

    #[test]
    fn test_snap_to_vertex_within_threshold() {
        let origin = LatLng::new(48.0, 11.0);
        let marker = Shape::Marker(Marker::new(origin));
        let cursor = offset(origin, 5.0, 0.0);

        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &PRIORITY);
        let hit = find_snap(cursor, [&marker], &query, &projection()).unwrap();
        assert_eq!(hit.shape, marker.id());
        assert!(hit.latlng.approx_eq(origin, 1e-12));
        assert!((hit.distance - 5.0).abs() < 1e-6);
        assert!(hit.segment.is_none());
    }

    #[test]
    fn test_no_snap_beyond_threshold() {
        let origin = LatLng::new(48.0, 11.0);
        let marker = Shape::Marker(Marker::new(origin));
        let cursor = offset(origin, 25.0, 0.0);

        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &PRIORITY);
        assert!(find_snap(cursor, [&marker], &query, &projection()).is_none());
    }

    #[test]
    fn test_snap_to_edge_projection() {
        let a = LatLng::new(48.0, 11.0);
        let b = offset(a, 200.0, 0.0);
        let line = Shape::Polyline(Polyline::from_latlngs(vec![a, b]));
        let cursor = offset(a, 100.0, 8.0);

        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &PRIORITY);
        let hit = find_snap(cursor, [&line], &query, &projection()).unwrap();
        assert_eq!(hit.target, SnapTargetKind::Edge);
        assert_eq!(hit.segment, Some((a, b)));
        assert!((hit.distance - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_polygon_closing_edge_is_snappable() {
        let a = LatLng::new(48.0, 11.0);
        let b = offset(a, 200.0, 0.0);
        let c = offset(a, 200.0, 200.0);
        let d = offset(a, 0.0, 200.0);
        let polygon = Shape::Polygon(Polygon::from_latlngs(vec![a, b, c, d]));
        // Left edge d→a is the closing edge.
        let cursor = offset(a, 3.0, 100.0);

        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &PRIORITY);
        let hit = find_snap(cursor, [&polygon], &query, &projection()).unwrap();
        assert_eq!(hit.segment, Some((d, a)));
    }

    #[test]
    fn test_tie_broken_by_priority_order() {
        let origin = LatLng::new(48.0, 11.0);
        let marker = Shape::Marker(Marker::new(origin));
        let line = Shape::Polyline(Polyline::from_latlngs(vec![origin, offset(origin, 100.0, 0.0)]));
        let cursor = offset(origin, 0.0, 4.0);

        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &PRIORITY);
        let hit = find_snap(cursor, [&line, &marker], &query, &projection()).unwrap();
        assert_eq!(hit.shape, marker.id());

        let reversed = [ShapeKind::Polyline, ShapeKind::Marker];
        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &reversed);
        let hit = find_snap(cursor, [&marker, &line], &query, &projection()).unwrap();
        assert_eq!(hit.shape, line.id());
        // Vertex beats the edge point at the same distance.
        assert_eq!(hit.target, SnapTargetKind::Vertex);
    }

    #[test]
    fn test_kind_outside_priority_ignored() {
        let origin = LatLng::new(48.0, 11.0);
        let marker = Shape::Marker(Marker::new(origin));
        let only_lines = [ShapeKind::Polyline];
        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &only_lines);
        assert!(find_snap(origin, [&marker], &query, &projection()).is_none());
    }

    #[test]
    fn test_ignored_and_temporary_shapes_skipped() {
        let origin = LatLng::new(48.0, 11.0);
        let mut ignored = Marker::new(origin);
        ignored.flags.ignore = true;
        let mut temporary = Marker::new(origin);
        temporary.flags.temporary = true;
        let shapes = [Shape::Marker(ignored), Shape::Marker(temporary)];

        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &PRIORITY);
        assert!(find_snap(origin, &shapes, &query, &projection()).is_none());
    }

    #[test]
    fn test_vertex_bias_prefers_endpoint() {
        let a = LatLng::new(48.0, 11.0);
        let b = offset(a, 200.0, 0.0);
        let line = Shape::Polyline(Polyline::from_latlngs(vec![a, b]));
        // 6 px right of `a`, 3 px off the edge: edge is closer than the vertex.
        let cursor = offset(a, 6.0, 3.0);

        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &PRIORITY);
        let hit = find_snap(cursor, [&line], &query, &projection()).unwrap();
        assert_eq!(hit.target, SnapTargetKind::Edge);

        let query = query.with_vertex_bias(5.0);
        let hit = find_snap(cursor, [&line], &query, &projection()).unwrap();
        assert_eq!(hit.target, SnapTargetKind::Vertex);
        assert_eq!(hit.latlng, a);
    }

    #[test]
    fn test_snap_to_circle_circumference() {
        let center = LatLng::new(48.0, 11.0);
        let circle = Shape::Circle(Circle::new(center, 500.0));
        let edge = projection().project(geodesic::destination_point(center, 500.0, 90.0));
        let cursor = projection().unproject(edge + kurbo::Vec2::new(4.0, 0.0));

        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &PRIORITY);
        let hit = find_snap(cursor, [&circle], &query, &projection()).unwrap();
        assert_eq!(hit.target, SnapTargetKind::Circumference);
        let d = geodesic::distance(center, hit.latlng);
        assert!((d - 500.0).abs() < 1e-3);
    }

    #[test]
    fn test_snap_to_circle_center() {
        let center = LatLng::new(48.0, 11.0);
        let circle = Shape::Circle(Circle::new(center, 5000.0));
        let cursor = offset(center, 2.0, 2.0);

        let query = SnapQuery::new(DEFAULT_SNAP_DISTANCE, &PRIORITY);
        let hit = find_snap(cursor, [&circle], &query, &projection()).unwrap();
        assert_eq!(hit.target, SnapTargetKind::Center);
        assert_eq!(hit.latlng, center);
    }
}

//! Cutting shapes with a polygon.
//!
//! The cut engine prepares boolean operands for every eligible target, asks a
//! [`BooleanOps`] implementation for the difference (or the line split), and
//! flattens whatever comes back into independent shapes. A failure on one
//! target never affects the others.

use crate::boolean::{BooleanOps, Geometry, GeometryError, Position};
use crate::config::CutOptions;
use crate::geodesic::{self, LatLng, LatLngBounds, Projection};
use crate::shapes::{
    Polygon, Polyline, Shape, ShapeId, ShapeKind, ShapeStyle, ShapeTrait, Vertex,
    closest_point_on_segment, ring_segments,
};

/// Below this area (m²) a cutting polygon is treated as degenerate.
const MIN_CUTTING_AREA: f64 = 1e-6;

/// A target replaced by the pieces left after the cut.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub original: ShapeId,
    pub fragments: Vec<Shape>,
}

/// A target the boolean library failed on; it stays untouched.
#[derive(Debug)]
pub struct CutFailure {
    pub shape: ShapeId,
    pub error: GeometryError,
}

/// Everything a single cut produced.
#[derive(Debug, Default)]
pub struct CutOutcome {
    pub replacements: Vec<Replacement>,
    pub failures: Vec<CutFailure>,
    /// Bounds of the cutting polygon.
    pub cutting_extent: Option<LatLngBounds>,
}

impl CutOutcome {
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.failures.is_empty()
    }

    pub fn fragment_count(&self) -> usize {
        self.replacements.iter().map(|r| r.fragments.len()).sum()
    }
}

/// Pieces of a boolean result, before styling.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// An open ring (closing coordinate dropped).
    Polygon(Vec<LatLng>),
    Line(Vec<LatLng>),
}

/// Applies a cutting polygon to a set of shapes.
pub struct Cutter<'a> {
    ops: &'a dyn BooleanOps,
    projection: &'a Projection,
    options: &'a CutOptions,
}

impl<'a> Cutter<'a> {
    pub fn new(ops: &'a dyn BooleanOps, projection: &'a Projection, options: &'a CutOptions) -> Self {
        Self {
            ops,
            projection,
            options,
        }
    }

    /// Whether `shape` may be cut by `cutting` at all.
    pub fn is_eligible(&self, cutting: &Polygon, shape: &Shape) -> bool {
        let kind_ok = matches!(
            shape.kind(),
            ShapeKind::Polyline | ShapeKind::Polygon | ShapeKind::Circle | ShapeKind::Arrow
        );
        kind_ok
            && shape.id() != cutting.id()
            && shape.is_editable()
            && shape.flags().allow_cutting
            && self.options.allows(shape.id())
    }

    /// Cut every eligible shape in `shapes` with `cutting`.
    ///
    /// Snapped cutting vertices (those carrying `SnapInfo`) are inserted into
    /// polygon targets before the difference so the cut runs exactly through them.
    pub fn cut<'s, I>(&self, cutting: &Polygon, shapes: I) -> CutOutcome
    where
        I: IntoIterator<Item = &'s Shape>,
    {
        let mut outcome = CutOutcome::default();
        let ring = cutting.latlngs();
        if ring.len() < 3 || geodesic::ring_area(&ring) < MIN_CUTTING_AREA {
            log::debug!("cutting polygon is degenerate, nothing to cut");
            return outcome;
        }
        let cutting_bounds = cutting.bounds();
        outcome.cutting_extent = cutting_bounds;
        let cutting_geometry = cutting.to_geometry();
        let cutting_boundary =
            Geometry::LineString(cutting.closed_ring().into_iter().map(LatLng::to_position).collect());
        let snapped: Vec<Vertex> = cutting
            .vertices
            .iter()
            .copied()
            .filter(Vertex::is_snapped)
            .collect();

        for shape in shapes {
            if !self.is_eligible(cutting, shape) {
                continue;
            }
            let id = shape.id();
            let result = self
                .overlaps(shape, &cutting_geometry, &cutting_boundary, cutting_bounds)
                .and_then(|overlaps| {
                    if overlaps {
                        self.cut_one(shape, &cutting_geometry, &snapped)
                    } else {
                        Ok(None)
                    }
                });
            match result {
                Ok(Some(fragments)) => {
                    log::debug!("cut {id} into {} fragment(s)", fragments.len());
                    outcome.replacements.push(Replacement {
                        original: id,
                        fragments,
                    });
                }
                Ok(None) => {}
                Err(error) => {
                    log::warn!("cutting {id} failed, leaving it untouched: {error}");
                    outcome.failures.push(CutFailure { shape: id, error });
                }
            }
        }

        log::info!(
            "cut replaced {} shape(s) with {} fragment(s), {} failure(s)",
            outcome.replacements.len(),
            outcome.fragment_count(),
            outcome.failures.len()
        );
        outcome
    }

    /// Cheap test whether the cutting polygon touches `shape`.
    fn overlaps(
        &self,
        shape: &Shape,
        cutting: &Geometry,
        cutting_boundary: &Geometry,
        cutting_bounds: Option<LatLngBounds>,
    ) -> Result<bool, GeometryError> {
        match shape {
            Shape::Circle(circle) => Ok(match (circle.bounds(), cutting_bounds) {
                (Some(a), Some(b)) => a.intersects(&b),
                _ => false,
            }),
            Shape::Polyline(_) | Shape::Arrow(_) => {
                let line = self.geometry(shape)?;
                self.ops.intersects(cutting_boundary, &line)
            }
            Shape::Polygon(polygon) => {
                let boundary = Geometry::LineString(
                    polygon.closed_ring().into_iter().map(LatLng::to_position).collect(),
                );
                if self.ops.intersects(cutting_boundary, &boundary)? {
                    return Ok(true);
                }
                self.ops.intersects(cutting, &polygon.to_geometry())
            }
            Shape::Marker(_) | Shape::Zones(_) => Ok(false),
        }
    }

    fn geometry(&self, shape: &Shape) -> Result<Geometry, GeometryError> {
        shape
            .to_geometry(self.options.circle_segments)
            .ok_or_else(|| GeometryError::Malformed(format!("{} has no geometry", shape.kind())))
    }

    /// Fragments replacing `shape`, or `None` when the result is empty.
    fn cut_one(
        &self,
        shape: &Shape,
        cutting: &Geometry,
        snapped: &[Vertex],
    ) -> Result<Option<Vec<Shape>>, GeometryError> {
        let style = shape.style().clone();
        let fragments = match shape {
            Shape::Circle(_) => {
                let result = self.ops.difference(&self.geometry(shape)?, cutting)?;
                result.map(decompose).unwrap_or_default()
            }
            Shape::Polygon(polygon) => {
                let mut ring = polygon.latlngs();
                insert_snapped_vertices(&mut ring, snapped, self.projection, self.options.snap_distance);
                let subject = Polygon::from_latlngs(ring).to_geometry();
                let result = self.ops.difference(&subject, cutting)?;
                result.map(decompose).unwrap_or_default()
            }
            Shape::Polyline(_) | Shape::Arrow(_) => {
                let line = self.geometry(shape)?;
                let pieces = match self.ops.split_line(&line, cutting)? {
                    Some(split) => decompose(split),
                    None => decompose(line),
                };
                let mut kept = Vec::new();
                for piece in pieces {
                    let Fragment::Line(latlngs) = &piece else {
                        continue;
                    };
                    let candidate = Geometry::LineString(
                        latlngs.iter().copied().map(LatLng::to_position).collect(),
                    );
                    if !self.ops.bounded_contains(cutting, &candidate)? {
                        kept.push(piece);
                    }
                }
                kept
            }
            Shape::Marker(_) | Shape::Zones(_) => Vec::new(),
        };

        if fragments.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            fragments
                .into_iter()
                .map(|f| build_fragment(shape, f, &style))
                .collect(),
        ))
    }
}

fn build_fragment(original: &Shape, fragment: Fragment, style: &ShapeStyle) -> Shape {
    match fragment {
        Fragment::Polygon(ring) => {
            Shape::Polygon(Polygon::from_latlngs(ring).with_style(style.clone()))
        }
        Fragment::Line(latlngs) => {
            let mut line = Polyline::from_latlngs(latlngs).with_style(style.clone());
            if let Shape::Polyline(source) = original {
                line.distance_interval = source.distance_interval;
            }
            Shape::Polyline(line)
        }
    }
}

/// Index at which a coordinate lying on `segment` is inserted into `ring`.
///
/// The larger endpoint index is used, except that a segment touching index 0
/// (other than `0→1`) is the closing edge and inserts at the end.
pub fn index_from_segment(ring: &[LatLng], segment: (LatLng, LatLng)) -> Option<usize> {
    let a = ring.iter().position(|p| *p == segment.0)?;
    let b = ring.iter().position(|p| *p == segment.1)?;
    let mut index = a.max(b);
    if (a == 0 || b == 0) && index != 1 {
        index += 1;
    }
    Some(index)
}

/// Insert each snapped coordinate into the ring segment it lies closest to,
/// when that segment is within `snap_distance` pixels.
pub fn insert_snapped_vertices(
    ring: &mut Vec<LatLng>,
    snapped: &[Vertex],
    projection: &Projection,
    snap_distance: f64,
) {
    for vertex in snapped {
        let latlng = vertex.latlng;
        if ring.iter().any(|p| p.approx_eq(latlng, 1e-12)) {
            continue;
        }
        let point = projection.project(latlng);
        let closest = ring_segments(ring)
            .into_iter()
            .map(|(a, b)| {
                let (on, _) =
                    closest_point_on_segment(point, projection.project(a), projection.project(b));
                ((a, b), on.distance(point))
            })
            .min_by(|x, y| x.1.total_cmp(&y.1));
        let Some((segment, distance)) = closest else {
            continue;
        };
        if distance >= snap_distance {
            continue;
        }
        if let Some(index) = index_from_segment(ring, segment) {
            ring.insert(index, latlng);
        }
    }
}

fn open_ring(ring: &[Position]) -> Vec<LatLng> {
    let mut latlngs: Vec<LatLng> = ring.iter().copied().map(LatLng::from_position).collect();
    if latlngs.len() > 1 && latlngs.first() == latlngs.last() {
        latlngs.pop();
    }
    latlngs
}

/// Flatten a boolean result into independent pieces.
///
/// Multi geometries and collections are walked recursively. Every ring of a
/// polygon becomes its own filled piece, so holes are not preserved. This
/// holds for each part of a multipolygon as well: a part with a hole yields
/// one piece for its outer ring and one per interior ring. Points and
/// degenerate rings/lines are dropped.
pub fn decompose(geometry: Geometry) -> Vec<Fragment> {
    let mut out = Vec::new();
    decompose_into(geometry, &mut out);
    out
}

fn decompose_into(geometry: Geometry, out: &mut Vec<Fragment>) {
    match geometry {
        Geometry::Point(_) => {}
        Geometry::LineString(line) => push_line(&line, out),
        Geometry::MultiLineString(lines) => lines.iter().for_each(|l| push_line(l, out)),
        Geometry::Polygon(rings) => rings.iter().for_each(|r| push_ring(r, out)),
        Geometry::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .for_each(|r| push_ring(r, out)),
        Geometry::GeometryCollection(items) | Geometry::FeatureCollection(items) => {
            items.into_iter().for_each(|g| decompose_into(g, out))
        }
    }
}

fn push_line(line: &[Position], out: &mut Vec<Fragment>) {
    if line.len() >= 2 {
        out.push(Fragment::Line(
            line.iter().copied().map(LatLng::from_position).collect(),
        ));
    }
}

fn push_ring(ring: &[Position], out: &mut Vec<Fragment>) {
    let latlngs = open_ring(ring);
    if latlngs.len() >= 3 {
        out.push(Fragment::Polygon(latlngs));
    }
}

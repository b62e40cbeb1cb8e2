//! Boolean-operations contract used by the cut engine, plus the default
//! adapter built on the `geo` crate.

use geo::{BooleanOps as _, Contains, Coord, Intersects};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use thiserror::Error;

use crate::shapes::closest_point_on_segment;

/// A `[lng, lat]` position.
pub type Position = [f64; 2];

/// A closed ring: first position repeated last.
pub type Ring = Vec<Position>;

/// Geometry tree exchanged with the boolean-operations library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Ring>),
    MultiLineString(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Ring>>),
    GeometryCollection(Vec<Geometry>),
    FeatureCollection(Vec<Geometry>),
}

impl Geometry {
    /// True when the geometry holds no coordinates at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_) => false,
            Geometry::LineString(line) => line.is_empty(),
            Geometry::Polygon(rings) => rings.iter().all(Vec::is_empty),
            Geometry::MultiLineString(lines) => lines.iter().all(Vec::is_empty),
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().all(|rings| rings.iter().all(Vec::is_empty))
            }
            Geometry::GeometryCollection(items) | Geometry::FeatureCollection(items) => {
                items.iter().all(Geometry::is_empty)
            }
        }
    }

    /// Every position in the tree, in order.
    pub fn positions(&self) -> Vec<Position> {
        let mut out = Vec::new();
        self.collect_positions(&mut out);
        out
    }

    fn collect_positions(&self, out: &mut Vec<Position>) {
        match self {
            Geometry::Point(p) => out.push(*p),
            Geometry::LineString(line) => out.extend(line),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                rings.iter().for_each(|r| out.extend(r))
            }
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .flatten()
                .for_each(|r| out.extend(r)),
            Geometry::GeometryCollection(items) | Geometry::FeatureCollection(items) => {
                items.iter().for_each(|g| g.collect_positions(out))
            }
        }
    }
}

/// Errors reported by a boolean-operations implementation.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Input that the library cannot represent.
    #[error("malformed geometry: {0}")]
    Malformed(String),
    /// The library failed while computing a result.
    #[error("boolean operation failed: {0}")]
    Backend(String),
    /// Operand combination the operation does not handle.
    #[error("unsupported operands for {op}: {subject} / {clip}")]
    Unsupported {
        op: &'static str,
        subject: &'static str,
        clip: &'static str,
    },
}

/// The 2-D boolean operations needed to cut shapes.
///
/// `Ok(None)` means "no result" and is not an error.
pub trait BooleanOps {
    /// Area of `subject` not covered by `clip`.
    fn difference(
        &self,
        subject: &Geometry,
        clip: &Geometry,
    ) -> Result<Option<Geometry>, GeometryError>;

    /// Whether the two geometries share at least one point.
    fn intersects(&self, a: &Geometry, b: &Geometry) -> Result<bool, GeometryError>;

    /// Split a line where it crosses the boundary of `clip`.
    fn split_line(&self, line: &Geometry, clip: &Geometry)
    -> Result<Option<Geometry>, GeometryError>;

    /// Whether `inner` lies within `outer`, boundary included, touching its interior.
    fn bounded_contains(&self, outer: &Geometry, inner: &Geometry) -> Result<bool, GeometryError>;
}

/// Boundary tolerance in degrees used by [`GeoBooleanOps::bounded_contains`].
const BOUNDARY_TOLERANCE: f64 = 1e-9;

/// [`BooleanOps`] on top of the `geo` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoBooleanOps;

impl GeoBooleanOps {
    pub fn new() -> Self {
        Self
    }
}

fn kind_name(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::FeatureCollection(_) => "FeatureCollection",
    }
}

fn coord(position: &Position) -> Result<Coord<f64>, GeometryError> {
    let [x, y] = *position;
    if !x.is_finite() || !y.is_finite() {
        return Err(GeometryError::Malformed(format!(
            "non-finite coordinate [{x}, {y}]"
        )));
    }
    Ok(Coord { x, y })
}

fn line_string(positions: &[Position]) -> Result<geo::LineString<f64>, GeometryError> {
    positions
        .iter()
        .map(coord)
        .collect::<Result<Vec<_>, _>>()
        .map(geo::LineString::new)
}

fn ring(positions: &[Position]) -> Result<geo::LineString<f64>, GeometryError> {
    if positions.len() < 4 {
        return Err(GeometryError::Malformed(format!(
            "ring has {} positions, at least 4 required",
            positions.len()
        )));
    }
    line_string(positions)
}

fn polygon(rings: &[Ring]) -> Result<geo::Polygon<f64>, GeometryError> {
    let Some((exterior, interiors)) = rings.split_first() else {
        return Err(GeometryError::Malformed("polygon without rings".into()));
    };
    let interiors = interiors
        .iter()
        .map(|r| ring(r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(geo::Polygon::new(ring(exterior)?, interiors))
}

fn multi_polygon(
    op: &'static str,
    subject: &Geometry,
    other: &Geometry,
) -> Result<geo::MultiPolygon<f64>, GeometryError> {
    match subject {
        Geometry::Polygon(rings) => Ok(geo::MultiPolygon::new(vec![polygon(rings)?])),
        Geometry::MultiPolygon(polygons) => polygons
            .iter()
            .map(|rings| polygon(rings))
            .collect::<Result<Vec<_>, _>>()
            .map(geo::MultiPolygon::new),
        _ => Err(GeometryError::Unsupported {
            op,
            subject: kind_name(subject),
            clip: kind_name(other),
        }),
    }
}

fn multi_line_string(
    op: &'static str,
    subject: &Geometry,
    other: &Geometry,
) -> Result<geo::MultiLineString<f64>, GeometryError> {
    match subject {
        Geometry::LineString(line) => Ok(geo::MultiLineString::new(vec![line_string(line)?])),
        Geometry::MultiLineString(lines) => lines
            .iter()
            .map(|l| line_string(l))
            .collect::<Result<Vec<_>, _>>()
            .map(geo::MultiLineString::new),
        _ => Err(GeometryError::Unsupported {
            op,
            subject: kind_name(subject),
            clip: kind_name(other),
        }),
    }
}

fn to_geo(geometry: &Geometry) -> Result<geo::Geometry<f64>, GeometryError> {
    Ok(match geometry {
        Geometry::Point(p) => geo::Geometry::Point(geo::Point::from(coord(p)?)),
        Geometry::LineString(line) => geo::Geometry::LineString(line_string(line)?),
        Geometry::Polygon(rings) => geo::Geometry::Polygon(polygon(rings)?),
        Geometry::MultiLineString(_) => {
            geo::Geometry::MultiLineString(multi_line_string("convert", geometry, geometry)?)
        }
        Geometry::MultiPolygon(_) => {
            geo::Geometry::MultiPolygon(multi_polygon("convert", geometry, geometry)?)
        }
        Geometry::GeometryCollection(items) | Geometry::FeatureCollection(items) => {
            geo::Geometry::GeometryCollection(geo::GeometryCollection::new_from(
                items.iter().map(to_geo).collect::<Result<Vec<_>, _>>()?,
            ))
        }
    })
}

fn positions(line: &geo::LineString<f64>) -> Vec<Position> {
    line.coords().map(|c| [c.x, c.y]).collect()
}

fn from_multi_polygon(mp: geo::MultiPolygon<f64>) -> Option<Geometry> {
    let polygons: Vec<Vec<Ring>> = mp
        .into_iter()
        .map(|p| {
            let (exterior, interiors) = p.into_inner();
            std::iter::once(exterior)
                .chain(interiors)
                .map(|r| positions(&r))
                .collect()
        })
        .collect();
    (!polygons.is_empty()).then_some(Geometry::MultiPolygon(polygons))
}

/// Run a library call, turning a panic into [`GeometryError::Backend`].
fn guarded<T>(op: &'static str, f: impl FnOnce() -> T) -> Result<T, GeometryError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        GeometryError::Backend(format!("{op}: {message}"))
    })
}

fn planar(c: Coord<f64>) -> Point {
    Point::new(c.x, c.y)
}

/// Point inside `polygon` or within the boundary tolerance of one of its rings.
fn covers_point(polygon: &geo::Polygon<f64>, c: Coord<f64>) -> bool {
    if polygon.contains(&c) {
        return true;
    }
    let p = planar(c);
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .flat_map(|r| r.lines())
        .any(|seg| {
            let (closest, _) = closest_point_on_segment(p, planar(seg.start), planar(seg.end));
            closest.distance(p) <= BOUNDARY_TOLERANCE
        })
}

fn covers_line(polygon: &geo::MultiPolygon<f64>, line: &geo::LineString<f64>) -> bool {
    if line.0.is_empty() {
        return false;
    }
    let on_or_in = line
        .coords()
        .all(|c| polygon.iter().any(|p| covers_point(p, *c)));
    // Some part has to run through the interior, not only along the boundary.
    let touches_interior = line.lines().any(|seg| {
        let mid = Coord {
            x: (seg.start.x + seg.end.x) / 2.0,
            y: (seg.start.y + seg.end.y) / 2.0,
        };
        polygon.iter().any(|p| p.contains(&mid))
    }) || (line.0.len() == 1 && polygon.iter().any(|p| p.contains(&line.0[0])));
    on_or_in && touches_interior
}

impl BooleanOps for GeoBooleanOps {
    fn difference(
        &self,
        subject: &Geometry,
        clip: &Geometry,
    ) -> Result<Option<Geometry>, GeometryError> {
        let a = multi_polygon("difference", subject, clip)?;
        let b = multi_polygon("difference", clip, subject)?;
        let result = guarded("difference", || a.difference(&b))?;
        Ok(from_multi_polygon(result))
    }

    fn intersects(&self, a: &Geometry, b: &Geometry) -> Result<bool, GeometryError> {
        let a = to_geo(a)?;
        let b = to_geo(b)?;
        guarded("intersects", || a.intersects(&b))
    }

    fn split_line(
        &self,
        line: &Geometry,
        clip: &Geometry,
    ) -> Result<Option<Geometry>, GeometryError> {
        let lines = multi_line_string("split_line", line, clip)?;
        let area = multi_polygon("split_line", clip, line)?;
        let (inside, outside) = guarded("split_line", || {
            (area.clip(&lines, false), area.clip(&lines, true))
        })?;
        let parts: Vec<Vec<Position>> = inside
            .iter()
            .chain(outside.iter())
            .filter(|l| l.0.len() >= 2)
            .map(positions)
            .collect();
        Ok((!parts.is_empty()).then_some(Geometry::MultiLineString(parts)))
    }

    fn bounded_contains(&self, outer: &Geometry, inner: &Geometry) -> Result<bool, GeometryError> {
        let area = multi_polygon("bounded_contains", outer, inner)?;
        match inner {
            Geometry::Point(p) => {
                let c = coord(p)?;
                Ok(area.iter().any(|p| covers_point(p, c)))
            }
            Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                let lines = multi_line_string("bounded_contains", inner, outer)?;
                if lines.0.is_empty() {
                    return Ok(false);
                }
                guarded("bounded_contains", || {
                    lines.iter().all(|line| covers_line(&area, line))
                })
            }
            _ => Err(GeometryError::Unsupported {
                op: "bounded_contains",
                subject: kind_name(outer),
                clip: kind_name(inner),
            }),
        }
    }
}

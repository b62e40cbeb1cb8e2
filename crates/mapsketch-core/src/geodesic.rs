//! Geodesic helpers on a spherical earth, plus the Web-Mercator projection
//! used to turn geographic coordinates into screen pixels.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Mean earth radius in metres used by the spherical formulas.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Below this angular separation (radians) two coordinates are treated as coincident.
const COINCIDENT_EPSILON: f64 = 1e-6;

/// Size of one map tile in pixels at zoom 0.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the spherical Mercator projection.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check whether two coordinates are equal within `epsilon` degrees.
    pub fn approx_eq(&self, other: LatLng, epsilon: f64) -> bool {
        (self.lat - other.lat).abs() <= epsilon && (self.lng - other.lng).abs() <= epsilon
    }

    /// Whether both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// Position in `[lng, lat]` order.
    pub fn to_position(self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Build from a `[lng, lat]` position.
    pub fn from_position(position: [f64; 2]) -> Self {
        Self::new(position[1], position[0])
    }
}

/// Axis-aligned geographic bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(a: LatLng, b: LatLng) -> Self {
        Self {
            south_west: LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    /// Smallest bounds containing every coordinate, `None` for an empty input.
    pub fn from_points<I: IntoIterator<Item = LatLng>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |acc, p| acc.extend(p)))
    }

    pub fn extend(self, point: LatLng) -> Self {
        Self {
            south_west: LatLng::new(
                self.south_west.lat.min(point.lat),
                self.south_west.lng.min(point.lng),
            ),
            north_east: LatLng::new(
                self.north_east.lat.max(point.lat),
                self.north_east.lng.max(point.lng),
            ),
        }
    }

    pub fn union(self, other: LatLngBounds) -> Self {
        self.extend(other.south_west).extend(other.north_east)
    }

    /// Closed-interval overlap test (touching bounds intersect).
    pub fn intersects(&self, other: &LatLngBounds) -> bool {
        self.south_west.lat <= other.north_east.lat
            && self.north_east.lat >= other.south_west.lat
            && self.south_west.lng <= other.north_east.lng
            && self.north_east.lng >= other.south_west.lng
    }

    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

/// Point reached by travelling `distance` metres from `origin` along the
/// initial `bearing` (degrees clockwise from north).
pub fn destination_point(origin: LatLng, distance: f64, bearing: f64) -> LatLng {
    let lat1 = origin.lat.to_radians();
    let lng1 = origin.lng.to_radians();
    let theta = bearing.to_radians();
    let delta = distance / EARTH_RADIUS;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lng2 = lng1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    LatLng::new(lat2.to_degrees(), lng2.to_degrees())
}

/// Great-circle distance in metres (haversine).
pub fn distance(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * h.sqrt().min(1.0).asin()
}

/// Initial bearing in degrees (0..360) from `a` towards `b`.
pub fn bearing(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Straight interpolation in degree space.
pub fn interpolate_linear(start: LatLng, end: LatLng, ratio: f64) -> LatLng {
    LatLng::new(
        start.lat + (end.lat - start.lat) * ratio,
        start.lng + (end.lng - start.lng) * ratio,
    )
}

/// Spherical interpolation between `start` (ratio 0) and `end` (ratio 1).
pub fn interpolate_along_great_circle(start: LatLng, end: LatLng, ratio: f64) -> LatLng {
    let lat1 = start.lat.to_radians();
    let lng1 = start.lng.to_radians();
    let lat2 = end.lat.to_radians();
    let lng2 = end.lng.to_radians();

    let cos_d = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lng2 - lng1).cos();
    let d = cos_d.clamp(-1.0, 1.0).acos();

    // sin(d) vanishes for coincident points
    if d < COINCIDENT_EPSILON {
        return interpolate_linear(start, end, ratio);
    }

    let a = ((1.0 - ratio) * d).sin() / d.sin();
    let b = (ratio * d).sin() / d.sin();

    let x = a * lat1.cos() * lng1.cos() + b * lat2.cos() * lng2.cos();
    let y = a * lat1.cos() * lng1.sin() + b * lat2.cos() * lng2.sin();
    let z = a * lat1.sin() + b * lat2.sin();

    let lat = z.atan2((x * x + y * y).sqrt());
    let lng = y.atan2(x);
    LatLng::new(lat.to_degrees(), lng.to_degrees())
}

/// Upper bound on the markers placed along one polyline.
pub const MAX_DISTANCE_MARKERS: usize = 10_000;

/// Positions at every whole multiple of `interval` metres along a polyline.
///
/// Returns an empty list for a non-positive interval or fewer than two vertices.
/// An interval that would exceed [`MAX_DISTANCE_MARKERS`] is widened to
/// spread that many markers over the whole length.
pub fn distance_markers(vertices: &[LatLng], interval: f64) -> Vec<LatLng> {
    let mut markers = Vec::new();
    if interval <= 0.0 || !interval.is_finite() || vertices.len() < 2 {
        return markers;
    }
    let total: f64 = vertices.windows(2).map(|w| distance(w[0], w[1])).sum();
    let min_interval = total / MAX_DISTANCE_MARKERS as f64;
    let interval = if interval < min_interval {
        log::debug!("distance marker interval {interval} m widened to {min_interval} m");
        min_interval
    } else {
        interval
    };

    let mut travelled = 0.0;
    for w in vertices.windows(2) {
        let (start, end) = (w[0], w[1]);
        let segment = distance(start, end);
        if segment <= f64::EPSILON {
            continue;
        }
        while travelled + segment >= (markers.len() + 1) as f64 * interval {
            let target = (markers.len() + 1) as f64 * interval;
            let ratio = (target - travelled) / segment;
            markers.push(interpolate_along_great_circle(start, end, ratio));
        }
        travelled += segment;
    }
    markers
}

/// Area of a ring in square metres using the spherical-excess approximation.
pub fn ring_area(ring: &[LatLng]) -> f64 {
    // WGS84 equatorial radius, as used by common web-map area measurements
    const AREA_RADIUS: f64 = 6_378_137.0;
    if ring.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for (i, p1) in ring.iter().enumerate() {
        let p2 = ring[(i + 1) % ring.len()];
        area += (p2.lng - p1.lng).to_radians()
            * (2.0 + p1.lat.to_radians().sin() + p2.lat.to_radians().sin());
    }
    (area * AREA_RADIUS * AREA_RADIUS / 2.0).abs()
}

/// Circumcenter of three planar points, `None` when they are collinear.
///
/// Solved relative to `a` to keep the determinant well conditioned for
/// large pixel coordinates.
pub fn circumcenter(a: Point, b: Point, c: Point) -> Option<Point> {
    let b = b - a;
    let c = c - a;
    let d = 2.0 * (b.x * c.y - c.x * b.y);
    if d.abs() < 1e-10 {
        return None;
    }
    let b2 = b.hypot2();
    let c2 = c.hypot2();
    let ux = (c.y * b2 - b.y * c2) / d;
    let uy = (b.x * c2 - c.x * b2) / d;
    Some(a + kurbo::Vec2::new(ux, uy))
}

/// Spherical Web-Mercator projection to pixel space at a zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub zoom: f64,
}

impl Default for Projection {
    fn default() -> Self {
        Self { zoom: 13.0 }
    }
}

impl Projection {
    pub fn new(zoom: f64) -> Self {
        Self { zoom }
    }

    /// World size in pixels at the current zoom.
    pub fn scale(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    pub fn project(&self, latlng: LatLng) -> Point {
        let scale = self.scale();
        let lat = latlng.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = scale * (latlng.lng + 180.0) / 360.0;
        let y = scale * (0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI));
        Point::new(x, y)
    }

    pub fn unproject(&self, point: Point) -> LatLng {
        let scale = self.scale();
        let lng = point.x / scale * 360.0 - 180.0;
        let lat = 2.0 * (PI * (1.0 - 2.0 * point.y / scale)).exp().atan() - PI / 2.0;
        LatLng::new(lat.to_degrees(), lng)
    }

    /// Pixel distance between two coordinates.
    pub fn pixel_distance(&self, a: LatLng, b: LatLng) -> f64 {
        self.project(a).distance(self.project(b))
    }
}

/// Midpoint of two coordinates computed in projected space.
pub fn calc_middle_latlng(projection: &Projection, a: LatLng, b: LatLng) -> LatLng {
    let pa = projection.project(a);
    let pb = projection.project(b);
    projection.unproject(pa.midpoint(pb))
}

//! Measurement read-outs for shapes (lengths, areas, radii, coordinates).

use crate::geodesic::{self, LatLng};
use crate::shapes::{Shape, ShapeTrait};
use serde::{Deserialize, Serialize};

const FEET_PER_METRE: f64 = 3.28084;
const SQ_FEET_PER_SQ_METRE: f64 = 10.7639;
const FEET_PER_MILE: f64 = 5280.0;
const SQ_FEET_PER_ACRE: f64 = 43560.0;

/// Unit system used when formatting measurements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayFormat {
    #[default]
    Metric,
    Imperial,
}

/// Format a distance given in metres.
pub fn format_distance(metres: f64, format: DisplayFormat) -> String {
    match format {
        DisplayFormat::Metric if metres >= 1000.0 => format!("{:.2} km", metres / 1000.0),
        DisplayFormat::Metric => format!("{metres:.2} m"),
        DisplayFormat::Imperial => {
            let feet = metres * FEET_PER_METRE;
            if feet >= FEET_PER_MILE {
                format!("{:.2} mi", feet / FEET_PER_MILE)
            } else {
                format!("{feet:.2} ft")
            }
        }
    }
}

/// Format an area given in square metres.
pub fn format_area(sq_metres: f64, format: DisplayFormat) -> String {
    match format {
        DisplayFormat::Metric if sq_metres >= 10_000.0 => {
            format!("{:.2} ha", sq_metres / 10_000.0)
        }
        DisplayFormat::Metric => format!("{sq_metres:.2} m²"),
        DisplayFormat::Imperial => {
            let sq_feet = sq_metres * SQ_FEET_PER_SQ_METRE;
            if sq_feet >= SQ_FEET_PER_ACRE {
                format!("{:.2} acres", sq_feet / SQ_FEET_PER_ACRE)
            } else {
                format!("{sq_feet:.2} ft²")
            }
        }
    }
}

/// Raw measurements of a shape. Fields that do not apply are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub coordinates: Option<LatLng>,
    pub radius: Option<f64>,
    pub area: Option<f64>,
    pub perimeter: Option<f64>,
    pub total_length: Option<f64>,
    pub segment_length: Option<f64>,
}

impl Measurements {
    /// Measure a shape.
    pub fn of(shape: &Shape) -> Self {
        match shape {
            Shape::Marker(marker) => Self {
                coordinates: Some(marker.latlng),
                ..Self::default()
            },
            Shape::Circle(circle) => Self {
                radius: Some(circle.radius),
                area: Some(circle.area()),
                perimeter: Some(circle.circumference()),
                ..Self::default()
            },
            Shape::Zones(zones) => Self {
                coordinates: Some(zones.center),
                radius: Some(zones.outer_radius()),
                ..Self::default()
            },
            Shape::Polyline(_) | Shape::Arrow(_) => Self::of_path(&shape.latlngs()),
            Shape::Polygon(polygon) => {
                let ring = polygon.latlngs();
                Self {
                    area: Some(polygon.area()),
                    perimeter: Some(polygon.perimeter()),
                    segment_length: last_segment(&ring),
                    ..Self::default()
                }
            }
        }
    }

    /// Measurements of an open path given by its vertices.
    pub fn of_path(latlngs: &[LatLng]) -> Self {
        let total = latlngs
            .windows(2)
            .map(|w| geodesic::distance(w[0], w[1]))
            .sum();
        Self {
            total_length: Some(total),
            segment_length: last_segment(latlngs),
            ..Self::default()
        }
    }

    /// Human-readable label/value pairs in display order.
    pub fn format(&self, format: DisplayFormat) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(ll) = self.coordinates {
            out.push(("coordinates", format!("{:.6}, {:.6}", ll.lat, ll.lng)));
        }
        let distances = [
            ("radius", self.radius),
            ("totalLength", self.total_length),
            ("segmentLength", self.segment_length),
            ("perimeter", self.perimeter),
        ];
        for (label, value) in distances {
            if let Some(v) = value {
                out.push((label, format_distance(v, format)));
            }
        }
        if let Some(area) = self.area {
            out.push(("area", format_area(area, format)));
        }
        out
    }
}

fn last_segment(latlngs: &[LatLng]) -> Option<f64> {
    match latlngs {
        [.., a, b] => Some(geodesic::distance(*a, *b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Circle, Marker, Polyline};

    #[test]
    fn test_format_distance_metric() {
        assert_eq!(format_distance(999.994, DisplayFormat::Metric), "999.99 m");
        assert_eq!(format_distance(1500.0, DisplayFormat::Metric), "1.50 km");
    }

    #[test]
    fn test_format_distance_imperial() {
        assert_eq!(format_distance(10.0, DisplayFormat::Imperial), "32.81 ft");
        assert_eq!(format_distance(1609.344, DisplayFormat::Imperial), "1.00 mi");
    }

    #[test]
    fn test_format_area() {
        assert_eq!(format_area(50.0, DisplayFormat::Metric), "50.00 m²");
        assert_eq!(format_area(25_000.0, DisplayFormat::Metric), "2.50 ha");
        assert_eq!(format_area(10.0, DisplayFormat::Imperial), "107.64 ft²");
        assert_eq!(format_area(4047.0, DisplayFormat::Imperial), "1.00 acres");
    }

    #[test]
    fn test_marker_coordinates() {
        let shape = Shape::Marker(Marker::new(LatLng::new(48.1, 11.5)));
        let formatted = Measurements::of(&shape).format(DisplayFormat::Metric);
        assert_eq!(formatted, vec![("coordinates", "48.100000, 11.500000".to_string())]);
    }

    #[test]
    fn test_circle_measurements() {
        let shape = Shape::Circle(Circle::new(LatLng::new(0.0, 0.0), 100.0));
        let m = Measurements::of(&shape);
        assert_eq!(m.radius, Some(100.0));
        assert!((m.area.unwrap() - std::f64::consts::PI * 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_path_segment_length() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.0, 0.01);
        let c = LatLng::new(0.0, 0.03);
        let shape = Shape::Polyline(Polyline::from_latlngs(vec![a, b, c]));
        let m = Measurements::of(&shape);
        let last = geodesic::distance(b, c);
        assert!((m.segment_length.unwrap() - last).abs() < 1e-9);
        assert!(m.total_length.unwrap() > last);
        assert!(Measurements::of_path(&[a]).segment_length.is_none());
    }
}

//! Draw and cut configuration.
//!
//! Options are plain serde structs with per-field defaults so that a partial
//! JSON document (or an empty one) yields a usable configuration.

use crate::measure::DisplayFormat;
use crate::shapes::{
    DEFAULT_HEAD_ANGLE, DEFAULT_HEAD_SIZE, SerializableColor, ShapeId, ShapeKind, ShapeStyle, Zone,
};
use crate::snap::DEFAULT_SNAP_DISTANCE;
use serde::{Deserialize, Serialize};

/// Default number of sides used when a circle takes part in a cut.
pub const CUT_CIRCLE_SEGMENTS: usize = 64;

/// Default number of sides for exported circle polygons.
pub const EXPORT_CIRCLE_SEGMENTS: usize = 60;

/// What, besides clicking the closing vertex, finishes a multi-vertex shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishOn {
    /// Only the closing click or an explicit finish.
    #[default]
    None,
    /// A double click finishes.
    DoubleClick,
    /// Clicking onto a snapped position finishes.
    Snap,
}

/// Measurement read-out settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementOptions {
    pub enabled: bool,
    pub format: DisplayFormat,
}

impl Default for MeasurementOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            format: DisplayFormat::Metric,
        }
    }
}

/// Options for a draw session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawOptions {
    /// Whether the hint marker snaps to nearby shapes.
    pub snappable: bool,
    /// Snap threshold in pixels.
    pub snap_distance: f64,
    /// Snappable kinds, earlier entries win distance ties.
    pub snap_priority: Vec<ShapeKind>,
    /// Extra pixels a vertex may be further away than an edge and still win.
    pub snap_vertex_bias: f64,
    /// Refuse to finish unless the last position is snapped.
    pub require_snap_to_finish: bool,
    pub allow_self_intersection: bool,
    /// Start a new shape right after finishing one.
    pub continue_drawing: bool,
    pub finish_on: FinishOn,
    /// Style of the committed shape.
    pub path_options: ShapeStyle,
    /// Style of the in-progress shape.
    pub templine_style: ShapeStyle,
    /// Style of the line from the last vertex to the cursor.
    pub hintline_style: ShapeStyle,
    /// Arrowhead wing length in pixels.
    pub arrowhead_size: f64,
    /// Arrowhead opening angle in degrees.
    pub arrowhead_angle: f64,
    /// Distance-line marker spacing in metres.
    pub distance_interval_m: f64,
    /// Freehand strokes become polygons instead of polylines.
    pub freehand_fill: bool,
    /// Rings placed by the hazard zone tool.
    pub zones: Vec<Zone>,
    pub measurements: MeasurementOptions,
}

impl Default for DrawOptions {
    fn default() -> Self {
        let path = ShapeStyle::default();
        Self {
            snappable: true,
            snap_distance: DEFAULT_SNAP_DISTANCE,
            snap_priority: ShapeKind::SNAPPABLE.to_vec(),
            snap_vertex_bias: 0.0,
            require_snap_to_finish: false,
            allow_self_intersection: true,
            continue_drawing: false,
            finish_on: FinishOn::None,
            templine_style: path.clone(),
            hintline_style: ShapeStyle {
                fill_color: None,
                opacity: 0.7,
                ..path.clone()
            },
            path_options: path,
            arrowhead_size: DEFAULT_HEAD_SIZE,
            arrowhead_angle: DEFAULT_HEAD_ANGLE,
            distance_interval_m: 1000.0,
            freehand_fill: false,
            zones: Zone::defaults(),
            measurements: MeasurementOptions::default(),
        }
    }
}

impl DrawOptions {
    /// Load options from JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Overlay every field set in `patch`.
    pub fn merge(&mut self, patch: &DrawOptionsPatch) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = &patch.$field {
                    self.$field = value.clone();
                })*
            };
        }
        merge!(
            snappable,
            snap_distance,
            snap_priority,
            snap_vertex_bias,
            require_snap_to_finish,
            allow_self_intersection,
            continue_drawing,
            finish_on,
            path_options,
            templine_style,
            hintline_style,
            arrowhead_size,
            arrowhead_angle,
            distance_interval_m,
            freehand_fill,
            zones,
            measurements,
        );
    }

    /// Copy with `patch` applied.
    pub fn merged(&self, patch: &DrawOptionsPatch) -> Self {
        let mut options = self.clone();
        options.merge(patch);
        options
    }

    /// Options whose committed shapes use `color` for both stroke and fill.
    pub fn with_color(mut self, color: SerializableColor) -> Self {
        self.path_options.stroke_color = color;
        self.path_options.fill_color = Some(color);
        self
    }
}

/// Partial [`DrawOptions`]; only the set fields are merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawOptionsPatch {
    pub snappable: Option<bool>,
    pub snap_distance: Option<f64>,
    pub snap_priority: Option<Vec<ShapeKind>>,
    pub snap_vertex_bias: Option<f64>,
    pub require_snap_to_finish: Option<bool>,
    pub allow_self_intersection: Option<bool>,
    pub continue_drawing: Option<bool>,
    pub finish_on: Option<FinishOn>,
    pub path_options: Option<ShapeStyle>,
    pub templine_style: Option<ShapeStyle>,
    pub hintline_style: Option<ShapeStyle>,
    pub arrowhead_size: Option<f64>,
    pub arrowhead_angle: Option<f64>,
    pub distance_interval_m: Option<f64>,
    pub freehand_fill: Option<bool>,
    pub zones: Option<Vec<Zone>>,
    pub measurements: Option<MeasurementOptions>,
}

impl DrawOptionsPatch {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Options for the cut engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutOptions {
    /// Allow-list of shapes that may be cut; empty means every eligible shape.
    pub layers_to_cut: Vec<ShapeId>,
    /// Pixel distance within which a snapped cutting vertex is inserted into a target ring.
    pub snap_distance: f64,
    /// Sides of the polygon a circle becomes before cutting.
    pub circle_segments: usize,
}

impl Default for CutOptions {
    fn default() -> Self {
        Self {
            layers_to_cut: Vec::new(),
            snap_distance: DEFAULT_SNAP_DISTANCE,
            circle_segments: CUT_CIRCLE_SEGMENTS,
        }
    }
}

impl CutOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Whether the allow-list admits `id`.
    pub fn allows(&self, id: ShapeId) -> bool {
        self.layers_to_cut.is_empty() || self.layers_to_cut.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DrawOptions::default();
        assert!(options.snappable);
        assert!((options.snap_distance - 20.0).abs() < f64::EPSILON);
        assert!(!options.require_snap_to_finish);
        assert!(options.allow_self_intersection);
        assert!(!options.continue_drawing);
        assert_eq!(options.snap_priority[0], ShapeKind::Marker);
        assert!((options.arrowhead_size - 12.0).abs() < f64::EPSILON);
        assert!((options.arrowhead_angle - 60.0).abs() < f64::EPSILON);
        assert!(!options.freehand_fill);
        assert_eq!(options.zones.len(), 4);
    }

    #[test]
    fn test_from_json_partial() {
        let options =
            DrawOptions::from_json(r#"{"snap_distance": 5, "continue_drawing": true}"#).unwrap();
        assert!((options.snap_distance - 5.0).abs() < f64::EPSILON);
        assert!(options.continue_drawing);
        assert!(options.snappable);

        let empty = DrawOptions::from_json("{}").unwrap();
        assert_eq!(empty, DrawOptions::default());
    }

    #[test]
    fn test_merge_only_set_fields() {
        let mut options = DrawOptions::default();
        let patch = DrawOptionsPatch {
            allow_self_intersection: Some(false),
            snap_priority: Some(vec![ShapeKind::Polygon]),
            ..Default::default()
        };
        options.merge(&patch);
        assert!(!options.allow_self_intersection);
        assert_eq!(options.snap_priority, vec![ShapeKind::Polygon]);
        assert!(options.snappable);
    }

    #[test]
    fn test_zones_from_json() {
        let patch = DrawOptionsPatch::from_json(
            r#"{"zones": [{"distance": 50, "color": {"r": 0, "g": 0, "b": 0, "a": 255}, "fill_opacity": 0.5}]}"#,
        )
        .unwrap();
        let options = DrawOptions::default().merged(&patch);
        assert_eq!(options.zones.len(), 1);
        assert!((options.zones[0].distance - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_patch_from_json() {
        let patch = DrawOptionsPatch::from_json(r#"{"finish_on": "doubleclick"}"#).unwrap();
        assert_eq!(patch.finish_on, Some(FinishOn::DoubleClick));
        assert!(patch.snappable.is_none());
    }

    #[test]
    fn test_cut_options_allow_list() {
        let options = CutOptions::default();
        let id = uuid::Uuid::new_v4();
        assert!(options.allows(id));
        assert_eq!(options.circle_segments, 64);

        let restricted = CutOptions {
            layers_to_cut: vec![uuid::Uuid::new_v4()],
            ..CutOptions::default()
        };
        assert!(!restricted.allows(id));
    }

    #[test]
    fn test_options_json_roundtrip() {
        let options = DrawOptions::default().with_color(SerializableColor::new(255, 0, 0, 255));
        let json = options.to_json().unwrap();
        assert_eq!(DrawOptions::from_json(&json).unwrap(), options);
    }
}

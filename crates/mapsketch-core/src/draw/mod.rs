//! Interactive drawing sessions.
//!
//! A [`DrawSession`] turns pointer input into one kind of shape. It owns the
//! placed vertices and the hint marker that follows the cursor, and commits
//! the finished shape into a [`ShapeCollection`] through a [`DrawContext`].

mod session;

pub use session::DrawSession;

use crate::boolean::BooleanOps;
use crate::collection::ShapeCollection;
use crate::config::CutOptions;
use crate::cut::CutFailure;
use crate::events::EventBus;
use crate::geodesic::{LatLng, Projection};
use crate::shapes::{ShapeId, ShapeKind, Vertex};
use crate::snap::SnapCandidate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kinds of drawing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawKind {
    Marker,
    Line,
    Polygon,
    /// Center click, then radius click.
    Circle,
    /// Two clicks spanning the diameter.
    Circle2Points,
    /// Three clicks on the circumference.
    Circle3Points,
    Arrow,
    /// Line with distance markers along it.
    DistanceLine,
    /// Polygon that cuts the shapes it crosses instead of being added.
    Cut,
    /// Press, drag and release traces a path.
    Freehand,
    /// One click places concentric hazard zones.
    DangerousGoodsZones,
}

impl DrawKind {
    pub const ALL: [DrawKind; 11] = [
        DrawKind::Marker,
        DrawKind::Line,
        DrawKind::Polygon,
        DrawKind::Circle,
        DrawKind::Circle2Points,
        DrawKind::Circle3Points,
        DrawKind::Arrow,
        DrawKind::DistanceLine,
        DrawKind::Cut,
        DrawKind::Freehand,
        DrawKind::DangerousGoodsZones,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DrawKind::Marker => "Marker",
            DrawKind::Line => "Line",
            DrawKind::Polygon => "Polygon",
            DrawKind::Circle => "Circle",
            DrawKind::Circle2Points => "Circle2Points",
            DrawKind::Circle3Points => "Circle3Points",
            DrawKind::Arrow => "Arrow",
            DrawKind::DistanceLine => "DistanceLine",
            DrawKind::Cut => "Cut",
            DrawKind::Freehand => "Freehand",
            DrawKind::DangerousGoodsZones => "DangerousGoodsZones",
        }
    }

    /// Kind of shape a finished session produces. Filled freehand strokes
    /// become polygons instead.
    pub fn shape_kind(self) -> ShapeKind {
        match self {
            DrawKind::Marker => ShapeKind::Marker,
            DrawKind::Line | DrawKind::DistanceLine | DrawKind::Freehand => ShapeKind::Polyline,
            DrawKind::Polygon | DrawKind::Cut => ShapeKind::Polygon,
            DrawKind::Circle | DrawKind::Circle2Points | DrawKind::Circle3Points => {
                ShapeKind::Circle
            }
            DrawKind::Arrow => ShapeKind::Arrow,
            DrawKind::DangerousGoodsZones => ShapeKind::Zones,
        }
    }

    /// Vertices needed before the shape can be finished.
    pub fn min_vertices(self) -> usize {
        match self {
            DrawKind::Marker | DrawKind::DangerousGoodsZones => 1,
            DrawKind::Line
            | DrawKind::Freehand
            | DrawKind::Arrow
            | DrawKind::DistanceLine
            | DrawKind::Circle
            | DrawKind::Circle2Points => 2,
            DrawKind::Polygon | DrawKind::Cut | DrawKind::Circle3Points => 3,
        }
    }

    /// Kinds that finish by themselves once enough vertices are placed.
    pub fn finishes_on_count(self) -> bool {
        matches!(
            self,
            DrawKind::Marker
                | DrawKind::Circle
                | DrawKind::Circle2Points
                | DrawKind::Circle3Points
                | DrawKind::DangerousGoodsZones
        )
    }

    /// Open paths: clicking the last vertex again finishes.
    pub fn is_path(self) -> bool {
        matches!(self, DrawKind::Line | DrawKind::Arrow | DrawKind::DistanceLine)
    }

    /// Kinds driven by press, drag and release instead of clicks.
    pub fn is_stroke(self) -> bool {
        self == DrawKind::Freehand
    }

    /// Closed rings: clicking the first vertex finishes.
    pub fn is_ring(self) -> bool {
        matches!(self, DrawKind::Polygon | DrawKind::Cut)
    }
}

impl fmt::Display for DrawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DrawKind {
    type Err = DrawError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrawKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .or((s == "Polyline").then_some(DrawKind::Line))
            .ok_or_else(|| DrawError::UnknownShape(s.to_string()))
    }
}

/// Lifecycle of a draw session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrawState {
    #[default]
    Disabled,
    /// Enabled, nothing placed yet.
    AwaitingFirstVertex,
    /// At least one vertex placed.
    Accumulating,
    /// Building and committing the shape.
    Finishing,
}

/// Misuse of the drawing API.
#[derive(Debug, Error)]
pub enum DrawError {
    #[error("draw session is not enabled")]
    SessionDisabled,
    #[error("unknown shape kind: {0}")]
    UnknownShape(String),
    #[error("invalid draw options: {0}")]
    Config(#[from] serde_json::Error),
}

/// The marker following the cursor, possibly attached to nearby geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HintMarker {
    pub latlng: LatLng,
    pub snap: Option<SnapCandidate>,
}

impl HintMarker {
    pub fn free(latlng: LatLng) -> Self {
        Self { latlng, snap: None }
    }

    pub fn is_snapped(&self) -> bool {
        self.snap.is_some()
    }

    /// The vertex placed when clicking here.
    pub fn vertex(&self) -> Vertex {
        match &self.snap {
            Some(snap) => Vertex::snapped(self.latlng, snap.snap_info()),
            None => Vertex::new(self.latlng),
        }
    }
}

/// What a session needs from its surroundings to commit a shape.
pub struct DrawContext<'a> {
    pub shapes: &'a mut ShapeCollection,
    pub projection: &'a Projection,
    pub events: &'a mut EventBus,
    pub ops: &'a dyn BooleanOps,
    pub cut_options: &'a CutOptions,
}

/// Result of a successful finish.
#[derive(Debug)]
pub enum Finished {
    /// A shape was added to the collection.
    Created(ShapeId),
    /// A cut replaced shapes with fragments.
    Cut {
        replaced: Vec<ShapeId>,
        fragments: Vec<ShapeId>,
        failures: Vec<CutFailure>,
    },
}

impl Finished {
    pub fn created(&self) -> Option<ShapeId> {
        match self {
            Finished::Created(id) => Some(*id),
            Finished::Cut { .. } => None,
        }
    }
}

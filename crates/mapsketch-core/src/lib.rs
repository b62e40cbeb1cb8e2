//! MapSketch Core Library
//!
//! Platform-agnostic drawing, snapping and cutting of geographic shapes.

pub mod boolean;
pub mod circle_fit;
pub mod collection;
pub mod config;
pub mod copy;
pub mod cut;
pub mod draw;
pub mod editor;
pub mod events;
pub mod geodesic;
pub mod input;
pub mod measure;
pub mod shapes;
pub mod snap;

pub use boolean::{BooleanOps, GeoBooleanOps, Geometry, GeometryError};
pub use circle_fit::{CircleFit, fit_circle_three_point, fit_circle_two_point};
pub use collection::ShapeCollection;
pub use config::{CutOptions, DrawOptions, DrawOptionsPatch, FinishOn};
pub use copy::CopyTool;
pub use cut::{CutOutcome, Cutter};
pub use draw::{DrawContext, DrawError, DrawKind, DrawSession, DrawState, Finished, HintMarker};
pub use editor::{ActiveMode, Editor};
pub use events::{EditorEvent, EventBus, poll_events};
pub use geodesic::{LatLng, LatLngBounds, Projection};
pub use input::{InputState, Key, PointerEvent};
pub use measure::{DisplayFormat, Measurements};
pub use shapes::{Shape, ShapeId, ShapeKind, ShapeStyle, Zone, ZoneGroup};
pub use snap::{SnapCandidate, SnapQuery, find_snap};

//! The editor: shape collection, draw sessions and global modes.

use crate::boolean::{BooleanOps, GeoBooleanOps, Geometry};
use crate::collection::ShapeCollection;
use crate::config::{CutOptions, DrawOptions, DrawOptionsPatch};
use crate::copy::CopyTool;
use crate::draw::{DrawContext, DrawError, DrawKind, DrawSession, Finished};
use crate::events::{EditorEvent, EventBus};
use crate::geodesic::{LatLng, Projection};
use crate::input::{InputState, Key, PointerEvent};
use crate::shapes::{Circle, Shape, ShapeId, ShapeKind};
use crate::snap::{SnapQuery, find_snap};
use std::collections::HashMap;
use std::sync::mpsc::Receiver;

/// The single global mode; at most one is active at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActiveMode {
    #[default]
    Idle,
    Draw(DrawKind),
    Cut,
    Drag,
    Rotate,
    Removal,
    Copy,
}

impl ActiveMode {
    /// The session kind driven by this mode.
    pub fn draw_kind(self) -> Option<DrawKind> {
        match self {
            ActiveMode::Draw(kind) => Some(kind),
            ActiveMode::Cut => Some(DrawKind::Cut),
            _ => None,
        }
    }
}

impl From<DrawKind> for ActiveMode {
    fn from(kind: DrawKind) -> Self {
        match kind {
            DrawKind::Cut => ActiveMode::Cut,
            kind => ActiveMode::Draw(kind),
        }
    }
}

/// Owns the committed shapes and routes input to the active session.
pub struct Editor {
    shapes: ShapeCollection,
    projection: Projection,
    events: EventBus,
    ops: Box<dyn BooleanOps>,
    cut_options: CutOptions,
    /// Options new sessions start from.
    draw_defaults: DrawOptions,
    sessions: HashMap<DrawKind, DrawSession>,
    mode: ActiveMode,
    copy: CopyTool,
    input: InputState,
    /// Pixel tolerance for picking a shape in removal mode.
    pick_tolerance: f64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// Create an editor backed by [`GeoBooleanOps`].
    pub fn new() -> Self {
        Self::with_boolean_ops(Box::new(GeoBooleanOps::new()))
    }

    pub fn with_boolean_ops(ops: Box<dyn BooleanOps>) -> Self {
        let draw_defaults = DrawOptions::default();
        Self {
            shapes: ShapeCollection::new(),
            projection: Projection::default(),
            events: EventBus::new(),
            ops,
            cut_options: CutOptions::default(),
            pick_tolerance: draw_defaults.snap_distance,
            draw_defaults,
            sessions: HashMap::new(),
            mode: ActiveMode::Idle,
            copy: CopyTool::new(),
            input: InputState::new(),
        }
    }

    /// Register an event subscriber.
    pub fn subscribe(&mut self) -> Receiver<EditorEvent> {
        self.events.subscribe()
    }

    pub fn shapes(&self) -> &ShapeCollection {
        &self.shapes
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Change the zoom used for pixel-space snapping and fitting.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.projection = Projection::new(zoom);
    }

    pub fn mode(&self) -> ActiveMode {
        self.mode
    }

    pub fn session(&self, kind: DrawKind) -> Option<&DrawSession> {
        self.sessions.get(&kind)
    }

    /// The session currently drawing, if any.
    pub fn active_session(&self) -> Option<&DrawSession> {
        self.mode
            .draw_kind()
            .and_then(|kind| self.sessions.get(&kind))
            .filter(|s| s.enabled())
    }

    /// Copy-mode source selection and cursor preview.
    pub fn copy_tool(&self) -> &CopyTool {
        &self.copy
    }

    pub fn set_draw_defaults(&mut self, options: DrawOptions) {
        self.draw_defaults = options;
    }

    pub fn set_cut_options(&mut self, options: CutOptions) {
        self.cut_options = options;
    }

    /// Add an existing shape, e.g. one loaded by the host.
    pub fn add_shape(&mut self, shape: Shape) -> Result<ShapeId, Shape> {
        self.shapes.add(shape)
    }

    /// Remove a shape and announce it.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        let shape = self.shapes.remove(id)?;
        log::info!("removed {} {id}", shape.kind());
        self.events.emit(EditorEvent::Remove {
            shape: shape.clone(),
        });
        Some(shape)
    }

    /// Enable drawing `kind`, disabling whatever mode was active.
    ///
    /// Returns `false` if `kind` was already being drawn (options are merged anyway).
    pub fn enable_draw(&mut self, kind: DrawKind, patch: &DrawOptionsPatch) -> bool {
        let target = ActiveMode::from(kind);
        let from = self.mode;
        if from != target {
            self.leave_mode();
        }
        let defaults = &self.draw_defaults;
        let session = self
            .sessions
            .entry(kind)
            .or_insert_with(|| DrawSession::with_options(kind, defaults.clone()));
        session.set_cursor(self.input.cursor);
        let started = session.enable(&mut self.events, patch);
        self.mode = target;
        if from != target {
            self.events.emit(EditorEvent::ModeChanged { from, to: target });
        }
        started
    }

    /// [`Editor::enable_draw`] with options given as JSON.
    pub fn enable_draw_json(&mut self, kind: DrawKind, options: &str) -> Result<bool, DrawError> {
        let patch = DrawOptionsPatch::from_json(options)?;
        Ok(self.enable_draw(kind, &patch))
    }

    /// Disable drawing `kind`. Returns whether it was enabled.
    pub fn disable_draw(&mut self, kind: DrawKind) -> bool {
        let was_enabled = self
            .sessions
            .get_mut(&kind)
            .is_some_and(|s| s.disable(&mut self.events));
        if self.mode == ActiveMode::from(kind) {
            self.change_mode(ActiveMode::Idle);
        }
        was_enabled
    }

    /// Toggle drawing `kind`. Returns whether it is now enabled.
    pub fn toggle_draw(&mut self, kind: DrawKind, patch: &DrawOptionsPatch) -> bool {
        if self.session(kind).is_some_and(DrawSession::enabled) {
            self.disable_draw(kind);
            false
        } else {
            self.enable_draw(kind, patch);
            true
        }
    }

    /// Switch the global mode. Entering a draw mode enables its session with
    /// the current options.
    pub fn set_mode(&mut self, mode: ActiveMode) {
        if mode == self.mode {
            return;
        }
        match mode.draw_kind() {
            Some(kind) => {
                self.enable_draw(kind, &DrawOptionsPatch::default());
            }
            None => {
                self.leave_mode();
                self.change_mode(mode);
            }
        }
    }

    /// Feed a classified pointer event.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Result<Option<Finished>, DrawError> {
        let latlng = event.latlng();
        self.input.cursor = Some(latlng);
        let result = match (self.mode, event) {
            (ActiveMode::Removal, PointerEvent::Click { .. })
            | (ActiveMode::Removal, PointerEvent::DoubleClick { .. }) => {
                if let Some(id) = self.pick(latlng) {
                    self.remove_shape(id);
                }
                Ok(None)
            }
            (ActiveMode::Copy, PointerEvent::Click { .. })
            | (ActiveMode::Copy, PointerEvent::DoubleClick { .. }) => {
                self.copy_click(latlng);
                Ok(None)
            }
            (ActiveMode::Copy, PointerEvent::Move { .. }) => {
                self.copy.pointer_move(latlng);
                Ok(None)
            }
            (_, PointerEvent::Move { .. }) => {
                if let Some(session) = self.mode.draw_kind().and_then(|k| self.sessions.get_mut(&k)) {
                    session.pointer_move(latlng, &self.shapes, &self.projection);
                }
                Ok(None)
            }
            (_, PointerEvent::Click { .. }) => match self.draw_context() {
                Some((session, mut ctx)) => session.click(&mut ctx, latlng),
                None => Ok(None),
            },
            (_, PointerEvent::DoubleClick { .. }) => match self.draw_context() {
                Some((session, mut ctx)) => session.double_click(&mut ctx, latlng),
                None => Ok(None),
            },
            (_, PointerEvent::Press { .. }) => match self.draw_context() {
                Some((session, _)) => session.press(latlng).map(|_| None),
                None => Ok(None),
            },
            (_, PointerEvent::Release { .. }) => match self.draw_context() {
                Some((session, mut ctx)) => session.release(&mut ctx, latlng),
                None => Ok(None),
            },
        };
        self.sync_mode();
        result
    }

    /// Pointer moved to `latlng`.
    pub fn pointer_move(&mut self, latlng: LatLng) -> Result<Option<Finished>, DrawError> {
        let event = self.input.pointer_moved(latlng);
        self.handle_pointer(event)
    }

    /// A click at `latlng` happening now; close repeated clicks become double clicks.
    pub fn click(&mut self, latlng: LatLng) -> Result<Option<Finished>, DrawError> {
        let event = self.input.click(latlng, &self.projection);
        self.handle_pointer(event)
    }

    /// Button pressed at `latlng`.
    pub fn press(&mut self, latlng: LatLng) -> Result<Option<Finished>, DrawError> {
        let event = self.input.pointer_pressed(latlng);
        self.handle_pointer(event)
    }

    /// Button released at `latlng`.
    pub fn release(&mut self, latlng: LatLng) -> Result<Option<Finished>, DrawError> {
        let event = self.input.pointer_released(latlng);
        self.handle_pointer(event)
    }

    /// `Escape` finishes a started shape, otherwise leaves the current mode.
    /// `Enter` finishes, `Backspace` removes the last vertex.
    pub fn handle_key(&mut self, key: &Key) -> Result<Option<Finished>, DrawError> {
        let result = match key {
            Key::Escape => {
                let started = self
                    .active_session()
                    .is_some_and(|s| !s.vertices().is_empty());
                if started {
                    self.finish_active()
                } else {
                    self.leave_mode();
                    self.change_mode(ActiveMode::Idle);
                    Ok(None)
                }
            }
            Key::Enter => self.finish_active(),
            Key::Backspace => {
                if let Some(session) = self.mode.draw_kind().and_then(|k| self.sessions.get_mut(&k)) {
                    session.remove_last_vertex();
                }
                Ok(None)
            }
            Key::Other(_) => Ok(None),
        };
        self.sync_mode();
        result
    }

    /// Request the active session to finish.
    pub fn finish(&mut self) -> Result<Option<Finished>, DrawError> {
        let result = match self.draw_context() {
            Some((session, mut ctx)) => session.finish(&mut ctx),
            None => Err(DrawError::SessionDisabled),
        };
        self.sync_mode();
        result
    }

    fn finish_active(&mut self) -> Result<Option<Finished>, DrawError> {
        match self.draw_context() {
            Some((session, mut ctx)) => session.finish(&mut ctx),
            None => Ok(None),
        }
    }

    /// The active session together with the context it commits into.
    fn draw_context(&mut self) -> Option<(&mut DrawSession, DrawContext<'_>)> {
        let kind = self.mode.draw_kind()?;
        let session = self.sessions.get_mut(&kind).filter(|s| s.enabled())?;
        let ctx = DrawContext {
            shapes: &mut self.shapes,
            projection: &self.projection,
            events: &mut self.events,
            ops: &*self.ops,
            cut_options: &self.cut_options,
        };
        Some((session, ctx))
    }

    /// Select the shape under `latlng` as copy source, or place a copy of
    /// the current source there.
    fn copy_click(&mut self, latlng: LatLng) {
        if let Some(id) = CopyTool::pick(&self.shapes, latlng, &self.projection) {
            if let Some(shape) = self.shapes.get(id) {
                self.copy.select(shape);
            }
            return;
        }
        let (Some(source), Some(copy)) = (self.copy.source(), self.copy.place(&self.shapes, latlng)) else {
            return;
        };
        match self.shapes.add(copy.clone()) {
            Ok(id) => {
                log::info!("copied {source} to {id}");
                self.events.emit(EditorEvent::Copy { source, shape: copy });
            }
            Err(shape) => log::warn!("copy {} rejected", shape.id()),
        }
    }

    /// Disable the session of the current mode without changing the mode.
    fn leave_mode(&mut self) {
        self.copy.reset();
        if let Some(session) = self.mode.draw_kind().and_then(|k| self.sessions.get_mut(&k)) {
            session.disable(&mut self.events);
        }
    }

    fn change_mode(&mut self, to: ActiveMode) {
        let from = self.mode;
        if from == to {
            return;
        }
        self.mode = to;
        log::debug!("mode {from:?} -> {to:?}");
        self.events.emit(EditorEvent::ModeChanged { from, to });
    }

    /// Drop back to idle when the active session disabled itself.
    fn sync_mode(&mut self) {
        let Some(kind) = self.mode.draw_kind() else {
            return;
        };
        if !self.sessions.get(&kind).is_some_and(DrawSession::enabled) {
            self.change_mode(ActiveMode::Idle);
        }
    }

    /// Topmost shape under `latlng`: near its outline, or inside its area.
    fn pick(&self, latlng: LatLng) -> Option<ShapeId> {
        let query = SnapQuery::new(self.pick_tolerance, &ShapeKind::SNAPPABLE);
        if let Some(hit) = find_snap(latlng, self.shapes.ordered(), &query, &self.projection) {
            return Some(hit.shape);
        }
        let point = Geometry::Point(latlng.to_position());
        let shapes: Vec<&Shape> = self.shapes.ordered().collect();
        shapes.into_iter().rev().find_map(|shape| {
            let area = match shape {
                Shape::Polygon(polygon) => polygon.to_geometry(),
                Shape::Circle(circle) => circle.to_polygon(self.cut_options.circle_segments).to_geometry(),
                Shape::Zones(zones) => Circle::new(zones.center, zones.outer_radius())
                    .to_polygon(self.cut_options.circle_segments)
                    .to_geometry(),
                _ => return None,
            };
            match self.ops.bounded_contains(&area, &point) {
                Ok(true) => Some(shape.id()),
                Ok(false) => None,
                Err(err) => {
                    log::warn!("hit test on {} failed: {err}", shape.id());
                    None
                }
            }
        })
    }
}

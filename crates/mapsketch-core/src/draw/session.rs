//! The per-kind drawing state machine.

use super::{DrawContext, DrawError, DrawKind, DrawState, Finished, HintMarker};
use crate::circle_fit::{fit_circle_three_point, fit_circle_two_point};
use crate::collection::ShapeCollection;
use crate::config::{DrawOptions, DrawOptionsPatch, FinishOn};
use crate::cut::{Cutter, Replacement};
use crate::events::{EditorEvent, EventBus};
use crate::geodesic::{self, LatLng, Projection};
use crate::measure::Measurements;
use crate::shapes::{
    Arrow, Circle, Marker, Polygon, Polyline, Shape, ShapeFlags, ShapeId, ShapeStyle, Vertex,
    ZoneGroup, self_intersects,
};
use crate::snap::{SnapCandidate, SnapQuery, SnapTargetKind, find_snap};
use uuid::Uuid;

/// Pixel radius of a placed vertex when snapping is off.
const VERTEX_HIT_RADIUS: f64 = 6.0;

/// Draws one kind of shape.
#[derive(Debug, Clone)]
pub struct DrawSession {
    kind: DrawKind,
    options: DrawOptions,
    state: DrawState,
    vertices: Vec<Vertex>,
    hint: Option<HintMarker>,
    /// Last cursor position seen, enabled or not.
    cursor: Option<LatLng>,
    /// Identity of the shape under construction, used when snapping to its first vertex.
    working_id: ShapeId,
    /// A freehand stroke is in progress.
    stroking: bool,
    finished: usize,
}

impl DrawSession {
    pub fn new(kind: DrawKind) -> Self {
        Self::with_options(kind, DrawOptions::default())
    }

    pub fn with_options(kind: DrawKind, options: DrawOptions) -> Self {
        Self {
            kind,
            options,
            state: DrawState::Disabled,
            vertices: Vec::new(),
            hint: None,
            cursor: None,
            working_id: Uuid::new_v4(),
            stroking: false,
            finished: 0,
        }
    }

    pub fn kind(&self) -> DrawKind {
        self.kind
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    pub fn options(&self) -> &DrawOptions {
        &self.options
    }

    pub fn enabled(&self) -> bool {
        self.state != DrawState::Disabled
    }

    /// Vertices placed so far.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn hint(&self) -> Option<&HintMarker> {
        self.hint.as_ref()
    }

    /// Shapes finished since the session was created.
    pub fn finished_count(&self) -> usize {
        self.finished
    }

    /// Remember the cursor so the hint marker starts there on enable.
    pub fn set_cursor(&mut self, cursor: Option<LatLng>) {
        self.cursor = cursor;
    }

    /// Enable drawing with `patch` merged over the current options.
    ///
    /// Returns `false` when the session was already enabled; the options are
    /// still merged but no event is emitted.
    pub fn enable(&mut self, events: &mut EventBus, patch: &DrawOptionsPatch) -> bool {
        self.options.merge(patch);
        if self.enabled() {
            return false;
        }
        self.vertices.clear();
        self.working_id = Uuid::new_v4();
        self.hint = self.cursor.map(HintMarker::free);
        self.state = DrawState::AwaitingFirstVertex;
        log::debug!("{} drawing enabled", self.kind);
        events.emit(EditorEvent::DrawStart { kind: self.kind });
        true
    }

    /// Stop drawing and drop everything in progress. Safe to call at any time.
    pub fn disable(&mut self, events: &mut EventBus) -> bool {
        let was_enabled = self.enabled();
        self.vertices.clear();
        self.stroking = false;
        self.hint = None;
        self.state = DrawState::Disabled;
        if was_enabled {
            log::debug!("{} drawing disabled", self.kind);
            events.emit(EditorEvent::DrawEnd { kind: self.kind });
        }
        was_enabled
    }

    /// Enable when disabled, disable otherwise. Returns the new enabled state.
    pub fn toggle(&mut self, events: &mut EventBus, patch: &DrawOptionsPatch) -> bool {
        if self.enabled() {
            self.disable(events);
            false
        } else {
            self.enable(events, patch)
        }
    }

    /// Move the hint marker to `latlng`, snapping it when close to geometry.
    pub fn pointer_move(
        &mut self,
        latlng: LatLng,
        shapes: &ShapeCollection,
        projection: &Projection,
    ) -> Option<&HintMarker> {
        self.cursor = Some(latlng);
        if !self.enabled() {
            return None;
        }
        if self.kind.is_stroke() {
            if self.stroking && self.vertices.last().is_none_or(|v| v.latlng != latlng) {
                self.vertices.push(Vertex::new(latlng));
            }
            self.hint = Some(HintMarker::free(latlng));
            return self.hint.as_ref();
        }
        let snap = if self.options.snappable {
            self.snap_at(latlng, shapes, projection)
        } else {
            None
        };
        self.hint = Some(HintMarker {
            latlng: snap.map_or(latlng, |s| s.latlng),
            snap,
        });
        self.hint.as_ref()
    }

    /// Place a vertex at the (possibly snapped) click position.
    pub fn click(
        &mut self,
        ctx: &mut DrawContext<'_>,
        latlng: LatLng,
    ) -> Result<Option<Finished>, DrawError> {
        if !self.enabled() {
            return Err(DrawError::SessionDisabled);
        }
        if self.kind.is_stroke() {
            return Ok(None);
        }
        self.pointer_move(latlng, ctx.shapes, ctx.projection);
        let Some(hint) = self.hint else {
            return Ok(None);
        };

        if self.is_closing_click(latlng, &hint, ctx.projection) {
            return self.finish(ctx);
        }
        if self.kind.is_ring()
            && self.vertices.len() < self.kind.min_vertices()
            && self.hits_vertex(latlng, self.vertices.first(), ctx.projection)
        {
            return Ok(None);
        }

        let vertex = hint.vertex();
        if !self.options.allow_self_intersection && (self.kind.is_path() || self.kind.is_ring()) {
            let mut candidate = self.latlngs();
            candidate.push(vertex.latlng);
            if self_intersects(&candidate, false) {
                log::debug!("refusing self-intersecting vertex");
                return Ok(None);
            }
        }

        self.vertices.push(vertex);
        self.state = DrawState::Accumulating;
        ctx.events.emit(EditorEvent::VertexAdded {
            kind: self.kind,
            latlng: vertex.latlng,
            snapped: vertex.is_snapped(),
        });

        let reached = self.vertices.len() >= self.kind.min_vertices();
        if self.kind.finishes_on_count() && reached {
            let finished = self.finish(ctx)?;
            if finished.is_none() && self.state == DrawState::Accumulating {
                // Refused: let the user place the last point again.
                self.remove_last_vertex();
            }
            return Ok(finished);
        }
        if self.options.finish_on == FinishOn::Snap && reached && self.is_externally_snapped() {
            return self.finish(ctx);
        }
        Ok(None)
    }

    /// A double click finishes when configured to, and is a plain click otherwise.
    pub fn double_click(
        &mut self,
        ctx: &mut DrawContext<'_>,
        latlng: LatLng,
    ) -> Result<Option<Finished>, DrawError> {
        if self.options.finish_on == FinishOn::DoubleClick
            && !self.kind.finishes_on_count()
            && !self.kind.is_stroke()
        {
            if !self.enabled() {
                return Err(DrawError::SessionDisabled);
            }
            self.pointer_move(latlng, ctx.shapes, ctx.projection);
            return self.finish(ctx);
        }
        self.click(ctx, latlng)
    }

    /// Start a freehand stroke at `latlng`. Other kinds ignore presses.
    pub fn press(&mut self, latlng: LatLng) -> Result<bool, DrawError> {
        if !self.enabled() {
            return Err(DrawError::SessionDisabled);
        }
        if !self.kind.is_stroke() {
            return Ok(false);
        }
        self.cursor = Some(latlng);
        self.stroking = true;
        self.vertices.clear();
        self.vertices.push(Vertex::new(latlng));
        self.hint = Some(HintMarker::free(latlng));
        self.state = DrawState::Accumulating;
        Ok(true)
    }

    /// End the freehand stroke and commit it.
    ///
    /// A stroke of fewer than two points gives up drawing without creating anything.
    pub fn release(
        &mut self,
        ctx: &mut DrawContext<'_>,
        latlng: LatLng,
    ) -> Result<Option<Finished>, DrawError> {
        if !self.enabled() {
            return Err(DrawError::SessionDisabled);
        }
        if !self.stroking {
            return Ok(None);
        }
        self.pointer_move(latlng, ctx.shapes, ctx.projection);
        self.stroking = false;
        if self.vertices.len() < self.kind.min_vertices() {
            log::debug!("{} stroke too short, giving up", self.kind);
            self.disable(ctx.events);
            return Ok(None);
        }
        self.finish(ctx)
    }

    /// A freehand stroke is being traced.
    pub fn is_stroking(&self) -> bool {
        self.stroking
    }

    /// Commit the shape when every precondition holds.
    ///
    /// Unmet preconditions are not errors: the session stays as it is and
    /// `Ok(None)` is returned.
    pub fn finish(&mut self, ctx: &mut DrawContext<'_>) -> Result<Option<Finished>, DrawError> {
        if !self.enabled() {
            return Err(DrawError::SessionDisabled);
        }
        if self.vertices.len() < self.kind.min_vertices() {
            log::debug!(
                "{} needs {} vertices, has {}",
                self.kind,
                self.kind.min_vertices(),
                self.vertices.len()
            );
            return Ok(None);
        }
        if !self.options.allow_self_intersection
            && (self.kind.is_path() || self.kind.is_ring())
            && self_intersects(&self.latlngs(), self.kind.is_ring())
        {
            log::debug!("{} not finished: shape intersects itself", self.kind);
            return Ok(None);
        }
        if self.options.require_snap_to_finish
            && !self.kind.is_stroke()
            && !self.is_snapped()
            && ctx.shapes.has_committed()
        {
            log::debug!("{} not finished: last position is not snapped", self.kind);
            return Ok(None);
        }

        self.state = DrawState::Finishing;
        let finished = if self.kind == DrawKind::Cut {
            self.apply_cut(ctx)
        } else {
            let Some(shape) = self.build_shape(ctx.projection) else {
                log::debug!("{} could not be built, giving up", self.kind);
                self.disable(ctx.events);
                return Ok(None);
            };
            let emitted = shape.clone();
            match ctx.shapes.add(shape) {
                Ok(id) => {
                    log::info!("created {} {id}", self.kind);
                    ctx.events.emit(EditorEvent::Create {
                        kind: self.kind,
                        shape: emitted,
                    });
                    Finished::Created(id)
                }
                Err(_) => {
                    self.disable(ctx.events);
                    return Ok(None);
                }
            }
        };
        self.finished += 1;

        if self.options.continue_drawing {
            self.vertices.clear();
            self.stroking = false;
            self.working_id = Uuid::new_v4();
            self.state = DrawState::AwaitingFirstVertex;
        } else {
            self.disable(ctx.events);
        }
        Ok(Some(finished))
    }

    /// Drop the most recently placed vertex.
    pub fn remove_last_vertex(&mut self) -> Option<Vertex> {
        if !self.enabled() {
            return None;
        }
        let removed = self.vertices.pop();
        if self.vertices.is_empty() {
            self.state = DrawState::AwaitingFirstVertex;
        }
        removed
    }

    /// The in-progress shape including the hint position, in the temporary style.
    pub fn preview(&self, projection: &Projection) -> Option<Shape> {
        if !self.enabled() {
            return None;
        }
        let mut points = self.latlngs();
        if let Some(hint) = self.hint.as_ref().filter(|_| !self.kind.is_stroke()) {
            points.push(hint.latlng);
        }
        let style = self.options.templine_style.clone();
        let mut shape = match self.kind {
            DrawKind::Marker => Shape::Marker(Marker::new(*points.first()?).with_style(style)),
            DrawKind::Line | DrawKind::DistanceLine if points.len() >= 2 => {
                Shape::Polyline(Polyline::from_latlngs(points).with_style(line_style(style)))
            }
            DrawKind::Arrow if points.len() >= 2 => Shape::Arrow(
                Arrow::from_latlngs(points)
                    .with_head(self.options.arrowhead_size, self.options.arrowhead_angle)
                    .with_style(line_style(style)),
            ),
            DrawKind::Polygon | DrawKind::Cut if points.len() >= 3 => {
                Shape::Polygon(Polygon::from_latlngs(points).with_style(style))
            }
            DrawKind::Polygon | DrawKind::Cut if points.len() == 2 => {
                Shape::Polyline(Polyline::from_latlngs(points).with_style(line_style(style)))
            }
            DrawKind::Circle if points.len() >= 2 => Shape::Circle(
                Circle::new(points[0], geodesic::distance(points[0], points[1])).with_style(style),
            ),
            DrawKind::Circle2Points if points.len() >= 2 => Shape::Circle(
                fit_circle_two_point(projection, points[0], points[1])
                    .to_circle()
                    .with_style(style),
            ),
            DrawKind::Circle3Points if points.len() >= 3 => Shape::Circle(
                fit_circle_three_point(projection, points[0], points[1], points[2])?
                    .to_circle()
                    .with_style(style),
            ),
            DrawKind::Circle3Points if points.len() == 2 => {
                Shape::Polyline(Polyline::from_latlngs(points).with_style(line_style(style)))
            }
            DrawKind::Freehand if points.len() >= 3 && self.options.freehand_fill => {
                Shape::Polygon(Polygon::from_latlngs(points).with_style(style))
            }
            DrawKind::Freehand if points.len() >= 2 => {
                Shape::Polyline(Polyline::from_latlngs(points).with_style(line_style(style)))
            }
            DrawKind::DangerousGoodsZones => Shape::Zones(
                ZoneGroup::new(*points.first()?, &self.options.zones).with_style(style),
            ),
            _ => return None,
        };
        *shape.flags_mut() = ShapeFlags::temporary();
        Some(shape)
    }

    /// Line from the last placed vertex to the hint marker, in the hint line style.
    pub fn hint_line(&self) -> Option<Shape> {
        if self.kind.is_stroke() {
            return None;
        }
        let last = self.vertices.last()?;
        let hint = self.hint.as_ref()?;
        let mut line = Polyline::from_latlngs(vec![last.latlng, hint.latlng])
            .with_style(self.options.hintline_style.clone());
        line.flags = ShapeFlags::temporary();
        Some(Shape::Polyline(line))
    }

    /// Live measurements of the preview, if enabled in the options.
    pub fn measurements(&self, projection: &Projection) -> Option<Measurements> {
        if !self.options.measurements.enabled {
            return None;
        }
        self.preview(projection).map(|shape| Measurements::of(&shape))
    }

    /// Formatted measurement read-out in the configured units.
    pub fn measurement_labels(&self, projection: &Projection) -> Vec<(&'static str, String)> {
        self.measurements(projection)
            .map(|m| m.format(self.options.measurements.format))
            .unwrap_or_default()
    }

    fn latlngs(&self) -> Vec<LatLng> {
        self.vertices.iter().map(|v| v.latlng).collect()
    }

    /// Vertex of the shape under construction whose click finishes it.
    fn closing_vertex(&self) -> Option<LatLng> {
        if self.kind.is_ring() && self.vertices.len() >= self.kind.min_vertices() {
            self.vertices.first().map(|v| v.latlng)
        } else if self.kind.is_path() {
            self.vertices.last().map(|v| v.latlng)
        } else {
            None
        }
    }

    fn is_closing_click(&self, latlng: LatLng, hint: &HintMarker, projection: &Projection) -> bool {
        if hint.snap.is_some_and(|s| s.shape == self.working_id) {
            return true;
        }
        let Some(target) = self.closing_vertex() else {
            return false;
        };
        projection.pixel_distance(latlng, target) <= VERTEX_HIT_RADIUS
    }

    fn hits_vertex(&self, latlng: LatLng, vertex: Option<&Vertex>, projection: &Projection) -> bool {
        vertex.is_some_and(|v| projection.pixel_distance(latlng, v.latlng) <= VERTEX_HIT_RADIUS)
    }

    /// Snapped anywhere, including a ring's own first vertex.
    fn is_snapped(&self) -> bool {
        self.hint.is_some_and(|h| h.is_snapped())
    }

    /// Snapped to committed geometry, not to the session's own vertices.
    fn is_externally_snapped(&self) -> bool {
        self.hint
            .and_then(|h| h.snap)
            .is_some_and(|s| s.shape != self.working_id)
    }

    fn snap_at(
        &self,
        cursor: LatLng,
        shapes: &ShapeCollection,
        projection: &Projection,
    ) -> Option<SnapCandidate> {
        let query = SnapQuery::new(self.options.snap_distance, &self.options.snap_priority)
            .with_vertex_bias(self.options.snap_vertex_bias);
        let external = find_snap(cursor, shapes.editable(), &query, projection);
        let own = self
            .closing_vertex()
            .filter(|_| self.kind.is_ring())
            .and_then(|target| {
                let distance = projection.pixel_distance(cursor, target);
                (distance <= self.options.snap_distance).then_some(SnapCandidate {
                    shape: self.working_id,
                    shape_kind: self.kind.shape_kind(),
                    latlng: target,
                    target: SnapTargetKind::Vertex,
                    segment: None,
                    distance,
                })
            });
        match (external, own) {
            (Some(e), Some(o)) => Some(if o.distance <= e.distance { o } else { e }),
            (e, o) => e.or(o),
        }
    }

    fn build_shape(&self, projection: &Projection) -> Option<Shape> {
        let style = self.options.path_options.clone();
        let vertices = self.vertices.clone();
        let first = vertices.first()?.latlng;
        let shape = match self.kind {
            DrawKind::Marker => Shape::Marker(Marker::new(first).with_style(style)),
            DrawKind::Line => Shape::Polyline(Polyline::new(vertices).with_style(line_style(style))),
            DrawKind::DistanceLine => Shape::Polyline(
                Polyline::new(vertices)
                    .with_distance_interval(self.options.distance_interval_m)
                    .with_style(line_style(style)),
            ),
            DrawKind::Arrow => Shape::Arrow(
                Arrow::new(vertices)
                    .with_head(self.options.arrowhead_size, self.options.arrowhead_angle)
                    .with_style(line_style(style)),
            ),
            DrawKind::Polygon | DrawKind::Cut => {
                Shape::Polygon(Polygon::new(vertices).with_style(style))
            }
            DrawKind::Freehand if self.options.freehand_fill && vertices.len() >= 3 => {
                Shape::Polygon(Polygon::new(vertices).with_style(style))
            }
            DrawKind::Freehand => {
                Shape::Polyline(Polyline::new(vertices).with_style(line_style(style)))
            }
            DrawKind::DangerousGoodsZones => {
                Shape::Zones(ZoneGroup::new(first, &self.options.zones).with_style(style))
            }
            DrawKind::Circle => {
                let edge = vertices.get(1)?.latlng;
                Shape::Circle(Circle::new(first, geodesic::distance(first, edge)).with_style(style))
            }
            DrawKind::Circle2Points => {
                let b = vertices.get(1)?.latlng;
                Shape::Circle(fit_circle_two_point(projection, first, b).to_circle().with_style(style))
            }
            DrawKind::Circle3Points => {
                let b = vertices.get(1)?.latlng;
                let c = vertices.get(2)?.latlng;
                Shape::Circle(
                    fit_circle_three_point(projection, first, b, c)?
                        .to_circle()
                        .with_style(style),
                )
            }
        };
        Some(shape)
    }

    /// Run the cut engine with the finished ring and apply its replacements.
    fn apply_cut(&self, ctx: &mut DrawContext<'_>) -> Finished {
        let mut cutting = Polygon::new(self.vertices.clone());
        cutting.flags = ShapeFlags::temporary();
        let outcome = Cutter::new(ctx.ops, ctx.projection, ctx.cut_options)
            .cut(&cutting, ctx.shapes.editable());
        let extent = outcome.cutting_extent;

        let mut replaced = Vec::new();
        let mut created = Vec::new();
        for Replacement {
            original,
            fragments,
        } in outcome.replacements
        {
            if ctx.shapes.replace(original, fragments.clone()).is_none() {
                continue;
            }
            replaced.push(original);
            for fragment in fragments {
                created.push(fragment.id());
                ctx.events.emit(EditorEvent::Cut {
                    original,
                    fragment,
                    cutting_extent: extent,
                });
            }
        }
        Finished::Cut {
            replaced,
            fragments: created,
            failures: outcome.failures,
        }
    }
}

fn line_style(style: ShapeStyle) -> ShapeStyle {
    ShapeStyle {
        fill_color: None,
        ..style
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boolean::GeoBooleanOps;
    use crate::config::CutOptions;
    use crate::events::poll_events;
    use kurbo::Vec2;

    struct Fixture {
        shapes: ShapeCollection,
        projection: Projection,
        events: EventBus,
        ops: GeoBooleanOps,
        cut_options: CutOptions,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                shapes: ShapeCollection::new(),
                projection: Projection::default(),
                events: EventBus::new(),
                ops: GeoBooleanOps::new(),
                cut_options: CutOptions::default(),
            }
        }

        fn ctx(&mut self) -> DrawContext<'_> {
            DrawContext {
                shapes: &mut self.shapes,
                projection: &self.projection,
                events: &mut self.events,
                ops: &self.ops,
                cut_options: &self.cut_options,
            }
        }

        /// A point `dx`/`dy` pixels away from a fixed origin.
        fn at(&self, dx: f64, dy: f64) -> LatLng {
            let origin = self.projection.project(LatLng::new(40.0, -3.0));
            self.projection.unproject(origin + Vec2::new(dx, dy))
        }
    }

    fn enabled(kind: DrawKind, fx: &mut Fixture, patch: DrawOptionsPatch) -> DrawSession {
        let mut session = DrawSession::new(kind);
        assert!(session.enable(&mut fx.events, &patch));
        session
    }

    #[test]
    fn test_enable_disable_events() {
        let mut fx = Fixture::new();
        let rx = fx.events.subscribe();
        let mut session = enabled(DrawKind::Line, &mut fx, DrawOptionsPatch::default());
        assert_eq!(session.state(), DrawState::AwaitingFirstVertex);
        assert!(!session.enable(&mut fx.events, &DrawOptionsPatch::default()));
        assert!(session.disable(&mut fx.events));
        assert!(!session.disable(&mut fx.events));
        assert_eq!(
            poll_events(&rx),
            vec![
                EditorEvent::DrawStart { kind: DrawKind::Line },
                EditorEvent::DrawEnd { kind: DrawKind::Line },
            ]
        );
    }

    #[test]
    fn test_reenable_merges_options() {
        let mut fx = Fixture::new();
        let mut session = enabled(DrawKind::Polygon, &mut fx, DrawOptionsPatch::default());
        let patch = DrawOptionsPatch {
            snap_distance: Some(5.0),
            ..Default::default()
        };
        session.enable(&mut fx.events, &patch);
        assert!((session.options().snap_distance - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_disabled_click_is_error() {
        let mut fx = Fixture::new();
        let mut session = DrawSession::new(DrawKind::Marker);
        let p = fx.at(0.0, 0.0);
        let result = session.click(&mut fx.ctx(), p);
        assert!(matches!(result, Err(DrawError::SessionDisabled)));
        assert!(matches!(session.finish(&mut fx.ctx()), Err(DrawError::SessionDisabled)));
    }

    #[test]
    fn test_marker_finishes_on_click() {
        let mut fx = Fixture::new();
        let rx = fx.events.subscribe();
        let mut session = enabled(DrawKind::Marker, &mut fx, DrawOptionsPatch::default());
        let p = fx.at(0.0, 0.0);
        let finished = session.click(&mut fx.ctx(), p).unwrap().unwrap();
        let id = finished.created().unwrap();
        assert!(fx.shapes.contains(id));
        assert!(!session.enabled());
        assert_eq!(session.finished_count(), 1);
        let events = poll_events(&rx);
        assert!(events.iter().any(|e| matches!(e, EditorEvent::Create { kind: DrawKind::Marker, .. })));
        assert!(matches!(events.last(), Some(EditorEvent::DrawEnd { .. })));
    }

    #[test]
    fn test_line_finishes_on_last_vertex_click() {
        let mut fx = Fixture::new();
        let mut session = enabled(DrawKind::Line, &mut fx, DrawOptionsPatch::default());
        let (a, b) = (fx.at(0.0, 0.0), fx.at(100.0, 0.0));
        assert!(session.click(&mut fx.ctx(), a).unwrap().is_none());
        assert!(session.click(&mut fx.ctx(), b).unwrap().is_none());
        assert_eq!(session.state(), DrawState::Accumulating);
        let finished = session.click(&mut fx.ctx(), b).unwrap().unwrap();
        let shape = fx.shapes.get(finished.created().unwrap()).unwrap();
        assert_eq!(shape.latlngs().len(), 2);
        assert!(shape.style().fill_color.is_none());
    }

    #[test]
    fn test_line_single_vertex_cannot_finish() {
        let mut fx = Fixture::new();
        let mut session = enabled(DrawKind::Line, &mut fx, DrawOptionsPatch::default());
        let a = fx.at(0.0, 0.0);
        session.click(&mut fx.ctx(), a).unwrap();
        assert!(session.click(&mut fx.ctx(), a).unwrap().is_none());
        assert_eq!(session.vertices().len(), 1);
        assert!(session.finish(&mut fx.ctx()).unwrap().is_none());
        assert!(session.enabled());
    }

    #[test]
    fn test_polygon_closes_on_first_vertex() {
        let mut fx = Fixture::new();
        let mut session = enabled(DrawKind::Polygon, &mut fx, DrawOptionsPatch::default());
        let pts = [fx.at(0.0, 0.0), fx.at(100.0, 0.0), fx.at(100.0, 100.0)];
        for p in pts {
            assert!(session.click(&mut fx.ctx(), p).unwrap().is_none());
        }
        let closing = fx.at(2.0, 1.0);
        let finished = session.click(&mut fx.ctx(), closing).unwrap().unwrap();
        let shape = fx.shapes.get(finished.created().unwrap()).unwrap();
        assert_eq!(shape.latlngs().len(), 3);
        assert!(!session.enabled());
    }

    #[test]
    fn test_polygon_first_vertex_ignored_below_three() {
        let mut fx = Fixture::new();
        let mut session = enabled(DrawKind::Polygon, &mut fx, DrawOptionsPatch::default());
        let (a, b) = (fx.at(0.0, 0.0), fx.at(100.0, 0.0));
        session.click(&mut fx.ctx(), a).unwrap();
        session.click(&mut fx.ctx(), b).unwrap();
        assert!(session.click(&mut fx.ctx(), a).unwrap().is_none());
        assert_eq!(session.vertices().len(), 2);
    }

    #[test]
    fn test_self_intersection_refused() {
        let mut fx = Fixture::new();
        let patch = DrawOptionsPatch {
            allow_self_intersection: Some(false),
            ..Default::default()
        };
        let mut session = enabled(DrawKind::Line, &mut fx, patch);
        for p in [fx.at(0.0, 0.0), fx.at(100.0, 0.0), fx.at(100.0, 100.0)] {
            session.click(&mut fx.ctx(), p).unwrap();
        }
        // Crosses the first segment.
        let crossing = fx.at(50.0, -50.0);
        session.click(&mut fx.ctx(), crossing).unwrap();
        assert_eq!(session.vertices().len(), 3);
    }

    #[test]
    fn test_circle_center_and_radius() {
        let mut fx = Fixture::new();
        let mut session = enabled(DrawKind::Circle, &mut fx, DrawOptionsPatch::default());
        let center = fx.at(0.0, 0.0);
        let edge = fx.at(80.0, 0.0);
        assert!(session.click(&mut fx.ctx(), center).unwrap().is_none());
        let id = session.click(&mut fx.ctx(), edge).unwrap().unwrap().created().unwrap();
        let circle = fx.shapes.get(id).unwrap().as_circle().unwrap();
        assert!((circle.radius - geodesic::distance(center, edge)).abs() < 1e-6);
    }

    #[test]
    fn test_circle_three_points_collinear_disables() {
        let mut fx = Fixture::new();
        let rx = fx.events.subscribe();
        let patch = DrawOptionsPatch {
            snappable: Some(false),
            ..Default::default()
        };
        let mut session = enabled(DrawKind::Circle3Points, &mut fx, patch);
        for p in [fx.at(0.0, 0.0), fx.at(100.0, 0.0), fx.at(200.0, 0.0)] {
            session.click(&mut fx.ctx(), p).unwrap();
        }
        assert!(!session.enabled());
        assert!(fx.shapes.is_empty());
        let events = poll_events(&rx);
        assert!(!events.iter().any(|e| matches!(e, EditorEvent::Create { .. })));
        assert!(matches!(events.last(), Some(EditorEvent::DrawEnd { .. })));
    }

    #[test]
    fn test_continue_drawing_restarts() {
        let mut fx = Fixture::new();
        let patch = DrawOptionsPatch {
            continue_drawing: Some(true),
            ..Default::default()
        };
        let mut session = enabled(DrawKind::Marker, &mut fx, patch);
        let (a, b) = (fx.at(0.0, 0.0), fx.at(300.0, 0.0));
        session.click(&mut fx.ctx(), a).unwrap();
        session.click(&mut fx.ctx(), b).unwrap();
        assert!(session.enabled());
        assert_eq!(session.state(), DrawState::AwaitingFirstVertex);
        assert_eq!(session.finished_count(), 2);
        assert_eq!(fx.shapes.len(), 2);
    }

    #[test]
    fn test_require_snap_first_layer_exemption() {
        let mut fx = Fixture::new();
        let patch = DrawOptionsPatch {
            require_snap_to_finish: Some(true),
            continue_drawing: Some(true),
            ..Default::default()
        };
        let mut session = enabled(DrawKind::Marker, &mut fx, patch);
        let first = fx.at(0.0, 0.0);
        assert!(session.click(&mut fx.ctx(), first).unwrap().is_some());

        // Far from the first marker: refused, and the vertex is taken back.
        let far = fx.at(500.0, 500.0);
        assert!(session.click(&mut fx.ctx(), far).unwrap().is_none());
        assert!(session.vertices().is_empty());

        // Close to the first marker: snaps and finishes.
        let near = fx.at(5.0, 5.0);
        assert!(session.click(&mut fx.ctx(), near).unwrap().is_some());
        assert_eq!(fx.shapes.len(), 2);
    }

    #[test]
    fn test_snapped_hint_position() {
        let mut fx = Fixture::new();
        let target = fx.at(0.0, 0.0);
        fx.shapes.add(Shape::Marker(Marker::new(target))).unwrap();
        let mut session = enabled(DrawKind::Line, &mut fx, DrawOptionsPatch::default());
        let cursor = fx.at(8.0, 0.0);
        let hint = *session.pointer_move(cursor, &fx.shapes, &fx.projection).unwrap();
        assert!(hint.is_snapped());
        assert_eq!(hint.latlng, target);

        let far = fx.at(200.0, 0.0);
        let hint = *session.pointer_move(far, &fx.shapes, &fx.projection).unwrap();
        assert!(!hint.is_snapped());
        assert_eq!(hint.latlng, far);
    }

    #[test]
    fn test_finish_on_double_click() {
        let mut fx = Fixture::new();
        let patch = DrawOptionsPatch {
            finish_on: Some(FinishOn::DoubleClick),
            ..Default::default()
        };
        let mut session = enabled(DrawKind::Line, &mut fx, patch);
        let (a, b) = (fx.at(0.0, 0.0), fx.at(100.0, 0.0));
        session.click(&mut fx.ctx(), a).unwrap();
        session.click(&mut fx.ctx(), b).unwrap();
        let finished = session.double_click(&mut fx.ctx(), b).unwrap();
        assert!(finished.is_some());
    }

    #[test]
    fn test_remove_last_vertex() {
        let mut fx = Fixture::new();
        let mut session = enabled(DrawKind::Polygon, &mut fx, DrawOptionsPatch::default());
        let a = fx.at(0.0, 0.0);
        session.click(&mut fx.ctx(), a).unwrap();
        assert_eq!(session.remove_last_vertex().map(|v| v.latlng), Some(a));
        assert_eq!(session.state(), DrawState::AwaitingFirstVertex);
        assert!(session.remove_last_vertex().is_none());
    }

    #[test]
    fn test_preview_and_measurements() {
        let mut fx = Fixture::new();
        let mut session = enabled(DrawKind::Line, &mut fx, DrawOptionsPatch::default());
        let a = fx.at(0.0, 0.0);
        session.click(&mut fx.ctx(), a).unwrap();
        let cursor = fx.at(100.0, 0.0);
        session.pointer_move(cursor, &fx.shapes, &fx.projection);

        let preview = session.preview(&fx.projection).unwrap();
        assert!(preview.is_temporary());
        let hint_line = session.hint_line().unwrap();
        assert!(hint_line.is_temporary());
        assert_eq!(hint_line.latlngs(), vec![a, cursor]);
        assert_eq!(hint_line.style(), &session.options().hintline_style);

        let m = session.measurements(&fx.projection).unwrap();
        let expected = geodesic::distance(a, cursor);
        assert!((m.total_length.unwrap() - expected).abs() < 1e-6);
        let labels = session.measurement_labels(&fx.projection);
        assert_eq!(labels[0].0, "totalLength");
    }

    #[test]
    fn test_distance_line_keeps_interval() {
        let mut fx = Fixture::new();
        let patch = DrawOptionsPatch {
            distance_interval_m: Some(250.0),
            ..Default::default()
        };
        let mut session = enabled(DrawKind::DistanceLine, &mut fx, patch);
        let (a, b) = (fx.at(0.0, 0.0), fx.at(300.0, 0.0));
        session.click(&mut fx.ctx(), a).unwrap();
        session.click(&mut fx.ctx(), b).unwrap();
        let id = session.finish(&mut fx.ctx()).unwrap().unwrap().created().unwrap();
        match fx.shapes.get(id).unwrap() {
            Shape::Polyline(line) => assert_eq!(line.distance_interval, Some(250.0)),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_ring_closes_on_own_vertex_when_snap_required() {
        let mut fx = Fixture::new();
        let far = fx.at(1000.0, 1000.0);
        fx.shapes.add(Shape::Marker(Marker::new(far))).unwrap();
        let patch = DrawOptionsPatch {
            require_snap_to_finish: Some(true),
            ..Default::default()
        };
        let mut session = enabled(DrawKind::Polygon, &mut fx, patch);
        for p in [fx.at(0.0, 0.0), fx.at(100.0, 0.0), fx.at(100.0, 100.0)] {
            session.click(&mut fx.ctx(), p).unwrap();
        }
        // A free position with a committed shape around: refused.
        assert!(session.finish(&mut fx.ctx()).unwrap().is_none());

        let closing = fx.at(3.0, 2.0);
        let finished = session.click(&mut fx.ctx(), closing).unwrap();
        assert!(finished.and_then(|f| f.created()).is_some());
        assert_eq!(fx.shapes.len(), 2);
    }

    #[test]
    fn test_freehand_stroke_creates_polyline() {
        let mut fx = Fixture::new();
        let rx = fx.events.subscribe();
        let mut session = enabled(DrawKind::Freehand, &mut fx, DrawOptionsPatch::default());
        let start = fx.at(0.0, 0.0);

        // Clicks and plain moves do nothing before a press.
        assert!(session.click(&mut fx.ctx(), start).unwrap().is_none());
        session.pointer_move(fx.at(5.0, 5.0), &fx.shapes, &fx.projection);
        assert!(session.vertices().is_empty());

        assert!(session.press(start).unwrap());
        for i in 1..=4 {
            let p = fx.at(i as f64 * 10.0, (i % 2) as f64 * 10.0);
            session.pointer_move(p, &fx.shapes, &fx.projection);
        }
        assert!(session.is_stroking());
        assert_eq!(session.vertices().len(), 5);
        assert!(session.preview(&fx.projection).is_some());
        assert!(session.hint_line().is_none());

        let end = fx.at(50.0, 0.0);
        let id = session.release(&mut fx.ctx(), end).unwrap().unwrap().created().unwrap();
        match fx.shapes.get(id).unwrap() {
            Shape::Polyline(line) => assert_eq!(line.vertices.len(), 6),
            other => panic!("unexpected shape {other:?}"),
        }
        assert!(!session.enabled());
        let events = poll_events(&rx);
        assert!(events.iter().any(|e| matches!(e, EditorEvent::Create { kind: DrawKind::Freehand, .. })));
    }

    #[test]
    fn test_freehand_fill_creates_polygon() {
        let mut fx = Fixture::new();
        let patch = DrawOptionsPatch {
            freehand_fill: Some(true),
            ..Default::default()
        };
        let mut session = enabled(DrawKind::Freehand, &mut fx, patch);
        session.press(fx.at(0.0, 0.0)).unwrap();
        for (dx, dy) in [(100.0, 0.0), (100.0, 100.0)] {
            let p = fx.at(dx, dy);
            session.pointer_move(p, &fx.shapes, &fx.projection);
        }
        let end = fx.at(0.0, 100.0);
        let id = session.release(&mut fx.ctx(), end).unwrap().unwrap().created().unwrap();
        let polygon = fx.shapes.get(id).unwrap().as_polygon().unwrap();
        assert_eq!(polygon.vertices.len(), 4);
        assert!(polygon.area() > 0.0);
    }

    #[test]
    fn test_freehand_short_stroke_disables() {
        let mut fx = Fixture::new();
        let rx = fx.events.subscribe();
        let mut session = enabled(DrawKind::Freehand, &mut fx, DrawOptionsPatch::default());
        let p = fx.at(0.0, 0.0);
        session.press(p).unwrap();
        assert!(session.release(&mut fx.ctx(), p).unwrap().is_none());
        assert!(!session.enabled());
        assert!(fx.shapes.is_empty());
        let events = poll_events(&rx);
        assert!(!events.iter().any(|e| matches!(e, EditorEvent::Create { .. })));
        assert!(matches!(events.last(), Some(EditorEvent::DrawEnd { .. })));
    }

    #[test]
    fn test_press_ignored_by_click_kinds() {
        let mut fx = Fixture::new();
        let mut session = enabled(DrawKind::Line, &mut fx, DrawOptionsPatch::default());
        let p = fx.at(0.0, 0.0);
        assert!(!session.press(p).unwrap());
        assert!(session.release(&mut fx.ctx(), p).unwrap().is_none());
        assert!(session.vertices().is_empty());
    }

    #[test]
    fn test_zones_placed_on_click() {
        let mut fx = Fixture::new();
        let mut session =
            enabled(DrawKind::DangerousGoodsZones, &mut fx, DrawOptionsPatch::default());
        let center = fx.at(0.0, 0.0);
        session.pointer_move(center, &fx.shapes, &fx.projection);
        let preview = session.preview(&fx.projection).unwrap();
        assert!(preview.is_temporary());

        let id = session.click(&mut fx.ctx(), center).unwrap().unwrap().created().unwrap();
        let zones = fx.shapes.get(id).unwrap().as_zones().unwrap();
        assert_eq!(zones.center, center);
        assert_eq!(zones.zones.len(), 4);
        assert!((zones.outer_radius() - 1000.0).abs() < f64::EPSILON);
        assert!(!session.enabled());
    }

    #[test]
    fn test_zones_require_snap() {
        let mut fx = Fixture::new();
        let target = fx.at(0.0, 0.0);
        fx.shapes.add(Shape::Marker(Marker::new(target))).unwrap();
        let patch = DrawOptionsPatch {
            require_snap_to_finish: Some(true),
            ..Default::default()
        };
        let mut session = enabled(DrawKind::DangerousGoodsZones, &mut fx, patch);

        let free = fx.at(400.0, 400.0);
        assert!(session.click(&mut fx.ctx(), free).unwrap().is_none());
        assert!(session.vertices().is_empty());
        assert!(session.enabled());

        let near = fx.at(4.0, 0.0);
        let id = session.click(&mut fx.ctx(), near).unwrap().unwrap().created().unwrap();
        assert_eq!(fx.shapes.get(id).unwrap().as_zones().unwrap().center, target);
    }
}

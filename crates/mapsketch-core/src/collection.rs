//! The collection of committed shapes.

use crate::boolean::Geometry;
use crate::config::EXPORT_CIRCLE_SEGMENTS;
use crate::geodesic::LatLngBounds;
use crate::shapes::{Shape, ShapeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Committed shapes keyed by ID, with insertion (z) order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShapeCollection {
    shapes: HashMap<ShapeId, Shape>,
    /// Z-order of shapes (back to front).
    z_order: Vec<ShapeId>,
}

impl ShapeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shape. Temporary shapes are refused and handed back.
    pub fn add(&mut self, shape: Shape) -> Result<ShapeId, Shape> {
        if shape.is_temporary() {
            return Err(shape);
        }
        let id = shape.id();
        if self.shapes.insert(id, shape).is_none() {
            self.z_order.push(id);
        }
        Ok(id)
    }

    /// Remove a shape by ID.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        self.z_order.retain(|&shape_id| shape_id != id);
        self.shapes.remove(&id)
    }

    /// Replace `id` with `fragments`, keeping the z position of the original.
    /// Returns the removed shape, or `None` if `id` is unknown.
    pub fn replace(&mut self, id: ShapeId, fragments: Vec<Shape>) -> Option<Shape> {
        let pos = self.z_order.iter().position(|&shape_id| shape_id == id)?;
        let original = self.shapes.remove(&id)?;
        self.z_order.remove(pos);
        let mut at = pos;
        for fragment in fragments {
            if fragment.is_temporary() {
                continue;
            }
            let fid = fragment.id();
            if self.shapes.insert(fid, fragment).is_none() {
                self.z_order.insert(at, fid);
                at += 1;
            }
        }
        Some(original)
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.get_mut(&id)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    /// Get shapes in z-order (back to front).
    pub fn ordered(&self) -> impl Iterator<Item = &Shape> {
        self.z_order.iter().filter_map(|id| self.shapes.get(id))
    }

    /// Shapes that take part in snapping and cutting.
    pub fn editable(&self) -> impl Iterator<Item = &Shape> {
        self.ordered().filter(|s| s.is_editable())
    }

    /// Whether any committed shape exists at all.
    pub fn has_committed(&self) -> bool {
        !self.shapes.is_empty()
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        self.ordered()
            .filter_map(Shape::bounds)
            .reduce(LatLngBounds::union)
    }

    /// Every shape as boolean-library geometry, in z-order.
    /// Circles become polygons with [`EXPORT_CIRCLE_SEGMENTS`] sides.
    pub fn to_geometry(&self) -> Geometry {
        Geometry::GeometryCollection(
            self.ordered()
                .filter_map(|s| s.to_geometry(EXPORT_CIRCLE_SEGMENTS))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.z_order.clear();
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

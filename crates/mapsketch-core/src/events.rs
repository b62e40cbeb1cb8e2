//! Typed editor events delivered over mpsc channels.

use crate::draw::DrawKind;
use crate::editor::ActiveMode;
use crate::geodesic::{LatLng, LatLngBounds};
use crate::shapes::{Shape, ShapeId};
use std::sync::mpsc::{Receiver, Sender, channel};

/// Events published by the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A draw session was enabled.
    DrawStart { kind: DrawKind },
    /// A draw session was disabled.
    DrawEnd { kind: DrawKind },
    /// A shape was committed to the collection.
    Create { kind: DrawKind, shape: Shape },
    /// A vertex was placed in the active session.
    VertexAdded {
        kind: DrawKind,
        latlng: LatLng,
        snapped: bool,
    },
    /// One fragment replacing a cut shape.
    Cut {
        original: ShapeId,
        fragment: Shape,
        /// Bounds of the cutting polygon.
        cutting_extent: Option<LatLngBounds>,
    },
    /// A copy of `source` was placed.
    Copy { source: ShapeId, shape: Shape },
    /// A shape was removed from the collection.
    Remove { shape: Shape },
    /// The global editing mode changed.
    ModeChanged { from: ActiveMode, to: ActiveMode },
}

/// Fan-out of editor events to any number of subscribers.
///
/// Subscribers whose receiver was dropped are pruned on the next emit.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<EditorEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&mut self) -> Receiver<EditorEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber.
    pub fn emit(&mut self, event: EditorEvent) {
        log::trace!("event: {event:?}");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Drain every pending event without blocking.
pub fn poll_events(rx: &Receiver<EditorEvent>) -> Vec<EditorEvent> {
    rx.try_iter().collect()
}

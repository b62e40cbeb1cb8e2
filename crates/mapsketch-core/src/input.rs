//! Pointer and keyboard input for draw sessions.

use crate::geodesic::{LatLng, Projection};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Pointer event in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Move { latlng: LatLng },
    Click { latlng: LatLng },
    DoubleClick { latlng: LatLng },
    /// Button held down, starts a freehand stroke.
    Press { latlng: LatLng },
    Release { latlng: LatLng },
}

impl PointerEvent {
    pub fn latlng(&self) -> LatLng {
        match *self {
            PointerEvent::Move { latlng }
            | PointerEvent::Click { latlng }
            | PointerEvent::DoubleClick { latlng }
            | PointerEvent::Press { latlng }
            | PointerEvent::Release { latlng } => latlng,
        }
    }
}

/// Keys the editor reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Enter,
    Backspace,
    Other(String),
}

impl FromStr for Key {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Escape" | "Esc" => Key::Escape,
            "Enter" | "Return" => Key::Enter,
            "Backspace" => Key::Backspace,
            other => Key::Other(other.to_string()),
        })
    }
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(500);
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Turns raw clicks into clicks and double clicks.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Last known cursor position.
    pub cursor: Option<LatLng>,
    last_click: Option<(Instant, LatLng)>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pointer move.
    pub fn pointer_moved(&mut self, latlng: LatLng) -> PointerEvent {
        self.cursor = Some(latlng);
        PointerEvent::Move { latlng }
    }

    pub fn pointer_pressed(&mut self, latlng: LatLng) -> PointerEvent {
        self.cursor = Some(latlng);
        PointerEvent::Press { latlng }
    }

    pub fn pointer_released(&mut self, latlng: LatLng) -> PointerEvent {
        self.cursor = Some(latlng);
        PointerEvent::Release { latlng }
    }

    /// Record a click happening now.
    pub fn click(&mut self, latlng: LatLng, projection: &Projection) -> PointerEvent {
        self.click_at(latlng, Instant::now(), projection)
    }

    /// Record a click at `now`; a second click close in time and space becomes a double click.
    pub fn click_at(&mut self, latlng: LatLng, now: Instant, projection: &Projection) -> PointerEvent {
        self.cursor = Some(latlng);
        if let Some((time, position)) = self.last_click {
            let elapsed = now.saturating_duration_since(time);
            if elapsed < DOUBLE_CLICK_TIME
                && projection.pixel_distance(position, latlng) < DOUBLE_CLICK_DISTANCE
            {
                // Reset so a triple click is not a second double click
                self.last_click = None;
                return PointerEvent::DoubleClick { latlng };
            }
        }
        self.last_click = Some((now, latlng));
        PointerEvent::Click { latlng }
    }
}

//! Swipe classification helpers
//!
//! Pure functions used by the drawer state machine:
//! - Swipe intent from the drag angle (with an uncertainty dead zone)
//! - Smoothed drag speed
//! - Direction conventions for left/right anchored panels

use serde::{Deserialize, Serialize};

/// Position in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Screen edge the panel slides out from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    #[default]
    Left,
    Right,
}

impl Anchor {
    /// Convert a raw horizontal movement into movement toward "open".
    /// Positive means the panel is being pulled out.
    pub fn opening_delta(self, dx: f64) -> f64 {
        match self {
            Anchor::Left => dx,
            Anchor::Right => -dx,
        }
    }

    /// Horizontal direction that opens a panel on this edge
    pub fn opening_direction(self) -> SwipeDirection {
        match self {
            Anchor::Left => SwipeDirection::Right,
            Anchor::Right => SwipeDirection::Left,
        }
    }

    /// Direction a swipe must take given the committed state
    pub fn required_direction(self, is_open: bool) -> SwipeDirection {
        if is_open {
            self.opening_direction().reversed()
        } else {
            self.opening_direction()
        }
    }
}

/// Horizontal direction of a swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn reversed(self) -> Self {
        match self {
            SwipeDirection::Left => SwipeDirection::Right,
            SwipeDirection::Right => SwipeDirection::Left,
        }
    }
}

/// Whether the current gesture is meant to move the panel.
///
/// Only ever leaves `Unknown` once per gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwipeIntent {
    #[default]
    Unknown,
    Swipe,
    NotASwipe,
}

/// Signed drag angle in radians, measured from the vertical axis.
///
/// Positive for rightward drags, negative for leftward ones, ±π/2 for a
/// perfectly horizontal drag. Returns `None` when there is no movement at
/// all or the input isn't finite.
pub fn drag_angle(start: Point, current: Point) -> Option<f64> {
    if !start.is_finite() || !current.is_finite() {
        return None;
    }
    let dx = current.x - start.x;
    let dy = (current.y - start.y).abs();
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    // same as -atan((start.x - x) / |dy|), defined for dy == 0
    Some(dx.atan2(dy))
}

/// Direction of a drag whose angle leaves the arc dead zone
pub fn swipe_direction(rads: f64, min_arc_rads: f64) -> Option<SwipeDirection> {
    if rads >= min_arc_rads {
        Some(SwipeDirection::Right)
    } else if rads <= -min_arc_rads {
        Some(SwipeDirection::Left)
    } else {
        None
    }
}

/// Thresholds for deciding swipe intent
#[derive(Debug, Clone, Copy)]
pub struct SwipeClassifier {
    /// Pixels of travel along either axis before intent is decided
    pub uncertainty_threshold: f64,
    /// Minimum angle from vertical, in radians
    pub min_arc_rads: f64,
}

impl SwipeClassifier {
    pub fn new(uncertainty_threshold: f64, min_arc_degrees: f64) -> Self {
        Self {
            uncertainty_threshold,
            min_arc_rads: min_arc_degrees.to_radians(),
        }
    }

    /// Classify a drag from `start` to `current`.
    ///
    /// `required` is the direction that would move the panel given its
    /// anchor and committed state.
    pub fn classify(&self, start: Point, current: Point, required: SwipeDirection) -> SwipeIntent {
        let dx = (current.x - start.x).abs();
        let dy = (current.y - start.y).abs();
        if !(dx > self.uncertainty_threshold || dy > self.uncertainty_threshold) {
            return SwipeIntent::Unknown;
        }
        let Some(rads) = drag_angle(start, current) else {
            return SwipeIntent::Unknown;
        };
        match swipe_direction(rads, self.min_arc_rads) {
            Some(direction) if direction == required => SwipeIntent::Swipe,
            _ => SwipeIntent::NotASwipe,
        }
    }
}

/// Weight kept from the previous speed sample
const SPEED_DECAY: f64 = 0.4;

/// Blend an instantaneous speed (px/ms) into the running average.
///
/// A zero or negative elapsed time carries no information, so the previous
/// speed is kept.
pub fn smoothed_speed(previous: f64, distance: f64, elapsed_ms: f64) -> f64 {
    if !(elapsed_ms > 0.0) || !distance.is_finite() {
        return previous;
    }
    let instant = distance.abs() / elapsed_ms;
    previous * SPEED_DECAY + instant * (1.0 - SPEED_DECAY)
}

/// Offset a drag has to pass for a release to commit "open"
pub fn hysteresis_threshold(panel_width: f64, fraction: f64) -> f64 {
    panel_width * fraction
}

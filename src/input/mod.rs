//! Input handling - swipeable drawer gestures
//!
//! This module provides:
//! - Swipe classification helpers (angle, speed, hysteresis)
//! - The drawer drag-response state machine

mod drawer;
mod gestures;

pub use drawer::*;
pub use gestures::*;

//! Swipeable drawer gestures
//!
//! Tells taps, peeks, drags and flings apart from pointer/touch input and
//! drives the open/closed state of an edge-anchored panel.

pub mod config;
pub mod input;
pub mod replay;

pub use config::{ConfigError, DrawerConfig};
pub use input::{DrawerHost, SwipeDrawer};

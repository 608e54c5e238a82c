//! Drawer tuning constants
//!
//! Loaded from TOML, every field optional:
//!
//! ```toml
//! panel_width = 280.0
//! peek_width = 20.0
//! peek_delay_ms = 100
//! hysteresis_fraction = 0.55
//! min_arc_angle_degrees = 30.0
//! min_fling_speed = 0.3
//! uncertainty_threshold = 3.0
//! anchor = "left"
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::{hysteresis_threshold, Anchor, SwipeClassifier};

/// Width of the navigation sidebar (left edge)
pub const NAV_SIDEBAR_WIDTH: f64 = 240.0;
/// Width of the discussion thread drawer (right edge)
pub const DISCUSSION_THREAD_WIDTH: f64 = 320.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for one swipeable drawer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawerConfig {
    /// Fully open offset in pixels
    pub panel_width: f64,

    /// Offset shown while pressing a closed panel without moving
    pub peek_width: f64,

    /// How long a press must be held before the peek shows
    #[serde(rename = "peek_delay_ms", with = "millis")]
    pub peek_delay: Duration,

    /// How far it must be pulled out to stay out (0 - 1)
    pub hysteresis_fraction: f64,

    /// How sloppy a pull can be. 0 means everything is a swipe, 90 only
    /// perfectly horizontal drags
    pub min_arc_angle_degrees: f64,

    /// Faster than this (px/ms) and it's a fling
    pub min_fling_speed: f64,

    /// Pixels to move along one axis before intent is decided
    pub uncertainty_threshold: f64,

    /// Edge the panel slides out from
    pub anchor: Anchor,
}

impl Default for DrawerConfig {
    fn default() -> Self {
        Self {
            panel_width: NAV_SIDEBAR_WIDTH,
            peek_width: 20.0,
            peek_delay: Duration::from_millis(100),
            hysteresis_fraction: 0.55,
            min_arc_angle_degrees: 30.0,
            min_fling_speed: 0.3,
            uncertainty_threshold: 3.0,
            anchor: Anchor::Left,
        }
    }
}

impl DrawerConfig {
    /// Left-anchored navigation sidebar
    pub fn nav_sidebar() -> Self {
        Self::default()
    }

    /// Right-anchored discussion thread
    pub fn discussion_thread() -> Self {
        Self {
            panel_width: DISCUSSION_THREAD_WIDTH,
            anchor: Anchor::Right,
            ..Self::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!("Loaded drawer config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.panel_width > 0.0) || !self.panel_width.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "panel_width must be positive, got {}",
                self.panel_width
            )));
        }
        if !(self.peek_width >= 0.0 && self.peek_width < self.panel_width) {
            return Err(ConfigError::Invalid(format!(
                "peek_width must be in [0, {}), got {}",
                self.panel_width, self.peek_width
            )));
        }
        if !(self.hysteresis_fraction > 0.0 && self.hysteresis_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "hysteresis_fraction must be in (0, 1), got {}",
                self.hysteresis_fraction
            )));
        }
        if !(0.0..=90.0).contains(&self.min_arc_angle_degrees) {
            return Err(ConfigError::Invalid(format!(
                "min_arc_angle_degrees must be in [0, 90], got {}",
                self.min_arc_angle_degrees
            )));
        }
        if !(self.min_fling_speed >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_fling_speed must not be negative, got {}",
                self.min_fling_speed
            )));
        }
        if !(self.uncertainty_threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "uncertainty_threshold must not be negative, got {}",
                self.uncertainty_threshold
            )));
        }
        Ok(())
    }

    pub fn hysteresis_threshold(&self) -> f64 {
        hysteresis_threshold(self.panel_width, self.hysteresis_fraction)
    }

    pub fn classifier(&self) -> SwipeClassifier {
        SwipeClassifier::new(self.uncertainty_threshold, self.min_arc_angle_degrees)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

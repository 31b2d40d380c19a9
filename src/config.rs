//! Engine configuration
//!
//! All tuning constants live here so deployments can adjust them without a
//! rebuild. Defaults match the reference behavior.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub blink: BlinkConfig,
    pub expression: ExpressionConfig,
    pub hands: HandConfig,
    pub focus: FocusConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Blink and tiredness thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Eye openness below this ratio counts as closed
    pub closed_ratio: f64,
    /// Minimum closed run (frames) that counts as a blink
    pub debounce_frames: u32,
    /// Closed run (frames) that counts as a long closure
    pub long_closure_frames: u32,
    /// Blinks per minute above which the user is considered tired
    pub tired_blinks_per_min: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            closed_ratio: 0.2,
            debounce_frames: 3,
            long_closure_frames: 30,
            tired_blinks_per_min: 40.0,
        }
    }
}

/// Expression calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Number of frames used to build the neutral baseline
    pub calibration_frames: u32,
    /// Corner drop required for a frown, as a fraction of frame height
    pub frown_delta_ratio: f64,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            calibration_frames: 30,
            frown_delta_ratio: 0.004,
        }
    }
}

/// Hand activity parameters (speeds are in body-widths per second)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandConfig {
    /// EMA weight of the newest speed sample
    pub smoothing: f64,
    /// Speeds below this are treated as stillness
    pub idle_threshold: f64,
    /// Speeds are clamped to this before smoothing
    pub max_speed: f64,
    pub good_band_min: f64,
    pub good_band_max: f64,
    /// Mean speed at or above this is overactive
    pub overactive_threshold: f64,
    pub window_secs: f64,
    pub window_capacity: usize,
}

impl Default for HandConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.3,
            idle_threshold: 0.05,
            max_speed: 5.0,
            good_band_min: 0.1,
            good_band_max: 0.8,
            overactive_threshold: 1.2,
            window_secs: 10.0,
            window_capacity: 300,
        }
    }
}

/// Fusion weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub phone_penalty: f64,
    pub tired_weight: f64,
    pub fidgety_weight: f64,
    /// Minimum score that counts as focused
    pub focused_threshold: f64,
    /// Floor applied to the fidgety score while hands are overactive
    pub fidgety_floor: f64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            phone_penalty: 0.5,
            tired_weight: 0.3,
            fidgety_weight: 0.2,
            focused_threshold: 0.6,
            fidgety_floor: 0.7,
        }
    }
}

/// Session worker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frames buffered between ingestion and the session worker
    pub frame_queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_queue_capacity: 32,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "focus_engine=debug,warn")
    pub level: String,
    /// Whether to output structured JSON logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load config from a JSON file, falling back to defaults.
    ///
    /// A missing file is not an error. An unreadable or malformed file is
    /// logged and replaced by defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_json(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, e);
            }
        }
        Self::default()
    }

    /// Parse and validate config JSON
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to pretty JSON
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the trackers cannot work with
    pub fn validate(&self) -> Result<(), EngineError> {
        let hands = &self.hands;
        if !(hands.smoothing > 0.0 && hands.smoothing <= 1.0) {
            return Err(EngineError::ConfigError(format!(
                "hands.smoothing must be in (0, 1], got {}",
                hands.smoothing
            )));
        }
        if !(hands.max_speed >= 0.0) {
            return Err(EngineError::ConfigError(format!(
                "hands.max_speed must be non-negative, got {}",
                hands.max_speed
            )));
        }
        if !(hands.idle_threshold >= 0.0) {
            return Err(EngineError::ConfigError(format!(
                "hands.idle_threshold must be non-negative, got {}",
                hands.idle_threshold
            )));
        }
        if hands.good_band_min > hands.good_band_max {
            return Err(EngineError::ConfigError(format!(
                "hands good band is empty: [{}, {}]",
                hands.good_band_min, hands.good_band_max
            )));
        }
        if hands.window_secs <= 0.0 || hands.window_capacity == 0 {
            return Err(EngineError::ConfigError(
                "hands window must have a positive horizon and capacity".to_string(),
            ));
        }
        if self.expression.calibration_frames == 0 {
            return Err(EngineError::ConfigError(
                "expression.calibration_frames must be at least 1".to_string(),
            ));
        }
        if self.blink.closed_ratio <= 0.0 {
            return Err(EngineError::ConfigError(format!(
                "blink.closed_ratio must be positive, got {}",
                self.blink.closed_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.focus.focused_threshold) {
            return Err(EngineError::ConfigError(format!(
                "focus.focused_threshold must be in [0, 1], got {}",
                self.focus.focused_threshold
            )));
        }
        if self.session.frame_queue_capacity == 0 {
            return Err(EngineError::ConfigError(
                "session.frame_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

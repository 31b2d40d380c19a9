//! External capabilities consumed by the engine
//!
//! Landmark extraction and object detection are opaque collaborators. They
//! are injected into each session as trait objects so that sessions share no
//! hidden global model state and tests can substitute them freely.

use crate::error::EngineError;
use crate::types::{Detection, LandmarkSnapshot, PhoneSignal};
use serde::{Deserialize, Serialize};

/// Detector labels that count as a phone
pub const PHONE_LABELS: [&str; 3] = ["cell phone", "cellphone", "mobile phone"];

/// Turns an encoded frame into landmarks.
///
/// `Ok(None)` means nothing was found; trackers skip the frame.
pub trait LandmarkProvider: Send + Sync {
    fn extract(&self, image: &[u8]) -> Result<Option<LandmarkSnapshot>, EngineError>;
}

/// Turns an encoded frame into labelled detections
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, EngineError>;
}

impl PhoneSignal {
    /// Phone presence from a detector's output: highest confidence among phone labels
    pub fn from_detections(detections: &[Detection]) -> Self {
        let best = detections
            .iter()
            .filter(|d| PHONE_LABELS.contains(&d.label.as_str()))
            .map(|d| d.confidence)
            .fold(0.0_f64, f64::max);

        PhoneSignal {
            detected: best > 0.0,
            confidence: best,
        }
    }
}

/// A detector that never finds anything, for deployments without a phone model
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDetector;

impl ObjectDetector for NoopDetector {
    fn detect(&self, _image: &[u8]) -> Result<Vec<Detection>, EngineError> {
        Ok(Vec::new())
    }
}

/// A frame whose landmarks and detections were computed upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecomputedFrame {
    /// Capture time in seconds, used by replays
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub landmarks: Option<LandmarkSnapshot>,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl PrecomputedFrame {
    pub fn parse(bytes: &[u8]) -> Result<Self, EngineError> {
        serde_json::from_slice(bytes)
            .map_err(|e| EngineError::ProviderError(format!("not a precomputed frame: {e}")))
    }
}

/// Reads frames that already carry their landmarks and detections as JSON.
///
/// Used when inference runs on the client or in an upstream service, and by
/// the CLI replays.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecomputedFrames;

impl LandmarkProvider for PrecomputedFrames {
    fn extract(&self, image: &[u8]) -> Result<Option<LandmarkSnapshot>, EngineError> {
        Ok(PrecomputedFrame::parse(image)?.landmarks)
    }
}

impl ObjectDetector for PrecomputedFrames {
    fn detect(&self, image: &[u8]) -> Result<Vec<Detection>, EngineError> {
        Ok(PrecomputedFrame::parse(image)?.detections)
    }
}

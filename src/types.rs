//! Core types for the focus engine
//!
//! This module defines the data structures that flow through each stage of the
//! per-frame pipeline: landmark snapshots, per-signal results, the fused focus
//! result, and the session summary.

use serde::{Deserialize, Serialize};

/// A 2D point. Landmark groups carry normalized coordinates (0-1), trackers
/// work in pixels after [`Point2::to_pixels`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Scale a normalized point into frame pixel coordinates
    pub fn to_pixels(&self, frame: FrameSize) -> Point2 {
        Point2 {
            x: self.x * frame.width as f64,
            y: self.y * frame.height as f64,
        }
    }
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Six-point eye contour: `[outer corner, upper 1, upper 2, inner corner, lower 2, lower 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeContour(pub [Point2; 6]);

/// Mouth corners plus the nose tip used as the vertical reference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouthLandmarks {
    pub left_corner: Point2,
    pub right_corner: Point2,
    pub nose_tip: Point2,
}

/// A left/right pair of reference points (shoulders, face edges)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPair {
    pub left: Point2,
    pub right: Point2,
}

impl PointPair {
    /// Pixel distance between the two points
    pub fn span_px(&self, frame: FrameSize) -> f64 {
        self.left.to_pixels(frame).distance(&self.right.to_pixels(frame))
    }
}

/// Landmarks extracted from one frame by a landmark provider.
///
/// Every group is optional. An absent group means the corresponding tracker
/// is not updated for this frame; it is never replaced by zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSnapshot {
    pub frame: FrameSize,
    #[serde(default)]
    pub left_eye: Option<EyeContour>,
    #[serde(default)]
    pub right_eye: Option<EyeContour>,
    #[serde(default)]
    pub mouth: Option<MouthLandmarks>,
    #[serde(default)]
    pub shoulders: Option<PointPair>,
    #[serde(default)]
    pub face_width: Option<PointPair>,
    #[serde(default)]
    pub left_wrist: Option<Point2>,
    #[serde(default)]
    pub right_wrist: Option<Point2>,
}

impl LandmarkSnapshot {
    /// An empty snapshot for a frame of the given size
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            frame: FrameSize { width, height },
            left_eye: None,
            right_eye: None,
            mouth: None,
            shoulders: None,
            face_width: None,
            left_wrist: None,
            right_wrist: None,
        }
    }
}

/// Bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A single object detection reported by an object detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub bounding_box: BoundingBox,
}

/// Phone presence for one frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhoneSignal {
    pub detected: bool,
    /// Highest confidence among phone detections (0 when none)
    pub confidence: f64,
}

/// Tiredness derived from blink state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TiredSignal {
    pub is_tired: bool,
    /// 0-1 (1 = extremely tired)
    pub score: f64,
}

/// Fidgetiness derived from hand activity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FidgetySignal {
    pub is_fidgety: bool,
    /// 0-1 (1 = very fidgety)
    pub movement_score: f64,
}

/// Fused focus assessment for one processed frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusResult {
    pub phone: PhoneSignal,
    pub tired: TiredSignal,
    pub fidgety: FidgetySignal,
    /// 0-1
    pub focus_score: f64,
    pub is_focused: bool,
}

/// One point of the per-session focus timeline, serialized as `[t, score]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(u64, f64)", into = "(u64, f64)")]
pub struct FocusSample {
    /// Per-session sequence number (not wall-clock)
    pub sequence: u64,
    pub score: f64,
}

impl From<(u64, f64)> for FocusSample {
    fn from((sequence, score): (u64, f64)) -> Self {
        Self { sequence, score }
    }
}

impl From<FocusSample> for (u64, f64) {
    fn from(sample: FocusSample) -> Self {
        (sample.sequence, sample.score)
    }
}

/// Session-level aggregate returned by summary queries
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(rename = "phone")]
    pub phone_count: u64,
    #[serde(rename = "tired")]
    pub tired_count: u64,
    #[serde(rename = "fidgety")]
    pub fidgety_count: u64,
    /// Mean over the timeline (0 when empty)
    #[serde(rename = "focus_score")]
    pub average_focus: f64,
    pub focus_timeline: Vec<FocusSample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance_and_scaling() {
        let frame = FrameSize {
            width: 640,
            height: 480,
        };
        let a = Point2::new(0.0, 0.0).to_pixels(frame);
        let b = Point2::new(0.5, 0.5).to_pixels(frame);
        assert_eq!(b, Point2::new(320.0, 240.0));
        assert!((a.distance(&b) - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_focus_sample_serializes_as_pair() {
        let summary = SessionSummary {
            phone_count: 1,
            tired_count: 0,
            fidgety_count: 2,
            average_focus: 0.5,
            focus_timeline: vec![
                FocusSample {
                    sequence: 0,
                    score: 0.25,
                },
                FocusSample {
                    sequence: 1,
                    score: 0.75,
                },
            ],
        };

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["phone"], 1);
        assert_eq!(value["fidgety"], 2);
        assert_eq!(value["focus_score"], 0.5);
        assert_eq!(value["focus_timeline"], serde_json::json!([[0, 0.25], [1, 0.75]]));

        let parsed: SessionSummary = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn test_snapshot_groups_default_to_absent() {
        let json = r#"{ "frame": { "width": 640, "height": 480 } }"#;
        let snapshot: LandmarkSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot, LandmarkSnapshot::empty(640, 480));
    }
}

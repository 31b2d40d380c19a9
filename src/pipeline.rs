//! Per-frame pipeline
//!
//! `FocusProcessor` owns every tracker for one session and runs the
//! synchronous part of frame processing: landmark snapshot into the blink,
//! expression and hand trackers, signal derivation, fusion, then aggregation.
//! Inference happens beforehand in [`analyze_frame`], outside any session lock.

use crate::aggregator::SessionAggregator;
use crate::blink::{eye_openness, BlinkTracker};
use crate::clock::{Clock, MonotonicClock};
use crate::config::EngineConfig;
use crate::expression::ExpressionCalibrator;
use crate::feedback::FeedbackReport;
use crate::fusion::{derive_tired, FocusFusion};
use crate::hands::HandActivityTracker;
use crate::providers::{LandmarkProvider, ObjectDetector};
use crate::types::{FocusResult, LandmarkSnapshot, PhoneSignal, SessionSummary, TiredSignal};
use std::sync::Arc;

/// Output of the inference step for one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameAnalysis {
    /// None when nothing usable was found or extraction failed
    pub landmarks: Option<LandmarkSnapshot>,
    pub phone: PhoneSignal,
}

/// Run both providers on one encoded frame.
///
/// Provider failures never propagate: a failed extraction counts as a frame
/// without landmarks and a failed detection as no phone.
pub fn analyze_frame(
    image: &[u8],
    landmarks: &dyn LandmarkProvider,
    detector: &dyn ObjectDetector,
) -> FrameAnalysis {
    let snapshot = match landmarks.extract(image) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(error = %e, "landmark extraction failed, skipping tracker updates");
            None
        }
    };

    let phone = match detector.detect(image) {
        Ok(detections) => PhoneSignal::from_detections(&detections),
        Err(e) => {
            tracing::warn!(error = %e, "object detection failed, assuming no phone");
            PhoneSignal::default()
        }
    };

    FrameAnalysis {
        landmarks: snapshot,
        phone,
    }
}

/// Stateful per-session processor.
///
/// Must be fed frames in arrival order by a single consumer.
pub struct FocusProcessor {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    blink: BlinkTracker,
    expression: ExpressionCalibrator,
    hands: HandActivityTracker,
    fusion: FocusFusion,
    aggregator: SessionAggregator,
    frames_processed: u64,
}

impl Default for FocusProcessor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl FocusProcessor {
    /// Create a processor timed by a monotonic clock started now
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::start()))
    }

    /// Create a processor with an explicit time source
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let session_start = clock.now_secs();
        Self {
            blink: BlinkTracker::new(config.blink.clone(), session_start),
            expression: ExpressionCalibrator::new(config.expression.clone()),
            hands: HandActivityTracker::new(config.hands.clone()),
            fusion: FocusFusion::new(config.focus.clone()),
            aggregator: SessionAggregator::new(),
            frames_processed: 0,
            config,
            clock,
        }
    }

    /// Process one frame's analysis into a fused result and record it
    pub fn process(&mut self, snapshot: Option<&LandmarkSnapshot>, phone: PhoneSignal) -> FocusResult {
        let now = self.clock.now_secs();
        self.frames_processed += 1;

        if let Some(snapshot) = snapshot {
            self.update_trackers(snapshot, now);
        }

        let tired = self.tired_signal(now);
        let fidgety = self.fusion.derive_fidgety(&self.hands);
        let fused = self
            .fusion
            .compute(phone.detected, tired.score, fidgety.movement_score);

        self.aggregator
            .record(phone.detected, tired.is_tired, fidgety.is_fidgety, fused.score);

        tracing::debug!(
            frame = self.frames_processed,
            has_landmarks = snapshot.is_some(),
            phone = phone.detected,
            tired = tired.is_tired,
            fidgety = fidgety.is_fidgety,
            focus_score = fused.score,
            "frame processed"
        );

        FocusResult {
            phone,
            tired,
            fidgety,
            focus_score: fused.score,
            is_focused: fused.is_focused,
        }
    }

    /// Convenience for synchronous callers: analyze then process
    pub fn process_frame(
        &mut self,
        image: &[u8],
        landmarks: &dyn LandmarkProvider,
        detector: &dyn ObjectDetector,
    ) -> FocusResult {
        let analysis = analyze_frame(image, landmarks, detector);
        self.process(analysis.landmarks.as_ref(), analysis.phone)
    }

    /// Each landmark group updates only its own tracker
    fn update_trackers(&mut self, snapshot: &LandmarkSnapshot, now: f64) {
        let frame = snapshot.frame;

        if let (Some(left), Some(right)) = (&snapshot.left_eye, &snapshot.right_eye) {
            let openness = eye_openness(left, right, frame);
            if self.blink.update(openness) {
                tracing::trace!(total = self.blink.blink_total(), "blink");
            }
        }

        if let Some(mouth) = &snapshot.mouth {
            let left = mouth.left_corner.to_pixels(frame);
            let right = mouth.right_corner.to_pixels(frame);
            let nose = mouth.nose_tip.to_pixels(frame);
            self.expression
                .update(left.y, right.y, nose.y, frame.height as f64);
        }

        self.hands.update_from_snapshot(snapshot, now);
    }

    /// Tiredness at `now`; not evaluated before the first frame
    fn tired_signal(&self, now: f64) -> TiredSignal {
        if self.frames_processed == 0 {
            return TiredSignal::default();
        }
        derive_tired(&self.blink, &self.config.blink, now)
    }

    /// Session summary, optionally resetting counters and timeline
    pub fn summary(&mut self, reset: bool) -> SessionSummary {
        self.aggregator.summary(reset)
    }

    /// Coaching feedback, or None before the first frame
    pub fn feedback(&self) -> Option<FeedbackReport> {
        if self.frames_processed == 0 {
            return None;
        }
        Some(FeedbackReport::build(
            &self.blink,
            &self.hands,
            &self.expression,
            self.frames_processed,
            self.clock.now_secs(),
        ))
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn blink(&self) -> &BlinkTracker {
        &self.blink
    }

    pub fn expression(&self) -> &ExpressionCalibrator {
        &self.expression
    }

    pub fn hands(&self) -> &HandActivityTracker {
        &self.hands
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

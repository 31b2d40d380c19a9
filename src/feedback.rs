//! Human-readable feedback
//!
//! Turns current tracker state into short coaching messages for a UI: blink
//! rate band, hand gesture intensity and expression state.

use crate::blink::BlinkTracker;
use crate::expression::{CalibrationPhase, ExpressionCalibrator};
use crate::hands::HandActivityTracker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blink rates (per minute) considered natural
const NATURAL_BLINK_RANGE: std::ops::RangeInclusive<f64> = 5.0..=30.0;

/// Below this many minutes a low blink rate is not yet meaningful
const MIN_BLINK_MINUTES: f64 = 0.2;

/// Frown share (percent) above which the overall expression gets a nudge
const FROWN_NUDGE_PERCENT: f64 = 20.0;

/// Classification of the session blink rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlinkBand {
    Natural,
    High,
    Gathering,
    Low,
}

impl BlinkBand {
    pub fn classify(blink_rate: f64, elapsed_minutes: f64) -> Self {
        if NATURAL_BLINK_RANGE.contains(&blink_rate) {
            BlinkBand::Natural
        } else if blink_rate > *NATURAL_BLINK_RANGE.end() {
            BlinkBand::High
        } else if elapsed_minutes < MIN_BLINK_MINUTES {
            BlinkBand::Gathering
        } else {
            BlinkBand::Low
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BlinkBand::Natural => "Blinking at a natural rate",
            BlinkBand::High => "You may be blinking a bit too often",
            BlinkBand::Gathering => "Still gathering blink information...",
            BlinkBand::Low => "Try to blink a bit more to avoid eye strain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlinkFeedback {
    /// Blinks per minute
    pub rate: f64,
    pub total: u32,
    pub band: BlinkBand,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandFeedback {
    /// Good-band share of the trailing window (0-100)
    pub score: f64,
    pub overactive: bool,
    pub feedback: String,
}

/// Expression state at the time of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExpressionState {
    Calibrating { collected: u32, required: u32 },
    Frowning,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionFeedback {
    #[serde(flatten)]
    pub state: ExpressionState,
    /// Share of post-calibration frames spent frowning (0-100)
    pub frown_percentage: f64,
    pub feedback: String,
    pub overall: String,
}

/// Snapshot of coaching feedback for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReport {
    pub generated_at: DateTime<Utc>,
    pub frames_processed: u64,
    pub blink_rate: BlinkFeedback,
    pub hand_gestures: HandFeedback,
    pub expression: ExpressionFeedback,
}

impl FeedbackReport {
    /// Build a report from tracker state at time `now` (session clock seconds)
    pub fn build(
        blink: &BlinkTracker,
        hands: &HandActivityTracker,
        expression: &ExpressionCalibrator,
        frames_processed: u64,
        now: f64,
    ) -> Self {
        let rate = blink.blink_rate(now);
        let band = BlinkBand::classify(rate, blink.elapsed_minutes(now));

        let overactive = hands.is_overactive();
        let hand_message = if overactive {
            "Hand gestures are a bit too energetic"
        } else {
            "Hand movement looks controlled"
        };

        let state = match expression.phase() {
            CalibrationPhase::Calibrating {
                collected,
                required,
            } => ExpressionState::Calibrating {
                collected,
                required,
            },
            CalibrationPhase::Calibrated { .. } if expression.is_frowning() => {
                ExpressionState::Frowning
            }
            CalibrationPhase::Calibrated { .. } => ExpressionState::Neutral,
        };
        let expression_message = match state {
            ExpressionState::Calibrating {
                collected,
                required,
            } => format!("Setting up... {collected}/{required}"),
            ExpressionState::Frowning => "Frowning detected!".to_string(),
            ExpressionState::Neutral => "Doing great!".to_string(),
        };

        let frown_percentage = expression.frown_percentage();
        let overall = if frown_percentage < FROWN_NUDGE_PERCENT {
            "Minimal frowning overall, good job!"
        } else {
            "Try to maintain a positive expression."
        };

        Self {
            generated_at: Utc::now(),
            frames_processed,
            blink_rate: BlinkFeedback {
                rate,
                total: blink.blink_total(),
                band,
                feedback: band.message().to_string(),
            },
            hand_gestures: HandFeedback {
                score: hands.gesture_score(),
                overactive,
                feedback: hand_message.to_string(),
            },
            expression: ExpressionFeedback {
                state,
                frown_percentage,
                feedback: expression_message,
                overall: overall.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BlinkConfig, ExpressionConfig, HandConfig};
    use crate::hands::BodyScale;
    use crate::types::Point2;

    #[test]
    fn test_blink_bands() {
        assert_eq!(BlinkBand::classify(5.0, 1.0), BlinkBand::Natural);
        assert_eq!(BlinkBand::classify(30.0, 1.0), BlinkBand::Natural);
        assert_eq!(BlinkBand::classify(31.0, 1.0), BlinkBand::High);
        assert_eq!(BlinkBand::classify(0.0, 0.1), BlinkBand::Gathering);
        assert_eq!(BlinkBand::classify(2.0, 0.5), BlinkBand::Low);
    }

    #[test]
    fn test_fresh_report() {
        let blink = BlinkTracker::new(BlinkConfig::default(), 0.0);
        let hands = HandActivityTracker::new(HandConfig::default());
        let expression = ExpressionCalibrator::new(ExpressionConfig::default());

        let report = FeedbackReport::build(&blink, &hands, &expression, 1, 1.0);
        assert_eq!(report.blink_rate.band, BlinkBand::Gathering);
        assert!(!report.hand_gestures.overactive);
        assert_eq!(
            report.expression.state,
            ExpressionState::Calibrating {
                collected: 0,
                required: 30
            }
        );
        assert_eq!(report.expression.feedback, "Setting up... 0/30");
    }

    #[test]
    fn test_overactive_and_frowning_report() {
        let blink = BlinkTracker::new(BlinkConfig::default(), 0.0);
        let mut hands = HandActivityTracker::new(HandConfig::default());
        hands.update(Some(Point2::new(0.0, 0.0)), None, BodyScale::Shoulders(100.0), 0.0);
        hands.update(Some(Point2::new(10_000.0, 0.0)), None, BodyScale::Shoulders(100.0), 0.1);

        let mut expression = ExpressionCalibrator::new(ExpressionConfig::default());
        for _ in 0..30 {
            expression.update(280.0, 282.0, 240.0, 480.0);
        }
        expression.update(300.0, 302.0, 240.0, 480.0);

        let report = FeedbackReport::build(&blink, &hands, &expression, 31, 60.0);
        assert!(report.hand_gestures.overactive);
        assert_eq!(report.expression.state, ExpressionState::Frowning);
        assert!((report.expression.frown_percentage - 100.0).abs() < 1e-9);
        assert_eq!(report.blink_rate.band, BlinkBand::Low);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["expression"]["state"], "frowning");
        assert_eq!(value["blink_rate"]["band"], "low");
    }
}

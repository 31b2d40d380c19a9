//! Expression calibration and frown detection
//!
//! The first `calibration_frames` updates build a neutral baseline of each
//! mouth corner's vertical offset from the nose tip. Afterwards a frown is
//! reported when both corners sit lower than their baseline by more than a
//! frame-height-relative threshold.

use crate::config::ExpressionConfig;

/// Calibration progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationPhase {
    Calibrating { collected: u32, required: u32 },
    Calibrated { baseline_left: f64, baseline_right: f64 },
}

/// Per-session neutral-expression baseline and frown classifier
#[derive(Debug, Clone)]
pub struct ExpressionCalibrator {
    config: ExpressionConfig,
    samples_collected: u32,
    left_sum: f64,
    right_sum: f64,
    baseline: Option<(f64, f64)>,
    is_frowning: bool,
    frown_frames: u64,
    frames_after_calibration: u64,
}

impl ExpressionCalibrator {
    pub fn new(config: ExpressionConfig) -> Self {
        Self {
            config,
            samples_collected: 0,
            left_sum: 0.0,
            right_sum: 0.0,
            baseline: None,
            is_frowning: false,
            frown_frames: 0,
            frames_after_calibration: 0,
        }
    }

    /// Feed one frame of mouth geometry (pixel y coordinates). Returns the frown flag.
    pub fn update(
        &mut self,
        left_corner_y: f64,
        right_corner_y: f64,
        nose_y: f64,
        frame_height: f64,
    ) -> bool {
        // Positive = corner below the nose
        let rel_left = left_corner_y - nose_y;
        let rel_right = right_corner_y - nose_y;

        let Some((baseline_left, baseline_right)) = self.baseline else {
            self.left_sum += rel_left;
            self.right_sum += rel_right;
            self.samples_collected += 1;
            if self.samples_collected == self.config.calibration_frames {
                let n = self.samples_collected as f64;
                self.baseline = Some((self.left_sum / n, self.right_sum / n));
            }
            self.is_frowning = false;
            return false;
        };

        let threshold = self.config.frown_delta_ratio * frame_height;
        let left_down = rel_left - baseline_left > threshold;
        let right_down = rel_right - baseline_right > threshold;

        self.is_frowning = left_down && right_down;
        self.frames_after_calibration += 1;
        if self.is_frowning {
            self.frown_frames += 1;
        }
        self.is_frowning
    }

    /// Frown decision from the latest update
    pub fn is_frowning(&self) -> bool {
        self.is_frowning
    }

    pub fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn phase(&self) -> CalibrationPhase {
        match self.baseline {
            Some((baseline_left, baseline_right)) => CalibrationPhase::Calibrated {
                baseline_left,
                baseline_right,
            },
            None => CalibrationPhase::Calibrating {
                collected: self.samples_collected,
                required: self.config.calibration_frames,
            },
        }
    }

    /// Share of post-calibration frames classified as frowning (0-100)
    pub fn frown_percentage(&self) -> f64 {
        let frames = self.frames_after_calibration.max(1) as f64;
        self.frown_frames as f64 / frames * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEIGHT: f64 = 480.0;
    const NOSE: f64 = 240.0;

    fn calibrated() -> ExpressionCalibrator {
        let mut calibrator = ExpressionCalibrator::new(ExpressionConfig::default());
        for _ in 0..30 {
            calibrator.update(280.0, 282.0, NOSE, HEIGHT);
        }
        calibrator
    }

    #[test]
    fn test_never_frowns_while_calibrating() {
        let mut calibrator = ExpressionCalibrator::new(ExpressionConfig::default());
        for i in 0..30 {
            // Wildly varying geometry, including drooping corners
            let droop = (i % 5) as f64 * 20.0;
            assert!(!calibrator.update(280.0 + droop, 282.0 + droop, NOSE, HEIGHT));
        }
        assert!(calibrator.is_calibrated());
    }

    #[test]
    fn test_baseline_is_mean_of_warmup() {
        let mut calibrator = ExpressionCalibrator::new(ExpressionConfig::default());
        for i in 0..30 {
            let offset = if i % 2 == 0 { 30.0 } else { 50.0 };
            calibrator.update(NOSE + offset, NOSE + offset + 2.0, NOSE, HEIGHT);
        }
        match calibrator.phase() {
            CalibrationPhase::Calibrated {
                baseline_left,
                baseline_right,
            } => {
                assert!((baseline_left - 40.0).abs() < 1e-9);
                assert!((baseline_right - 42.0).abs() < 1e-9);
            }
            other => panic!("expected calibrated, got {other:?}"),
        }
    }

    #[test]
    fn test_baseline_frozen_after_calibration() {
        let mut calibrator = calibrated();
        let before = calibrator.phase();
        for _ in 0..50 {
            calibrator.update(400.0, 400.0, NOSE, HEIGHT);
        }
        assert_eq!(calibrator.phase(), before);
    }

    #[test]
    fn test_both_corners_down_is_frown() {
        let mut calibrator = calibrated();
        // threshold = 0.004 * 480 = 1.92px
        assert!(calibrator.update(283.0, 285.0, NOSE, HEIGHT));
    }

    #[test]
    fn test_single_corner_drop_is_not_frown() {
        let mut calibrator = calibrated();
        assert!(!calibrator.update(283.0, 282.5, NOSE, HEIGHT));
        assert!(!calibrator.update(280.0, 290.0, NOSE, HEIGHT));
    }

    #[test]
    fn test_no_hysteresis() {
        let mut calibrator = calibrated();
        assert!(calibrator.update(290.0, 292.0, NOSE, HEIGHT));
        assert!(!calibrator.update(280.0, 282.0, NOSE, HEIGHT));
        assert!(!calibrator.is_frowning());
    }

    #[test]
    fn test_frown_percentage() {
        let mut calibrator = calibrated();
        assert_eq!(calibrator.frown_percentage(), 0.0);
        calibrator.update(290.0, 292.0, NOSE, HEIGHT);
        calibrator.update(280.0, 282.0, NOSE, HEIGHT);
        calibrator.update(280.0, 282.0, NOSE, HEIGHT);
        calibrator.update(290.0, 292.0, NOSE, HEIGHT);
        assert!((calibrator.frown_percentage() - 50.0).abs() < 1e-9);
    }
}

//! Blink detection
//!
//! A two-state machine (open / closed) driven by an EAR-like eye openness
//! ratio. A blink is counted when the eye reopens after a closed run of at
//! least `debounce_frames` consecutive frames.

use crate::config::BlinkConfig;
use crate::types::{EyeContour, FrameSize};

/// Eye state after the latest update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeState {
    Open,
    Closed,
}

/// Openness of one eye: mean vertical span over horizontal span.
///
/// Lower values mean a more closed eye. A degenerate contour (no horizontal
/// span) reads as fully closed.
pub fn eye_aspect_ratio(contour: &EyeContour, frame: FrameSize) -> f64 {
    let p = contour.0.map(|point| point.to_pixels(frame));
    let vertical_1 = p[1].distance(&p[5]);
    let vertical_2 = p[2].distance(&p[4]);
    let horizontal = p[0].distance(&p[3]);

    if horizontal <= 1e-6 {
        return 0.0;
    }

    (vertical_1 + vertical_2) / (2.0 * horizontal)
}

/// Openness averaged over both eyes
pub fn eye_openness(left: &EyeContour, right: &EyeContour, frame: FrameSize) -> f64 {
    (eye_aspect_ratio(left, frame) + eye_aspect_ratio(right, frame)) / 2.0
}

/// Tracks closed-eye runs and cumulative blinks for one session
#[derive(Debug, Clone)]
pub struct BlinkTracker {
    config: BlinkConfig,
    state: EyeState,
    eye_closed_run: u32,
    blink_total: u32,
    session_start: f64,
}

impl BlinkTracker {
    /// Create a tracker whose blink rate is measured from `session_start` (seconds)
    pub fn new(config: BlinkConfig, session_start: f64) -> Self {
        Self {
            config,
            state: EyeState::Open,
            eye_closed_run: 0,
            blink_total: 0,
            session_start,
        }
    }

    /// Feed one frame's eye openness. Returns true when this frame completed a blink.
    pub fn update(&mut self, eye_openness: f64) -> bool {
        if eye_openness < self.config.closed_ratio {
            self.state = EyeState::Closed;
            self.eye_closed_run += 1;
            return false;
        }

        let blinked = self.state == EyeState::Closed
            && self.eye_closed_run >= self.config.debounce_frames;
        if blinked {
            self.blink_total += 1;
        }
        self.state = EyeState::Open;
        self.eye_closed_run = 0;
        blinked
    }

    pub fn state(&self) -> EyeState {
        self.state
    }

    /// Consecutive closed frames so far (0 while open)
    pub fn eye_closed_run(&self) -> u32 {
        self.eye_closed_run
    }

    pub fn blink_total(&self) -> u32 {
        self.blink_total
    }

    /// Minutes elapsed between session start and `now`
    pub fn elapsed_minutes(&self, now: f64) -> f64 {
        ((now - self.session_start) / 60.0).max(0.0)
    }

    /// Blinks per minute since session start (0 when no time has elapsed)
    pub fn blink_rate(&self, now: f64) -> f64 {
        let elapsed_min = self.elapsed_minutes(now);
        if elapsed_min > 0.0 {
            self.blink_total as f64 / elapsed_min
        } else {
            0.0
        }
    }

    /// Closed run long enough to count as a long closure
    pub fn long_closure(&self) -> bool {
        self.eye_closed_run >= self.config.long_closure_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point2;
    use proptest::prelude::*;

    const OPEN: f64 = 0.3;
    const CLOSED: f64 = 0.1;

    fn tracker() -> BlinkTracker {
        BlinkTracker::new(BlinkConfig::default(), 0.0)
    }

    fn feed(tracker: &mut BlinkTracker, closed_frames: u32) {
        for _ in 0..closed_frames {
            tracker.update(CLOSED);
        }
        tracker.update(OPEN);
    }

    fn contour(half_height: f64) -> EyeContour {
        EyeContour([
            Point2::new(0.40, 0.50),
            Point2::new(0.42, 0.50 - half_height),
            Point2::new(0.44, 0.50 - half_height),
            Point2::new(0.46, 0.50),
            Point2::new(0.44, 0.50 + half_height),
            Point2::new(0.42, 0.50 + half_height),
        ])
    }

    #[test]
    fn test_eye_aspect_ratio() {
        let frame = FrameSize {
            width: 100,
            height: 100,
        };
        // Horizontal span 6px, vertical span 2px on both pairs
        let ear = eye_aspect_ratio(&contour(0.01), frame);
        assert!((ear - 2.0 / 6.0).abs() < 1e-9);

        let openness = eye_openness(&contour(0.01), &contour(0.0), frame);
        assert!((openness - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_contour_reads_closed() {
        let frame = FrameSize {
            width: 100,
            height: 100,
        };
        let flat = EyeContour([Point2::new(0.5, 0.5); 6]);
        assert_eq!(eye_aspect_ratio(&flat, frame), 0.0);
    }

    #[test]
    fn test_short_closures_are_not_blinks() {
        let mut t = tracker();
        feed(&mut t, 1);
        feed(&mut t, 2);
        assert_eq!(t.blink_total(), 0);
        assert_eq!(t.eye_closed_run(), 0);
    }

    #[test]
    fn test_debounced_closure_counts_once() {
        let mut t = tracker();
        for _ in 0..3 {
            assert!(!t.update(CLOSED));
        }
        assert_eq!(t.state(), EyeState::Closed);
        assert_eq!(t.eye_closed_run(), 3);
        assert!(t.update(OPEN));
        assert!(!t.update(OPEN));
        assert_eq!(t.blink_total(), 1);
    }

    #[test]
    fn test_long_closure() {
        let mut t = tracker();
        for _ in 0..29 {
            t.update(CLOSED);
        }
        assert!(!t.long_closure());
        t.update(CLOSED);
        assert!(t.long_closure());
    }

    #[test]
    fn test_blink_rate() {
        let mut t = tracker();
        assert_eq!(t.blink_rate(0.0), 0.0);
        feed(&mut t, 3);
        feed(&mut t, 4);
        // 2 blinks in 30 seconds
        assert!((t.blink_rate(30.0) - 4.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_blink_total_counts_runs_of_three_or_more(
            runs in proptest::collection::vec((0u32..8, 1u32..4), 0..40)
        ) {
            let mut t = tracker();
            let mut expected = 0;
            for (closed, open) in runs {
                for _ in 0..closed {
                    t.update(CLOSED);
                }
                for _ in 0..open {
                    t.update(OPEN);
                }
                if closed >= 3 {
                    expected += 1;
                }
            }
            prop_assert_eq!(t.blink_total(), expected);
        }
    }
}

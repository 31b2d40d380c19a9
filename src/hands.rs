//! Hand activity tracking
//!
//! Wrist speed is normalized by a body-scale reference so the score does not
//! depend on camera distance or resolution. Each hand keeps an exponentially
//! smoothed speed; the mean over visible hands feeds two trailing windows: a
//! "good band" flag series (for the gesture score) and the raw mean speed.

use crate::config::HandConfig;
use crate::types::{LandmarkSnapshot, Point2};
use crate::window::TimeWindow;

/// Minimum reference span (px) considered trustworthy
const MIN_SCALE_PX: f64 = 1.0;

/// Minimum elapsed time between sightings, guards against division by zero
const MIN_DT_SECS: f64 = 1e-6;

/// Which hand a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandSide {
    Left,
    Right,
}

/// Where the body-scale reference came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyScale {
    Shoulders(f64),
    FaceWidth(f64),
    FrameWidth(f64),
}

impl BodyScale {
    /// Prefer shoulder span, then face width, then the frame width
    pub fn resolve(snapshot: &LandmarkSnapshot) -> Self {
        if let Some(shoulders) = snapshot.shoulders {
            let span = shoulders.span_px(snapshot.frame);
            if span > MIN_SCALE_PX {
                return BodyScale::Shoulders(span);
            }
        }

        if let Some(face) = snapshot.face_width {
            let span = face.span_px(snapshot.frame);
            if span > MIN_SCALE_PX {
                return BodyScale::FaceWidth(span);
            }
        }

        BodyScale::FrameWidth(snapshot.frame.width as f64)
    }

    pub fn pixels(&self) -> f64 {
        match *self {
            BodyScale::Shoulders(px) | BodyScale::FaceWidth(px) | BodyScale::FrameWidth(px) => px,
        }
    }
}

/// Velocity state for one hand
#[derive(Debug, Clone, Default)]
struct HandSideState {
    previous_position: Option<Point2>,
    previous_timestamp: Option<f64>,
    smoothed_speed: f64,
}

impl HandSideState {
    /// Record a sighting and return the updated smoothed speed.
    ///
    /// The first sighting only seeds the position and yields None.
    fn observe(&mut self, position: Point2, now: f64, scale_px: f64, config: &HandConfig) -> Option<f64> {
        let previous = self.previous_position.replace(position);
        let previous_t = self.previous_timestamp.replace(now);

        let (previous, previous_t) = (previous?, previous_t?);

        let dt = (now - previous_t).max(MIN_DT_SECS);
        let raw_speed = position.distance(&previous) / dt;
        let mut speed = (raw_speed / scale_px.max(MIN_SCALE_PX))
            .max(0.0)
            .min(config.max_speed);

        if speed < config.idle_threshold {
            speed = 0.0;
        }

        self.smoothed_speed =
            (1.0 - config.smoothing) * self.smoothed_speed + config.smoothing * speed;
        Some(self.smoothed_speed)
    }
}

/// Per-session gesture intensity tracker
#[derive(Debug, Clone)]
pub struct HandActivityTracker {
    config: HandConfig,
    left: HandSideState,
    right: HandSideState,
    good_band: TimeWindow<bool>,
    mean_speeds: TimeWindow<f64>,
    latest_score: f64,
    latest_mean_speed: f64,
}

impl HandActivityTracker {
    pub fn new(config: HandConfig) -> Self {
        let good_band = TimeWindow::new(config.window_capacity, config.window_secs);
        let mean_speeds = TimeWindow::new(config.window_capacity, config.window_secs);
        Self {
            config,
            left: HandSideState::default(),
            right: HandSideState::default(),
            good_band,
            mean_speeds,
            latest_score: 0.0,
            latest_mean_speed: 0.0,
        }
    }

    /// Feed one frame's wrist positions (pixels). Absent hands are left untouched.
    ///
    /// A frame with no hand speed still pushes a zero-speed sample.
    pub fn update(
        &mut self,
        left: Option<Point2>,
        right: Option<Point2>,
        scale: BodyScale,
        now: f64,
    ) {
        let scale_px = scale.pixels();
        let mut speeds = Vec::with_capacity(2);

        for (side, position) in [(HandSide::Left, left), (HandSide::Right, right)] {
            let Some(position) = position else {
                continue;
            };
            let state = match side {
                HandSide::Left => &mut self.left,
                HandSide::Right => &mut self.right,
            };
            if let Some(speed) = state.observe(position, now, scale_px, &self.config) {
                speeds.push(speed);
            }
        }

        let mean_speed = if speeds.is_empty() {
            0.0
        } else {
            speeds.iter().sum::<f64>() / speeds.len() as f64
        };

        let in_good_band =
            (self.config.good_band_min..=self.config.good_band_max).contains(&mean_speed);
        self.good_band.push(now, in_good_band);
        self.mean_speeds.push(now, mean_speed);

        self.latest_score = self.good_band.true_fraction() * 100.0;
        self.latest_mean_speed = mean_speed;

        tracing::trace!(
            mean_speed,
            in_good_band,
            score = self.latest_score,
            "hand activity updated"
        );
    }

    /// Convenience entry point taking a full snapshot
    pub fn update_from_snapshot(&mut self, snapshot: &LandmarkSnapshot, now: f64) {
        let scale = BodyScale::resolve(snapshot);
        let left = snapshot.left_wrist.map(|p| p.to_pixels(snapshot.frame));
        let right = snapshot.right_wrist.map(|p| p.to_pixels(snapshot.frame));
        self.update(left, right, scale, now);
    }

    /// Share of recent samples inside the healthy band (0-100)
    pub fn gesture_score(&self) -> f64 {
        self.latest_score
    }

    /// Mean of visible hands' smoothed speed in the latest frame
    pub fn latest_mean_speed(&self) -> f64 {
        self.latest_mean_speed
    }

    /// Mean speed over the trailing window
    pub fn window_mean_speed(&self) -> Option<f64> {
        self.mean_speeds.mean()
    }

    pub fn is_overactive(&self) -> bool {
        self.latest_mean_speed >= self.config.overactive_threshold
    }

    /// Smoothed speed for one hand
    pub fn smoothed_speed(&self, side: HandSide) -> f64 {
        match side {
            HandSide::Left => self.left.smoothed_speed,
            HandSide::Right => self.right.smoothed_speed,
        }
    }

    /// Samples currently in the trailing window
    pub fn window_len(&self) -> usize {
        self.good_band.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameSize, PointPair};
    use proptest::prelude::*;

    const SCALE: BodyScale = BodyScale::Shoulders(100.0);

    fn tracker() -> HandActivityTracker {
        HandActivityTracker::new(HandConfig::default())
    }

    #[test]
    fn test_body_scale_preference() {
        let mut snapshot = LandmarkSnapshot::empty(640, 480);
        assert_eq!(BodyScale::resolve(&snapshot), BodyScale::FrameWidth(640.0));

        snapshot.face_width = Some(PointPair {
            left: Point2::new(0.4, 0.5),
            right: Point2::new(0.5, 0.5),
        });
        assert!(matches!(BodyScale::resolve(&snapshot), BodyScale::FaceWidth(px) if (px - 64.0).abs() < 1e-9));

        snapshot.shoulders = Some(PointPair {
            left: Point2::new(0.25, 0.8),
            right: Point2::new(0.75, 0.8),
        });
        assert!(matches!(BodyScale::resolve(&snapshot), BodyScale::Shoulders(px) if (px - 320.0).abs() < 1e-9));
    }

    #[test]
    fn test_degenerate_shoulders_fall_back() {
        let mut snapshot = LandmarkSnapshot::empty(640, 480);
        snapshot.shoulders = Some(PointPair {
            left: Point2::new(0.5, 0.5),
            right: Point2::new(0.5005, 0.5),
        });
        assert_eq!(BodyScale::resolve(&snapshot), BodyScale::FrameWidth(640.0));
        assert_eq!(
            snapshot.frame,
            FrameSize {
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn test_first_sighting_only_seeds_position() {
        let mut t = tracker();
        t.update(Some(Point2::new(0.0, 0.0)), None, SCALE, 0.0);
        assert_eq!(t.latest_mean_speed(), 0.0);
        assert_eq!(t.smoothed_speed(HandSide::Left), 0.0);
        assert_eq!(t.window_len(), 1);
    }

    #[test]
    fn test_speed_is_normalized_and_smoothed() {
        let mut t = tracker();
        t.update(Some(Point2::new(0.0, 0.0)), None, SCALE, 0.0);
        // 50px in 1s over a 100px body = 0.5 body/s, EMA 0.3 -> 0.15
        t.update(Some(Point2::new(50.0, 0.0)), None, SCALE, 1.0);
        assert!((t.smoothed_speed(HandSide::Left) - 0.15).abs() < 1e-9);
        assert!((t.latest_mean_speed() - 0.15).abs() < 1e-9);
        // 1 of 2 samples in the good band
        assert!((t.gesture_score() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_jitter_below_idle_threshold_is_ignored() {
        let mut t = tracker();
        t.update(Some(Point2::new(0.0, 0.0)), None, SCALE, 0.0);
        // 4px/s over 100px = 0.04 < 0.05
        t.update(Some(Point2::new(4.0, 0.0)), None, SCALE, 1.0);
        assert_eq!(t.smoothed_speed(HandSide::Left), 0.0);
    }

    #[test]
    fn test_glitch_is_clamped() {
        let mut t = tracker();
        t.update(None, Some(Point2::new(0.0, 0.0)), SCALE, 0.0);
        t.update(None, Some(Point2::new(10_000.0, 0.0)), SCALE, 0.1);
        // clamp to 5.0, EMA 0.3 -> 1.5
        assert!((t.smoothed_speed(HandSide::Right) - 1.5).abs() < 1e-9);
        assert!(t.is_overactive());
    }

    #[test]
    fn test_negative_speed_limit_does_not_panic() {
        let mut t = HandActivityTracker::new(HandConfig {
            max_speed: -1.0,
            ..HandConfig::default()
        });
        t.update(Some(Point2::new(0.0, 0.0)), None, SCALE, 0.0);
        t.update(Some(Point2::new(50.0, 0.0)), None, SCALE, 1.0);
        assert_eq!(t.smoothed_speed(HandSide::Left), 0.0);
        assert_eq!(t.window_len(), 2);
    }

    #[test]
    fn test_mean_over_visible_hands() {
        let mut t = tracker();
        t.update(Some(Point2::new(0.0, 0.0)), Some(Point2::new(0.0, 0.0)), SCALE, 0.0);
        t.update(Some(Point2::new(100.0, 0.0)), Some(Point2::new(0.0, 0.0)), SCALE, 1.0);
        // left: 1.0 * 0.3 = 0.3, right: 0
        assert!((t.latest_mean_speed() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_gap_between_sightings_uses_last_seen() {
        let mut t = tracker();
        t.update(Some(Point2::new(0.0, 0.0)), None, SCALE, 0.0);
        t.update(None, None, SCALE, 1.0);
        t.update(None, None, SCALE, 2.0);
        // 100px over 4s since last sighting = 0.25 body/s -> 0.075
        t.update(Some(Point2::new(100.0, 0.0)), None, SCALE, 4.0);
        assert!((t.smoothed_speed(HandSide::Left) - 0.075).abs() < 1e-9);
    }

    #[test]
    fn test_no_hands_depresses_score() {
        let mut t = tracker();
        t.update(Some(Point2::new(0.0, 0.0)), None, SCALE, 0.0);
        t.update(Some(Point2::new(50.0, 0.0)), None, SCALE, 1.0);
        t.update(Some(Point2::new(100.0, 0.0)), None, SCALE, 2.0);
        let with_hands = t.gesture_score();
        t.update(None, None, SCALE, 3.0);
        assert!(t.gesture_score() < with_hands);
        assert_eq!(t.latest_mean_speed(), 0.0);
    }

    #[test]
    fn test_window_horizon() {
        let mut t = tracker();
        for i in 0..20 {
            t.update(None, None, SCALE, i as f64);
        }
        // samples at 9..=19 survive a 10s horizon
        assert_eq!(t.window_len(), 11);
        assert!(t.window_mean_speed().unwrap().abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_score_tracks_good_fraction(flags in proptest::collection::vec(any::<bool>(), 1..100)) {
            let mut window = TimeWindow::new(300, 10.0);
            for flag in &flags {
                window.push(0.0, *flag);
            }
            let good = flags.iter().filter(|f| **f).count() as f64 / flags.len() as f64;
            prop_assert!((window.true_fraction() * 100.0 - good * 100.0).abs() < 1e-9);

            // Flipping one bad sample to good never lowers the score
            if let Some(pos) = flags.iter().position(|f| !*f) {
                let mut improved = flags.clone();
                improved[pos] = true;
                let mut better = TimeWindow::new(300, 10.0);
                for flag in &improved {
                    better.push(0.0, *flag);
                }
                prop_assert!(better.true_fraction() >= window.true_fraction());
            }
        }
    }
}

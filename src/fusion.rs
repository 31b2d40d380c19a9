//! Focus fusion
//!
//! Derives the tired and fidgety signals from tracker state and fuses them
//! with phone presence into a single 0-1 focus score. Phone use carries the
//! largest fixed penalty; tiredness and fidgetiness are weighted continuous
//! penalties.

use crate::blink::BlinkTracker;
use crate::config::{BlinkConfig, FocusConfig};
use crate::hands::HandActivityTracker;
use crate::types::{FidgetySignal, TiredSignal};

/// Fused score for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusScore {
    pub score: f64,
    pub is_focused: bool,
}

/// Fixed-weight fusion of distraction signals
#[derive(Debug, Clone, Default)]
pub struct FocusFusion {
    config: FocusConfig,
}

impl FocusFusion {
    pub fn new(config: FocusConfig) -> Self {
        Self { config }
    }

    /// Fuse phone presence with tired and fidgety scores (each 0-1)
    pub fn compute(&self, phone_detected: bool, tired_score: f64, fidgety_score: f64) -> FocusScore {
        let mut score = 1.0;

        if phone_detected {
            score -= self.config.phone_penalty;
        }
        score -= self.config.tired_weight * tired_score;
        score -= self.config.fidgety_weight * fidgety_score;

        let score = score.clamp(0.0, 1.0);

        FocusScore {
            score,
            is_focused: score >= self.config.focused_threshold,
        }
    }

    /// Fidgetiness from hand activity.
    ///
    /// Inverts the good-band score; overactive hands force the score up to
    /// at least the configured floor.
    pub fn derive_fidgety(&self, hands: &HandActivityTracker) -> FidgetySignal {
        let mut movement_score = 1.0 - (hands.gesture_score() / 100.0).clamp(0.0, 1.0);
        let is_fidgety = hands.is_overactive();

        if is_fidgety && movement_score < self.config.fidgety_floor {
            movement_score = self.config.fidgety_floor;
        }

        FidgetySignal {
            is_fidgety,
            movement_score,
        }
    }
}

/// Tiredness from blink state: a long closure or a very high blink rate.
///
/// The score is binary: 1.0 when either condition fires.
pub fn derive_tired(blink: &BlinkTracker, config: &BlinkConfig, now: f64) -> TiredSignal {
    let long_closure = blink.long_closure();
    let very_high_blink_rate = blink.blink_rate(now) > config.tired_blinks_per_min;

    if long_closure || very_high_blink_rate {
        TiredSignal {
            is_tired: true,
            score: 1.0,
        }
    } else {
        TiredSignal::default()
    }
}

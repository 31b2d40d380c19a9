//! Session aggregation
//!
//! Accumulates trigger counts and the focus timeline for one session and
//! answers summary queries, optionally resetting in the same call.

use crate::types::{FocusSample, SessionSummary};

/// Per-session counters and focus timeline
#[derive(Debug, Clone, Default)]
pub struct SessionAggregator {
    phone_count: u64,
    tired_count: u64,
    fidgety_count: u64,
    timeline: Vec<FocusSample>,
    next_sequence: u64,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed frame
    pub fn record(&mut self, phone: bool, tired: bool, fidgety: bool, focus_score: f64) {
        if phone {
            self.phone_count += 1;
        }
        if tired {
            self.tired_count += 1;
        }
        if fidgety {
            self.fidgety_count += 1;
        }

        self.timeline.push(FocusSample {
            sequence: self.next_sequence,
            score: focus_score,
        });
        self.next_sequence += 1;
    }

    /// Current summary. With `reset`, the returned values are the pre-reset
    /// state and everything (including the sequence counter) is cleared.
    pub fn summary(&mut self, reset: bool) -> SessionSummary {
        if reset {
            let drained = std::mem::take(self);
            return drained.into_summary();
        }

        SessionSummary {
            phone_count: self.phone_count,
            tired_count: self.tired_count,
            fidgety_count: self.fidgety_count,
            average_focus: Self::average(&self.timeline),
            focus_timeline: self.timeline.clone(),
        }
    }

    /// Number of recorded frames
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    fn into_summary(self) -> SessionSummary {
        SessionSummary {
            phone_count: self.phone_count,
            tired_count: self.tired_count,
            fidgety_count: self.fidgety_count,
            average_focus: Self::average(&self.timeline),
            focus_timeline: self.timeline,
        }
    }

    fn average(timeline: &[FocusSample]) -> f64 {
        if timeline.is_empty() {
            return 0.0;
        }
        let sum: f64 = timeline.iter().map(|s| s.score).sum();
        sum / timeline.len() as f64
    }
}

//! Trailing time windows
//!
//! A [`TimeWindow`] keeps `(timestamp, value)` samples in arrival order,
//! bounded both by a sample cap and by a trailing time horizon.

use std::collections::VecDeque;

/// Bounded, time-pruned sample history
#[derive(Debug, Clone)]
pub struct TimeWindow<T> {
    samples: VecDeque<(f64, T)>,
    capacity: usize,
    horizon_secs: f64,
}

impl<T> TimeWindow<T> {
    /// Create a window holding at most `capacity` samples no older than `horizon_secs`
    pub fn new(capacity: usize, horizon_secs: f64) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            horizon_secs,
        }
    }

    /// Append a sample, then drop whatever falls outside the cap or horizon
    pub fn push(&mut self, timestamp: f64, value: T) {
        self.samples.push_back((timestamp, value));
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        self.prune(timestamp);
    }

    /// Drop samples older than the horizon relative to `now`
    pub fn prune(&mut self, now: f64) {
        while let Some((ts, _)) = self.samples.front() {
            if now - ts > self.horizon_secs {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&T> {
        self.samples.back().map(|(_, v)| v)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.samples.iter().map(|(_, v)| v)
    }
}

impl TimeWindow<bool> {
    /// Fraction of `true` samples (0 when empty)
    pub fn true_fraction(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let hits = self.values().filter(|v| **v).count();
        hits as f64 / self.samples.len() as f64
    }
}

impl TimeWindow<f64> {
    /// Mean of the samples (None when empty)
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.values().sum();
        Some(sum / self.samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_drops_oldest() {
        let mut window = TimeWindow::new(3, 100.0);
        for i in 0..5 {
            window.push(i as f64, i as f64);
        }
        assert_eq!(window.len(), 3);
        // Only 2, 3, 4 remain
        assert!((window.mean().unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_horizon_drops_stale_samples() {
        let mut window = TimeWindow::new(300, 10.0);
        window.push(0.0, true);
        window.push(5.0, false);
        window.push(10.0, false);
        // Exactly at the horizon is kept
        assert_eq!(window.len(), 3);

        window.push(10.5, true);
        assert_eq!(window.len(), 3);
        assert!((window.true_fraction() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_window_statistics() {
        let flags: TimeWindow<bool> = TimeWindow::new(10, 1.0);
        assert_eq!(flags.true_fraction(), 0.0);

        let speeds: TimeWindow<f64> = TimeWindow::new(10, 1.0);
        assert!(speeds.mean().is_none());
        assert!(speeds.latest().is_none());
    }
}

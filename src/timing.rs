// src/timing.rs

//! Elapsed-time samples collected during a timing session.
//!
//! A session is opened and closed by `Harness::with_timing`; the series only
//! exists while the session is open.

use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timings {
    samples: Vec<Duration>,
}

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.samples.push(elapsed);
    }

    pub fn samples(&self) -> &[Duration] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<Duration> {
        self.samples.first().copied()
    }

    pub fn last(&self) -> Option<Duration> {
        self.samples.last().copied()
    }

    /// `last / first`. `None` with fewer than two samples or a zero first
    /// sample.
    pub fn ratio(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let first = self.first()?.as_secs_f64();
        if first == 0.0 {
            return None;
        }
        Some(self.last()?.as_secs_f64() / first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_compares_last_to_first() {
        let mut t = Timings::new();
        t.record(Duration::from_secs_f64(10.0));
        t.record(Duration::from_secs_f64(5.0));
        t.record(Duration::from_secs_f64(2.0));
        assert_eq!(t.first(), Some(Duration::from_secs(10)));
        assert_eq!(t.last(), Some(Duration::from_secs(2)));
        assert!((t.ratio().unwrap() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn ratio_needs_two_samples() {
        let mut t = Timings::new();
        assert_eq!(t.ratio(), None);
        t.record(Duration::from_secs(1));
        assert_eq!(t.ratio(), None);
    }

    #[test]
    fn zero_first_sample_has_no_ratio() {
        let mut t = Timings::new();
        t.record(Duration::ZERO);
        t.record(Duration::from_secs(1));
        assert_eq!(t.ratio(), None);
    }
}

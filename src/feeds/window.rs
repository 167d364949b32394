//! Bounded rolling window of sentiment samples.

use std::collections::VecDeque;

use crate::types::SentimentSample;

/// Most-recent-N sentiment history; the oldest sample is evicted first.
#[derive(Debug, Clone)]
pub struct SentimentWindow {
    samples: VecDeque<SentimentSample>,
    capacity: usize,
}

impl SentimentWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, sample: SentimentSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn extend<I: IntoIterator<Item = SentimentSample>>(&mut self, samples: I) {
        for s in samples {
            self.push(s);
        }
    }

    pub fn last(&self) -> Option<&SentimentSample> {
        self.samples.back()
    }

    /// The newest `n` samples, oldest first.
    pub fn recent(&self, n: usize) -> Vec<SentimentSample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Trend;

    fn sample(t: i64) -> SentimentSample {
        SentimentSample::new(t, 50, Trend::Stable)
    }

    #[test]
    fn test_evicts_oldest() {
        let mut w = SentimentWindow::new(3);
        w.extend((0..5).map(sample));
        assert_eq!(w.len(), 3);
        let ts: Vec<i64> = w.recent(10).iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![2, 3, 4]);
        assert_eq!(w.last().unwrap().timestamp, 4);
    }

    #[test]
    fn test_recent_subset() {
        let mut w = SentimentWindow::new(10);
        w.extend((0..6).map(sample));
        let ts: Vec<i64> = w.recent(2).iter().map(|s| s.timestamp).collect();
        assert_eq!(ts, vec![4, 5]);
    }

    #[test]
    fn test_clear() {
        let mut w = SentimentWindow::new(2);
        w.push(sample(1));
        w.clear();
        assert!(w.is_empty());
        assert!(w.last().is_none());
    }
}

//! Rolling window of closed-candle prices.

use std::collections::VecDeque;

/// Bounded FIFO of price samples. Oldest first.
///
/// Inserts always go to the tail; once the window is full the head is evicted.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    /// A zero capacity is bumped to one so a window can always hold the latest sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample, evicting the oldest one when over capacity.
    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Replace the whole window, keeping only the most recent `capacity` values.
    pub fn replace(&mut self, values: Vec<f64>) {
        let skip = values.len().saturating_sub(self.capacity);
        self.samples = values.into_iter().skip(skip).collect();
    }

    /// Ordered copy of the samples, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// Smallest and largest sample.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.samples.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut w = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v);
        }
        assert_eq!(w.snapshot(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_replace_keeps_most_recent() {
        let mut w = RollingWindow::new(2);
        w.push(9.0);
        w.replace(vec![1.0, 2.0, 3.0]);
        assert_eq!(w.snapshot(), vec![2.0, 3.0]);

        w.replace(vec![]);
        assert!(w.is_empty());
    }

    #[test]
    fn test_min_max() {
        let mut w = RollingWindow::new(5);
        assert_eq!(w.min_max(), None);
        w.replace(vec![3.0, -1.0, 7.5]);
        assert_eq!(w.min_max(), Some((-1.0, 7.5)));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut w = RollingWindow::new(0);
        w.push(1.0);
        w.push(2.0);
        assert_eq!(w.capacity(), 1);
        assert_eq!(w.snapshot(), vec![2.0]);
    }

    proptest! {
        #[test]
        fn push_keeps_last_capacity_values(
            capacity in 1usize..40,
            values in proptest::collection::vec(-1.0e6f64..1.0e6, 0..200),
        ) {
            let mut w = RollingWindow::new(capacity);
            for v in &values {
                w.push(*v);
                prop_assert!(w.len() <= capacity);
            }
            let skip = values.len().saturating_sub(capacity);
            let expected: Vec<f64> = values[skip..].to_vec();
            prop_assert_eq!(w.snapshot(), expected);
        }

        #[test]
        fn replace_then_push_matches_pushing_everything(
            capacity in 1usize..40,
            seed in proptest::collection::vec(-1.0e6f64..1.0e6, 0..80),
            more in proptest::collection::vec(-1.0e6f64..1.0e6, 0..80),
        ) {
            let mut replaced = RollingWindow::new(capacity);
            replaced.replace(seed.clone());
            for v in &more {
                replaced.push(*v);
            }

            let mut pushed = RollingWindow::new(capacity);
            for v in seed.iter().chain(more.iter()) {
                pushed.push(*v);
            }

            prop_assert_eq!(replaced.snapshot(), pushed.snapshot());
        }
    }
}

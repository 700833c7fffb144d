// Copyright (c) 2024 The TQUIC Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A bounded window of the most recent samples of a data stream.
//!
//! Samples are kept in insertion order and the oldest sample is evicted
//! before a new one is appended to a full window. The min/max value is found
//! by a scan over exactly the samples currently held, so the result is always
//! the min/max over the most recent `capacity` samples.

use std::collections::VecDeque;

/// A sample tagged with the monotonic index it was recorded with.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sample<T> {
    /// Sample index, strictly increasing in insertion order.
    pub index: u64,

    /// Sample value.
    pub value: T,
}

/// Fixed capacity FIFO window of samples.
#[derive(Debug, Clone)]
pub struct SampleWindow<T> {
    /// The max number of samples held.
    capacity: usize,

    /// Samples, oldest first.
    samples: VecDeque<Sample<T>>,
}

impl<T: Copy> SampleWindow<T> {
    /// Create an empty window. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// The max number of samples held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Return true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample, evicting the oldest one if the window is full.
    /// Return the evicted sample if any.
    pub fn push(&mut self, index: u64, value: T) -> Option<Sample<T>> {
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };

        self.samples.push_back(Sample { index, value });
        evicted
    }

    /// The most recent sample.
    pub fn latest(&self) -> Option<&Sample<T>> {
        self.samples.back()
    }

    /// The sample recorded `n` samples before the most recent one.
    pub fn nth_back(&self, n: usize) -> Option<&Sample<T>> {
        let len = self.samples.len();
        if n >= len {
            return None;
        }
        self.samples.get(len - 1 - n)
    }

    /// Iterate over samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Sample<T>> {
        self.samples.iter()
    }

    /// Remove all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl<T: Copy + PartialOrd> SampleWindow<T> {
    /// The minimum value over all samples held.
    pub fn min(&self) -> Option<T> {
        self.scan(|candidate, best| candidate < best)
    }

    /// The maximum value over all samples held.
    pub fn max(&self) -> Option<T> {
        self.scan(|candidate, best| candidate > best)
    }

    fn scan<F: Fn(T, T) -> bool>(&self, better: F) -> Option<T> {
        let mut samples = self.samples.iter();
        let mut best = samples.next()?.value;
        for s in samples {
            if better(s.value, best) {
                best = s.value;
            }
        }
        Some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_window_push() {
        let mut win = SampleWindow::new(3);
        assert!(win.is_empty());
        assert_eq!(win.capacity(), 3);
        assert_eq!(win.latest(), None);

        assert_eq!(win.push(0, 10), None);
        assert_eq!(win.push(1, 20), None);
        assert_eq!(win.push(2, 30), None);
        assert_eq!(win.len(), 3);

        // Full window evicts exactly the oldest sample.
        assert_eq!(win.push(3, 40), Some(Sample { index: 0, value: 10 }));
        assert_eq!(win.len(), 3);
        let values: Vec<i32> = win.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![20, 30, 40]);
        assert_eq!(win.latest(), Some(&Sample { index: 3, value: 40 }));

        win.clear();
        assert!(win.is_empty());
        assert_eq!(win.capacity(), 3);
    }

    #[test]
    fn sample_window_nth_back() {
        let mut win = SampleWindow::new(5);
        for i in 0..4 {
            win.push(i, i * 100);
        }

        assert_eq!(win.nth_back(0).map(|s| s.value), Some(300));
        assert_eq!(win.nth_back(3).map(|s| s.value), Some(0));
        assert_eq!(win.nth_back(4), None);
    }

    #[test]
    fn sample_window_min_max() {
        let mut win: SampleWindow<f64> = SampleWindow::new(4);
        assert_eq!(win.min(), None);
        assert_eq!(win.max(), None);

        for (i, v) in [5.0, 1.0, 9.0, 3.0].iter().enumerate() {
            win.push(i as u64, *v);
        }
        assert_eq!(win.min(), Some(1.0));
        assert_eq!(win.max(), Some(9.0));

        // Evict 5.0 and 1.0.
        win.push(4, 4.0);
        win.push(5, 6.0);
        assert_eq!(win.min(), Some(3.0));
        assert_eq!(win.max(), Some(9.0));

        // Evict 9.0.
        win.push(6, 2.0);
        assert_eq!(win.min(), Some(2.0));
        assert_eq!(win.max(), Some(6.0));
    }

    #[test]
    fn sample_window_zero_capacity() {
        let mut win = SampleWindow::new(0);
        assert_eq!(win.capacity(), 1);

        win.push(0, 1_u64);
        assert_eq!(win.push(1, 2), Some(Sample { index: 0, value: 1 }));
        assert_eq!(win.min(), Some(2));
    }
}

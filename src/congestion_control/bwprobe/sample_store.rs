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

use std::time::Duration;
use std::time::Instant;

use crate::congestion_control::SampleWindow;
use crate::Error;
use crate::Result;

/// RTT, bandwidth and arrival time history of a connection.
#[derive(Debug)]
pub(super) struct SampleStore {
    /// Recent RTT samples.
    rtts: SampleWindow<Duration>,

    /// Recent filtered bandwidth estimates in bytes per second.
    bandwidths: SampleWindow<f64>,

    /// Recent ack arrival times.
    timestamps: SampleWindow<Instant>,

    /// Minimum RTT over the RTT window.
    min_rtt: Duration,

    /// Minimum RTT over the lifetime of the store.
    base_rtt: Option<Duration>,

    /// The most recent RTT sample.
    current_rtt: Duration,

    /// Maximum bandwidth over the bandwidth window.
    max_bandwidth: f64,

    /// Segments acked since the last bandwidth estimate.
    acked_accumulator: u64,

    /// Index assigned to the next sample.
    sample_counter: u64,
}

impl SampleStore {
    pub fn new(
        rtt_window_len: usize,
        bandwidth_window_len: usize,
        timestamp_window_len: usize,
    ) -> Self {
        Self {
            rtts: SampleWindow::new(rtt_window_len),
            bandwidths: SampleWindow::new(bandwidth_window_len),
            timestamps: SampleWindow::new(timestamp_window_len),
            min_rtt: Duration::ZERO,
            base_rtt: None,
            current_rtt: Duration::ZERO,
            max_bandwidth: 0.0,
            acked_accumulator: 0,
            sample_counter: 0,
        }
    }

    /// Record an acknowledgment. A zero RTT is rejected without touching
    /// any state.
    pub fn record_ack(&mut self, acked_segments: u32, rtt: Duration, now: Instant) -> Result<()> {
        if rtt.is_zero() {
            return Err(Error::InvalidSample);
        }

        self.acked_accumulator = self.acked_accumulator.saturating_add(acked_segments as u64);

        self.rtts.push(self.sample_counter, rtt);
        self.min_rtt = self.rtts.min().unwrap_or(rtt);
        self.base_rtt = Some(self.base_rtt.map_or(rtt, |base| base.min(rtt)));
        self.current_rtt = rtt;

        self.timestamps.push(self.sample_counter, now);
        self.sample_counter += 1;

        Ok(())
    }

    /// Record a filtered bandwidth estimate.
    pub fn record_bandwidth(&mut self, bandwidth: f64) {
        self.bandwidths.push(self.sample_counter, bandwidth);
        self.max_bandwidth = self.bandwidths.max().unwrap_or(bandwidth);
    }

    /// Time elapsed between the most recent arrival and the arrival `span`
    /// samples before it.
    pub fn arrival_interval(&self, span: usize) -> Option<Duration> {
        let latest = self.timestamps.latest()?;
        let earlier = self.timestamps.nth_back(span)?;
        Some(latest.value.saturating_duration_since(earlier.value))
    }

    /// Hand over the acked segments accumulated since the last estimate.
    pub fn take_acked(&mut self) -> u64 {
        std::mem::take(&mut self.acked_accumulator)
    }

    pub fn rtts(&self) -> &SampleWindow<Duration> {
        &self.rtts
    }

    pub fn bandwidths(&self) -> &SampleWindow<f64> {
        &self.bandwidths
    }

    pub fn timestamps(&self) -> &SampleWindow<Instant> {
        &self.timestamps
    }

    pub fn min_rtt(&self) -> Duration {
        self.min_rtt
    }

    pub fn base_rtt(&self) -> Option<Duration> {
        self.base_rtt
    }

    pub fn current_rtt(&self) -> Duration {
        self.current_rtt
    }

    pub fn max_bandwidth(&self) -> f64 {
        self.max_bandwidth
    }

    pub fn acked_accumulator(&self) -> u64 {
        self.acked_accumulator
    }

    pub fn sample_counter(&self) -> u64 {
        self.sample_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ack() -> Result<()> {
        let mut store = SampleStore::new(200, 300, 200);
        let now = Instant::now();

        store.record_ack(2, Duration::from_millis(50), now)?;
        store.record_ack(3, Duration::from_millis(30), now + Duration::from_millis(1))?;
        store.record_ack(1, Duration::from_millis(40), now + Duration::from_millis(2))?;

        assert_eq!(store.min_rtt(), Duration::from_millis(30));
        assert_eq!(store.base_rtt(), Some(Duration::from_millis(30)));
        assert_eq!(store.current_rtt(), Duration::from_millis(40));
        assert_eq!(store.acked_accumulator(), 6);
        assert_eq!(store.sample_counter(), 3);
        assert_eq!(store.rtts().len(), 3);
        assert_eq!(store.timestamps().len(), 3);
        assert_eq!(store.arrival_interval(2), Some(Duration::from_millis(2)));
        assert_eq!(store.arrival_interval(3), None);

        assert_eq!(store.take_acked(), 6);
        assert_eq!(store.acked_accumulator(), 0);
        Ok(())
    }

    #[test]
    fn record_zero_rtt() {
        let mut store = SampleStore::new(200, 300, 200);
        let now = Instant::now();

        assert_eq!(
            store.record_ack(5, Duration::ZERO, now),
            Err(Error::InvalidSample)
        );
        assert_eq!(store.acked_accumulator(), 0);
        assert_eq!(store.sample_counter(), 0);
        assert!(store.rtts().is_empty());
        assert!(store.timestamps().is_empty());
        assert_eq!(store.min_rtt(), Duration::ZERO);
        assert_eq!(store.base_rtt(), None);
    }

    #[test]
    fn min_rtt_follows_window() -> Result<()> {
        let mut store = SampleStore::new(3, 300, 200);
        let now = Instant::now();

        for ms in [10, 50, 60, 70] {
            store.record_ack(1, Duration::from_millis(ms), now)?;
        }

        // The 10ms sample was evicted; the lifetime minimum keeps it.
        assert_eq!(store.min_rtt(), Duration::from_millis(50));
        assert_eq!(store.base_rtt(), Some(Duration::from_millis(10)));
        Ok(())
    }

    #[test]
    fn max_bandwidth_follows_window() {
        let mut store = SampleStore::new(200, 2, 200);

        store.record_bandwidth(100.0);
        assert_eq!(store.max_bandwidth(), 100.0);
        store.record_bandwidth(50.0);
        assert_eq!(store.max_bandwidth(), 100.0);
        store.record_bandwidth(60.0);
        assert_eq!(store.max_bandwidth(), 60.0);
        assert_eq!(store.bandwidths().len(), 2);
    }
}

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

//! Bandwidth estimation from ack arrivals.
//!
//! A raw sample is the delivery rate over the last `DELIVERY_RATE_SPAN`
//! arrivals, or `cwnd / rtt` while the arrival history is too short. Raw
//! samples go through two filters in cascade: an EWMA, then a symmetric
//! (Tustin) filter over the EWMA output.

use std::time::Duration;

use log::*;

use super::sample_store::SampleStore;
use super::FilterMode;

/// Weight of the previous estimate in both filter stages.
const FILTER_GAIN: f64 = 0.9;

/// Number of arrivals spanned by a delivery rate sample.
const DELIVERY_RATE_SPAN: usize = 20;

/// Two-stage bandwidth filter state.
#[derive(Debug)]
pub(super) struct BandwidthEstimator {
    /// Filter mode.
    mode: FilterMode,

    /// Filtered bandwidth estimate in bytes per second.
    current_bw: f64,

    /// Filter output of the previous stage.
    last_bw: f64,

    /// Previous input of the symmetric stage.
    last_sample_bw: f64,

    /// The most recent unfiltered sample.
    raw_bw: f64,
}

impl BandwidthEstimator {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            current_bw: 0.0,
            last_bw: 0.0,
            last_sample_bw: 0.0,
            raw_bw: 0.0,
        }
    }

    /// Take a bandwidth sample, filter it and record the result in the
    /// store. Return the filtered estimate in bytes per second.
    pub fn estimate(
        &mut self,
        store: &mut SampleStore,
        rtt: Duration,
        segment_size: u64,
        cwnd: u64,
    ) -> f64 {
        self.raw_bw = Self::raw_sample(store, rtt, segment_size, cwnd);

        // Every estimate consumes the accumulated acks.
        store.take_acked();

        let bw = self.filter(self.raw_bw);
        store.record_bandwidth(bw);
        bw
    }

    /// Delivery rate over the most recent arrivals, falling back to the
    /// instantaneous `cwnd / rtt` rate.
    fn raw_sample(store: &SampleStore, rtt: Duration, segment_size: u64, cwnd: u64) -> f64 {
        if store.timestamps().len() > DELIVERY_RATE_SPAN + 1 {
            match store.arrival_interval(DELIVERY_RATE_SPAN) {
                Some(interval) if !interval.is_zero() => {
                    return DELIVERY_RATE_SPAN as f64 * segment_size as f64
                        / interval.as_secs_f64();
                }
                _ => trace!("degenerate arrival interval, estimate bandwidth by cwnd/rtt"),
            }
        }

        if rtt.is_zero() {
            return 0.0;
        }
        cwnd as f64 / rtt.as_secs_f64()
    }

    fn filter(&mut self, sample: f64) -> f64 {
        let smoothed = FILTER_GAIN * self.last_bw + (1.0 - FILTER_GAIN) * sample;
        self.last_bw = smoothed;

        match self.mode {
            FilterMode::None => {
                self.current_bw = smoothed;
                self.last_sample_bw = smoothed;
            }
            FilterMode::Tustin => {
                self.current_bw = FILTER_GAIN * self.last_bw
                    + (1.0 - FILTER_GAIN) * ((smoothed + self.last_sample_bw) / 2.0);
                self.last_sample_bw = smoothed;
                self.last_bw = self.current_bw;
            }
        }

        self.current_bw
    }

    pub fn current_bw(&self) -> f64 {
        self.current_bw
    }

    pub fn raw_bw(&self) -> f64 {
        self.raw_bw
    }
}

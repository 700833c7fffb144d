// Copyright (c) 2023 The TQUIC Authors.
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

//! The transport connection side of congestion control.
//!
//! A congestion controller never stores the congestion window itself. The
//! connection that owns the window exposes it through [`TransportWindow`],
//! together with the standard slow start growth rule of the transport.

use std::cmp;

use log::*;

use crate::CongestionConfig;

/// Window storage and slow start rule owned by a transport connection.
pub trait TransportWindow {
    /// Current congestion window in bytes.
    fn congestion_window(&self) -> u64;

    /// Update the congestion window in bytes. Minimal and maximal window
    /// policy is up to the implementation.
    fn set_congestion_window(&mut self, cwnd: u64);

    /// Segment size in bytes.
    fn segment_size(&self) -> u64;

    /// Update the slow start threshold in bytes.
    fn set_slow_start_threshold(&mut self, ssthresh: u64);

    /// Grow the window following the standard slow start rule for the given
    /// number of newly acked segments. Return the number of acked segments
    /// which were not consumed by the growth.
    fn slow_start(&mut self, acked_segments: u32) -> u32;
}

/// Congestion window state of a connection, growing in slow start the way
/// NewReno does: one segment per ack carrying at least one new segment.
#[derive(Debug, Clone)]
pub struct SocketState {
    /// Congestion window in bytes.
    cwnd: u64,

    /// Slow start threshold in bytes.
    ssthresh: u64,

    /// Segment size in bytes.
    segment_size: u64,

    /// Minimal congestion window in bytes.
    min_cwnd: u64,
}

impl SocketState {
    pub fn new(conf: &CongestionConfig) -> Self {
        let segment_size = conf.segment_size as u64;
        let min_cwnd = conf.min_congestion_window.saturating_mul(segment_size);
        let cwnd = conf
            .initial_congestion_window
            .saturating_mul(segment_size)
            .max(min_cwnd);

        Self {
            cwnd,
            ssthresh: u64::MAX,
            segment_size,
            min_cwnd,
        }
    }

    /// Create a window state with the given window and segment size in bytes
    /// and no lower bound on the window.
    pub fn with_window(cwnd: u64, segment_size: u64) -> Self {
        Self {
            cwnd,
            ssthresh: u64::MAX,
            segment_size,
            min_cwnd: 0,
        }
    }

    /// Current slow start threshold in bytes.
    pub fn slow_start_threshold(&self) -> u64 {
        self.ssthresh
    }

    /// Minimal congestion window in bytes.
    pub fn minimal_window(&self) -> u64 {
        self.min_cwnd
    }
}

impl TransportWindow for SocketState {
    fn congestion_window(&self) -> u64 {
        self.cwnd
    }

    fn set_congestion_window(&mut self, cwnd: u64) {
        if cwnd < self.min_cwnd {
            trace!(
                "cwnd {} below minimal window, clamped to {}",
                cwnd,
                self.min_cwnd
            );
        }
        self.cwnd = cmp::max(cwnd, self.min_cwnd);
    }

    fn segment_size(&self) -> u64 {
        self.segment_size
    }

    fn set_slow_start_threshold(&mut self, ssthresh: u64) {
        self.ssthresh = ssthresh;
    }

    fn slow_start(&mut self, acked_segments: u32) -> u32 {
        if acked_segments >= 1 {
            self.cwnd = self.cwnd.saturating_add(self.segment_size);
            return acked_segments - 1;
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_state_new() {
        let mut conf = CongestionConfig::default();
        conf.set_segment_size(1000);
        conf.set_initial_congestion_window(10);
        conf.set_min_congestion_window(2);

        let sock = SocketState::new(&conf);
        assert_eq!(sock.congestion_window(), 10_000);
        assert_eq!(sock.minimal_window(), 2_000);
        assert_eq!(sock.segment_size(), 1000);
        assert_eq!(sock.slow_start_threshold(), u64::MAX);

        // Initial window never starts below the minimal window.
        conf.set_initial_congestion_window(1);
        let sock = SocketState::new(&conf);
        assert_eq!(sock.congestion_window(), 2_000);
    }

    #[test]
    fn socket_state_slow_start() {
        let mut sock = SocketState::with_window(10_000, 1000);

        assert_eq!(sock.slow_start(3), 2);
        assert_eq!(sock.congestion_window(), 11_000);

        assert_eq!(sock.slow_start(1), 0);
        assert_eq!(sock.congestion_window(), 12_000);

        // Nothing acked, nothing grown.
        assert_eq!(sock.slow_start(0), 0);
        assert_eq!(sock.congestion_window(), 12_000);
    }

    #[test]
    fn socket_state_min_window() {
        let mut conf = CongestionConfig::default();
        conf.set_segment_size(1000);
        conf.set_min_congestion_window(4);
        let mut sock = SocketState::new(&conf);

        sock.set_congestion_window(1000);
        assert_eq!(sock.congestion_window(), 4000);

        sock.set_congestion_window(50_000);
        assert_eq!(sock.congestion_window(), 50_000);

        let mut sock = SocketState::with_window(1000, 1000);
        sock.set_congestion_window(0);
        assert_eq!(sock.congestion_window(), 0);
    }
}

pub(crate) mod timer;

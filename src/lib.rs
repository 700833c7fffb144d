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

//! BWPROBE is a congestion controller for reliable transport protocols.
//!
//! Rather than treating packet loss as the primary congestion signal, it
//! estimates the bottleneck delivery rate and the minimum round-trip time of
//! a connection, and drives the congestion window through three phases:
//!
//! * **SlowStart**: the transport's standard slow start grows the window
//!   until the bandwidth estimate stops growing.
//! * **Drain**: throughput has plateaued while RTT inflates, so a standing
//!   queue has formed at the bottleneck and the window is shrunk.
//! * **Probe**: more bandwidth may be available, so the window is grown.
//!
//! The controller does not own the congestion window. The transport
//! connection exposes its window through [`TransportWindow`], feeds every
//! acknowledgment to [`CongestionController::on_ack`], and then lets the
//! controller adjust the window with
//! [`CongestionController::increase_window`].
//!
//! ```
//! use std::time::{Duration, Instant};
//!
//! use bwprobe::{build_congestion_controller, CongestionConfig, SocketState};
//!
//! let conf = CongestionConfig::default();
//! let mut cc = build_congestion_controller(&conf);
//! let mut sock = SocketState::new(&conf);
//!
//! let now = Instant::now();
//! cc.on_ack(1, Duration::from_millis(40), now, &sock).unwrap();
//! cc.increase_window(&mut sock, 1);
//! assert!(cc.bandwidth() > 0.0);
//! ```

use std::cmp;
use std::time::Duration;

/// The default segment size in bytes.
pub const DEFAULT_SEGMENT_SIZE: usize = 1200;

/// The timer granularity, used to clamp configured durations.
pub const TIMER_GRANULARITY: Duration = Duration::from_millis(1);

/// The RTT used before an RTT sample is taken.
const INITIAL_RTT: Duration = Duration::from_millis(333);

/// The default weight of the window multiplier in Drain phase.
const DEFAULT_DRAIN_FACTOR: f64 = 0.8;

/// The default weight of the window multiplier in Probe phase.
const DEFAULT_PROBE_FACTOR: f64 = 1.2;

/// The default number of window updates before slow start may be left.
const DEFAULT_SLOW_START_ROUNDS: u32 = 3;

/// The default capacity of the RTT sample window.
const DEFAULT_RTT_WINDOW_LEN: usize = 200;

/// The default capacity of the bandwidth sample window.
const DEFAULT_BANDWIDTH_WINDOW_LEN: usize = 300;

/// The default capacity of the arrival timestamp window.
const DEFAULT_TIMESTAMP_WINDOW_LEN: usize = 200;

/// A specialized [`Result`] type for congestion control operations.
///
/// [`Result`]: https://doc.rust-lang.org/std/result/enum.Result.html
pub type Result<T> = std::result::Result<T, Error>;

/// Configurations about congestion control.
#[derive(Debug, Clone)]
pub struct CongestionConfig {
    /// The segment size in bytes.
    pub segment_size: usize,

    /// The minimal congestion window in segments. It is enforced by the
    /// transport window, not by the congestion controller.
    pub min_congestion_window: u64,

    /// The initial congestion window in segments.
    pub initial_congestion_window: u64,

    /// The initial rtt, used before real rtt is estimated.
    pub initial_rtt: Duration,

    /// The filter applied to raw bandwidth samples.
    pub filter_mode: FilterMode,

    /// When bandwidth is re-estimated.
    pub sampling_variant: SamplingVariant,

    /// The window multiplier in Drain phase.
    drain_factor: f64,

    /// The window multiplier in Probe phase.
    probe_factor: f64,

    /// The number of window updates before slow start may be left.
    pub slow_start_rounds: u32,

    /// Capacity of the RTT sample window.
    rtt_window_len: usize,

    /// Capacity of the bandwidth sample window.
    bandwidth_window_len: usize,

    /// Capacity of the arrival timestamp window.
    timestamp_window_len: usize,
}

impl CongestionConfig {
    /// Create default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the segment size in bytes.
    pub fn set_segment_size(&mut self, v: usize) {
        self.segment_size = cmp::max(v, 1);
    }

    /// Set the initial congestion window in segments.
    pub fn set_initial_congestion_window(&mut self, packets: u64) {
        self.initial_congestion_window = packets;
    }

    /// Set the minimal congestion window in segments.
    pub fn set_min_congestion_window(&mut self, packets: u64) {
        self.min_congestion_window = packets;
    }

    /// Set the initial RTT in milliseconds. The default value is 333ms.
    pub fn set_initial_rtt(&mut self, millis: u64) {
        self.initial_rtt = cmp::max(Duration::from_millis(millis), TIMER_GRANULARITY);
    }

    /// Set the filter applied to raw bandwidth samples.
    pub fn set_filter_mode(&mut self, mode: FilterMode) {
        self.filter_mode = mode;
    }

    /// Set when bandwidth is re-estimated.
    pub fn set_sampling_variant(&mut self, variant: SamplingVariant) {
        self.sampling_variant = variant;
    }

    /// Set the number of window updates before slow start may be left.
    pub fn set_slow_start_rounds(&mut self, rounds: u32) {
        self.slow_start_rounds = rounds;
    }

    /// Set the window multipliers of Drain and Probe phases.
    ///
    /// The drain factor must be in (0, 1] and the probe factor in [1, inf).
    pub fn set_phase_factors(&mut self, drain_factor: f64, probe_factor: f64) -> Result<()> {
        if !drain_factor.is_finite() || drain_factor <= 0.0 || drain_factor > 1.0 {
            return Err(Error::InvalidConfig(format!(
                "drain factor {} out of range",
                drain_factor
            )));
        }
        if !probe_factor.is_finite() || probe_factor < 1.0 {
            return Err(Error::InvalidConfig(format!(
                "probe factor {} out of range",
                probe_factor
            )));
        }

        self.drain_factor = drain_factor;
        self.probe_factor = probe_factor;
        Ok(())
    }

    /// Set the capacities of the RTT, bandwidth and timestamp windows.
    pub fn set_window_capacities(
        &mut self,
        rtt_window_len: usize,
        bandwidth_window_len: usize,
        timestamp_window_len: usize,
    ) -> Result<()> {
        if rtt_window_len == 0 || bandwidth_window_len == 0 || timestamp_window_len == 0 {
            return Err(Error::InvalidConfig("zero window capacity".into()));
        }

        self.rtt_window_len = rtt_window_len;
        self.bandwidth_window_len = bandwidth_window_len;
        self.timestamp_window_len = timestamp_window_len;
        Ok(())
    }

    /// The window multiplier in Drain phase.
    pub fn drain_factor(&self) -> f64 {
        self.drain_factor
    }

    /// The window multiplier in Probe phase.
    pub fn probe_factor(&self) -> f64 {
        self.probe_factor
    }

    /// Capacities of the RTT, bandwidth and timestamp windows.
    pub fn window_capacities(&self) -> (usize, usize, usize) {
        (
            self.rtt_window_len,
            self.bandwidth_window_len,
            self.timestamp_window_len,
        )
    }
}

impl Default for CongestionConfig {
    fn default() -> CongestionConfig {
        CongestionConfig {
            segment_size: DEFAULT_SEGMENT_SIZE,
            min_congestion_window: 2_u64,
            initial_congestion_window: 10_u64,
            initial_rtt: INITIAL_RTT,
            filter_mode: FilterMode::Tustin,
            sampling_variant: SamplingVariant::PerAck,
            drain_factor: DEFAULT_DRAIN_FACTOR,
            probe_factor: DEFAULT_PROBE_FACTOR,
            slow_start_rounds: DEFAULT_SLOW_START_ROUNDS,
            rtt_window_len: DEFAULT_RTT_WINDOW_LEN,
            bandwidth_window_len: DEFAULT_BANDWIDTH_WINDOW_LEN,
            timestamp_window_len: DEFAULT_TIMESTAMP_WINDOW_LEN,
        }
    }
}


pub use crate::congestion_control::build_congestion_controller;
pub use crate::congestion_control::BwProbe;
pub use crate::congestion_control::BwProbeConfig;
pub use crate::congestion_control::CongestionController;
pub use crate::congestion_control::CongestionStats;
pub use crate::congestion_control::FilterMode;
pub use crate::congestion_control::Phase;
pub use crate::congestion_control::SamplingVariant;
pub use crate::congestion_control::WindowUpdate;
pub use crate::connection::SocketState;
pub use crate::connection::TransportWindow;
pub use crate::error::Error;

#[path = "connection/connection.rs"]
pub mod connection;

#[path = "congestion_control/congestion_control.rs"]
pub mod congestion_control;

#[path = "qlog/qlog.rs"]
pub mod qlog;

pub mod error;

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

#![allow(unused_variables)]

use std::fmt;
use std::time::Duration;
use std::time::Instant;

use crate::connection::TransportWindow;
use crate::CongestionConfig;
use crate::Result;
pub use bwprobe::BwProbe;
pub use bwprobe::BwProbeConfig;
pub use bwprobe::FilterMode;
pub use bwprobe::Phase;
pub use bwprobe::SamplingVariant;
pub use sample_window::Sample;
pub use sample_window::SampleWindow;

/// Congestion control statistics.
#[derive(Debug, Default, Clone)]
pub struct CongestionStats {
    /// Total segments acked.
    pub segments_acked_in_total: u64,

    /// Total segments acked in slow start.
    pub segments_acked_in_slow_start: u64,

    /// Number of bandwidth estimates taken.
    pub bandwidth_estimates: u64,

    /// Number of window updates in slow start.
    pub slow_start_rounds: u64,

    /// Number of window updates in Drain phase.
    pub drain_rounds: u64,

    /// Number of window updates in Probe phase.
    pub probe_rounds: u64,
}

/// The window action selected for one ack-processing cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowUpdate {
    /// Grow the window with the transport's slow start rule.
    SlowStart {
        /// Newly acked segments handed to the slow start rule.
        acked_segments: u32,
    },

    /// Shrink the window by the given multiplier.
    Drain(f64),

    /// Grow the window by the given multiplier.
    Probe(f64),
}

impl WindowUpdate {
    /// Apply the action to the congestion window owned by the transport and
    /// return the number of acked segments not consumed by slow start.
    ///
    /// The slow start threshold is held at its maximum since phase changes
    /// never depend on it. No bound is enforced on the resulting window.
    pub fn apply(&self, window: &mut dyn TransportWindow) -> u32 {
        window.set_slow_start_threshold(u64::MAX);

        match *self {
            WindowUpdate::SlowStart { acked_segments } => window.slow_start(acked_segments),
            WindowUpdate::Drain(factor) | WindowUpdate::Probe(factor) => {
                let cwnd = (window.congestion_window() as f64 * factor) as u64;
                window.set_congestion_window(cwnd);
                0
            }
        }
    }

    /// The window multiplier, if the action is multiplicative.
    pub fn factor(&self) -> Option<f64> {
        match *self {
            WindowUpdate::SlowStart { .. } => None,
            WindowUpdate::Drain(factor) | WindowUpdate::Probe(factor) => Some(factor),
        }
    }

    /// The phase which selected the action.
    pub fn phase(&self) -> Phase {
        match *self {
            WindowUpdate::SlowStart { .. } => Phase::SlowStart,
            WindowUpdate::Drain(_) => Phase::Drain,
            WindowUpdate::Probe(_) => Phase::Probe,
        }
    }
}

/// Congestion control interfaces.
///
/// For each acknowledgment, the transport calls `on_ack()` and then
/// `increase_window()`, in that order.
pub trait CongestionController {
    /// Name of congestion control algorithm.
    fn name(&self) -> &str;

    /// Callback for processing an acknowledgment of `acked_segments`
    /// segments with the given RTT sample.
    fn on_ack(
        &mut self,
        acked_segments: u32,
        rtt: Duration,
        now: Instant,
        window: &dyn TransportWindow,
    ) -> Result<()>;

    /// Select the window action for this ack-processing cycle.
    fn compute_window_update(&mut self, acked_segments: u32) -> WindowUpdate;

    /// Select and apply the window action. Return the number of acked
    /// segments not consumed by slow start.
    fn increase_window(&mut self, window: &mut dyn TransportWindow, acked_segments: u32) -> u32 {
        self.compute_window_update(acked_segments).apply(window)
    }

    /// Time of the pending delayed work, if any.
    fn timeout(&self) -> Option<Instant> {
        None
    }

    /// Callback for the expiration of `timeout()`.
    fn on_timeout(&mut self, now: Instant, window: &dyn TransportWindow) {}

    /// Slow start threshold in bytes.
    fn slow_start_threshold(&self) -> u64 {
        u64::MAX
    }

    /// Check if in slow start.
    fn in_slow_start(&self) -> bool {
        false
    }

    /// Current bandwidth estimate in bytes per second.
    fn bandwidth(&self) -> f64;

    /// Minimum RTT over recent samples.
    fn min_rtt(&self) -> Duration;

    /// Create a controller with the same configuration and a fresh history,
    /// for use by a new connection.
    fn fork(&self) -> Box<dyn CongestionController>;

    /// Congestion stats.
    fn stats(&self) -> &CongestionStats;
}

impl fmt::Debug for dyn CongestionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "congestion controller.")
    }
}

/// Build a congestion controller.
pub fn build_congestion_controller(conf: &CongestionConfig) -> Box<dyn CongestionController> {
    Box::new(BwProbe::new(BwProbeConfig::from(conf)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SocketState;

    #[test]
    fn window_update_apply() {
        let mut sock = SocketState::with_window(100_000, 1000);
        sock.set_slow_start_threshold(50_000);

        assert_eq!(WindowUpdate::Drain(0.8).apply(&mut sock), 0);
        assert_eq!(sock.congestion_window(), 80_000);
        assert_eq!(sock.slow_start_threshold(), u64::MAX);

        assert_eq!(WindowUpdate::Probe(1.2).apply(&mut sock), 0);
        assert_eq!(sock.congestion_window(), 96_000);

        let update = WindowUpdate::SlowStart { acked_segments: 2 };
        assert_eq!(update.apply(&mut sock), 1);
        assert_eq!(sock.congestion_window(), 97_000);
    }

    #[test]
    fn window_update_no_clamping() {
        let mut sock = SocketState::with_window(1, 1000);
        WindowUpdate::Drain(0.8).apply(&mut sock);
        assert_eq!(sock.congestion_window(), 0);

        let mut sock = SocketState::with_window(u64::MAX / 2, 1000);
        WindowUpdate::Probe(4.0).apply(&mut sock);
        assert_eq!(sock.congestion_window(), u64::MAX);
    }

    #[test]
    fn window_update_accessors() {
        let update = WindowUpdate::SlowStart { acked_segments: 1 };
        assert_eq!(update.factor(), None);
        assert_eq!(update.phase(), Phase::SlowStart);

        assert_eq!(WindowUpdate::Drain(0.8).factor(), Some(0.8));
        assert_eq!(WindowUpdate::Drain(0.8).phase(), Phase::Drain);
        assert_eq!(WindowUpdate::Probe(1.2).factor(), Some(1.2));
        assert_eq!(WindowUpdate::Probe(1.2).phase(), Phase::Probe);
    }

    #[test]
    fn build_controller() {
        let mut conf = CongestionConfig::default();
        conf.set_sampling_variant(SamplingVariant::PerRtt);

        let cc = build_congestion_controller(&conf);
        assert_eq!(cc.name(), "BWPROBE");
        assert_eq!(cc.in_slow_start(), true);
        assert_eq!(cc.slow_start_threshold(), u64::MAX);
        assert_eq!(cc.bandwidth(), 0.0);
        assert_eq!(cc.min_rtt(), Duration::ZERO);
        assert_eq!(cc.timeout(), None);
        assert_eq!(format!("{:?}", cc), "congestion controller.");
    }
}

#[path = "bwprobe/bwprobe.rs"]
mod bwprobe;

mod sample_window;

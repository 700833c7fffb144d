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

//! BWPROBE: bandwidth and RTT based congestion control.
//!
//! Each acknowledgment contributes an RTT sample and an arrival time to
//! bounded sample windows. A bandwidth estimate is taken from the recent
//! delivery rate and smoothed by a two-stage filter. The congestion window
//! then follows one of three phases:
//!
//! - SlowStart: grow with the transport's slow start rule until the estimate
//!   is close to its recent maximum. Left at most once.
//! - Drain: the estimate plateaued while RTT inflated, so shrink the window
//!   by the drain factor.
//! - Probe: otherwise grow the window by the probe factor.
//!
//! Packet loss is not a congestion signal and the slow start threshold is
//! held at its maximum.

use std::str::FromStr;
use std::time::Duration;
use std::time::Instant;

use log::*;
use strum_macros::IntoStaticStr;

use self::bandwidth::BandwidthEstimator;
pub use self::phase::Phase;
use self::phase::PhaseInput;
use self::phase::PhaseMachine;
use self::sample_store::SampleStore;
use super::CongestionController;
use super::CongestionStats;
use super::SampleWindow;
use super::WindowUpdate;
use crate::connection::timer::EstimateTimer;
use crate::connection::TransportWindow;
use crate::qlog::events::EventData;
use crate::CongestionConfig;
use crate::Error;
use crate::Result;

/// Filter applied to raw bandwidth samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FilterMode {
    /// EWMA only.
    None,

    /// EWMA followed by a symmetric (Tustin) filter.
    Tustin,
}

impl FromStr for FilterMode {
    type Err = Error;

    fn from_str(mode: &str) -> Result<FilterMode> {
        if mode.eq_ignore_ascii_case("none") {
            Ok(FilterMode::None)
        } else if mode.eq_ignore_ascii_case("tustin") {
            Ok(FilterMode::Tustin)
        } else {
            Err(Error::InvalidConfig(format!("unknown filter mode {}", mode)))
        }
    }
}

/// When the bandwidth is re-estimated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SamplingVariant {
    /// On every acknowledgment.
    PerAck,

    /// One RTT after the latest acknowledgment.
    PerRtt,
}

impl FromStr for SamplingVariant {
    type Err = Error;

    fn from_str(variant: &str) -> Result<SamplingVariant> {
        if variant.eq_ignore_ascii_case("per_ack") {
            Ok(SamplingVariant::PerAck)
        } else if variant.eq_ignore_ascii_case("per_rtt") {
            Ok(SamplingVariant::PerRtt)
        } else {
            Err(Error::InvalidConfig(format!(
                "unknown sampling variant {}",
                variant
            )))
        }
    }
}

/// BWPROBE configurable parameters.
#[derive(Debug, Clone)]
pub struct BwProbeConfig {
    /// Minimal congestion window in bytes, reported to qlog only.
    min_cwnd: u64,

    /// Initial congestion window in bytes, reported to qlog only.
    initial_cwnd: u64,

    /// Initial RTT, reported to qlog only.
    initial_rtt: Duration,

    /// Segment size in bytes.
    segment_size: u64,

    filter_mode: FilterMode,

    sampling_variant: SamplingVariant,

    /// Window multiplier in Drain phase.
    drain_factor: f64,

    /// Window multiplier in Probe phase.
    probe_factor: f64,

    /// Window updates before slow start may be left.
    slow_start_rounds: u32,

    rtt_window_len: usize,

    bandwidth_window_len: usize,

    timestamp_window_len: usize,
}

impl BwProbeConfig {
    pub fn new(filter_mode: FilterMode, sampling_variant: SamplingVariant) -> Self {
        Self {
            filter_mode,
            sampling_variant,
            ..Self::default()
        }
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    pub fn sampling_variant(&self) -> SamplingVariant {
        self.sampling_variant
    }

    pub fn drain_factor(&self) -> f64 {
        self.drain_factor
    }

    pub fn probe_factor(&self) -> f64 {
        self.probe_factor
    }

    pub fn slow_start_rounds(&self) -> u32 {
        self.slow_start_rounds
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

impl Default for BwProbeConfig {
    fn default() -> Self {
        Self::from(&CongestionConfig::default())
    }
}

impl From<&CongestionConfig> for BwProbeConfig {
    fn from(conf: &CongestionConfig) -> Self {
        let segment_size = conf.segment_size as u64;
        let (rtt_window_len, bandwidth_window_len, timestamp_window_len) =
            conf.window_capacities();

        Self {
            min_cwnd: conf.min_congestion_window.saturating_mul(segment_size),
            initial_cwnd: conf.initial_congestion_window.saturating_mul(segment_size),
            initial_rtt: conf.initial_rtt,
            segment_size,
            filter_mode: conf.filter_mode,
            sampling_variant: conf.sampling_variant,
            drain_factor: conf.drain_factor(),
            probe_factor: conf.probe_factor(),
            slow_start_rounds: conf.slow_start_rounds,
            rtt_window_len,
            bandwidth_window_len,
            timestamp_window_len,
        }
    }
}

/// BWPROBE congestion control state of a connection.
#[derive(Debug)]
pub struct BwProbe {
    /// Configurable parameters.
    config: BwProbeConfig,

    /// RTT, bandwidth and arrival history.
    samples: SampleStore,

    /// Bandwidth filter.
    estimator: BandwidthEstimator,

    /// Phase state machine.
    phase: PhaseMachine,

    /// Pending estimate of the per-RTT sampling variant.
    estimate_timer: EstimateTimer,

    /// The latest phase transition.
    last_phase_change: Option<(Phase, Phase)>,

    /// Congestion statistics.
    stats: CongestionStats,
}

impl BwProbe {
    pub fn new(config: BwProbeConfig) -> Self {
        let (rtt_window_len, bandwidth_window_len, timestamp_window_len) =
            config.window_capacities();

        Self {
            samples: SampleStore::new(rtt_window_len, bandwidth_window_len, timestamp_window_len),
            estimator: BandwidthEstimator::new(config.filter_mode),
            phase: PhaseMachine::new(
                config.slow_start_rounds,
                config.drain_factor,
                config.probe_factor,
            ),
            estimate_timer: EstimateTimer::default(),
            last_phase_change: None,
            stats: Default::default(),
            config,
        }
    }

    /// Create a controller with the same parameters and no history. Sample
    /// windows, filter state, counters and any pending estimate are not
    /// carried over.
    pub fn fork(&self) -> Self {
        BwProbe::new(self.config.clone())
    }

    /// Take a bandwidth estimate with the given RTT sample, segment size and
    /// congestion window. Return the filtered estimate in bytes per second.
    pub fn estimate_bandwidth(&mut self, rtt: Duration, segment_size: u64, cwnd: u64) -> f64 {
        let bw = self
            .estimator
            .estimate(&mut self.samples, rtt, segment_size, cwnd);
        self.stats.bandwidth_estimates = self.stats.bandwidth_estimates.saturating_add(1);

        trace!(
            "{}. bandwidth estimate {:.0}B/s, raw {:.0}B/s, max {:.0}B/s, cwnd {}, rtt {}us",
            self.name(),
            bw,
            self.estimator.raw_bw(),
            self.samples.max_bandwidth(),
            cwnd,
            rtt.as_micros()
        );

        bw
    }

    pub fn config(&self) -> &BwProbeConfig {
        &self.config
    }

    /// Minimum RTT over the lifetime of the connection.
    pub fn base_rtt(&self) -> Option<Duration> {
        self.samples.base_rtt()
    }

    /// The most recent RTT sample.
    pub fn current_rtt(&self) -> Duration {
        self.samples.current_rtt()
    }

    /// Maximum bandwidth estimate over the bandwidth window.
    pub fn max_bandwidth(&self) -> f64 {
        self.samples.max_bandwidth()
    }

    /// The most recent unfiltered bandwidth sample.
    pub fn raw_bandwidth(&self) -> f64 {
        self.estimator.raw_bw()
    }

    /// Segments acked since the latest estimate.
    pub fn acked_accumulator(&self) -> u64 {
        self.samples.acked_accumulator()
    }

    /// Number of accepted samples.
    pub fn sample_counter(&self) -> u64 {
        self.samples.sample_counter()
    }

    /// Window updates left before slow start may be left.
    pub fn slow_start_countdown(&self) -> u32 {
        self.phase.countdown()
    }

    /// The phase selected by the latest window update.
    pub fn phase(&self) -> Phase {
        self.phase.phase()
    }

    /// The latest phase transition as (old, new).
    pub fn last_phase_change(&self) -> Option<(Phase, Phase)> {
        self.last_phase_change
    }

    pub fn rtt_window(&self) -> &SampleWindow<Duration> {
        self.samples.rtts()
    }

    pub fn bandwidth_window(&self) -> &SampleWindow<f64> {
        self.samples.bandwidths()
    }

    pub fn timestamp_window(&self) -> &SampleWindow<Instant> {
        self.samples.timestamps()
    }

    /// Qlog event of the parameters of the controller.
    pub fn parameters_event(&self) -> EventData {
        let filter_mode: &'static str = self.config.filter_mode.into();
        let sampling_variant: &'static str = self.config.sampling_variant.into();

        EventData::RecoveryParametersSet {
            initial_rtt: Some(self.config.initial_rtt.as_secs_f32() * 1000.0),
            max_datagram_size: Some(self.config.segment_size as u32),
            initial_congestion_window: Some(self.config.initial_cwnd),
            minimum_congestion_window: Some(self.config.min_cwnd),
            drain_factor: Some(self.config.drain_factor),
            probe_factor: Some(self.config.probe_factor),
            filter_mode: Some(filter_mode.to_string()),
            sampling_variant: Some(sampling_variant.to_string()),
        }
    }

    /// Qlog event of the current estimates and the window of the transport.
    pub fn metrics_event(&self, window: &dyn TransportWindow) -> EventData {
        EventData::RecoveryMetricsUpdated {
            min_rtt: Some(self.samples.min_rtt().as_secs_f32() * 1000.0),
            latest_rtt: Some(self.samples.current_rtt().as_secs_f32() * 1000.0),
            congestion_window: Some(window.congestion_window()),
            ssthresh: Some(self.slow_start_threshold()),
            bandwidth_estimate: Some(self.estimator.current_bw()),
            max_bandwidth: Some(self.samples.max_bandwidth()),
        }
    }

    /// Qlog event of the latest phase transition.
    pub fn phase_event(&self) -> Option<EventData> {
        let (old, new) = self.last_phase_change?;
        let old: &'static str = old.into();
        let new: &'static str = new.into();

        Some(EventData::RecoveryCongestionStateUpdated {
            old: Some(old.to_string()),
            new: new.to_string(),
        })
    }
}

impl Default for BwProbe {
    fn default() -> Self {
        BwProbe::new(BwProbeConfig::default())
    }
}

impl CongestionController for BwProbe {
    fn name(&self) -> &str {
        "BWPROBE"
    }

    fn on_ack(
        &mut self,
        acked_segments: u32,
        rtt: Duration,
        now: Instant,
        window: &dyn TransportWindow,
    ) -> Result<()> {
        if let Err(e) = self.samples.record_ack(acked_segments, rtt, now) {
            warn!(
                "{}. drop invalid sample, acked {} rtt {}us",
                self.name(),
                acked_segments,
                rtt.as_micros()
            );
            return Err(e);
        }

        self.stats.segments_acked_in_total = self
            .stats
            .segments_acked_in_total
            .saturating_add(acked_segments as u64);

        match self.config.sampling_variant {
            SamplingVariant::PerAck => {
                self.estimate_bandwidth(rtt, window.segment_size(), window.congestion_window());
            }
            SamplingVariant::PerRtt => match now.checked_add(rtt) {
                Some(time) => {
                    self.estimate_timer.set(time, rtt);
                    trace!(
                        "{}. estimate rescheduled in {}us",
                        self.name(),
                        rtt.as_micros()
                    );
                }
                None => warn!("{}. estimate time overflow, rtt {:?}", self.name(), rtt),
            },
        }

        Ok(())
    }

    fn compute_window_update(&mut self, acked_segments: u32) -> WindowUpdate {
        let input = PhaseInput {
            min_rtt: self.samples.min_rtt(),
            current_rtt: self.samples.current_rtt(),
            current_bw: self.estimator.current_bw(),
            max_bw: self.samples.max_bandwidth(),
        };
        let old_phase = self.phase.phase();
        let was_in_slow_start = self.phase.in_slow_start();

        let update = self.phase.update(&input, acked_segments);

        match update {
            WindowUpdate::SlowStart { .. } => {
                self.stats.slow_start_rounds += 1;
                self.stats.segments_acked_in_slow_start = self
                    .stats
                    .segments_acked_in_slow_start
                    .saturating_add(acked_segments as u64);
            }
            WindowUpdate::Drain(_) => self.stats.drain_rounds += 1,
            WindowUpdate::Probe(_) => self.stats.probe_rounds += 1,
        }

        if was_in_slow_start && !self.phase.in_slow_start() {
            debug!(
                "{}. exit slow start, bandwidth {:.0}B/s, max {:.0}B/s",
                self.name(),
                input.current_bw,
                input.max_bw
            );
        }

        let new_phase = self.phase.phase();
        if new_phase != old_phase {
            self.last_phase_change = Some((old_phase, new_phase));
            debug!(
                "{}. phase {:?} -> {:?}, min_rtt {}us, current_rtt {}us",
                self.name(),
                old_phase,
                new_phase,
                input.min_rtt.as_micros(),
                input.current_rtt.as_micros()
            );
        }

        update
    }

    fn timeout(&self) -> Option<Instant> {
        self.estimate_timer.get()
    }

    fn on_timeout(&mut self, now: Instant, window: &dyn TransportWindow) {
        if !self.estimate_timer.is_expired(now) {
            return;
        }

        let rtt = self.estimate_timer.rtt();
        self.estimate_timer.stop();
        self.estimate_bandwidth(rtt, window.segment_size(), window.congestion_window());
    }

    fn in_slow_start(&self) -> bool {
        self.phase.in_slow_start()
    }

    fn bandwidth(&self) -> f64 {
        self.estimator.current_bw()
    }

    fn min_rtt(&self) -> Duration {
        self.samples.min_rtt()
    }

    fn fork(&self) -> Box<dyn CongestionController> {
        Box::new(BwProbe::fork(self))
    }

    fn stats(&self) -> &CongestionStats {
        &self.stats
    }
}


mod bandwidth;
mod phase;
mod sample_store;

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

use strum_macros::IntoStaticStr;

use crate::congestion_control::WindowUpdate;

/// Slow start is left once the bandwidth estimate is within this fraction
/// of the maximum.
const SLOW_START_EXIT_THRESHOLD: f64 = 0.2;

/// Bandwidth is considered plateaued within this fraction of the maximum.
const BANDWIDTH_PLATEAU_THRESHOLD: f64 = 0.1;

/// RTT is considered inflated above this multiple of the minimum RTT.
const RTT_INFLATION_THRESHOLD: f64 = 1.1;

/// Phase of the controller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    /// The window grows with the transport's slow start rule.
    SlowStart,

    /// A standing queue is drained by shrinking the window.
    Drain,

    /// Spare bandwidth is probed by growing the window.
    Probe,
}

/// Estimates the phase selection is based on.
#[derive(Debug, Copy, Clone)]
pub(super) struct PhaseInput {
    pub min_rtt: Duration,
    pub current_rtt: Duration,
    pub current_bw: f64,
    pub max_bw: f64,
}

impl PhaseInput {
    /// Ratio of the latest RTT to the minimum RTT. No minimum RTT yet means
    /// no inflation.
    fn rtt_ratio(&self) -> f64 {
        if self.min_rtt.is_zero() {
            return 1.0;
        }
        self.current_rtt.as_secs_f64() / self.min_rtt.as_secs_f64()
    }

    /// Distance of the current estimate from the maximum, relative to the
    /// maximum.
    fn within(&self, fraction: f64) -> bool {
        (self.max_bw - self.current_bw).abs() < fraction * self.max_bw
    }
}

/// Phase state machine.
#[derive(Debug)]
pub(super) struct PhaseMachine {
    /// Whether slow start has not been left yet. Once false, never true again.
    in_slow_start: bool,

    /// Window updates left before slow start may be left.
    countdown: u32,

    /// The phase selected by the latest update.
    phase: Phase,

    drain_factor: f64,

    probe_factor: f64,
}

impl PhaseMachine {
    pub fn new(slow_start_rounds: u32, drain_factor: f64, probe_factor: f64) -> Self {
        Self {
            in_slow_start: true,
            countdown: slow_start_rounds,
            phase: Phase::SlowStart,
            drain_factor,
            probe_factor,
        }
    }

    /// Select the window action for one ack-processing cycle.
    pub fn update(&mut self, input: &PhaseInput, acked_segments: u32) -> WindowUpdate {
        if self.in_slow_start {
            if self.countdown >= 1 {
                self.countdown -= 1;
            }
            if self.countdown < 1 && input.within(SLOW_START_EXIT_THRESHOLD) {
                self.in_slow_start = false;
            }

            self.phase = Phase::SlowStart;
            return WindowUpdate::SlowStart { acked_segments };
        }

        if input.within(BANDWIDTH_PLATEAU_THRESHOLD)
            && input.rtt_ratio() > RTT_INFLATION_THRESHOLD
        {
            self.phase = Phase::Drain;
            return WindowUpdate::Drain(self.drain_factor);
        }

        self.phase = Phase::Probe;
        WindowUpdate::Probe(self.probe_factor)
    }

    pub fn in_slow_start(&self) -> bool {
        self.in_slow_start
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }
}

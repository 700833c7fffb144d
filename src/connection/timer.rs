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

use std::time::Duration;
use std::time::Instant;

/// A single-shot timer for a delayed bandwidth estimate. Each connection
/// owns at most one pending estimate: arming the timer again replaces it.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct EstimateTimer {
    /// Expiration time of the pending estimate.
    expires: Option<Instant>,

    /// RTT sample captured when the timer was armed.
    rtt: Duration,
}

impl EstimateTimer {
    /// Arm the timer, cancelling the pending one if any.
    pub fn set(&mut self, time: Instant, rtt: Duration) {
        self.expires = Some(time);
        self.rtt = rtt;
    }

    /// Get expiration time of the pending estimate.
    pub fn get(&self) -> Option<Instant> {
        self.expires
    }

    /// RTT sample captured when the timer was armed.
    pub fn rtt(&self) -> Duration {
        self.rtt
    }

    /// Cancel the pending estimate.
    pub fn stop(&mut self) {
        self.expires = None;
    }

    /// Check whether the pending estimate is due.
    pub fn is_expired(&self, after: Instant) -> bool {
        self.expires.map_or(false, |x| x <= after)
    }
}

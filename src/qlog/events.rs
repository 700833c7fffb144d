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

//! Recovery event definitions, following the recovery events of
//! draft-ietf-quic-qlog-quic-events-06 with bandwidth probing fields added.

use serde::Deserialize;
use serde::Serialize;

/// A timestamped event.
#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Event {
    /// Milliseconds since the reference time of the trace.
    pub time: f32,

    /// Event name and per-event data.
    #[serde(flatten)]
    pub data: EventData,

    /// One of "absolute", "delta" or "relative".
    pub time_format: Option<TimeFormat>,

    /// Conceptual group of the event, such as a connection.
    pub group_id: Option<String>,
}

impl Event {
    pub fn new(time: f32, data: EventData) -> Self {
        Event {
            time,
            data,
            time_format: Default::default(),
            group_id: Default::default(),
        }
    }

    /// Return the importance of the event.
    pub fn importance(&self) -> EventImportance {
        self.data.importance()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Event) -> bool {
        self.time == other.time
            && self.data == other.data
            && self.group_id == other.group_id
            && self.time_format == other.time_format
    }
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(tag = "name", content = "data")]
pub enum EventData {
    /// Initial parameters of the congestion controller. They are set once and
    /// never change during a connection.
    #[serde(rename = "recovery:parameters_set")]
    RecoveryParametersSet {
        initial_rtt: Option<f32>,
        max_datagram_size: Option<u32>,
        initial_congestion_window: Option<u64>,
        minimum_congestion_window: Option<u64>,
        drain_factor: Option<f64>,
        probe_factor: Option<f64>,
        filter_mode: Option<String>,
        sampling_variant: Option<String>,
    },

    /// One or more of the observable recovery metrics changed value. Only
    /// the changed metrics need to be present.
    #[serde(rename = "recovery:metrics_updated")]
    RecoveryMetricsUpdated {
        min_rtt: Option<f32>,
        latest_rtt: Option<f32>,
        congestion_window: Option<u64>,
        ssthresh: Option<u64>,
        bandwidth_estimate: Option<f64>,
        max_bandwidth: Option<f64>,
    },

    /// The congestion controller entered a new phase.
    #[serde(rename = "recovery:congestion_state_updated")]
    RecoveryCongestionStateUpdated { old: Option<String>, new: String },
}

impl EventData {
    /// Return importance of the concrete event.
    pub fn importance(&self) -> EventImportance {
        match *self {
            EventData::RecoveryParametersSet { .. } => EventImportance::Base,
            EventData::RecoveryMetricsUpdated { .. } => EventImportance::Core,
            EventData::RecoveryCongestionStateUpdated { .. } => EventImportance::Base,
        }
    }
}

/// An "importance indicator" in decreasing order of importance and expected
/// usage.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub enum EventImportance {
    /// Events that SHOULD be present in all qlog files.
    Core = 0,

    /// Events adding debugging options.
    Base = 1,

    /// Events mostly useful for low-level debugging of the implementation.
    Extra = 2,
}

impl EventImportance {
    /// Return true if this importance level is included by `other`.
    pub fn is_contained_in(&self, other: &EventImportance) -> bool {
        self <= other
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    Absolute,
    Delta,
    Relative,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_metrics_updated() {
        let event = Event::new(
            1.5,
            EventData::RecoveryMetricsUpdated {
                min_rtt: Some(10.0),
                latest_rtt: Some(12.0),
                congestion_window: Some(12000),
                ssthresh: None,
                bandwidth_estimate: Some(500000.0),
                max_bandwidth: None,
            },
        );
        assert_eq!(event.importance(), EventImportance::Core);

        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"time":1.5,"name":"recovery:metrics_updated","data":{"min_rtt":10.0,"latest_rtt":12.0,"congestion_window":12000,"bandwidth_estimate":500000.0}}"#
        );
    }

    #[test]
    fn serialize_congestion_state_updated() {
        let event = Event::new(
            0.0,
            EventData::RecoveryCongestionStateUpdated {
                old: Some("slow_start".to_string()),
                new: "probe".to_string(),
            },
        );
        assert_eq!(event.importance(), EventImportance::Base);

        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"time":0.0,"name":"recovery:congestion_state_updated","data":{"old":"slow_start","new":"probe"}}"#
        );
    }

    #[test]
    fn event_importance() {
        assert!(EventImportance::Core.is_contained_in(&EventImportance::Base));
        assert!(EventImportance::Base.is_contained_in(&EventImportance::Base));
        assert!(!EventImportance::Extra.is_contained_in(&EventImportance::Base));
    }
}

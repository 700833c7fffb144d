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

//! A streaming qlog writer for congestion control traces.
//!
//! Traces use the QlogFileSeq schema of draft-ietf-quic-qlog-main-schema-07
//! and are serialized as JSON Text Sequences (RFC 7464).

use std::io::Write;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

use self::events::Event;
use self::events::EventData;
use self::events::EventImportance;
use crate::Error;
use crate::Result;

/// The qlog_version is 0.4 for draft-ietf-quic-qlog-main-schema-07
pub const QLOG_VERSION: &str = "0.4";

/// The serialization format for QlogFileSeq is JSON-SEQ
pub const JSON_TEXT_SEQS: &str = "JSON-SEQ";

/// The header of a streamed qlog file.
#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QlogFileSeq {
    /// Always "JSON-SEQ".
    pub qlog_format: String,

    /// Always "0.4".
    pub qlog_version: String,

    pub title: Option<String>,

    pub description: Option<String>,

    /// Metadata of the single trace all events in the file belong to.
    pub trace: TraceSeq,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct TraceSeq {
    pub title: Option<String>,
    pub description: Option<String>,
    pub common_fields: Option<CommonFields>,
    pub vantage_point: VantagePoint,
}

impl TraceSeq {
    pub fn new(
        title: Option<String>,
        description: Option<String>,
        common_fields: Option<CommonFields>,
        vantage_point: VantagePoint,
    ) -> Self {
        TraceSeq {
            title,
            description,
            common_fields,
            vantage_point,
        }
    }
}

/// The endpoint a trace is recorded at.
#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct VantagePoint {
    pub name: Option<String>,

    pub r#type: VantagePointType,
}

impl VantagePoint {
    /// Return a Server or Client VantagePoint
    pub fn new(name: Option<String>, is_server: bool) -> VantagePoint {
        let r#type = if is_server {
            VantagePointType::Server
        } else {
            VantagePointType::Client
        };
        Self { name, r#type }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum VantagePointType {
    Client,
    Server,
    Network,
    Unknown,
}

/// Fields shared by all events of a trace.
#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
pub struct CommonFields {
    pub time_format: Option<String>,
    pub reference_time: Option<f64>,
    pub protocol_type: Option<Vec<String>>,
    pub group_id: Option<String>,
}

/// Qlog writer using the QlogFileSeq schema
pub struct QlogWriter {
    /// Header written by `start()`.
    qlog: QlogFileSeq,

    /// Events below this level will not be written out.
    level: EventImportance,

    /// The underlying writer for qlog streaming
    writer: Box<dyn Write + Send + Sync>,

    /// Whether the header has been written
    ready: bool,

    /// Reference time of event timestamps.
    start_time: Instant,
}

impl QlogWriter {
    pub fn new(
        title: Option<String>,
        description: Option<String>,
        trace: TraceSeq,
        level: EventImportance,
        writer: Box<dyn Write + Send + Sync>,
        start_time: Instant,
    ) -> Self {
        let qlog = QlogFileSeq {
            qlog_format: JSON_TEXT_SEQS.to_string(),
            qlog_version: QLOG_VERSION.to_string(),
            title,
            description,
            trace,
        };

        QlogWriter {
            qlog,
            level,
            writer,
            ready: false,
            start_time,
        }
    }

    /// Start qlog serialization and write the QlogFileSeq.
    pub fn start(&mut self) -> Result<()> {
        if self.ready {
            return Err(Error::Done);
        }

        let header = self.qlog.clone();
        self.write_record(&header)?;
        self.ready = true;
        Ok(())
    }

    /// Flush qlog serialization data.
    pub fn flush(&mut self) -> Result<()> {
        if !self.ready {
            return Err(Error::InvalidState("expect ready state".into()));
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Write an event in JSON-SEQ format.
    pub fn add_event(&mut self, event: Event) -> Result<()> {
        self.check(event.importance())?;
        self.write_record(&event)
    }

    /// Write an event happened at `time` in JSON-SEQ format.
    pub fn add_event_data(&mut self, time: Instant, event_data: EventData) -> Result<()> {
        let event = Event::new(self.relative_time(time), event_data);
        self.add_event(event)
    }

    fn write_record<T: Serialize>(&mut self, record: &T) -> Result<()> {
        self.writer.write_all(b" ")?;
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| Error::IoError(e.to_string()))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Return whether the event should be written
    fn check(&self, ei: EventImportance) -> Result<()> {
        if !self.ready {
            return Err(Error::InvalidState("not ready".into()));
        }
        if !ei.is_contained_in(&self.level) {
            return Err(Error::Done);
        }
        Ok(())
    }

    /// Milliseconds elapsed since the writer was created.
    pub fn relative_time(&self, time: Instant) -> f32 {
        let duration = time.saturating_duration_since(self.start_time);
        duration.as_secs_f32() * 1000.0
    }
}


pub mod events;

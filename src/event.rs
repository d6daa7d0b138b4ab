// Copyright 2024 FastLabs Developers
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

use jiff::Timestamp;

/// A chunk of output emitted by a supervised process.
///
/// The payload is delivered as the transport decoded it: it may hold several lines, and it may or
/// may not end with a line break.
///
/// # Examples
///
/// ```
/// use streamforth::StreamEvent;
///
/// let event = StreamEvent::new("stdout", "listening on :8080\n")
///     .with_pid(4242)
///     .with_source("web");
///
/// assert_eq!(event.topic(), "stdout");
/// assert_eq!(event.pid(), Some(4242));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    topic: String,
    pid: Option<u32>,
    source: Option<String>,
    payload: String,
    received_at: Timestamp,
}

impl StreamEvent {
    /// Create an event received now.
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            pid: None,
            source: None,
            payload: payload.into(),
            received_at: Timestamp::now(),
        }
    }

    /// Set the id of the process that emitted the payload.
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Set the name of the watcher that owns the process.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Override the reception time.
    pub fn with_received_at(mut self, received_at: Timestamp) -> Self {
        self.received_at = received_at;
        self
    }

    /// The routing topic, e.g. `stdout` or `stderr`.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The process id, if the transport supplied one.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The originating identifier, if the transport supplied one.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// The raw output chunk.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// When the event reached this subsystem.
    pub fn received_at(&self) -> Timestamp {
        self.received_at
    }
}

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

use std::fmt;

use crate::Error;
use crate::StreamEvent;
use crate::sink::Sink;

/// Forwards payloads to external subscribers, e.g. a pub/sub socket owned by the daemon.
pub trait Notifier: Send + Sync + 'static {
    /// Publish `payload` under `topic`.
    fn notify(&self, topic: &str, payload: &str) -> Result<(), Error>;
}

impl<F> Notifier for F
where
    F: Fn(&str, &str) -> Result<(), Error> + Send + Sync + 'static,
{
    fn notify(&self, topic: &str, payload: &str) -> Result<(), Error> {
        self(topic, payload)
    }
}

/// A sink republishing every event through a [`Notifier`].
///
/// # Examples
///
/// ```
/// use streamforth::sink::Republish;
///
/// let sink = Republish::new(|topic: &str, payload: &str| -> Result<(), streamforth::Error> {
///     println!("{topic} => {payload}");
///     Ok(())
/// })
/// .topic("output");
/// ```
pub struct Republish {
    notifier: Box<dyn Notifier>,
    topic: Option<String>,
}

impl fmt::Debug for Republish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Republish")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl Republish {
    /// Create a sink forwarding to `notifier`.
    pub fn new(notifier: impl Notifier) -> Self {
        Self {
            notifier: Box::new(notifier),
            topic: None,
        }
    }

    /// Publish every payload under `topic` instead of the event's own topic.
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

impl Sink for Republish {
    fn handle(&self, event: &StreamEvent) -> Result<(), Error> {
        let topic = self.topic.as_deref().unwrap_or(event.topic());
        self.notifier
            .notify(topic, event.payload())
            .map_err(|err| Error::new(err.kind(), "failed to republish event").with_source(err))
    }
}

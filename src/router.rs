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

use std::any::Any;
use std::fmt;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::ErrorKind;
use crate::StreamEvent;
use crate::TopicFilter;
use crate::config::SinkOptions;
use crate::sink::Sink;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// Identifies a sink registered with a [`StreamRouter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SinkId(u64);

impl SinkId {
    /// The numeric value of this id. Ids are assigned in registration order.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink:{}", self.0)
    }
}

#[derive(Debug)]
struct Registration {
    id: SinkId,
    filter: TopicFilter,
    sink: Box<dyn Sink>,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    registrations: Vec<Registration>,
    closed: bool,
}

/// Fans stream events out to every interested sink.
///
/// Sinks receive events in registration order. A sink failing to handle an event is reported to
/// the router's [`Trap`] and does not keep the event from the sinks after it.
///
/// # Examples
///
/// ```
/// use streamforth::StreamEvent;
/// use streamforth::StreamRouter;
/// use streamforth::sink::Passthrough;
///
/// let router = StreamRouter::new();
/// router.register(Passthrough::default(), "stdout").unwrap();
///
/// let delivered = router.dispatch(&StreamEvent::new("stdout", "hello\n"));
/// assert_eq!(delivered, 1);
///
/// router.close();
/// ```
pub struct StreamRouter {
    registry: Mutex<Registry>,
    trap: Box<dyn Trap>,
}

impl fmt::Debug for StreamRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamRouter")
            .field("registry", &self.registry)
            .field("trap", &self.trap)
            .finish()
    }
}

impl Default for StreamRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamRouter {
    /// Create a router reporting failures to [`DefaultTrap`].
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the trap receiving sink failures.
    pub fn with_trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open `sink` and register it for events matching `filter`.
    ///
    /// # Errors
    ///
    /// Return an error, and leave the sink unregistered, if the router is closed or the sink fails
    /// to open.
    pub fn register(
        &self,
        sink: impl Into<Box<dyn Sink>>,
        filter: impl Into<TopicFilter>,
    ) -> Result<SinkId, Error> {
        let sink = sink.into();
        let filter = filter.into();

        let mut registry = self.registry();
        if registry.closed {
            return Err(Error::new(ErrorKind::Closed, "stream router is closed"));
        }

        sink.open()?;

        let id = SinkId(registry.next_id);
        registry.next_id += 1;
        log::debug!("registered {id} for {filter:?}");
        registry.registrations.push(Registration { id, filter, sink });
        Ok(id)
    }

    /// Build a sink from `options` and register it for the configured topic.
    pub fn register_options(&self, options: &SinkOptions) -> Result<SinkId, Error> {
        let sink = options.build()?;
        self.register(sink, options.topic.clone().unwrap_or_default())
    }

    /// Remove the sink registered as `id` and close it.
    ///
    /// # Errors
    ///
    /// Return an error if no sink is registered as `id`, or if closing the sink fails. The sink is
    /// removed in either case.
    pub fn unregister(&self, id: SinkId) -> Result<(), Error> {
        let registration = {
            let mut registry = self.registry();
            let position = registry
                .registrations
                .iter()
                .position(|registration| registration.id == id)
                .ok_or_else(|| {
                    Error::new(ErrorKind::NotFound, "sink is not registered").with_context("sink", id)
                })?;
            registry.registrations.remove(position)
        };
        registration.sink.close()
    }

    /// Deliver `event` to every sink whose filter matches its topic.
    ///
    /// A sink that panics is reported to the trap like a sink that fails. Return how many sinks
    /// handled the event successfully.
    pub fn dispatch(&self, event: &StreamEvent) -> usize {
        let registry = self.registry();
        let mut delivered = 0;
        for registration in &registry.registrations {
            if !registration.filter.matches(event.topic()) {
                continue;
            }

            let result = panic::catch_unwind(AssertUnwindSafe(|| registration.sink.handle(event)))
                .unwrap_or_else(|payload| Err(panicked(payload.as_ref())));
            match result {
                Ok(()) => delivered += 1,
                Err(err) => {
                    let err = Error::new(err.kind(), "failed to handle stream event")
                        .with_context("sink", registration.id)
                        .with_context("topic", event.topic())
                        .with_source(err);
                    self.trap.trap(&err);
                }
            }
        }
        delivered
    }

    /// Close every sink in registration order and refuse later registrations.
    ///
    /// Failures are reported to the trap; every sink is closed regardless.
    pub fn close(&self) {
        let registrations = {
            let mut registry = self.registry();
            registry.closed = true;
            std::mem::take(&mut registry.registrations)
        };

        for registration in registrations {
            if let Err(err) = registration.sink.close() {
                let err = Error::new(err.kind(), "failed to close sink")
                    .with_context("sink", registration.id)
                    .with_source(err);
                self.trap.trap(&err);
            }
        }
    }

    /// The number of registered sinks.
    pub fn len(&self) -> usize {
        self.registry().registrations.len()
    }

    /// Whether no sink is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panicked(payload: &(dyn Any + Send)) -> Error {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    Error::new(ErrorKind::Io, "sink panicked").with_context("panic", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CollectingTrap;
    use crate::testing::Recording;

    #[derive(Debug)]
    struct Failing;

    impl Sink for Failing {
        fn handle(&self, _: &StreamEvent) -> Result<(), Error> {
            Err(Error::new(ErrorKind::Io, "broken pipe"))
        }
    }

    #[derive(Debug)]
    struct Unopenable;

    impl Sink for Unopenable {
        fn open(&self) -> Result<(), Error> {
            Err(Error::config("missing option `filename`"))
        }

        fn handle(&self, _: &StreamEvent) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn test_failing_sink_is_isolated() {
        let trap = CollectingTrap::default();
        let router = StreamRouter::new().with_trap(trap.clone());
        let first = Recording::default();
        let third = Recording::default();

        router.register(first.clone(), TopicFilter::All).unwrap();
        let failing = router.register(Failing, TopicFilter::All).unwrap();
        router.register(third.clone(), TopicFilter::All).unwrap();

        let delivered = router.dispatch(&StreamEvent::new("stdout", "hello"));

        assert_eq!(delivered, 2);
        assert_eq!(first.payloads(), vec!["hello"]);
        assert_eq!(third.payloads(), vec!["hello"]);
        let errors = trap.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains(&format!("sink: {failing}")));
        assert!(errors[0].contains("topic: stdout"));
    }

    #[derive(Debug)]
    struct Panicking;

    impl Sink for Panicking {
        fn handle(&self, event: &StreamEvent) -> Result<(), Error> {
            panic!("cannot handle {}", event.payload());
        }
    }

    #[test]
    fn test_panicking_sink_is_isolated() {
        let trap = CollectingTrap::default();
        let router = StreamRouter::new().with_trap(trap.clone());
        let panicking = router.register(Panicking, TopicFilter::All).unwrap();
        let after = Recording::default();
        router.register(after.clone(), TopicFilter::All).unwrap();

        assert_eq!(router.dispatch(&StreamEvent::new("stdout", "one")), 1);
        assert_eq!(router.dispatch(&StreamEvent::new("stdout", "two")), 1);

        assert_eq!(after.payloads(), vec!["one", "two"]);
        let errors = trap.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("failed to handle stream event (io)"));
        assert!(errors[0].contains(&format!("sink: {panicking}")));
        assert!(errors[0].contains("topic: stdout"));
        assert!(errors[0].contains("panic: cannot handle one"));
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_filters_select_sinks() {
        let router = StreamRouter::new();
        let all = Recording::default();
        let stderr = Recording::default();
        let both = Recording::default();

        router.register(all.clone(), TopicFilter::All).unwrap();
        router.register(stderr.clone(), "stderr").unwrap();
        router.register(both.clone(), ["stdout", "stderr"]).unwrap();

        router.dispatch(&StreamEvent::new("stdout", "1"));
        router.dispatch(&StreamEvent::new("stderr", "2"));
        router.dispatch(&StreamEvent::new("status", "3"));

        assert_eq!(all.payloads(), vec!["1", "2", "3"]);
        assert_eq!(stderr.payloads(), vec!["2"]);
        assert_eq!(both.payloads(), vec!["1", "2"]);
    }

    #[test]
    fn test_register_opens_and_rejects_unopenable_sinks() {
        let router = StreamRouter::new();
        let recording = Recording::default();
        router.register(recording.clone(), TopicFilter::All).unwrap();
        assert_eq!(recording.opened(), 1);

        let err = router.register(Unopenable, TopicFilter::All).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_unregister_closes_sink() {
        let router = StreamRouter::new();
        let recording = Recording::default();
        let id = router.register(recording.clone(), TopicFilter::All).unwrap();

        router.unregister(id).unwrap();
        assert_eq!(recording.closed(), 1);
        assert!(router.is_empty());
        assert_eq!(router.dispatch(&StreamEvent::new("stdout", "x")), 0);

        let err = router.unregister(id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_close_closes_every_sink_once() {
        let router = StreamRouter::new();
        let first = Recording::default();
        let second = Recording::default();
        router.register(first.clone(), TopicFilter::All).unwrap();
        router.register(second.clone(), TopicFilter::All).unwrap();

        router.close();
        router.close();

        assert_eq!(first.closed(), 1);
        assert_eq!(second.closed(), 1);
        assert_eq!(router.dispatch(&StreamEvent::new("stdout", "late")), 0);
        let err = router.register(Recording::default(), TopicFilter::All).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Closed);
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let router = StreamRouter::new();
        let a = router.register(Recording::default(), "a").unwrap();
        let b = router.register(Recording::default(), "b").unwrap();
        assert!(a < b);
        assert_eq!(a.to_string(), "sink:0");
        assert_eq!(b.as_u64(), 1);
    }
}

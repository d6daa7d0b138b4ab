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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;

use crate::Error;
use crate::ErrorKind;
use crate::StreamEvent;
use crate::sink::Sink;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// A builder for configuring a [`Buffered`] sink.
#[derive(Debug)]
pub struct BufferedBuilder {
    thread_name: String,
    trap: Box<dyn Trap>,
}

impl BufferedBuilder {
    /// Create a new buffered sink builder.
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the trap receiving failures of the wrapped sink.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Wrap `sink`, spawning the thread that drains the queue into it.
    ///
    /// # Errors
    ///
    /// Return an error if the thread cannot be spawned.
    pub fn build(self, sink: impl Into<Box<dyn Sink>>) -> Result<Buffered, Error> {
        let BufferedBuilder { thread_name, trap } = self;
        let sink: Box<dyn Sink> = sink.into();
        let sink: Arc<dyn Sink> = Arc::from(sink);

        let (sender, receiver) = crossbeam_channel::unbounded();
        let worker = Worker {
            receiver,
            sink: sink.clone(),
            trap,
        };
        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker.run())
            .map_err(|err| {
                Error::io("failed to spawn buffered sink thread", err)
                    .with_context("thread", thread_name)
            })?;

        Ok(Buffered {
            sink,
            state: Mutex::new(Some(State { sender, handle })),
        })
    }
}

/// A sink that queues events and hands them to the wrapped sink on a dedicated thread.
///
/// [`Sink::handle`] never blocks on the wrapped sink. Events reach it in the order they were
/// queued. [`Sink::close`] drains the queue before closing the wrapped sink.
///
/// # Examples
///
/// ```
/// use streamforth::StreamEvent;
/// use streamforth::sink::BufferedBuilder;
/// use streamforth::sink::Passthrough;
/// use streamforth::sink::Sink;
///
/// let sink = BufferedBuilder::new("stdout-mirror")
///     .build(Passthrough::default())
///     .unwrap();
/// sink.handle(&StreamEvent::new("stdout", "hello\n")).unwrap();
/// sink.close().unwrap();
/// ```
#[derive(Debug)]
pub struct Buffered {
    sink: Arc<dyn Sink>,
    state: Mutex<Option<State>>,
}

#[derive(Debug)]
struct State {
    sender: Sender<StreamEvent>,
    handle: JoinHandle<()>,
}

impl Buffered {
    fn state(&self) -> MutexGuard<'_, Option<State>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stop accepting events and wait until every queued event reached the wrapped sink.
    ///
    /// Return whether this call did the draining.
    fn drain(&self) -> bool {
        let Some(State { sender, handle }) = self.state().take() else {
            return false;
        };

        // the worker exits once the queue is empty and no sender remains
        drop(sender);
        if handle.join().is_err() {
            let err = Error::new(ErrorKind::Io, "buffered sink thread panicked");
            DefaultTrap::default().trap(&err);
        }
        true
    }
}

impl Sink for Buffered {
    fn open(&self) -> Result<(), Error> {
        self.sink.open()
    }

    fn handle(&self, event: &StreamEvent) -> Result<(), Error> {
        let state = self.state();
        let Some(state) = state.as_ref() else {
            return Err(Error::new(ErrorKind::Closed, "buffered sink is closed"));
        };
        state
            .sender
            .send(event.clone())
            .map_err(|_| Error::new(ErrorKind::Closed, "buffered sink worker has stopped"))
    }

    fn close(&self) -> Result<(), Error> {
        if self.drain() {
            self.sink.close()
        } else {
            Ok(())
        }
    }
}

impl Drop for Buffered {
    fn drop(&mut self) {
        if self.drain() {
            if let Err(err) = self.sink.close() {
                DefaultTrap::default().trap(&err);
            }
        }
    }
}

struct Worker {
    receiver: Receiver<StreamEvent>,
    sink: Arc<dyn Sink>,
    trap: Box<dyn Trap>,
}

impl Worker {
    fn run(self) {
        let Self {
            receiver,
            sink,
            trap,
        } = self;

        while let Ok(event) = receiver.recv() {
            if let Err(err) = sink.handle(&event) {
                let err = Error::new(err.kind(), "failed to handle buffered event")
                    .with_context("topic", event.topic())
                    .with_source(err);
                trap.trap(&err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::testing::CollectingTrap;
    use crate::testing::Recording;

    #[derive(Debug, Default)]
    struct Slow {
        recording: Recording,
    }

    impl Sink for Slow {
        fn handle(&self, event: &StreamEvent) -> Result<(), Error> {
            std::thread::sleep(Duration::from_millis(2));
            self.recording.handle(event)
        }

        fn close(&self) -> Result<(), Error> {
            self.recording.close()
        }
    }

    #[test]
    fn test_close_drains_in_order() {
        let recording = Recording::default();
        let sink = BufferedBuilder::new("test-buffered")
            .build(Slow {
                recording: recording.clone(),
            })
            .unwrap();

        let payloads = (0..50).map(|i| i.to_string()).collect::<Vec<_>>();
        for payload in &payloads {
            sink.handle(&StreamEvent::new("stdout", payload.as_str())).unwrap();
        }
        sink.close().unwrap();

        assert_eq!(recording.payloads(), payloads);
        assert_eq!(recording.closed(), 1);
    }

    #[test]
    fn test_handle_after_close_is_refused() {
        let recording = Recording::default();
        let sink = BufferedBuilder::new("test-buffered")
            .build(recording.clone())
            .unwrap();

        sink.close().unwrap();
        sink.close().unwrap();
        let err = sink.handle(&StreamEvent::new("stdout", "late")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Closed);
        assert!(recording.events().is_empty());
        assert_eq!(recording.closed(), 1);
    }

    #[test]
    fn test_failures_go_to_trap() {
        #[derive(Debug, Default)]
        struct FailOdd(AtomicUsize);

        impl Sink for FailOdd {
            fn handle(&self, _: &StreamEvent) -> Result<(), Error> {
                if self.0.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
                    return Err(Error::new(ErrorKind::Io, "disk full"));
                }
                Ok(())
            }
        }

        let trap = CollectingTrap::default();
        let sink = BufferedBuilder::new("test-buffered")
            .trap(trap.clone())
            .build(FailOdd::default())
            .unwrap();
        for _ in 0..4 {
            sink.handle(&StreamEvent::new("stderr", "x")).unwrap();
        }
        sink.close().unwrap();

        let errors = trap.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("failed to handle buffered event"));
        assert!(errors[0].contains("topic: stderr"));
    }

    #[test]
    fn test_drop_drains_queue() {
        let recording = Recording::default();
        let sink = BufferedBuilder::new("test-buffered")
            .build(recording.clone())
            .unwrap();
        sink.handle(&StreamEvent::new("stdout", "a")).unwrap();
        sink.handle(&StreamEvent::new("stdout", "b")).unwrap();
        drop(sink);

        assert_eq!(recording.payloads(), vec!["a", "b"]);
        assert_eq!(recording.closed(), 1);
    }
}

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

//! In-memory sinks and writers for capturing output in tests.

use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::StreamEvent;
use crate::sink::Sink;
use crate::trap::Trap;

/// A cloneable in-memory writer. Clones share the same bytes.
///
/// # Examples
///
/// ```
/// use streamforth::sink::Target;
/// use streamforth::testing::SharedBuffer;
///
/// let buffer = SharedBuffer::default();
/// let target = Target::writer(buffer.clone());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    fn bytes(&self) -> MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink that remembers every event it handled and how it was driven.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct Recording {
    state: Arc<Mutex<RecordingState>>,
}

#[derive(Debug, Default)]
struct RecordingState {
    events: Vec<StreamEvent>,
    opened: usize,
    closed: usize,
}

impl Recording {
    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the events handled so far, in order.
    pub fn events(&self) -> Vec<StreamEvent> {
        self.state().events.clone()
    }

    /// Return the payloads handled so far, in order.
    pub fn payloads(&self) -> Vec<String> {
        self.state()
            .events
            .iter()
            .map(|event| event.payload().to_string())
            .collect()
    }

    /// How many times [`Sink::open`] was called.
    pub fn opened(&self) -> usize {
        self.state().opened
    }

    /// How many times [`Sink::close`] was called.
    pub fn closed(&self) -> usize {
        self.state().closed
    }
}

impl Sink for Recording {
    fn open(&self) -> Result<(), Error> {
        self.state().opened += 1;
        Ok(())
    }

    fn handle(&self, event: &StreamEvent) -> Result<(), Error> {
        self.state().events.push(event.clone());
        Ok(())
    }

    fn close(&self) -> Result<(), Error> {
        self.state().closed += 1;
        Ok(())
    }
}

/// A trap that keeps the messages of every reported error.
///
/// Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct CollectingTrap {
    errors: Arc<Mutex<Vec<String>>>,
}

impl CollectingTrap {
    /// Return the rendered errors reported so far.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Trap for CollectingTrap {
    fn trap(&self, err: &Error) {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(err.to_string());
    }
}

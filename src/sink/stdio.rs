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
use std::io;
use std::io::Write;
use std::sync::Mutex;

use crate::Error;
use crate::StreamEvent;
use crate::sink::Sink;

/// Where a terminal sink writes to.
#[derive(Default)]
pub enum Target {
    /// The daemon's standard output.
    #[default]
    Stdout,
    /// The daemon's standard error.
    Stderr,
    /// Any other writer, e.g. an in-memory buffer.
    Writer(Mutex<Box<dyn Write + Send>>),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Stdout => f.write_str("Stdout"),
            Target::Stderr => f.write_str("Stderr"),
            Target::Writer(_) => f.write_str("Writer"),
        }
    }
}

impl Target {
    /// Create a target writing to `writer`.
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Target::Writer(Mutex::new(Box::new(writer)))
    }

    /// Write all of `bytes` and flush before returning.
    pub(crate) fn write_and_flush(&self, bytes: &[u8]) -> io::Result<()> {
        match self {
            Target::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(bytes)?;
                out.flush()
            }
            Target::Stderr => {
                let mut out = io::stderr().lock();
                out.write_all(bytes)?;
                out.flush()
            }
            Target::Writer(writer) => {
                let mut writer = writer.lock().unwrap_or_else(|e| e.into_inner());
                writer.write_all(bytes)?;
                writer.flush()
            }
        }
    }

    pub(crate) fn flush(&self) -> io::Result<()> {
        match self {
            Target::Stdout => io::stdout().flush(),
            Target::Stderr => io::stderr().flush(),
            Target::Writer(writer) => writer.lock().unwrap_or_else(|e| e.into_inner()).flush(),
        }
    }
}

/// A sink that mirrors raw payloads to the daemon's stdout.
///
/// # Examples
///
/// ```
/// use streamforth::sink::Passthrough;
///
/// let sink = Passthrough::default();
/// ```
#[derive(Debug, Default)]
pub struct Passthrough {
    target: Target,
}

impl Passthrough {
    /// Set the target this sink writes to.
    ///
    /// Default to [`Target::Stdout`].
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }
}

impl Sink for Passthrough {
    fn handle(&self, event: &StreamEvent) -> Result<(), Error> {
        self.target
            .write_and_flush(event.payload().as_bytes())
            .map_err(|err| Error::io("failed to mirror payload", err))
    }

    fn close(&self) -> Result<(), Error> {
        self.target.flush().map_err(Error::from_io_error)
    }
}

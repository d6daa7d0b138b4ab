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

//! Traps receive sink failures that must not interrupt event delivery.

use std::fmt;
use std::io;
use std::io::Write;
use std::sync::Arc;

use colored::Colorize;

use crate::Error;

/// A trap receives errors raised by sinks while handling events.
///
/// The router and the buffered sink report isolated failures here and keep delivering events to
/// the remaining sinks.
pub trait Trap: fmt::Debug + Send + Sync + 'static {
    /// Report an error.
    fn trap(&self, err: &Error);
}

impl<T: Trap> From<T> for Box<dyn Trap> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

impl<T: Trap + ?Sized> Trap for Arc<T> {
    fn trap(&self, err: &Error) {
        (**self).trap(err)
    }
}

/// A default trap that sends errors to standard error if possible.
///
/// If standard error is not available, it does nothing.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct DefaultTrap {}

impl Trap for DefaultTrap {
    fn trap(&self, err: &Error) {
        let _ = writeln!(io::stderr(), "{} {err}", "[streamforth]".red());
    }
}

/// A trap that forwards errors to the [`log`] facade at error level.
///
/// Use this when the daemon already has a logger installed and sink failures should land in its
/// own diagnostic channel.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct LogTrap {}

impl Trap for LogTrap {
    fn trap(&self, err: &Error) {
        log::error!(target: "streamforth", "{err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::testing::CollectingTrap;

    #[test]
    fn test_shared_trap_sees_errors() {
        let collecting = Arc::new(CollectingTrap::default());
        let trap: Box<dyn Trap> = collecting.clone().into();

        trap.trap(&Error::new(ErrorKind::Io, "disk full").with_context("sink", "sink:3"));
        DefaultTrap::default().trap(&Error::config("ignored by the collector"));
        LogTrap::default().trap(&Error::config("ignored by the collector"));

        assert_eq!(
            collecting.errors(),
            vec!["disk full (io), context: { sink: sink:3 }"]
        );
    }
}

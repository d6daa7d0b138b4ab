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

//! Sinks consuming stream events.

use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::StreamEvent;

mod buffered;
mod colorized;
mod republish;
pub mod rolling_file;
mod stdio;

pub use self::buffered::Buffered;
pub use self::buffered::BufferedBuilder;
pub use self::colorized::Colorized;
pub use self::colorized::ColorizedBuilder;
pub use self::colorized::TermColor;
pub use self::republish::Notifier;
pub use self::republish::Republish;
pub use self::rolling_file::RollingFile;
pub use self::rolling_file::RollingFileBuilder;
pub use self::stdio::Passthrough;
pub use self::stdio::Target;

/// A sink consumes stream events, durably or visibly.
///
/// A sink is opened once, handles zero or more events and is closed exactly once. It is never
/// reopened after [`Sink::close`].
pub trait Sink: fmt::Debug + Send + Sync + 'static {
    /// Acquire the resources the sink writes to.
    ///
    /// Default to a no-op.
    fn open(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Consume one event.
    fn handle(&self, event: &StreamEvent) -> Result<(), Error>;

    /// Flush and release the resources the sink writes to.
    ///
    /// Default to a no-op.
    fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Sink> From<T> for Box<dyn Sink> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn open(&self) -> Result<(), Error> {
        (**self).open()
    }

    fn handle(&self, event: &StreamEvent) -> Result<(), Error> {
        (**self).handle(event)
    }

    fn close(&self) -> Result<(), Error> {
        (**self).close()
    }
}

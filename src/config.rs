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

//! Typed option sets describing a sink.
//!
//! Loading the option set is left to the embedder. With the `serde` feature enabled,
//! [`SinkOptions`] deserializes from any serde format:
//!
//! ```json
//! { "class": "file", "filename": "app.log", "max_bytes": 1048576, "backup_count": 5 }
//! ```

use std::fmt;
use std::path::PathBuf;

use crate::Error;
use crate::TopicFilter;
use crate::sink::BufferedBuilder;
use crate::sink::ColorizedBuilder;
use crate::sink::Passthrough;
use crate::sink::RollingFileBuilder;
use crate::sink::Sink;

/// The kind of sink an option set describes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SinkClass {
    /// Mirror payloads to stdout as they are.
    #[default]
    Stdout,
    /// Append records to a rotating file.
    File,
    /// Render colorized, timestamped lines to stdout.
    Fancy,
}

impl fmt::Display for SinkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SinkClass::Stdout => "stdout",
            SinkClass::File => "file",
            SinkClass::Fancy => "fancy",
        };
        f.write_str(name)
    }
}

/// Options describing one sink and the topics it receives.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SinkOptions {
    /// The kind of sink to build.
    pub class: SinkClass,
    /// Base path of a `file` sink. Required for that class.
    pub filename: Option<PathBuf>,
    /// Rotation threshold of a `file` sink; 0 never rotates.
    pub max_bytes: u64,
    /// Rotated files a `file` sink keeps; 0 discards the content on rotation.
    pub backup_count: usize,
    /// Topics delivered to the sink; absent means every topic.
    pub topic: Option<TopicFilter>,
    /// Color name of a `fancy` sink; a random color is drawn if absent or unknown.
    pub color: Option<String>,
    /// strftime pattern of a `fancy` sink's timestamps.
    pub time_format: Option<String>,
    /// Hand events to the sink on a dedicated thread.
    pub buffered: bool,
}

impl SinkOptions {
    /// Options for a sink of `class` with every other option left at its default.
    pub fn new(class: SinkClass) -> Self {
        Self {
            class,
            ..Default::default()
        }
    }

    /// Build the sink these options describe.
    ///
    /// The topic filter is not applied by the sink itself; pass [`SinkOptions::topic`] to the
    /// router, as [`crate::StreamRouter::register_options`] does.
    ///
    /// # Errors
    ///
    /// Return a [`crate::ErrorKind::Config`] error if a required option is missing or invalid.
    pub fn build(&self) -> Result<Box<dyn Sink>, Error> {
        let sink: Box<dyn Sink> = match self.class {
            SinkClass::Stdout => Passthrough::default().into(),
            SinkClass::File => {
                let filename = self.filename.as_ref().ok_or_else(|| {
                    Error::config("missing option `filename` for rolling file sink")
                })?;
                RollingFileBuilder::new(filename.clone())
                    .max_bytes(self.max_bytes)
                    .backup_count(self.backup_count)
                    .build()?
                    .into()
            }
            SinkClass::Fancy => {
                let mut builder = ColorizedBuilder::new();
                if let Some(color) = self.color.as_deref() {
                    builder = builder.color_name(color);
                }
                if let Some(time_format) = self.time_format.as_deref() {
                    builder = builder.time_format(time_format);
                }
                builder.build()?.into()
            }
        };

        if !self.buffered {
            return Ok(sink);
        }

        let buffered = BufferedBuilder::new(format!("streamforth-{}", self.class)).build(sink)?;
        Ok(buffered.into())
    }
}

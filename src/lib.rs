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

//! Streamforth routes the output of supervised processes to sinks.
//!
//! # Overview
//!
//! A process supervisor hands every chunk a child writes to stdout or stderr to a
//! [`StreamRouter`] as a [`StreamEvent`]. The router fans the event out to each registered
//! [`Sink`] whose [`TopicFilter`] matches the event's topic: a stdout mirror, a rotating log file,
//! a colorized terminal renderer or a republish channel. A failing sink is reported to a
//! [`trap::Trap`] and never keeps the event from the other sinks.
//!
//! # Examples
//!
//! Mirror stdout and keep every stream in a rotating file:
//!
//! ```
//! use streamforth::StreamEvent;
//! use streamforth::StreamRouter;
//! use streamforth::TopicFilter;
//! use streamforth::sink::Passthrough;
//! use streamforth::sink::RollingFileBuilder;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let file = RollingFileBuilder::new(dir.path().join("app.log"))
//!     .max_bytes(1024 * 1024)
//!     .backup_count(5)
//!     .build()
//!     .unwrap();
//!
//! let router = StreamRouter::new();
//! router.register(Passthrough::default(), "stdout").unwrap();
//! router.register(file, TopicFilter::All).unwrap();
//!
//! router.dispatch(&StreamEvent::new("stdout", "listening on :8080\n").with_pid(42));
//! router.dispatch(&StreamEvent::new("stderr", "deprecated flag\n").with_pid(42));
//! router.close();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod clock;
pub mod config;
pub mod filter;
pub mod router;
pub mod sink;
pub mod testing;
pub mod trap;

mod error;
mod event;

pub use self::config::SinkOptions;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::event::StreamEvent;
pub use self::filter::TopicFilter;
pub use self::router::SinkId;
pub use self::router::StreamRouter;
pub use self::sink::Sink;

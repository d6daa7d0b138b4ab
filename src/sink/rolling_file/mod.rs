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

//! Sink for writing stream events to a size-bounded log file with numbered backups.
//!
//! # Example
//!
//! ```
//! use streamforth::StreamEvent;
//! use streamforth::sink::RollingFileBuilder;
//! use streamforth::sink::Sink;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let sink = RollingFileBuilder::new(dir.path().join("app.log"))
//!     .max_bytes(1024 * 1024)
//!     .backup_count(5)
//!     .topic("stdout")
//!     .build()
//!     .unwrap();
//!
//! sink.handle(&StreamEvent::new("stdout", "hello\n")).unwrap();
//! sink.close().unwrap();
//! ```

pub use append::RollingFile;
pub use append::RollingFileBuilder;
pub use chain::BackupChain;
pub use policy::RotationPolicy;

mod append;
mod chain;
mod policy;
mod rolling;

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

/// Decides when a log file rolls over.
///
/// The check happens before a record is written: the file rolls over as soon as appending the
/// record would make it reach `max_bytes`. A single record larger than the bound is still written
/// whole, so the bound is a soft cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationPolicy {
    max_bytes: u64,
}

impl RotationPolicy {
    /// Roll over once a file would reach `max_bytes`. Zero disables rotation.
    pub const fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Never roll over.
    pub const fn never() -> Self {
        Self { max_bytes: 0 }
    }

    /// The configured threshold, zero when rotation is disabled.
    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Whether this policy ever rolls over.
    pub const fn is_enabled(&self) -> bool {
        self.max_bytes > 0
    }

    /// Whether a file holding `current_size` bytes must roll over before `incoming` more bytes are
    /// appended.
    pub fn should_rotate(&self, current_size: u64, incoming: u64) -> bool {
        self.is_enabled() && current_size.saturating_add(incoming) >= self.max_bytes
    }
}

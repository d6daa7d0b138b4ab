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

//! Topic filters deciding which sinks see an event.

use std::collections::BTreeSet;

/// Selects events by topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopicFilter {
    /// Every topic matches.
    #[default]
    All,
    /// Only the given topic matches.
    One(String),
    /// Any topic in the set matches.
    Set(BTreeSet<String>),
}

impl TopicFilter {
    /// Create a filter matching any of `topics`.
    pub fn any_of<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TopicFilter::Set(topics.into_iter().map(Into::into).collect())
    }

    /// Whether an event with `topic` passes this filter.
    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicFilter::All => true,
            TopicFilter::One(expected) => expected == topic,
            TopicFilter::Set(topics) => topics.contains(topic),
        }
    }
}

impl From<&str> for TopicFilter {
    fn from(topic: &str) -> Self {
        TopicFilter::One(topic.to_string())
    }
}

impl From<String> for TopicFilter {
    fn from(topic: String) -> Self {
        TopicFilter::One(topic)
    }
}

impl<S: Into<String>> From<Vec<S>> for TopicFilter {
    fn from(topics: Vec<S>) -> Self {
        TopicFilter::any_of(topics)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for TopicFilter {
    fn from(topics: [S; N]) -> Self {
        TopicFilter::any_of(topics)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for TopicFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Set(Vec<String>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(topic) => TopicFilter::One(topic),
            Repr::Set(topics) => TopicFilter::any_of(topics),
        })
    }
}

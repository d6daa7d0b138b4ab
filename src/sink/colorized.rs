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
use std::fmt::Write as _;
use std::str::FromStr;

use jiff::Zoned;
use rand::Rng;

use crate::Error;
use crate::StreamEvent;
use crate::clock::Clock;
use crate::sink::Sink;
use crate::sink::Target;

/// The default timestamp pattern of [`Colorized`].
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PID_PLACEHOLDER: &str = "-";
const RESET: &str = "\x1b[0m";

/// The terminal colors a [`Colorized`] sink can use.
///
/// The order is the order of the ANSI foreground codes: the numeric code of a color is its index
/// in [`TermColor::ALL`] plus one. Tooling reading the rendered output depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermColor {
    /// Code 1.
    Red,
    /// Code 2.
    Green,
    /// Code 3.
    Yellow,
    /// Code 4.
    Blue,
    /// Code 5.
    Magenta,
    /// Code 6.
    Cyan,
    /// Code 7.
    White,
}

impl TermColor {
    /// Every color, in code order.
    pub const ALL: [TermColor; 7] = [
        TermColor::Red,
        TermColor::Green,
        TermColor::Yellow,
        TermColor::Blue,
        TermColor::Magenta,
        TermColor::Cyan,
        TermColor::White,
    ];

    /// The numeric code used in the escape sequence.
    pub const fn code(self) -> u8 {
        self as u8 + 1
    }

    /// The lowercase name of this color.
    pub const fn name(self) -> &'static str {
        match self {
            TermColor::Red => "red",
            TermColor::Green => "green",
            TermColor::Yellow => "yellow",
            TermColor::Blue => "blue",
            TermColor::Magenta => "magenta",
            TermColor::Cyan => "cyan",
            TermColor::White => "white",
        }
    }

    /// Draw a color uniformly from [`TermColor::ALL`].
    pub fn random<R: Rng>(rng: &mut R) -> TermColor {
        TermColor::ALL[rng.random_range(0..TermColor::ALL.len())]
    }
}

impl fmt::Display for TermColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TermColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TermColor::ALL
            .into_iter()
            .find(|color| color.name() == s)
            .ok_or_else(|| Error::config("unknown terminal color").with_context("color", s))
    }
}

/// A builder to configure and create a [`Colorized`] sink.
#[derive(Debug, Default)]
pub struct ColorizedBuilder {
    color: Option<TermColor>,
    time_format: Option<String>,
    target: Target,
    clock: Clock,
    event_time: bool,
    no_color: bool,
}

impl ColorizedBuilder {
    /// Create a new builder writing to stdout with a random color.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the color of every rendered line.
    ///
    /// Default to a color drawn at random when the sink is built.
    pub fn color(mut self, color: TermColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the color by name. An unknown name keeps the random default.
    pub fn color_name(mut self, name: &str) -> Self {
        self.color = name.parse().ok();
        self
    }

    /// Set the strftime pattern of the timestamp.
    ///
    /// Default to [`DEFAULT_TIME_FORMAT`].
    pub fn time_format(mut self, time_format: impl Into<String>) -> Self {
        self.time_format = Some(time_format.into());
        self
    }

    /// Set the target lines are written to.
    ///
    /// Default to [`Target::Stdout`].
    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Set the clock stamping each event.
    ///
    /// Default to [`Clock::DefaultClock`].
    pub fn clock(mut self, clock: impl Into<Clock>) -> Self {
        self.clock = clock.into();
        self
    }

    /// Stamp lines with the time each event was received instead of the time it is rendered.
    ///
    /// The clock still supplies the time zone.
    pub fn event_time(mut self) -> Self {
        self.event_time = true;
        self
    }

    /// Render lines without escape sequences, for terminals that cannot show colors.
    pub fn no_color(mut self) -> Self {
        self.no_color = true;
        self
    }

    /// Build the [`Colorized`] sink, drawing a missing color from the thread-local generator.
    pub fn build(self) -> Result<Colorized, Error> {
        self.build_with_rng(&mut rand::rng())
    }

    /// Build the [`Colorized`] sink, drawing a missing color from `rng`.
    ///
    /// # Errors
    ///
    /// Return an error if the time format is not a valid strftime pattern.
    pub fn build_with_rng<R: Rng>(self, rng: &mut R) -> Result<Colorized, Error> {
        let ColorizedBuilder {
            color,
            time_format,
            target,
            clock,
            event_time,
            no_color,
        } = self;

        let color = color.unwrap_or_else(|| TermColor::random(rng));
        let time_format = time_format.unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string());
        format_time(&time_format, &clock.now())?;

        Ok(Colorized {
            color,
            time_format,
            target,
            clock,
            event_time,
            no_color,
        })
    }
}

/// A sink rendering each line of output with a color, a timestamp and the process id.
///
/// A line renders as `ESC[0;3<code>;40m<source> <time> [<pid>] | <line>ESC[0m`. The source is
/// left out when the event carries none, and a missing pid renders as `-`. Empty lines are
/// dropped, so a payload with or without a trailing line break renders the same lines.
///
/// # Examples
///
/// ```
/// use streamforth::sink::ColorizedBuilder;
/// use streamforth::sink::TermColor;
///
/// let sink = ColorizedBuilder::new()
///     .color(TermColor::Green)
///     .time_format("%H:%M:%S")
///     .build()
///     .unwrap();
/// assert_eq!(sink.color_code(), 2);
/// ```
#[derive(Debug)]
pub struct Colorized {
    color: TermColor,
    time_format: String,
    target: Target,
    clock: Clock,
    event_time: bool,
    no_color: bool,
}

impl Colorized {
    /// The color assigned to this sink.
    pub fn color(&self) -> TermColor {
        self.color
    }

    /// The numeric code of the color assigned to this sink.
    pub fn color_code(&self) -> u8 {
        self.color.code()
    }

    /// The strftime pattern of the timestamp.
    pub fn time_format(&self) -> &str {
        &self.time_format
    }

    /// Render `event` as it would be written, stamped with `now`.
    ///
    /// With [`ColorizedBuilder::event_time`], the event's reception time is rendered in the time
    /// zone of `now` instead.
    pub fn render(&self, event: &StreamEvent, now: &Zoned) -> Result<String, Error> {
        let time = if self.event_time {
            let received = event.received_at().to_zoned(now.time_zone().clone());
            format_time(&self.time_format, &received)?
        } else {
            format_time(&self.time_format, now)?
        };
        let pid = match event.pid() {
            Some(pid) => pid.to_string(),
            None => PID_PLACEHOLDER.to_string(),
        };

        let mut prefix = String::new();
        if !self.no_color {
            let _ = write!(prefix, "\x1b[0;3{};40m", self.color.code());
        }
        if let Some(source) = event.source() {
            prefix.push_str(source);
            prefix.push(' ');
        }
        let _ = write!(prefix, "{time} [{pid}] | ");

        let mut out = String::new();
        for line in split_lines(event.payload()) {
            out.push_str(&prefix);
            out.push_str(line);
            if !self.no_color {
                out.push_str(RESET);
            }
            out.push('\n');
        }
        Ok(out)
    }
}

impl Sink for Colorized {
    fn handle(&self, event: &StreamEvent) -> Result<(), Error> {
        let now = self.clock.now();
        let rendered = self.render(event, &now)?;
        self.target
            .write_and_flush(rendered.as_bytes())
            .map_err(|err| Error::io("failed to write colorized output", err))
    }

    fn close(&self) -> Result<(), Error> {
        self.target.flush().map_err(Error::from_io_error)
    }
}

fn split_lines(payload: &str) -> impl Iterator<Item = &str> {
    payload
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty())
}

fn format_time(time_format: &str, now: &Zoned) -> Result<String, Error> {
    jiff::fmt::strtime::format(time_format, now).map_err(|err| {
        Error::config("invalid time format")
            .with_context("time_format", time_format)
            .with_source(err)
    })
}

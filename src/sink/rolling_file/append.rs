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

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::StreamEvent;
use crate::TopicFilter;
use crate::sink::Sink;
use crate::sink::rolling_file::BackupChain;
use crate::sink::rolling_file::RotationPolicy;
use crate::sink::rolling_file::rolling::RollingFileWriter;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// A builder to configure and create a [`RollingFile`] sink.
#[derive(Debug)]
pub struct RollingFileBuilder {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    topic: TopicFilter,
}

impl RollingFileBuilder {
    /// Create a new builder for the log file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: 0,
            backup_count: 0,
            topic: TopicFilter::All,
        }
    }

    /// Roll the file over once it would reach `n` bytes.
    ///
    /// Default to 0, which lets the file grow unbounded.
    pub fn max_bytes(mut self, n: u64) -> Self {
        self.max_bytes = n;
        self
    }

    /// Keep `n` rotated files next to the base file.
    ///
    /// Default to 0, which discards the content on every rotation.
    pub fn backup_count(mut self, n: usize) -> Self {
        self.backup_count = n;
        self
    }

    /// Only write events matching `topic`.
    ///
    /// Default to [`TopicFilter::All`].
    pub fn topic(mut self, topic: impl Into<TopicFilter>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Build the [`RollingFile`] sink.
    ///
    /// The file is opened lazily, by [`Sink::open`] or by the first event.
    ///
    /// # Errors
    ///
    /// Return an error if the configured path is empty.
    pub fn build(self) -> Result<RollingFile, Error> {
        let RollingFileBuilder {
            path,
            max_bytes,
            backup_count,
            topic,
        } = self;

        if path.as_os_str().is_empty() {
            return Err(Error::config("missing option `filename` for rolling file sink"));
        }

        let chain = BackupChain::new(path, backup_count);
        let writer = RollingFileWriter::new(chain, RotationPolicy::new(max_bytes));
        Ok(RollingFile {
            topic,
            writer: Mutex::new(writer),
        })
    }
}

/// A sink that appends `<topic>: <payload>` records to a rotating log file.
///
/// Every record is flushed before [`Sink::handle`] returns.
#[derive(Debug)]
pub struct RollingFile {
    topic: TopicFilter,
    writer: Mutex<RollingFileWriter>,
}

impl RollingFile {
    fn writer(&self) -> MutexGuard<'_, RollingFileWriter> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The base path records are appended to.
    pub fn path(&self) -> PathBuf {
        self.writer().chain().base().to_path_buf()
    }

    /// Every path of the backup chain, newest first.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.writer().chain().paths()
    }

    /// Bytes written to the base file since it was opened or last rotated.
    pub fn current_size(&self) -> u64 {
        self.writer().current_size()
    }

    /// Roll the file over now, regardless of its size.
    pub fn rotate(&self) -> Result<(), Error> {
        self.writer().rotate()
    }
}

fn format_record(event: &StreamEvent) -> String {
    format!("{}: {}", event.topic(), event.payload())
}

impl Sink for RollingFile {
    fn open(&self) -> Result<(), Error> {
        self.writer().open()
    }

    fn handle(&self, event: &StreamEvent) -> Result<(), Error> {
        if !self.topic.matches(event.topic()) {
            return Ok(());
        }

        let record = format_record(event);
        let mut writer = self.writer();
        if writer.should_rotate(record.len() as u64)? {
            writer.rotate()?;
        }
        writer.append(record.as_bytes())
    }

    fn close(&self) -> Result<(), Error> {
        self.writer().close()
    }
}

impl Drop for RollingFile {
    fn drop(&mut self) {
        let writer = self.writer.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Err(err) = writer.close() {
            DefaultTrap::default().trap(&err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::ErrorKind;

    fn read(path: impl AsRef<Path>) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_build_requires_filename() {
        let err = RollingFileBuilder::new("").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_records_are_topic_prefixed() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let sink = RollingFileBuilder::new(temp_dir.path().join("app.log"))
            .build()
            .unwrap();

        sink.handle(&StreamEvent::new("stdout", "ready\n")).unwrap();
        sink.handle(&StreamEvent::new("stderr", "oops")).unwrap();

        assert_eq!(read(sink.path()), "stdout: ready\nstderr: oops");
    }

    #[test]
    fn test_topic_filter_skips_other_topics() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let sink = RollingFileBuilder::new(temp_dir.path().join("app.log"))
            .topic("stderr")
            .build()
            .unwrap();

        sink.handle(&StreamEvent::new("stdout", "skipped\n")).unwrap();
        sink.handle(&StreamEvent::new("stderr", "kept\n")).unwrap();

        assert_eq!(read(sink.path()), "stderr: kept\n");
    }

    #[test]
    fn test_rotation_happens_before_the_offending_write() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let sink = RollingFileBuilder::new(temp_dir.path().join("app.log"))
            .max_bytes(20)
            .backup_count(2)
            .build()
            .unwrap();

        for payload in ["a".repeat(15), "b".repeat(15), "c".repeat(15)] {
            sink.handle(&StreamEvent::new("t", payload)).unwrap();
        }

        let paths = sink.paths();
        assert_eq!(read(&paths[0]), format!("t: {}", "c".repeat(15)));
        assert_eq!(read(&paths[1]), format!("t: {}", "b".repeat(15)));
        assert_eq!(read(&paths[2]), format!("t: {}", "a".repeat(15)));
        assert_eq!(sink.current_size(), 18);
    }

    #[test]
    fn test_manual_rotation() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let sink = RollingFileBuilder::new(temp_dir.path().join("app.log"))
            .backup_count(1)
            .build()
            .unwrap();

        sink.handle(&StreamEvent::new("t", "first")).unwrap();
        sink.rotate().unwrap();
        sink.handle(&StreamEvent::new("t", "second")).unwrap();

        let paths = sink.paths();
        assert_eq!(read(&paths[0]), "t: second");
        assert_eq!(read(&paths[1]), "t: first");
    }

    #[test]
    fn test_drop_closes_the_file() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        let sink = RollingFileBuilder::new(&path).build().unwrap();
        sink.handle(&StreamEvent::new("t", "kept\n")).unwrap();
        drop(sink);

        assert_eq!(read(&path), "t: kept\n");
        fs::remove_file(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_handle_after_close_fails() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let sink = RollingFileBuilder::new(temp_dir.path().join("app.log"))
            .build()
            .unwrap();

        sink.open().unwrap();
        sink.close().unwrap();
        let err = sink.handle(&StreamEvent::new("t", "late")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Closed);
    }
}

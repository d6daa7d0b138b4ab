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

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;

use crate::Error;
use crate::ErrorKind;
use crate::sink::rolling_file::BackupChain;
use crate::sink::rolling_file::RotationPolicy;

/// A size-bounded log file with a chain of numbered backups.
#[derive(Debug)]
pub(crate) struct RollingFileWriter {
    chain: BackupChain,
    policy: RotationPolicy,
    file: Option<File>,
    current_size: u64,
    closed: bool,
}

impl RollingFileWriter {
    pub(crate) fn new(chain: BackupChain, policy: RotationPolicy) -> Self {
        Self {
            chain,
            policy,
            file: None,
            current_size: 0,
            closed: false,
        }
    }

    pub(crate) fn chain(&self) -> &BackupChain {
        &self.chain
    }

    pub(crate) fn current_size(&self) -> u64 {
        self.current_size
    }

    #[cfg(test)]
    pub(crate) fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Open the base file for appending, creating it if absent. Existing content is kept.
    pub(crate) fn open(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::new(ErrorKind::Closed, "log file sink is closed")
                .with_context("path", self.chain.base().display()));
        }
        if self.file.is_some() {
            return Ok(());
        }

        let path = self.chain.base();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| {
                Error::io("failed to create log directory", err).with_context("path", dir.display())
            })?;
        }

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|err| {
                Error::io("failed to open log file", err).with_context("path", path.display())
            })?;
        self.current_size = file.seek(SeekFrom::End(0)).map_err(|err| {
            Error::io("failed to seek log file", err).with_context("path", path.display())
        })?;
        self.file = Some(file);
        Ok(())
    }

    /// Whether the file must roll over before `incoming` more bytes are appended.
    ///
    /// Opens the file first if needed, and measures it again so a file truncated or replaced from
    /// outside is accounted for.
    pub(crate) fn should_rotate(&mut self, incoming: u64) -> Result<bool, Error> {
        self.open()?;
        if !self.policy.is_enabled() {
            return Ok(false);
        }

        if let Some(file) = self.file.as_mut() {
            self.current_size = file.seek(SeekFrom::End(0)).map_err(|err| {
                Error::io("failed to seek log file", err)
                    .with_context("path", self.chain.base().display())
            })?;
        }
        Ok(self.policy.should_rotate(self.current_size, incoming))
    }

    /// Close the base file, shift the backup chain and start a fresh base file.
    ///
    /// Without backups the base file is truncated and its content is lost.
    pub(crate) fn rotate(&mut self) -> Result<(), Error> {
        if self.closed {
            return Err(Error::new(ErrorKind::Closed, "log file sink is closed")
                .with_context("path", self.chain.base().display()));
        }

        log::debug!(
            "rotating {} at {} bytes (max_bytes = {})",
            self.chain.base().display(),
            self.current_size,
            self.policy.max_bytes()
        );

        // rename and remove must never race an open handle
        self.close_file()?;

        if self.chain.backup_count() > 0 {
            self.chain.shift()?;
        } else {
            let path = self.chain.base();
            File::create(path).map_err(|err| {
                Error::io("failed to truncate log file", err).with_context("path", path.display())
            })?;
        }

        self.open()
    }

    /// Append `bytes` as one record and flush before returning.
    pub(crate) fn append(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.open()?;
        let path = self.chain.base();
        let Some(file) = self.file.as_mut() else {
            return Err(Error::new(ErrorKind::Io, "log file is not open")
                .with_context("path", path.display()));
        };

        file.write_all(bytes).map_err(|err| {
            Error::io("failed to write log file", err).with_context("path", path.display())
        })?;
        file.flush().map_err(|err| {
            Error::io("failed to flush log file", err).with_context("path", path.display())
        })?;
        self.current_size += bytes.len() as u64;
        Ok(())
    }

    /// Flush and close the file. Later writes are refused.
    pub(crate) fn close(&mut self) -> Result<(), Error> {
        self.closed = true;
        self.close_file()
    }

    fn close_file(&mut self) -> Result<(), Error> {
        self.current_size = 0;
        match self.file.take() {
            Some(mut file) => file.flush().map_err(|err| {
                Error::io("failed to flush log file", err)
                    .with_context("path", self.chain.base().display())
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn writer(temp_dir: &TempDir, max_bytes: u64, backup_count: usize) -> RollingFileWriter {
        let chain = BackupChain::new(temp_dir.path().join("app.log"), backup_count);
        RollingFileWriter::new(chain, RotationPolicy::new(max_bytes))
    }

    #[test]
    fn test_open_keeps_existing_content() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        fs::write(&path, "previous run\n").unwrap();

        let mut writer = writer(&temp_dir, 0, 0);
        writer.open().unwrap();
        writer.open().unwrap();
        assert_eq!(writer.current_size(), 13);

        writer.append(b"next run\n").unwrap();
        assert_eq!(writer.current_size(), 22);
        assert_eq!(fs::read_to_string(&path).unwrap(), "previous run\nnext run\n");
    }

    #[test]
    fn test_open_creates_missing_directories() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let chain = BackupChain::new(temp_dir.path().join("nested/logs/app.log"), 1);
        let mut writer = RollingFileWriter::new(chain, RotationPolicy::never());
        writer.open().unwrap();
        assert!(temp_dir.path().join("nested/logs/app.log").is_file());
    }

    #[test]
    fn test_should_rotate_opens_lazily() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        fs::write(temp_dir.path().join("app.log"), "0123456789").unwrap();

        let mut writer = writer(&temp_dir, 16, 1);
        assert!(!writer.is_open());
        assert!(!writer.should_rotate(5).unwrap());
        assert!(writer.is_open());
        assert!(writer.should_rotate(6).unwrap());
    }

    #[test]
    fn test_size_is_measured_again_after_external_truncation() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let mut writer = writer(&temp_dir, 16, 1);
        writer.append(b"0123456789").unwrap();
        assert!(writer.should_rotate(6).unwrap());

        fs::OpenOptions::new()
            .write(true)
            .open(temp_dir.path().join("app.log"))
            .unwrap()
            .set_len(0)
            .unwrap();
        assert!(!writer.should_rotate(6).unwrap());
        assert_eq!(writer.current_size(), 0);
    }

    #[test]
    fn test_rotate_without_backups_truncates() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let mut writer = writer(&temp_dir, 8, 0);
        writer.append(b"discarded").unwrap();
        writer.rotate().unwrap();
        writer.append(b"kept").unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("app.log")).unwrap(),
            "kept"
        );
        assert!(!temp_dir.path().join("app.log.1").exists());
    }

    #[test]
    fn test_rotate_before_first_write() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let mut writer = writer(&temp_dir, 8, 2);
        writer.rotate().unwrap();
        assert!(writer.is_open());
        assert_eq!(writer.current_size(), 0);
    }

    #[test]
    fn test_closed_writer_refuses_records() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let mut writer = writer(&temp_dir, 0, 0);
        writer.close().unwrap();
        writer.close().unwrap();

        let err = writer.append(b"late").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Closed);
        assert!(!temp_dir.path().join("app.log").exists());
    }
}

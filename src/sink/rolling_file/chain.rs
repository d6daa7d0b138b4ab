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
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::Error;

/// The numbered backups kept for a log file.
///
/// For a base path `app.log` and three backups the chain is `app.log`, `app.log.1`, `app.log.2`
/// and `app.log.3`. `app.log.1` always holds the most recently rotated content and the highest
/// suffix the oldest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupChain {
    base: PathBuf,
    backup_count: usize,
}

impl BackupChain {
    /// Create the chain of `backup_count` backups behind `base`.
    pub fn new(base: impl Into<PathBuf>, backup_count: usize) -> Self {
        Self {
            base: base.into(),
            backup_count,
        }
    }

    /// The path records are appended to.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// How many rotated files are retained.
    pub fn backup_count(&self) -> usize {
        self.backup_count
    }

    /// The path of the backup with the given suffix.
    pub fn backup(&self, index: usize) -> PathBuf {
        let mut name = self.base.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    /// Every path of the chain, newest first: the base file then each backup.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(self.backup_count + 1);
        paths.push(self.base.clone());
        paths.extend((1..=self.backup_count).map(|i| self.backup(i)));
        paths
    }

    /// Move every file one step down the chain, then the base file to the first backup.
    ///
    /// The oldest backup is overwritten. The base file must be closed by the caller.
    pub(crate) fn shift(&self) -> Result<(), Error> {
        if self.backup_count == 0 {
            return Ok(());
        }

        for i in (1..self.backup_count).rev() {
            let src = self.backup(i);
            if src.exists() {
                let dst = self.backup(i + 1);
                replace(&src, &dst)?;
            }
        }

        if self.base.exists() {
            replace(&self.base, &self.backup(1))?;
        }
        Ok(())
    }
}

fn replace(src: &Path, dst: &Path) -> Result<(), Error> {
    match fs::remove_file(dst) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(Error::io("failed to remove rotated log file", err)
                .with_context("path", dst.display()));
        }
    }

    log::debug!("log rotating {} -> {}", src.display(), dst.display());
    fs::rename(src, dst).map_err(|err| {
        Error::io("failed to rename log file", err)
            .with_context("from", src.display())
            .with_context("to", dst.display())
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_backup_paths() {
        let chain = BackupChain::new("/var/log/app.log", 2);
        assert_eq!(chain.backup(1), PathBuf::from("/var/log/app.log.1"));
        assert_eq!(
            chain.paths(),
            vec![
                PathBuf::from("/var/log/app.log"),
                PathBuf::from("/var/log/app.log.1"),
                PathBuf::from("/var/log/app.log.2"),
            ]
        );
    }

    #[test]
    fn test_shift_drops_the_oldest_backup() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let chain = BackupChain::new(temp_dir.path().join("app.log"), 2);
        fs::write(chain.base(), "current").unwrap();
        fs::write(chain.backup(1), "newer").unwrap();
        fs::write(chain.backup(2), "older").unwrap();

        chain.shift().unwrap();

        assert!(!chain.base().exists());
        assert_eq!(read(&chain.backup(1)), "current");
        assert_eq!(read(&chain.backup(2)), "newer");
        assert!(!chain.backup(3).exists());
    }

    #[test]
    fn test_shift_fills_gaps() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let chain = BackupChain::new(temp_dir.path().join("app.log"), 3);
        fs::write(chain.base(), "current").unwrap();
        fs::write(chain.backup(2), "older").unwrap();

        chain.shift().unwrap();

        assert_eq!(read(&chain.backup(1)), "current");
        assert!(!chain.backup(2).exists());
        assert_eq!(read(&chain.backup(3)), "older");
    }

    #[test]
    fn test_shift_without_base_file() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let chain = BackupChain::new(temp_dir.path().join("app.log"), 1);
        fs::write(chain.backup(1), "kept").unwrap();

        chain.shift().unwrap();

        assert_eq!(read(&chain.backup(1)), "kept");
    }
}

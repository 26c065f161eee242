// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fs::File,
          io::{self, ErrorKind, Read as _, Seek as _, SeekFrom},
          path::{Path, PathBuf}};

/// Tracks how far into a (possibly still growing) file we've read.
///
/// The file is reopened on every call, so a missing file just reads as empty until it
/// shows up, and a rotated file is picked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFollower {
    path: PathBuf,
    offset: u64,
}

impl FileFollower {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    #[must_use]
    pub fn offset(&self) -> u64 { self.offset }

    /// Returns the bytes appended since the last call.
    ///
    /// If the file shrank (truncated, `> app.log`), reading restarts at `0`.
    ///
    /// # Errors
    ///
    /// Returns the IO error for anything other than the file not existing yet.
    pub fn read_appended(&mut self) -> io::Result<Vec<u8>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(error) => return Err(error),
        };

        let len = file.metadata()?.len();
        if len < self.offset {
            tracing::debug!(
                message = "FileFollower: truncated",
                path = ?self.path,
                offset = self.offset,
                len
            );
            self.offset = 0;
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut acc = vec![];
        file.take(len - self.offset).read_to_end(&mut acc)?;
        self.offset += acc.len() as u64;
        Ok(acc)
    }
}

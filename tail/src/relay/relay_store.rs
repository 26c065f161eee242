// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The on-disk buffer that bridges piped bytes into the viewer child.

use crate::RelayError;
use std::{io::{self, Write as _},
          path::Path};
use tempfile::NamedTempFile;

/// A private, append-only byte sink backed by a uniquely named temp file.
///
/// - Created with [`tempfile`], so the file is `0600` and its name is never reused.
/// - Writes go straight to the [`File`] with no userspace buffering, so the child can
///   see every byte as soon as [`append()`] returns.
/// - Dropping this unlinks the file. Every exit path out of a piped session (normal
///   completion, error propagation with `?`, signal) unwinds through this drop.
///
/// There is no read API: the child opens [`path()`] on its own.
///
/// [`File`]: std::fs::File
/// [`append()`]: Self::append
/// [`path()`]: Self::path
#[derive(Debug)]
pub struct RelayStore {
    inner: NamedTempFile,
    bytes_written: u64,
}

impl RelayStore {
    /// Creates a fresh relay file named `{prefix}XXXXXX` in the system temp dir.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::RelayStoreCreation`] if the file can't be created. This is
    /// fatal, a piped session can't start without it.
    pub fn try_create(prefix: &str) -> miette::Result<Self> {
        let inner = tempfile::Builder::new()
            .prefix(prefix)
            .tempfile()
            .map_err(RelayError::RelayStoreCreation)?;

        tracing::debug!(
            message = "RelayStore::try_create",
            path = ?inner.path()
        );

        Ok(Self {
            inner,
            bytes_written: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path { self.inner.path() }

    /// Appends `bytes` at the end of the file.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error if the write fails (eg: disk full).
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.as_file_mut().write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Total bytes appended so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 { self.bytes_written }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_name_has_prefix() {
        let store = RelayStore::try_create("tl_").unwrap();
        let file_name = store.path().file_name().unwrap().to_string_lossy();
        assert!(file_name.starts_with("tl_"), "{file_name}");
        assert!(store.path().starts_with(std::env::temp_dir()));
    }

    #[test]
    fn test_paths_are_unique() {
        let first = RelayStore::try_create("tl_").unwrap();
        let second = RelayStore::try_create("tl_").unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_appends_are_visible_by_path_immediately() {
        let mut store = RelayStore::try_create("tl_").unwrap();
        store.append(b"line1\n").unwrap();
        assert_eq!(std::fs::read(store.path()).unwrap(), b"line1\n");

        store.append(b"line2\n").unwrap();
        assert_eq!(std::fs::read(store.path()).unwrap(), b"line1\nline2\n");
        assert_eq!(store.bytes_written(), 12);
    }

    #[test]
    fn test_empty_append_is_a_noop() {
        let mut store = RelayStore::try_create("tl_").unwrap();
        store.append(b"").unwrap();
        assert_eq!(store.bytes_written(), 0);
        assert_eq!(std::fs::read(store.path()).unwrap(), b"");
    }

    #[test]
    fn test_drop_removes_file() {
        let store = RelayStore::try_create("tl_").unwrap();
        let path = store.path().to_path_buf();
        assert!(path.exists());
        drop(store);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt as _;
        let store = RelayStore::try_create("tl_").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

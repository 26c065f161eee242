// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Reopens the controlling terminal for the viewer child, independent of the parent's
//! stdin (which is the pipe being drained).

use crate::RelayError;
use rustix::fd::{AsFd, BorrowedFd};
use std::{fs::File,
          io,
          path::Path,
          process::Stdio};

/// Read-only input handed to the viewer child as its stdin.
///
/// Owned by the parent for the whole session. The child gets its own duplicate via
/// [`try_clone_stdio()`], and the parent's copy is closed when this is dropped.
///
/// [`try_clone_stdio()`]: Self::try_clone_stdio
#[derive(Debug)]
pub enum TerminalHandle {
    /// The literal terminal device (`/dev/tty`).
    DevTty(File),
    /// Always-empty input, used when there is no controlling terminal (eg: cron jobs,
    /// CI, `setsid`). The child sees EOF on stdin instead of blocking or crashing.
    NullDevice(File),
}

impl AsFd for TerminalHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            TerminalHandle::DevTty(file) | TerminalHandle::NullDevice(file) => {
                file.as_fd()
            }
        }
    }
}

impl TerminalHandle {
    #[must_use]
    pub fn is_fallback(&self) -> bool { matches!(self, TerminalHandle::NullDevice(_)) }

    /// Duplicates the descriptor so it can be bound as a child's stdin.
    ///
    /// # Errors
    ///
    /// Returns the `dup()` error (eg: out of file descriptors).
    pub fn try_clone_stdio(&self) -> io::Result<Stdio> {
        let file = match self {
            TerminalHandle::DevTty(file) | TerminalHandle::NullDevice(file) => file,
        };
        Ok(Stdio::from(file.try_clone()?))
    }
}

/// Opens `tty_path` read-only. If that fails (no controlling terminal), opens
/// `null_device_path` instead. The fallback is logged but not surfaced to the user.
///
/// # Errors
///
/// Returns [`RelayError::NullDeviceOpen`] if neither can be opened.
pub fn reacquire_terminal(
    tty_path: &Path,
    null_device_path: &Path,
) -> miette::Result<TerminalHandle> {
    match File::open(tty_path) {
        Ok(file) => {
            tracing::debug!(message = "reacquire_terminal -> tty", ?tty_path);
            Ok(TerminalHandle::DevTty(file))
        }
        Err(error) => {
            tracing::debug!(
                message = "reacquire_terminal -> no tty, using null device",
                ?tty_path,
                ?null_device_path,
                ?error
            );
            let file = File::open(null_device_path).map_err(|source| {
                RelayError::NullDeviceOpen {
                    path: null_device_path.to_path_buf(),
                    source,
                }
            })?;
            Ok(TerminalHandle::NullDevice(file))
        }
    }
}

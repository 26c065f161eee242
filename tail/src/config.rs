// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{DEFAULT_NULL_DEVICE_PATH, DEFAULT_POLL_INTERVAL, DEFAULT_READ_CHUNK_SIZE,
            DEFAULT_RELAY_FILE_PREFIX, DEFAULT_TTY_PATH, RelayError};
use std::{path::PathBuf, time::Duration};

/// Knobs for a [`PipedSession`].
///
/// The defaults are what `tl` uses. Tests override the device paths (to force the
/// `/dev/null` fallback) and the child program (to run a script instead of re-exec'ing
/// the test binary).
///
/// ```
/// use r3bl_tail::RelayConfig;
/// use std::time::Duration;
///
/// let config = RelayConfig::default()
///     .with_poll_interval(Duration::from_millis(50))
///     .with_child_program("/usr/local/bin/tl");
/// assert_eq!(config.read_chunk_size, 64 * 1_024);
/// ```
///
/// [`PipedSession`]: crate::PipedSession
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Max time spent waiting for readiness before child liveness is re-checked.
    pub poll_interval: Duration,
    /// Max bytes read from the pipe per iteration.
    pub read_chunk_size: usize,
    /// Terminal device handed to the child as stdin.
    pub tty_path: PathBuf,
    /// Fallback when [`Self::tty_path`] can't be opened.
    pub null_device_path: PathBuf,
    /// File name prefix for the relay file.
    pub relay_prefix: String,
    /// Program to launch as the viewer. `None` means "re-exec the current executable".
    pub child_program: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            tty_path: PathBuf::from(DEFAULT_TTY_PATH),
            null_device_path: PathBuf::from(DEFAULT_NULL_DEVICE_PATH),
            relay_prefix: DEFAULT_RELAY_FILE_PREFIX.to_string(),
            child_program: None,
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Zero is bumped to `1`, a zero length read buffer would look like end of stream.
    #[must_use]
    pub fn with_read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn with_tty_path(mut self, tty_path: impl Into<PathBuf>) -> Self {
        self.tty_path = tty_path.into();
        self
    }

    #[must_use]
    pub fn with_null_device_path(mut self, null_device_path: impl Into<PathBuf>) -> Self {
        self.null_device_path = null_device_path.into();
        self
    }

    #[must_use]
    pub fn with_relay_prefix(mut self, relay_prefix: impl Into<String>) -> Self {
        self.relay_prefix = relay_prefix.into();
        self
    }

    #[must_use]
    pub fn with_child_program(mut self, child_program: impl Into<PathBuf>) -> Self {
        self.child_program = Some(child_program.into());
        self
    }

    /// Returns the program to launch as the viewer child.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ProgramPath`] if no program was configured and the current
    /// executable can't be located.
    pub fn resolve_child_program(&self) -> miette::Result<PathBuf> {
        match &self.child_program {
            Some(program) => Ok(program.clone()),
            None => Ok(std::env::current_exe().map_err(RelayError::ProgramPath)?),
        }
    }
}

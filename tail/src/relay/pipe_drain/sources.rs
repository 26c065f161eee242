// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words NONBLOCK TCIFLUSH

//! Source registry and types for the relay's [`mio`] poll loop.

use crate::RelayError;
use mio::Token;
use rustix::{fs::{OFlags, fcntl_getfl, fcntl_setfl},
             termios::{QueueSelector, tcflush}};
use signal_hook_mio::v1_0::Signals;
use std::{fs::File,
          io,
          os::fd::{AsFd as _, OwnedFd},
          path::Path};

/// Where the piped bytes come from.
#[derive(Debug)]
pub enum PipeSource {
    /// The process's own stdin (fd `0`). After draining ends, fd `0` is pointed at the
    /// null device so the pipe's read side is really closed.
    Stdin,
    /// Any other readable descriptor, eg: the read end of a pipe in tests.
    Fd(OwnedFd),
}

/// How the poll loop learns that the pipe has data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeReadiness {
    /// Registered with [`mio::Poll`].
    Registered,
    /// Regular files (`tl < app.log`) can't be registered with epoll (`EPERM`). They
    /// never block, so they are treated as always readable.
    AlwaysReady,
}

/// The piped input, opened for non-blocking reads.
#[derive(Debug)]
pub struct PipeReader {
    pub file: File,
    pub readiness: PipeReadiness,
    /// [`mio`] is edge triggered. This stays `true` while data may still be waiting
    /// without a new edge: after any read that returned bytes, or after `EINTR`. Only
    /// `WouldBlock` clears it.
    pub pending_readable: bool,
    pub detaches_stdin: bool,
}

impl PipeReader {
    /// Takes ownership of the source (duplicating fd `0` for [`PipeSource::Stdin`]) and
    /// makes it non-blocking.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::PipeSetup`] if the descriptor can't be duplicated or its
    /// flags can't be changed.
    pub fn try_open(source: PipeSource) -> miette::Result<Self> {
        let (owned_fd, detaches_stdin) = match source {
            PipeSource::Stdin => (
                io::stdin()
                    .as_fd()
                    .try_clone_to_owned()
                    .map_err(RelayError::PipeSetup)?,
                true,
            ),
            PipeSource::Fd(owned_fd) => (owned_fd, false),
        };

        let flags = fcntl_getfl(&owned_fd).map_err(|e| RelayError::PipeSetup(e.into()))?;
        fcntl_setfl(&owned_fd, flags | OFlags::NONBLOCK)
            .map_err(|e| RelayError::PipeSetup(e.into()))?;

        Ok(Self {
            file: File::from(owned_fd),
            readiness: PipeReadiness::Registered,
            pending_readable: true,
            detaches_stdin,
        })
    }

    /// Discards residual buffered input, then closes the read side. Errors are ignored,
    /// teardown must proceed.
    pub fn discard_and_close(self, null_device_path: &Path) {
        // ENOTTY for pipes and regular files.
        if let Err(error) = tcflush(&self.file, QueueSelector::IFlush) {
            tracing::trace!(message = "PipeReader -> tcflush ignored", ?error);
        }

        let detaches_stdin = self.detaches_stdin;
        drop(self.file);

        if detaches_stdin {
            let result = File::open(null_device_path)
                .and_then(|null_device| Ok(rustix::stdio::dup2_stdin(&null_device)?));
            if let Err(error) = result {
                tracing::debug!(message = "PipeReader -> detach stdin failed", ?error);
            }
        }
    }
}

/// Registry of all event sources monitored by [`mio::Poll`].
///
/// The sources have different consumption patterns:
/// - **pipe**: call [`read()`] to get bytes, see [`consume_pipe_input()`].
/// - **signals**: call [`pending()`] to drain the signal queue, see
///   [`consume_pending_signals()`].
///
/// [`consume_pending_signals()`]: super::consume_pending_signals
/// [`consume_pipe_input()`]: super::consume_pipe_input
/// [`pending()`]: signal_hook_mio::v1_0::Signals::pending
/// [`read()`]: std::io::Read::read
#[allow(missing_debug_implementations)]
pub struct SourceRegistry {
    /// `None` once draining has ended.
    ///
    /// - **Token**: [`SourceKindReady::Pipe`].[`to_token()`].
    ///
    /// [`to_token()`]: SourceKindReady::to_token
    pub pipe: Option<PipeReader>,

    /// `SIGINT`, `SIGTERM` (interruption) and `SIGCHLD` (child liveness wakeup).
    ///
    /// - **Token**: [`SourceKindReady::Signals`].[`to_token()`].
    ///
    /// [`to_token()`]: SourceKindReady::to_token
    pub signals: Signals,
}

/// Identifies which event source became ready. Single source of truth for the
/// [`Token`] ↔ source mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKindReady {
    /// [`SourceRegistry::pipe`] has data (or hit end of stream).
    Pipe,
    /// [`SourceRegistry::signals`] received a signal.
    Signals,
    /// Unknown token - should not happen in normal operation.
    Unknown,
}

impl SourceKindReady {
    /// Returns the [`Token`] used to register this source. Inverse of
    /// [`from_token()`].
    ///
    /// # Panics
    ///
    /// Panics if called on [`SourceKindReady::Unknown`].
    ///
    /// [`from_token()`]: SourceKindReady::from_token
    #[must_use]
    pub const fn to_token(self) -> Token {
        match self {
            Self::Pipe => Token(0),
            Self::Signals => Token(1),
            Self::Unknown => panic!("Unknown source has no token"),
        }
    }

    #[must_use]
    pub const fn from_token(token: Token) -> Self {
        match token.0 {
            0 => Self::Pipe,
            1 => Self::Signals,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(SourceKindReady::Pipe)]
    #[test_case(SourceKindReady::Signals)]
    fn test_token_round_trip(kind: SourceKindReady) {
        assert_eq!(SourceKindReady::from_token(kind.to_token()), kind);
    }

    #[test]
    fn test_unknown_token() {
        assert_eq!(
            SourceKindReady::from_token(Token(42)),
            SourceKindReady::Unknown
        );
    }

    #[test]
    fn test_try_open_sets_nonblocking() {
        let (reader, _writer) = rustix::pipe::pipe().unwrap();
        let pipe = PipeReader::try_open(PipeSource::Fd(reader)).unwrap();
        let flags = fcntl_getfl(&pipe.file).unwrap();
        assert!(flags.contains(OFlags::NONBLOCK));
        assert!(!pipe.detaches_stdin);

        // Empty pipe with a live writer: would block instead of hanging.
        let mut buf = [0_u8; 8];
        let err = std::io::Read::read(&mut &pipe.file, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_discard_and_close_ignores_non_tty() {
        let (reader, _writer) = rustix::pipe::pipe().unwrap();
        let pipe = PipeReader::try_open(PipeSource::Fd(reader)).unwrap();
        pipe.discard_and_close(Path::new("/dev/null"));
    }
}

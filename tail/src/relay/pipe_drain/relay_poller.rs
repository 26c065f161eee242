// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words EINTR epoll

//! The readiness-driven loop that drains the pipe into the [`RelayStore`].

use super::{PipeReader, PipeReadiness, PipeSource, RELAY_SIGNALS, SourceKindReady,
            SourceRegistry, consume_pending_signals, consume_pipe_input};
use crate::{Continuation, RelayConfig, RelayError, RelayStore, SupervisedChild};
use mio::{Events, Interest, Poll, Token, unix::SourceFd};
use rustix::io::Errno;
use signal_hook_mio::v1_0::Signals;
use std::{io::ErrorKind,
          os::fd::AsRawFd as _,
          path::PathBuf,
          time::Duration};

/// Capacity for the [`mio::Events`] buffer.
const EVENTS_CAPACITY: usize = 8;

/// Why a loop in [`RelayPoller`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Draining is over: end of stream, or a read / append error. Only returned by
    /// [`RelayPoller::drain()`].
    PipeClosed,
    /// [`SupervisedChild::poll()`] reported exit.
    ChildExited,
    /// `SIGINT` or `SIGTERM` arrived.
    Signaled(i32),
}

/// What one bounded wait observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub pipe: bool,
    pub signal: Option<i32>,
}

/// Waits on the pipe and on signals in one [`mio::Poll`], bounded by the poll interval.
///
/// No single wait primitive observes both "pipe has data" and "child exited", so
/// every wait is bounded by [`RelayConfig::poll_interval`] and liveness is re-checked
/// before and after each wait. `SIGCHLD` is registered too, which turns most child exits
/// into an immediate wakeup, but the interval bound stays.
///
/// # Resources Managed
///
/// | Resource               | Purpose                                          |
/// | :--------------------- | :----------------------------------------------- |
/// | [`poll_handle`]        | Bounded readiness wait via epoll / kqueue        |
/// | [`sources`]            | Piped input and `SIGINT` / `SIGTERM` / `SIGCHLD` |
/// | [`pipe_read_buffer`]   | One chunk, at most `read_chunk_size` bytes       |
///
/// [`pipe_read_buffer`]: Self::pipe_read_buffer
/// [`poll_handle`]: Self::poll_handle
/// [`sources`]: Self::sources
#[allow(missing_debug_implementations)]
pub struct RelayPoller {
    pub poll_handle: Poll,
    pub ready_events_buffer: Events,
    pub sources: SourceRegistry,
    pub pipe_read_buffer: Vec<u8>,
    pub poll_interval: Duration,
    pub null_device_path: PathBuf,
}

impl RelayPoller {
    /// Creates the poll, installs the signal handlers and registers both sources.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError`] if any OS resource creation or registration fails.
    pub fn try_new(source: PipeSource, config: &RelayConfig) -> miette::Result<Self> {
        // Create mio::Poll (epoll on Linux, kqueue on macOS).
        let poll_handle = Poll::new().map_err(RelayError::PollCreation)?;
        let mio_registry = poll_handle.registry();

        // Register signals with mio.
        let mut signals = Signals::new(RELAY_SIGNALS).map_err(RelayError::SignalCreation)?;
        mio_registry
            .register(
                &mut signals,
                SourceKindReady::Signals.to_token(),
                Interest::READABLE,
            )
            .map_err(RelayError::SignalRegistration)?;

        // Register the pipe with mio.
        let mut pipe = PipeReader::try_open(source)?;
        let raw_fd = pipe.file.as_raw_fd();
        match mio_registry.register(
            &mut SourceFd(&raw_fd),
            SourceKindReady::Pipe.to_token(),
            Interest::READABLE,
        ) {
            Ok(()) => {}
            Err(error) if Errno::from_io_error(&error) == Some(Errno::PERM) => {
                tracing::debug!(message = "relay poller: input is a regular file");
                pipe.readiness = PipeReadiness::AlwaysReady;
            }
            Err(error) => return Err(RelayError::PipeRegistration(error).into()),
        }

        Ok(Self {
            poll_handle,
            ready_events_buffer: Events::with_capacity(EVENTS_CAPACITY),
            sources: SourceRegistry {
                pipe: Some(pipe),
                signals,
            },
            pipe_read_buffer: vec![0; config.read_chunk_size.max(1)],
            poll_interval: config.poll_interval,
            null_device_path: config.null_device_path.clone(),
        })
    }

    fn pipe_pending(&self) -> bool {
        self.sources
            .pipe
            .as_ref()
            .is_some_and(|pipe| pipe.pending_readable)
    }

    /// Copies bytes from the pipe into `relay` until end of stream, child exit, or an
    /// interruption signal.
    ///
    /// Each iteration: check liveness, wait (bounded), check liveness again, then do at
    /// most one read and one append. Once the child is seen to have exited nothing more
    /// is written.
    pub fn drain(
        &mut self,
        relay: &mut RelayStore,
        child: &mut impl SupervisedChild,
    ) -> LoopExit {
        loop {
            if child.poll() {
                return LoopExit::ChildExited;
            }

            let readiness = self.block_until_ready();

            if let Some(signal) = readiness.signal {
                return LoopExit::Signaled(signal);
            }

            if child.poll() {
                return LoopExit::ChildExited;
            }

            if (readiness.pipe || self.pipe_pending())
                && consume_pipe_input(self, relay) == Continuation::Stop
            {
                return LoopExit::PipeClosed;
            }
        }
    }

    /// Keeps watching signals and child liveness, at the same cadence as [`drain()`],
    /// after draining has ended. Never returns [`LoopExit::PipeClosed`].
    ///
    /// [`drain()`]: Self::drain
    pub fn await_child(&mut self, child: &mut impl SupervisedChild) -> LoopExit {
        loop {
            if child.poll() {
                return LoopExit::ChildExited;
            }
            if let Some(signal) = self.block_until_ready().signal {
                return LoopExit::Signaled(signal);
            }
        }
    }

    /// Blocks for at most one poll interval (or not at all if the pipe may still have
    /// data), then dispatches ready events.
    pub fn block_until_ready(&mut self) -> Readiness {
        // Breaks borrow so dispatch can use `&mut self`.
        fn collect_ready_tokens(events: &Events) -> Vec<Token> {
            events.iter().map(mio::event::Event::token).collect()
        }

        let timeout = if self.pipe_pending() {
            Duration::ZERO
        } else {
            self.poll_interval
        };

        if let Err(error) = self
            .poll_handle
            .poll(&mut self.ready_events_buffer, Some(timeout))
        {
            // EINTR - retry (signal interrupted syscall). The signal itself shows up
            // on the next poll.
            if error.kind() != ErrorKind::Interrupted {
                tracing::warn!(message = "relay poller: poll failed", ?error);
                std::thread::sleep(self.poll_interval);
            }
            return Readiness::default();
        }

        let mut readiness = Readiness::default();
        for token in collect_ready_tokens(&self.ready_events_buffer) {
            match SourceKindReady::from_token(token) {
                SourceKindReady::Pipe => readiness.pipe = true,
                SourceKindReady::Signals => {
                    if let Some(signal) = consume_pending_signals(&mut self.sources.signals)
                    {
                        readiness.signal.get_or_insert(signal);
                    }
                }
                SourceKindReady::Unknown => {
                    tracing::warn!(message = "relay poller: unknown token", ?token);
                }
            }
        }
        readiness
    }

    /// Unregisters the pipe, discards residual buffered input and closes the read side.
    /// Signals stay registered. Calling this again does nothing.
    pub fn finish_draining(&mut self) {
        if let Some(pipe) = self.detach_pipe() {
            pipe.discard_and_close(&self.null_device_path);
        }
    }

    /// Tears everything down: the pipe is unregistered, the poll is closed, and only
    /// then is the pipe flushed and closed.
    pub fn close(mut self) {
        let maybe_pipe = self.detach_pipe();

        let Self {
            poll_handle,
            mut sources,
            null_device_path,
            ..
        } = self;
        if let Err(error) = poll_handle.registry().deregister(&mut sources.signals) {
            tracing::debug!(message = "relay poller: deregister signals failed", ?error);
        }
        drop(sources);
        drop(poll_handle);

        if let Some(pipe) = maybe_pipe {
            pipe.discard_and_close(&null_device_path);
        }
    }

    fn detach_pipe(&mut self) -> Option<PipeReader> {
        let pipe = self.sources.pipe.take()?;
        if pipe.readiness == PipeReadiness::Registered {
            let raw_fd = pipe.file.as_raw_fd();
            if let Err(error) = self
                .poll_handle
                .registry()
                .deregister(&mut SourceFd(&raw_fd))
            {
                tracing::debug!(message = "relay poller: deregister pipe failed", ?error);
            }
        }
        Some(pipe)
    }
}

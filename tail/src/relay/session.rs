// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! One piped session, from relay file creation to child reaping.

use crate::{ChildSupervisor, LoopExit, PipeSource, RelayConfig, RelayPoller, RelayStore,
            SessionState, SessionStateMachine, SignalBridge, SupervisedChild,
            reacquire_terminal};
use std::{io::{self, Write},
          process::ExitStatus};

/// How the session ended. Both map to exit status `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The viewer exited on its own (eg: the user pressed `q`).
    ChildExited(Option<ExitStatus>),
    /// `SIGINT` or `SIGTERM` arrived, the viewer was terminated and reaped.
    Signaled(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub end: SessionEnd,
    pub bytes_relayed: u64,
    pub final_state: SessionState,
}

/// Runs `tl` in piped mode.
///
/// Resources are acquired in this order, and released in reverse by scope exit:
///
/// | Step | Resource           | Released                                  |
/// | :--- | :----------------- | :---------------------------------------- |
/// | 1    | [`RelayPoller`]    | closed before the relay file and terminal |
/// | 2    | [`RelayStore`]     | unlinked last                             |
/// | 3    | terminal handle    | closed after the poll                     |
/// | 4    | [`ChildSupervisor`]| reaped before cleanup                     |
///
/// A failure in steps 1 to 4 is returned as a diagnostic (nothing has been relayed yet,
/// and everything acquired so far is released on the way out). After the child is
/// spawned, failures are handled locally.
#[derive(Debug, Clone, Default)]
pub struct PipedSession {
    config: RelayConfig,
}

impl PipedSession {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self { Self { config } }

    /// Runs the session with the process's stdout and stderr as the terminal and
    /// marker outputs.
    ///
    /// # Errors
    ///
    /// See [`Self::run_with_output()`].
    pub fn run(&self, source: PipeSource) -> miette::Result<SessionReport> {
        self.run_with_output(source, io::stdout(), io::stderr())
    }

    /// # Errors
    ///
    /// Returns a [`RelayError`] if the session can't be set up.
    ///
    /// [`RelayError`]: crate::RelayError
    pub fn run_with_output<O: Write, E: Write>(
        &self,
        source: PipeSource,
        term_out: O,
        marker_out: E,
    ) -> miette::Result<SessionReport> {
        let config = &self.config;
        let mut state = SessionStateMachine::default();

        let mut poller = RelayPoller::try_new(source, config)?;
        let mut relay = RelayStore::try_create(&config.relay_prefix)?;
        let terminal = reacquire_terminal(&config.tty_path, &config.null_device_path)?;
        let program = config.resolve_child_program()?;
        let mut child = ChildSupervisor::spawn(&program, relay.path(), &terminal)?;
        state.advance(SessionState::PipeActive);

        let mut loop_exit = poller.drain(&mut relay, &mut child);
        if loop_exit == LoopExit::PipeClosed {
            tracing::debug!(
                message = "PipedSession: draining ended, waiting for viewer",
                bytes_relayed = relay.bytes_written()
            );
            poller.finish_draining();
            loop_exit = poller.await_child(&mut child);
        }

        let end = match loop_exit {
            LoopExit::Signaled(signal) => {
                state.advance(SessionState::SignalReceived);
                let mut bridge = SignalBridge::new(term_out, marker_out);
                bridge.request_exit(Some(&mut child));
                SessionEnd::Signaled(signal)
            }
            LoopExit::ChildExited | LoopExit::PipeClosed => {
                state.advance(SessionState::ChildExited);
                SessionEnd::ChildExited(child.wait())
            }
        };

        poller.close();
        state.advance(SessionState::CleanedUp);

        let bytes_relayed = relay.bytes_written();
        drop(child);
        drop(terminal);
        drop(relay);
        state.advance(SessionState::Terminated);

        let report = SessionReport {
            end,
            bytes_relayed,
            final_state: state.current(),
        };
        tracing::debug!(message = "PipedSession: done", ?report);
        Ok(report)
    }
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Clean teardown after `SIGINT` / `SIGTERM`.

use crate::{INTERRUPTION_MARKER, MOUSE_TRACKING_DISABLE_SEQUENCES, SHOW_CURSOR,
            SupervisedChild};
use std::{io::Write, process::ExitStatus};

/// Leaves the terminal usable and the child reaped, however the session was
/// interrupted.
///
/// The viewer child may have switched on mouse tracking and hidden the cursor, and if
/// it is killed mid-frame it won't switch them back. So on interruption the parent:
///
/// 1. disables X10, normal and SGR mouse tracking,
/// 2. shows the cursor,
/// 3. prints [`INTERRUPTION_MARKER`] on `marker_out`,
/// 4. terminates and waits for the child (if one is supervised).
///
/// Each escape sequence is written and flushed on its own. Write errors are logged and
/// skipped so later steps still run. The caller exits with status `0` afterwards.
///
/// The child is passed in explicitly by the caller that owns it, there is no global
/// "current child".
#[derive(Debug)]
pub struct SignalBridge<O: Write, E: Write> {
    term_out: O,
    marker_out: E,
    terminal_restored: bool,
}

impl<O: Write, E: Write> SignalBridge<O, E> {
    pub fn new(term_out: O, marker_out: E) -> Self {
        Self {
            term_out,
            marker_out,
            terminal_restored: false,
        }
    }

    #[must_use]
    pub fn terminal_restored(&self) -> bool { self.terminal_restored }

    /// Emits the mouse-tracking-disable and show-cursor sequences. Only the first call
    /// writes anything.
    pub fn restore_terminal(&mut self) {
        if self.terminal_restored {
            return;
        }
        self.terminal_restored = true;

        for sequence in MOUSE_TRACKING_DISABLE_SEQUENCES
            .into_iter()
            .chain([SHOW_CURSOR])
        {
            if let Err(error) = write_and_flush(&mut self.term_out, sequence) {
                tracing::debug!(message = "SignalBridge: restore failed", ?sequence, ?error);
            }
        }
    }

    /// Runs the whole interruption teardown, see [`SignalBridge`].
    ///
    /// Returns the child's exit status if a child was supervised and it could be
    /// collected.
    pub fn request_exit<C: SupervisedChild>(
        &mut self,
        maybe_child: Option<&mut C>,
    ) -> Option<ExitStatus> {
        self.restore_terminal();

        if let Err(error) = write_and_flush(&mut self.marker_out, INTERRUPTION_MARKER) {
            tracing::debug!(message = "SignalBridge: marker failed", ?error);
        }

        let child = maybe_child?;
        child.terminate();
        let maybe_status = child.wait();
        tracing::debug!(message = "SignalBridge: child reaped", status = ?maybe_status);
        maybe_status
    }
}

fn write_and_flush(out: &mut impl Write, text: &str) -> std::io::Result<()> {
    out.write_all(text.as_bytes())?;
    out.flush()
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Piped session lifecycle.
//!
//! ```text
//! NotStarted ──▶ PipeActive ──┬──▶ ChildExited ────┬──▶ CleanedUp ──▶ Terminated
//!                             └──▶ SignalReceived ─┘
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NotStarted,
    /// The child is spawned and the poll loop is running.
    PipeActive,
    /// The child exited on its own.
    ChildExited,
    /// `SIGINT` / `SIGTERM` preempted the loop. The child gets terminated.
    SignalReceived,
    /// Poll closed, pipe closed.
    CleanedUp,
    /// Terminal handle and relay file released.
    Terminated,
}

impl SessionState {
    #[must_use]
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::{ChildExited, CleanedUp, NotStarted, PipeActive,
                           SignalReceived, Terminated};
        matches!(
            (self, next),
            (NotStarted, PipeActive)
                | (PipeActive, ChildExited | SignalReceived)
                | (ChildExited | SignalReceived, CleanedUp)
                | (CleanedUp, Terminated)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{self:?}") }
}

/// Holds the current [`SessionState`] and only moves along legal edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStateMachine {
    current: SessionState,
}

impl SessionStateMachine {
    #[must_use]
    pub fn current(&self) -> SessionState { self.current }

    /// Moves to `next` if the edge is legal. Illegal moves are logged and ignored.
    /// Returns whether the move happened.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if self.current.can_transition_to(next) {
            tracing::debug!(message = "session state", from = %self.current, to = %next);
            self.current = next;
            true
        } else {
            tracing::warn!(
                message = "session state: illegal transition ignored",
                from = %self.current,
                to = %next
            );
            false
        }
    }
}

// Copyright (c) 2023-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Control flow signal for loops.
///
/// Used by the relay's pipe handler ([`consume_pipe_input()`]) and by the follow
/// viewer's key handler ([`handle_event()`]).
///
/// [`consume_pipe_input()`]: crate::consume_pipe_input
/// [`handle_event()`]: crate::handle_event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Continue to the next iteration.
    #[default]
    Continue,

    /// Stop processing and exit the loop.
    Stop,
}

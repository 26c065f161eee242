// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words EINTR epoll kqueue

//! # Architecture Overview
//!
//! This module holds the relay parent's poll loop. It moves bytes from the inherited
//! pipe into the [`RelayStore`] while watching the viewer child and interruption
//! signals.
//!
//! | Item                          | Description                                               |
//! | :---------------------------- | :-------------------------------------------------------- |
//! | [`RelayPoller`]               | Holds the poll handle, sources and read buffer            |
//! | [`SourceRegistry`]            | The pipe and the `SIGINT` / `SIGTERM` / `SIGCHLD` handles |
//! | [`SourceKindReady`]           | [`mio::Token`] ↔ source kind mapping                      |
//! | [`consume_pipe_input()`]      | One bounded read and one append                           |
//! | [`consume_pending_signals()`] | Drains the signal queue, reports interruptions            |
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ RelayPoller (parent, single thread) │
//! │                                     │        ┌──────────────┐
//! │ mio::Poll waits (≤ poll interval):  ├───────▶│ RelayStore   │
//! │   • pipe fd (Token 0)               │ append │ (tl_XXXXXX)  │
//! │   • SIGINT/SIGTERM/SIGCHLD (Token 1)│        └──────────────┘
//! │ child.poll() before + after wait    │
//! └─────────────────────────────────────┘
//! ```
//!
//! # EINTR handling
//!
//! A signal arriving while blocked in [`mio::Poll::poll()`] or in `read()` makes the
//! syscall fail with `EINTR`. Both are simply retried: the signal itself is picked up
//! through the signal source on the next wait.
//!
//! # Edge triggering
//!
//! [`mio`] registrations are edge triggered, so the pipe is read non-blocking and
//! [`PipeReader::pending_readable`] tracks whether data may still be waiting without
//! a fresh edge. When it is set the next wait uses a zero timeout.
//!
//! [`RelayStore`]: crate::RelayStore

// Attach sources.
pub mod handler_pipe;
pub mod handler_signals;
pub mod relay_poller;
pub mod sources;

// Re-export.
pub use handler_pipe::*;
pub use handler_signals::*;
pub use relay_poller::*;
pub use sources::*;

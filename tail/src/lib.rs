// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # r3bl_tail
//!
//! `tl` views and tails log files in the terminal. It works both when it is launched
//! from an interactive terminal (`tl app.log`) and when data is piped into it
//! (`kubectl logs -f pod | tl`).
//!
//! # Piped mode
//!
//! An interactive display needs exclusive control of its input device, so it can't read
//! keystrokes from the same stdin that is carrying the piped log data. `tl` solves this
//! with a "process per display owner" split:
//!
//! ```text
//!  producer ──pipe──▶ tl (parent)                     tl (child, re-exec'd)
//!                     │  RelayPoller (mio)             ▲ argv[1] = relay path
//!                     │   ├─ stdin pipe  ──append──▶ RelayStore (tl_XXXX) ──tail──┘
//!                     │   └─ SIGINT/SIGTERM/SIGCHLD   stdin = /dev/tty (or /dev/null)
//!                     └─ SignalBridge ── terminate + wait ──▶ child
//! ```
//!
//! 1. [`RelayStore`] creates a private temp file that is unlinked when dropped.
//! 2. [`reacquire_terminal()`] opens `/dev/tty`, falling back to `/dev/null`.
//! 3. [`ChildSupervisor`] re-execs `tl <relay path>` with the terminal as its stdin.
//! 4. [`RelayPoller`] copies bytes from stdin into the relay file, checking child
//!    liveness at least every [`DEFAULT_POLL_INTERVAL`].
//! 5. [`SignalBridge`] restores the terminal and reaps the child on `SIGINT` /
//!    `SIGTERM`.
//!
//! [`PipedSession`] ties these together.
//!
//! # Interactive mode
//!
//! When stdin is a terminal the file arguments are handed straight to the follow viewer
//! in [`viewer`].

// Enforce strict error handling in production code only.
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach.
pub mod common;
pub mod config;
pub mod constants;
pub mod error;
pub mod launcher;
pub mod log;
pub mod relay;
pub mod viewer;

// Re-export.
pub use common::*;
pub use config::*;
pub use constants::*;
pub use error::*;
pub use launcher::*;
pub use log::*;
pub use relay::*;
pub use viewer::*;

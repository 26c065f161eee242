// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Diagnostic error types for failures that prevent a piped session from starting.
//!
//! Once the session is running, failures are handled locally (logged and ignored), so
//! these only describe the setup phase.

use miette::Diagnostic;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum RelayError {
    /// Failed to create the relay temp file.
    #[error("Failed to create the relay file")]
    #[diagnostic(
        code(r3bl_tail::relay::store_creation),
        help("Check that the temp dir ($TMPDIR) exists and is writable")
    )]
    RelayStoreCreation(#[source] std::io::Error),

    /// Neither the terminal nor the null device could be opened.
    #[error("Failed to open the null device {path:?}")]
    #[diagnostic(code(r3bl_tail::relay::null_device))]
    NullDeviceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create [`mio::Poll`] (epoll/kqueue creation failed).
    #[error("Failed to create mio::Poll")]
    #[diagnostic(
        code(r3bl_tail::mio::poll_creation),
        help("This usually means the system ran out of file descriptors")
    )]
    PollCreation(#[source] std::io::Error),

    /// Failed to create the `SIGINT` / `SIGTERM` / `SIGCHLD` handler.
    #[error("Failed to create signal handler")]
    #[diagnostic(
        code(r3bl_tail::mio::signal_creation),
        help("Signal handler creation failed - check system signal limits")
    )]
    SignalCreation(#[source] std::io::Error),

    /// Failed to register signals with mio.
    #[error("Failed to register signals with mio")]
    #[diagnostic(code(r3bl_tail::mio::signal_registration))]
    SignalRegistration(#[source] std::io::Error),

    /// Failed to register the piped input with mio.
    #[error("Failed to register piped input with mio")]
    #[diagnostic(
        code(r3bl_tail::mio::pipe_registration),
        help("Ensure stdin is a valid file descriptor")
    )]
    PipeRegistration(#[source] std::io::Error),

    /// Failed to duplicate or configure the piped input descriptor.
    #[error("Failed to prepare piped input for reading")]
    #[diagnostic(code(r3bl_tail::relay::pipe_setup))]
    PipeSetup(#[source] std::io::Error),

    /// Could not figure out which executable to re-exec.
    #[error("Failed to locate the current executable")]
    #[diagnostic(code(r3bl_tail::relay::program_path))]
    ProgramPath(#[source] std::io::Error),

    /// Failed to spawn the viewer child.
    #[error("Failed to spawn viewer process {program:?}")]
    #[diagnostic(
        code(r3bl_tail::relay::child_spawn),
        help("The viewer is re-exec'd from the same binary, make sure it is executable")
    )]
    ChildSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

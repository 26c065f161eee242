// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Picks how `tl` runs, and runs it.

use crate::{ALLOW_SIGNALS_ENV_VAR, CLIArg, PipeSource, PipedSession, RelayConfig,
            ViewerOptions, run_viewer};
use clap::CommandFactory as _;
use miette::IntoDiagnostic as _;
use std::{io, path::PathBuf, process::ExitCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Interactive terminal, no files.
    Help,
    /// Interactive terminal: follow the given files directly.
    Interactive { files: Vec<PathBuf> },
    /// Data is piped in: relay it and re-exec `tl` as the viewer.
    Piped,
    /// This process *is* the re-exec'd viewer. Its stdin is the terminal, or the null
    /// device when there's no terminal, which must not be mistaken for piped input.
    RelayChild { relay_path: PathBuf },
}

/// Decides the [`Mode`]. Piped mode ignores file arguments.
#[must_use]
pub fn select_mode(files: &[PathBuf], stdin_is_tty: bool, is_relay_child: bool) -> Mode {
    match (files, stdin_is_tty, is_relay_child) {
        ([relay_path], _, true) => Mode::RelayChild {
            relay_path: relay_path.clone(),
        },
        ([], true, _) => Mode::Help,
        (_, true, _) => Mode::Interactive {
            files: files.to_vec(),
        },
        (_, false, _) => Mode::Piped,
    }
}

/// Runs `tl` for the parsed command line. Every piped session outcome (including an
/// interruption) is a success.
///
/// # Errors
///
/// Returns an error if a piped session can't be set up, or if the viewer fails. Viewer
/// failures are logged too.
pub fn launch(cli_arg: &CLIArg) -> miette::Result<ExitCode> {
    let stdin_is_tty = rustix::termios::isatty(io::stdin());
    let is_relay_child = std::env::var_os(ALLOW_SIGNALS_ENV_VAR).is_some();
    let mode = select_mode(&cli_arg.file_paths, stdin_is_tty, is_relay_child);
    tracing::debug!(message = "launch", ?mode, stdin_is_tty, is_relay_child);

    match mode {
        Mode::Help => {
            CLIArg::command().print_help().into_diagnostic()?;
            Ok(ExitCode::SUCCESS)
        }

        Mode::Piped => {
            let report =
                PipedSession::new(RelayConfig::default()).run(PipeSource::Stdin)?;
            tracing::debug!(message = "launch -> piped session ended", ?report);
            Ok(ExitCode::SUCCESS)
        }

        Mode::Interactive { files } => {
            let options = ViewerOptions {
                merge: cli_arg.merge,
                output_merge: cli_arg.output_merge.clone(),
                ..ViewerOptions::default()
            };
            run_viewer_logging_errors(&files, &options)
        }

        Mode::RelayChild { relay_path } => {
            let options = ViewerOptions {
                allow_signals: true,
                ..ViewerOptions::default()
            };
            run_viewer_logging_errors(&[relay_path], &options)
        }
    }
}

fn run_viewer_logging_errors(
    files: &[PathBuf],
    options: &ViewerOptions,
) -> miette::Result<ExitCode> {
    match run_viewer(files, options) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(error) => {
            // % is Display, ? is Debug.
            tracing::error!(
                message = "Could not run the viewer due to the following problem",
                error = ?error
            );
            Err(error)
        }
    }
}

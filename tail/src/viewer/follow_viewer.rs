// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A minimal `tail -f` style viewer.
//!
//! This is the process that owns the terminal. In piped mode it is the re-exec'd child
//! and its only file is the relay file.

use super::FileFollower;
use crate::{Continuation, DEFAULT_POLL_INTERVAL};
use crossterm::{cursor,
                event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode,
                        KeyEvent, KeyEventKind, KeyModifiers},
                execute, terminal};
use miette::IntoDiagnostic as _;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::{borrow::Cow,
          io::{self, Write},
          path::{Path, PathBuf},
          sync::{Arc,
                 atomic::{AtomicBool, Ordering}},
          time::Duration};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerOptions {
    /// Show all files as one stream (in argument order), without per file headers.
    pub merge: bool,
    /// Where to write the merged stream when the viewer exits. Requires `merge`.
    pub output_merge: Option<PathBuf>,
    /// Stop on `SIGINT` / `SIGTERM` (restoring the terminal first) instead of dying
    /// with the default disposition.
    pub allow_signals: bool,
    pub poll_interval: Duration,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            merge: false,
            output_merge: None,
            allow_signals: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Puts the terminal in raw mode with a hidden cursor and mouse capture. Mouse events
/// are captured and ignored. Everything is undone on drop.
#[derive(Debug)]
struct TerminalGuard;

impl TerminalGuard {
    fn try_new() -> miette::Result<Self> {
        terminal::enable_raw_mode().into_diagnostic()?;
        // From here on, drop undoes raw mode even if the next step fails.
        let guard = Self;
        execute!(io::stdout(), cursor::Hide, EnableMouseCapture).into_diagnostic()?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(error) = execute!(io::stdout(), DisableMouseCapture, cursor::Show) {
            tracing::debug!(message = "TerminalGuard: restore failed", ?error);
        }
        if let Err(error) = terminal::disable_raw_mode() {
            tracing::debug!(message = "TerminalGuard: disable_raw_mode failed", ?error);
        }
    }
}

/// Follows `files` until the user quits (`q`, `Esc`, `Ctrl+C`) or, with
/// [`ViewerOptions::allow_signals`], until `SIGINT` / `SIGTERM`.
///
/// When stdin is not a terminal (eg: the relay child fell back to `/dev/null`) there
/// are no keys to read, so bytes are streamed like `tail -f` until a signal arrives.
/// The viewer can't tell that the producer is done, more bytes may always come.
///
/// # Errors
///
/// Returns an error if the terminal can't be set up, a signal flag can't be
/// registered, a file can't be read, or the merged output can't be written.
pub fn run_viewer(files: &[PathBuf], options: &ViewerOptions) -> miette::Result<()> {
    let stop_requested = Arc::new(AtomicBool::new(false));
    if options.allow_signals {
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&stop_requested))
                .into_diagnostic()?;
        }
    }

    let interactive = rustix::termios::isatty(io::stdin());
    tracing::debug!(message = "run_viewer", ?files, ?options, interactive);

    let merged = {
        let _maybe_guard = if interactive {
            Some(TerminalGuard::try_new()?)
        } else {
            None
        };
        follow_files(
            files,
            options,
            &stop_requested,
            interactive,
            &mut io::stdout().lock(),
        )?
    };

    if let Some(output_path) = &options.output_merge {
        std::fs::write(output_path, &merged).into_diagnostic()?;
        tracing::debug!(message = "run_viewer: merged output written", ?output_path);
    }

    Ok(())
}

/// The follow loop. Writes appended bytes to `out` every poll interval until
/// `stop_requested` is set or (when `interactive`) a quit key is pressed. Newlines
/// are translated for raw mode only when `interactive`.
///
/// Returns the merged stream when [`ViewerOptions::output_merge`] is set, otherwise an
/// empty buffer.
///
/// # Errors
///
/// Returns an error if a file can't be read or `out` can't be written.
pub fn follow_files(
    files: &[PathBuf],
    options: &ViewerOptions,
    stop_requested: &AtomicBool,
    interactive: bool,
    out: &mut impl Write,
) -> miette::Result<Vec<u8>> {
    let mut followers: Vec<FileFollower> = files.iter().map(FileFollower::new).collect();
    let mut merged: Vec<u8> = vec![];
    let mut maybe_last_shown: Option<usize> = None;

    while !stop_requested.load(Ordering::Relaxed) {
        for (index, follower) in followers.iter_mut().enumerate() {
            let bytes = follower.read_appended().into_diagnostic()?;
            if bytes.is_empty() {
                continue;
            }

            if !options.merge && files.len() > 1 && maybe_last_shown != Some(index) {
                let header = file_header(follower.path(), maybe_last_shown.is_some());
                write_translated(out, header.as_bytes(), interactive)?;
            }
            maybe_last_shown = Some(index);

            write_translated(out, &bytes, interactive)?;
            if options.output_merge.is_some() {
                merged.extend_from_slice(&bytes);
            }
        }
        out.flush().into_diagnostic()?;

        if wait_for_input(interactive, options.poll_interval)? == Continuation::Stop {
            break;
        }
    }

    Ok(merged)
}

/// Waits up to `poll_interval` for a key press (or just sleeps when there is no
/// terminal).
fn wait_for_input(interactive: bool, poll_interval: Duration) -> miette::Result<Continuation> {
    if !interactive {
        std::thread::sleep(poll_interval);
        return Ok(Continuation::Continue);
    }

    match event::poll(poll_interval) {
        Ok(true) => Ok(handle_event(&event::read().into_diagnostic()?)),
        Ok(false) => Ok(Continuation::Continue),
        // EINTR from a signal, the stop flag is checked right after.
        Err(error) if error.kind() == io::ErrorKind::Interrupted => {
            Ok(Continuation::Continue)
        }
        Err(error) => Err(error).into_diagnostic(),
    }
}

/// `q`, `Esc` and `Ctrl+C` quit. Everything else is ignored.
#[must_use]
pub fn handle_event(event: &Event) -> Continuation {
    match event {
        Event::Key(KeyEvent {
            code, modifiers, kind: KeyEventKind::Press, ..
        }) => match code {
            KeyCode::Char('q') | KeyCode::Esc => Continuation::Stop,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                Continuation::Stop
            }
            _ => Continuation::Continue,
        },
        _ => Continuation::Continue,
    }
}

/// `==> path <==` in the style of `tail`, with a blank line between sections.
#[must_use]
pub fn file_header(path: &Path, needs_separator: bool) -> String {
    let separator = if needs_separator { "\n" } else { "" };
    format!("{separator}==> {} <==\n", path.display())
}

/// In raw mode `\n` only moves down a row, so bare line feeds become `\r\n`.
#[must_use]
pub fn translate_newlines_for_raw_mode(bytes: &[u8]) -> Cow<'_, [u8]> {
    let has_bare_lf = bytes
        .iter()
        .enumerate()
        .any(|(index, &byte)| byte == b'\n' && (index == 0 || bytes[index - 1] != b'\r'));
    if !has_bare_lf {
        return Cow::Borrowed(bytes);
    }

    let mut acc = Vec::with_capacity(bytes.len() + bytes.len() / 8);
    let mut previous = None;
    for &byte in bytes {
        if byte == b'\n' && previous != Some(b'\r') {
            acc.push(b'\r');
        }
        acc.push(byte);
        previous = Some(byte);
    }
    Cow::Owned(acc)
}

fn write_translated(out: &mut impl Write, bytes: &[u8], raw_mode: bool) -> miette::Result<()> {
    if raw_mode {
        out.write_all(&translate_newlines_for_raw_mode(bytes))
    } else {
        out.write_all(bytes)
    }
    .into_diagnostic()
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Escape sequences, environment variables and defaults shared by the relay parent and
//! the viewer child.

use std::time::Duration;

// Terminal control sequences emitted on signal-triggered shutdown.

/// X10 Mouse Mode reset - DEC mode 9.
pub const DISABLE_X10_MOUSE_MODE: &str = "\x1b[?9l";

/// Normal Mouse Tracking reset - DEC mode 1000.
pub const DISABLE_NORMAL_MOUSE_TRACKING: &str = "\x1b[?1000l";

/// SGR Extended Mouse Mode reset - DEC mode 1006.
pub const DISABLE_SGR_MOUSE_MODE: &str = "\x1b[?1006l";

/// Text Cursor Enable Mode set - DEC mode 25 (show cursor).
pub const SHOW_CURSOR: &str = "\x1b[?25h";

/// Order in which mouse modes are switched off. Each one is written and flushed on its
/// own.
pub const MOUSE_TRACKING_DISABLE_SEQUENCES: [&str; 3] = [
    DISABLE_X10_MOUSE_MODE,
    DISABLE_NORMAL_MOUSE_TRACKING,
    DISABLE_SGR_MOUSE_MODE,
];

/// Printed on stderr when the session is interrupted.
pub const INTERRUPTION_MARKER: &str = "^C\n";

// Environment.

/// Set on the relay child. Tells the viewer that it may (and should) react to `SIGINT`
/// and `SIGTERM` instead of relying on raw mode key events. Its presence is also what
/// identifies a process as the relay child.
pub const ALLOW_SIGNALS_ENV_VAR: &str = "TL_ALLOW_SIGNALS";

/// Value of [`ALLOW_SIGNALS_ENV_VAR`].
pub const ALLOW_SIGNALS_ENV_VALUE: &str = "1";

/// Names a log file. Enables logging in both the parent and the relay child, since the
/// environment is inherited.
pub const LOG_FILE_ENV_VAR: &str = "TL_LOG_FILE";

/// Log file used by `--enable-logging`.
pub const DEFAULT_LOG_FILE_NAME: &str = "log.txt";

// Relay defaults.

/// Upper bound on how long the relay waits for readiness before re-checking whether the
/// child is still alive.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Max bytes moved from the pipe to the relay file per loop iteration (`64 KiB`).
pub const DEFAULT_READ_CHUNK_SIZE: usize = 64 * 1_024;

/// Relay files are named `tl_XXXXXX` in the system temp dir.
pub const DEFAULT_RELAY_FILE_PREFIX: &str = "tl_";

/// The controlling terminal, reachable even when stdin is redirected.
pub const DEFAULT_TTY_PATH: &str = "/dev/tty";

/// Always-empty input used when there's no controlling terminal.
pub const DEFAULT_NULL_DEVICE_PATH: &str = "/dev/null";

pub const ISSUES_URL: &str = "https://github.com/r3bl-org/r3bl-open-core/issues/new";

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Event handler for signal processing.

use signal_hook::consts::{SIGCHLD, SIGINT, SIGTERM};
use signal_hook_mio::v1_0::Signals;

/// Signals the relay parent listens for.
pub const RELAY_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGCHLD];

/// Drains all pending signals.
///
/// Returns the first interruption (`SIGINT` or `SIGTERM`), if any. `SIGCHLD` only
/// wakes the loop up, the caller re-checks child liveness right after.
pub fn consume_pending_signals(signals: &mut Signals) -> Option<i32> {
    let mut interruption = None;

    // Don't short circuit, the whole queue has to be drained.
    for signal in signals.pending() {
        match signal {
            SIGINT | SIGTERM => {
                tracing::debug!(message = "relay poller: interrupted", signal);
                interruption.get_or_insert(signal);
            }
            SIGCHLD => {
                tracing::trace!(message = "relay poller: SIGCHLD");
            }
            _ => {}
        }
    }

    interruption
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words EINTR

//! Moves one bounded chunk from the pipe into the [`RelayStore`].

use super::RelayPoller;
use crate::{Continuation, RelayStore};
use std::io::{ErrorKind, Read as _};

/// Handles the pipe becoming readable: at most one bounded read and one append.
///
/// # Returns
///
/// - [`Continuation::Continue`]: bytes relayed, or a retryable error.
/// - [`Continuation::Stop`]: draining is over. End of stream, a non-`EINTR` read
///   error, or a failed append (a relay file that can't be written is as good as gone).
pub fn consume_pipe_input(poller: &mut RelayPoller, relay: &mut RelayStore) -> Continuation {
    let Some(pipe) = poller.sources.pipe.as_mut() else {
        return Continuation::Stop;
    };

    match pipe.file.read(&mut poller.pipe_read_buffer) {
        Ok(0) => {
            tracing::debug!(
                message = "relay poller: EOF (0 bytes)",
                bytes_relayed = relay.bytes_written()
            );
            pipe.pending_readable = false;
            Continuation::Stop
        }

        Ok(n) => {
            // A short read doesn't mean drained: the last bytes and the writer's close
            // can share one edge. Keep reading until WouldBlock or EOF.
            pipe.pending_readable = true;

            tracing::trace!(message = "relay poller: read bytes", bytes_read = n);

            match relay.append(&poller.pipe_read_buffer[..n]) {
                Ok(()) => Continuation::Continue,
                Err(error) => {
                    tracing::warn!(message = "relay poller: append failed", ?error);
                    Continuation::Stop
                }
            }
        }

        Err(ref e) if e.kind() == ErrorKind::Interrupted => {
            // EINTR - retry without waiting for a new edge.
            pipe.pending_readable = true;
            Continuation::Continue
        }

        Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
            // Drained for now, wait for the next edge.
            pipe.pending_readable = false;
            Continuation::Continue
        }

        Err(error) => {
            tracing::warn!(message = "relay poller: read error", ?error);
            Continuation::Stop
        }
    }
}

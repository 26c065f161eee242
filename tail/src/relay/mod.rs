// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Piped mode: relay stdin into a temp file and supervise the viewer child that tails
//! it. See the [crate docs] for the big picture.
//!
//! [crate docs]: crate

// Attach sources.
pub mod child_supervisor;
pub mod pipe_drain;
pub mod relay_store;
pub mod session;
pub mod session_state;
pub mod signal_bridge;
pub mod terminal_reacquirer;

// Re-export.
pub use child_supervisor::*;
pub use pipe_drain::*;
pub use relay_store::*;
pub use session::*;
pub use session_state::*;
pub use signal_bridge::*;
pub use terminal_reacquirer::*;

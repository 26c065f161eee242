// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The process that owns the terminal: follows files and prints what gets appended.

// Attach sources.
pub mod file_follower;
pub mod follow_viewer;

// Re-export.
pub use file_follower::*;
pub use follow_viewer::*;

// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::path::PathBuf;
use tracing_appender::rolling::RollingFileAppender;

/// Creates a file appender that never rotates, at `path_str`.
///
/// Don't wrap this in `tracing_appender::non_blocking()`: `tl` exits via signal paths
/// where the worker guard would be dropped without flushing.
///
/// # Errors
///
/// Returns an error if:
/// - The path has no parent directory
/// - The path has no file name
pub fn try_create(path_str: &str) -> miette::Result<RollingFileAppender> {
    let path = PathBuf::from(path_str);

    // A bare file name like `log.txt` has an empty parent, which means the cwd.
    let parent = match path.parent() {
        Some(it) if it.as_os_str().is_empty() => PathBuf::from("."),
        Some(it) => it.to_path_buf(),
        None => {
            return Err(miette::miette!(
                "Can't use {} as a log file, it has no parent folder.",
                path.display()
            ));
        }
    };

    let file_name = path.file_name().ok_or_else(|| {
        miette::miette!(
            "Can't use {} as a log file, it has no file name.",
            path.display()
        )
    })?;

    Ok(tracing_appender::rolling::never(parent, file_name))
}

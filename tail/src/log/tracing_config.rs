// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{DEFAULT_LOG_FILE_NAME, LOG_FILE_ENV_VAR};
use tracing_core::LevelFilter;

/// Consumed by [`try_create_layers()`].
///
/// Logs only ever go to a file. Stdout and stderr are shared with the viewer, and the
/// parent's stdout is where the terminal restore sequences go.
///
/// [`try_create_layers()`]: crate::try_create_layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub log_file_path: String,
    pub level_filter: LevelFilter,
}

impl TracingConfig {
    /// Logs at `DEBUG` level to `path`.
    pub fn new_file(path: impl Into<String>) -> Self {
        Self {
            log_file_path: path.into(),
            level_filter: LevelFilter::DEBUG,
        }
    }

    /// Decides whether logging is on for this process.
    ///
    /// - [`LOG_FILE_ENV_VAR`] wins if it is set (and non empty), so a user can turn on
    ///   logging for both the relay parent and the viewer child, which inherits the
    ///   environment.
    /// - Otherwise `--enable-logging` logs to [`DEFAULT_LOG_FILE_NAME`].
    #[must_use]
    pub fn from_flag_and_env(
        enable_logging: bool,
        maybe_env_log_file: Option<String>,
    ) -> Option<Self> {
        match maybe_env_log_file.filter(|it| !it.trim().is_empty()) {
            Some(path) => Some(Self::new_file(path)),
            None => enable_logging.then(|| Self::new_file(DEFAULT_LOG_FILE_NAME)),
        }
    }

    /// [`Self::from_flag_and_env()`] reading [`LOG_FILE_ENV_VAR`] from the process
    /// environment.
    #[must_use]
    pub fn from_flag_and_process_env(enable_logging: bool) -> Option<Self> {
        Self::from_flag_and_env(enable_logging, std::env::var(LOG_FILE_ENV_VAR).ok())
    }

    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { self.level_filter }

    #[must_use]
    pub fn get_log_file_path(&self) -> &str { &self.log_file_path }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_logging_off_by_default() {
        assert_eq!(TracingConfig::from_flag_and_env(false, None), None);
        assert_eq!(
            TracingConfig::from_flag_and_env(false, Some("  ".into())),
            None
        );
    }

    #[test]
    fn test_flag_uses_default_file() {
        let config = TracingConfig::from_flag_and_env(true, None).unwrap();
        assert_eq!(config.get_log_file_path(), "log.txt");
        assert_eq!(config.level_filter, LevelFilter::DEBUG);
    }

    #[test]
    fn test_env_var_overrides_flag() {
        let config =
            TracingConfig::from_flag_and_env(true, Some("/tmp/tl.log".into())).unwrap();
        assert_eq!(config.get_log_file_path(), "/tmp/tl.log");

        let config =
            TracingConfig::from_flag_and_env(false, Some("/tmp/tl.log".into())).unwrap();
        assert_eq!(config.get_log_file_path(), "/tmp/tl.log");
    }
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use clap::Parser;
use r3bl_tail::{CLIArg, ISSUES_URL, TracingConfig, launch,
                setup_default_miette_global_report_handler,
                try_initialize_logging_global};
use std::process::ExitCode;

fn main() -> miette::Result<ExitCode> {
    setup_default_miette_global_report_handler(ISSUES_URL);

    let cli_arg = CLIArg::parse();

    let maybe_tracing_config =
        TracingConfig::from_flag_and_process_env(cli_arg.global_options.enable_logging);
    let logging_enabled = maybe_tracing_config.is_some();
    if let Some(tracing_config) = maybe_tracing_config {
        try_initialize_logging_global(tracing_config).ok();
        // % is Display, ? is Debug.
        tracing::debug!(
            message = "Start logging...",
            cli_arg = ?cli_arg,
            pid = std::process::id()
        );
    }

    let exit_code = launch(&cli_arg)?;

    logging_enabled.then(|| {
        tracing::debug!(message = "Stop logging...");
    });

    Ok(exit_code)
}

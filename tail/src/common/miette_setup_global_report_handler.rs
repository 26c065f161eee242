// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Global [`miette`] report handler for `tl`.
//!
//! The hook is lazy: it only runs when a [`miette::Report`] is actually rendered, which
//! happens when `main() -> miette::Result<_>` returns an error. So the terminal width is
//! only queried if something goes wrong.

use miette::MietteHandlerOpts;

/// Fallback width when stderr isn't a terminal (eg: `tl < app.log 2> err.txt`).
const DEFAULT_REPORT_WIDTH: usize = 80;

/// Registers the graphical report handler, with `issues_url` as the footer.
///
/// Calling this more than once is harmless, later calls are ignored.
pub fn setup_default_miette_global_report_handler(issues_url: &'static str) {
    miette::set_hook(Box::new(move |_report| {
        let terminal_width = crossterm::terminal::size()
            .map_or(DEFAULT_REPORT_WIDTH, |(columns, _rows)| usize::from(columns));
        tracing::debug!(
            message = "miette::set_hook -> terminal_width",
            terminal_width
        );
        Box::new(
            MietteHandlerOpts::new()
                .width(terminal_width)
                .wrap_lines(true)
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .tab_width(4)
                .break_words(true)
                .with_cause_chain()
                .footer(issues_url.to_string())
                .build(),
        )
    }))
    .ok();
}

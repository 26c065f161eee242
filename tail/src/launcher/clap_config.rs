// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use clap::{Args, Parser};
use std::path::PathBuf;

/// More info: <https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_2/index.html>
#[derive(Debug, Parser)]
#[command(bin_name = "tl")]
#[command(about = "📜 View and tail log files, or anything piped in 💖")]
#[command(version)]
#[command(next_line_help = true)]
#[command(arg_required_else_help(false))]
/// More info: <https://docs.rs/clap/latest/clap/struct.Command.html#method.help_template>
#[command(
      /* cspell:disable-next-line */
      help_template = "{about}\nVersion: {bin} {version} 💻\n\nProvide file paths, separated by spaces, to follow in tl. Or pipe data in, eg: `kubectl logs -f pod | tl`.\nUSAGE 📓:\n  tl [\x1b[32mfile paths\x1b[0m] [\x1b[34moptions\x1b[0m]\n\n[options]\n{options}"
  )]
pub struct CLIArg {
    #[arg(name = "file paths")]
    pub file_paths: Vec<PathBuf>,

    #[arg(
        long,
        short = 'm',
        help = "Show all files as a single stream, in the order they were given."
    )]
    pub merge: bool,

    #[arg(
        long,
        short = 'o',
        value_name = "PATH",
        requires = "merge",
        help = "Write the merged stream to PATH on exit. Requires --merge."
    )]
    pub output_merge: Option<PathBuf>,

    #[command(flatten)]
    pub global_options: GlobalOption,
}

#[derive(Debug, Args)]
pub struct GlobalOption {
    #[arg(
        global = true,
        long,
        short = 'l',
        help = "Log app output to a file named `log.txt` for debugging. Set TL_LOG_FILE to pick another file."
    )]
    pub enable_logging: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_is_well_formed() { CLIArg::command().debug_assert(); }

    #[test]
    fn test_parse_files_and_flags() {
        let cli_arg =
            CLIArg::try_parse_from(["tl", "a.log", "b.log", "-m", "-o", "out.log", "-l"])
                .unwrap();
        assert_eq!(
            cli_arg.file_paths,
            vec![PathBuf::from("a.log"), PathBuf::from("b.log")]
        );
        assert!(cli_arg.merge);
        assert_eq!(cli_arg.output_merge, Some(PathBuf::from("out.log")));
        assert!(cli_arg.global_options.enable_logging);
    }

    #[test]
    fn test_no_args_is_valid() {
        let cli_arg = CLIArg::try_parse_from(["tl"]).unwrap();
        assert!(cli_arg.file_paths.is_empty());
        assert!(!cli_arg.merge);
        assert!(!cli_arg.global_options.enable_logging);
    }

    #[test]
    fn test_output_merge_requires_merge() {
        let result = CLIArg::try_parse_from(["tl", "a.log", "-o", "out.log"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }
}

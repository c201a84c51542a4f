//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Collect niconico comments posted within a period and count unique commenters.
///
/// Each DIR is a working directory holding `nicocc.toml` and, unless mylists
/// are configured, `videos.csv`. Directories are processed in order.
#[derive(Parser, Debug)]
#[command(name = "nicocc")]
#[command(author, version, about)]
pub struct Args {
    /// Working directories to process
    #[arg(required = true, value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// Increase stderr verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors on stderr
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the configuration of each directory (password masked) and exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_single_dir_parses_successfully() {
        let args = Args::try_parse_from(["nicocc", "work"]).unwrap();
        assert_eq!(args.dirs, vec![PathBuf::from("work")]);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.show_config);
    }

    #[test]
    fn test_cli_multiple_dirs_keep_order() {
        let args = Args::try_parse_from(["nicocc", "b", "a", "c"]).unwrap();
        assert_eq!(
            args.dirs,
            vec![PathBuf::from("b"), PathBuf::from("a"), PathBuf::from("c")]
        );
    }

    #[test]
    fn test_cli_missing_dir_returns_error() {
        let err = Args::try_parse_from(["nicocc"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["nicocc", "-vv", "work"]).unwrap();
        assert_eq!(args.verbose, 2);

        let args = Args::try_parse_from(["nicocc", "--verbose", "work"]).unwrap();
        assert_eq!(args.verbose, 1);
    }

    #[test]
    fn test_cli_quiet_and_show_config_flags() {
        let args = Args::try_parse_from(["nicocc", "-q", "--show-config", "work"]).unwrap();
        assert!(args.quiet);
        assert!(args.show_config);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["nicocc", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["nicocc", "--invalid-flag", "work"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}

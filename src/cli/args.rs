//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Course docs development supervisor CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Working tree root (default: current directory)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the dev server under the content-switching supervisor
    #[command(visible_alias = "d")]
    Dev {
        #[command(flatten)]
        args: DevArgs,
    },

    /// Synchronize course content into the working tree once
    #[command(visible_alias = "s")]
    Sync,

    /// Start the built-in dev server (used as the `stub` child)
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long, default_value = "127.0.0.1")]
        interface: std::net::IpAddr,

        /// Port number to listen on
        #[arg(short, long, default_value_t = crate::supervisor::DEFAULT_PORT)]
        port: u16,
    },
}

/// Arguments of the `dev` command.
#[derive(clap::Args, Debug, Clone)]
pub struct DevArgs {
    /// Child dev server to run (overrides COURSE_DOCS_SITE_DEV_INNER)
    #[arg(long, value_enum)]
    pub inner: Option<InnerKind>,

    /// Arguments forwarded to the child dev server.
    ///
    /// A `--port N` / `-p N` / `--port=N` among them selects the port the
    /// supervisor keeps the server on.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub forwarded: Vec<String>,
}

/// Which dev server the supervisor runs as its child.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerKind {
    /// The built-in `serve` command of this binary
    Stub,
    /// `npx next dev`
    Next,
}

impl InnerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stub => "stub",
            Self::Next => "next",
        }
    }

    /// Parse the `COURSE_DOCS_SITE_DEV_INNER` value.
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stub" => Some(Self::Stub),
            "next" => Some(Self::Next),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_dev_forwards_hyphen_args() {
        let cli = Cli::parse_from(["course-docs-dev", "dev", "--inner", "stub", "--", "--port", "4000"]);
        let Commands::Dev { args } = cli.command else {
            panic!("expected dev command");
        };
        assert_eq!(args.inner, Some(InnerKind::Stub));
        assert_eq!(args.forwarded, vec!["--port", "4000"]);
    }

    #[test]
    fn test_global_root() {
        let cli = Cli::parse_from(["course-docs-dev", "sync", "--root", "/tmp/site"]);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/site")));
        assert!(matches!(cli.command, Commands::Sync));
    }

    #[test]
    fn test_verbose_after_subcommand() {
        let cli = Cli::parse_from(["course-docs-dev", "serve", "-v", "-p", "4000"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Serve { port: 4000, .. }));
    }

    #[test]
    fn test_inner_from_env_value() {
        assert_eq!(InnerKind::from_env_value(" Stub "), Some(InnerKind::Stub));
        assert_eq!(InnerKind::from_env_value("next"), Some(InnerKind::Next));
        assert_eq!(InnerKind::from_env_value("vite"), None);
    }
}

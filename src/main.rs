//! course-docs-dev - content-switching dev server supervisor for course docs sites.

mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod serve;
mod source;
mod supervisor;
mod sync;
mod utils;
mod watch;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use serve::ServeOptions;

fn main() -> Result<()> {
    // Setup global Ctrl+C / SIGTERM handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let root = match &cli.root {
        Some(root) => std::path::absolute(root)
            .with_context(|| format!("invalid root {}", root.display()))?,
        None => std::env::current_dir().context("failed to read current directory")?,
    };

    let code = match &cli.command {
        Commands::Dev { args } => cli::dev::run_dev(&root, args)?,
        Commands::Sync => cli::sync::run_sync(&root)?,
        Commands::Serve { interface, port } => {
            serve::serve(ServeOptions::new(root, *interface, *port))?;
            0
        }
    };

    std::process::exit(code)
}

// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cmdharness`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cmdharness",
    version,
    about = "Run a command against a target project, capture its output and track the server it talks to.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If the default file is missing, built-in defaults are used.
    #[arg(long, value_name = "PATH", default_value = "Harness.toml")]
    pub config: PathBuf,

    /// Override the target root from the config.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Timeout for the command (e.g. "5s", "500ms").
    #[arg(long, value_name = "DURATION", conflicts_with = "no_timeout")]
    pub timeout: Option<String>,

    /// Wait for the command however long it takes.
    #[arg(long)]
    pub no_timeout: bool,

    /// Treat a non-zero exit status as an error.
    #[arg(long)]
    pub strict: bool,

    /// After the command, wait for the supervisor's children to exit.
    #[arg(long)]
    pub await_reload: bool,

    /// Run the configured stop command instead of COMMAND.
    #[arg(long, conflicts_with = "command")]
    pub stop: bool,

    /// Dump captured streams even when the command succeeds.
    #[arg(long)]
    pub debug: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CMDHARNESS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the resolved configuration and child environment, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Command line passed to `sh -c`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 1.., value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod process;
pub mod timing;
pub mod types;

use std::os::unix::process::ExitStatusExt;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{HarnessConfig, default_config_path, load_and_validate};
use crate::exec::Environment;

pub use crate::errors::HarnessError;
pub use crate::exec::Harness;
pub use crate::types::{Artifacts, CommandTimeout, StreamOutput};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, builds a [`Harness`], runs one command (or the stop
/// command) and optionally waits for the supervisor's children to exit.
/// Returns the exit code the binary should report.
pub async fn run(args: CliArgs) -> Result<i32> {
    let mut config = load_config(&args.config)?;
    if let Some(root) = args.root.clone() {
        config.root = root;
    }

    if args.dry_run {
        let env = Environment::from_current(&config.env, &config.root, &config.log_path());
        print_dry_run(&config, &env);
        return Ok(0);
    }

    let mut harness = Harness::new(config);
    if args.debug {
        harness.set_debug(true);
    }

    let artifacts = if args.stop {
        match harness.stop().await? {
            Some(artifacts) => artifacts,
            None => {
                info!("nothing to stop");
                return Ok(0);
            }
        }
    } else {
        if args.command.is_empty() {
            bail!("no command given (pass it after the options, e.g. `cmdharness -- bin/rails runner 1`)");
        }
        let command = args.command.join(" ");
        let timeout = resolve_timeout(&args)?;
        if args.strict {
            harness.run_strict(&command, timeout).await?
        } else {
            harness.run(&command, timeout).await?
        }
    };

    print!("{}", artifacts.stdout());
    eprint!("{}", artifacts.stderr());

    if args.await_reload {
        harness
            .await_reload()
            .await
            .context("waiting for application processes to exit")?;
        info!(pids = ?harness.application_pids(), "application processes exited");
    }

    Ok(exit_code(&artifacts))
}

/// Load `path`, falling back to built-in defaults when the *default* config
/// file does not exist. An explicitly named file must exist.
fn load_config(path: &Path) -> Result<HarnessConfig> {
    if !path.exists() && path == default_config_path().as_path() {
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(HarnessConfig::for_root("."));
    }
    load_and_validate(path).with_context(|| format!("loading config {}", path.display()))
}

fn resolve_timeout(args: &CliArgs) -> Result<CommandTimeout> {
    if args.no_timeout {
        return Ok(CommandTimeout::Unbounded);
    }
    match &args.timeout {
        Some(s) => s
            .parse::<CommandTimeout>()
            .map_err(|e| anyhow!("invalid --timeout: {e}")),
        None => Ok(CommandTimeout::Default),
    }
}

/// Shell convention: signal deaths map to `128 + signal`.
fn exit_code(artifacts: &Artifacts) -> i32 {
    artifacts
        .code()
        .or_else(|| artifacts.status.signal().map(|s| 128 + s))
        .unwrap_or(1)
}

/// Simple dry-run output: resolved paths, timeouts and child environment.
fn print_dry_run(cfg: &HarnessConfig, env: &Environment) {
    println!("cmdharness dry-run");
    println!("  root = {}", cfg.root.display());
    println!("  log_file = {}", cfg.log_path().display());
    match cfg.pid_path() {
        Some(p) => println!("  pid_file = {}", p.display()),
        None => println!("  pid_file = (none)"),
    }
    if let Some(cmd) = &cfg.stop_command {
        println!("  stop_command = {cmd}");
    }
    println!("  kill_on_timeout = {}", cfg.kill_on_timeout);
    println!();

    let t = &cfg.timeouts;
    println!("timeouts:");
    println!("  command = {:?} (ci: {:?})", t.command, t.command_ci);
    println!("  drain = {:?} (poll: {:?})", t.drain, t.drain_poll);
    println!("  reload = {:?} (poll: {:?})", t.reload, t.reload_poll);
    println!();

    println!("environment:");
    for (name, value) in env.iter() {
        match value {
            Some(v) => println!("  {name}={v}"),
            None => println!("  {name} (unset)"),
        }
    }

    debug!("dry-run complete (no execution)");
}

// src/exec/runner.rs

//! The command runner: one harness drives one target root, one command at a
//! time.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::errors::{HarnessError, Result};
use crate::exec::env::Environment;
use crate::exec::pipes::{Drained, StreamSet};
use crate::process::{NoSupervisor, PidFileLocator, SupervisorLocator, children_of, wait_for_exit};
use crate::timing::Timings;
use crate::types::{Artifacts, CommandTimeout};

/// Drives commands against a target root and observes their effects.
///
/// Every operation takes `&mut self`: the capture pipes are shared by all
/// invocations, so only one may be in flight per harness.
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    env: Environment,
    locator: Box<dyn SupervisorLocator>,
    streams: Option<StreamSet>,
    default_timeout: Duration,
    debug: bool,
    snapshot: Snapshot,
    timings: Option<Timings>,
}

/// Supervisor pid and its children as seen at the end of a run.
#[derive(Debug, Default)]
struct Snapshot {
    server_pid: Option<u32>,
    application_pids: Vec<u32>,
}

impl Snapshot {
    /// Best effort: a failed process table read keeps the previous pids.
    fn record(&mut self, server: u32, children: io::Result<Vec<u32>>) {
        self.server_pid = Some(server);
        match children {
            Ok(children) => {
                debug!(server, ?children, "supervisor snapshot taken");
                self.application_pids = children;
            }
            Err(e) => warn!(
                server,
                error = %e,
                kept = ?self.application_pids,
                "process table unreadable; keeping previous snapshot"
            ),
        }
    }
}

impl Harness {
    /// Build a harness from a validated config.
    ///
    /// The child environment is resolved here, once, from the current
    /// process environment. `CI` selects the CI command timeout and
    /// `HARNESS_DEBUG` turns on stream dumps.
    pub fn new(config: HarnessConfig) -> Self {
        let env = Environment::from_current(&config.env, &config.root, &config.log_path());
        let locator: Box<dyn SupervisorLocator> = match config.pid_path() {
            Some(path) => Box::new(PidFileLocator::new(path)),
            None => Box::new(NoSupervisor),
        };
        let default_timeout = config.timeouts.command_for(env_flag("CI"));
        let debug = config.debug || env_flag("HARNESS_DEBUG");

        Self {
            config,
            env,
            locator,
            streams: None,
            default_timeout,
            debug,
            snapshot: Snapshot::default(),
            timings: None,
        }
    }

    /// Replace the supervisor discovery mechanism.
    pub fn with_locator(mut self, locator: impl SupervisorLocator + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Resolve `rel` against the target root.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.config.path(rel)
    }

    pub fn exists(&self, rel: impl AsRef<Path>) -> bool {
        self.path(rel).exists()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn set_debug(&mut self, on: bool) {
        self.debug = on;
    }

    /// Supervisor pid seen at the end of the most recent run, if any.
    pub fn server_pid(&self) -> Option<u32> {
        self.snapshot.server_pid
    }

    /// Children of the supervisor captured at the end of the most recent run
    /// that found one.
    pub fn application_pids(&self) -> &[u32] {
        &self.snapshot.application_pids
    }

    /// The open timing series, `None` outside [`Harness::with_timing`].
    pub fn timings(&self) -> Option<&Timings> {
        self.timings.as_ref()
    }

    /// Run `command` through `sh -c` in the target root and capture its
    /// output.
    ///
    /// A non-zero exit is not an error here; see [`Harness::run_strict`].
    /// On timeout the wait is abandoned and, unless `kill_on_timeout` is
    /// configured, the child keeps running. A stream that is still being
    /// written when its drain deadline passes (a background writer holding
    /// the pipe) also ends in [`HarnessError::Timeout`].
    pub async fn run(
        &mut self,
        command: &str,
        timeout: impl Into<CommandTimeout>,
    ) -> Result<Artifacts> {
        let limit = match timeout.into() {
            CommandTimeout::Default => Some(self.default_timeout),
            CommandTimeout::After(d) => Some(d),
            CommandTimeout::Unbounded => None,
        };
        let poll = self.config.timeouts.drain_poll;
        let budget = self.config.timeouts.drain;

        let streams = match self.streams.take() {
            Some(s) => s,
            None => StreamSet::open(&self.config.log_path()).await?,
        };
        let streams = self.streams.insert(streams);

        let started = Instant::now();

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        self.env.apply(&mut cmd);
        cmd.current_dir(&self.config.root)
            .stdin(Stdio::null())
            .stdout(streams.stdout.child_end()?)
            .stderr(streams.stderr.child_end()?)
            .kill_on_drop(false);

        info!(cmd = %command, root = %self.config.root.display(), ?limit, "starting command");

        let mut child = cmd.spawn().map_err(|source| HarnessError::Launch {
            command: command.to_string(),
            source,
        })?;
        let pid = child.id();

        // Pipes are read while waiting so a chatty child never blocks on a
        // full pipe.
        let waited = streams
            .capture_while(async {
                match limit {
                    Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
                    None => Some(child.wait().await),
                }
            })
            .await?;

        let Some(status) = waited else {
            let limit = limit.unwrap_or_default();
            warn!(cmd = %command, ?pid, ?limit, "command timed out");
            if self.config.kill_on_timeout {
                if let Err(e) = child.start_kill() {
                    warn!(cmd = %command, ?pid, error = %e, "failed to kill timed-out command");
                }
            }
            let dump = streams.drain_all(poll, budget).await?.output.dump(command);
            return Err(HarnessError::Timeout {
                command: command.to_string(),
                timeout: limit,
                dump,
            });
        };
        let status = status?;

        if let Some(server) = self.locator.supervisor_pid() {
            self.snapshot.record(server, children_of(server));
        }

        let Drained { output, idle } = streams.drain_all(poll, budget).await?;
        if !idle {
            warn!(cmd = %command, ?pid, ?budget, "output still arriving at drain deadline");
            return Err(HarnessError::Timeout {
                command: command.to_string(),
                timeout: budget,
                dump: output.dump(command),
            });
        }
        let elapsed = started.elapsed();

        if let Some(timings) = self.timings.as_mut() {
            timings.record(elapsed);
        }

        info!(
            cmd = %command,
            ?pid,
            exit_code = ?status.code(),
            success = status.success(),
            elapsed_ms = elapsed.as_millis() as u64,
            "command exited"
        );

        let artifacts = Artifacts {
            command: command.to_string(),
            status,
            output,
        };
        if self.debug {
            eprint!("{}", artifacts.dump());
        }
        Ok(artifacts)
    }

    /// Like [`Harness::run`], but an unsuccessful exit status becomes
    /// [`HarnessError::NonZeroExit`] carrying the stream dump.
    pub async fn run_strict(
        &mut self,
        command: &str,
        timeout: impl Into<CommandTimeout>,
    ) -> Result<Artifacts> {
        let artifacts = self.run(command, timeout).await?;
        if artifacts.success() {
            Ok(artifacts)
        } else {
            Err(HarnessError::NonZeroExit {
                status: artifacts.status,
                dump: artifacts.dump(),
            })
        }
    }

    /// Run the configured stop command.
    ///
    /// A launch failure because something does not exist yet (no target root,
    /// no executable) is tolerated and yields `Ok(None)`, as does a harness
    /// without a stop command.
    pub async fn stop(&mut self) -> Result<Option<Artifacts>> {
        let Some(command) = self.config.stop_command.clone() else {
            debug!("no stop command configured");
            return Ok(None);
        };
        match self.run(&command, CommandTimeout::Default).await {
            Ok(artifacts) => Ok(Some(artifacts)),
            Err(e) if e.is_not_found() => {
                debug!(cmd = %command, error = %e, "stop command not available; ignoring");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Wait until every application pid captured by the last run has exited,
    /// using the configured reload timeout and poll interval.
    pub async fn await_reload(&self) -> Result<()> {
        wait_for_exit(
            &self.snapshot.application_pids,
            self.config.timeouts.reload,
            self.config.timeouts.reload_poll,
        )
        .await
    }

    /// Run `f` inside a timing session. Every run in the session records its
    /// elapsed time; the series is discarded when `f` returns, whether it
    /// succeeded or not.
    pub async fn with_timing<T, F>(&mut self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut Harness) -> Result<T>,
    {
        self.timings = Some(Timings::new());
        let result = f(&mut *self).await;
        self.timings = None;
        result
    }

    /// Print the dump of `artifacts` to stderr regardless of the debug flag.
    pub fn debug(&self, artifacts: &Artifacts) {
        eprint!("{}", artifacts.dump());
    }
}

/// A variable counts as set unless it is absent, empty, `0` or `false`.
fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(v) => !matches!(v.trim().to_lowercase().as_str(), "" | "0" | "false"),
        Err(_) => false,
    }
}

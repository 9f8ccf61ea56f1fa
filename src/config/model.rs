// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [harness]
/// root = "sample-app"
/// stop_command = "bin/server stop"
///
/// [timeouts]
/// command = "10s"
/// reload_poll = "100ms"
///
/// [env]
/// passthrough = ["PATH"]
/// unset = ["RAILS_ENV"]
///
/// [env.set]
/// GEM_HOME = "${ROOT}/../gems"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub harness: HarnessSection,

    #[serde(default)]
    pub timeouts: TimeoutsSection,

    #[serde(default)]
    pub env: EnvSection,
}

/// `[harness]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessSection {
    /// Target root. Relative paths are resolved against the directory of the
    /// config file by the loader.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Log file the child appends to, relative to `root`.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Pid file of the supervisor, relative to `root`. An empty string
    /// disables supervisor tracking.
    #[serde(default = "default_pid_file")]
    pub pid_file: Option<PathBuf>,

    /// Command that shuts the supervisor down.
    #[serde(default)]
    pub stop_command: Option<String>,

    /// Dump every invocation's streams to stderr.
    #[serde(default)]
    pub debug: bool,

    /// Kill the direct child when a command times out. Off by default: the
    /// child is left running and only the wait is abandoned.
    #[serde(default)]
    pub kill_on_timeout: bool,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("tmp/harness.log")
}

fn default_pid_file() -> Option<PathBuf> {
    Some(PathBuf::from("tmp/server.pid"))
}

impl Default for HarnessSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            log_file: default_log_file(),
            pid_file: default_pid_file(),
            stop_command: None,
            debug: false,
            kill_on_timeout: false,
        }
    }
}

/// `[timeouts]` section. Values are duration strings (`"500ms"`, `"10s"`).
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsSection {
    #[serde(default = "default_command_timeout")]
    pub command: String,

    /// Used instead of `command` when `CI` is set in the environment.
    #[serde(default = "default_command_ci_timeout")]
    pub command_ci: String,

    /// How long a single readiness wait lasts while draining a stream.
    #[serde(default = "default_drain_poll")]
    pub drain_poll: String,

    /// Upper bound on one stream's drain, however busy the writer is.
    #[serde(default = "default_drain_timeout")]
    pub drain: String,

    #[serde(default = "default_reload_timeout")]
    pub reload: String,

    #[serde(default = "default_reload_poll")]
    pub reload_poll: String,
}

fn default_command_timeout() -> String {
    "10s".to_string()
}

fn default_command_ci_timeout() -> String {
    "30s".to_string()
}

fn default_drain_poll() -> String {
    "500ms".to_string()
}

fn default_drain_timeout() -> String {
    "5s".to_string()
}

fn default_reload_timeout() -> String {
    "10s".to_string()
}

fn default_reload_poll() -> String {
    "100ms".to_string()
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            command: default_command_timeout(),
            command_ci: default_command_ci_timeout(),
            drain_poll: default_drain_poll(),
            drain: default_drain_timeout(),
            reload: default_reload_timeout(),
            reload_poll: default_reload_poll(),
        }
    }
}

/// `[env]` section: what the child process sees.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvSection {
    /// `HOME` override, relative to `root`. An empty string leaves `HOME` to
    /// passthrough.
    #[serde(default = "default_home")]
    pub home: Option<PathBuf>,

    /// Variable that carries the log file path to the child.
    #[serde(default = "default_log_var")]
    pub log_var: String,

    /// Variables copied from the caller's environment.
    #[serde(default = "default_passthrough")]
    pub passthrough: Vec<String>,

    /// Passthrough variables starting with any of these prefixes are dropped.
    #[serde(default = "default_scrub_prefixes")]
    pub scrub_prefixes: Vec<String>,

    /// Variables explicitly removed from the child's environment.
    #[serde(default)]
    pub unset: Vec<String>,

    /// Variables set for the child. `${ROOT}` expands to the target root.
    #[serde(default)]
    pub set: BTreeMap<String, String>,
}

fn default_home() -> Option<PathBuf> {
    Some(PathBuf::from("user_home"))
}

fn default_log_var() -> String {
    "HARNESS_LOG".to_string()
}

fn default_passthrough() -> Vec<String> {
    vec!["PATH".to_string()]
}

fn default_scrub_prefixes() -> Vec<String> {
    vec!["BUNDLE_".to_string(), "RUBYOPT".to_string(), "GEM_".to_string()]
}

impl Default for EnvSection {
    fn default() -> Self {
        Self {
            home: default_home(),
            log_var: default_log_var(),
            passthrough: default_passthrough(),
            scrub_prefixes: default_scrub_prefixes(),
            unset: Vec::new(),
            set: BTreeMap::new(),
        }
    }
}

/// Validated harness configuration.
///
/// Built from a [`RawConfigFile`] via `TryFrom` (see `validate.rs`), or with
/// [`HarnessConfig::for_root`] for programmatic use.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub root: PathBuf,
    pub log_file: PathBuf,
    pub pid_file: Option<PathBuf>,
    pub stop_command: Option<String>,
    pub debug: bool,
    pub kill_on_timeout: bool,
    pub timeouts: Timeouts,
    pub env: EnvSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub command: Duration,
    pub command_ci: Duration,
    pub drain_poll: Duration,
    pub drain: Duration,
    pub reload: Duration,
    pub reload_poll: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSpec {
    pub home: Option<PathBuf>,
    pub log_var: String,
    pub passthrough: Vec<String>,
    pub scrub_prefixes: Vec<String>,
    pub unset: Vec<String>,
    pub set: BTreeMap<String, String>,
}

impl HarnessConfig {
    pub(crate) fn new_unchecked(
        harness: HarnessSection,
        timeouts: Timeouts,
        env: EnvSection,
    ) -> Self {
        Self {
            root: harness.root,
            log_file: harness.log_file,
            pid_file: harness.pid_file,
            stop_command: harness.stop_command,
            debug: harness.debug,
            kill_on_timeout: harness.kill_on_timeout,
            timeouts,
            env: EnvSpec {
                home: env.home,
                log_var: env.log_var,
                passthrough: env.passthrough,
                scrub_prefixes: env.scrub_prefixes,
                unset: env.unset,
                set: env.set,
            },
        }
    }

    /// Default configuration targeting `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let harness = HarnessSection {
            root: root.into(),
            ..HarnessSection::default()
        };
        Self::new_unchecked(harness, Timeouts::default(), EnvSection::default())
    }

    /// Absolute (or root-relative) path of the log file.
    pub fn log_path(&self) -> PathBuf {
        self.root.join(&self.log_file)
    }

    pub fn pid_path(&self) -> Option<PathBuf> {
        self.pid_file.as_deref().map(|p| self.root.join(p))
    }

    /// Resolve a path relative to the target root.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command: Duration::from_secs(10),
            command_ci: Duration::from_secs(30),
            drain_poll: Duration::from_millis(500),
            drain: Duration::from_secs(5),
            reload: Duration::from_secs(10),
            reload_poll: Duration::from_millis(100),
        }
    }
}

impl Timeouts {
    /// The command timeout applicable to the current context.
    pub fn command_for(&self, ci: bool) -> Duration {
        if ci { self.command_ci } else { self.command }
    }
}

// src/types.rs

use std::fmt::Write as _;
use std::process::ExitStatus;
use std::str::FromStr;
use std::time::Duration;

use crate::config::duration::parse_duration;

/// How long a single invocation may run before the wait is abandoned.
///
/// - `Default`: the harness-wide timeout (longer when running under CI).
/// - `After`: an explicit limit for this invocation.
/// - `Unbounded`: no limit, for long setup commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandTimeout {
    #[default]
    Default,
    After(Duration),
    Unbounded,
}

impl From<Duration> for CommandTimeout {
    fn from(d: Duration) -> Self {
        CommandTimeout::After(d)
    }
}

impl FromStr for CommandTimeout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(CommandTimeout::Default),
            "none" | "never" | "unbounded" => Ok(CommandTimeout::Unbounded),
            other => parse_duration(other).map(CommandTimeout::After),
        }
    }
}

/// Text captured from the three streams at a command boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutput {
    pub stdout: String,
    pub stderr: String,
    pub log: String,
}

impl StreamOutput {
    fn named(&self) -> [(&'static str, &str); 3] {
        [
            ("stdout", self.stdout.as_str()),
            ("stderr", self.stderr.as_str()),
            ("log", self.log.as_str()),
        ]
    }

    /// Render the diagnostic block used by debug output and failures:
    ///
    /// ```text
    /// $ <command>
    /// --- stdout ---
    /// ...
    /// ```
    ///
    /// Streams that are empty after trimming trailing newlines are skipped.
    pub fn dump(&self, command: &str) -> String {
        let mut out = format!("$ {command}\n");
        for (name, text) in self.named() {
            let text = text.trim_end_matches(['\r', '\n']);
            if text.is_empty() {
                continue;
            }
            let _ = writeln!(out, "--- {name} ---");
            let _ = writeln!(out, "{text}");
        }
        out.push('\n');
        out
    }
}

/// Result of one command invocation. Created once per run and never
/// modified afterwards.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub command: String,
    pub status: ExitStatus,
    pub output: StreamOutput,
}

impl Artifacts {
    pub fn stdout(&self) -> &str {
        &self.output.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.output.stderr
    }

    pub fn log(&self) -> &str {
        &self.output.log
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, `None` if the child was terminated by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn dump(&self) -> String {
        self.output.dump(&self.command)
    }
}

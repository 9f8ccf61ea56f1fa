// src/process/supervisor.rs

//! Supervisor discovery.
//!
//! The harness does not start the supervisor itself; it only asks, after each
//! command, whether one is currently running. Absence is the normal state
//! before the first command that boots it.

use std::fmt::Debug;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::fs::{FileSystem, RealFileSystem};

/// Source of "current supervisor pid, or none".
pub trait SupervisorLocator: Send + Sync + Debug {
    fn supervisor_pid(&self) -> Option<u32>;
}

/// Locator for harnesses that drive no supervisor.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSupervisor;

impl SupervisorLocator for NoSupervisor {
    fn supervisor_pid(&self) -> Option<u32> {
        None
    }
}

/// Reads the supervisor pid from a pid file, fresh on every call.
#[derive(Debug, Clone)]
pub struct PidFileLocator<F: FileSystem = RealFileSystem> {
    fs: F,
    path: PathBuf,
}

impl PidFileLocator<RealFileSystem> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_fs(RealFileSystem, path)
    }
}

impl<F: FileSystem> PidFileLocator<F> {
    pub fn with_fs(fs: F, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl<F: FileSystem> SupervisorLocator for PidFileLocator<F> {
    fn supervisor_pid(&self) -> Option<u32> {
        if !self.fs.exists(&self.path) {
            return None;
        }
        // The file can disappear between the check and the read.
        let contents = match self.fs.read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "pid file unreadable");
                return None;
            }
        };
        match contents.trim().parse::<u32>() {
            Ok(pid) if pid > 0 => Some(pid),
            _ => {
                warn!(
                    path = %self.path.display(),
                    contents = %contents.trim(),
                    "pid file does not contain a valid pid"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn missing_pid_file_means_no_supervisor() {
        let locator = PidFileLocator::with_fs(MockFileSystem::new(), "/app/tmp/server.pid");
        assert_eq!(locator.supervisor_pid(), None);
    }

    #[test]
    fn pid_is_read_fresh_on_every_call() {
        let fs = MockFileSystem::new();
        let locator = PidFileLocator::with_fs(fs.clone(), "/app/tmp/server.pid");

        fs.add_file("/app/tmp/server.pid", "1234\n");
        assert_eq!(locator.supervisor_pid(), Some(1234));

        fs.add_file("/app/tmp/server.pid", "5678");
        assert_eq!(locator.supervisor_pid(), Some(5678));

        fs.remove_file("/app/tmp/server.pid");
        assert_eq!(locator.supervisor_pid(), None);
    }

    #[test]
    fn garbage_or_zero_is_ignored() {
        let fs = MockFileSystem::new();
        let locator = PidFileLocator::with_fs(fs.clone(), "server.pid");

        fs.add_file("server.pid", "not-a-pid");
        assert_eq!(locator.supervisor_pid(), None);

        fs.add_file("server.pid", "0");
        assert_eq!(locator.supervisor_pid(), None);
    }

    #[test]
    fn no_supervisor_never_answers() {
        assert_eq!(NoSupervisor.supervisor_pid(), None);
    }
}

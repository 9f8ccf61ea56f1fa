use std::path::{Path, PathBuf};

use cmdharness::config::{EnvSection, HarnessSection, RawConfigFile, TimeoutsSection};
use cmdharness::config::HarnessConfig;

/// Builder for `HarnessConfig` with test-friendly defaults: short poll
/// intervals and a generous command timeout.
pub struct HarnessConfigBuilder {
    config: RawConfigFile,
}

impl HarnessConfigBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            config: RawConfigFile {
                harness: HarnessSection {
                    root: root.as_ref().to_path_buf(),
                    ..HarnessSection::default()
                },
                timeouts: TimeoutsSection {
                    command: "20s".to_string(),
                    command_ci: "20s".to_string(),
                    drain_poll: "50ms".to_string(),
                    drain: "5s".to_string(),
                    reload: "5s".to_string(),
                    reload_poll: "10ms".to_string(),
                },
                env: EnvSection::default(),
            },
        }
    }

    pub fn log_file(mut self, path: &str) -> Self {
        self.config.harness.log_file = PathBuf::from(path);
        self
    }

    pub fn pid_file(mut self, path: Option<&str>) -> Self {
        self.config.harness.pid_file = path.map(PathBuf::from);
        self
    }

    pub fn stop_command(mut self, cmd: &str) -> Self {
        self.config.harness.stop_command = Some(cmd.to_string());
        self
    }

    pub fn kill_on_timeout(mut self, val: bool) -> Self {
        self.config.harness.kill_on_timeout = val;
        self
    }

    pub fn command_timeout(mut self, dur: &str) -> Self {
        self.config.timeouts.command = dur.to_string();
        self.config.timeouts.command_ci = dur.to_string();
        self
    }

    pub fn drain_poll(mut self, dur: &str) -> Self {
        self.config.timeouts.drain_poll = dur.to_string();
        self
    }

    pub fn drain_timeout(mut self, dur: &str) -> Self {
        self.config.timeouts.drain = dur.to_string();
        self
    }

    pub fn reload_timeout(mut self, dur: &str) -> Self {
        self.config.timeouts.reload = dur.to_string();
        self
    }

    pub fn set_env(mut self, name: &str, value: &str) -> Self {
        self.config.env.set.insert(name.to_string(), value.to_string());
        self
    }

    pub fn unset_env(mut self, name: &str) -> Self {
        self.config.env.unset.push(name.to_string());
        self
    }

    pub fn passthrough(mut self, name: &str) -> Self {
        self.config.env.passthrough.push(name.to_string());
        self
    }

    pub fn build(self) -> HarnessConfig {
        HarnessConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

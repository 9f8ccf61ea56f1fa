// src/config/validate.rs

use std::path::Path;
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{EnvSection, HarnessConfig, RawConfigFile, Timeouts, TimeoutsSection};
use crate::errors::{HarnessError, Result};

impl TryFrom<RawConfigFile> for HarnessConfig {
    type Error = HarnessError;

    fn try_from(mut raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        // TOML has no null: an empty string switches these off.
        if raw.harness.pid_file.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            raw.harness.pid_file = None;
        }
        if raw.env.home.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            raw.env.home = None;
        }

        let timeouts = parse_timeouts(&raw.timeouts)?;
        validate_paths(&raw)?;
        validate_env(&raw.env)?;
        Ok(HarnessConfig::new_unchecked(raw.harness, timeouts, raw.env))
    }
}

fn parse_timeouts(section: &TimeoutsSection) -> Result<Timeouts> {
    Ok(Timeouts {
        command: parse_positive("command", &section.command)?,
        command_ci: parse_positive("command_ci", &section.command_ci)?,
        drain_poll: parse_positive("drain_poll", &section.drain_poll)?,
        drain: parse_positive("drain", &section.drain)?,
        reload: parse_positive("reload", &section.reload)?,
        reload_poll: parse_positive("reload_poll", &section.reload_poll)?,
    })
}

fn parse_positive(key: &str, value: &str) -> Result<Duration> {
    let d = parse_duration(value)
        .map_err(|e| HarnessError::ConfigError(format!("[timeouts].{key}: {e}")))?;
    if d.is_zero() {
        return Err(HarnessError::ConfigError(format!(
            "[timeouts].{key} must be greater than zero"
        )));
    }
    Ok(d)
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    ensure_relative("log_file", &cfg.harness.log_file)?;
    if let Some(pid_file) = &cfg.harness.pid_file {
        ensure_relative("pid_file", pid_file)?;
    }
    if let Some(home) = &cfg.env.home {
        if home.is_absolute() {
            return Err(HarnessError::ConfigError(format!(
                "[env].home must be relative to the target root (got {})",
                home.display()
            )));
        }
    }
    if let Some(cmd) = &cfg.harness.stop_command {
        if cmd.trim().is_empty() {
            return Err(HarnessError::ConfigError(
                "[harness].stop_command must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn ensure_relative(key: &str, path: &Path) -> Result<()> {
    if path.is_absolute() || path.as_os_str().is_empty() {
        return Err(HarnessError::ConfigError(format!(
            "[harness].{key} must be a non-empty path relative to the target root (got {:?})",
            path
        )));
    }
    Ok(())
}

fn validate_env(env: &EnvSection) -> Result<()> {
    let names = std::iter::once(&env.log_var)
        .chain(env.passthrough.iter())
        .chain(env.unset.iter())
        .chain(env.set.keys());
    for name in names {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return Err(HarnessError::ConfigError(format!(
                "invalid environment variable name {:?}",
                name
            )));
        }
    }

    for name in env.unset.iter() {
        if env.set.contains_key(name) {
            return Err(HarnessError::ConfigError(format!(
                "environment variable '{}' is both set and unset in [env]",
                name
            )));
        }
    }
    Ok(())
}

// src/errors.rs

//! Crate-wide error type and result alias.

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The command could not be spawned at all.
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The child did not exit within the timeout, or a stream was still
    /// being written when its drain deadline passed. `dump` holds whatever
    /// the streams contained when the harness gave up.
    #[error("timed out after {timeout:?} while running command:\n\n{dump}")]
    Timeout {
        command: String,
        timeout: Duration,
        dump: String,
    },

    /// Strict run observed an unsuccessful exit status.
    #[error("command failed ({status}):\n\n{dump}")]
    NonZeroExit { status: ExitStatus, dump: String },

    /// Reload waiting was requested without a captured pid snapshot.
    #[error("no application pids captured; run a command against a live supervisor first")]
    NoPids,

    #[error("timed out after {timeout:?} waiting for pids {alive:?} to exit")]
    ReloadTimeout { alive: Vec<u32>, timeout: Duration },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HarnessError {
    /// True for a launch failure caused by a missing executable or working
    /// directory.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HarnessError::Launch { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HarnessError>;

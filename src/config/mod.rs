// src/config/mod.rs

//! Configuration loading and validation for the harness.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate it into a typed [`HarnessConfig`] (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    EnvSection, EnvSpec, HarnessConfig, HarnessSection, RawConfigFile, Timeouts, TimeoutsSection,
};

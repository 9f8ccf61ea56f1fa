// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`runner`] owns the [`Harness`]: spawn, bounded wait, supervisor
//!   snapshot, capture.
//! - [`pipes`] holds the per-harness stdout/stderr pipes and log handle.
//! - [`stream`] drains a stream until it goes idle or a deadline passes.
//! - [`env`] resolves the environment handed to children.

pub mod env;
pub mod pipes;
pub mod runner;
pub mod stream;

pub use env::Environment;
pub use runner::Harness;
pub use stream::{DrainEnd, drain};

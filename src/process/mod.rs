// src/process/mod.rs

//! OS process inspection.
//!
//! - [`tree`] enumerates the direct children of a pid from the process table.
//! - [`liveness`] probes pids and waits for a snapshot of them to exit.
//! - [`supervisor`] discovers the pid of the long-lived server under test.

pub mod liveness;
pub mod supervisor;
pub mod tree;

pub use liveness::{is_alive, wait_for_exit};
pub use supervisor::{NoSupervisor, PidFileLocator, SupervisorLocator};
pub use tree::children_of;

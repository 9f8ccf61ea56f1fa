use std::sync::{Arc, Mutex};

use cmdharness::process::SupervisorLocator;

/// A supervisor locator whose answer the test controls.
///
/// Clones share state, so a test can hand one clone to the harness and keep
/// another to point it at a different pid (or at none) between runs.
#[derive(Debug, Clone, Default)]
pub struct FixedLocator {
    pid: Arc<Mutex<Option<u32>>>,
    lookups: Arc<Mutex<usize>>,
}

impl FixedLocator {
    pub fn new(pid: Option<u32>) -> Self {
        Self {
            pid: Arc::new(Mutex::new(pid)),
            lookups: Arc::new(Mutex::new(0)),
        }
    }

    pub fn set(&self, pid: Option<u32>) {
        *self.pid.lock().unwrap() = pid;
    }

    /// How many times the harness asked for the supervisor pid.
    pub fn lookups(&self) -> usize {
        *self.lookups.lock().unwrap()
    }
}

impl SupervisorLocator for FixedLocator {
    fn supervisor_pid(&self) -> Option<u32> {
        *self.lookups.lock().unwrap() += 1;
        *self.pid.lock().unwrap()
    }
}

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use cmdharness::Harness;
use cmdharness::process::children_of;

pub use cmdharness_test_utils::builders::HarnessConfigBuilder;
pub use cmdharness_test_utils::fake_supervisor::FixedLocator;
pub use cmdharness_test_utils::{init_tracing, with_timeout};

/// Harness rooted at `dir` with no supervisor tracking.
pub fn harness_in(dir: &Path) -> Harness {
    Harness::new(HarnessConfigBuilder::new(dir).pid_file(None).build())
}

/// Poll until `pid` has exactly `n` children, or give up after 5 seconds.
pub async fn wait_for_children(pid: u32, n: usize) -> Vec<u32> {
    for _ in 0..500 {
        let children = children_of(pid).unwrap();
        if children.len() == n {
            return children;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pid {pid} never reached {n} children");
}

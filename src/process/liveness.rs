// src/process/liveness.rs

//! Liveness probing and the reload wait built on top of it.

use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::errors::{HarnessError, Result};

/// Non-destructive probe (signal 0). Only "no such process" counts as dead;
/// any other answer, including a permission error, means the pid exists.
pub fn is_alive(pid: u32) -> bool {
    // 0 and values beyond i32 would address process groups, not a process.
    let raw = match i32::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => return false,
    };
    !matches!(kill(Pid::from_raw(raw), None), Err(Errno::ESRCH))
}

/// Block until every pid in `pids` has exited, polling every `poll`.
///
/// An empty `pids` is a caller error ([`HarnessError::NoPids`]), reported
/// before any polling happens. Pids still alive after `timeout` are listed in
/// [`HarnessError::ReloadTimeout`].
pub async fn wait_for_exit(pids: &[u32], timeout: Duration, poll: Duration) -> Result<()> {
    if pids.is_empty() {
        return Err(HarnessError::NoPids);
    }

    let deadline = Instant::now() + timeout;
    debug!(?pids, ?timeout, "waiting for pids to exit");

    loop {
        let alive: Vec<u32> = pids.iter().copied().filter(|&p| is_alive(p)).collect();
        if alive.is_empty() {
            info!(?pids, "all awaited pids have exited");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(HarnessError::ReloadTimeout { alive, timeout });
        }
        sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(is_alive(std::process::id()));
    }

    #[test]
    fn group_addressing_pids_are_never_alive() {
        assert!(!is_alive(0));
        assert!(!is_alive(u32::MAX));
    }

    #[tokio::test]
    async fn empty_pid_set_is_a_contract_violation() {
        let err = wait_for_exit(&[], Duration::from_secs(5), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::NoPids));
    }

    #[tokio::test]
    async fn live_pid_times_out() {
        let me = std::process::id();
        let err = wait_for_exit(&[me], Duration::from_millis(50), Duration::from_millis(10))
            .await
            .unwrap_err();
        match err {
            HarnessError::ReloadTimeout { alive, .. } => assert_eq!(alive, vec![me]),
            other => panic!("expected ReloadTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn returns_once_children_exit() {
        let mut child = tokio::process::Command::new("sleep")
            .arg("0.2")
            .spawn()
            .unwrap();
        let pid = child.id().unwrap();
        // Reap in the background so the pid does not linger as a zombie.
        let reaper = tokio::spawn(async move { child.wait().await });

        wait_for_exit(&[pid], Duration::from_secs(5), Duration::from_millis(10))
            .await
            .unwrap();
        assert!(reaper.await.unwrap().unwrap().success());
    }
}

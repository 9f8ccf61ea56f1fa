// tests/reload_waiter.rs
mod common;
use crate::common::{init_tracing, wait_for_children, with_timeout, FixedLocator, HarnessConfigBuilder};

use std::collections::HashSet;
use std::error::Error;
use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command};

use cmdharness::process::{children_of, is_alive};
use cmdharness::{CommandTimeout, Harness, HarnessError};

type TestResult = Result<(), Box<dyn Error>>;

/// A stand-in supervisor: a shell with two sleeping children that it reaps.
async fn spawn_supervisor() -> (Child, u32, Vec<u32>) {
    let child = Command::new("sh")
        .arg("-c")
        .arg("sleep 30 & sleep 30 & wait")
        .kill_on_drop(true)
        .spawn()
        .unwrap();
    let pid = child.id().unwrap();
    let mut workers = wait_for_children(pid, 2).await;
    workers.sort_unstable();
    (child, pid, workers)
}

fn terminate(pids: &[u32]) {
    for &pid in pids {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }
}

#[tokio::test]
async fn children_of_lists_both_workers() -> TestResult {
    init_tracing();
    let (mut supervisor, pid, workers) = spawn_supervisor().await;

    let listed: HashSet<u32> = children_of(pid)?.into_iter().collect();
    let expected: HashSet<u32> = workers.iter().copied().collect();
    assert_eq!(listed, expected);

    terminate(&workers);
    supervisor.wait().await?;
    Ok(())
}

#[tokio::test]
async fn run_snapshots_supervisor_children_and_awaits_their_exit() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let (mut supervisor, pid, workers) = spawn_supervisor().await;

    let locator = FixedLocator::new(Some(pid));
    let config = HarnessConfigBuilder::new(dir.path()).pid_file(None).build();
    let mut harness = Harness::new(config).with_locator(locator.clone());

    harness.run("true", CommandTimeout::Default).await?;
    assert_eq!(locator.lookups(), 1);
    assert_eq!(harness.server_pid(), Some(pid));
    let mut snapshot = harness.application_pids().to_vec();
    snapshot.sort_unstable();
    assert_eq!(snapshot, workers);

    terminate(&workers);
    with_timeout(harness.await_reload()).await?;
    assert!(workers.iter().all(|&p| !is_alive(p)));

    supervisor.wait().await?;
    Ok(())
}

#[tokio::test]
async fn live_children_past_timeout_raise_reload_timeout() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let (mut supervisor, pid, workers) = spawn_supervisor().await;

    let config = HarnessConfigBuilder::new(dir.path())
        .pid_file(None)
        .reload_timeout("200ms")
        .build();
    let mut harness = Harness::new(config).with_locator(FixedLocator::new(Some(pid)));
    harness.run("true", CommandTimeout::Default).await?;

    match harness.await_reload().await {
        Err(HarnessError::ReloadTimeout { alive, timeout }) => {
            assert_eq!(timeout, Duration::from_millis(200));
            let alive: HashSet<u32> = alive.into_iter().collect();
            assert_eq!(alive, workers.iter().copied().collect::<HashSet<u32>>());
        }
        other => panic!("expected ReloadTimeout, got {other:?}"),
    }

    terminate(&workers);
    supervisor.wait().await?;
    Ok(())
}

#[tokio::test]
async fn await_reload_without_snapshot_is_a_contract_violation() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let locator = FixedLocator::new(None);
    let config = HarnessConfigBuilder::new(dir.path()).pid_file(None).build();
    let mut harness = Harness::new(config).with_locator(locator);

    assert!(matches!(harness.await_reload().await, Err(HarnessError::NoPids)));

    harness.run("true", CommandTimeout::Default).await?;
    assert_eq!(harness.server_pid(), None);
    assert!(matches!(harness.await_reload().await, Err(HarnessError::NoPids)));
    Ok(())
}

#[tokio::test]
async fn supervisor_appearing_later_is_picked_up_and_kept() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let (mut supervisor, pid, workers) = spawn_supervisor().await;

    let locator = FixedLocator::new(None);
    let config = HarnessConfigBuilder::new(dir.path()).pid_file(None).build();
    let mut harness = Harness::new(config).with_locator(locator.clone());

    harness.run("true", CommandTimeout::Default).await?;
    assert_eq!(harness.server_pid(), None);

    locator.set(Some(pid));
    harness.run("true", CommandTimeout::Default).await?;
    assert_eq!(harness.server_pid(), Some(pid));
    let mut snapshot = harness.application_pids().to_vec();
    snapshot.sort_unstable();
    assert_eq!(snapshot, workers);

    // Losing sight of the supervisor does not discard the snapshot.
    locator.set(None);
    harness.run("true", CommandTimeout::Default).await?;
    assert_eq!(harness.server_pid(), Some(pid));
    assert_eq!(harness.application_pids().len(), workers.len());
    assert_eq!(locator.lookups(), 3);

    terminate(&workers);
    with_timeout(harness.await_reload()).await?;
    supervisor.wait().await?;
    Ok(())
}

#[tokio::test]
async fn supervisor_is_discovered_through_pid_file() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let (mut supervisor, pid, workers) = spawn_supervisor().await;

    let config = HarnessConfigBuilder::new(dir.path())
        .pid_file(Some("tmp/server.pid"))
        .build();
    let mut harness = Harness::new(config);

    // No pid file yet: nothing is tracked.
    harness.run("true", CommandTimeout::Default).await?;
    assert_eq!(harness.server_pid(), None);

    // The command itself publishes the pid, as a booting server would.
    harness
        .run(&format!("mkdir -p tmp && echo {pid} > tmp/server.pid"), CommandTimeout::Default)
        .await?;
    assert_eq!(harness.server_pid(), Some(pid));
    assert_eq!(harness.application_pids().len(), workers.len());

    terminate(&workers);
    harness.await_reload().await?;
    supervisor.wait().await?;
    Ok(())
}

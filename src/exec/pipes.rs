// src/exec/pipes.rs

//! Capture channels owned by a harness: one pipe for stdout, one for stderr,
//! and a read handle on the log file.
//!
//! They are opened once and reused by every invocation. Each child receives
//! duplicates of the pipe write ends; the harness keeps the originals open,
//! so a drain ends on idleness rather than end-of-file. Two invocations must
//! never share the set concurrently.
//!
//! While a child runs, both pipes are read into per-pipe buffers so a child
//! writing more than the pipe capacity never blocks. The final drain after
//! exit appends to those buffers.

use std::future::Future;
use std::io;
use std::os::fd::OwnedFd;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncReadExt;
use tokio::net::unix::pipe;
use tokio::time::Instant;
use tracing::debug;

use crate::exec::stream::{CHUNK_SIZE, DrainEnd, decode, drain};
use crate::types::StreamOutput;

#[derive(Debug)]
pub struct OutputPipe {
    reader: pipe::Receiver,
    writer: OwnedFd,
    buffered: Vec<u8>,
}

impl OutputPipe {
    pub fn open() -> io::Result<Self> {
        let (sender, reader) = pipe::pipe()?;
        // Children get blocking descriptors; only our read end is async.
        let writer = sender.into_blocking_fd()?;
        Ok(Self {
            reader,
            writer,
            buffered: Vec::new(),
        })
    }

    /// A fresh duplicate of the write end for one child.
    pub fn child_end(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.writer.try_clone()?))
    }

    /// Drain the pipe after whatever was buffered during the run, and hand
    /// back the whole text, clearing the buffer.
    pub async fn drain(&mut self, poll: Duration, deadline: Instant) -> io::Result<(String, DrainEnd)> {
        let end = drain(&mut self.reader, &mut self.buffered, poll, deadline).await?;
        Ok((decode(std::mem::take(&mut self.buffered)), end))
    }
}

/// Result of [`StreamSet::drain_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drained {
    pub output: StreamOutput,
    /// False when at least one stream was still producing at its deadline.
    pub idle: bool,
}

enum Step<T> {
    Done(T),
    Stdout(io::Result<usize>),
    Stderr(io::Result<usize>),
}

#[derive(Debug)]
pub struct StreamSet {
    pub stdout: OutputPipe,
    pub stderr: OutputPipe,
    log: File,
}

impl StreamSet {
    /// Create both pipes and open `log_path` read/write, creating it and its
    /// parent directory if needed. Existing log content is truncated.
    pub async fn open(log_path: &Path) -> io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let log = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(log_path)
            .await?;

        debug!(log = %log_path.display(), "capture streams opened");

        Ok(Self {
            stdout: OutputPipe::open()?,
            stderr: OutputPipe::open()?,
            log,
        })
    }

    /// Drive `fut` to completion while buffering everything arriving on the
    /// stdout and stderr pipes.
    pub async fn capture_while<F: Future>(&mut self, fut: F) -> io::Result<F::Output> {
        tokio::pin!(fut);
        let mut out_chunk = vec![0u8; CHUNK_SIZE];
        let mut err_chunk = vec![0u8; CHUNK_SIZE];
        let (mut out_open, mut err_open) = (true, true);

        loop {
            let step = tokio::select! {
                biased;
                done = &mut fut => Step::Done(done),
                r = self.stdout.reader.read(&mut out_chunk), if out_open => Step::Stdout(r),
                r = self.stderr.reader.read(&mut err_chunk), if err_open => Step::Stderr(r),
            };
            match step {
                Step::Done(done) => return Ok(done),
                Step::Stdout(r) => match r {
                    Ok(0) => out_open = false,
                    Ok(n) => self.stdout.buffered.extend_from_slice(&out_chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                },
                Step::Stderr(r) => match r {
                    Ok(0) => err_open = false,
                    Ok(n) => self.stderr.buffered.extend_from_slice(&err_chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                },
            }
        }
    }

    /// Drain stdout, stderr and the log file, in that order. Each stream gets
    /// at most `budget` before it is cut off.
    pub async fn drain_all(&mut self, poll: Duration, budget: Duration) -> io::Result<Drained> {
        let (stdout, out_end) = self.stdout.drain(poll, Instant::now() + budget).await?;
        let (stderr, err_end) = self.stderr.drain(poll, Instant::now() + budget).await?;

        let mut log = Vec::new();
        let log_end = drain(&mut self.log, &mut log, poll, Instant::now() + budget).await?;

        Ok(Drained {
            output: StreamOutput {
                stdout,
                stderr,
                log: decode(log),
            },
            idle: [out_end, err_end, log_end].iter().all(|e| *e == DrainEnd::Idle),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const POLL: Duration = Duration::from_millis(50);
    const BUDGET: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn log_file_is_created_with_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("tmp/nested/harness.log");

        let mut set = StreamSet::open(&log_path).await.unwrap();
        assert!(log_path.exists());

        let drained = set.drain_all(POLL, BUDGET).await.unwrap();
        assert!(drained.idle);
        assert_eq!(drained.output, StreamOutput::default());
    }

    #[tokio::test]
    async fn log_reads_resume_where_the_last_drain_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("harness.log");
        let mut set = StreamSet::open(&log_path).await.unwrap();

        let mut appender = std::fs::OpenOptions::new()
            .append(true)
            .open(&log_path)
            .unwrap();
        writeln!(appender, "first").unwrap();
        assert_eq!(set.drain_all(POLL, BUDGET).await.unwrap().output.log, "first\n");

        writeln!(appender, "second").unwrap();
        assert_eq!(set.drain_all(POLL, BUDGET).await.unwrap().output.log, "second\n");
    }

    #[tokio::test]
    async fn output_written_while_waiting_is_kept_ahead_of_later_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = StreamSet::open(&dir.path().join("harness.log")).await.unwrap();

        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg("printf 'one '; printf 'oops' >&2")
            .stdout(set.stdout.child_end().unwrap())
            .stderr(set.stderr.child_end().unwrap())
            .spawn()
            .unwrap();

        let status = set
            .capture_while(async {
                let status = child.wait().await;
                // Give the reader a chance to pick the bytes up before exit
                // is reported.
                tokio::time::sleep(Duration::from_millis(100)).await;
                status
            })
            .await
            .unwrap()
            .unwrap();
        assert!(status.success());

        let mut late = std::fs::File::from(set.stdout.writer.try_clone().unwrap());
        late.write_all(b"two").unwrap();

        let drained = set.drain_all(POLL, BUDGET).await.unwrap();
        assert_eq!(drained.output.stdout, "one two");
        assert_eq!(drained.output.stderr, "oops");
    }
}

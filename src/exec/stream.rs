// src/exec/stream.rs

//! Idle-terminated, deadline-bounded stream draining.
//!
//! A drain reads whatever a stream has ready and stops the first time a
//! readiness wait of `poll` passes with nothing to read, or when the stream
//! reports end-of-data. A writer that never goes quiet cannot hold it past
//! `deadline`. Anything written after the drain returns is picked up by the
//! next drain.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, timeout};
use tracing::trace;

/// Largest single read.
pub const CHUNK_SIZE: usize = 10240;

/// Why a drain stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainEnd {
    /// The stream went idle for a full poll interval or reached end-of-data.
    Idle,
    /// The stream was still producing when the deadline passed.
    Deadline,
}

/// Append everything `stream` yields to `buf` until it goes idle for `poll`,
/// hits end-of-data, or `deadline` passes.
///
/// Bytes are kept raw so the caller decodes once, after the last read, and
/// multi-byte characters split across reads survive.
pub async fn drain<R>(
    stream: &mut R,
    buf: &mut Vec<u8>,
    poll: Duration,
    deadline: Instant,
) -> io::Result<DrainEnd>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let start_len = buf.len();

    let end = loop {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break DrainEnd::Deadline;
        }
        let wait = poll.min(left);
        match timeout(wait, stream.read(&mut chunk)).await {
            // A full poll window with nothing ready means idle; a shortened
            // one means the deadline cut it off.
            Err(_) if wait == poll => break DrainEnd::Idle,
            Err(_) => break DrainEnd::Deadline,
            Ok(Ok(0)) => break DrainEnd::Idle,
            Ok(Ok(n)) => buf.extend_from_slice(&chunk[..n]),
            Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
            Ok(Err(e)) => return Err(e),
        }
    };

    trace!(bytes = buf.len() - start_len, ?end, "stream drained");
    Ok(end)
}

/// Lossy UTF-8 decode of a finished drain buffer.
pub fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

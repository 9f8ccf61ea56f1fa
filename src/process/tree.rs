// src/process/tree.rs

//! Direct-children lookup against the live process table.
//!
//! Linux reads `/proc/<pid>/stat`; other Unix systems fall back to parsing
//! `ps -A -o ppid= -o pid=`. Nothing is cached: every call reflects the table
//! at call time.

use std::io;

use tracing::trace;

/// One row of the process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcEntry {
    pub pid: u32,
    pub ppid: u32,
}

/// Pids whose parent is `pid`, in the order the process table lists them.
///
/// An unknown pid, or one without children, yields an empty vector.
pub fn children_of(pid: u32) -> io::Result<Vec<u32>> {
    let table = read_process_table()?;
    let children = children_in(&table, pid);
    trace!(pid, ?children, "process table scanned");
    Ok(children)
}

/// Filter a process table snapshot for the children of `pid`.
pub fn children_in(table: &[ProcEntry], pid: u32) -> Vec<u32> {
    table
        .iter()
        .filter(|e| e.ppid == pid && e.pid != pid)
        .map(|e| e.pid)
        .collect()
}

/// Parse the contents of `/proc/<pid>/stat`.
///
/// The command name sits in parentheses and may itself contain spaces or
/// parentheses, so fields are split after the *last* `)`.
pub fn parse_stat(contents: &str) -> Option<ProcEntry> {
    let open = contents.find('(')?;
    let close = contents.rfind(')')?;
    if close < open {
        return None;
    }
    let pid = contents[..open].trim().parse().ok()?;
    let mut fields = contents[close + 1..].split_whitespace();
    let _state = fields.next()?;
    let ppid = fields.next()?.parse().ok()?;
    Some(ProcEntry { pid, ppid })
}

/// Parse `ps -A -o ppid= -o pid=` output. Malformed lines are skipped.
pub fn parse_ps_output(output: &str) -> Vec<ProcEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let ppid = cols.next()?.parse().ok()?;
            let pid = cols.next()?.parse().ok()?;
            Some(ProcEntry { pid, ppid })
        })
        .collect()
}

#[cfg(target_os = "linux")]
fn read_process_table() -> io::Result<Vec<ProcEntry>> {
    let mut table = Vec::new();
    for entry in std::fs::read_dir("/proc")? {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        // Processes can exit between listing and reading.
        let Ok(stat) = std::fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };
        match parse_stat(&stat) {
            Some(row) => table.push(row),
            None => trace!(pid, "unparseable stat entry skipped"),
        }
    }
    Ok(table)
}

#[cfg(not(target_os = "linux"))]
fn read_process_table() -> io::Result<Vec<ProcEntry>> {
    let out = std::process::Command::new("ps")
        .args(["-A", "-o", "ppid=", "-o", "pid="])
        .output()?;
    if !out.status.success() {
        return Err(io::Error::other(format!("ps exited with {}", out.status)));
    }
    Ok(parse_ps_output(&String::from_utf8_lossy(&out.stdout)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stat_handles_parens_in_command_name() {
        let row = parse_stat("4242 (weird (name) x) S 17 4242 4242 0 -1").unwrap();
        assert_eq!(row, ProcEntry { pid: 4242, ppid: 17 });
    }

    #[test]
    fn parse_stat_rejects_truncated_input() {
        assert_eq!(parse_stat("12 (sh)"), None);
        assert_eq!(parse_stat("garbage"), None);
    }

    #[test]
    fn parse_ps_output_skips_malformed_lines() {
        let rows = parse_ps_output("    1   10\n  10 11\nPPID PID\n\n 10  12\n");
        assert_eq!(
            rows,
            vec![
                ProcEntry { pid: 10, ppid: 1 },
                ProcEntry { pid: 11, ppid: 10 },
                ProcEntry { pid: 12, ppid: 10 },
            ]
        );
    }

    #[test]
    fn children_in_keeps_table_order_and_direct_only() {
        let table = [
            ProcEntry { pid: 30, ppid: 10 },
            ProcEntry { pid: 20, ppid: 10 },
            ProcEntry { pid: 40, ppid: 30 },
        ];
        assert_eq!(children_in(&table, 10), vec![30, 20]);
        assert!(children_in(&table, 99).is_empty());
    }

    #[test]
    fn unknown_pid_has_no_children() {
        let children = children_of(u32::MAX - 1).unwrap();
        assert!(children.is_empty());
    }

    #[test]
    fn lists_spawned_children_of_current_process() {
        let mut a = std::process::Command::new("sleep").arg("5").spawn().unwrap();
        let mut b = std::process::Command::new("sleep").arg("5").spawn().unwrap();

        let children = children_of(std::process::id()).unwrap();

        let _ = a.kill();
        let _ = b.kill();
        let _ = a.wait();
        let _ = b.wait();

        assert!(children.contains(&a.id()), "{children:?} missing {}", a.id());
        assert!(children.contains(&b.id()), "{children:?} missing {}", b.id());
    }
}

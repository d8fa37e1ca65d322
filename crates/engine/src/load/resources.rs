//! Best-effort process resource sampling.
//!
//! Reads `/proc/self`; on platforms without procfs every sample is `None`.

use readyprobe_report_schema::ResourceDelta;

/// Kernel clock ticks per second assumed when converting CPU times.
const CLOCK_TICKS_PER_SEC: i64 = 100;

/// Resource usage of the engine process at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSnapshot {
    pub rss_kb: i64,
    pub cpu_time_ms: i64,
}

impl ResourceSnapshot {
    /// Sample the current process.
    pub fn capture() -> Option<Self> {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        let stat = std::fs::read_to_string("/proc/self/stat").ok()?;
        Some(Self {
            rss_kb: parse_rss_kb(&status)?,
            cpu_time_ms: parse_cpu_time_ms(&stat)?,
        })
    }

    /// Delta from `self` (before) to `after`.
    pub fn delta_to(&self, after: &ResourceSnapshot) -> ResourceDelta {
        ResourceDelta {
            memory_kb: after.rss_kb - self.rss_kb,
            cpu_time_ms: after.cpu_time_ms - self.cpu_time_ms,
        }
    }
}

/// Extract `VmRSS` (KiB) from `/proc/<pid>/status` content.
pub fn parse_rss_kb(status: &str) -> Option<i64> {
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|value| value.parse().ok())
}

/// Extract utime + stime (ms) from `/proc/<pid>/stat` content.
pub fn parse_cpu_time_ms(stat: &str) -> Option<i64> {
    // The command name may contain spaces; fields after it are positional.
    let after_comm = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    // utime and stime are fields 14 and 15 overall, 12 and 13 after comm.
    let utime: i64 = fields.get(11)?.parse().ok()?;
    let stime: i64 = fields.get(12)?.parse().ok()?;
    Some((utime + stime) * 1000 / CLOCK_TICKS_PER_SEC)
}

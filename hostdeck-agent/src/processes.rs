//! Top processes by CPU usage
//!
//! Walks the numeric entries of the process tree and derives per-process CPU
//! and memory shares from `<pid>/stat` and `<pid>/statm`. Processes exit
//! while the scan runs; a pid that cannot be read is skipped, not reported.

use crate::config::{KernelPaths, TelemetryConfig};
use crate::error::ProbeError;
use crate::metrics::procfs::{self, MemInfo};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// Kernel worker threads are noise on a dashboard.
const KERNEL_THREAD_PREFIXES: &[&str] = &["kworker", "migration", "rcu_", "ksoftirqd"];

const MAX_NAME_CHARS: usize = 20;

/// Clock ticks per second assumed for `stat` times.
const TICKS_PER_SEC: f64 = 100.0;

/// One ranked process, as served by `/api/processes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSample {
    pub pid: String,
    pub name: String,
    #[serde(rename = "cpu")]
    pub cpu_percent: f64,
    #[serde(rename = "mem")]
    pub mem_percent: f64,
}

/// Fields of `<pid>/stat` the ranking needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidStat {
    pub comm: String,
    pub utime: u64,
    pub stime: u64,
    pub starttime: u64,
}

impl PidStat {
    /// `pid (comm) state ppid ... utime stime ... starttime ...`
    ///
    /// `comm` may itself contain spaces and parentheses, so it is delimited by
    /// the first `(` and the last `)`.
    pub fn parse(content: &str) -> Result<Self, ProbeError> {
        let open = content
            .find('(')
            .ok_or_else(|| ProbeError::parse("pid stat", "missing '('"))?;
        let close = content
            .rfind(')')
            .filter(|&close| close > open)
            .ok_or_else(|| ProbeError::parse("pid stat", "missing ')'"))?;

        let comm = content[open + 1..close].to_string();
        // fields after comm start at field 3 (state)
        let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
        let field = |n: usize| -> Result<u64, ProbeError> {
            rest.get(n - 3)
                .and_then(|v| v.parse::<u64>().ok())
                .ok_or_else(|| ProbeError::parse("pid stat", format!("field {n}")))
        };

        Ok(Self {
            comm,
            utime: field(14)?,
            stime: field(15)?,
            starttime: field(22)?,
        })
    }
}

/// Resident pages, second field of `<pid>/statm`.
pub fn parse_statm_resident(content: &str) -> Result<u64, ProbeError> {
    content
        .split_whitespace()
        .nth(1)
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| ProbeError::parse("statm", content.trim().to_string()))
}

pub fn is_kernel_thread(name: &str) -> bool {
    KERNEL_THREAD_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Host-wide figures shared by every pid in one scan.
#[derive(Debug, Clone, Copy)]
struct ScanContext {
    uptime_secs: f64,
    core_count: usize,
    mem_total_bytes: u64,
    page_size: u64,
}

/// Ranks live processes by CPU usage.
#[derive(Debug, Clone)]
pub struct ProcessRanker {
    paths: KernelPaths,
    page_size: u64,
    top_n: usize,
}

impl ProcessRanker {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            paths: config.kernel_paths(),
            page_size: config.page_size(),
            top_n: config.top_processes,
        }
    }

    pub fn with_paths(mut self, paths: KernelPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Top processes, sorted by CPU share descending.
    ///
    /// Blocking: reads two files per pid.
    pub fn rank(&self) -> Vec<ProcessSample> {
        let ctx = ScanContext {
            uptime_secs: procfs::read_uptime_secs(&self.paths).unwrap_or(0.0),
            core_count: procfs::core_count(&self.paths),
            mem_total_bytes: MemInfo::read(&self.paths).map(|m| m.total).unwrap_or(0),
            page_size: self.page_size,
        };

        let entries = match std::fs::read_dir(&self.paths.proc_root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", self.paths.proc_root.display(), e);
                return Vec::new();
            }
        };

        let mut processes: Vec<ProcessSample> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|pid| match self.sample_pid(&pid, &ctx) {
                Ok(sample) => sample,
                Err(e) => {
                    debug!(pid = %pid, "Skipping process: {}", e);
                    None
                }
            })
            .collect();

        processes.sort_by(|a, b| {
            b.cpu_percent
                .partial_cmp(&a.cpu_percent)
                .unwrap_or(Ordering::Equal)
        });
        processes.truncate(self.top_n);
        processes
    }

    /// `Ok(None)` for filtered processes.
    fn sample_pid(&self, pid: &str, ctx: &ScanContext) -> Result<Option<ProcessSample>, ProbeError> {
        let stat = PidStat::parse(&procfs::read(&self.paths.proc(format!("{pid}/stat")))?)?;
        if stat.comm.is_empty() || is_kernel_thread(&stat.comm) {
            return Ok(None);
        }

        let resident_pages = parse_statm_resident(&procfs::read(&self.paths.proc(format!("{pid}/statm")))?)?;
        let resident_bytes = resident_pages.saturating_mul(ctx.page_size);

        Ok(Some(ProcessSample {
            pid: pid.to_string(),
            name: stat.comm.chars().take(MAX_NAME_CHARS).collect(),
            cpu_percent: cpu_percent(&stat, ctx.uptime_secs, ctx.core_count),
            mem_percent: mem_percent(resident_bytes, ctx.mem_total_bytes),
        }))
    }
}

/// `(utime+stime)/100 / (uptime - starttime/100) * 100 * cores`, clamped to [0, 100].
pub fn cpu_percent(stat: &PidStat, uptime_secs: f64, core_count: usize) -> f64 {
    let cpu_secs = (stat.utime + stat.stime) as f64 / TICKS_PER_SEC;
    let alive_secs = uptime_secs - stat.starttime as f64 / TICKS_PER_SEC;
    if alive_secs <= 0.0 {
        return 0.0;
    }
    (cpu_secs / alive_secs * 100.0 * core_count as f64).clamp(0.0, 100.0)
}

pub fn mem_percent(resident_bytes: u64, total_bytes: u64) -> f64 {
    if total_bytes == 0 {
        return 0.0;
    }
    resident_bytes as f64 / total_bytes as f64 * 100.0
}

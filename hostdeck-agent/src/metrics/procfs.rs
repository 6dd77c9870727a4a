//! Parsers for the kernel process tree (`stat`, `meminfo`, `net/dev`, ...)
//!
//! Parsing is kept separate from reading so it can be tested on fixed text.

use crate::config::KernelPaths;
use crate::error::ProbeError;
use std::collections::HashMap;
use std::path::Path;

pub(crate) fn read(path: &Path) -> Result<String, ProbeError> {
    std::fs::read_to_string(path).map_err(|e| ProbeError::read(path, e))
}

/// Aggregate tick counters from the `cpu ` line of `stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTicks {
    /// idle + iowait
    pub idle: u64,
    /// Sum of every tick category on the line.
    pub total: u64,
}

impl CpuTicks {
    pub fn read(paths: &KernelPaths) -> Result<Self, ProbeError> {
        Self::parse(&read(&paths.proc("stat"))?)
    }

    /// Format: `cpu user nice system idle iowait irq softirq steal guest guest_nice`
    pub fn parse(content: &str) -> Result<Self, ProbeError> {
        let line = content
            .lines()
            .find(|l| l.starts_with("cpu "))
            .ok_or_else(|| ProbeError::parse("stat", "no aggregate cpu line"))?;

        let values: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .map(|v| v.parse::<u64>())
            .collect::<Result<_, _>>()
            .map_err(|e| ProbeError::parse("stat", e.to_string()))?;

        if values.len() < 4 {
            return Err(ProbeError::parse(
                "stat",
                format!("expected at least 4 tick fields, got {}", values.len()),
            ));
        }

        let idle = values[3] + values.get(4).copied().unwrap_or(0);
        let total = values.iter().sum();
        Ok(Self { idle, total })
    }

    /// Busy share since boot, used when there is no usable previous reading.
    pub fn busy_percent_since_boot(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        ((1.0 - self.idle as f64 / self.total as f64) * 100.0).clamp(0.0, 100.0)
    }
}

/// Selected `meminfo` fields, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    pub total: u64,
    pub available: u64,
}

impl MemInfo {
    pub fn read(paths: &KernelPaths) -> Result<Self, ProbeError> {
        Self::parse(&read(&paths.proc("meminfo"))?)
    }

    /// Lines look like `MemTotal:       16318164 kB`.
    pub fn parse(content: &str) -> Result<Self, ProbeError> {
        let mut fields: HashMap<&str, u64> = HashMap::new();
        for line in content.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            if let Some(kb) = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok()) {
                fields.insert(key.trim(), kb * 1024);
            }
        }

        let total = *fields
            .get("MemTotal")
            .ok_or_else(|| ProbeError::parse("meminfo", "missing MemTotal"))?;
        let available = fields
            .get("MemAvailable")
            .or_else(|| fields.get("MemFree"))
            .copied()
            .unwrap_or(0)
            .min(total);

        Ok(Self { total, available })
    }
}

/// Byte totals summed over every non-loopback interface of `net/dev`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetTotals {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl NetTotals {
    pub fn read(paths: &KernelPaths) -> Result<Self, ProbeError> {
        Self::parse(&read(&paths.proc("net/dev"))?)
    }

    /// ```text
    /// Inter-|   Receive                            |  Transmit
    ///  face |bytes    packets errs drop fifo frame compressed multicast|bytes ...
    ///   eth0: 12345678   12345    0    0    0     0          0         0 87654321 ...
    /// ```
    pub fn parse(content: &str) -> Result<Self, ProbeError> {
        let mut totals = Self::default();
        let mut interfaces = 0usize;

        for line in content.lines().skip(2) {
            let Some((iface, rest)) = line.split_once(':') else {
                continue;
            };
            interfaces += 1;
            if iface.trim() == "lo" {
                continue;
            }
            let cols: Vec<&str> = rest.split_whitespace().collect();
            if cols.len() < 9 {
                continue;
            }
            let rx = cols[0].parse::<u64>().unwrap_or(0);
            let tx = cols[8].parse::<u64>().unwrap_or(0);
            totals.rx_bytes = totals.rx_bytes.saturating_add(rx);
            totals.tx_bytes = totals.tx_bytes.saturating_add(tx);
        }

        if interfaces == 0 {
            return Err(ProbeError::parse("net/dev", "no interfaces"));
        }
        Ok(totals)
    }
}

/// Seconds since boot, first field of `uptime`.
pub fn read_uptime_secs(paths: &KernelPaths) -> Result<f64, ProbeError> {
    parse_uptime(&read(&paths.proc("uptime"))?)
}

pub fn parse_uptime(content: &str) -> Result<f64, ProbeError> {
    content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| ProbeError::parse("uptime", content.trim().to_string()))
}

/// Number of `processor` entries in `cpuinfo`, at least 1.
pub fn core_count(paths: &KernelPaths) -> usize {
    match read(&paths.proc("cpuinfo")) {
        Ok(content) => parse_core_count(&content),
        Err(_) => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    }
}

pub fn parse_core_count(content: &str) -> usize {
    content
        .lines()
        .filter(|l| l.starts_with("processor"))
        .count()
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_ticks() {
        let stat = "cpu  10 20 30 100 5 1 2 3 0 0\ncpu0 5 10 15 50 2 0 1 1 0 0\nintr 1\n";
        let ticks = CpuTicks::parse(stat).unwrap();
        assert_eq!(ticks.idle, 105);
        assert_eq!(ticks.total, 171);
    }

    #[test]
    fn test_cpu_ticks_missing_line() {
        assert!(CpuTicks::parse("cpu0 1 2 3 4\n").is_err());
        assert!(CpuTicks::parse("cpu  1 2\n").is_err());
    }

    #[test]
    fn test_busy_since_boot() {
        let ticks = CpuTicks { idle: 100, total: 200 };
        assert_eq!(ticks.busy_percent_since_boot(), 50.0);
        assert_eq!(CpuTicks { idle: 0, total: 0 }.busy_percent_since_boot(), 0.0);
    }

    #[test]
    fn test_meminfo() {
        let content = "MemTotal:       1000 kB\nMemFree:         100 kB\nMemAvailable:    400 kB\n";
        let mem = MemInfo::parse(content).unwrap();
        assert_eq!(mem.total, 1000 * 1024);
        assert_eq!(mem.available, 400 * 1024);
    }

    #[test]
    fn test_meminfo_falls_back_to_free() {
        let mem = MemInfo::parse("MemTotal: 1000 kB\nMemFree: 250 kB\n").unwrap();
        assert_eq!(mem.available, 250 * 1024);
        assert!(MemInfo::parse("MemFree: 250 kB\n").is_err());
    }

    #[test]
    fn test_net_dev_skips_loopback() {
        let content = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 9999 10 0 0 0 0 0 0 9999 10 0 0 0 0 0 0
  eth0: 1000 10 0 0 0 0 0 0 2000 20 0 0 0 0 0 0
 wlan0:  500  5 0 0 0 0 0 0  700  7 0 0 0 0 0 0
";
        let totals = NetTotals::parse(content).unwrap();
        assert_eq!(totals.rx_bytes, 1500);
        assert_eq!(totals.tx_bytes, 2700);
    }

    #[test]
    fn test_uptime_and_cores() {
        assert_eq!(parse_uptime("12345.67 54321.00\n").unwrap(), 12345.67);
        assert!(parse_uptime("garbage").is_err());
        assert_eq!(parse_core_count("processor\t: 0\nmodel\nprocessor\t: 1\n"), 2);
        assert_eq!(parse_core_count(""), 1);
    }
}

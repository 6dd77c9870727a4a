//! Host metrics collection
//!
//! Assembles a single snapshot from the kernel-exposed trees:
//! - CPU busy percentage from tick deltas between requests
//! - Memory usage from `meminfo`
//! - Root filesystem usage via `df`
//! - First readable temperature sensor
//! - Network throughput from `net/dev` byte deltas
//!
//! Each field is collected independently. A failing field is logged and
//! reported as zero (or null for temperature); the snapshot itself never fails.

pub mod disk;
pub mod procfs;
pub mod thermal;

use crate::config::{KernelPaths, TelemetryConfig};
use crate::error::ProbeError;
use crate::execution::CommandRunner;
use crate::rate::{RateComputer, RateStatus};
use chrono::{DateTime, Utc};
use procfs::{CpuTicks, MemInfo, NetTotals};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::System;
use tracing::{debug, warn};

const CPU_IDLE_KEY: &str = "cpu.idle";
const CPU_TOTAL_KEY: &str = "cpu.total";
const NET_RX_KEY: &str = "net.rx_bytes";
const NET_TX_KEY: &str = "net.tx_bytes";

/// Complete host snapshot, as served by `/api/system`.
#[derive(Debug, Clone, Serialize)]
pub struct HostSnapshot {
    #[serde(rename = "cpu")]
    pub cpu_percent: f64,
    pub memory: UsageStats,
    pub disk: UsageStats,
    #[serde(rename = "temperature")]
    pub temperature_celsius: Option<f64>,
    pub network: NetworkRates,
    pub timestamp: DateTime<Utc>,
}

/// Used/total bytes of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageStats {
    pub used: u64,
    pub total: u64,
    pub percent: f64,
}

impl UsageStats {
    pub fn new(used: u64, total: u64) -> Self {
        let percent = if total > 0 {
            (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            used,
            total,
            percent,
        }
    }
}

/// Bytes per second summed over non-loopback interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NetworkRates {
    #[serde(rename = "rx")]
    pub rx_bytes_per_sec: f64,
    #[serde(rename = "tx")]
    pub tx_bytes_per_sec: f64,
}

/// Time since boot, as served by `/api/uptime`.
#[derive(Debug, Clone, Serialize)]
pub struct Uptime {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub total: f64,
    /// `None` when `total` cannot be represented as a time span.
    pub boot_time: Option<DateTime<Utc>>,
}

impl Uptime {
    pub fn from_secs(total: f64) -> Self {
        let whole = total.max(0.0) as u64;
        let boot_time = Duration::try_from_secs_f64(total)
            .ok()
            .and_then(|up| chrono::Duration::from_std(up).ok())
            .and_then(|up| Utc::now().checked_sub_signed(up));
        Self {
            days: whole / 86_400,
            hours: (whole % 86_400) / 3_600,
            minutes: (whole % 3_600) / 60,
            total,
            boot_time,
        }
    }
}

/// Samples host state; shares its counter state with every other request.
#[derive(Clone)]
pub struct HostSampler {
    paths: KernelPaths,
    rates: RateComputer,
    runner: Arc<dyn CommandRunner>,
    disk_path: String,
    network_staleness: Duration,
}

impl HostSampler {
    pub fn new(config: &TelemetryConfig, rates: RateComputer, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            paths: config.kernel_paths(),
            rates,
            runner,
            disk_path: config.disk_path.clone(),
            network_staleness: config.network_staleness(),
        }
    }

    pub fn with_paths(mut self, paths: KernelPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn paths(&self) -> &KernelPaths {
        &self.paths
    }

    /// Collect a snapshot; each counter reading is stamped when it is read.
    pub async fn sample(&self) -> HostSnapshot {
        self.collect(Instant::now).await
    }

    /// Collect a snapshot with every counter reading stamped at `now`.
    pub async fn sample_at(&self, now: Instant) -> HostSnapshot {
        self.collect(|| now).await
    }

    /// Isolates failures per field. Counters are read before the `df` call so
    /// its latency never lands between a reading and its timestamp.
    async fn collect(&self, clock: impl Fn() -> Instant) -> HostSnapshot {
        debug!("Collecting host snapshot...");

        let cpu_percent = match CpuTicks::read(&self.paths) {
            Ok(ticks) => self.cpu_from_ticks(ticks, clock()),
            Err(e) => {
                warn!("Falling back to OS CPU figures: {}", e);
                os_cpu_percent().await
            }
        };

        let network = match NetTotals::read(&self.paths) {
            Ok(totals) => self.network_from_totals(totals, clock()),
            Err(e) => {
                warn!("Network counters unavailable: {}", e);
                NetworkRates::default()
            }
        };

        let memory = self.memory().unwrap_or_else(|e| {
            warn!("Memory unavailable: {}", e);
            UsageStats::default()
        });

        let temperature_celsius = match self.temperature() {
            Ok(celsius) => Some(celsius),
            Err(e) => {
                debug!("Temperature unavailable: {}", e);
                None
            }
        };

        let disk = self.disk().await.unwrap_or_else(|e| {
            warn!("Disk usage unavailable: {}", e);
            UsageStats::default()
        });

        HostSnapshot {
            cpu_percent,
            memory,
            disk,
            temperature_celsius,
            network,
            timestamp: Utc::now(),
        }
    }

    /// CPU busy percent in [0, 100]; falls back to the OS per-core figures
    /// when the stat interface cannot be read.
    pub async fn cpu_percent(&self, now: Instant) -> f64 {
        match CpuTicks::read(&self.paths) {
            Ok(ticks) => self.cpu_from_ticks(ticks, now),
            Err(e) => {
                warn!("Falling back to OS CPU figures: {}", e);
                os_cpu_percent().await
            }
        }
    }

    /// `(1 - idleDelta/totalDelta) * 100` against the previous reading.
    pub fn cpu_from_ticks(&self, ticks: CpuTicks, now: Instant) -> f64 {
        let results = self.rates.compute_many(
            &[(CPU_IDLE_KEY, ticks.idle), (CPU_TOTAL_KEY, ticks.total)],
            now,
            None,
        );
        let (idle, total) = (results[0], results[1]);

        if idle.status == RateStatus::FirstObservation || total.status == RateStatus::FirstObservation {
            return ticks.busy_percent_since_boot();
        }
        if !idle.valid || !total.valid || total.rate <= 0.0 {
            return 0.0;
        }
        ((1.0 - idle.rate / total.rate) * 100.0).clamp(0.0, 100.0)
    }

    pub fn memory(&self) -> Result<UsageStats, ProbeError> {
        let mem = MemInfo::read(&self.paths)?;
        Ok(UsageStats::new(mem.total - mem.available, mem.total))
    }

    pub async fn disk(&self) -> Result<UsageStats, ProbeError> {
        disk::collect(self.runner.as_ref(), &self.disk_path).await
    }

    pub fn temperature(&self) -> Result<f64, ProbeError> {
        thermal::read_celsius(&self.paths)
    }

    pub fn network(&self, now: Instant) -> Result<NetworkRates, ProbeError> {
        let totals = NetTotals::read(&self.paths)?;
        Ok(self.network_from_totals(totals, now))
    }

    /// Byte rates against the previous reading, bounded by the staleness window.
    pub fn network_from_totals(&self, totals: NetTotals, now: Instant) -> NetworkRates {
        let results = self.rates.compute_many(
            &[(NET_RX_KEY, totals.rx_bytes), (NET_TX_KEY, totals.tx_bytes)],
            now,
            Some(self.network_staleness),
        );
        NetworkRates {
            rx_bytes_per_sec: results[0].or_zero(),
            tx_bytes_per_sec: results[1].or_zero(),
        }
    }

    pub fn uptime(&self) -> Result<Uptime, ProbeError> {
        procfs::read_uptime_secs(&self.paths).map(Uptime::from_secs)
    }
}

/// Average per-core busy share reported by the OS.
async fn os_cpu_percent() -> f64 {
    let mut sys = System::new();
    sys.refresh_cpu_usage();

    // Wait a moment for accurate CPU readings
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    sys.refresh_cpu_usage();

    let cpus = sys.cpus();
    if cpus.is_empty() {
        return 0.0;
    }
    let avg_idle = cpus
        .iter()
        .map(|cpu| 1.0 - f64::from(cpu.cpu_usage()) / 100.0)
        .sum::<f64>()
        / cpus.len() as f64;
    ((1.0 - avg_idle) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::SystemRunner;

    fn sampler() -> HostSampler {
        let config = TelemetryConfig {
            proc_root: Some("/nonexistent/proc".into()),
            sys_root: Some("/nonexistent/sys".into()),
            ..Default::default()
        };
        HostSampler::new(&config, RateComputer::default(), Arc::new(SystemRunner))
    }

    #[test]
    fn test_cpu_percent_from_tick_deltas() {
        let s = sampler();
        let t0 = Instant::now();
        let first = s.cpu_from_ticks(CpuTicks { idle: 100, total: 200 }, t0);
        assert_eq!(first, 50.0);

        let second = s.cpu_from_ticks(CpuTicks { idle: 150, total: 300 }, t0 + Duration::from_secs(1));
        assert!((second - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_percent_is_clamped_and_reset_safe() {
        let s = sampler();
        let t0 = Instant::now();
        s.cpu_from_ticks(CpuTicks { idle: 1000, total: 5000 }, t0);
        let reset = s.cpu_from_ticks(CpuTicks { idle: 10, total: 20 }, t0 + Duration::from_secs(1));
        assert_eq!(reset, 0.0);

        let busy = s.cpu_from_ticks(CpuTicks { idle: 10, total: 120 }, t0 + Duration::from_secs(2));
        assert!((0.0..=100.0).contains(&busy));
        assert_eq!(busy, 100.0);
    }

    #[test]
    fn test_network_rates_and_staleness() {
        let s = sampler();
        let t0 = Instant::now();
        let first = s.network_from_totals(NetTotals { rx_bytes: 1000, tx_bytes: 0 }, t0);
        assert_eq!(first, NetworkRates::default());

        let t1 = t0 + Duration::from_secs(2);
        let second = s.network_from_totals(NetTotals { rx_bytes: 3000, tx_bytes: 500 }, t1);
        assert!((second.rx_bytes_per_sec - 1000.0).abs() < 1e-9);
        assert!((second.tx_bytes_per_sec - 250.0).abs() < 1e-9);

        let t2 = t1 + Duration::from_secs(15);
        let stale = s.network_from_totals(NetTotals { rx_bytes: 9000, tx_bytes: 900 }, t2);
        assert_eq!(stale.rx_bytes_per_sec, 0.0);
        assert_eq!(stale.tx_bytes_per_sec, 0.0);
    }

    #[test]
    fn test_usage_stats() {
        let u = UsageStats::new(25, 100);
        assert_eq!(u.percent, 25.0);
        assert_eq!(UsageStats::new(5, 0).percent, 0.0);
    }

    #[test]
    fn test_uptime_breakdown() {
        let up = Uptime::from_secs(90_061.5);
        assert_eq!(up.days, 1);
        assert_eq!(up.hours, 1);
        assert_eq!(up.minutes, 1);
        assert_eq!(up.total, 90_061.5);
        assert!(up.boot_time.is_some_and(|boot| boot < Utc::now()));
    }

    #[test]
    fn test_uptime_out_of_range() {
        let up = Uptime::from_secs(1e18);
        assert_eq!(up.boot_time, None);
        assert_eq!(up.days, 1e18 as u64 / 86_400);

        assert_eq!(Uptime::from_secs(-5.0).boot_time, None);
        assert_eq!(Uptime::from_secs(f64::NAN).days, 0);
    }

    #[test]
    fn test_missing_tree_degrades_per_field() {
        let s = sampler();
        assert!(s.memory().is_err());
        assert!(matches!(s.temperature(), Err(ProbeError::NoSensor)));
        assert!(s.network(Instant::now()).is_err());
        assert!(s.uptime().is_err());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = HostSnapshot {
            cpu_percent: 12.5,
            memory: UsageStats::new(1, 4),
            disk: UsageStats::default(),
            temperature_celsius: None,
            network: NetworkRates {
                rx_bytes_per_sec: 1.0,
                tx_bytes_per_sec: 2.0,
            },
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["cpu"], 12.5);
        assert_eq!(json["memory"]["percent"], 25.0);
        assert!(json["temperature"].is_null());
        assert_eq!(json["network"]["rx"], 1.0);
        assert_eq!(json["network"]["tx"], 2.0);
    }
}

//! Configuration for the sampler and the container runtime
//!
//! Handles:
//! - Kernel tree roots (host paths when running inside a container)
//! - Rate staleness bound and process ranking size
//! - Runtime binary and per-operation timeouts
//! - Speedtest binary

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Host `/proc` as mounted into a dashboard container.
const HOST_PROC: &str = "/host/proc";
const HOST_SYS: &str = "/host/sys";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub proc_root: Option<PathBuf>,
    pub sys_root: Option<PathBuf>,
    pub network_staleness_secs: u64,
    pub top_processes: usize,
    pub page_size: Option<u64>,
    pub disk_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub binary: String,
    pub list_timeout_secs: u64,
    pub action_timeout_secs: u64,
    pub logs_timeout_secs: u64,
    pub inspect_timeout_secs: u64,
    pub pull_timeout_secs: u64,
    pub remove_timeout_secs: u64,
    pub log_tail_lines: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedtestConfig {
    pub binary: String,
    pub timeout_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            proc_root: None,
            sys_root: None,
            network_staleness_secs: 10,
            top_processes: 5,
            page_size: None,
            disk_path: "/".to_string(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            list_timeout_secs: 10,
            action_timeout_secs: 30,
            logs_timeout_secs: 10,
            inspect_timeout_secs: 10,
            pull_timeout_secs: 120,
            remove_timeout_secs: 10,
            log_tail_lines: 30,
        }
    }
}

impl Default for SpeedtestConfig {
    fn default() -> Self {
        Self {
            binary: "speedtest".to_string(),
            timeout_secs: 120,
        }
    }
}

impl TelemetryConfig {
    pub fn network_staleness(&self) -> Duration {
        Duration::from_secs(self.network_staleness_secs)
    }

    /// Resolve the kernel tree roots, preferring host mounts when present.
    pub fn kernel_paths(&self) -> KernelPaths {
        let proc_root = self
            .proc_root
            .clone()
            .unwrap_or_else(|| detect_root(HOST_PROC, "/proc"));
        let sys_root = self
            .sys_root
            .clone()
            .unwrap_or_else(|| detect_root(HOST_SYS, "/sys"));
        KernelPaths { proc_root, sys_root }
    }

    /// Configured page size, else the OS value, else 4096.
    pub fn page_size(&self) -> u64 {
        self.page_size.unwrap_or_else(system_page_size)
    }
}

fn detect_root(host: &str, local: &str) -> PathBuf {
    if Path::new(host).exists() {
        PathBuf::from(host)
    } else {
        PathBuf::from(local)
    }
}

fn system_page_size() -> u64 {
    use nix::unistd::{sysconf, SysconfVar};

    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as u64,
        _ => 4096,
    }
}

/// Roots of the kernel-exposed filesystem trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelPaths {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
}

impl KernelPaths {
    pub fn new(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
        }
    }

    pub fn proc(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.proc_root.join(rel)
    }

    pub fn sys(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.sys_root.join(rel)
    }
}

impl RuntimeConfig {
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }

    pub fn logs_timeout(&self) -> Duration {
        Duration::from_secs(self.logs_timeout_secs)
    }

    pub fn inspect_timeout(&self) -> Duration {
        Duration::from_secs(self.inspect_timeout_secs)
    }

    pub fn pull_timeout(&self) -> Duration {
        Duration::from_secs(self.pull_timeout_secs)
    }

    pub fn remove_timeout(&self) -> Duration {
        Duration::from_secs(self.remove_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let telemetry = TelemetryConfig::default();
        assert_eq!(telemetry.network_staleness(), Duration::from_secs(10));
        assert_eq!(telemetry.top_processes, 5);

        let runtime = RuntimeConfig::default();
        assert_eq!(runtime.binary, "docker");
        assert_eq!(runtime.action_timeout(), Duration::from_secs(30));
        assert_eq!(runtime.pull_timeout(), Duration::from_secs(120));
        assert_eq!(runtime.log_tail_lines, 30);
    }

    #[test]
    fn test_explicit_roots_win() {
        let cfg = TelemetryConfig {
            proc_root: Some("/tmp/fake-proc".into()),
            sys_root: Some("/tmp/fake-sys".into()),
            ..Default::default()
        };
        let paths = cfg.kernel_paths();
        assert_eq!(paths.proc("stat"), PathBuf::from("/tmp/fake-proc/stat"));
        assert_eq!(paths.sys("class"), PathBuf::from("/tmp/fake-sys/class"));
    }

    #[test]
    fn test_page_size() {
        let cfg = TelemetryConfig {
            page_size: Some(16384),
            ..Default::default()
        };
        assert_eq!(cfg.page_size(), 16384);
        assert!(TelemetryConfig::default().page_size() >= 4096);
    }

    #[test]
    fn test_partial_runtime_section() {
        let cfg: RuntimeConfig = serde_json::from_str(r#"{"binary":"podman"}"#).unwrap();
        assert_eq!(cfg.binary, "podman");
        assert_eq!(cfg.logs_timeout(), Duration::from_secs(10));
    }
}

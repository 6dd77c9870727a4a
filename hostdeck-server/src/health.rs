use hostdeck_agent::{CommandRunner, Invocation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

const RUNTIME_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerHealth {
    pub status: String,
    pub uptime_seconds: u64,
    pub memory_usage_mb: f32,
    pub proc_root: String,
    pub runtime_available: bool,
    pub tracked_counters: usize,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    runner: Arc<dyn CommandRunner>,
}

impl HealthTracker {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            start_time: Instant::now(),
            runner,
        }
    }

    pub async fn get_health(&self, runtime_binary: &str, proc_root: &str, tracked_counters: usize) -> ServerHealth {
        let runtime_available = self
            .runner
            .run(Invocation::new(runtime_binary, ["--version"], RUNTIME_PROBE_TIMEOUT))
            .await
            .is_ok();

        ServerHealth {
            status: if runtime_available { "ok" } else { "degraded" }.to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            memory_usage_mb: get_memory_usage_mb().unwrap_or(0.0),
            proc_root: proc_root.to_string(),
            runtime_available,
            tracked_counters,
        }
    }
}

/// RSS du process courant (VmRSS de /proc/self/status)
fn get_memory_usage_mb() -> Option<f32> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss_mb(&status)
}

fn parse_vm_rss_mb(status: &str) -> Option<f32> {
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb as f32 / 1024.0) // KB -> MB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_rss() {
        let status = "Name:\thostdeck\nVmPeak:\t  9000 kB\nVmRSS:\t    2048 kB\n";
        assert_eq!(parse_vm_rss_mb(status), Some(2.0));
        assert_eq!(parse_vm_rss_mb("Name:\tx\n"), None);
    }
}

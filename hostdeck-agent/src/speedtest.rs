//! Bandwidth probe via the speedtest CLI

use crate::config::SpeedtestConfig;
use crate::error::SpeedtestError;
use crate::execution::{CommandRunner, Invocation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Rounded Mbps and milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedtestResult {
    pub download: u64,
    pub upload: u64,
    pub ping: u64,
    pub server: String,
}

#[derive(Debug, Deserialize)]
struct RawReport {
    download: RawBandwidth,
    upload: RawBandwidth,
    ping: RawPing,
    server: Option<RawServer>,
}

#[derive(Debug, Deserialize)]
struct RawBandwidth {
    /// Bytes per second.
    bandwidth: f64,
}

#[derive(Debug, Deserialize)]
struct RawPing {
    latency: f64,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    name: Option<String>,
}

#[derive(Clone)]
pub struct SpeedtestProbe {
    config: SpeedtestConfig,
    runner: Arc<dyn CommandRunner>,
}

impl SpeedtestProbe {
    pub fn new(config: SpeedtestConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub async fn run(&self) -> Result<SpeedtestResult, SpeedtestError> {
        info!("Running speedtest...");
        let output = self
            .runner
            .run(Invocation::new(
                self.config.binary.clone(),
                ["--accept-license", "--accept-gdpr", "-f", "json"],
                Duration::from_secs(self.config.timeout_secs),
            ))
            .await?;
        parse_report(&output.stdout)
    }
}

pub fn parse_report(json: &str) -> Result<SpeedtestResult, SpeedtestError> {
    let raw: RawReport = serde_json::from_str(json)?;
    Ok(SpeedtestResult {
        download: to_mbps(raw.download.bandwidth),
        upload: to_mbps(raw.upload.bandwidth),
        ping: raw.ping.latency.max(0.0).round() as u64,
        server: raw
            .server
            .and_then(|s| s.name)
            .unwrap_or_else(|| "Unknown".to_string()),
    })
}

fn to_mbps(bytes_per_sec: f64) -> u64 {
    (bytes_per_sec.max(0.0) * 8.0 / 1_000_000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report() {
        let json = r#"{
            "type": "result",
            "ping": {"jitter": 0.5, "latency": 12.6},
            "download": {"bandwidth": 12500000, "bytes": 1},
            "upload": {"bandwidth": 2500000, "bytes": 1},
            "server": {"id": 1, "name": "Example ISP"}
        }"#;
        let r = parse_report(json).unwrap();
        assert_eq!(r.download, 100);
        assert_eq!(r.upload, 20);
        assert_eq!(r.ping, 13);
        assert_eq!(r.server, "Example ISP");
    }

    #[test]
    fn test_missing_server_name() {
        let json = r#"{"ping":{"latency":1},"download":{"bandwidth":0},"upload":{"bandwidth":0}}"#;
        assert_eq!(parse_report(json).unwrap().server, "Unknown");
        assert!(parse_report("not json").is_err());
    }
}

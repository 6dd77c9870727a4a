use hostdeck_agent::{RuntimeConfig, SpeedtestConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path};
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub telemetry: TelemetryConfig,
    pub runtime: RuntimeConfig,
    pub speedtest: SpeedtestConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            telemetry: TelemetryConfig::default(),
            runtime: RuntimeConfig::default(),
            speedtest: SpeedtestConfig::default(),
        }
    }
}

/// Charge `HOSTDECK_CONFIG` (défaut `hostdeck.yaml`); défauts si absent ou invalide
pub async fn load_config() -> ServerConfig {
    let path = std::env::var("HOSTDECK_CONFIG").unwrap_or_else(|_| "hostdeck.yaml".into());
    load_config_from(Path::new(&path)).await
}

pub async fn load_config_from(path: &Path) -> ServerConfig {
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return ServerConfig::default();
    }
    let txt = fs::read_to_string(path).await.unwrap_or_default();
    if txt.trim().is_empty() {
        return ServerConfig::default();
    }
    parse_config(&txt).unwrap_or_else(|e| {
        warn!("Invalid config {}: {e}", path.display());
        ServerConfig::default()
    })
}

pub fn parse_config(txt: &str) -> Result<ServerConfig, serde_yaml::Error> {
    serde_yaml::from_str(txt)
}

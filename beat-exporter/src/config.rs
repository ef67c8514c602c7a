use crate::metrics::StartTimePolicy;
use anyhow::bail;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ExporterConfig {
    pub beat: BeatConf,
    pub listen: ListenConf,
    pub collector: CollectorConf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BeatConf {
    pub uri: String, // ex: "http://localhost:5066"
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ListenConf {
    pub address: String,
    pub telemetry_path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CollectorConf {
    pub start_time_policy: StartTimePolicy,
}

impl Default for BeatConf {
    fn default() -> Self {
        Self {
            uri: "http://localhost:5066".into(),
            timeout_secs: 10,
        }
    }
}

impl Default for ListenConf {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:9479".into(),
            telemetry_path: "/metrics".into(),
        }
    }
}

/// Routes served next to the telemetry path.
pub const RESERVED_PATHS: [&str; 3] = ["/", "/health", "/system/health"];

/// Normalizes a telemetry path to start with '/' and refuses paths that
/// collide with a built-in route or use router syntax.
pub fn telemetry_route(path: &str) -> anyhow::Result<String> {
    let path = path.trim();
    let route = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    if RESERVED_PATHS.contains(&route.as_str()) {
        bail!("telemetry_path {route:?} collides with a built-in route");
    }
    if route.contains(['{', '}', '*']) {
        bail!("telemetry_path {route:?} must be a literal path");
    }
    Ok(route)
}

impl ListenConf {
    pub fn telemetry_route(&self) -> anyhow::Result<String> {
        telemetry_route(&self.telemetry_path)
    }
}

impl ExporterConfig {
    pub fn from_yaml(txt: &str) -> Result<Self, serde_yaml::Error> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(txt)
    }

    /// Applies single-value overrides from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(uri) = std::env::var("BEAT_EXPORTER_BEAT_URI") {
            self.beat.uri = uri;
        }
        if let Ok(addr) = std::env::var("BEAT_EXPORTER_LISTEN") {
            self.listen.address = addr;
        }
        self
    }
}

pub async fn load_config() -> ExporterConfig {
    let path = std::env::var("BEAT_EXPORTER_CONFIG").unwrap_or_else(|_| "beat-exporter.yaml".into());
    let cfg = if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        ExporterConfig::from_yaml(&txt).unwrap_or_else(|e| {
            warn!("invalid config {path}: {e}, using defaults");
            ExporterConfig::default()
        })
    } else {
        info!("no {path}, using default config");
        ExporterConfig::default()
    };
    cfg.with_env_overrides()
}

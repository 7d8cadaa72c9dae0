use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub run_id: String,
    /// Width of one counting slot in the counter strategy, in milliseconds.
    pub slot_width_ms: u64,
    /// Port the static attacker-page server listens on.
    pub page_server_port: u16,
    /// Directory served by the attacker-page server.
    pub page_root: String,
    /// Port the remote receiver listens on.
    pub receiver_port: u16,
    /// WebDriver endpoint for the automated-browser backends.
    pub webdriver_url: String,
    /// Path to the privileged kernel tracer binary.
    pub tracer_path: String,
    /// Minimum gap duration the tracer records, in nanoseconds.
    pub tracer_ns_threshold: u64,
    /// Stop an open-world batch after this many collected traces.
    pub open_world_cap: u64,
    /// Fraction of total progress between notifications; 0 disables them.
    pub notify_interval: f64,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_hash: String,
}

pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    let bytes: Vec<u8> = if let Some(p) = path {
        std::fs::read(p)?
    } else {
        include_bytes!("../config/default.yml").to_vec()
    };

    let mut config: Config = serde_yaml::from_slice(&bytes)?;
    if config.run_id.trim().is_empty() {
        config.run_id = generate_run_id();
    }

    let config_hash = hash_bytes(&bytes);

    Ok(LoadedConfig { config, config_hash })
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}

fn generate_run_id() -> String {
    let now = chrono::Utc::now();
    format!("{}_{}", now.format("%Y%m%dT%H%M%SZ"), rand_suffix())
}

fn rand_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!("{:08x}", nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let loaded = load_config(None).expect("default config");
        assert_eq!(loaded.config.slot_width_ms, 5);
        assert!(!loaded.config.run_id.is_empty());
        assert_eq!(loaded.config_hash.len(), 64);
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub gazette_url: Option<String>,
    pub http_timeout_sec: Option<u64>,
    pub metrics_port: Option<u16>,

    // Pipeline settings
    pub max_retries: Option<u32>,
    pub retry_interval_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub earliest_run_hour: Option<u32>,

    // Calendar
    pub holidays: Option<Vec<String>>,
    pub weekend_days: Option<Vec<String>>,

    // Feature configs
    pub mail: Option<MailConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MailConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub sender_email: Option<String>,
    pub sender_name: Option<String>,
    pub logo_url: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

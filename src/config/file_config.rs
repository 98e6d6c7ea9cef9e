use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub db_dir: Option<String>,
    pub audio_dir: Option<String>,
    pub port: Option<u16>,
    pub logging_level: Option<String>,

    pub jwt_secret: Option<String>,
    pub token_ttl_sec: Option<u64>,

    pub store_timeout_ms: Option<u64>,
    pub posts_per_page: Option<usize>,
    pub max_upload_mb: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

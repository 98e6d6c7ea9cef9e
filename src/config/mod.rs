mod file_config;

pub use file_config::FileConfig;

use crate::server::RequestsLoggingLevel;
use crate::user::MIN_SECRET_LEN;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TOKEN_TTL_SEC: u64 = 3600;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_POSTS_PER_PAGE: usize = 10;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub audio_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub jwt_secret: Option<String>,
    pub token_ttl_sec: u64,
    pub store_timeout_ms: u64,
    pub posts_per_page: usize,
    pub max_upload_mb: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            audio_dir: None,
            port: DEFAULT_PORT,
            logging_level: RequestsLoggingLevel::default(),
            jwt_secret: None,
            token_ttl_sec: DEFAULT_TOKEN_TTL_SEC,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub store_timeout: Duration,
    pub posts_per_page: usize,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let audio_dir = file
            .audio_dir
            .map(PathBuf::from)
            .or_else(|| cli.audio_dir.clone())
            .unwrap_or_else(|| db_dir.join("audio"));

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let jwt_secret = file
            .jwt_secret
            .or_else(|| cli.jwt_secret.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "jwt_secret must be specified via --jwt-secret, SOUNDSHARE_JWT_SECRET or in config file"
                )
            })?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            bail!("jwt_secret must be at least {} bytes long", MIN_SECRET_LEN);
        }

        let token_ttl_sec = file.token_ttl_sec.unwrap_or(cli.token_ttl_sec);
        let store_timeout_ms = file.store_timeout_ms.unwrap_or(cli.store_timeout_ms);
        let posts_per_page = file.posts_per_page.unwrap_or(cli.posts_per_page);
        if posts_per_page == 0 {
            bail!("posts_per_page must be greater than 0");
        }
        let max_upload_mb = file.max_upload_mb.unwrap_or(cli.max_upload_mb);
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .and_then(|bytes| usize::try_from(bytes).ok())
            .ok_or_else(|| anyhow::anyhow!("max_upload_mb {} is too large", max_upload_mb))?;

        Ok(Self {
            db_dir,
            audio_dir,
            port,
            logging_level,
            jwt_secret,
            token_ttl: Duration::from_secs(token_ttl_sec),
            store_timeout: Duration::from_millis(store_timeout_ms),
            posts_per_page,
            max_upload_bytes,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_dir.join("soundshare.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SECRET: &str = "0123456789abcdef-secret";

    fn make_temp_db_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn cli_with_db_dir(temp_dir: &TempDir) -> CliConfig {
        CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            jwt_secret: Some(SECRET.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_logging_level() {
        assert!(matches!(
            parse_logging_level("none"),
            Some(RequestsLoggingLevel::None)
        ));
        assert!(matches!(
            parse_logging_level("path"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(matches!(
            parse_logging_level("headers"),
            Some(RequestsLoggingLevel::Headers)
        ));
        assert!(matches!(
            parse_logging_level("body"),
            Some(RequestsLoggingLevel::Body)
        ));
        // Case insensitive
        assert!(matches!(
            parse_logging_level("PATH"),
            Some(RequestsLoggingLevel::Path)
        ));
        assert!(parse_logging_level("invalid").is_none());
    }

    #[test]
    fn test_resolve_cli_only() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            audio_dir: Some(PathBuf::from("/audio")),
            port: 3001,
            logging_level: RequestsLoggingLevel::Headers,
            jwt_secret: Some(SECRET.to_string()),
            token_ttl_sec: 60,
            store_timeout_ms: 250,
            posts_per_page: 5,
            max_upload_mb: 2,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.audio_dir, PathBuf::from("/audio"));
        assert_eq!(config.port, 3001);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Headers);
        assert_eq!(config.jwt_secret, SECRET);
        assert_eq!(config.token_ttl, Duration::from_secs(60));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.posts_per_page, 5);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn test_resolve_defaults() {
        let temp_dir = make_temp_db_dir();
        let config = AppConfig::resolve(&cli_with_db_dir(&temp_dir), None).unwrap();

        assert_eq!(config.audio_dir, temp_dir.path().join("audio"));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Path);
        assert_eq!(config.token_ttl, Duration::from_secs(3600));
        assert_eq!(config.posts_per_page, 10);
        assert_eq!(config.db_path(), temp_dir.path().join("soundshare.db"));
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = make_temp_db_dir();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            audio_dir: Some(PathBuf::from("/cli/audio")),
            port: 3001,
            logging_level: RequestsLoggingLevel::Path,
            jwt_secret: Some("cli-secret-that-is-long".to_string()),
            posts_per_page: 7,
            ..Default::default()
        };

        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            audio_dir: Some("/toml/audio".to_string()),
            port: Some(4000),
            logging_level: Some("body".to_string()),
            jwt_secret: Some("toml-secret-that-is-long".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.audio_dir, PathBuf::from("/toml/audio"));
        assert_eq!(config.port, 4000);
        assert_eq!(config.logging_level, RequestsLoggingLevel::Body);
        assert_eq!(config.jwt_secret, "toml-secret-that-is-long");
        // CLI value used when TOML doesn't specify
        assert_eq!(config.posts_per_page, 7);
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let cli = CliConfig {
            jwt_secret: Some(SECRET.to_string()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_nonexistent_db_dir_error() {
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/nonexistent/path/that/should/not/exist")),
            jwt_secret: Some(SECRET.to_string()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("does not exist"));
    }

    #[test]
    fn test_resolve_db_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_file.path().to_path_buf()),
            jwt_secret: Some(SECRET.to_string()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_requires_jwt_secret() {
        let temp_dir = make_temp_db_dir();
        let mut cli = cli_with_db_dir(&temp_dir);
        cli.jwt_secret = None;
        let result = AppConfig::resolve(&cli, None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("jwt_secret must be specified"));

        cli.jwt_secret = Some("short".to_string());
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("at least 16 bytes"));
    }

    #[test]
    fn test_resolve_rejects_oversized_upload_limit() {
        let temp_dir = make_temp_db_dir();
        let mut cli = cli_with_db_dir(&temp_dir);
        cli.max_upload_mb = u64::MAX / 2;
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("is too large"));
    }
}

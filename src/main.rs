use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use soundshare_server::config::{self, AppConfig, CliConfig, FileConfig};
use soundshare_server::media::LocalAudioStorage;
use soundshare_server::server::{run_server, RequestsLoggingLevel, ServerConfig};
use soundshare_server::social::SocialEngine;
use soundshare_server::store::SqliteStore;
use soundshare_server::user::{TokenIssuer, UserManager};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite database.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Directory where uploaded audio files are stored. Defaults to
    /// `<db_dir>/audio`.
    #[clap(long, value_parser = parse_path)]
    pub audio_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = config::DEFAULT_PORT)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Secret used to sign session tokens, at least 16 bytes.
    #[clap(long, env = "SOUNDSHARE_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Lifetime of issued session tokens.
    #[clap(long, default_value_t = config::DEFAULT_TOKEN_TTL_SEC)]
    pub token_ttl_sec: u64,

    /// Time budget of a single storage call.
    #[clap(long, default_value_t = config::DEFAULT_STORE_TIMEOUT_MS)]
    pub store_timeout_ms: u64,

    #[clap(long, default_value_t = config::DEFAULT_POSTS_PER_PAGE)]
    pub posts_per_page: usize,

    /// Largest accepted upload, in MiB.
    #[clap(long, default_value_t = config::DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            audio_dir: self.audio_dir.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            jwt_secret: self.jwt_secret.clone(),
            token_ttl_sec: self.token_ttl_sec,
            store_timeout_ms: self.store_timeout_ms,
            posts_per_page: self.posts_per_page,
            max_upload_mb: self.max_upload_mb,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening database at {:?}", app_config.db_path());
    let store = Arc::new(SqliteStore::new(
        app_config.db_path(),
        app_config.store_timeout,
    )?);
    let audio = Arc::new(
        LocalAudioStorage::new(&app_config.audio_dir).with_context(|| {
            format!("Could not create audio directory {:?}", app_config.audio_dir)
        })?,
    );
    let tokens = TokenIssuer::new(app_config.jwt_secret.as_bytes(), app_config.token_ttl)?;

    let engine = Arc::new(SocialEngine::new(
        store.clone(),
        audio.clone(),
        app_config.store_timeout,
    ));
    let user_manager = Arc::new(UserManager::new(
        store,
        audio,
        tokens,
        app_config.store_timeout,
    ));

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        audio_dir: app_config.audio_dir.clone(),
        posts_per_page: app_config.posts_per_page,
        max_upload_bytes: app_config.max_upload_bytes,
    };

    info!("Ready to serve at port {}!", app_config.port);
    run_server(server_config, engine, user_manager).await
}

use super::RequestsLoggingLevel;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Directory served under `/audio`.
    pub audio_dir: PathBuf,
    pub posts_per_page: usize,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 8080,
            audio_dir: PathBuf::from("audio"),
            posts_per_page: 10,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

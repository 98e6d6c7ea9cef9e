//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own database and audio directory.

use super::constants::*;
use super::fixtures::create_test_db_with_users;
use soundshare_server::media::LocalAudioStorage;
use soundshare_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use soundshare_server::social::SocialEngine;
use soundshare_server::store::SqliteStore;
use soundshare_server::user::{TokenIssuer, UserManager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated database
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Store for direct database access in tests
    pub store: Arc<SqliteStore>,

    /// Where uploaded audio lands
    pub audio_dir: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if database creation or port binding fails, or if the server
    /// doesn't become ready within timeout.
    pub async fn spawn() -> Self {
        let (temp_db_dir, _db_path, store) =
            create_test_db_with_users().expect("Failed to create test database");
        let store = Arc::new(store);

        let audio_dir = temp_db_dir.path().join("audio");
        let audio = Arc::new(LocalAudioStorage::new(&audio_dir).expect("Failed to create audio dir"));

        let store_timeout = Duration::from_secs(5);
        let engine = Arc::new(SocialEngine::new(
            store.clone(),
            audio.clone(),
            store_timeout,
        ));
        let user_manager = Arc::new(UserManager::new(
            store.clone(),
            audio,
            TokenIssuer::new(TEST_JWT_SECRET, Duration::from_secs(3600))
                .expect("Failed to create token issuer"),
            store_timeout,
        ));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            audio_dir: audio_dir.clone(),
            posts_per_page: TEST_POSTS_PER_PAGE,
            max_upload_bytes: 1024 * 1024,
        };

        let app = make_app(config, engine, user_manager).expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            store,
            audio_dir,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

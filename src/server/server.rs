use anyhow::Result;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::info;

use crate::social::SocialEngine;
use crate::user::UserManager;
use tower_http::{cors::CorsLayer, services::ServeDir};

use axum::{extract::State, middleware, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

#[cfg(feature = "slowdown")]
use super::slowdown_request;
use super::{
    auth_routes::make_auth_routes, category_routes::make_category_routes,
    feed_routes::make_feed_routes, log_requests, state::*, ServerConfig,
};
use crate::media::AUDIO_URL_SEGMENT;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    engine: Arc<SocialEngine>,
    user_manager: Arc<UserManager>,
) -> Result<Router> {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        engine,
        user_manager,
        hash: env!("GIT_HASH").to_string(),
    };

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let mut app: Router = home_router
        .nest("/auth", make_auth_routes(state.clone()))
        .nest("/feed", make_feed_routes(state.clone()))
        .nest("/category", make_category_routes(state.clone()))
        .nest_service(
            &format!("/{}", AUDIO_URL_SEGMENT),
            ServeDir::new(&config.audio_dir),
        );

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(CorsLayer::permissive());

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    engine: Arc<SocialEngine>,
    user_manager: Arc<UserManager>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, engine, user_manager)?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await?;
    Ok(())
}

//! Development-only layer delaying every request by a random amount, to
//! surface client-side races against a slow backend.

use axum::{body::Body, http::Request, middleware::Next, response::IntoResponse};
use rand_distr::{Distribution, Normal};
use std::time::Duration;

const MEAN_DELAY_MS: f64 = 1000.0;
const DELAY_STD_DEV_MS: f64 = 2000.0;

pub async fn slowdown_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let delay_ms = match Normal::new(MEAN_DELAY_MS, DELAY_STD_DEV_MS) {
        Ok(normal) => 0.0f64.max(normal.sample(&mut rand::rng())),
        Err(_) => MEAN_DELAY_MS,
    };
    tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
    next.run(request).await
}

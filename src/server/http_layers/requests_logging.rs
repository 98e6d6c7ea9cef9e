//! Request logging middleware

use super::super::state::ServerState;
use axum::extract::State;
use axum::{
    body::{Body, Bytes},
    http::{
        header::{self, HeaderMap, HeaderName},
        Request, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, Default, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    #[default]
    Path,
    Headers,
    Body,
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

/// Headers carrying session tokens.
const REDACTED_HEADERS: [HeaderName; 3] =
    [header::AUTHORIZATION, header::COOKIE, header::SET_COOKIE];

/// What the body logger does with a message body.
#[derive(Debug, PartialEq, Eq)]
enum BodyLogPlan {
    Skip(String),
    Buffer(usize),
}

fn plan_body_log(headers: &HeaderMap) -> BodyLogPlan {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let size = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    let size = match size {
        Some(size) => size,
        None => return BodyLogPlan::Skip("unknown length".to_string()),
    };
    if size == 0 {
        return BodyLogPlan::Skip("empty".to_string());
    }
    let pretty_size = format!("{:#}", byte_unit::Byte::from(size));
    if content_type.starts_with("audio/") || content_type.starts_with("multipart/") {
        return BodyLogPlan::Skip(format!("{} of {}", content_type, pretty_size));
    }
    if size >= MAX_LOGGABLE_BODY_LENGTH {
        return BodyLogPlan::Skip(format!("too big to log ({})", pretty_size));
    }
    BodyLogPlan::Buffer(size)
}

fn log_headers(label: &str, headers: &HeaderMap) {
    info!("  {} Headers:", label);
    for (name, value) in headers.iter() {
        if REDACTED_HEADERS.contains(name) {
            info!("    {:?}: <redacted>", name);
        } else {
            info!("    {:?}: {:?}", name, value);
        }
    }
}

/// Logs the body when small and textual, handing back an equivalent body.
async fn log_body(label: &str, headers: &HeaderMap, body: Body) -> Result<Body, axum::Error> {
    match plan_body_log(headers) {
        BodyLogPlan::Skip(reason) => {
            info!("  {} Body: {}", label, reason);
            Ok(body)
        }
        BodyLogPlan::Buffer(size) => {
            let bytes: Bytes = axum::body::to_bytes(body, size).await?;
            info!("  {} Body:\n{}", label, String::from_utf8_lossy(&bytes));
            Ok(Body::from(bytes))
        }
    }
}

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let level = state.config.requests_logging_level.clone();
    if level == RequestsLoggingLevel::None {
        return next.run(request).await;
    }
    let start = Instant::now();

    info!(">>> {} {}", request.method(), request.uri());
    if level >= RequestsLoggingLevel::Headers {
        log_headers("Req", request.headers());
    }

    let request = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = request.into_parts();
        match log_body("Req", &parts.headers, body).await {
            Ok(body) => Request::from_parts(parts, body),
            Err(err) => {
                error!("Failed to read request body: {}", err);
                return (StatusCode::BAD_REQUEST, "Unreadable request body").into_response();
            }
        }
    } else {
        request
    };

    let response = next.run(request).await;

    if level >= RequestsLoggingLevel::Headers {
        log_headers("Resp", response.headers());
    }
    let response = if level >= RequestsLoggingLevel::Body {
        let (parts, body) = response.into_parts();
        match log_body("Resp", &parts.headers, body).await {
            Ok(body) => Response::from_parts(parts, body),
            Err(err) => {
                error!("Failed to read response body: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    } else {
        response
    };

    info!(
        "<<< {} ({}ms)",
        response.status().as_u16(),
        start.elapsed().as_millis()
    );
    response
}

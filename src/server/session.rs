use super::state::ServerState;
use crate::social::ServiceError;
use crate::store::UserId;
use crate::user::AuthFailure;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
}

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";
const BEARER_PREFIX: &str = "Bearer ";

fn extract_session_token_from_cookies(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(HEADER_SESSION_TOKEN_KEY)?.to_str().ok()?;
    value
        .strip_prefix(BEARER_PREFIX)
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn extract_session_from_request_parts(
    parts: &Parts,
    ctx: &ServerState,
) -> Result<Session, AuthFailure> {
    let token = extract_session_token_from_headers(parts)
        .or_else(|| extract_session_token_from_cookies(parts))
        .ok_or(AuthFailure::MissingToken)?;

    let user_id = ctx.user_manager.verify_token(&token).map_err(|failure| {
        debug!("Rejected session token: {}", failure);
        failure
    })?;
    Ok(Session { user_id })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        Ok(extract_session_from_request_parts(parts, ctx)?)
    }
}

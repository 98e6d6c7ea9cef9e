//! Signup, login and user administration.

use super::json_body::JsonBody;
use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::state::{GuardedUserManager, ServerState};
use crate::social::ServiceError;
use crate::store::{User, UserId, UserProfile};
use crate::user::ProfileChanges;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
struct SignupBody {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupResponse {
    message: &'static str,
    user_id: UserId,
}

#[derive(Deserialize)]
struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginSuccessResponse {
    token: String,
    user_id: UserId,
    expires_in: u64,
    status: String,
}

#[derive(Serialize)]
struct UsersResponse {
    message: &'static str,
    users: Vec<UserProfile>,
}

#[derive(Deserialize, Debug, Default)]
struct UpdateUserBody {
    pub email: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize)]
struct UserResponse {
    message: &'static str,
    user: User,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn signup(
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<SignupBody>,
) -> Result<Response, ServiceError> {
    let user_id = user_manager
        .signup(body.email, body.name, body.password)
        .await?;
    let response = SignupResponse {
        message: "Success",
        user_id,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn login(
    State(user_manager): State<GuardedUserManager>,
    jar: CookieJar,
    JsonBody(body): JsonBody<LoginBody>,
) -> Result<Response, ServiceError> {
    let login = user_manager.login(body.email, body.password).await?;

    let cookie = Cookie::build((COOKIE_SESSION_TOKEN_KEY, login.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    let response = LoginSuccessResponse {
        token: login.token,
        user_id: login.user_id,
        expires_in: login.expires_in,
        status: login.status,
    };
    Ok((jar.add(cookie), Json(response)).into_response())
}

async fn get_users(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Json<UsersResponse>, ServiceError> {
    let users = user_manager.list_users(session.user_id).await?;
    Ok(Json(UsersResponse {
        message: "Success",
        users,
    }))
}

async fn update_user(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(user_id): Path<UserId>,
    JsonBody(body): JsonBody<UpdateUserBody>,
) -> Result<Json<UserResponse>, ServiceError> {
    let changes = ProfileChanges {
        email: body.email,
        name: body.name,
        status: body.status,
    };
    let user = user_manager
        .update_user(session.user_id, user_id, changes)
        .await?;
    Ok(Json(UserResponse {
        message: "User updated.",
        user,
    }))
}

async fn delete_user(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(user_id): Path<UserId>,
) -> Result<Json<MessageResponse>, ServiceError> {
    user_manager.delete_user(session.user_id, user_id).await?;
    Ok(Json(MessageResponse { message: "Deleted!" }))
}

pub fn make_auth_routes(state: ServerState) -> Router {
    Router::new()
        .route("/signup", put(signup))
        .route("/login", post(login))
        .route("/users", get(get_users))
        .route("/user/{user_id}", put(update_user))
        .route("/user/{user_id}", delete(delete_user))
        .with_state(state)
}

use super::json_body::JsonBody;
use super::session::Session;
use super::state::{GuardedSocialEngine, GuardedUserManager, ServerState};
use crate::social::ServiceError;
use crate::store::Category;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct CategoryBody {
    pub name: String,
}

#[derive(Serialize)]
struct CategoriesResponse {
    message: &'static str,
    categories: Vec<Category>,
}

#[derive(Serialize)]
struct CategoryResponse {
    message: &'static str,
    category: Category,
}

async fn get_categories(
    State(engine): State<GuardedSocialEngine>,
) -> Result<Json<CategoriesResponse>, ServiceError> {
    let categories = engine.categories().await?;
    Ok(Json(CategoriesResponse {
        message: "Success",
        categories,
    }))
}

async fn create_category(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    State(user_manager): State<GuardedUserManager>,
    JsonBody(body): JsonBody<CategoryBody>,
) -> Result<Response, ServiceError> {
    user_manager.require_admin(session.user_id).await?;
    let categories = engine.create_category(body.name).await?;
    let response = CategoriesResponse {
        message: "Category created.",
        categories,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

async fn rename_category(
    session: Session,
    State(engine): State<GuardedSocialEngine>,
    State(user_manager): State<GuardedUserManager>,
    Path(category_id): Path<usize>,
    JsonBody(body): JsonBody<CategoryBody>,
) -> Result<Json<CategoryResponse>, ServiceError> {
    user_manager.require_admin(session.user_id).await?;
    let category = engine.rename_category(category_id, body.name).await?;
    Ok(Json(CategoryResponse {
        message: "Category updated.",
        category,
    }))
}

pub fn make_category_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(get_categories))
        .route("/", post(create_category))
        .route("/{category_id}", put(rename_category))
        .with_state(state)
}

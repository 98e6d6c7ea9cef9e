//! JSON rendering of `ServiceError`.

use crate::social::{FieldError, ServiceError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Vec<FieldError>>,
}

fn render(status: StatusCode, message: &str, data: Option<Vec<FieldError>>) -> Response {
    let body = ErrorBody {
        message: message.to_string(),
        data,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Validation(errors) => render(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation failed",
                Some(errors),
            ),
            ServiceError::DuplicateEmail => render(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation failed",
                Some(vec![FieldError::new("email", "Email already exists")]),
            ),
            ServiceError::NotFound(message) => render(StatusCode::NOT_FOUND, &message, None),
            ServiceError::Forbidden => render(StatusCode::FORBIDDEN, "Not authorized", None),
            ServiceError::Unauthorized(failure) => {
                render(StatusCode::UNAUTHORIZED, &failure.to_string(), None)
            }
            ServiceError::Timeout => render(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Request timed out",
                None,
            ),
            ServiceError::Internal(err) => {
                error!("Internal error: {:?}", err);
                render(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                )
            }
        }
    }
}

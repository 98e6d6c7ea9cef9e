use crate::user::AuthFailure;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    NotFound(String),

    #[error("Not authorized")]
    Forbidden,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("{0}")]
    Unauthorized(#[from] AuthFailure),

    #[error("Request timed out")]
    Timeout,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(field: &str, message: &str) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn user_not_found() -> Self {
        ServiceError::NotFound("User not found.".to_string())
    }

    pub fn post_not_found() -> Self {
        ServiceError::NotFound("Could not find post.".to_string())
    }
}

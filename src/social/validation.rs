//! Field checks run by the request handlers before reaching the engine.

use super::error::{FieldError, ServiceError};
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_PASSWORD_LEN: usize = 5;
pub const MIN_POST_TEXT_LEN: usize = 5;
pub const MAX_COMMENT_LEN: usize = 1000;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

/// Collects field errors and turns them into a single `ServiceError`.
#[derive(Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trims `value` and requires at least `min` characters.
    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> String {
        let trimmed = value.trim();
        if trimmed.chars().count() < min {
            self.errors.push(FieldError::new(
                field,
                &format!("Must be at least {} characters long", min),
            ));
        }
        trimmed.to_string()
    }

    /// Trims `value` and requires between `min` and `max` characters.
    pub fn len_between(&mut self, field: &str, value: &str, min: usize, max: usize) -> String {
        let trimmed = value.trim();
        let len = trimmed.chars().count();
        if len < min || len > max {
            self.errors.push(FieldError::new(
                field,
                &format!("Must be between {} and {} characters long", min, max),
            ));
        }
        trimmed.to_string()
    }

    pub fn not_empty(&mut self, field: &str, value: &str) -> String {
        self.min_len(field, value, 1)
    }

    /// Trims and lower-cases the address.
    pub fn email(&mut self, field: &str, value: &str) -> String {
        let normalized = value.trim().to_lowercase();
        if !EMAIL_REGEX.is_match(&normalized) {
            self.errors
                .push(FieldError::new(field, "Please enter a valid email"));
        }
        normalized
    }

    pub fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn finish(self) -> Result<(), ServiceError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self.errors))
        }
    }
}

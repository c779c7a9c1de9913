//! Error types for the PowerGuard admin client.
//!
//! # Design
//! Every failure path ends in an `ApiError` value that the controller keeps
//! in its state and the view renders. `NotFound` and `Unauthorized` get
//! dedicated variants because views distinguish them from other statuses.
//! All other non-2xx responses land in `Http` with the raw status and body.
//!
//! The enum is `Clone` so controllers can both store the error and return it
//! to the host.

use indexmap::IndexMap;
use thiserror::Error;

/// Per-field validation messages, in form order.
pub type FieldErrors = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Base URL or token missing before any request was built.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Client-side validation failed. No request was issued.
    #[error("validation failed: {}", summarize(.0))]
    Validation(FieldErrors),

    /// The server rejected the token (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 401/403/404.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The host could not complete the round-trip.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not match the expected schema.
    #[error("unexpected response format: {0}")]
    Format(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Single-field validation error.
    pub fn invalid(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.to_string());
        ApiError::Validation(errors)
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

fn summarize(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_lists_fields_in_order() {
        let mut errors = FieldErrors::new();
        errors.insert("system_id".into(), "This field is required".into());
        errors.insert("tilt".into(), "This field is required".into());
        let err = ApiError::Validation(errors);
        assert_eq!(
            err.to_string(),
            "validation failed: system_id: This field is required; tilt: This field is required"
        );
    }

    #[test]
    fn field_errors_only_for_validation() {
        assert!(ApiError::NotFound.field_errors().is_none());
        let err = ApiError::invalid("power_gen", "unknown field");
        assert_eq!(err.field_errors().unwrap()["power_gen"], "unknown field");
    }
}

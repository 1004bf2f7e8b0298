//! Error types for the store and the HTTP edge.
//!
//! Response bodies follow the usual REST framework shapes: `{"detail": ...}`
//! for request-level failures and `{"field": ["message"]}` for validation.

use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by a [`crate::store::Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username {0:?} is already taken")]
    UsernameTaken(String),

    #[error("category {0} does not exist")]
    UnknownCategory(i32),

    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error(transparent)]
    Query(#[from] diesel::result::Error),
}

/// Validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found.")]
    NotFound,

    #[error("invalid input: {0:?}")]
    Validation(FieldErrors),

    #[error("{0}")]
    Malformed(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(StoreError),
}

impl ApiError {
    /// A single validation message for one field.
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), vec![message.into()]);
        ApiError::Validation(errors)
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::Malformed(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::NotAuthenticated | ApiError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(_) => {
                ApiError::field("username", "A user with that username already exists.")
            }
            StoreError::UnknownCategory(id) => {
                ApiError::field("category", format!("Invalid pk \"{id}\" - object does not exist."))
            }
            other => ApiError::Store(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(r) => ApiError::UnsupportedMediaType(r.body_text()),
            other => ApiError::Malformed(other.body_text()),
        }
    }
}

/// A path id that does not parse can never match a record.
impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        ApiError::Validation(fields)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(fields) => (status, Json(fields)).into_response(),
            ApiError::NotAuthenticated | ApiError::AuthenticationFailed(_) => (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer realm=\"api\"")],
                Json(json!({ "detail": self.to_string() })),
            )
                .into_response(),
            ApiError::Internal(_) | ApiError::Store(_) => {
                tracing::error!("{}", self);
                (status, Json(json!({ "detail": "A server error occurred." }))).into_response()
            }
            _ => (status, Json(json!({ "detail": self.to_string() }))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_uses_detail_body() {
        let response = ApiError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({ "detail": "Not found." }));
    }

    #[tokio::test]
    async fn unknown_category_becomes_field_error() {
        let response = ApiError::from(StoreError::UnknownCategory(42)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "category": ["Invalid pk \"42\" - object does not exist."] })
        );
    }

    #[tokio::test]
    async fn unauthenticated_carries_challenge_header() {
        let response = ApiError::NotAuthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn store_failures_hide_details() {
        let response = ApiError::from(StoreError::Unavailable("pool timed out".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "detail": "A server error occurred." }));
    }
}

//! Error types for the HTTP layer.
//!
//! [`ApiError`] unifies every failure a handler can return and converts
//! into a JSON body of the shape `{error, reason, status}` via its
//! [`IntoResponse`] implementation.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use queueless_core::QueueError;
use tracing::error;

/// Message for a request with no bearer token.
pub const TOKEN_MISSING: &str = "Authentication token missing";

/// Message for a bearer token that matches no grant.
pub const TOKEN_INVALID: &str = "Invalid or expired token";

/// Message for an authenticated caller without the required role.
pub const FORBIDDEN: &str = "You do not have permission to access this resource";

/// Errors that can occur while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A queue or appointment operation failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The request could not be understood (bad id, query, or body).
    #[error("{0}")]
    BadRequest(String),

    /// No usable credentials.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// Credentials are valid but the role is insufficient.
    #[error("You do not have permission to access this resource")]
    Forbidden,

    /// The client is locked out after repeated failed authentications.
    #[error("too many failed authentication attempts, retry in {retry_after_secs}s")]
    TooManyAttempts {
        /// Seconds until the lockout lifts.
        retry_after_secs: u64,
    },
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Queue(QueueError::Validation(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Queue(QueueError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Queue(QueueError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Queue(QueueError::Store(_) | QueueError::Internal(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Queue(QueueError::InvalidCredentials) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::TooManyAttempts { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Machine-readable tag for the error body.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Queue(err) => err.reason(),
            Self::BadRequest(_) => "invalid_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::TooManyAttempts { .. } => "too_many_attempts",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Queue(QueueError::Store(err)) => {
                error!(error = %err, "Entry store failure");
                String::from("Internal server error")
            }
            Self::Queue(QueueError::Internal(detail)) => {
                error!(error = %detail, "Internal failure");
                String::from("Internal server error")
            }
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "error": message,
            "reason": self.reason(),
            "status": status.as_u16(),
        });

        if let Self::TooManyAttempts { retry_after_secs } = self {
            body["retryAfter"] = serde_json::json!(retry_after_secs);
            let mut response = (status, axum::Json(body)).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            return response;
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use queueless_db::DbError;

    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            ApiError::from(QueueError::Validation(String::from("x"))).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(QueueError::NotFound("Queue entry not found")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(QueueError::Store(DbError::Decode(String::from("x")))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::TooManyAttempts {
                retry_after_secs: 60
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(QueueError::Conflict("User already exists.")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(QueueError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let response =
            ApiError::from(QueueError::Internal(String::from("argon2 blew up"))).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["reason"], "internal_error");
    }

    #[test]
    fn reasons_pass_through_queue_errors() {
        let err = ApiError::from(QueueError::NotFound("Appointment not found"));
        assert_eq!(err.reason(), "not_found");
        assert_eq!(err.to_string(), "Appointment not found");
        assert_eq!(ApiError::Forbidden.reason(), "forbidden");
    }

    #[test]
    fn lockout_sets_retry_after_header() {
        let response = ApiError::TooManyAttempts {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(
            response.headers().get(header::RETRY_AFTER),
            Some(&HeaderValue::from(42_u64))
        );
    }
}

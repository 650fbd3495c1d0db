//! Error types for queue, appointment, and account operations.

use queueless_db::DbError;
use validator::ValidationErrors;

/// Message returned when a queue entry id does not resolve.
pub const ENTRY_NOT_FOUND: &str = "Queue entry not found";

/// Message returned when an appointment id does not resolve.
pub const APPOINTMENT_NOT_FOUND: &str = "Appointment not found";

/// Message returned when signup names an email that already has an account.
pub const USER_EXISTS: &str = "User already exists.";

/// Errors surfaced by the queue lifecycle, status projector, appointment
/// service, and account service.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Caller input was missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The referenced record does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// The record would duplicate a unique one.
    #[error("{0}")]
    Conflict(&'static str),

    /// Unknown email or wrong password. The two are never distinguished.
    #[error("Invalid email or password.")]
    InvalidCredentials,

    /// The entry store failed.
    #[error("entry store failure: {0}")]
    Store(#[from] DbError),

    /// Password hashing or a blocking task failed.
    #[error("internal failure: {0}")]
    Internal(String),
}

impl QueueError {
    /// Stable machine-readable tag for the error body.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Store(_) => "store_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<ValidationErrors> for QueueError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(describe(&errors))
    }
}

/// Flatten field errors into one sorted, `; `-separated message.
fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| {
                err.message
                    .as_ref()
                    .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
            })
        })
        .collect();
    messages.sort();
    messages.dedup();
    if messages.is_empty() {
        String::from("invalid request")
    } else {
        messages.join("; ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use queueless_types::JoinQueueRequest;
    use validator::Validate;

    use super::*;

    #[test]
    fn reasons_are_stable() {
        assert_eq!(
            QueueError::Validation(String::new()).reason(),
            "validation_error"
        );
        assert_eq!(QueueError::NotFound(ENTRY_NOT_FOUND).reason(), "not_found");
        assert_eq!(
            QueueError::Store(DbError::Decode(String::from("bad"))).reason(),
            "store_error"
        );
        assert_eq!(QueueError::Conflict(USER_EXISTS).reason(), "conflict");
        assert_eq!(
            QueueError::InvalidCredentials.reason(),
            "invalid_credentials"
        );
        assert_eq!(
            QueueError::Internal(String::from("join")).reason(),
            "internal_error"
        );
    }

    #[test]
    fn credential_failures_share_one_message() {
        assert_eq!(
            QueueError::InvalidCredentials.to_string(),
            "Invalid email or password."
        );
        assert_eq!(
            QueueError::Conflict(USER_EXISTS).to_string(),
            "User already exists."
        );
    }

    #[test]
    fn validation_messages_are_sorted_and_joined() {
        let request = JoinQueueRequest::default();
        let err = QueueError::from(request.validate().unwrap_err());
        assert_eq!(err.reason(), "validation_error");
        let message = err.to_string();
        assert!(message.contains("studentName is required"));
        assert!(message.contains("serviceType is required"));
        assert!(message.contains("; "));
    }

    #[test]
    fn not_found_displays_message() {
        assert_eq!(
            QueueError::NotFound(APPOINTMENT_NOT_FOUND).to_string(),
            "Appointment not found"
        );
    }
}

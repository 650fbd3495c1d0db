//! Request payloads accepted from students and staff.
//!
//! Every text field is run through [`sanitize_text`] before validation so
//! that a value consisting only of whitespace or markup brackets counts as
//! missing. Missing JSON fields deserialize to empty strings and are then
//! rejected by [`Validate`], which keeps "field absent" and "field blank"
//! on the same error path. Account payloads are normalized instead of
//! sanitized: passwords are taken byte for byte.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::{Validate, ValidationError};

use crate::enums::{AppointmentStatus, QueueStatus, Role};

/// Strip `<` and `>` and surrounding whitespace from user-supplied text.
pub fn sanitize_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .to_owned()
}

fn sanitize_opt(raw: Option<String>) -> Option<String> {
    raw.map(|s| sanitize_text(&s))
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Body of `POST /api/queue`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct JoinQueueRequest {
    /// Display name of the student.
    #[serde(default)]
    #[validate(length(min = 1, message = "studentName is required"))]
    pub student_name: String,
    /// Service the student is queueing for.
    #[serde(default)]
    #[validate(length(min = 1, message = "serviceType is required"))]
    pub service_type: String,
    /// Phone number for call-back.
    #[serde(default)]
    #[validate(length(min = 1, message = "contactNumber is required"))]
    pub contact_number: String,
}

impl JoinQueueRequest {
    /// Return a copy with every field sanitized.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            student_name: sanitize_text(&self.student_name),
            service_type: sanitize_text(&self.service_type),
            contact_number: sanitize_text(&self.contact_number),
        }
    }
}

/// Body of `PUT /api/queue/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatusUpdateRequest {
    /// Target status.
    pub status: QueueStatus,
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

fn validate_date(value: &str) -> Result<(), ValidationError> {
    if chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(invalid("date_format", "appointmentDate must be YYYY-MM-DD"))
    }
}

fn validate_time(value: &str) -> Result<(), ValidationError> {
    if chrono::NaiveTime::parse_from_str(value, "%H:%M").is_ok() {
        Ok(())
    } else {
        Err(invalid("time_format", "appointmentTime must be HH:MM"))
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Body of `POST /api/appointments`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NewAppointmentRequest {
    /// Display name of the student.
    #[serde(default)]
    #[validate(length(min = 1, message = "studentName is required"))]
    pub student_name: String,
    /// Service booked.
    #[serde(default)]
    #[validate(length(min = 1, message = "serviceType is required"))]
    pub service_type: String,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    #[validate(custom(function = "validate_date"))]
    pub appointment_date: String,
    /// `HH:MM`.
    #[serde(default)]
    #[validate(custom(function = "validate_time"))]
    pub appointment_time: String,
    /// Optional notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Initial status; defaults to `Booked`.
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

impl NewAppointmentRequest {
    /// Return a copy with every text field sanitized.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            student_name: sanitize_text(&self.student_name),
            service_type: sanitize_text(&self.service_type),
            appointment_date: sanitize_text(&self.appointment_date),
            appointment_time: sanitize_text(&self.appointment_time),
            notes: sanitize_opt(self.notes),
            status: self.status,
        }
    }
}

/// Body of `PUT /api/appointments/{id}`; only present fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AppointmentPatch {
    /// New status.
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    /// Replacement notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Rescheduled service.
    #[serde(default)]
    #[validate(length(min = 1, message = "serviceType must not be empty"))]
    pub service_type: Option<String>,
    /// Rescheduled date.
    #[serde(default)]
    #[validate(custom(function = "validate_date"))]
    pub appointment_date: Option<String>,
    /// Rescheduled time.
    #[serde(default)]
    #[validate(custom(function = "validate_time"))]
    pub appointment_time: Option<String>,
}

impl AppointmentPatch {
    /// Return a copy with every text field sanitized.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            status: self.status,
            notes: sanitize_opt(self.notes),
            service_type: sanitize_opt(self.service_type),
            appointment_date: sanitize_opt(self.appointment_date),
            appointment_time: sanitize_opt(self.appointment_time),
        }
    }

    /// Whether the patch changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.notes.is_none()
            && self.service_type.is_none()
            && self.appointment_date.is_none()
            && self.appointment_time.is_none()
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Characters of which a password needs at least one.
const PASSWORD_SPECIALS: &str = "@$!%*?&";

fn validate_password(value: &str) -> Result<(), ValidationError> {
    let long_enough = value.chars().count() >= 6;
    let has_letter = value.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    let has_special = value.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if long_enough && has_letter && has_digit && has_special {
        Ok(())
    } else {
        Err(invalid(
            "weak_password",
            "Password must be at least 6 characters long and include a number and special character.",
        ))
    }
}

fn validate_role(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<Role>()
        .map(drop)
        .map_err(|e| {
            let mut err = invalid("role", "Invalid role selected.");
            err.add_param(Cow::Borrowed("value"), &e.0);
            err
        })
}

/// Body of `POST /api/auth/signup`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SignupRequest {
    /// Login name.
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Please provide email, password, and role."),
        email(message = "Invalid email format.")
    )]
    pub email: String,
    /// Plain-text password; hashed before storage.
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Please provide email, password, and role."),
        custom(function = "validate_password")
    )]
    pub password: String,
    /// `student` or `staff`.
    #[serde(default)]
    #[validate(
        length(min = 1, message = "Please provide email, password, and role."),
        custom(function = "validate_role")
    )]
    pub role: String,
}

impl SignupRequest {
    /// Trim and lowercase the email, trim the role. The password is
    /// taken verbatim.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            password: self.password,
            role: self.role.trim().to_owned(),
        }
    }

    /// The requested role, once validation has passed.
    pub fn parsed_role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

impl core::fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Body of `POST /api/auth/login`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LoginRequest {
    /// Login name.
    #[serde(default)]
    #[validate(length(min = 1, message = "Email and password are required."))]
    pub email: String,
    /// Plain-text password.
    #[serde(default)]
    #[validate(length(min = 1, message = "Email and password are required."))]
    pub password: String,
}

impl LoginRequest {
    /// Trim and lowercase the email.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Emails compare case-insensitively.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_brackets_and_whitespace() {
        assert_eq!(sanitize_text("  <b>Alice</b> "), "bAlice/b");
        assert_eq!(sanitize_text(" <> "), "");
    }

    #[test]
    fn missing_fields_fail_validation() {
        let req: JoinQueueRequest =
            serde_json::from_str(r#"{"studentName":"Test Student"}"#).unwrap();
        let errors = req.sanitized().validate();
        assert!(errors.is_err());
    }

    #[test]
    fn markup_only_name_is_blank() {
        let req = JoinQueueRequest {
            student_name: String::from("<>"),
            service_type: String::from("IT Support"),
            contact_number: String::from("0412345678"),
        };
        assert!(req.sanitized().validate().is_err());
    }

    #[test]
    fn complete_join_request_is_valid() {
        let req = JoinQueueRequest {
            student_name: String::from(" Alice "),
            service_type: String::from("IT Support"),
            contact_number: String::from("0412345678"),
        }
        .sanitized();
        assert!(req.validate().is_ok());
        assert_eq!(req.student_name, "Alice");
    }

    #[test]
    fn appointment_date_and_time_formats() {
        let mut req = NewAppointmentRequest {
            student_name: String::from("Test Student"),
            service_type: String::from("Student Services"),
            appointment_date: String::from("2025-02-15"),
            appointment_time: String::from("10:00"),
            notes: None,
            status: None,
        };
        assert!(req.validate().is_ok());

        req.appointment_date = String::from("15/02/2025");
        assert!(req.validate().is_err());
    }

    #[test]
    fn patch_validates_only_present_fields() {
        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::Confirmed),
            ..AppointmentPatch::default()
        };
        assert!(patch.validate().is_ok());
        assert!(!patch.is_empty());
        assert!(AppointmentPatch::default().is_empty());

        let bad = AppointmentPatch {
            appointment_time: Some(String::from("25:99")),
            ..AppointmentPatch::default()
        };
        assert!(bad.validate().is_err());
    }

    fn signup(email: &str, password: &str, role: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_owned(),
            password: password.to_owned(),
            role: role.to_owned(),
        }
        .normalized()
    }

    #[test]
    fn signup_accepts_strong_password_and_known_role() {
        let req = signup(" Alice@Uni.Example ", "secret1!", "student");
        assert!(req.validate().is_ok());
        assert_eq!(req.email, "alice@uni.example");
        assert_eq!(req.parsed_role(), Some(Role::Student));
    }

    #[test]
    fn signup_rejects_bad_email_weak_password_and_unknown_role() {
        assert!(signup("not-an-email", "secret1!", "staff").validate().is_err());
        assert!(signup("a@uni.example", "secret1", "staff").validate().is_err());
        assert!(signup("a@uni.example", "secret!!", "staff").validate().is_err());
        assert!(signup("a@uni.example", "s1!", "staff").validate().is_err());

        let admin = signup("a@uni.example", "secret1!", "admin");
        let errors = admin.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("role"));
        assert_eq!(admin.parsed_role(), None);
    }

    #[test]
    fn login_requires_both_fields() {
        let req: LoginRequest = serde_json::from_str(r#"{"email":"a@uni.example"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn password_never_appears_in_debug() {
        let req = signup("a@uni.example", "secret1!", "staff");
        assert!(!format!("{req:?}").contains("secret1!"));
        let login = LoginRequest {
            email: String::from("a@uni.example"),
            password: String::from("secret1!"),
        };
        assert!(!format!("{login:?}").contains("secret1!"));
    }
}

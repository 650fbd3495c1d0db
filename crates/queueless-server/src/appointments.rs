//! Appointment endpoint handlers.
//!
//! Students book and look up their own appointments; listing, updating,
//! and deleting are staff operations.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use queueless_types::{AppointmentId, AppointmentPatch, NewAppointmentRequest};

use crate::auth::{RequireStaff, RequireUser};
use crate::error::ApiError;
use crate::state::AppState;

fn parse_appointment_id(raw: &str) -> Result<AppointmentId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid appointment id '{raw}': {e}")))
}

/// `POST /api/appointments` -- book; responds 201.
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    RequireUser(_principal): RequireUser,
    payload: Result<Json<NewAppointmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let appointment = state.appointments.book(request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// `GET /api/appointments` -- all appointments, earliest first.
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    RequireStaff(_principal): RequireStaff,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.appointments.list().await?))
}

/// `GET /api/appointments/{id}`
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    RequireUser(_principal): RequireUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_appointment_id(&id)?;
    Ok(Json(state.appointments.get(id).await?))
}

/// `PUT /api/appointments/{id}` -- partial update.
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    RequireStaff(_principal): RequireStaff,
    Path(id): Path<String>,
    payload: Result<Json<AppointmentPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_appointment_id(&id)?;
    let Json(patch) = payload?;
    Ok(Json(state.appointments.update(id, patch).await?))
}

/// `DELETE /api/appointments/{id}`
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    RequireStaff(_principal): RequireStaff,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_appointment_id(&id)?;
    state.appointments.remove(id).await?;
    Ok(Json(serde_json::json!({ "message": "Appointment deleted successfully" })))
}

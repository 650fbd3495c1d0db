//! Queue endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Access | Description |
//! |--------|------|--------|-------------|
//! | `GET` | `/api/health` | public | Liveness and store reachability |
//! | `POST` | `/api/queue` | user | Join the queue |
//! | `GET` | `/api/queue` | staff | Roster, filterable by status and service |
//! | `GET` | `/api/queue/stats` | staff | Dashboard counters |
//! | `GET` | `/api/queue/{id}` | user | One entry with live position |
//! | `GET` | `/api/queue/{id}/waittime` | user | Position, wait, status |
//! | `PUT` | `/api/queue/{id}` | staff | Change status |
//! | `DELETE` | `/api/queue/{id}` | user | Leave the queue |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use queueless_types::{
    EntryFilter, JoinQueueRequest, QueueEntryId, QueueStatus, StatusUpdateRequest,
};
use tracing::{debug, warn};

use crate::auth::{RequireStaff, RequireUser};
use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/queue`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterQuery {
    /// Only entries in this status (`Waiting`, `In Progress`, ...).
    pub status: Option<String>,
    /// Only entries for this service.
    pub service_type: Option<String>,
}

impl RosterQuery {
    fn into_filter(self) -> Result<EntryFilter, ApiError> {
        let status = self
            .status
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<QueueStatus>())
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        Ok(EntryFilter {
            status,
            service_type: self.service_type.filter(|s| !s.is_empty()),
        })
    }
}

/// Parse a queue entry id from a path segment.
pub(crate) fn parse_entry_id(raw: &str) -> Result<QueueEntryId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid queue entry id '{raw}': {e}")))
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Report liveness and whether the entry store answers.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let backend = state.store.backend_name();
    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok", "store": backend })),
        ),
        Err(e) => {
            warn!(error = %e, backend, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable", "store": backend })),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/queue
// ---------------------------------------------------------------------------

/// Join the queue. Responds 201 with the new entry and its position.
pub async fn join_queue(
    State(state): State<Arc<AppState>>,
    RequireUser(_principal): RequireUser,
    payload: Result<Json<JoinQueueRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let view = state.queue.join(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "queueEntry": view })),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/queue
// ---------------------------------------------------------------------------

/// Staff roster of entries, each with its live position.
pub async fn list_queue(
    State(state): State<Arc<AppState>>,
    RequireStaff(_principal): RequireStaff,
    query: Result<Query<RosterQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let roster = state.projector.roster(&filter).await?;
    Ok(Json(roster))
}

// ---------------------------------------------------------------------------
// GET /api/queue/stats
// ---------------------------------------------------------------------------

/// Dashboard counters.
pub async fn queue_stats(
    State(state): State<Arc<AppState>>,
    RequireStaff(_principal): RequireStaff,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.projector.stats().await?))
}

// ---------------------------------------------------------------------------
// GET /api/queue/{id}
// ---------------------------------------------------------------------------

/// One entry with its live position and wait.
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    RequireUser(_principal): RequireUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_entry_id(&id)?;
    Ok(Json(state.projector.entry(id).await?))
}

// ---------------------------------------------------------------------------
// GET /api/queue/{id}/waittime
// ---------------------------------------------------------------------------

/// Position, wait, and status only.
pub async fn get_wait_time(
    State(state): State<Arc<AppState>>,
    RequireUser(_principal): RequireUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_entry_id(&id)?;
    Ok(Json(state.projector.wait_time(id).await?))
}

// ---------------------------------------------------------------------------
// PUT /api/queue/{id}
// ---------------------------------------------------------------------------

/// Move an entry to a new status.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    RequireStaff(principal): RequireStaff,
    Path(id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_entry_id(&id)?;
    let Json(request) = payload?;
    debug!(entry_id = %id, by = %principal.subject, "Status update requested");
    Ok(Json(state.queue.transition(id, request.status).await?))
}

// ---------------------------------------------------------------------------
// DELETE /api/queue/{id}
// ---------------------------------------------------------------------------

/// Leave the queue.
pub async fn leave_queue(
    State(state): State<Arc<AppState>>,
    RequireUser(_principal): RequireUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_entry_id(&id)?;
    state.queue.leave(id).await?;
    Ok(Json(serde_json::json!({ "message": "Successfully left the queue" })))
}

//! Axum router construction.
//!
//! Assembles every route into a single [`Router`] with CORS enabled for
//! the student and staff frontends and HTTP request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::accounts;
use crate::appointments;
use crate::handlers;
use crate::state::AppState;

/// Build the complete router.
///
/// The router includes:
/// - `GET /api/health` -- liveness
/// - `POST /api/auth/signup`, `POST /api/auth/login` -- accounts
/// - `GET /api/auth/profile` -- token owner
/// - `POST|GET /api/queue` -- join, staff roster
/// - `GET /api/queue/stats` -- dashboard counters
/// - `GET|PUT|DELETE /api/queue/{id}` -- entry, status change, leave
/// - `GET /api/queue/{id}/waittime` -- wait-time estimate
/// - `POST|GET /api/appointments` -- book, list
/// - `GET|PUT|DELETE /api/appointments/{id}` -- fetch, update, delete
///
/// CORS allows any origin; deployments behind a gateway should narrow it
/// there.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        // Accounts
        .route("/api/auth/signup", post(accounts::signup))
        .route("/api/auth/login", post(accounts::login))
        .route("/api/auth/profile", get(accounts::profile))
        // Queue
        .route(
            "/api/queue",
            get(handlers::list_queue).post(handlers::join_queue),
        )
        .route("/api/queue/stats", get(handlers::queue_stats))
        .route(
            "/api/queue/{id}",
            get(handlers::get_entry)
                .put(handlers::update_status)
                .delete(handlers::leave_queue),
        )
        .route("/api/queue/{id}/waittime", get(handlers::get_wait_time))
        // Appointments
        .route(
            "/api/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/api/appointments/{id}",
            get(appointments::get_appointment)
                .put(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

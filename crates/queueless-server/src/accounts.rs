//! Account endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Access | Description |
//! |--------|------|--------|-------------|
//! | `POST` | `/api/auth/signup` | public | Register a student or staff account |
//! | `POST` | `/api/auth/login` | public, attempt-limited | Exchange credentials for a token |
//! | `GET` | `/api/auth/profile` | user | Who the presented token belongs to |
//!
//! Every login response, including 429, carries `X-RateLimit-Limit`,
//! `X-RateLimit-Remaining`, and `X-RateLimit-Reset` (epoch seconds).

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use queueless_core::QueueError;
use queueless_types::{LoginRequest, SignupRequest};

use crate::auth::{ClientAddr, RequireUser, admit};
use crate::error::ApiError;
use crate::rate_limit::retry_after_secs;
use crate::state::AppState;

const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

// ---------------------------------------------------------------------------
// POST /api/auth/signup
// ---------------------------------------------------------------------------

/// Register an account. Responds 201; the password is never echoed.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let account = state.accounts.signup(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "User registered successfully.",
            "userId": account.id,
            "role": account.role,
        })),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/auth/login
// ---------------------------------------------------------------------------

/// Exchange email and password for a bearer token.
///
/// A wrong password or unknown email counts against the client's attempt
/// budget and is answered only after the configured delay. Success clears
/// the client's record.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientAddr(client): ClientAddr,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let now = Instant::now();
    if let Err(locked) = admit(&state, &client, now).await {
        return with_budget(&state, &client, locked.into_response()).await;
    }

    let outcome = match payload {
        Ok(Json(request)) => state
            .accounts
            .login(request, Utc::now())
            .await
            .map_err(ApiError::from),
        Err(rejection) => Err(ApiError::from(rejection)),
    };

    let response = match outcome {
        Ok(issued) => {
            state.limiter.record_success(&client).await;
            Json(issued).into_response()
        }
        Err(err @ ApiError::Queue(QueueError::InvalidCredentials)) => {
            state.limiter.record_failure(&client, now).await;
            tokio::time::sleep(state.login_failure_delay).await;
            err.into_response()
        }
        Err(err) => {
            state.limiter.release(&client).await;
            err.into_response()
        }
    };
    with_budget(&state, &client, response).await
}

/// Attach the client's remaining attempt budget to `response`.
async fn with_budget(state: &AppState, client: &str, mut response: Response) -> Response {
    let budget = state.limiter.status(client, Instant::now()).await;
    let reset_in = i64::try_from(retry_after_secs(budget.reset_after)).unwrap_or(i64::MAX);
    let reset_at = Utc::now().timestamp().saturating_add(reset_in);

    let headers = response.headers_mut();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(budget.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(budget.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(reset_at));
    response
}

// ---------------------------------------------------------------------------
// GET /api/auth/profile
// ---------------------------------------------------------------------------

/// The authenticated caller's subject and role.
pub async fn profile(RequireUser(principal): RequireUser) -> impl IntoResponse {
    Json(serde_json::json!({
        "subject": principal.subject,
        "role": principal.role,
    }))
}

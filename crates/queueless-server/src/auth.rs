//! Bearer-token authentication and role gating.
//!
//! Handlers opt in by taking one of two extractors:
//!
//! - [`RequireUser`] -- any valid token (student or staff)
//! - [`RequireStaff`] -- a valid token carrying the staff role
//!
//! A token is accepted if it matches a static grant from the config or a
//! live login token issued by the account service. Both extractors go
//! through the [`AttemptTracker`](crate::rate_limit::AttemptTracker)
//! first, so a locked-out client is refused before its token is even
//! looked at. When auth is disabled every request resolves to an
//! anonymous staff principal.
//!
//! Clients are told apart by socket peer address. `X-Forwarded-For` is
//! only consulted when `server.trust_forwarded_for` is set, since any
//! client can write that header.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use chrono::Utc;
use queueless_core::config::{AuthConfig, Role};
use queueless_types::Session;
use tracing::{debug, warn};

use crate::error::{ApiError, TOKEN_INVALID, TOKEN_MISSING};
use crate::rate_limit::retry_after_secs;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Who the token was issued to.
    pub subject: String,
    /// What they may do.
    pub role: Role,
}

impl Principal {
    fn anonymous_staff() -> Self {
        Self {
            subject: String::from("anonymous"),
            role: Role::Staff,
        }
    }
}

impl From<Session> for Principal {
    fn from(session: Session) -> Self {
        Self {
            subject: session.email,
            role: session.role,
        }
    }
}

/// Why a token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No bearer token was presented.
    Missing,
    /// The token matches no configured grant.
    Invalid,
}

/// Resolves bearer tokens against the static grants in the config.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    enabled: bool,
    grants: HashMap<String, Principal>,
}

impl AuthGate {
    /// Build the gate from the auth config section.
    pub fn from_config(config: &AuthConfig) -> Self {
        let grants = config
            .tokens
            .iter()
            .map(|grant| {
                (
                    grant.token.clone(),
                    Principal {
                        subject: grant.subject.clone(),
                        role: grant.role,
                    },
                )
            })
            .collect();
        Self {
            enabled: config.enabled,
            grants,
        }
    }

    /// Whether tokens are checked at all.
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Look up the principal for a presented token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFailure`] describing why the token was refused.
    pub fn resolve(&self, token: Option<&str>) -> Result<Principal, AuthFailure> {
        let token = token.ok_or(AuthFailure::Missing)?;
        self.grants.get(token).cloned().ok_or(AuthFailure::Invalid)
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Client identity for attempt tracking.
///
/// The socket peer address, or the first `X-Forwarded-For` hop when
/// `trust_forwarded_for` is set and the header is present. `"unknown"`
/// when neither is available.
pub fn client_identity(parts: &Parts, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_owned();
        }
    }
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| String::from("unknown"), |info| info.0.ip().to_string())
}

/// Refuse a locked-out client, otherwise count one attempt for it.
pub(crate) async fn admit(state: &AppState, client: &str, now: Instant) -> Result<(), ApiError> {
    state
        .limiter
        .acquire(client, now)
        .await
        .map_err(|remaining| ApiError::TooManyAttempts {
            retry_after_secs: retry_after_secs(remaining),
        })
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Principal, ApiError> {
    if !state.auth.enabled() {
        return Ok(Principal::anonymous_staff());
    }

    let client = client_identity(parts, state.trust_forwarded_for);
    let now = Instant::now();
    admit(state, &client, now).await?;

    let Some(token) = bearer_token(&parts.headers) else {
        state.limiter.release(&client).await;
        return Err(ApiError::Unauthorized(TOKEN_MISSING));
    };

    let principal = match state.auth.resolve(Some(token)) {
        Ok(principal) => Some(principal),
        Err(_) => match state.accounts.session(token, Utc::now()).await {
            Ok(session) => session.map(Principal::from),
            Err(err) => {
                state.limiter.release(&client).await;
                return Err(ApiError::from(err));
            }
        },
    };

    if let Some(principal) = principal {
        state.limiter.release(&client).await;
        debug!(subject = %principal.subject, role = principal.role.as_str(), "Authenticated");
        Ok(principal)
    } else {
        warn!(client = %client, "Rejected bearer token");
        state.limiter.record_failure(&client, now).await;
        Err(ApiError::Unauthorized(TOKEN_INVALID))
    }
}

/// The caller's identity for attempt tracking, per [`client_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

impl FromRequestParts<Arc<AppState>> for ClientAddr {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(client_identity(parts, state.trust_forwarded_for)))
    }
}

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct RequireUser(pub Principal);

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(Self)
    }
}

/// An authenticated caller with the staff role.
#[derive(Debug, Clone)]
pub struct RequireStaff(pub Principal);

impl FromRequestParts<Arc<AppState>> for RequireStaff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts, state).await?;
        if principal.role == Role::Staff {
            Ok(Self(principal))
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;
    use queueless_core::config::TokenGrant;

    use super::*;

    fn gate() -> AuthGate {
        AuthGate::from_config(&AuthConfig {
            enabled: true,
            tokens: vec![TokenGrant {
                token: String::from("staff-token"),
                subject: String::from("desk-1"),
                role: Role::Staff,
            }],
            ..AuthConfig::default()
        })
    }

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn resolves_known_token() {
        let principal = gate().resolve(Some("staff-token")).unwrap();
        assert_eq!(principal.subject, "desk-1");
        assert_eq!(principal.role, Role::Staff);
    }

    #[test]
    fn distinguishes_missing_from_invalid() {
        assert_eq!(gate().resolve(None), Err(AuthFailure::Missing));
        assert_eq!(gate().resolve(Some("nope")), Err(AuthFailure::Invalid));
    }

    #[test]
    fn bearer_prefix_is_required() {
        let with_prefix = parts(Request::get("/").header("authorization", "Bearer abc"));
        assert_eq!(bearer_token(&with_prefix.headers), Some("abc"));
        let without = parts(Request::get("/").header("authorization", "abc"));
        assert_eq!(bearer_token(&without.headers), None);
        let empty = parts(Request::get("/").header("authorization", "Bearer "));
        assert_eq!(bearer_token(&empty.headers), None);
    }

    fn from_peer(forwarded_for: &str) -> Parts {
        let mut peer = parts(Request::get("/").header("x-forwarded-for", forwarded_for));
        peer.extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 40_000))));
        peer
    }

    #[test]
    fn client_identity_ignores_forwarded_for_by_default() {
        let peer = from_peer("203.0.113.7, 10.0.0.1");
        assert_eq!(client_identity(&peer, false), "192.0.2.10");

        let bare = parts(Request::get("/").header("x-forwarded-for", "203.0.113.7"));
        assert_eq!(client_identity(&bare, false), "unknown");
    }

    #[test]
    fn client_identity_uses_first_hop_when_trusted() {
        let peer = from_peer("203.0.113.7, 10.0.0.1");
        assert_eq!(client_identity(&peer, true), "203.0.113.7");

        let blank = from_peer(" ");
        assert_eq!(client_identity(&blank, true), "192.0.2.10");
    }

    #[test]
    fn session_becomes_principal() {
        let now = Utc::now();
        let session = Session {
            token: String::from("t"),
            user_id: queueless_types::UserId::new(),
            email: String::from("alice@uni.example"),
            role: Role::Student,
            issued_at: now,
            expires_at: now,
        };
        let principal = Principal::from(session);
        assert_eq!(principal.subject, "alice@uni.example");
        assert_eq!(principal.role, Role::Student);
    }
}

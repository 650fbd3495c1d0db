//! Student and staff accounts: signup, login, and token lookup.
//!
//! Passwords are hashed with Argon2id and a random per-account salt.
//! Hashing is CPU-bound, so it runs on the blocking pool rather than an
//! async worker. Login issues an opaque random token that the entry
//! store keeps until it expires; there is no refresh.

use core::fmt::Write as _;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{DateTime, TimeDelta, Utc};
use queueless_db::EntryStore;
use queueless_types::{LoginRequest, LoginResponse, Session, SignupRequest, UserAccount, UserId};
use tracing::{info, warn};
use validator::Validate;

use crate::config::AuthConfig;
use crate::error::{QueueError, USER_EXISTS};

/// Message returned when a signup body leaves a field empty.
pub const SIGNUP_FIELDS_REQUIRED: &str = "Please provide email, password, and role.";

/// Message returned when a login body leaves a field empty.
pub const LOGIN_FIELDS_REQUIRED: &str = "Email and password are required.";

/// Argon2 passes over memory.
const HASH_ITERATIONS: u32 = 2;

/// Random bytes per login token.
const TOKEN_BYTES: usize = 32;

/// Length of the hex-encoded token.
const TOKEN_HEX_LEN: usize = 64;

/// Registers accounts and exchanges credentials for tokens.
#[derive(Clone)]
pub struct AccountService {
    store: EntryStore,
    hasher: Argon2<'static>,
    token_ttl: TimeDelta,
}

impl core::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccountService")
            .field("store", &self.store)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    /// Create a service over `store` with the token lifetime and hash cost
    /// from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Internal`] if the hash cost is out of range.
    pub fn new(store: EntryStore, config: &AuthConfig) -> Result<Self, QueueError> {
        let params = Params::new(config.password_memory_kib, HASH_ITERATIONS, 1, None)
            .map_err(|e| QueueError::Internal(format!("argon2 parameters: {e}")))?;
        let token_ttl = i64::try_from(config.token_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| QueueError::Internal(String::from("token lifetime out of range")))?;
        Ok(Self {
            store,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            token_ttl,
        })
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Validation`] for a missing field, a malformed
    /// email, a weak password, or a role other than student or staff;
    /// [`QueueError::Conflict`] when the email is already registered; and
    /// [`QueueError::Store`] if the store fails.
    pub async fn signup(&self, request: SignupRequest) -> Result<UserAccount, QueueError> {
        let request = request.normalized();
        if request.email.is_empty() || request.password.is_empty() || request.role.is_empty() {
            return Err(QueueError::Validation(SIGNUP_FIELDS_REQUIRED.to_owned()));
        }
        request.validate()?;
        let role = request
            .parsed_role()
            .ok_or_else(|| QueueError::Validation(String::from("Invalid role selected.")))?;

        let password_hash = self.hash(request.password).await?;
        let account = UserAccount {
            id: UserId::new(),
            email: request.email,
            password_hash,
            role,
            created_at: Utc::now(),
        };
        if !self.store.create_user(&account).await? {
            return Err(QueueError::Conflict(USER_EXISTS));
        }

        info!(
            user_id = %account.id,
            email = %account.email,
            role = %account.role,
            "Account created"
        );
        Ok(account)
    }

    /// Check credentials and issue a token valid from `now` for the
    /// configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Validation`] for an empty field,
    /// [`QueueError::InvalidCredentials`] for an unknown email or wrong
    /// password, and [`QueueError::Store`] if the store fails.
    pub async fn login(
        &self,
        request: LoginRequest,
        now: DateTime<Utc>,
    ) -> Result<LoginResponse, QueueError> {
        let request = request.normalized();
        if request.email.is_empty() || request.password.is_empty() {
            return Err(QueueError::Validation(LOGIN_FIELDS_REQUIRED.to_owned()));
        }

        let Some(account) = self.store.find_user_by_email(&request.email).await? else {
            warn!(email = %request.email, "Login for unknown account");
            return Err(QueueError::InvalidCredentials);
        };
        if !self
            .verify(request.password, account.password_hash.clone())
            .await?
        {
            warn!(user_id = %account.id, "Login with wrong password");
            return Err(QueueError::InvalidCredentials);
        }

        let session = Session {
            token: new_token(),
            user_id: account.id,
            email: account.email,
            role: account.role,
            issued_at: now,
            expires_at: now
                .checked_add_signed(self.token_ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.store.create_session(&session).await?;

        info!(
            user_id = %session.user_id,
            role = %session.role,
            expires_at = %session.expires_at,
            "Login succeeded"
        );
        Ok(LoginResponse {
            message: String::from("Login successful."),
            token: session.token,
            role: session.role,
            expires_at: session.expires_at,
        })
    }

    /// The session behind `token`, if it exists and has not expired at
    /// `now`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Store`] if the store fails.
    pub async fn session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, QueueError> {
        Ok(self
            .store
            .find_session(token)
            .await?
            .filter(|session| session.is_live(now)))
    }

    /// Drop every token expired at `now`; returns how many went.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Store`] if the store fails.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, QueueError> {
        Ok(self.store.delete_expired_sessions(now).await?)
    }

    async fn hash(&self, password: String) -> Result<String, QueueError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
                .map_err(|e| QueueError::Internal(format!("password salt: {e}")))?;
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| QueueError::Internal(format!("password hash: {e}")))
        })
        .await
        .map_err(|e| QueueError::Internal(format!("hashing task: {e}")))?
    }

    async fn verify(&self, password: String, stored: String) -> Result<bool, QueueError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&stored)
                .map_err(|e| QueueError::Internal(format!("stored password hash: {e}")))?;
            Ok(hasher
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| QueueError::Internal(format!("hashing task: {e}")))?
    }
}

/// A fresh hex-encoded bearer token.
fn new_token() -> String {
    rand::random::<[u8; TOKEN_BYTES]>()
        .iter()
        .fold(String::with_capacity(TOKEN_HEX_LEN), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use queueless_types::Role;

    use super::*;

    fn service() -> AccountService {
        let config = AuthConfig {
            password_memory_kib: 64,
            ..AuthConfig::default()
        };
        AccountService::new(EntryStore::in_memory(), &config).unwrap()
    }

    fn signup(email: &str, password: &str, role: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_owned(),
            password: password.to_owned(),
            role: role.to_owned(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }

    #[tokio::test]
    async fn signup_stores_a_hash_not_the_password() {
        let accounts = service();
        let account = accounts
            .signup(signup(" Alice@Uni.Example ", "s3cret!", "student"))
            .await
            .unwrap();
        assert_eq!(account.email, "alice@uni.example");
        assert_eq!(account.role, Role::Student);
        assert!(account.password_hash.starts_with("$argon2id$"));
        assert!(!account.password_hash.contains("s3cret!"));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let accounts = service();
        accounts
            .signup(signup("bob@uni.example", "s3cret!", "staff"))
            .await
            .unwrap();
        let err = accounts
            .signup(signup("BOB@uni.example", "other1!", "student"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Conflict(USER_EXISTS)));
    }

    #[tokio::test]
    async fn signup_rejects_bad_input() {
        let accounts = service();
        let cases = [
            (signup("", "s3cret!", "student"), SIGNUP_FIELDS_REQUIRED),
            (signup("not-an-email", "s3cret!", "student"), "Invalid email format."),
            (signup("c@uni.example", "password", "student"), "Password must be"),
            (signup("c@uni.example", "s3cret!", "admin"), "Invalid role selected."),
        ];
        for (request, expected) in cases {
            let err = accounts.signup(request).await.unwrap_err();
            assert!(
                matches!(&err, QueueError::Validation(m) if m.contains(expected)),
                "{err:?} should mention {expected}"
            );
        }
    }

    #[tokio::test]
    async fn login_issues_a_token_that_expires_after_an_hour() {
        let accounts = service();
        accounts
            .signup(signup("carol@uni.example", "s3cret!", "staff"))
            .await
            .unwrap();

        let now = Utc::now();
        let response = accounts
            .login(login("Carol@uni.example", "s3cret!"), now)
            .await
            .unwrap();
        assert_eq!(response.message, "Login successful.");
        assert_eq!(response.role, Role::Staff);
        assert_eq!(response.token.len(), TOKEN_HEX_LEN);
        assert_eq!(response.expires_at, now + TimeDelta::hours(1));

        let live = accounts
            .session(&response.token, now + TimeDelta::minutes(59))
            .await
            .unwrap();
        assert_eq!(live.map(|s| s.role), Some(Role::Staff));
        let expired = accounts
            .session(&response.token, now + TimeDelta::hours(1))
            .await
            .unwrap();
        assert!(expired.is_none());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let accounts = service();
        accounts
            .signup(signup("dan@uni.example", "s3cret!", "student"))
            .await
            .unwrap();
        let now = Utc::now();
        let wrong = accounts
            .login(login("dan@uni.example", "wrong1!"), now)
            .await
            .unwrap_err();
        let unknown = accounts
            .login(login("nobody@uni.example", "s3cret!"), now)
            .await
            .unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(wrong, QueueError::InvalidCredentials));
    }

    #[tokio::test]
    async fn empty_login_fields_are_a_validation_error() {
        let err = service()
            .login(login(" ", ""), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Validation(m) if m == LOGIN_FIELDS_REQUIRED));
    }

    #[tokio::test]
    async fn purge_drops_only_expired_tokens() {
        let accounts = service();
        accounts
            .signup(signup("erin@uni.example", "s3cret!", "student"))
            .await
            .unwrap();
        let earlier = Utc::now() - TimeDelta::hours(2);
        let stale = accounts
            .login(login("erin@uni.example", "s3cret!"), earlier)
            .await
            .unwrap();
        let fresh = accounts
            .login(login("erin@uni.example", "s3cret!"), Utc::now())
            .await
            .unwrap();

        assert_eq!(accounts.purge_expired(Utc::now()).await.unwrap(), 1);
        let now = Utc::now();
        assert!(accounts.session(&stale.token, now).await.unwrap().is_none());
        assert!(accounts.session(&fresh.token, now).await.unwrap().is_some());
    }

    #[test]
    fn tokens_are_unique_hex() {
        let a = new_token();
        let b = new_token();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

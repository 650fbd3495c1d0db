//! `PostgreSQL` operations on the `users` and `sessions` tables.
//!
//! Emails are unique at the database level; signup relies on
//! `ON CONFLICT DO NOTHING` rather than a read-then-write check, so two
//! concurrent signups for the same address cannot both succeed.

use chrono::{DateTime, Utc};
use queueless_types::{Role, Session, UserAccount, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `users` and `sessions` tables.
pub struct AccountStore<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountStore<'a> {
    /// Create a new account store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new account. Returns `false` when the email is taken.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_user(&self, user: &UserAccount) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"INSERT INTO users (id, email, password_hash, role, created_at)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (email) DO NOTHING",
        )
        .bind(user.id.into_inner())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Load one account by its (normalized) email.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Decode`] if the stored role is unknown.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"SELECT id, email, password_hash, role, created_at
              FROM users
              WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserAccount::try_from).transpose()
    }

    /// Record an issued token.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_session(&self, session: &Session) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO sessions (token, user_id, email, role, issued_at, expires_at)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&session.token)
        .bind(session.user_id.into_inner())
        .bind(&session.email)
        .bind(session.role.as_str())
        .bind(session.issued_at)
        .bind(session.expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Look up a token, expired or not.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Decode`] if the stored role is unknown.
    pub async fn find_session(&self, token: &str) -> Result<Option<Session>, DbError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r"SELECT token, user_id, email, role, issued_at, expires_at
              FROM sessions
              WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    /// Remove every token that expired at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query(r"DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// A row from the `users` table.
#[derive(Clone, sqlx::FromRow)]
pub struct UserRow {
    /// Account id.
    pub id: Uuid,
    /// Normalized email.
    pub email: String,
    /// PHC-format hash.
    pub password_hash: String,
    /// Lowercase role name.
    pub role: String,
    /// Signup timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `sessions` table.
#[derive(Clone, sqlx::FromRow)]
pub struct SessionRow {
    /// Bearer secret.
    pub token: String,
    /// Owning account.
    pub user_id: Uuid,
    /// Account email at issue time.
    pub email: String,
    /// Lowercase role name.
    pub role: String,
    /// Login timestamp.
    pub issued_at: DateTime<Utc>,
    /// Expiry.
    pub expires_at: DateTime<Utc>,
}

fn decode_role(raw: &str, owner: &str) -> Result<Role, DbError> {
    raw.parse::<Role>()
        .map_err(|e| DbError::Decode(format!("{owner}: unknown role {}", e.0)))
}

impl TryFrom<UserRow> for UserAccount {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = decode_role(&row.role, &format!("user {}", row.id))?;
        Ok(Self {
            id: UserId::from(row.id),
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<SessionRow> for Session {
    type Error = DbError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let role = decode_role(&row.role, &format!("session of user {}", row.user_id))?;
        Ok(Self {
            token: row.token,
            user_id: UserId::from(row.user_id),
            email: row.email,
            role,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_row_decodes_role() {
        let row = UserRow {
            id: Uuid::now_v7(),
            email: String::from("alice@uni.example"),
            password_hash: String::from("$argon2id$hash"),
            role: String::from("staff"),
            created_at: Utc::now(),
        };
        let user = UserAccount::try_from(row);
        assert_eq!(user.ok().map(|u| u.role), Some(Role::Staff));
    }

    #[test]
    fn unknown_session_role_is_a_decode_error() {
        let now = Utc::now();
        let row = SessionRow {
            token: String::from("t"),
            user_id: Uuid::now_v7(),
            email: String::from("alice@uni.example"),
            role: String::from("admin"),
            issued_at: now,
            expires_at: now,
        };
        assert!(matches!(Session::try_from(row), Err(DbError::Decode(_))));
    }
}

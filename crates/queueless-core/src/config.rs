//! Configuration loading and typed config structures.
//!
//! Sources are layered with the `config` crate, later sources winning:
//!
//! 1. Built-in defaults (the `Default` impls below)
//! 2. `queueless.yaml` in the working directory, or the file named by
//!    `QUEUELESS_CONFIG` (optional)
//! 3. Environment variables prefixed `QUEUELESS`, sections separated by
//!    `__` (e.g. `QUEUELESS__QUEUE__PER_PERSON_MINUTES=10`)
//! 4. `DATABASE_URL`, which overrides `database.url`

use std::path::Path;

pub use queueless_types::Role;
use serde::Deserialize;

/// Config file read when `QUEUELESS_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "queueless.yaml";

/// Longest accepted login token lifetime (30 days).
pub const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Accepted Argon2 memory cost range, in KiB.
pub const PASSWORD_MEMORY_KIB: core::ops::RangeInclusive<u32> = 8..=1024 * 1024;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    /// Values parsed but are not usable together.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Entry store backend selection.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Position and wait-time policy.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Accounts, login tokens, and the bearer-token gate.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Failed-authentication lockout.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from the default file location, the environment, and
    /// `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a source is malformed, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("QUEUELESS_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        Self::load_from(Path::new(&path))
    }

    /// Load using `path` as the (optional) config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a source is malformed, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("QUEUELESS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        config.database.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, without consulting the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the YAML is malformed, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that would make the service misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.per_person_minutes == 0 {
            return Err(ConfigError::Invalid(
                "queue.per_person_minutes must be at least 1".to_owned(),
            ));
        }
        if self.database.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "database.connect_timeout_secs must be at least 1".to_owned(),
            ));
        }
        if self.auth.token_ttl_secs == 0 || self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}"
            )));
        }
        if !PASSWORD_MEMORY_KIB.contains(&self.auth.password_memory_kib) {
            return Err(ConfigError::Invalid(format!(
                "auth.password_memory_kib must be between {} and {}",
                PASSWORD_MEMORY_KIB.start(),
                PASSWORD_MEMORY_KIB.end()
            )));
        }
        if self.auth.tokens.iter().any(|t| t.token.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "auth.tokens contains an empty token".to_owned(),
            ));
        }
        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_attempts must be at least 1".to_owned(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.window_secs must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Identify clients by the first `X-Forwarded-For` hop instead of the
    /// socket peer. Only safe behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 5001,
            trust_forwarded_for: false,
        }
    }
}

/// Entry store backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `PostgreSQL` URL. When absent the in-memory store is used.
    pub url: Option<String>,
    /// Pool size.
    pub max_connections: u32,
    /// Seconds a request waits for a pooled connection.
    pub connect_timeout_secs: u64,
    /// Seconds before an unused pooled connection is closed.
    pub idle_timeout_secs: u64,
    /// Apply embedded migrations at startup.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            connect_timeout_secs: 5,
            idle_timeout_secs: 300,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    /// `DATABASE_URL` wins over any file or prefixed-env value.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.trim().is_empty()
        {
            self.url = Some(url);
        }
    }
}

/// How waiting entries are grouped for position numbering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// One line per service type.
    #[default]
    PerService,
    /// A single line across every service type.
    Global,
}

/// Position and wait-time policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Minutes each person ahead adds to the estimate.
    pub per_person_minutes: u32,
    /// Grouping key for positions.
    pub grouping: Grouping,
    /// Serialize joins so concurrent joiners never see the same position.
    pub serialize_joins: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            per_person_minutes: 15,
            grouping: Grouping::PerService,
            serialize_joins: false,
        }
    }
}

/// One configured bearer token.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    /// The secret presented as `Authorization: Bearer <token>`.
    pub token: String,
    /// Who the token belongs to, for logs.
    pub subject: String,
    /// What the holder may do.
    pub role: Role,
}

impl core::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("token", &"<redacted>")
            .field("subject", &self.subject)
            .field("role", &self.role)
            .finish()
    }
}

/// Account and bearer-token settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false every request is treated as staff.
    pub enabled: bool,
    /// Static tokens accepted alongside login-issued ones, for service
    /// accounts and bootstrapping the first staff user.
    pub tokens: Vec<TokenGrant>,
    /// Lifetime of a token issued at login.
    pub token_ttl_secs: u64,
    /// Pause before answering a failed login, to slow guessing.
    pub login_failure_delay_ms: u64,
    /// Argon2 memory cost per password hash, in KiB.
    pub password_memory_kib: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tokens: Vec::new(),
            token_ttl_secs: 60 * 60,
            login_failure_delay_ms: 1000,
            password_memory_kib: 19 * 1024,
        }
    }
}

/// Failed-authentication lockout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Failures allowed before a client is locked out.
    pub max_attempts: u32,
    /// Idle time after which a client's record is forgotten.
    pub window_secs: u64,
    /// How long a lockout lasts.
    pub lockout_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 15 * 60,
            lockout_secs: 15 * 60,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: String::from("info"),
            json: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_desk_policy() {
        let config = AppConfig::default();
        assert_eq!(config.queue.per_person_minutes, 15);
        assert_eq!(config.queue.grouping, Grouping::PerService);
        assert!(!config.queue.serialize_joins);
        assert!(!config.auth.enabled);
        assert_eq!(config.rate_limit.max_attempts, 5);
        assert_eq!(config.rate_limit.lockout_secs, 900);
        assert_eq!(config.server.port, 5001);
        assert!(!config.server.trust_forwarded_for);
        assert!(config.database.url.is_none());
        assert_eq!(config.database.idle_timeout_secs, 300);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = r"
queue:
  per_person_minutes: 10
  grouping: global
logging:
  json: true
";
        let config = AppConfig::parse_yaml(yaml).unwrap();
        assert_eq!(config.queue.per_person_minutes, 10);
        assert_eq!(config.queue.grouping, Grouping::Global);
        assert!(config.logging.json);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.server.port, 5001);
    }

    #[test]
    fn auth_tokens_parse_with_roles() {
        let yaml = r"
auth:
  enabled: true
  tokens:
    - token: staff-secret
      subject: desk-1
      role: staff
    - token: student-secret
      subject: s1234567
      role: student
";
        let config = AppConfig::parse_yaml(yaml).unwrap();
        assert!(config.auth.enabled);
        let roles: Vec<Role> = config.auth.tokens.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::Staff, Role::Student]);
    }

    #[test]
    fn zero_cost_is_rejected() {
        let result = AppConfig::parse_yaml("queue:\n  per_person_minutes: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn enabled_auth_without_static_tokens_is_allowed() {
        let config = AppConfig::parse_yaml("auth:\n  enabled: true\n").unwrap();
        assert!(config.auth.enabled);
        assert!(config.auth.tokens.is_empty());
    }

    #[test]
    fn token_ttl_must_be_bounded() {
        let zero = AppConfig::parse_yaml("auth:\n  token_ttl_secs: 0\n");
        assert!(matches!(zero, Err(ConfigError::Invalid(_))));
        let huge = AppConfig::parse_yaml("auth:\n  token_ttl_secs: 99999999999\n");
        assert!(matches!(huge, Err(ConfigError::Invalid(_))));
        let cheap = AppConfig::parse_yaml("auth:\n  password_memory_kib: 4\n");
        assert!(matches!(cheap, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn pool_timeouts_and_proxy_trust_parse() {
        let yaml = r"
server:
  trust_forwarded_for: true
database:
  idle_timeout_secs: 60
  connect_timeout_secs: 2
";
        let config = AppConfig::parse_yaml(yaml).unwrap();
        assert!(config.server.trust_forwarded_for);
        assert!(AppConfig::parse_yaml("database:\n  connect_timeout_secs: 0\n").is_err());
        assert_eq!(config.database.idle_timeout_secs, 60);
        assert_eq!(config.database.connect_timeout_secs, 2);
    }

    #[test]
    fn token_debug_is_redacted() {
        let grant = TokenGrant {
            token: String::from("super-secret"),
            subject: String::from("desk-1"),
            role: Role::Staff,
        };
        let rendered = format!("{grant:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("desk-1"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from(Path::new("does-not-exist.yaml"));
        assert!(config.is_ok());
    }
}

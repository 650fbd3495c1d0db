//! Queueless server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (defaults, `queueless.yaml`, environment)
//! 2. Initialize structured logging (tracing)
//! 3. Open the entry store: `PostgreSQL` when a URL is configured,
//!    otherwise the in-memory store
//! 4. Serve HTTP until a shutdown signal

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use queueless_core::config::{AppConfig, DatabaseConfig, LoggingConfig};
use queueless_db::{EntryStore, PostgresConfig, PostgresPool};
use queueless_server::{AppState, ServerConfig, start_server};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    init_tracing(&config.logging);

    info!(
        host = %config.server.host,
        port = config.server.port,
        per_person_minutes = config.queue.per_person_minutes,
        grouping = ?config.queue.grouping,
        serialize_joins = config.queue.serialize_joins,
        auth_enabled = config.auth.enabled,
        static_tokens = config.auth.tokens.len(),
        trust_forwarded_for = config.server.trust_forwarded_for,
        "Configuration loaded"
    );
    if !config.auth.enabled {
        warn!("Authentication disabled; every request is treated as staff");
    }
    if config.server.trust_forwarded_for {
        warn!("Trusting X-Forwarded-For; only safe behind a proxy that overwrites it");
    }

    let store = open_store(&config.database).await?;
    info!(backend = store.backend_name(), "Entry store ready");

    let state = Arc::new(AppState::new(store.clone(), &config).context("building services")?);
    let result = start_server(&ServerConfig::from(&config.server), state).await;

    if let EntryStore::Postgres(pool) = &store {
        pool.close().await;
    }
    result.context("running HTTP server")
}

/// `RUST_LOG` wins over `logging.filter`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_store(config: &DatabaseConfig) -> anyhow::Result<EntryStore> {
    let Some(url) = config.url.as_deref() else {
        warn!("No database URL configured; using the in-memory store (data is lost on restart)");
        return Ok(EntryStore::in_memory());
    };

    let pg_config = PostgresConfig::new(url)
        .with_max_connections(config.max_connections)
        .with_connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .with_idle_timeout(Duration::from_secs(config.idle_timeout_secs));
    let pool = PostgresPool::connect(&pg_config)
        .await
        .context("connecting to PostgreSQL")?;

    if config.run_migrations {
        pool.run_migrations()
            .await
            .context("running database migrations")?;
    }
    Ok(EntryStore::Postgres(pool))
}

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::config::DbConfig;

pub const CREATE_EXCHANGE_RATES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS exchange_rates (
        id SERIAL PRIMARY KEY,
        from_currency VARCHAR(3) NOT NULL,
        to_currency VARCHAR(3) NOT NULL,
        rate DECIMAL(20, 8) NOT NULL,
        timestamp TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP,
        source VARCHAR(50),
        UNIQUE(from_currency, to_currency, timestamp)
    )
"#;

pub const CREATE_CURRENCIES_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_exchange_rates_currencies
    ON exchange_rates (from_currency, to_currency)
"#;

pub const CREATE_TIMESTAMP_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_exchange_rates_timestamp
    ON exchange_rates (timestamp DESC)
"#;

// Executed in order on a single connection.
const SCHEMA: [(&str, &str); 3] = [
    ("table exchange_rates", CREATE_EXCHANGE_RATES_TABLE),
    ("index idx_exchange_rates_currencies", CREATE_CURRENCIES_INDEX),
    ("index idx_exchange_rates_timestamp", CREATE_TIMESTAMP_INDEX),
];

/// Owns the process-wide PostgreSQL pool.
pub struct ConnectionManager {
    pool: PgPool,
}

impl ConnectionManager {
    pub fn new(config: &DbConfig) -> Self {
        log::debug!("Database configuration: {:?}", config);

        let pool = config
            .pool_options()
            .connect_lazy_with(config.connect_options());

        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Proves the database is reachable, then makes sure the schema exists.
    pub async fn initialize(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Can't acquire a PostgreSQL connection")?;
        log::info!("PostgreSQL connected successfully");

        let now: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()")
            .fetch_one(&mut *conn)
            .await
            .context("Connection test query failed")?;
        log::info!("Database connection test successful: now = {}", now);

        drop(conn);

        self.ensure_schema().await
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        match self.create_tables().await {
            Ok(()) => {
                log::info!("Database tables created successfully");
                Ok(())
            }
            Err(err) => {
                log::error!("Error creating tables: {:#}", err);
                Err(err)
            }
        }
    }

    async fn create_tables(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Can't acquire a PostgreSQL connection")?;

        for (name, statement) in SCHEMA {
            log::debug!("Ensuring {}", name);
            sqlx::query(statement)
                .execute(&mut *conn)
                .await
                .with_context(|| format!("Can't create {}", name))?;
        }

        Ok(())
    }

    /// Closes the pool, waiting for checked-out connections to come back.
    // sqlx's close is infallible; the pool reports closed once it returns.
    pub async fn shutdown(&self) {
        self.pool.close().await;
        log::info!("PostgreSQL connection pool closed");
    }
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

pub const MAX_SOURCE_LEN: usize = 50;

const UNIQUE_VIOLATION: &str = "23505";

/// A row of `exchange_rates`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: i32,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub timestamp: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    /// `None` lets the database stamp the row with the insertion time.
    pub timestamp: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

impl NewExchangeRate {
    pub fn new(
        from_currency: &str,
        to_currency: &str,
        rate: Decimal,
        timestamp: Option<DateTime<Utc>>,
        source: Option<&str>,
    ) -> Result<Self> {
        if rate <= Decimal::ZERO {
            anyhow::bail!("Rate must be positive, got {}", rate);
        }
        if let Some(source) = source
            && source.chars().count() > MAX_SOURCE_LEN
        {
            anyhow::bail!("Source must be at most {} characters", MAX_SOURCE_LEN);
        }

        Ok(Self {
            from_currency: normalize_currency_code(from_currency)?,
            to_currency: normalize_currency_code(to_currency)?,
            rate,
            timestamp,
            source: source.map(str::to_string),
        })
    }
}

fn normalize_currency_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        anyhow::bail!("Invalid currency code: {:?}", code);
    }

    Ok(code.to_ascii_uppercase())
}

pub async fn insert(
    pool: &PgPool,
    new_rate: &NewExchangeRate,
) -> Result<ExchangeRate, sqlx::Error> {
    sqlx::query_as::<_, ExchangeRate>(
        r#"
        INSERT INTO exchange_rates (from_currency, to_currency, rate, timestamp, source)
        VALUES ($1, $2, $3, COALESCE($4, CURRENT_TIMESTAMP), $5)
        RETURNING id, from_currency, to_currency, rate, timestamp, source
        "#,
    )
    .bind(&new_rate.from_currency)
    .bind(&new_rate.to_currency)
    .bind(new_rate.rate)
    .bind(new_rate.timestamp)
    .bind(&new_rate.source)
    .fetch_one(pool)
    .await
}

/// Most recent rate recorded for a currency pair.
pub async fn latest(
    pool: &PgPool,
    from_currency: &str,
    to_currency: &str,
) -> Result<Option<ExchangeRate>, sqlx::Error> {
    sqlx::query_as::<_, ExchangeRate>(
        r#"
        SELECT id, from_currency, to_currency, rate, timestamp, source
        FROM exchange_rates
        WHERE from_currency = $1 AND to_currency = $2
        ORDER BY timestamp DESC
        LIMIT 1
        "#,
    )
    .bind(from_currency)
    .bind(to_currency)
    .fetch_optional(pool)
    .await
}

/// True when the error is the `(from_currency, to_currency, timestamp)`
/// uniqueness constraint rejecting a duplicate.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

//! `PurchaseStore`: the relational persistence boundary.
//!
//! Grounded on the teacher's `account/db.rs` (pool construction via
//! `PgPoolOptions::max_connections`/`acquire_timeout`, a `health_check`
//! method) and `persistence/repository.rs` (an `#[async_trait]` repository
//! trait in front of a concrete backend). `sqlx::query` is used instead of
//! the `query_as!`/`query!` macros the teacher's `account/repository.rs`
//! relies on, since those require a live `DATABASE_URL` or a checked-in
//! `.sqlx` offline cache at compile time, neither of which exists here.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::core_types::{TicketId, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new row was inserted.
    Inserted,
    /// The unique key on `(user_id, ticket_name)` already had a row; absorbed
    /// as idempotent success per spec.md §4.6.
    Duplicate,
}

/// The persistence boundary `DurabilityWorker` writes through. A trait so
/// tests can swap in an in-memory double without a live Postgres instance.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn save_purchase(&self, user: &UserId, ticket: &TicketId) -> Result<SaveOutcome, StoreError>;
    async fn delete_purchase(&self, user: &UserId, ticket: &TicketId) -> Result<(), StoreError>;
    async fn health_check(&self) -> Result<(), StoreError>;
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects with the teacher's `account/db.rs` pool defaults, scaled by
    /// `max_connections` from `AppConfig`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `purchases` table if it doesn't already exist. Not a
    /// migration framework, just enough for this crate to be runnable
    /// against a bare Postgres instance.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS purchases (
                id BIGSERIAL PRIMARY KEY,
                user_id TEXT NOT NULL,
                ticket_name TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (user_id, ticket_name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PurchaseStore for PostgresStore {
    async fn save_purchase(&self, user: &UserId, ticket: &TicketId) -> Result<SaveOutcome, StoreError> {
        let result = sqlx::query("INSERT INTO purchases (user_id, ticket_name) VALUES ($1, $2)")
            .bind(&user.0)
            .bind(&ticket.0)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(SaveOutcome::Inserted),
            Err(err) => {
                let is_duplicate = err
                    .as_database_error()
                    .map(|db_err| db_err.is_unique_violation())
                    .unwrap_or(false);
                if is_duplicate {
                    Ok(SaveOutcome::Duplicate)
                } else {
                    Err(StoreError::Database(err))
                }
            }
        }
    }

    async fn delete_purchase(&self, user: &UserId, ticket: &TicketId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM purchases WHERE user_id = $1 AND ticket_name = $2")
            .bind(&user.0)
            .bind(&ticket.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

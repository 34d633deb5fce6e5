//! PostgreSQL-backed webhook dedup ledger.
//!
//! Deduplication relies on the primary key: the insert uses
//! `ON CONFLICT DO NOTHING`, so the existence check and the write are one
//! statement and two concurrent deliveries of the same id cannot both win.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{WebhookLedger, WebhookLedgerError};
use crate::domain::webhook::{WebhookId, WebhookLedgerEntry};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::NewWebhookEventRow;
use super::pool::{DbPool, PoolError};
use super::schema::webhook_events;

/// Diesel-backed implementation of the webhook ledger port.
#[derive(Clone)]
pub struct DieselWebhookLedger {
    pool: DbPool,
}

impl DieselWebhookLedger {
    /// Create a new ledger with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> WebhookLedgerError {
    map_basic_pool_error(error, |message| WebhookLedgerError::connection(message))
}

fn map_diesel_error(error: diesel::result::Error) -> WebhookLedgerError {
    map_basic_diesel_error(
        error,
        WebhookLedgerError::query,
        WebhookLedgerError::connection,
    )
}

#[async_trait]
impl WebhookLedger for DieselWebhookLedger {
    async fn record_if_new(&self, entry: &WebhookLedgerEntry) -> Result<bool, WebhookLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let inserted = diesel::insert_into(webhook_events::table)
            .values(NewWebhookEventRow::from(entry))
            .on_conflict(webhook_events::webhook_id)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(inserted == 1)
    }

    async fn release(&self, webhook_id: &WebhookId) -> Result<(), WebhookLedgerError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(webhook_events::table.filter(webhook_events::webhook_id.eq(webhook_id.as_ref())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_errors_become_connection_errors() {
        let err = map_pool_error(PoolError::checkout("timed out"));

        assert_eq!(err, WebhookLedgerError::connection("timed out"));
    }

    #[rstest]
    fn missing_rows_become_query_errors() {
        let err = map_diesel_error(diesel::result::Error::NotFound);

        assert!(matches!(err, WebhookLedgerError::Query { .. }));
    }
}

//! Append-only ledger of provider webhook deliveries.

use async_trait::async_trait;

use crate::domain::webhook::{WebhookId, WebhookLedgerEntry};

use super::define_port_error;

define_port_error! {
    /// Errors raised by webhook ledger adapters.
    pub enum WebhookLedgerError {
        /// Ledger connection could not be established.
        Connection { message: String } => "webhook ledger connection failed: {message}",
        /// Insert failed for a reason other than a duplicate id.
        Query { message: String } => "webhook ledger query failed: {message}",
    }
}

/// Deduplication ledger keyed by webhook id.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookLedger: Send + Sync {
    /// Insert `entry` unless its webhook id is already present.
    ///
    /// Returns `true` when this call inserted the row. The check and insert
    /// are a single atomic operation; entries are never updated afterwards.
    async fn record_if_new(&self, entry: &WebhookLedgerEntry) -> Result<bool, WebhookLedgerError>;

    /// Forget a delivery whose reconciliation failed, so the provider's
    /// redelivery is processed again. Unknown ids are ignored.
    async fn release(&self, webhook_id: &WebhookId) -> Result<(), WebhookLedgerError>;
}

//! In-memory webhook deduplication ledger.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::{WebhookLedger, WebhookLedgerError};
use crate::domain::webhook::{WebhookId, WebhookLedgerEntry};

/// Ledger keyed by webhook id; first writer wins.
#[derive(Debug, Default)]
pub struct InMemoryWebhookLedger {
    entries: Mutex<HashMap<String, WebhookLedgerEntry>>,
}

impl InMemoryWebhookLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored entry for `webhook_id`.
    pub fn entry(&self, webhook_id: &str) -> Option<WebhookLedgerEntry> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(webhook_id).cloned())
    }

    /// Number of recorded deliveries.
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WebhookLedger for InMemoryWebhookLedger {
    async fn record_if_new(&self, entry: &WebhookLedgerEntry) -> Result<bool, WebhookLedgerError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| WebhookLedgerError::query("webhook ledger lock poisoned"))?;
        let key = entry.webhook_id.as_ref().to_owned();
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, entry.clone());
        Ok(true)
    }

    async fn release(&self, webhook_id: &WebhookId) -> Result<(), WebhookLedgerError> {
        self.entries
            .lock()
            .map_err(|_| WebhookLedgerError::query("webhook ledger lock poisoned"))?
            .remove(webhook_id.as_ref());
        Ok(())
    }
}

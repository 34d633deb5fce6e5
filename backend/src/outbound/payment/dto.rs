//! Wire shapes returned by the provider's payment lookup API.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::payment::{ProviderPaymentId, ProviderPaymentSnapshot, ProviderPaymentStatus};

#[derive(Debug, Deserialize)]
pub(super) struct PaymentDto {
    pub(super) id: String,
    pub(super) status: String,
}

impl PaymentDto {
    /// Convert the decoded document into a snapshot, keeping the raw body.
    pub(super) fn into_snapshot(self, raw: Value) -> Result<ProviderPaymentSnapshot, String> {
        let payment_id = ProviderPaymentId::new(self.id.as_str())
            .map_err(|error| format!("invalid payment id {:?}: {error}", self.id))?;
        Ok(ProviderPaymentSnapshot {
            payment_id,
            status: ProviderPaymentStatus::parse(&self.status),
            raw,
        })
    }
}

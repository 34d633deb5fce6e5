//! Driving port for applying provider payment state to reservations.

use async_trait::async_trait;

use crate::domain::payment::ProviderPaymentId;
use crate::domain::webhook::{ReconciliationOutcome, WebhookDelivery};
use crate::domain::Error;

use super::ReservationView;

/// Result of a client-initiated reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCompletion {
    pub outcome: ReconciliationOutcome,
    /// Reservation after reconciliation; absent for orphaned payments.
    pub reservation: Option<ReservationView>,
}

/// Driving port for provider-originated payment updates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentReconciliation: Send + Sync {
    /// Verify, deduplicate, and apply one webhook delivery.
    ///
    /// Bad signatures yield `unauthorized` and leave no trace in the ledger.
    /// Everything else that is expected, including replays and orphans, is an
    /// outcome rather than an error.
    async fn apply_provider_event(
        &self,
        delivery: WebhookDelivery,
    ) -> Result<ReconciliationOutcome, Error>;

    /// Ask the provider for a payment's state and apply it.
    async fn complete_payment(
        &self,
        payment_id: &ProviderPaymentId,
    ) -> Result<PaymentCompletion, Error>;
}

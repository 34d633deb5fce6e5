//! Port for querying the payment provider's view of a payment.

use async_trait::async_trait;

use crate::domain::payment::{ProviderPaymentId, ProviderPaymentSnapshot};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment provider API adapters.
    pub enum PaymentStatusSourceError {
        /// The provider does not know the payment.
        NotFound { payment_id: String } => "provider has no payment {payment_id}",
        /// Network failure or timeout.
        Transport { message: String } => "provider request failed: {message}",
        /// Unexpected HTTP status from the provider.
        Status { status: u16, message: String } => "provider returned status {status}: {message}",
        /// Response body could not be decoded.
        Decode { message: String } => "provider response could not be decoded: {message}",
    }
}

/// Reads authoritative payment state from the provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentStatusSource: Send + Sync {
    async fn fetch_payment(
        &self,
        payment_id: &ProviderPaymentId,
    ) -> Result<ProviderPaymentSnapshot, PaymentStatusSourceError>;
}

//! Port for authenticating provider webhook deliveries.

use crate::domain::webhook::WebhookDelivery;

use super::define_port_error;

define_port_error! {
    /// Reasons a delivery fails authentication.
    pub enum WebhookVerificationError {
        /// The timestamp header is not a Unix timestamp.
        MalformedTimestamp { value: String } => "webhook timestamp is malformed: {value}",
        /// The timestamp lies outside the accepted tolerance.
        StaleTimestamp { skew_secs: i64 } => "webhook timestamp is {skew_secs}s away from now",
        /// No `v1` signature in the header matched.
        SignatureMismatch => "webhook signature does not match",
        /// The verifier is not configured with a usable secret.
        Misconfigured { message: String } => "webhook verifier misconfigured: {message}",
    }
}

/// Verifies a delivery against the raw body exactly as received.
#[cfg_attr(test, mockall::automock)]
pub trait WebhookSignatureVerifier: Send + Sync {
    fn verify(&self, delivery: &WebhookDelivery) -> Result<(), WebhookVerificationError>;
}

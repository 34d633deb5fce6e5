//! Client-facing payment intent descriptors.

use crate::domain::reservation::PRIMARY_CURRENCY;

use super::{PaymentProvider, ProviderPaymentId};

/// What the client needs to start paying for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentIntent {
    /// Mock mode: the client confirms through the mock-confirm operation.
    Mock {
        payment_id: ProviderPaymentId,
        total_amount: i64,
        currency: &'static str,
    },
    /// External provider: the client opens the provider's checkout with these
    /// parameters and the provider later reports back by webhook.
    External {
        store_id: String,
        channel_key: String,
        payment_id: ProviderPaymentId,
        order_name: String,
        total_amount: i64,
        currency: &'static str,
        redirect_url: Option<String>,
    },
}

impl PaymentIntent {
    pub fn provider(&self) -> PaymentProvider {
        match self {
            Self::Mock { .. } => PaymentProvider::Mock,
            Self::External { .. } => PaymentProvider::External,
        }
    }

    pub fn payment_id(&self) -> &ProviderPaymentId {
        match self {
            Self::Mock { payment_id, .. } | Self::External { payment_id, .. } => payment_id,
        }
    }

    pub(super) fn currency() -> &'static str {
        PRIMARY_CURRENCY
    }
}

/// Order label shown on the provider's checkout page.
///
/// # Examples
/// ```
/// use lodging_backend::domain::order_name;
///
/// assert_eq!(order_name("Hanok Stay", 1), "Hanok Stay (1 night)");
/// assert_eq!(order_name("Hanok Stay", 3), "Hanok Stay (3 nights)");
/// ```
pub fn order_name(unit_title: &str, nights: u32) -> String {
    let unit = if nights == 1 { "night" } else { "nights" };
    format!("{} ({nights} {unit})", unit_title.trim())
}

//! Closed set of payment gateway variants.
//!
//! The active variant is chosen once at startup. Every call site goes through
//! [`PaymentGateway`] so mode-specific behaviour lives here and nowhere else.

use std::fmt;
use std::sync::Arc;

use tracing::warn;
use url::Url;

use crate::domain::Error;
use crate::domain::ports::{PaymentStatusSource, PaymentStatusSourceError};
use crate::domain::reservation::{Reservation, ReservationStatus};

use super::{PaymentAttempt, PaymentIntent, PaymentProvider, ProviderPaymentId, ProviderPaymentSnapshot};

/// Merchant parameters for the external provider's checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProviderConfig {
    pub store_id: String,
    pub channel_key: String,
    /// Base URL the provider redirects to after checkout.
    pub redirect_base: Option<Url>,
}

/// External provider variant: asynchronous confirmation by webhook.
#[derive(Clone)]
pub struct ExternalProviderGateway {
    config: ExternalProviderConfig,
    status_source: Arc<dyn PaymentStatusSource>,
}

impl fmt::Debug for ExternalProviderGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalProviderGateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Payment gateway in use by the running service.
#[derive(Debug, Clone)]
pub enum PaymentGateway {
    /// Synchronous mock path used in development and tests.
    Mock,
    External(ExternalProviderGateway),
}

impl PaymentGateway {
    /// Build the external variant.
    pub fn external(
        config: ExternalProviderConfig,
        status_source: Arc<dyn PaymentStatusSource>,
    ) -> Self {
        Self::External(ExternalProviderGateway {
            config,
            status_source,
        })
    }

    pub fn provider(&self) -> PaymentProvider {
        match self {
            Self::Mock => PaymentProvider::Mock,
            Self::External(_) => PaymentProvider::External,
        }
    }

    /// Describe how the client should pay for `attempt`.
    ///
    /// Fails with `conflict` when the reservation is no longer awaiting
    /// payment.
    pub fn build_intent(
        &self,
        reservation: &Reservation,
        attempt: &PaymentAttempt,
        order_name: String,
    ) -> Result<PaymentIntent, Error> {
        if reservation.status != ReservationStatus::PendingPayment {
            return Err(Error::conflict(format!(
                "reservation is {} and no longer accepts payment",
                reservation.status
            )));
        }
        let payment_id = attempt.provider_payment_id.clone();
        let total_amount = reservation.totals.total_krw;
        match self {
            Self::Mock => Ok(PaymentIntent::Mock {
                payment_id,
                total_amount,
                currency: PaymentIntent::currency(),
            }),
            Self::External(gateway) => {
                let redirect_url = gateway
                    .config
                    .redirect_base
                    .as_ref()
                    .map(|base| redirect_url(base, reservation, &payment_id))
                    .transpose()?;
                Ok(PaymentIntent::External {
                    store_id: gateway.config.store_id.clone(),
                    channel_key: gateway.config.channel_key.clone(),
                    payment_id,
                    order_name,
                    total_amount,
                    currency: PaymentIntent::currency(),
                    redirect_url,
                })
            }
        }
    }

    /// Query the provider for the authoritative state of a payment.
    ///
    /// The mock variant has no provider to ask and refuses with `forbidden`.
    pub async fn reconcile(
        &self,
        payment_id: &ProviderPaymentId,
    ) -> Result<ProviderPaymentSnapshot, Error> {
        match self {
            Self::Mock => Err(Error::forbidden(
                "provider reconciliation is unavailable in mock payment mode",
            )),
            Self::External(gateway) => gateway
                .status_source
                .fetch_payment(payment_id)
                .await
                .map_err(map_status_source_error),
        }
    }

    /// Guard for the synchronous mock confirmation path.
    pub fn ensure_mock_confirmation(&self) -> Result<(), Error> {
        match self {
            Self::Mock => Ok(()),
            Self::External(_) => Err(Error::forbidden(
                "mock confirmation is disabled while an external payment provider is active",
            )),
        }
    }
}

fn redirect_url(
    base: &Url,
    reservation: &Reservation,
    payment_id: &ProviderPaymentId,
) -> Result<String, Error> {
    let mut url = base
        .join(&format!("reservations/{}", reservation.public_token))
        .map_err(|err| Error::internal(format!("invalid payment redirect base: {err}")))?;
    url.query_pairs_mut()
        .append_pair("paymentId", payment_id.as_ref());
    Ok(url.into())
}

fn map_status_source_error(error: PaymentStatusSourceError) -> Error {
    match error {
        PaymentStatusSourceError::NotFound { payment_id } => {
            Error::not_found(format!("payment provider has no payment {payment_id}"))
        }
        PaymentStatusSourceError::Transport { message } => {
            warn!(%message, "payment provider unreachable");
            Error::service_unavailable("payment provider is unavailable")
        }
        PaymentStatusSourceError::Status { status, message } if status >= 500 => {
            warn!(status, %message, "payment provider returned a server error");
            Error::service_unavailable("payment provider is unavailable")
        }
        other => Error::internal(format!("payment provider lookup failed: {other}")),
    }
}

//! Notifier that posts confirmations to an HTTP relay.
//!
//! The relay owns templating and e-mail delivery. This adapter only ships a
//! small JSON document describing the confirmed stay.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::ports::{ConfirmationNotifier, ConfirmationNotifierError};
use crate::domain::reservation::{PriceTotals, Reservation};
use crate::domain::{TRACE_ID_HEADER, TraceId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationMessage {
    reservation_id: String,
    public_token: String,
    unit_id: String,
    guest_email: Option<String>,
    user_id: Option<String>,
    check_in: NaiveDate,
    check_out: NaiveDate,
    totals: PriceTotals,
    cancellation_deadline: DateTime<FixedOffset>,
}

impl From<&Reservation> for ConfirmationMessage {
    fn from(reservation: &Reservation) -> Self {
        Self {
            reservation_id: reservation.id.to_string(),
            public_token: reservation.public_token.to_string(),
            unit_id: reservation.unit_id.to_string(),
            guest_email: reservation.requester.email().map(ToString::to_string),
            user_id: reservation.requester.user_id().map(ToString::to_string),
            check_in: reservation.stay.check_in(),
            check_out: reservation.stay.check_out(),
            totals: reservation.totals,
            cancellation_deadline: reservation.cancellation_deadline,
        }
    }
}

/// Relay notifier posting to a single configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpRelayNotifier {
    client: Client,
    endpoint: Url,
}

impl HttpRelayNotifier {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl ConfirmationNotifier for HttpRelayNotifier {
    async fn send_confirmation(
        &self,
        reservation: &Reservation,
    ) -> Result<(), ConfirmationNotifierError> {
        let message = ConfirmationMessage::from(reservation);
        let mut builder = self.client.post(self.endpoint.clone()).json(&message);
        if let Some(trace_id) = TraceId::current() {
            builder = builder.header(TRACE_ID_HEADER, trace_id.to_string());
        }
        let request = builder
            .build()
            .map_err(|error| ConfirmationNotifierError::dispatch(error.to_string()))?;
        let client = self.client.clone();
        let reservation_id = reservation.id;

        tokio::spawn(TraceId::propagate(async move {
            match client.execute(request).await {
                Ok(response) if response.status().is_success() => {
                    debug!(%reservation_id, "confirmation relayed");
                }
                Ok(response) => {
                    warn!(%reservation_id, status = response.status().as_u16(), "confirmation relay refused message");
                }
                Err(error) => {
                    warn!(%reservation_id, error = %error, "confirmation relay unreachable");
                }
            }
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pending_record;
    use rstest::rstest;

    #[rstest]
    fn message_describes_the_confirmed_stay() {
        let record = pending_record();

        let message = serde_json::to_value(ConfirmationMessage::from(&record.reservation))
            .expect("serialise");

        assert_eq!(message["publicToken"], record.reservation.public_token.to_string());
        assert_eq!(message["checkIn"], record.reservation.stay.check_in().to_string());
        assert!(message.get("reservationId").is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_relay_never_fails_the_caller() {
        let record = pending_record();
        let notifier = HttpRelayNotifier::new(
            Url::parse("http://127.0.0.1:9/notify").expect("url"),
            Duration::from_millis(200),
        )
        .expect("client");

        let result = notifier.send_confirmation(&record.reservation).await;

        assert!(result.is_ok());
    }
}

//! Request and response payloads shared by the reservation and payment handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::payment::{PaymentAttemptStatus, PaymentIntent, PaymentProvider};
use crate::domain::ports::{PaymentAttemptView, ReservationView};
use crate::domain::reservation::{PartyComposition, PriceTotals, ReservationStatus};

/// Request payload for creating a reservation.
///
/// Fields are optional at the wire level so missing values are reported with
/// field-level details instead of a generic deserialisation failure.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationBody {
    #[schema(example = "U1")]
    pub unit_id: Option<String>,
    #[schema(example = "2025-06-10")]
    pub check_in: Option<String>,
    #[schema(example = "2025-06-12")]
    pub check_out: Option<String>,
    pub adults: Option<i64>,
    pub children: Option<i64>,
    pub infants: Option<i64>,
    pub pets: Option<i64>,
    /// Required when the caller has no session.
    pub guest_email: Option<String>,
}

/// Optional payload for guest cancellation.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelReservationBody {
    pub guest_email: Option<String>,
}

/// One payment attempt as shown to clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAttemptResponse {
    pub payment_id: String,
    pub provider: PaymentProvider,
    pub status: PaymentAttemptStatus,
    pub created_at: String,
}

impl From<PaymentAttemptView> for PaymentAttemptResponse {
    fn from(value: PaymentAttemptView) -> Self {
        Self {
            payment_id: value.payment_id.to_string(),
            provider: value.provider,
            status: value.status,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// Public view of a reservation, keyed by its token.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub token: String,
    pub unit_id: String,
    pub status: ReservationStatus,
    #[schema(example = "2025-06-10")]
    pub check_in: String,
    #[schema(example = "2025-06-12")]
    pub check_out: String,
    pub nights: u32,
    pub party: PartyComposition,
    pub totals: PriceTotals,
    /// Civil-time instant after which guests can no longer cancel.
    #[schema(example = "2025-06-03T00:00:00+09:00")]
    pub cancellation_deadline: String,
    pub created_at: String,
    pub payment_attempts: Vec<PaymentAttemptResponse>,
}

impl From<ReservationView> for ReservationResponse {
    fn from(value: ReservationView) -> Self {
        Self {
            token: value.public_token.to_string(),
            unit_id: value.unit_id.to_string(),
            status: value.status,
            check_in: value.stay.check_in().to_string(),
            check_out: value.stay.check_out().to_string(),
            nights: value.stay.nights(),
            party: value.party,
            totals: value.totals,
            cancellation_deadline: value.cancellation_deadline.to_rfc3339(),
            created_at: value.created_at.to_rfc3339(),
            payment_attempts: value
                .attempts
                .into_iter()
                .map(PaymentAttemptResponse::from)
                .collect(),
        }
    }
}

/// Parameters the client needs to start a payment.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub provider: PaymentProvider,
    pub payment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_name: Option<String>,
    pub total_amount: i64,
    #[schema(example = "KRW")]
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl From<PaymentIntent> for PaymentIntentResponse {
    fn from(value: PaymentIntent) -> Self {
        match value {
            PaymentIntent::Mock {
                payment_id,
                total_amount,
                currency,
            } => Self {
                provider: PaymentProvider::Mock,
                payment_id: payment_id.to_string(),
                store_id: None,
                channel_key: None,
                order_name: None,
                total_amount,
                currency: currency.to_owned(),
                redirect_url: None,
            },
            PaymentIntent::External {
                store_id,
                channel_key,
                payment_id,
                order_name,
                total_amount,
                currency,
                redirect_url,
            } => Self {
                provider: PaymentProvider::External,
                payment_id: payment_id.to_string(),
                store_id: Some(store_id),
                channel_key: Some(channel_key),
                order_name: Some(order_name),
                total_amount,
                currency: currency.to_owned(),
                redirect_url,
            },
        }
    }
}

/// Reservation plus the intent for its newest attempt.
///
/// `paymentIntent` is absent when the reservation was stored but the intent
/// could not be built; a payment retry produces a fresh one.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationWithIntentResponse {
    pub reservation: ReservationResponse,
    pub payment_intent: Option<PaymentIntentResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::ProviderPaymentId;
    use crate::domain::ports::ReservationView;
    use crate::test_support::pending_record;
    use rstest::rstest;

    #[rstest]
    fn reservation_response_exposes_token_not_internal_id() {
        let record = pending_record();

        let response = ReservationResponse::from(ReservationView::from(&record));
        let json = serde_json::to_value(&response).expect("serialise");

        assert_eq!(json["token"], record.reservation.public_token.to_string());
        assert_eq!(json["status"], "PENDING_PAYMENT");
        assert_eq!(json["nights"], 2);
        assert_eq!(json["paymentAttempts"][0]["status"], "INITIATED");
        assert!(json.get("id").is_none());
    }

    #[rstest]
    fn mock_intent_omits_provider_fields() {
        let intent = PaymentIntent::Mock {
            payment_id: ProviderPaymentId::new("tok").expect("payment id"),
            total_amount: 260_000,
            currency: "KRW",
        };

        let json = serde_json::to_value(PaymentIntentResponse::from(intent)).expect("serialise");

        assert_eq!(json["provider"], "MOCK");
        assert_eq!(json["totalAmount"], 260_000);
        assert!(json.get("storeId").is_none());
        assert!(json.get("redirectUrl").is_none());
    }
}

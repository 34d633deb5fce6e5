//! Provider webhook deliveries and reconciliation outcomes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::payment::{ProviderPaymentId, ProviderPaymentStatus};

/// Validation errors for [`WebhookId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookIdError {
    #[error("webhook id must not be empty")]
    Empty,
    #[error("webhook id must be at most {max} characters")]
    TooLong { max: usize },
}

/// Provider-assigned delivery identifier; the deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WebhookId(String);

impl WebhookId {
    pub const MAX_LEN: usize = 255;

    pub fn new(raw: impl Into<String>) -> Result<Self, WebhookIdError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WebhookIdError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(WebhookIdError::TooLong { max: Self::MAX_LEN });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for WebhookId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WebhookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A webhook as received, before its signature has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookDelivery {
    pub id: WebhookId,
    /// Raw `webhook-timestamp` header (Unix seconds).
    pub timestamp: String,
    /// Raw `webhook-signature` header.
    pub signature: String,
    pub body: Vec<u8>,
}

impl WebhookDelivery {
    /// Hex SHA-256 digest of the body, stored in the ledger.
    pub fn payload_digest(&self) -> String {
        hex::encode(Sha256::digest(&self.body))
    }

    /// Body as text for forensic storage; invalid UTF-8 is replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Ledger row written once per delivery id and never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookLedgerEntry {
    pub webhook_id: WebhookId,
    pub webhook_timestamp: String,
    pub payload_digest: String,
    pub raw_payload: String,
    pub received_at: DateTime<Utc>,
}

impl WebhookLedgerEntry {
    pub fn from_delivery(delivery: &WebhookDelivery, received_at: DateTime<Utc>) -> Self {
        Self {
            webhook_id: delivery.id.clone(),
            webhook_timestamp: delivery.timestamp.clone(),
            payload_digest: delivery.payload_digest(),
            raw_payload: delivery.body_text(),
            received_at,
        }
    }
}

/// Errors raised while interpreting a verified webhook body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderEventError {
    #[error("webhook body is not valid JSON: {message}")]
    Json { message: String },
    #[error("webhook body is missing {field}")]
    MissingField { field: &'static str },
    #[error("webhook payment id is invalid: {message}")]
    InvalidPaymentId { message: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: Option<String>,
    data: Option<EventData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventData {
    payment_id: Option<String>,
    status: Option<String>,
}

/// Payment event reported by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEvent {
    pub event_type: String,
    /// Absent for events that do not concern a payment.
    pub payment_id: Option<ProviderPaymentId>,
    pub status: ProviderPaymentStatus,
    pub raw: Value,
}

impl ProviderEvent {
    /// Parse a provider event body.
    ///
    /// The payment status comes from `data.status` when present, otherwise
    /// from the last dot-separated segment of `type` (`Transaction.Paid`).
    ///
    /// # Examples
    /// ```
    /// use lodging_backend::domain::{ProviderEvent, ProviderPaymentStatus};
    ///
    /// let body = br#"{"type":"Transaction.Paid","data":{"paymentId":"pay-1"}}"#;
    /// let event = ProviderEvent::parse(body).expect("event");
    /// assert_eq!(event.status, ProviderPaymentStatus::Paid);
    /// ```
    pub fn parse(body: &[u8]) -> Result<Self, ProviderEventError> {
        let raw: Value = serde_json::from_slice(body).map_err(|err| ProviderEventError::Json {
            message: err.to_string(),
        })?;
        let envelope: EventEnvelope =
            serde_json::from_value(raw.clone()).map_err(|err| ProviderEventError::Json {
                message: err.to_string(),
            })?;
        let event_type = envelope
            .event_type
            .filter(|value| !value.trim().is_empty())
            .ok_or(ProviderEventError::MissingField { field: "type" })?;
        let data = envelope.data;
        let payment_id = data
            .as_ref()
            .and_then(|data| data.payment_id.clone())
            .map(|id| {
                ProviderPaymentId::new(id).map_err(|err| ProviderEventError::InvalidPaymentId {
                    message: err.to_string(),
                })
            })
            .transpose()?;
        let status_text = data
            .and_then(|data| data.status)
            .unwrap_or_else(|| {
                event_type
                    .rsplit('.')
                    .next()
                    .unwrap_or(event_type.as_str())
                    .to_owned()
            });
        Ok(Self {
            status: ProviderPaymentStatus::parse(&status_text),
            event_type,
            payment_id,
            raw,
        })
    }
}

/// Result of applying a provider event or reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationOutcome {
    /// The reservation moved to `CONFIRMED`.
    Confirmed,
    /// The reservation was already `CONFIRMED`; nothing changed.
    AlreadyConfirmed,
    /// The reservation moved to `CANCELLED` after a payment failure.
    Cancelled,
    /// The reservation was already `CANCELLED`; nothing changed.
    AlreadyCancelled,
    /// A payment succeeded for a reservation that is already `CANCELLED`.
    Ignored,
    /// The delivery id was seen before; nothing was applied.
    AlreadyProcessed,
    /// No payment attempt matches the event.
    Orphan,
    /// The event type is not one the engine acts upon.
    Unhandled,
}

impl ReconciliationOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::AlreadyConfirmed => "ALREADY_CONFIRMED",
            Self::Cancelled => "CANCELLED",
            Self::AlreadyCancelled => "ALREADY_CANCELLED",
            Self::Ignored => "IGNORED",
            Self::AlreadyProcessed => "ALREADY_PROCESSED",
            Self::Orphan => "ORPHAN",
            Self::Unhandled => "UNHANDLED",
        }
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(br#"{"type":"Transaction.Paid","data":{"paymentId":"p1"}}"#.as_slice(), ProviderPaymentStatus::Paid)]
    #[case(br#"{"type":"Transaction.Failed","data":{"paymentId":"p1"}}"#.as_slice(), ProviderPaymentStatus::Failed)]
    #[case(br#"{"type":"payment","data":{"paymentId":"p1","status":"CANCELLED"}}"#.as_slice(), ProviderPaymentStatus::Cancelled)]
    #[case(br#"{"type":"Transaction.Ready","data":{"paymentId":"p1"}}"#.as_slice(), ProviderPaymentStatus::Other("Ready".to_owned()))]
    fn resolves_status(#[case] body: &[u8], #[case] expected: ProviderPaymentStatus) {
        let event = ProviderEvent::parse(body).expect("event");
        assert_eq!(event.status, expected);
        assert_eq!(event.payment_id.as_ref().map(AsRef::as_ref), Some("p1"));
    }

    #[rstest]
    fn events_without_payment_are_parsed() {
        let event = ProviderEvent::parse(br#"{"type":"Billing.KeyIssued","data":{}}"#)
            .expect("event");
        assert!(event.payment_id.is_none());
    }

    #[rstest]
    #[case(b"not json".as_slice())]
    #[case(br#"{"data":{"paymentId":"p1"}}"#.as_slice())]
    #[case(br#"{"type":"Transaction.Paid","data":{"paymentId":""}}"#.as_slice())]
    fn rejects_malformed_bodies(#[case] body: &[u8]) {
        assert!(ProviderEvent::parse(body).is_err());
    }

    #[rstest]
    fn ledger_entry_hashes_body() {
        let delivery = WebhookDelivery {
            id: WebhookId::new("msg_1").expect("id"),
            timestamp: "1700000000".to_owned(),
            signature: "v1,abc".to_owned(),
            body: b"{}".to_vec(),
        };
        let entry = WebhookLedgerEntry::from_delivery(&delivery, Utc::now());
        assert_eq!(
            entry.payload_digest,
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
        assert_eq!(entry.raw_payload, "{}");
    }
}

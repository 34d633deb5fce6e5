//! Payment attempts and provider-facing payment values.
//!
//! Each reservation owns one or more payment attempts. An attempt is keyed
//! by the provider payment id the client hands to the payment provider,
//! which is also how webhooks and reconciliation find their way back.

mod gateway;
mod intent;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

pub use gateway::{ExternalProviderConfig, ExternalProviderGateway, PaymentGateway};
pub use intent::{PaymentIntent, order_name};

use crate::domain::reservation::{PublicToken, ReservationId};

/// Which provider implementation handles a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    Mock,
    External,
}

impl PaymentProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "MOCK",
            Self::External => "EXTERNAL",
        }
    }
}

impl FromStr for PaymentProvider {
    type Err = ParsePaymentValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MOCK" => Ok(Self::Mock),
            "EXTERNAL" => Ok(Self::External),
            other => Err(ParsePaymentValueError::Provider(other.to_owned())),
        }
    }
}

/// Raised when a stored payment enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsePaymentValueError {
    #[error("unknown payment provider: {0}")]
    Provider(String),
    #[error("unknown payment attempt status: {0}")]
    AttemptStatus(String),
}

/// Status of a single payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentAttemptStatus {
    Initiated,
    Paid,
    Failed,
    Cancelled,
}

impl PaymentAttemptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "INITIATED",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the attempt still awaits a provider outcome.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Initiated)
    }
}

impl FromStr for PaymentAttemptStatus {
    type Err = ParsePaymentValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INITIATED" => Ok(Self::Initiated),
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ParsePaymentValueError::AttemptStatus(other.to_owned())),
        }
    }
}

/// Internal primary key of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentAttemptId(Uuid);

impl PaymentAttemptId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PaymentAttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validation errors for [`ProviderPaymentId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderPaymentIdError {
    #[error("payment id must not be empty")]
    Empty,
    #[error("payment id must be at most {max} characters")]
    TooLong { max: usize },
    #[error("payment id may only contain printable ASCII without spaces")]
    InvalidCharacters,
}

/// Identifier shared with the payment provider for one attempt.
///
/// The first attempt of a reservation reuses its public token; retries append
/// `-r<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderPaymentId(String);

impl ProviderPaymentId {
    pub const MAX_LEN: usize = 128;

    pub fn new(raw: impl Into<String>) -> Result<Self, ProviderPaymentIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ProviderPaymentIdError::Empty);
        }
        if raw.len() > Self::MAX_LEN {
            return Err(ProviderPaymentIdError::TooLong { max: Self::MAX_LEN });
        }
        if !raw.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(ProviderPaymentIdError::InvalidCharacters);
        }
        Ok(Self(raw))
    }

    /// Payment id for the `sequence`-th attempt of a reservation (zero-based).
    ///
    /// # Examples
    /// ```
    /// use lodging_backend::domain::{ProviderPaymentId, PublicToken};
    ///
    /// let token = PublicToken::parse("abcdefghijklmnop").expect("token");
    /// assert_eq!(ProviderPaymentId::for_attempt(&token, 0).as_ref(), "abcdefghijklmnop");
    /// assert_eq!(ProviderPaymentId::for_attempt(&token, 2).as_ref(), "abcdefghijklmnop-r2");
    /// ```
    pub fn for_attempt(token: &PublicToken, sequence: usize) -> Self {
        match sequence {
            0 => Self(token.to_string()),
            n => Self(format!("{token}-r{n}")),
        }
    }
}

impl AsRef<str> for ProviderPaymentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderPaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ProviderPaymentId> for String {
    fn from(value: ProviderPaymentId) -> Self {
        value.0
    }
}

impl TryFrom<String> for ProviderPaymentId {
    type Error = ProviderPaymentIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Stored payment attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentAttempt {
    pub id: PaymentAttemptId,
    pub reservation_id: ReservationId,
    pub provider: PaymentProvider,
    pub provider_payment_id: ProviderPaymentId,
    pub status: PaymentAttemptStatus,
    /// Last provider payload applied to the attempt, if any.
    pub provider_payload: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attempt about to be inserted alongside a reservation or as a retry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPaymentAttempt {
    pub id: PaymentAttemptId,
    pub provider: PaymentProvider,
    pub provider_payment_id: ProviderPaymentId,
    pub created_at: DateTime<Utc>,
}

impl NewPaymentAttempt {
    pub fn into_attempt(self, reservation_id: ReservationId) -> PaymentAttempt {
        PaymentAttempt {
            id: self.id,
            reservation_id,
            provider: self.provider,
            provider_payment_id: self.provider_payment_id,
            status: PaymentAttemptStatus::Initiated,
            provider_payload: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Payment state as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderPaymentStatus {
    Paid,
    Failed,
    Cancelled,
    /// Any other provider state, such as ready or partially refunded.
    Other(String),
}

impl ProviderPaymentStatus {
    /// Interpret a provider status string, ignoring case.
    ///
    /// # Examples
    /// ```
    /// use lodging_backend::domain::ProviderPaymentStatus;
    ///
    /// assert_eq!(ProviderPaymentStatus::parse("paid"), ProviderPaymentStatus::Paid);
    /// assert_eq!(ProviderPaymentStatus::parse("CANCELED"), ProviderPaymentStatus::Cancelled);
    /// ```
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PAID" => Self::Paid,
            "FAILED" => Self::Failed,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            _ => Self::Other(raw.trim().to_owned()),
        }
    }

    /// Attempt status a failure report maps onto, if any.
    pub fn failure_status(&self) -> Option<PaymentAttemptStatus> {
        match self {
            Self::Failed => Some(PaymentAttemptStatus::Failed),
            Self::Cancelled => Some(PaymentAttemptStatus::Cancelled),
            Self::Paid | Self::Other(_) => None,
        }
    }
}

/// Provider-side view of one payment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPaymentSnapshot {
    pub payment_id: ProviderPaymentId,
    pub status: ProviderPaymentStatus,
    /// Raw provider document kept for audit.
    pub raw: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("has space")]
    #[case("tab\there")]
    fn payment_id_rejects_bad_input(#[case] raw: &str) {
        assert!(ProviderPaymentId::new(raw).is_err());
    }

    #[rstest]
    #[case("PAID", ProviderPaymentStatus::Paid)]
    #[case(" Failed ", ProviderPaymentStatus::Failed)]
    #[case("cancelled", ProviderPaymentStatus::Cancelled)]
    #[case("READY", ProviderPaymentStatus::Other("READY".to_owned()))]
    fn parses_provider_status(#[case] raw: &str, #[case] expected: ProviderPaymentStatus) {
        assert_eq!(ProviderPaymentStatus::parse(raw), expected);
    }

    #[rstest]
    #[case(PaymentAttemptStatus::Initiated)]
    #[case(PaymentAttemptStatus::Paid)]
    #[case(PaymentAttemptStatus::Failed)]
    #[case(PaymentAttemptStatus::Cancelled)]
    fn attempt_status_parses_its_own_text(#[case] status: PaymentAttemptStatus) {
        assert_eq!(status.as_str().parse::<PaymentAttemptStatus>(), Ok(status));
    }

    #[rstest]
    fn only_initiated_attempts_are_open() {
        assert!(PaymentAttemptStatus::Initiated.is_open());
        assert!(!PaymentAttemptStatus::Paid.is_open());
        assert!(!PaymentAttemptStatus::Failed.is_open());
    }
}

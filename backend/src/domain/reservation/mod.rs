//! Reservation aggregate.
//!
//! A reservation is the exclusive hold a requester places on a unit for a
//! half-open range of nights. Its status only moves forward:
//! `PENDING_PAYMENT` to `CONFIRMED` or `CANCELLED`. Payment attempts hang off
//! the reservation; see [`crate::domain::payment`].

mod party;
mod pricing;
mod status;
mod stay;
mod token;
mod transition;

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use party::{PartyComposition, PartyCountError};
pub use pricing::{
    DEFAULT_KRW_PER_USD, DisplayConversion, PRIMARY_CURRENCY, PriceTotals, PricingError,
};
pub use status::{ACTIVE_STATUSES, ParseReservationStatusError, ReservationStatus, TransitionCheck};
pub use stay::{StayDates, StayDatesError};
pub use token::{PublicToken, PublicTokenError};
pub use transition::{
    AttemptUpdate, CancellationReason, StatusTransition, TransitionOutcome, TransitionPlan,
    TransitionReport,
};

use crate::domain::identity::Requester;
use crate::domain::payment::{NewPaymentAttempt, PaymentAttempt};

/// Internal primary key of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
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

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Validation errors for [`UnitId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitIdError {
    #[error("unit id must not be empty")]
    Empty,
    #[error("unit id must be at most {max} characters")]
    TooLong { max: usize },
    #[error("unit id may only contain letters, digits, '-' or '_'")]
    InvalidCharacters,
}

/// Identifier of a bookable unit in the listing catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitId(String);

impl UnitId {
    pub const MAX_LEN: usize = 64;

    pub fn new(raw: impl Into<String>) -> Result<Self, UnitIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(UnitIdError::Empty);
        }
        if raw.len() > Self::MAX_LEN {
            return Err(UnitIdError::TooLong { max: Self::MAX_LEN });
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(UnitIdError::InvalidCharacters);
        }
        Ok(Self(raw))
    }
}

impl AsRef<str> for UnitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<UnitId> for String {
    fn from(value: UnitId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UnitId {
    type Error = UnitIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Stored reservation.
///
/// `confirmation_sent` is the at-most-once guard for the confirmation
/// notification; it is set in the same transaction that observes the
/// reservation as confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: ReservationId,
    pub public_token: PublicToken,
    pub unit_id: UnitId,
    pub requester: Requester,
    pub stay: StayDates,
    pub party: PartyComposition,
    pub totals: PriceTotals,
    pub cancellation_deadline: DateTime<FixedOffset>,
    pub status: ReservationStatus,
    pub confirmation_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether a guest may still cancel free of charge at `now`.
    pub fn within_free_cancellation(&self, now: DateTime<Utc>) -> bool {
        now < self.cancellation_deadline.with_timezone(&Utc)
    }
}

/// Reservation together with its payment attempts, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationRecord {
    pub reservation: Reservation,
    pub attempts: Vec<PaymentAttempt>,
}

impl ReservationRecord {
    /// Most recent attempt still awaiting a provider outcome.
    pub fn latest_open_attempt(&self) -> Option<&PaymentAttempt> {
        self.attempts.iter().rev().find(|attempt| attempt.status.is_open())
    }
}

/// Everything needed to insert a pending reservation and its first attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub id: ReservationId,
    pub public_token: PublicToken,
    pub unit_id: UnitId,
    pub requester: Requester,
    pub stay: StayDates,
    pub party: PartyComposition,
    pub totals: PriceTotals,
    pub cancellation_deadline: DateTime<FixedOffset>,
    pub first_attempt: NewPaymentAttempt,
    pub created_at: DateTime<Utc>,
}

impl NewReservation {
    /// Materialise the stored form of a freshly inserted reservation.
    pub fn into_record(self) -> ReservationRecord {
        let reservation = Reservation {
            id: self.id,
            public_token: self.public_token,
            unit_id: self.unit_id,
            requester: self.requester,
            stay: self.stay,
            party: self.party,
            totals: self.totals,
            cancellation_deadline: self.cancellation_deadline,
            status: ReservationStatus::PendingPayment,
            confirmation_sent: false,
            created_at: self.created_at,
            updated_at: self.created_at,
        };
        let attempt = self.first_attempt.into_attempt(reservation.id);
        ReservationRecord {
            reservation,
            attempts: vec![attempt],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("unit 1")]
    #[case("unit/1")]
    fn unit_id_rejects_bad_input(#[case] raw: &str) {
        assert!(UnitId::new(raw).is_err());
    }

    #[rstest]
    fn unit_id_rejects_long_input() {
        assert_eq!(
            UnitId::new("u".repeat(UnitId::MAX_LEN + 1)),
            Err(UnitIdError::TooLong {
                max: UnitId::MAX_LEN
            })
        );
    }

    #[rstest]
    fn unit_id_accepts_slug_like_values() {
        assert_eq!(UnitId::new("seoul-loft_01").map(String::from), Ok("seoul-loft_01".to_owned()));
    }
}

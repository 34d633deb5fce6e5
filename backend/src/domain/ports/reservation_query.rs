//! Driving port for read-only reservation and availability queries.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::domain::payment::{PaymentAttempt, PaymentAttemptStatus, PaymentProvider, ProviderPaymentId};
use crate::domain::reservation::{
    PartyComposition, PriceTotals, PublicToken, ReservationRecord, ReservationStatus, StayDates,
    UnitId,
};
use crate::domain::Error;

/// Public projection of a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAttemptView {
    pub payment_id: ProviderPaymentId,
    pub provider: PaymentProvider,
    pub status: PaymentAttemptStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&PaymentAttempt> for PaymentAttemptView {
    fn from(value: &PaymentAttempt) -> Self {
        Self {
            payment_id: value.provider_payment_id.clone(),
            provider: value.provider,
            status: value.status,
            created_at: value.created_at,
        }
    }
}

/// Public projection of a reservation.
///
/// Keyed by the public token; the internal primary key never leaves the
/// domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationView {
    pub public_token: PublicToken,
    pub unit_id: UnitId,
    pub status: ReservationStatus,
    pub stay: StayDates,
    pub party: PartyComposition,
    pub totals: PriceTotals,
    pub cancellation_deadline: DateTime<FixedOffset>,
    pub created_at: DateTime<Utc>,
    pub attempts: Vec<PaymentAttemptView>,
}

impl From<&ReservationRecord> for ReservationView {
    fn from(value: &ReservationRecord) -> Self {
        let reservation = &value.reservation;
        Self {
            public_token: reservation.public_token.clone(),
            unit_id: reservation.unit_id.clone(),
            status: reservation.status,
            stay: reservation.stay,
            party: reservation.party,
            totals: reservation.totals,
            cancellation_deadline: reservation.cancellation_deadline,
            created_at: reservation.created_at,
            attempts: value.attempts.iter().map(PaymentAttemptView::from).collect(),
        }
    }
}

/// Request to check whether a unit is free for some nights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRequest {
    pub unit_id: UnitId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

/// Advisory availability answer with the price the stay would lock in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityQuote {
    pub unit_id: UnitId,
    pub stay: StayDates,
    pub available: bool,
    pub nights: u32,
    pub totals: PriceTotals,
}

/// Driving port for reservation reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationQuery: Send + Sync {
    /// Fetch a reservation by its public token.
    async fn get_reservation(&self, token: &PublicToken) -> Result<ReservationView, Error>;

    /// Check a unit's availability without holding any lock.
    async fn check_availability(
        &self,
        request: AvailabilityRequest,
    ) -> Result<AvailabilityQuote, Error>;
}

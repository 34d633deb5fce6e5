//! Driving port for reservation mutations.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::identity::Caller;
use crate::domain::payment::PaymentIntent;
use crate::domain::reservation::{PublicToken, UnitId};
use crate::domain::Error;

use super::ReservationView;

/// Raw party counts as supplied by the client; validated by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartyCounts {
    pub adults: i64,
    pub children: i64,
    pub infants: i64,
    pub pets: i64,
}

/// Request to hold a unit for a range of nights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReservationRequest {
    pub unit_id: UnitId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub party: PartyCounts,
    pub caller: Caller,
}

/// Reservation held in `PENDING_PAYMENT` plus how to pay for it.
///
/// `payment_intent` is `None` when building the intent failed after the
/// reservation was committed; the client may retry through
/// [`BookingCommand::open_payment_attempt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReservationResponse {
    pub reservation: ReservationView,
    pub payment_intent: Option<PaymentIntent>,
}

/// New payment attempt for a pending reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentAttemptResponse {
    pub reservation: ReservationView,
    pub payment_intent: PaymentIntent,
}

/// Driving port for booking write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingCommand: Send + Sync {
    /// Validate, price, and atomically hold the nights.
    ///
    /// Overlapping active reservations yield `conflict`; unknown units yield
    /// `not_found`.
    async fn create_reservation(
        &self,
        request: CreateReservationRequest,
    ) -> Result<CreateReservationResponse, Error>;

    /// Open a fresh payment attempt for a pending reservation.
    async fn open_payment_attempt(&self, token: &PublicToken) -> Result<PaymentAttemptResponse, Error>;

    /// Confirm payment synchronously; only available in mock payment mode.
    ///
    /// Idempotent for confirmed reservations, `conflict` for cancelled ones.
    async fn confirm_mock_payment(&self, token: &PublicToken) -> Result<ReservationView, Error>;

    /// Host declines a pending reservation for one of their units.
    async fn decline_reservation(
        &self,
        token: &PublicToken,
        caller: Caller,
    ) -> Result<ReservationView, Error>;

    /// Requester cancels a pending reservation before the free-cancellation
    /// deadline.
    async fn cancel_reservation(
        &self,
        token: &PublicToken,
        caller: Caller,
    ) -> Result<ReservationView, Error>;
}

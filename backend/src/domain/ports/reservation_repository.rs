//! Port abstraction for the reservation store.
//!
//! The store is the single source of truth for reservation status. Every
//! mutating method is one atomic unit: the conflict check and insert in
//! [`ReservationRepository::create_pending`] share a transaction, and status
//! transitions lock the reservation row before planning their writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::payment::{PaymentAttempt, PaymentAttemptId, PaymentProvider, ProviderPaymentId};
use crate::domain::reservation::{
    NewReservation, PublicToken, ReservationId, ReservationRecord, ReservationStatus, StayDates,
    StatusTransition, TransitionOutcome, UnitId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by reservation store adapters.
    pub enum ReservationRepositoryError {
        /// Store connection could not be established.
        Connection { message: String } => "reservation store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "reservation store query failed: {message}",
        /// A row could not be mapped onto the domain model.
        Corrupt { message: String } => "reservation store returned invalid data: {message}",
        /// The reservation addressed by a mutation does not exist.
        MissingReservation { id: String } => "reservation {id} does not exist",
    }
}

/// Result of the atomic check-and-insert.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatePendingOutcome {
    Created(ReservationRecord),
    /// An active reservation already holds at least one of the nights.
    DatesUnavailable,
}

/// Result of opening a retry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum OpenAttemptOutcome {
    Opened {
        record: ReservationRecord,
        attempt: PaymentAttempt,
    },
    /// The reservation has left `PENDING_PAYMENT`.
    NotPending(ReservationStatus),
}

/// Port for reservation persistence and status transitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Whether an active reservation for `unit_id` overlaps `stay`.
    ///
    /// Advisory only: callers that go on to insert must rely on
    /// [`ReservationRepository::create_pending`] re-checking atomically.
    async fn has_conflict(
        &self,
        unit_id: &UnitId,
        stay: &StayDates,
        exclude: Option<ReservationId>,
    ) -> Result<bool, ReservationRepositoryError>;

    /// Check for overlaps and insert the reservation with its first attempt,
    /// all in one atomic unit.
    async fn create_pending(
        &self,
        reservation: NewReservation,
    ) -> Result<CreatePendingOutcome, ReservationRepositoryError>;

    /// Look up a reservation and its attempts by public token.
    async fn find_by_token(
        &self,
        token: &PublicToken,
    ) -> Result<Option<ReservationRecord>, ReservationRepositoryError>;

    /// Look up a reservation and its attempts by primary key.
    async fn find_by_id(
        &self,
        id: ReservationId,
    ) -> Result<Option<ReservationRecord>, ReservationRepositoryError>;

    /// Look up the attempt carrying a provider payment id.
    async fn find_attempt_by_payment_id(
        &self,
        payment_id: &ProviderPaymentId,
    ) -> Result<Option<PaymentAttempt>, ReservationRepositoryError>;

    /// Add an `INITIATED` attempt if the reservation is still pending.
    ///
    /// The store derives the provider payment id from the public token and
    /// the number of existing attempts while holding the row lock, so
    /// concurrent retries never share an id.
    async fn open_payment_attempt(
        &self,
        reservation_id: ReservationId,
        attempt_id: PaymentAttemptId,
        provider: PaymentProvider,
        at: DateTime<Utc>,
    ) -> Result<OpenAttemptOutcome, ReservationRepositoryError>;

    /// Apply a status transition under a row lock.
    async fn apply_transition(
        &self,
        reservation_id: ReservationId,
        transition: StatusTransition,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ReservationRepositoryError>;

    /// Cancel every `PENDING_PAYMENT` reservation created before `cutoff`.
    ///
    /// The status predicate is evaluated by the store itself so a confirmation
    /// committed first always wins. Returns the number of cancelled rows.
    async fn expire_pending_before(
        &self,
        cutoff: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, ReservationRepositoryError>;
}

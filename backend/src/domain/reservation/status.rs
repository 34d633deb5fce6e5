//! Reservation lifecycle states and the transition table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a reservation.
///
/// `PendingPayment` is the only non-terminal state. Both `PendingPayment` and
/// `Confirmed` hold the unit's nights exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
}

/// Statuses that block overlapping reservations for the same unit.
pub const ACTIVE_STATUSES: [ReservationStatus; 2] =
    [ReservationStatus::PendingPayment, ReservationStatus::Confirmed];

/// Result of checking a requested transition against the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    /// The transition moves the reservation forward.
    Apply,
    /// The reservation is already in the requested state.
    AlreadyApplied,
    /// The transition would regress a terminal state.
    Refused,
}

impl ReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the reservation still holds its nights.
    pub fn is_active(self) -> bool {
        matches!(self, Self::PendingPayment | Self::Confirmed)
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::PendingPayment)
    }

    /// Check whether moving to `target` is allowed.
    ///
    /// Transitions are monotonic: only `PendingPayment` may move, and
    /// re-requesting the current terminal state is an idempotent no-op.
    ///
    /// # Examples
    /// ```
    /// use lodging_backend::domain::{ReservationStatus, TransitionCheck};
    ///
    /// assert_eq!(
    ///     ReservationStatus::Confirmed.check_transition(ReservationStatus::Cancelled),
    ///     TransitionCheck::Refused,
    /// );
    /// ```
    pub fn check_transition(self, target: Self) -> TransitionCheck {
        match (self, target) {
            (current, wanted) if current == wanted => TransitionCheck::AlreadyApplied,
            (Self::PendingPayment, _) => TransitionCheck::Apply,
            _ => TransitionCheck::Refused,
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown reservation status: {0}")]
pub struct ParseReservationStatusError(pub String);

impl FromStr for ReservationStatus {
    type Err = ParseReservationStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_PAYMENT" => Ok(Self::PendingPayment),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ParseReservationStatusError(other.to_owned())),
        }
    }
}

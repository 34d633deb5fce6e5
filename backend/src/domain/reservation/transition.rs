//! Status transitions applied by the reservation store.
//!
//! Stores load the reservation under a row lock, ask [`StatusTransition::plan`]
//! what to write, persist the plan, and commit. Keeping the rules here means
//! every store implementation enforces the same lifecycle.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::payment::{PaymentAttemptId, PaymentAttemptStatus};

use super::{Reservation, ReservationRecord, ReservationStatus, TransitionCheck};

/// Why a pending reservation is being cancelled by a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    HostDeclined,
    GuestCancelled,
}

impl CancellationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostDeclined => "host_declined",
            Self::GuestCancelled => "guest_cancelled",
        }
    }
}

/// A requested change to one reservation.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusTransition {
    /// Payment succeeded, via webhook, reconciliation, or the mock path.
    ConfirmPayment {
        attempt_id: Option<PaymentAttemptId>,
        provider_payload: Option<Value>,
    },
    /// The provider reported the attempt as failed or cancelled.
    FailPayment {
        attempt_id: PaymentAttemptId,
        attempt_status: PaymentAttemptStatus,
        provider_payload: Option<Value>,
    },
    /// Host decline or guest cancellation.
    Cancel { reason: CancellationReason },
}

/// Attempt row change produced by a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptUpdate {
    pub attempt_id: PaymentAttemptId,
    pub status: PaymentAttemptStatus,
    pub provider_payload: Option<Value>,
}

/// Writes a store must perform, atomically, for one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub check: TransitionCheck,
    pub new_status: Option<ReservationStatus>,
    pub attempt_updates: Vec<AttemptUpdate>,
    /// Set the confirmation flag and tell the caller to notify.
    pub mark_confirmation_sent: bool,
}

impl StatusTransition {
    /// Reservation status this transition drives towards.
    pub fn target(&self) -> ReservationStatus {
        match self {
            Self::ConfirmPayment { .. } => ReservationStatus::Confirmed,
            Self::FailPayment { .. } | Self::Cancel { .. } => ReservationStatus::Cancelled,
        }
    }

    /// Work out the writes needed to apply this transition to `record`.
    pub fn plan(&self, record: &ReservationRecord) -> TransitionPlan {
        let current = record.reservation.status;
        let check = current.check_transition(self.target());
        let apply = check == TransitionCheck::Apply;
        let mut updates = Vec::new();

        match self {
            Self::ConfirmPayment {
                attempt_id,
                provider_payload,
            } => {
                let already_paid = record
                    .attempts
                    .iter()
                    .any(|attempt| attempt.status == PaymentAttemptStatus::Paid);
                if apply && !already_paid {
                    if let Some(id) = attempt_id {
                        updates.push(AttemptUpdate {
                            attempt_id: *id,
                            status: PaymentAttemptStatus::Paid,
                            provider_payload: provider_payload.clone(),
                        });
                    }
                }
                if apply {
                    cancel_other_open_attempts(record, attempt_id.as_ref(), &mut updates);
                }
            }
            Self::FailPayment {
                attempt_id,
                attempt_status,
                provider_payload,
            } => {
                let attempt_open = record
                    .attempts
                    .iter()
                    .any(|attempt| attempt.id == *attempt_id && attempt.status.is_open());
                if attempt_open {
                    updates.push(AttemptUpdate {
                        attempt_id: *attempt_id,
                        status: *attempt_status,
                        provider_payload: provider_payload.clone(),
                    });
                }
                if apply {
                    cancel_other_open_attempts(record, Some(attempt_id), &mut updates);
                }
            }
            Self::Cancel { .. } => {
                if apply {
                    cancel_other_open_attempts(record, None, &mut updates);
                }
            }
        }

        let confirmed_after = match check {
            TransitionCheck::Apply => self.target() == ReservationStatus::Confirmed,
            _ => current == ReservationStatus::Confirmed,
        };
        TransitionPlan {
            check,
            new_status: apply.then(|| self.target()),
            attempt_updates: updates,
            mark_confirmation_sent: confirmed_after && !record.reservation.confirmation_sent,
        }
    }
}

fn cancel_other_open_attempts(
    record: &ReservationRecord,
    keep: Option<&PaymentAttemptId>,
    updates: &mut Vec<AttemptUpdate>,
) {
    updates.extend(
        record
            .attempts
            .iter()
            .filter(|attempt| attempt.status.is_open() && Some(&attempt.id) != keep)
            .map(|attempt| AttemptUpdate {
                attempt_id: attempt.id,
                status: PaymentAttemptStatus::Cancelled,
                provider_payload: None,
            }),
    );
}

impl TransitionPlan {
    /// Apply the plan to an in-memory record.
    pub fn apply_to(&self, record: &mut ReservationRecord, at: DateTime<Utc>) {
        if let Some(status) = self.new_status {
            record.reservation.status = status;
            record.reservation.updated_at = at;
        }
        if self.mark_confirmation_sent {
            record.reservation.confirmation_sent = true;
            record.reservation.updated_at = at;
        }
        for update in &self.attempt_updates {
            if let Some(attempt) = record
                .attempts
                .iter_mut()
                .find(|attempt| attempt.id == update.attempt_id)
            {
                attempt.status = update.status;
                if update.provider_payload.is_some() {
                    attempt.provider_payload = update.provider_payload.clone();
                }
                attempt.updated_at = at;
            }
        }
    }

    /// Wrap the post-transition reservation in the matching outcome.
    pub fn into_outcome(self, reservation: Reservation) -> TransitionOutcome {
        let report = TransitionReport {
            reservation,
            send_confirmation: self.mark_confirmation_sent,
        };
        match self.check {
            TransitionCheck::Apply => TransitionOutcome::Applied(report),
            TransitionCheck::AlreadyApplied => TransitionOutcome::AlreadyApplied(report),
            TransitionCheck::Refused => TransitionOutcome::Refused(report),
        }
    }
}

/// Reservation state after a transition request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionReport {
    pub reservation: Reservation,
    /// True exactly once per reservation: when the confirmation flag was set.
    pub send_confirmation: bool,
}

/// Typed result of a transition request; none of these are errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(TransitionReport),
    AlreadyApplied(TransitionReport),
    Refused(TransitionReport),
}

impl TransitionOutcome {
    pub fn report(&self) -> &TransitionReport {
        match self {
            Self::Applied(report) | Self::AlreadyApplied(report) | Self::Refused(report) => report,
        }
    }

    pub fn into_report(self) -> TransitionReport {
        match self {
            Self::Applied(report) | Self::AlreadyApplied(report) | Self::Refused(report) => report,
        }
    }
}

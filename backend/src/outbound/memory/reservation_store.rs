//! Mutex-guarded reservation store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::payment::{
    NewPaymentAttempt, PaymentAttempt, PaymentAttemptId, PaymentAttemptStatus, PaymentProvider,
    ProviderPaymentId,
};
use crate::domain::ports::{
    CreatePendingOutcome, OpenAttemptOutcome, ReservationRepository, ReservationRepositoryError,
};
use crate::domain::reservation::{
    NewReservation, PublicToken, ReservationId, ReservationRecord, ReservationStatus, StayDates,
    StatusTransition, TransitionOutcome, UnitId,
};

/// Reservation store holding every record in memory.
///
/// A single lock serialises all writes, which gives the same guarantees as a
/// serializable transaction at the cost of throughput.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    records: Mutex<HashMap<ReservationId, ReservationRecord>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ReservationId, ReservationRecord>>, ReservationRepositoryError>
    {
        self.records
            .lock()
            .map_err(|_| ReservationRepositoryError::query("reservation store lock poisoned"))
    }
}

fn overlaps_active(
    records: &HashMap<ReservationId, ReservationRecord>,
    unit_id: &UnitId,
    stay: &StayDates,
    exclude: Option<ReservationId>,
) -> bool {
    records.values().any(|record| {
        let reservation = &record.reservation;
        Some(reservation.id) != exclude
            && reservation.unit_id == *unit_id
            && reservation.status.is_active()
            && reservation.stay.overlaps(stay)
    })
}

#[async_trait]
impl ReservationRepository for InMemoryReservationStore {
    async fn has_conflict(
        &self,
        unit_id: &UnitId,
        stay: &StayDates,
        exclude: Option<ReservationId>,
    ) -> Result<bool, ReservationRepositoryError> {
        let records = self.lock()?;
        Ok(overlaps_active(&records, unit_id, stay, exclude))
    }

    async fn create_pending(
        &self,
        reservation: NewReservation,
    ) -> Result<CreatePendingOutcome, ReservationRepositoryError> {
        let mut records = self.lock()?;
        if overlaps_active(&records, &reservation.unit_id, &reservation.stay, None) {
            return Ok(CreatePendingOutcome::DatesUnavailable);
        }
        let token_taken = records
            .values()
            .any(|record| record.reservation.public_token == reservation.public_token);
        if token_taken {
            return Err(ReservationRepositoryError::query(
                "public token already issued",
            ));
        }
        let record = reservation.into_record();
        records.insert(record.reservation.id, record.clone());
        Ok(CreatePendingOutcome::Created(record))
    }

    async fn find_by_token(
        &self,
        token: &PublicToken,
    ) -> Result<Option<ReservationRecord>, ReservationRepositoryError> {
        let records = self.lock()?;
        Ok(records
            .values()
            .find(|record| record.reservation.public_token == *token)
            .cloned())
    }

    async fn find_by_id(
        &self,
        id: ReservationId,
    ) -> Result<Option<ReservationRecord>, ReservationRepositoryError> {
        let records = self.lock()?;
        Ok(records.get(&id).cloned())
    }

    async fn find_attempt_by_payment_id(
        &self,
        payment_id: &ProviderPaymentId,
    ) -> Result<Option<PaymentAttempt>, ReservationRepositoryError> {
        let records = self.lock()?;
        Ok(records
            .values()
            .flat_map(|record| record.attempts.iter())
            .find(|attempt| attempt.provider_payment_id == *payment_id)
            .cloned())
    }

    async fn open_payment_attempt(
        &self,
        reservation_id: ReservationId,
        attempt_id: PaymentAttemptId,
        provider: PaymentProvider,
        at: DateTime<Utc>,
    ) -> Result<OpenAttemptOutcome, ReservationRepositoryError> {
        let mut records = self.lock()?;
        let record = records.get_mut(&reservation_id).ok_or_else(|| {
            ReservationRepositoryError::missing_reservation(reservation_id.to_string())
        })?;
        if record.reservation.status != ReservationStatus::PendingPayment {
            return Ok(OpenAttemptOutcome::NotPending(record.reservation.status));
        }
        let attempt = NewPaymentAttempt {
            id: attempt_id,
            provider,
            provider_payment_id: ProviderPaymentId::for_attempt(
                &record.reservation.public_token,
                record.attempts.len(),
            ),
            created_at: at,
        }
        .into_attempt(reservation_id);
        record.attempts.push(attempt.clone());
        Ok(OpenAttemptOutcome::Opened {
            record: record.clone(),
            attempt,
        })
    }

    async fn apply_transition(
        &self,
        reservation_id: ReservationId,
        transition: StatusTransition,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ReservationRepositoryError> {
        let mut records = self.lock()?;
        let record = records.get_mut(&reservation_id).ok_or_else(|| {
            ReservationRepositoryError::missing_reservation(reservation_id.to_string())
        })?;
        let plan = transition.plan(record);
        plan.apply_to(record, at);
        Ok(plan.into_outcome(record.reservation.clone()))
    }

    async fn expire_pending_before(
        &self,
        cutoff: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, ReservationRepositoryError> {
        let mut records = self.lock()?;
        let mut expired = 0_u64;
        for record in records.values_mut().filter(|record| {
            record.reservation.status == ReservationStatus::PendingPayment
                && record.reservation.created_at < cutoff
        }) {
            record.reservation.status = ReservationStatus::Cancelled;
            record.reservation.updated_at = at;
            for attempt in record
                .attempts
                .iter_mut()
                .filter(|attempt| attempt.status.is_open())
            {
                attempt.status = PaymentAttemptStatus::Cancelled;
                attempt.updated_at = at;
            }
            expired += 1;
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::CancellationReason;
    use crate::test_support::{date, new_reservation, utc};
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn back_to_back_stays_both_fit() {
        let store = InMemoryReservationStore::new();
        let first = new_reservation("U1", date(2025, 6, 1), date(2025, 6, 3));
        let second = new_reservation("U1", date(2025, 6, 3), date(2025, 6, 5));

        assert!(matches!(
            store.create_pending(first).await.expect("first"),
            CreatePendingOutcome::Created(_)
        ));
        assert!(matches!(
            store.create_pending(second).await.expect("second"),
            CreatePendingOutcome::Created(_)
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn overlapping_stay_is_unavailable() {
        let store = InMemoryReservationStore::new();
        store
            .create_pending(new_reservation("U1", date(2025, 6, 1), date(2025, 6, 3)))
            .await
            .expect("first");

        let outcome = store
            .create_pending(new_reservation("U1", date(2025, 6, 2), date(2025, 6, 4)))
            .await
            .expect("second");

        assert_eq!(outcome, CreatePendingOutcome::DatesUnavailable);
    }

    #[rstest]
    #[tokio::test]
    async fn cancelled_reservations_release_their_nights() {
        let store = InMemoryReservationStore::new();
        let CreatePendingOutcome::Created(record) = store
            .create_pending(new_reservation("U1", date(2025, 6, 1), date(2025, 6, 3)))
            .await
            .expect("create")
        else {
            panic!("expected created");
        };
        store
            .apply_transition(
                record.reservation.id,
                StatusTransition::Cancel {
                    reason: CancellationReason::HostDeclined,
                },
                utc(2025, 5, 1, 0),
            )
            .await
            .expect("cancel");

        let stay = StayDates::new(date(2025, 6, 1), date(2025, 6, 3)).expect("stay");
        let unit = UnitId::new("U1").expect("unit");
        assert!(!store.has_conflict(&unit, &stay, None).await.expect("check"));
    }

    #[rstest]
    #[tokio::test]
    async fn retry_attempts_get_sequenced_payment_ids() {
        let store = InMemoryReservationStore::new();
        let CreatePendingOutcome::Created(record) = store
            .create_pending(new_reservation("U1", date(2025, 6, 1), date(2025, 6, 3)))
            .await
            .expect("create")
        else {
            panic!("expected created");
        };

        let outcome = store
            .open_payment_attempt(
                record.reservation.id,
                PaymentAttemptId::random(),
                PaymentProvider::Mock,
                utc(2025, 5, 1, 1),
            )
            .await
            .expect("open");

        let OpenAttemptOutcome::Opened { record, attempt } = outcome else {
            panic!("expected opened attempt");
        };
        assert_eq!(record.attempts.len(), 2);
        assert_eq!(
            attempt.provider_payment_id.to_string(),
            format!("{}-r1", record.reservation.public_token)
        );
        let found = store
            .find_attempt_by_payment_id(&attempt.provider_payment_id)
            .await
            .expect("lookup");
        assert_eq!(found.map(|found| found.id), Some(attempt.id));
    }

    #[rstest]
    #[tokio::test]
    async fn expiry_only_touches_stale_pending_rows() {
        let store = InMemoryReservationStore::new();
        let mut stale = new_reservation("U1", date(2025, 6, 1), date(2025, 6, 3));
        stale.created_at = utc(2025, 5, 1, 0);
        let mut fresh = new_reservation("U1", date(2025, 6, 10), date(2025, 6, 12));
        fresh.created_at = utc(2025, 5, 2, 0);
        store.create_pending(stale).await.expect("stale");
        store.create_pending(fresh).await.expect("fresh");

        let cutoff = utc(2025, 5, 1, 12);
        let first = store
            .expire_pending_before(cutoff, utc(2025, 5, 2, 12))
            .await
            .expect("sweep");
        let second = store
            .expire_pending_before(cutoff, utc(2025, 5, 2, 12))
            .await
            .expect("repeat");

        assert_eq!((first, second), (1, 0));
        let records = store.lock().expect("lock");
        let cancelled = records
            .values()
            .find(|record| record.reservation.status == ReservationStatus::Cancelled)
            .expect("cancelled row");
        assert!(cancelled
            .attempts
            .iter()
            .all(|attempt| attempt.status == PaymentAttemptStatus::Cancelled));
    }
}

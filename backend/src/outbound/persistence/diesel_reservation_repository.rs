//! PostgreSQL-backed `ReservationRepository` implementation using Diesel ORM.
//!
//! # Atomicity
//!
//! Every mutation runs in a `SERIALIZABLE` transaction. Creation additionally
//! takes a transaction-scoped advisory lock keyed on the unit, which
//! serialises the writers for one unit. The lock statement already fixes the
//! transaction snapshot, so a request that waited on the lock does not see
//! the row committed ahead of it: its insert trips the
//! `reservations_no_overlap` exclusion constraint (reported as unavailable
//! dates) or aborts with a serialization failure. Status transitions lock
//! the reservation row with `FOR UPDATE` before the domain plans the write.
//!
//! Transactions aborted with a serialization failure are retried a bounded
//! number of times; the retry starts from a fresh snapshot and sees the
//! winning row in its conflict check.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Text;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::payment::{
    NewPaymentAttempt, PaymentAttempt, PaymentAttemptId, PaymentAttemptStatus, PaymentProvider,
    ProviderPaymentId,
};
use crate::domain::ports::{
    CreatePendingOutcome, OpenAttemptOutcome, ReservationRepository, ReservationRepositoryError,
};
use crate::domain::reservation::{
    ACTIVE_STATUSES, NewReservation, PublicToken, ReservationId, ReservationRecord,
    ReservationStatus, StatusTransition, StayDates, TransitionOutcome, TransitionPlan, UnitId,
};

use super::diesel_basic_error_mapping::{
    NO_OVERLAP_CONSTRAINT, is_serialization_failure, map_basic_diesel_error,
    map_basic_pool_error, violates_constraint,
};
use super::models::{
    NewPaymentAttemptRow, NewReservationRow, PaymentAttemptRow, ReservationRow, into_record,
};
use super::pool::{DbPool, PoolError};
use super::schema::{payment_attempts, reservations};

/// Attempts made for one serializable transaction before giving up.
const MAX_TRANSACTION_ATTEMPTS: u32 = 3;

const LOCK_UNIT_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

/// Diesel-backed implementation of the reservation store port.
#[derive(Clone)]
pub struct DieselReservationRepository {
    pool: DbPool,
}

impl DieselReservationRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure inside a transaction body.
#[derive(Debug)]
enum TxError {
    Diesel(diesel::result::Error),
    Corrupt(String),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

fn map_pool_error(error: PoolError) -> ReservationRepositoryError {
    map_basic_pool_error(error, |message| {
        ReservationRepositoryError::connection(message)
    })
}

fn map_diesel_error(error: diesel::result::Error) -> ReservationRepositoryError {
    map_basic_diesel_error(
        error,
        ReservationRepositoryError::query,
        ReservationRepositoryError::connection,
    )
}

fn map_tx_error(error: TxError) -> ReservationRepositoryError {
    match error {
        TxError::Diesel(error) => map_diesel_error(error),
        TxError::Corrupt(message) => ReservationRepositoryError::corrupt(message),
    }
}

/// Run `$body` in a serializable transaction, retrying serialization failures.
///
/// Evaluates to `Result<T, TxError>`; pool checkout failures return early.
macro_rules! serializable {
    ($repo:expr, $operation:literal, |$conn:ident| $body:expr) => {{
        let mut attempt = 1_u32;
        loop {
            let mut conn = $repo.pool.get().await.map_err(map_pool_error)?;
            let result = conn
                .build_transaction()
                .serializable()
                .run(|$conn| $body.scope_boxed())
                .await;
            match result {
                Err(TxError::Diesel(error))
                    if is_serialization_failure(&error) && attempt < MAX_TRANSACTION_ATTEMPTS =>
                {
                    debug!(operation = $operation, attempt, "retrying serialization failure");
                    attempt += 1;
                }
                other => break other,
            }
        }
    }};
}

async fn lock_unit(conn: &mut AsyncPgConnection, unit_id: &str) -> QueryResult<()> {
    sql_query(LOCK_UNIT_SQL)
        .bind::<Text, _>(unit_id)
        .execute(conn)
        .await
        .map(|_| ())
}

async fn overlap_exists(
    conn: &mut AsyncPgConnection,
    unit_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
    exclude: Option<Uuid>,
) -> QueryResult<bool> {
    let active = ACTIVE_STATUSES.map(ReservationStatus::as_str);
    diesel::select(exists(
        reservations::table
            .filter(reservations::unit_id.eq(unit_id))
            .filter(reservations::status.eq_any(active))
            .filter(reservations::check_in.lt(check_out))
            .filter(reservations::check_out.gt(check_in))
            .filter(reservations::id.ne(exclude.unwrap_or_else(Uuid::nil))),
    ))
    .get_result(conn)
    .await
}

async fn attempts_for(
    conn: &mut AsyncPgConnection,
    reservation_id: Uuid,
) -> QueryResult<Vec<PaymentAttemptRow>> {
    payment_attempts::table
        .filter(payment_attempts::reservation_id.eq(reservation_id))
        .select(PaymentAttemptRow::as_select())
        .order_by((payment_attempts::created_at.asc(), payment_attempts::id.asc()))
        .load(conn)
        .await
}

async fn locked_reservation(
    conn: &mut AsyncPgConnection,
    reservation_id: Uuid,
) -> QueryResult<Option<ReservationRow>> {
    reservations::table
        .find(reservation_id)
        .select(ReservationRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()
}

async fn load_record(
    conn: &mut AsyncPgConnection,
    row: ReservationRow,
) -> Result<ReservationRecord, ReservationRepositoryError> {
    let attempts = attempts_for(conn, row.id).await.map_err(map_diesel_error)?;
    into_record(row, attempts).map_err(ReservationRepositoryError::corrupt)
}

/// Conflict check and insert; `false` when the nights are already held.
async fn insert_if_free(
    conn: &mut AsyncPgConnection,
    reservation: &NewReservationRow<'_>,
    attempt: &NewPaymentAttemptRow<'_>,
) -> Result<bool, TxError> {
    lock_unit(conn, reservation.unit_id).await?;
    if overlap_exists(
        conn,
        reservation.unit_id,
        reservation.check_in,
        reservation.check_out,
        None,
    )
    .await?
    {
        return Ok(false);
    }
    diesel::insert_into(reservations::table)
        .values(reservation)
        .execute(conn)
        .await?;
    diesel::insert_into(payment_attempts::table)
        .values(attempt)
        .execute(conn)
        .await?;
    Ok(true)
}

async fn append_attempt(
    conn: &mut AsyncPgConnection,
    reservation_id: ReservationId,
    attempt_id: PaymentAttemptId,
    provider: PaymentProvider,
    at: DateTime<Utc>,
) -> Result<Option<OpenAttemptOutcome>, TxError> {
    let Some(row) = locked_reservation(conn, *reservation_id.as_uuid()).await? else {
        return Ok(None);
    };
    let attempts = attempts_for(conn, row.id).await?;
    let mut record = into_record(row, attempts).map_err(TxError::Corrupt)?;
    let status = record.reservation.status;
    if status != ReservationStatus::PendingPayment {
        return Ok(Some(OpenAttemptOutcome::NotPending(status)));
    }

    let draft = NewPaymentAttempt {
        id: attempt_id,
        provider,
        provider_payment_id: ProviderPaymentId::for_attempt(
            &record.reservation.public_token,
            record.attempts.len(),
        ),
        created_at: at,
    };
    diesel::insert_into(payment_attempts::table)
        .values(NewPaymentAttemptRow::new(reservation_id, &draft))
        .execute(conn)
        .await?;
    let attempt = draft.into_attempt(reservation_id);
    record.attempts.push(attempt.clone());
    Ok(Some(OpenAttemptOutcome::Opened { record, attempt }))
}

async fn persist_plan(
    conn: &mut AsyncPgConnection,
    record: &ReservationRecord,
    plan: &TransitionPlan,
    at: DateTime<Utc>,
) -> QueryResult<()> {
    let current = &record.reservation;
    if plan.new_status.is_some() || plan.mark_confirmation_sent {
        let status = plan.new_status.unwrap_or(current.status);
        diesel::update(
            reservations::table
                .find(current.id.as_uuid())
                .filter(reservations::status.eq(current.status.as_str())),
        )
        .set((
            reservations::status.eq(status.as_str()),
            reservations::confirmation_sent
                .eq(current.confirmation_sent || plan.mark_confirmation_sent),
            reservations::updated_at.eq(at),
        ))
        .execute(conn)
        .await?;
    }

    for update in &plan.attempt_updates {
        let target = payment_attempts::table.find(update.attempt_id.as_uuid());
        match &update.provider_payload {
            Some(payload) => {
                diesel::update(target)
                    .set((
                        payment_attempts::status.eq(update.status.as_str()),
                        payment_attempts::provider_payload.eq(Some(payload.clone())),
                        payment_attempts::updated_at.eq(at),
                    ))
                    .execute(conn)
                    .await?
            }
            None => {
                diesel::update(target)
                    .set((
                        payment_attempts::status.eq(update.status.as_str()),
                        payment_attempts::updated_at.eq(at),
                    ))
                    .execute(conn)
                    .await?
            }
        };
    }
    Ok(())
}

async fn transition_locked(
    conn: &mut AsyncPgConnection,
    reservation_id: ReservationId,
    transition: &StatusTransition,
    at: DateTime<Utc>,
) -> Result<Option<TransitionOutcome>, TxError> {
    let Some(row) = locked_reservation(conn, *reservation_id.as_uuid()).await? else {
        return Ok(None);
    };
    let attempts = attempts_for(conn, row.id).await?;
    let mut record = into_record(row, attempts).map_err(TxError::Corrupt)?;
    let plan = transition.plan(&record);
    persist_plan(conn, &record, &plan, at).await?;
    plan.apply_to(&mut record, at);
    Ok(Some(plan.into_outcome(record.reservation)))
}

async fn expire_pending(
    conn: &mut AsyncPgConnection,
    cutoff: DateTime<Utc>,
    at: DateTime<Utc>,
) -> Result<u64, TxError> {
    let expired: Vec<Uuid> = diesel::update(
        reservations::table
            .filter(reservations::status.eq(ReservationStatus::PendingPayment.as_str()))
            .filter(reservations::created_at.lt(cutoff)),
    )
    .set((
        reservations::status.eq(ReservationStatus::Cancelled.as_str()),
        reservations::updated_at.eq(at),
    ))
    .returning(reservations::id)
    .get_results(conn)
    .await?;

    if !expired.is_empty() {
        diesel::update(
            payment_attempts::table
                .filter(payment_attempts::reservation_id.eq_any(&expired))
                .filter(payment_attempts::status.eq(PaymentAttemptStatus::Initiated.as_str())),
        )
        .set((
            payment_attempts::status.eq(PaymentAttemptStatus::Cancelled.as_str()),
            payment_attempts::updated_at.eq(at),
        ))
        .execute(conn)
        .await?;
    }
    Ok(u64::try_from(expired.len()).unwrap_or(u64::MAX))
}

#[async_trait]
impl ReservationRepository for DieselReservationRepository {
    async fn has_conflict(
        &self,
        unit_id: &UnitId,
        stay: &StayDates,
        exclude: Option<ReservationId>,
    ) -> Result<bool, ReservationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        overlap_exists(
            &mut conn,
            unit_id.as_ref(),
            stay.check_in(),
            stay.check_out(),
            exclude.map(|id| *id.as_uuid()),
        )
        .await
        .map_err(map_diesel_error)
    }

    async fn create_pending(
        &self,
        reservation: NewReservation,
    ) -> Result<CreatePendingOutcome, ReservationRepositoryError> {
        let inserted = {
            let reservation_row = NewReservationRow::try_from(&reservation)
                .map_err(ReservationRepositoryError::corrupt)?;
            let attempt_row = NewPaymentAttemptRow::new(reservation.id, &reservation.first_attempt);
            serializable!(self, "create_pending", |conn| insert_if_free(
                conn,
                &reservation_row,
                &attempt_row
            ))
        };

        match inserted {
            Ok(true) => {
                debug!(reservation_id = %reservation.id, "pending reservation inserted");
                Ok(CreatePendingOutcome::Created(reservation.into_record()))
            }
            Ok(false) => Ok(CreatePendingOutcome::DatesUnavailable),
            Err(TxError::Diesel(error)) if violates_constraint(&error, NO_OVERLAP_CONSTRAINT) => {
                info!(unit_id = %reservation.unit_id, "overlap rejected by exclusion constraint");
                Ok(CreatePendingOutcome::DatesUnavailable)
            }
            Err(error) => Err(map_tx_error(error)),
        }
    }

    async fn find_by_token(
        &self,
        token: &PublicToken,
    ) -> Result<Option<ReservationRecord>, ReservationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ReservationRow> = reservations::table
            .filter(reservations::public_token.eq(token.as_ref()))
            .select(ReservationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        match row {
            Some(row) => load_record(&mut conn, row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_by_id(
        &self,
        id: ReservationId,
    ) -> Result<Option<ReservationRecord>, ReservationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ReservationRow> = reservations::table
            .find(id.as_uuid())
            .select(ReservationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        match row {
            Some(row) => load_record(&mut conn, row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn find_attempt_by_payment_id(
        &self,
        payment_id: &ProviderPaymentId,
    ) -> Result<Option<PaymentAttempt>, ReservationRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<PaymentAttemptRow> = payment_attempts::table
            .filter(payment_attempts::provider_payment_id.eq(payment_id.as_ref()))
            .select(PaymentAttemptRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(PaymentAttempt::try_from)
            .transpose()
            .map_err(ReservationRepositoryError::corrupt)
    }

    async fn open_payment_attempt(
        &self,
        reservation_id: ReservationId,
        attempt_id: PaymentAttemptId,
        provider: PaymentProvider,
        at: DateTime<Utc>,
    ) -> Result<OpenAttemptOutcome, ReservationRepositoryError> {
        let outcome = serializable!(self, "open_payment_attempt", |conn| append_attempt(
            conn,
            reservation_id,
            attempt_id,
            provider,
            at
        ))
        .map_err(map_tx_error)?;
        outcome.ok_or_else(|| {
            ReservationRepositoryError::missing_reservation(reservation_id.to_string())
        })
    }

    async fn apply_transition(
        &self,
        reservation_id: ReservationId,
        transition: StatusTransition,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ReservationRepositoryError> {
        let outcome = serializable!(self, "apply_transition", |conn| transition_locked(
            conn,
            reservation_id,
            &transition,
            at
        ))
        .map_err(map_tx_error)?;
        outcome.ok_or_else(|| {
            ReservationRepositoryError::missing_reservation(reservation_id.to_string())
        })
    }

    async fn expire_pending_before(
        &self,
        cutoff: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<u64, ReservationRepositoryError> {
        serializable!(self, "expire_pending_before", |conn| expire_pending(
            conn, cutoff, at
        ))
        .map_err(map_tx_error)
    }
}

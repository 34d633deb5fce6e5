//! Expiry of reservations whose payment never completed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::Clock;
use serde_json::json;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::domain::ports::{BookingMetrics, PendingExpiry, ReservationRepository};
use crate::domain::service_support::{log_metrics_failure, map_store_error};
use crate::domain::Error;

/// Default age after which an unpaid reservation is abandoned.
pub const DEFAULT_PENDING_EXPIRY_HOURS: u32 = 24;

/// How the in-process sweeper is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub older_than_hours: u32,
    pub interval: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            older_than_hours: DEFAULT_PENDING_EXPIRY_HOURS,
            interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Cancels stale `PENDING_PAYMENT` reservations in bulk.
#[derive(Clone)]
pub struct ExpirySweeper {
    reservations: Arc<dyn ReservationRepository>,
    metrics: Arc<dyn BookingMetrics>,
    clock: Arc<dyn Clock>,
}

impl ExpirySweeper {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        metrics: Arc<dyn BookingMetrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reservations,
            metrics,
            clock,
        }
    }
}

#[async_trait]
impl PendingExpiry for ExpirySweeper {
    async fn expire_stale_pending(&self, older_than_hours: u32) -> Result<u64, Error> {
        let now = self.clock.utc();
        let cutoff = TimeDelta::try_hours(i64::from(older_than_hours))
            .and_then(|age| now.checked_sub_signed(age))
            .ok_or_else(|| {
                Error::invalid_request(format!(
                    "olderThanHours {older_than_hours} reaches past the supported date range"
                ))
                .with_details(json!({
                    "field": "olderThanHours",
                    "value": older_than_hours,
                    "code": "threshold_out_of_range",
                }))
            })?;
        let expired = self
            .reservations
            .expire_pending_before(cutoff, now)
            .await
            .map_err(map_store_error)?;
        info!(expired, older_than_hours, %cutoff, "pending reservation sweep finished");
        log_metrics_failure(self.metrics.record_expired(expired).await);
        Ok(expired)
    }
}

/// Run the sweep on `policy.interval` until `shutdown` flips to `true`.
///
/// The first sweep runs immediately. Failures are logged and the schedule
/// carries on; the next tick retries.
pub async fn run_expiry_schedule(
    expiry: Arc<dyn PendingExpiry>,
    policy: ExpiryPolicy,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(policy.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = expiry.expire_stale_pending(policy.older_than_hours).await {
                    warn!(error = %err, "scheduled pending sweep failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("pending sweep schedule stopped");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockBookingMetrics, MockPendingExpiry, MockReservationRepository};
    use crate::test_support::{MutableClock, utc};
    use mockable::MockClock;
    use mockall::predicate::eq;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn sweeps_rows_older_than_threshold() {
        let now = utc(2025, 6, 2, 12);
        let mut reservations = MockReservationRepository::new();
        reservations
            .expect_expire_pending_before()
            .with(eq(utc(2025, 6, 1, 12)), eq(now))
            .times(1)
            .return_once(|_, _| Ok(3));
        let mut metrics = MockBookingMetrics::new();
        metrics
            .expect_record_expired()
            .with(eq(3_u64))
            .times(1)
            .return_once(|_| Ok(()));
        let mut clock = MockClock::new();
        clock.expect_utc().times(1).return_const(now);
        let sweeper = ExpirySweeper::new(Arc::new(reservations), Arc::new(metrics), Arc::new(clock));

        assert_eq!(sweeper.expire_stale_pending(24).await.expect("sweep"), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn store_outage_is_service_unavailable() {
        let mut reservations = MockReservationRepository::new();
        reservations
            .expect_expire_pending_before()
            .return_once(|_, _| {
                Err(crate::domain::ports::ReservationRepositoryError::connection(
                    "refused",
                ))
            });
        let sweeper = ExpirySweeper::new(
            Arc::new(reservations),
            Arc::new(MockBookingMetrics::new()),
            Arc::new(MutableClock::new(utc(2025, 6, 2, 12))),
        );

        let err = sweeper.expire_stale_pending(24).await.expect_err("outage");
        assert_eq!(err.code(), crate::domain::ErrorCode::ServiceUnavailable);
    }

    #[rstest]
    #[tokio::test]
    async fn threshold_beyond_the_calendar_is_rejected() {
        let sweeper = ExpirySweeper::new(
            Arc::new(MockReservationRepository::new()),
            Arc::new(MockBookingMetrics::new()),
            Arc::new(MutableClock::new(utc(2025, 6, 2, 12))),
        );

        let err = sweeper
            .expire_stale_pending(u32::MAX)
            .await
            .expect_err("threshold out of range");

        assert_eq!(err.code(), crate::domain::ErrorCode::InvalidRequest);
        assert_eq!(err.details().expect("details")["field"], "olderThanHours");
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_runs_until_shutdown() {
        let mut expiry = MockPendingExpiry::new();
        expiry
            .expect_expire_stale_pending()
            .with(eq(6_u32))
            .times(2)
            .returning(|_| Ok(0));
        let (tx, rx) = watch::channel(false);
        let policy = ExpiryPolicy {
            older_than_hours: 6,
            interval: Duration::from_secs(60),
        };
        let handle = tokio::spawn(run_expiry_schedule(Arc::new(expiry), policy, rx));

        tokio::time::sleep(Duration::from_secs(90)).await;
        tx.send(true).expect("signal shutdown");
        handle.await.expect("schedule task");
    }
}

//! Prometheus adapter for booking engine metrics.
//!
//! Counters are registered with a provided registry and exposed through the
//! `/metrics` endpoint alongside the actix request metrics.

use async_trait::async_trait;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

use crate::domain::ReconciliationOutcome;
use crate::domain::ports::{BookingMetrics, BookingMetricsError, BookingOutcome};

/// Prometheus-backed booking metrics recorder.
///
/// # Metrics
///
/// - `lodging_reservations_requested_total{outcome}`: `created` or
///   `dates_unavailable`
/// - `lodging_payment_reconciliations_total{outcome}`: one of the
///   reconciliation outcomes, e.g. `CONFIRMED` or `ORPHAN`
/// - `lodging_reservations_expired_total`: reservations cancelled by sweeps
pub struct PrometheusBookingMetrics {
    bookings_total: IntCounterVec,
    reconciliations_total: IntCounterVec,
    expired_total: IntCounter,
}

impl PrometheusBookingMetrics {
    /// Create and register metrics with the given registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric with the same name is already registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let bookings_total = IntCounterVec::new(
            Opts::new(
                "lodging_reservations_requested_total",
                "Reservation requests by outcome",
            ),
            &["outcome"],
        )?;
        let reconciliations_total = IntCounterVec::new(
            Opts::new(
                "lodging_payment_reconciliations_total",
                "Webhook deliveries and reconciliations by outcome",
            ),
            &["outcome"],
        )?;
        let expired_total = IntCounter::new(
            "lodging_reservations_expired_total",
            "Pending reservations cancelled by expiry sweeps",
        )?;
        registry.register(Box::new(bookings_total.clone()))?;
        registry.register(Box::new(reconciliations_total.clone()))?;
        registry.register(Box::new(expired_total.clone()))?;
        Ok(Self {
            bookings_total,
            reconciliations_total,
            expired_total,
        })
    }
}

#[async_trait]
impl BookingMetrics for PrometheusBookingMetrics {
    async fn record_booking(&self, outcome: BookingOutcome) -> Result<(), BookingMetricsError> {
        self.bookings_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        Ok(())
    }

    async fn record_reconciliation(
        &self,
        outcome: ReconciliationOutcome,
    ) -> Result<(), BookingMetricsError> {
        self.reconciliations_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        Ok(())
    }

    async fn record_expired(&self, count: u64) -> Result<(), BookingMetricsError> {
        self.expired_total.inc_by(count);
        Ok(())
    }
}

//! Domain port surface for recording booking engine metrics.
//!
//! Services report outcomes through this port without knowing the metrics
//! backend. Recording failures are logged and never affect the operation.

use async_trait::async_trait;

use crate::domain::webhook::ReconciliationOutcome;

use super::define_port_error;

define_port_error! {
    /// Errors exposed when recording booking metrics.
    pub enum BookingMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } => "booking metrics exporter failed: {message}",
    }
}

/// Outcome label for reservation creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOutcome {
    Created,
    DatesUnavailable,
}

impl BookingOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::DatesUnavailable => "dates_unavailable",
        }
    }
}

/// Metrics recording port for the booking engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingMetrics: Send + Sync {
    /// Record the result of a create-reservation call.
    async fn record_booking(&self, outcome: BookingOutcome) -> Result<(), BookingMetricsError>;

    /// Record the outcome of a webhook or reconciliation.
    async fn record_reconciliation(
        &self,
        outcome: ReconciliationOutcome,
    ) -> Result<(), BookingMetricsError>;

    /// Record how many reservations a sweep cancelled.
    async fn record_expired(&self, count: u64) -> Result<(), BookingMetricsError>;
}

/// No-op implementation for when metrics are disabled or in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpBookingMetrics;

#[async_trait]
impl BookingMetrics for NoOpBookingMetrics {
    async fn record_booking(&self, _outcome: BookingOutcome) -> Result<(), BookingMetricsError> {
        Ok(())
    }

    async fn record_reconciliation(
        &self,
        _outcome: ReconciliationOutcome,
    ) -> Result<(), BookingMetricsError> {
        Ok(())
    }

    async fn record_expired(&self, _count: u64) -> Result<(), BookingMetricsError> {
        Ok(())
    }
}

//! Error mapping and side-effect helpers shared by the booking services.

use tracing::{debug, error, warn};

use crate::domain::Error;
use crate::domain::ports::{
    BookingMetricsError, ConfirmationNotifier, ReservationRepositoryError, UnitCatalogueError,
};
use crate::domain::reservation::Reservation;

pub(crate) fn map_store_error(err: ReservationRepositoryError) -> Error {
    match err {
        ReservationRepositoryError::Connection { message } => {
            warn!(%message, "reservation store unavailable");
            Error::service_unavailable("reservation store is unavailable")
        }
        other => {
            error!(error = %other, "reservation store failure");
            Error::internal(format!("reservation store error: {other}"))
        }
    }
}

pub(crate) fn map_catalogue_error(err: UnitCatalogueError) -> Error {
    match err {
        UnitCatalogueError::Connection { message } => {
            warn!(%message, "unit catalogue unavailable");
            Error::service_unavailable("unit catalogue is unavailable")
        }
        UnitCatalogueError::Query { message } => {
            error!(%message, "unit catalogue failure");
            Error::internal(format!("unit catalogue error: {message}"))
        }
    }
}

/// Metrics never fail the operation being measured.
pub(crate) fn log_metrics_failure(result: Result<(), BookingMetricsError>) {
    if let Err(err) = result {
        debug!(error = %err, "booking metrics write failed");
    }
}

/// Hand a confirmation to the notifier; failures are logged and swallowed.
pub(crate) async fn dispatch_confirmation(
    notifier: &dyn ConfirmationNotifier,
    reservation: &Reservation,
) {
    if let Err(err) = notifier.send_confirmation(reservation).await {
        warn!(
            reservation_id = %reservation.id,
            error = %err,
            "confirmation notification failed"
        );
    }
}

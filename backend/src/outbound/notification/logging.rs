//! Notifier that records confirmations in the application log.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{ConfirmationNotifier, ConfirmationNotifierError};
use crate::domain::reservation::Reservation;

/// Used when no relay endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingConfirmationNotifier;

#[async_trait]
impl ConfirmationNotifier for LoggingConfirmationNotifier {
    async fn send_confirmation(
        &self,
        reservation: &Reservation,
    ) -> Result<(), ConfirmationNotifierError> {
        info!(
            reservation_id = %reservation.id,
            public_token = %reservation.public_token,
            unit_id = %reservation.unit_id,
            "booking confirmation ready for delivery"
        );
        Ok(())
    }
}

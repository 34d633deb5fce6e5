//! Port for the booking confirmation side effect.

use async_trait::async_trait;

use crate::domain::reservation::Reservation;

use super::define_port_error;

define_port_error! {
    /// Errors raised while handing off a confirmation.
    pub enum ConfirmationNotifierError {
        /// The notification could not be queued.
        Dispatch { message: String } => "confirmation dispatch failed: {message}",
    }
}

/// Fire-and-forget confirmation sink.
///
/// Implementations must return promptly: slow delivery belongs in a spawned
/// task, not in the caller's request. Failures are logged by the caller and
/// never undo the reservation transition that triggered them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfirmationNotifier: Send + Sync {
    async fn send_confirmation(&self, reservation: &Reservation) -> Result<(), ConfirmationNotifierError>;
}

/// Notifier that drops every confirmation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpConfirmationNotifier;

#[async_trait]
impl ConfirmationNotifier for NoOpConfirmationNotifier {
    async fn send_confirmation(&self, _reservation: &Reservation) -> Result<(), ConfirmationNotifierError> {
        Ok(())
    }
}

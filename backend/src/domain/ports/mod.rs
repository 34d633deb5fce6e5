//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`BookingCommand`, `ReservationQuery`,
//! `PaymentReconciliation`, `PendingExpiry`) are implemented by domain
//! services and called by inbound adapters. Driven ports are implemented by
//! outbound adapters and called by the services.

mod macros;
pub(crate) use macros::define_port_error;

mod booking_command;
mod booking_metrics;
mod confirmation_notifier;
mod payment_reconciliation;
mod payment_status_source;
mod pending_expiry;
mod reservation_query;
mod reservation_repository;
mod unit_catalogue;
mod webhook_ledger;
mod webhook_verifier;

#[cfg(test)]
pub use booking_command::MockBookingCommand;
pub use booking_command::{
    BookingCommand, CreateReservationRequest, CreateReservationResponse, PartyCounts,
    PaymentAttemptResponse,
};
#[cfg(test)]
pub use booking_metrics::MockBookingMetrics;
pub use booking_metrics::{BookingMetrics, BookingMetricsError, BookingOutcome, NoOpBookingMetrics};
#[cfg(test)]
pub use confirmation_notifier::MockConfirmationNotifier;
pub use confirmation_notifier::{
    ConfirmationNotifier, ConfirmationNotifierError, NoOpConfirmationNotifier,
};
#[cfg(test)]
pub use payment_reconciliation::MockPaymentReconciliation;
pub use payment_reconciliation::{PaymentCompletion, PaymentReconciliation};
#[cfg(test)]
pub use payment_status_source::MockPaymentStatusSource;
pub use payment_status_source::{PaymentStatusSource, PaymentStatusSourceError};
#[cfg(test)]
pub use pending_expiry::MockPendingExpiry;
pub use pending_expiry::PendingExpiry;
#[cfg(test)]
pub use reservation_query::MockReservationQuery;
pub use reservation_query::{
    AvailabilityQuote, AvailabilityRequest, PaymentAttemptView, ReservationQuery, ReservationView,
};
#[cfg(test)]
pub use reservation_repository::MockReservationRepository;
pub use reservation_repository::{
    CreatePendingOutcome, OpenAttemptOutcome, ReservationRepository, ReservationRepositoryError,
};
#[cfg(test)]
pub use unit_catalogue::MockUnitCatalogue;
pub use unit_catalogue::{UnitCatalogue, UnitCatalogueError, UnitPricing};
#[cfg(test)]
pub use webhook_ledger::MockWebhookLedger;
pub use webhook_ledger::{WebhookLedger, WebhookLedgerError};
#[cfg(test)]
pub use webhook_verifier::MockWebhookSignatureVerifier;
pub use webhook_verifier::{WebhookSignatureVerifier, WebhookVerificationError};

//! Domain primitives, aggregates, and services.
//!
//! Purpose: define the strongly typed reservation model and the services that
//! drive it. Inbound adapters call the driving ports in [`ports`]; outbound
//! adapters implement the driven ports. Nothing in this module knows about
//! HTTP, SQL, or the provider's wire format.
//!
//! Public surface:
//! - Error (alias to `error::Error`) — transport-agnostic error payload.
//! - ErrorCode (alias to `error::ErrorCode`) — stable error identifier.
//! - BookingService — create, retry, confirm, decline, and cancel bookings.
//! - PaymentReconciliationService — webhook ingestion and reconciliation.
//! - ExpirySweeper — bulk expiry of abandoned reservations.

pub mod civil_time;
pub mod error;
pub mod identity;
pub mod payment;
pub mod ports;
pub mod reservation;
pub mod trace_id;
pub mod webhook;

mod booking_service;
mod expiry_sweeper;
mod payment_reconciliation_service;
mod service_support;

pub use self::booking_service::{BookingPolicy, BookingService, BookingServicePorts};
pub use self::civil_time::{CancellationPolicy, CivilTimeError};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::expiry_sweeper::{
    DEFAULT_PENDING_EXPIRY_HOURS, ExpiryPolicy, ExpirySweeper, run_expiry_schedule,
};
pub use self::identity::{Caller, GuestEmail, IdentityValidationError, Requester, UserId};
pub use self::payment::{
    ExternalProviderConfig, PaymentAttempt, PaymentAttemptId, PaymentAttemptStatus,
    PaymentGateway, PaymentIntent, PaymentProvider, ProviderPaymentId, ProviderPaymentSnapshot,
    ProviderPaymentStatus, order_name,
};
pub use self::payment_reconciliation_service::{
    PaymentReconciliationPorts, PaymentReconciliationService,
};
pub use self::reservation::{
    DisplayConversion, PartyComposition, PriceTotals, PublicToken, Reservation, ReservationId,
    ReservationRecord, ReservationStatus, StayDates, TransitionCheck, UnitId,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::webhook::{
    ProviderEvent, ReconciliationOutcome, WebhookDelivery, WebhookId, WebhookLedgerEntry,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use lodging_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;

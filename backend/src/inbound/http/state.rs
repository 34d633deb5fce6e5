//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::ports::{BookingCommand, PaymentReconciliation, PendingExpiry, ReservationQuery};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub bookings: Arc<dyn BookingCommand>,
    pub reservations: Arc<dyn ReservationQuery>,
    pub payments: Arc<dyn PaymentReconciliation>,
    pub expiry: Arc<dyn PendingExpiry>,
}

/// Shared secret guarding the cron trigger.
///
/// Only the SHA-256 digest of the secret is kept; presented values are hashed
/// and compared in constant time.
#[derive(Clone)]
pub struct CronSecret(Zeroizing<[u8; 32]>);

impl CronSecret {
    /// Returns `None` for a blank secret, which disables the cron endpoint.
    pub fn new(secret: &str) -> Option<Self> {
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(Zeroizing::new(digest(trimmed))))
    }

    /// Whether `presented` matches the configured secret.
    pub fn matches(&self, presented: &str) -> bool {
        constant_time_eq(self.0.as_slice(), &digest(presented.trim()))
    }
}

impl std::fmt::Debug for CronSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CronSecret(..)")
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub bookings: Arc<dyn BookingCommand>,
    pub reservations: Arc<dyn ReservationQuery>,
    pub payments: Arc<dyn PaymentReconciliation>,
    pub expiry: Arc<dyn PendingExpiry>,
    pub cron_secret: Option<CronSecret>,
    /// Age threshold used when the cron trigger omits `olderThanHours`.
    pub default_expiry_hours: u32,
}

impl HttpState {
    /// Construct state from a ports bundle with the cron trigger disabled.
    ///
    /// # Examples
    /// ```rust,ignore
    /// use chrono::Utc;
    /// use lodging_backend::inbound::http::state::{HttpState, HttpStatePorts};
    /// use lodging_backend::test_support::TestEngine;
    ///
    /// let engine = TestEngine::new(Utc::now());
    /// let state = HttpState::new(HttpStatePorts {
    ///     bookings: engine.booking.clone(),
    ///     reservations: engine.booking.clone(),
    ///     payments: engine.reconciliation.clone(),
    ///     expiry: engine.expiry.clone(),
    /// });
    /// assert!(state.cron_secret.is_none());
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            bookings,
            reservations,
            payments,
            expiry,
        } = ports;
        Self {
            bookings,
            reservations,
            payments,
            expiry,
            cron_secret: None,
            default_expiry_hours: crate::domain::DEFAULT_PENDING_EXPIRY_HOURS,
        }
    }

    #[must_use]
    pub fn with_cron_secret(mut self, secret: Option<CronSecret>) -> Self {
        self.cron_secret = secret;
        self
    }

    #[must_use]
    pub fn with_default_expiry_hours(mut self, hours: u32) -> Self {
        self.default_expiry_hours = hours;
        self
    }
}

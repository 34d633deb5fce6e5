//! Test utilities for the backend crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or with the
//! `test-support` feature.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::civil_time::CancellationPolicy;
use crate::domain::identity::{GuestEmail, Requester, UserId};
use crate::domain::payment::{
    NewPaymentAttempt, PaymentAttemptId, PaymentGateway, PaymentProvider, ProviderPaymentId,
};
use crate::domain::ports::{
    ConfirmationNotifier, ConfirmationNotifierError, NoOpBookingMetrics, UnitPricing,
};
use crate::domain::reservation::{
    DisplayConversion, NewReservation, PartyComposition, PriceTotals, PublicToken, Reservation,
    ReservationId, ReservationRecord, StayDates, UnitId,
};
use crate::domain::webhook::{WebhookDelivery, WebhookId};
use crate::domain::{
    BookingPolicy, BookingService, BookingServicePorts, ExpirySweeper,
    PaymentReconciliationPorts, PaymentReconciliationService,
};
use crate::outbound::memory::{InMemoryReservationStore, InMemoryUnitCatalogue, InMemoryWebhookLedger};
use crate::outbound::webhook::HmacWebhookVerifier;

/// Secret shared by [`TestEngine`] deliveries and its verifier.
pub const WEBHOOK_SECRET: &str = "whsec_dGVzdC13ZWJob29rLXNlY3JldA==";

/// Host of the units returned by [`sample_unit`].
pub const HOST_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// Clock whose time only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *self.lock_clock() += delta;
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Notifier that remembers which reservations it was asked about.
#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<ReservationId>>);

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<ReservationId> {
        match self.0.lock() {
            Ok(sent) => sent.clone(),
            Err(_) => panic!("notifier mutex"),
        }
    }
}

#[async_trait]
impl ConfirmationNotifier for RecordingNotifier {
    async fn send_confirmation(
        &self,
        reservation: &Reservation,
    ) -> Result<(), ConfirmationNotifierError> {
        match self.0.lock() {
            Ok(mut sent) => sent.push(reservation.id),
            Err(_) => panic!("notifier mutex"),
        }
        Ok(())
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid date {year}-{month}-{day}"),
    }
}

pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).single() {
        Some(instant) => instant,
        None => panic!("invalid instant {year}-{month}-{day}T{hour}"),
    }
}

fn unit_id(raw: &str) -> UnitId {
    match UnitId::new(raw) {
        Ok(unit) => unit,
        Err(error) => panic!("invalid unit id {raw}: {error}"),
    }
}

fn host_id() -> UserId {
    match UserId::new(HOST_ID) {
        Ok(host) => host,
        Err(error) => panic!("invalid host id: {error}"),
    }
}

/// Catalogue entry for `raw_unit` hosted by [`HOST_ID`].
pub fn sample_unit(raw_unit: &str, nightly_rate_krw: i64) -> UnitPricing {
    UnitPricing {
        unit_id: unit_id(raw_unit),
        title: format!("Stay {raw_unit}"),
        nightly_rate_krw,
        host_id: Some(host_id()),
    }
}

pub fn guest_email() -> GuestEmail {
    match GuestEmail::new("guest@example.com") {
        Ok(email) => email,
        Err(error) => panic!("invalid email: {error}"),
    }
}

/// Draft reservation for an anonymous guest, created 2025-05-01T00:00Z.
pub fn new_reservation(raw_unit: &str, check_in: NaiveDate, check_out: NaiveDate) -> NewReservation {
    let stay = match StayDates::new(check_in, check_out) {
        Ok(stay) => stay,
        Err(error) => panic!("invalid stay: {error}"),
    };
    let requester = match Requester::new(None, Some(guest_email())) {
        Ok(requester) => requester,
        Err(error) => panic!("invalid requester: {error}"),
    };
    let totals = match PriceTotals::compute(130_000, stay.nights(), DisplayConversion::default()) {
        Ok(totals) => totals,
        Err(error) => panic!("invalid totals: {error}"),
    };
    let cancellation_deadline = match CancellationPolicy::default().deadline_for(check_in) {
        Ok(deadline) => deadline,
        Err(error) => panic!("invalid deadline: {error}"),
    };
    let created_at = utc(2025, 5, 1, 0);
    let public_token = PublicToken::generate();
    NewReservation {
        id: ReservationId::random(),
        first_attempt: NewPaymentAttempt {
            id: PaymentAttemptId::random(),
            provider: PaymentProvider::Mock,
            provider_payment_id: ProviderPaymentId::for_attempt(&public_token, 0),
            created_at,
        },
        public_token,
        unit_id: unit_id(raw_unit),
        requester,
        stay,
        party: PartyComposition {
            adults: 2,
            ..PartyComposition::default()
        },
        totals,
        cancellation_deadline,
        created_at,
    }
}

/// Pending two-night reservation on `U1` with one open attempt.
pub fn pending_record() -> ReservationRecord {
    new_reservation("U1", date(2025, 6, 10), date(2025, 6, 12)).into_record()
}

/// Pending reservation with two open attempts: the original and `-r1`.
pub fn record_with_retry() -> ReservationRecord {
    let mut record = pending_record();
    let retry = NewPaymentAttempt {
        id: PaymentAttemptId::random(),
        provider: PaymentProvider::Mock,
        provider_payment_id: ProviderPaymentId::for_attempt(&record.reservation.public_token, 1),
        created_at: utc(2025, 5, 1, 1),
    }
    .into_attempt(record.reservation.id);
    record.attempts.push(retry);
    record
}

/// Booking engine wired to in-memory adapters.
pub struct TestEngine {
    pub clock: Arc<MutableClock>,
    pub store: Arc<InMemoryReservationStore>,
    pub ledger: Arc<InMemoryWebhookLedger>,
    pub notifier: Arc<RecordingNotifier>,
    pub verifier: Arc<HmacWebhookVerifier>,
    pub booking: Arc<BookingService>,
    pub reconciliation: Arc<PaymentReconciliationService>,
    pub expiry: Arc<ExpirySweeper>,
}

impl TestEngine {
    /// Engine in mock payment mode with units `U1` and `U2` at 130 000 KRW.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_gateway(now, PaymentGateway::Mock)
    }

    pub fn with_gateway(now: DateTime<Utc>, gateway: PaymentGateway) -> Self {
        let clock = Arc::new(MutableClock::new(now));
        let store = Arc::new(InMemoryReservationStore::new());
        let ledger = Arc::new(InMemoryWebhookLedger::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let catalogue = Arc::new(InMemoryUnitCatalogue::new([
            sample_unit("U1", 130_000),
            sample_unit("U2", 130_000),
        ]));
        let verifier = match HmacWebhookVerifier::new(WEBHOOK_SECRET, clock.clone()) {
            Ok(verifier) => Arc::new(verifier),
            Err(error) => panic!("webhook verifier: {error}"),
        };
        let metrics = Arc::new(NoOpBookingMetrics);
        let booking = Arc::new(BookingService::new(
            BookingServicePorts {
                reservations: store.clone(),
                catalogue,
                notifier: notifier.clone(),
                metrics: metrics.clone(),
            },
            clock.clone(),
            gateway.clone(),
            BookingPolicy::default(),
        ));
        let reconciliation = Arc::new(PaymentReconciliationService::new(
            PaymentReconciliationPorts {
                reservations: store.clone(),
                ledger: ledger.clone(),
                verifier: verifier.clone(),
                notifier: notifier.clone(),
                metrics: metrics.clone(),
            },
            clock.clone(),
            gateway,
        ));
        let expiry = Arc::new(ExpirySweeper::new(store.clone(), metrics, clock.clone()));
        Self {
            clock,
            store,
            ledger,
            notifier,
            verifier,
            booking,
            reconciliation,
            expiry,
        }
    }

    /// Signed provider delivery stamped with the engine's current time.
    pub fn signed_delivery(&self, webhook_id: &str, body: &str) -> WebhookDelivery {
        let timestamp = self.clock.utc().timestamp().to_string();
        let signature = match self.verifier.sign(webhook_id, &timestamp, body.as_bytes()) {
            Ok(signature) => signature,
            Err(error) => panic!("sign delivery: {error}"),
        };
        WebhookDelivery {
            id: match WebhookId::new(webhook_id) {
                Ok(id) => id,
                Err(error) => panic!("webhook id: {error}"),
            },
            timestamp,
            signature,
            body: body.as_bytes().to_vec(),
        }
    }
}

/// Provider event body for `payment_id` with the given status.
pub fn payment_event(payment_id: &str, status: &str) -> String {
    serde_json::json!({
        "type": format!("Transaction.{status}"),
        "data": { "paymentId": payment_id, "status": status },
    })
    .to_string()
}

/// Write a catalogue JSON file into a temporary location.
#[cfg(feature = "test-support")]
pub fn catalogue_file(json: &str) -> tempfile::NamedTempFile {
    use std::io::Write as _;

    let mut file = match tempfile::NamedTempFile::new() {
        Ok(file) => file,
        Err(error) => panic!("temp catalogue: {error}"),
    };
    if let Err(error) = file.write_all(json.as_bytes()) {
        panic!("write catalogue: {error}");
    }
    file
}

//! Tests for the booking orchestrator.

use std::sync::Arc;

use chrono::NaiveDate;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::identity::UserId;
use crate::domain::payment::PaymentIntent;
use crate::domain::ports::{
    MockReservationRepository, NoOpBookingMetrics, NoOpConfirmationNotifier,
    ReservationRepositoryError,
};
use crate::domain::ErrorCode;
use crate::outbound::memory::InMemoryUnitCatalogue;
use crate::test_support::{HOST_ID, MutableClock, TestEngine, date, guest_email, sample_unit, utc};

#[fixture]
fn engine() -> TestEngine {
    TestEngine::new(utc(2025, 5, 1, 0))
}

fn request(unit: &str, check_in: NaiveDate, check_out: NaiveDate) -> CreateReservationRequest {
    CreateReservationRequest {
        unit_id: UnitId::new(unit).expect("unit"),
        check_in,
        check_out,
        party: PartyCounts {
            adults: 2,
            ..PartyCounts::default()
        },
        caller: Caller::new(None, Some(guest_email())),
    }
}

fn host() -> Caller {
    Caller::new(Some(UserId::new(HOST_ID).expect("host")), None)
}

async fn book(engine: &TestEngine, unit: &str, check_in: NaiveDate, check_out: NaiveDate) -> PublicToken {
    engine
        .booking
        .create_reservation(request(unit, check_in, check_out))
        .await
        .expect("reservation")
        .reservation
        .public_token
}

#[rstest]
#[tokio::test]
async fn create_holds_nights_and_returns_mock_intent(engine: TestEngine) {
    let response = engine
        .booking
        .create_reservation(request("U1", date(2025, 6, 10), date(2025, 6, 12)))
        .await
        .expect("reservation");

    let view = &response.reservation;
    assert_eq!(view.status, ReservationStatus::PendingPayment);
    assert_eq!(view.totals.total_krw, 260_000);
    assert_eq!(view.totals.total_usd_cents, 20_000);
    assert_eq!(
        view.cancellation_deadline.to_rfc3339(),
        "2025-06-03T00:00:00+09:00"
    );
    assert_eq!(view.attempts.len(), 1);
    assert_eq!(
        response.payment_intent,
        Some(PaymentIntent::Mock {
            payment_id: view.attempts[0].payment_id.clone(),
            total_amount: 260_000,
            currency: "KRW",
        })
    );
    assert_eq!(view.attempts[0].payment_id.to_string(), view.public_token.to_string());
}

#[rstest]
#[tokio::test]
async fn overlapping_request_conflicts_but_back_to_back_fits(engine: TestEngine) {
    book(&engine, "U1", date(2025, 6, 1), date(2025, 6, 3)).await;

    let overlap = engine
        .booking
        .create_reservation(request("U1", date(2025, 6, 2), date(2025, 6, 4)))
        .await
        .expect_err("overlap");
    assert_eq!(overlap.code(), ErrorCode::Conflict);
    assert_eq!(overlap.message(), "selected dates are not available");

    book(&engine, "U1", date(2025, 6, 3), date(2025, 6, 5)).await;
    book(&engine, "U2", date(2025, 6, 2), date(2025, 6, 4)).await;
}

#[rstest]
#[case(date(2025, 6, 3), date(2025, 6, 3))]
#[case(date(2025, 6, 4), date(2025, 6, 3))]
#[tokio::test]
async fn rejects_empty_or_inverted_stays(
    engine: TestEngine,
    #[case] check_in: NaiveDate,
    #[case] check_out: NaiveDate,
) {
    let err = engine
        .booking
        .create_reservation(request("U1", check_in, check_out))
        .await
        .expect_err("invalid stay");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    let details = err.details().expect("details");
    assert_eq!(details["field"], "checkOut");
}

#[rstest]
#[tokio::test]
async fn rejects_negative_party_counts(engine: TestEngine) {
    let mut bad = request("U1", date(2025, 6, 1), date(2025, 6, 3));
    bad.party.children = -1;

    let err = engine
        .booking
        .create_reservation(bad)
        .await
        .expect_err("invalid party");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.details().expect("details")["field"], "children");
}

#[rstest]
#[tokio::test]
async fn anonymous_request_without_email_is_rejected(engine: TestEngine) {
    let mut bad = request("U1", date(2025, 6, 1), date(2025, 6, 3));
    bad.caller = Caller::anonymous();

    let err = engine
        .booking
        .create_reservation(bad)
        .await
        .expect_err("no identity");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.details().expect("details")["field"], "guestEmail");
}

#[rstest]
#[tokio::test]
async fn unknown_unit_is_not_found(engine: TestEngine) {
    let err = engine
        .booking
        .create_reservation(request("U404", date(2025, 6, 1), date(2025, 6, 3)))
        .await
        .expect_err("unknown unit");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn mock_confirmation_is_idempotent_and_notifies_once(engine: TestEngine) {
    let token = book(&engine, "U1", date(2025, 6, 10), date(2025, 6, 12)).await;

    let first = engine.booking.confirm_mock_payment(&token).await.expect("first");
    let second = engine.booking.confirm_mock_payment(&token).await.expect("second");

    assert_eq!(first.status, ReservationStatus::Confirmed);
    assert_eq!(first, second);
    assert_eq!(engine.notifier.sent().len(), 1);
    assert_eq!(
        first.attempts[0].status,
        crate::domain::payment::PaymentAttemptStatus::Paid
    );
}

#[rstest]
#[tokio::test]
async fn confirming_cancelled_reservation_conflicts(engine: TestEngine) {
    let token = book(&engine, "U1", date(2025, 6, 10), date(2025, 6, 12)).await;
    engine
        .booking
        .decline_reservation(&token, host())
        .await
        .expect("decline");

    let err = engine
        .booking
        .confirm_mock_payment(&token)
        .await
        .expect_err("cancelled");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn decline_requires_the_units_host(engine: TestEngine) {
    let token = book(&engine, "U1", date(2025, 6, 10), date(2025, 6, 12)).await;

    let anonymous = engine
        .booking
        .decline_reservation(&token, Caller::anonymous())
        .await
        .expect_err("anonymous");
    let stranger = engine
        .booking
        .decline_reservation(&token, Caller::new(Some(UserId::random()), None))
        .await
        .expect_err("stranger");
    let declined = engine
        .booking
        .decline_reservation(&token, host())
        .await
        .expect("host");
    let repeat = engine
        .booking
        .decline_reservation(&token, host())
        .await
        .expect_err("repeat");

    assert_eq!(anonymous.code(), ErrorCode::Unauthorized);
    assert_eq!(stranger.code(), ErrorCode::Forbidden);
    assert_eq!(declined.status, ReservationStatus::Cancelled);
    assert_eq!(repeat.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn guest_cancels_before_deadline(engine: TestEngine) {
    let token = book(&engine, "U1", date(2025, 6, 10), date(2025, 6, 12)).await;

    let view = engine
        .booking
        .cancel_reservation(&token, Caller::new(None, Some(guest_email())))
        .await
        .expect("cancel");

    assert_eq!(view.status, ReservationStatus::Cancelled);
    assert!(!engine
        .store
        .has_conflict(
            &UnitId::new("U1").expect("unit"),
            &StayDates::new(date(2025, 6, 10), date(2025, 6, 12)).expect("stay"),
            None,
        )
        .await
        .expect("conflict check"));
}

#[rstest]
#[tokio::test]
async fn guest_cancel_checks_ownership(engine: TestEngine) {
    let token = book(&engine, "U1", date(2025, 6, 10), date(2025, 6, 12)).await;
    let other = crate::domain::identity::GuestEmail::new("other@example.com").expect("email");

    let anonymous = engine
        .booking
        .cancel_reservation(&token, Caller::anonymous())
        .await
        .expect_err("anonymous");
    let wrong = engine
        .booking
        .cancel_reservation(&token, Caller::new(None, Some(other)))
        .await
        .expect_err("wrong email");

    assert_eq!(anonymous.code(), ErrorCode::Unauthorized);
    assert_eq!(wrong.code(), ErrorCode::Forbidden);
}

#[rstest]
#[tokio::test]
async fn guest_cancel_closes_at_deadline(engine: TestEngine) {
    let token = book(&engine, "U1", date(2025, 6, 10), date(2025, 6, 12)).await;
    engine.clock.set(utc(2025, 6, 2, 15));

    let err = engine
        .booking
        .cancel_reservation(&token, Caller::new(None, Some(guest_email())))
        .await
        .expect_err("past deadline");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn retry_opens_sequenced_attempt(engine: TestEngine) {
    let token = book(&engine, "U1", date(2025, 6, 10), date(2025, 6, 12)).await;

    let retry = engine
        .booking
        .open_payment_attempt(&token)
        .await
        .expect("retry");

    assert_eq!(retry.reservation.attempts.len(), 2);
    assert_eq!(
        retry.payment_intent.payment_id().to_string(),
        format!("{token}-r1")
    );
}

#[rstest]
#[tokio::test]
async fn retry_after_confirmation_conflicts(engine: TestEngine) {
    let token = book(&engine, "U1", date(2025, 6, 10), date(2025, 6, 12)).await;
    engine.booking.confirm_mock_payment(&token).await.expect("confirm");

    let err = engine
        .booking
        .open_payment_attempt(&token)
        .await
        .expect_err("confirmed");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn availability_reflects_active_reservations(engine: TestEngine) {
    book(&engine, "U1", date(2025, 6, 10), date(2025, 6, 12)).await;

    let busy = engine
        .booking
        .check_availability(AvailabilityRequest {
            unit_id: UnitId::new("U1").expect("unit"),
            check_in: date(2025, 6, 11),
            check_out: date(2025, 6, 13),
        })
        .await
        .expect("busy");
    let free = engine
        .booking
        .check_availability(AvailabilityRequest {
            unit_id: UnitId::new("U1").expect("unit"),
            check_in: date(2025, 6, 12),
            check_out: date(2025, 6, 15),
        })
        .await
        .expect("free");

    assert!(!busy.available);
    assert!(free.available);
    assert_eq!(free.nights, 3);
    assert_eq!(free.totals.total_krw, 390_000);
}

#[rstest]
#[tokio::test]
async fn unknown_token_is_not_found(engine: TestEngine) {
    let err = engine
        .booking
        .get_reservation(&PublicToken::generate())
        .await
        .expect_err("unknown");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn store_outage_surfaces_as_service_unavailable() {
    let mut reservations = MockReservationRepository::new();
    reservations
        .expect_create_pending()
        .times(1)
        .return_once(|_| Err(ReservationRepositoryError::connection("refused")));
    let service = BookingService::new(
        BookingServicePorts {
            reservations: Arc::new(reservations),
            catalogue: Arc::new(InMemoryUnitCatalogue::new([sample_unit("U1", 130_000)])),
            notifier: Arc::new(NoOpConfirmationNotifier),
            metrics: Arc::new(NoOpBookingMetrics),
        },
        Arc::new(MutableClock::new(utc(2025, 5, 1, 0))),
        PaymentGateway::Mock,
        BookingPolicy::default(),
    );

    let err = service
        .create_reservation(request("U1", date(2025, 6, 1), date(2025, 6, 3)))
        .await
        .expect_err("outage");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

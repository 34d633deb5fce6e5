//! HTTP adapter tests driving the real handlers over in-memory adapters.

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, test, web};
use rstest::rstest;
use serde_json::{Value, json};

use lodging_backend::Trace;
use lodging_backend::domain::{TRACE_ID_HEADER, UserId};
use lodging_backend::inbound::http::session::SessionContext;
use lodging_backend::inbound::http::state::{CronSecret, HttpState, HttpStatePorts};
use lodging_backend::inbound::http::{configure, json_config};
use lodging_backend::test_support::{HOST_ID, TestEngine, payment_event, utc};

const CRON_SECRET: &str = "cron-s3cret";

fn http_state(engine: &TestEngine) -> HttpState {
    HttpState::new(HttpStatePorts {
        bookings: engine.booking.clone(),
        reservations: engine.booking.clone(),
        payments: engine.reconciliation.clone(),
        expiry: engine.expiry.clone(),
    })
    .with_cron_secret(CronSecret::new(CRON_SECRET))
}

async fn sign_in(session: SessionContext, path: web::Path<String>) -> actix_web::Result<HttpResponse> {
    let user = UserId::new(path.into_inner()).map_err(actix_web::error::ErrorBadRequest)?;
    session.persist_user(&user)?;
    Ok(HttpResponse::NoContent().finish())
}

async fn app(
    engine: &TestEngine,
) -> impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error> {
    let session = SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build();
    test::init_service(
        App::new()
            .app_data(web::Data::new(http_state(engine)))
            .app_data(json_config())
            .wrap(Trace)
            .service(
                web::scope("/api/v1")
                    .wrap(session)
                    .configure(configure)
                    .route("/test-sign-in/{user_id}", web::post().to(sign_in)),
            ),
    )
    .await
}

async fn json_body(response: ServiceResponse) -> Value {
    let bytes = test::read_body(response).await;
    serde_json::from_slice(&bytes).expect("JSON body")
}

fn booking_payload(check_in: &str, check_out: &str) -> Value {
    json!({
        "unitId": "U1",
        "checkIn": check_in,
        "checkOut": check_out,
        "adults": 2,
        "guestEmail": "guest@example.com",
    })
}

async fn create(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    payload: Value,
) -> ServiceResponse {
    let request = test::TestRequest::post()
        .uri("/api/v1/reservations")
        .set_json(payload)
        .to_request();
    test::call_service(app, request).await
}

#[actix_web::test]
async fn booking_round_trip_uses_the_public_token() {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;

    let created = create(&app, booking_payload("2025-06-10", "2025-06-12")).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = json_body(created).await;
    let token = body["reservation"]["token"].as_str().expect("token").to_owned();
    assert_eq!(body["reservation"]["status"], "PENDING_PAYMENT");
    assert_eq!(body["reservation"]["totals"]["totalKrw"], 260_000);
    assert_eq!(body["reservation"]["cancellationDeadline"], "2025-06-03T00:00:00+09:00");
    assert_eq!(body["paymentIntent"]["provider"], "MOCK");
    assert_eq!(body["paymentIntent"]["paymentId"], token.as_str());

    let fetched = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/reservations/{token}"))
            .to_request(),
    )
    .await;
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(
        fetched.headers().get("cache-control").and_then(|v| v.to_str().ok()),
        Some("no-store")
    );
    let view = json_body(fetched).await;
    assert_eq!(view["paymentAttempts"][0]["status"], "INITIATED");
    assert!(view.get("id").is_none());
}

#[actix_web::test]
async fn overlapping_booking_is_a_conflict_with_trace_id() {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;
    create(&app, booking_payload("2025-06-01", "2025-06-03")).await;

    let response = create(&app, booking_payload("2025-06-02", "2025-06-04")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .expect("trace id header");
    let body = json_body(response).await;
    assert_eq!(body["code"], "conflict");
    assert_eq!(body["traceId"], header.as_str());
}

#[rstest]
#[case::missing_unit(json!({ "checkIn": "2025-06-10", "checkOut": "2025-06-12", "guestEmail": "g@example.com" }), "unitId")]
#[case::bad_date(json!({ "unitId": "U1", "checkIn": "10 June", "checkOut": "2025-06-12", "guestEmail": "g@example.com" }), "checkIn")]
#[actix_web::test]
async fn invalid_payloads_name_the_field(#[case] payload: Value, #[case] field: &str) {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;

    let response = create(&app, payload).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["field"], field);
}

#[actix_web::test]
async fn malformed_json_is_an_invalid_request() {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/reservations")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "invalid_request");
}

#[actix_web::test]
async fn signed_webhook_confirms_and_replay_is_acknowledged() {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;
    let created = json_body(create(&app, booking_payload("2025-06-10", "2025-06-12")).await).await;
    let token = created["reservation"]["token"].as_str().expect("token").to_owned();
    let body = payment_event(&token, "PAID");
    let delivery = engine.signed_delivery("wh_http_1", &body);

    let send = || {
        test::TestRequest::post()
            .uri("/api/v1/webhooks/payments")
            .insert_header(("webhook-id", delivery.id.to_string()))
            .insert_header(("webhook-timestamp", delivery.timestamp.clone()))
            .insert_header(("webhook-signature", delivery.signature.clone()))
            .insert_header(("content-type", "application/json"))
            .set_payload(body.clone())
            .to_request()
    };

    let first = json_body(test::call_service(&app, send()).await).await;
    let replay = json_body(test::call_service(&app, send()).await).await;

    assert_eq!(first, json!({ "outcome": "CONFIRMED" }));
    assert_eq!(replay, json!({ "outcome": "ALREADY_PROCESSED" }));
    assert_eq!(engine.notifier.sent().len(), 1);
}

#[actix_web::test]
async fn unsigned_webhook_is_unauthorised() {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/webhooks/payments")
            .insert_header(("webhook-id", "wh_forged"))
            .insert_header(("webhook-timestamp", utc(2025, 5, 1, 0).timestamp().to_string()))
            .insert_header(("webhook-signature", "v1,AAAA"))
            .set_payload(payment_event("anything", "PAID"))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(engine.ledger.is_empty());
}

#[actix_web::test]
async fn host_declines_through_the_session() {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;
    let created = json_body(create(&app, booking_payload("2025-06-10", "2025-06-12")).await).await;
    let token = created["reservation"]["token"].as_str().expect("token").to_owned();
    let decline_uri = format!("/api/v1/reservations/{token}/decline");

    let anonymous = test::call_service(
        &app,
        test::TestRequest::post().uri(&decline_uri).to_request(),
    )
    .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let signed_in = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/test-sign-in/{HOST_ID}"))
            .to_request(),
    )
    .await;
    let cookie: Cookie<'static> = signed_in
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned();

    let declined = test::call_service(
        &app,
        test::TestRequest::post().uri(&decline_uri).cookie(cookie).to_request(),
    )
    .await;
    assert_eq!(declined.status(), StatusCode::OK);
    assert_eq!(json_body(declined).await["status"], "CANCELLED");
}

#[actix_web::test]
async fn guest_cancels_with_matching_email() {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;
    let created = json_body(create(&app, booking_payload("2025-06-10", "2025-06-12")).await).await;
    let token = created["reservation"]["token"].as_str().expect("token").to_owned();
    let cancel = |email: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/v1/reservations/{token}/cancel"))
            .set_json(json!({ "guestEmail": email }))
            .to_request()
    };

    let stranger = test::call_service(&app, cancel("other@example.com")).await;
    let owner = test::call_service(&app, cancel("GUEST@example.com")).await;

    assert_eq!(stranger.status(), StatusCode::FORBIDDEN);
    assert_eq!(owner.status(), StatusCode::OK);
    assert_eq!(json_body(owner).await["status"], "CANCELLED");
}

#[actix_web::test]
async fn availability_tracks_held_nights() {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;
    let probe = |check_in: &str, check_out: &str| {
        test::TestRequest::get()
            .uri(&format!(
                "/api/v1/units/U1/availability?checkIn={check_in}&checkOut={check_out}"
            ))
            .to_request()
    };
    create(&app, booking_payload("2025-06-10", "2025-06-12")).await;

    let held = json_body(test::call_service(&app, probe("2025-06-11", "2025-06-13")).await).await;
    let free = json_body(test::call_service(&app, probe("2025-06-12", "2025-06-14")).await).await;

    assert_eq!(held["available"], false);
    assert_eq!(free["available"], true);
    assert_eq!(free["nights"], 2);
    assert_eq!(free["totals"]["totalKrw"], 260_000);
}

#[rstest]
#[case::no_secret(None, StatusCode::UNAUTHORIZED)]
#[case::wrong_secret(Some("guess"), StatusCode::UNAUTHORIZED)]
#[case::right_secret(Some(CRON_SECRET), StatusCode::OK)]
#[actix_web::test]
async fn cron_trigger_requires_the_shared_secret(
    #[case] secret: Option<&str>,
    #[case] expected: StatusCode,
) {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;
    create(&app, booking_payload("2025-06-10", "2025-06-12")).await;
    engine.clock.advance_seconds(25 * 60 * 60);

    let mut request = test::TestRequest::post().uri("/api/v1/admin/expire-pending");
    if let Some(secret) = secret {
        request = request.insert_header(("x-cron-secret", secret));
    }
    let response = test::call_service(&app, request.to_request()).await;

    assert_eq!(response.status(), expected);
    if expected == StatusCode::OK {
        assert_eq!(
            json_body(response).await,
            json!({ "expired": 1, "olderThanHours": 24 })
        );
    }
}

#[actix_web::test]
async fn cron_threshold_beyond_the_calendar_is_a_bad_request() {
    let engine = TestEngine::new(utc(2025, 5, 1, 0));
    let app = app(&engine).await;

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/admin/expire-pending?olderThanHours=4294967295")
            .insert_header(("x-cron-secret", CRON_SECRET))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "invalid_request");
    assert_eq!(body["details"]["field"], "olderThanHours");
}

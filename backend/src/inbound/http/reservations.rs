//! Reservation HTTP handlers.
//!
//! ```text
//! POST /api/v1/reservations
//! GET  /api/v1/reservations/{token}
//! POST /api/v1/reservations/{token}/payment-attempts
//! POST /api/v1/reservations/{token}/mock-confirm
//! POST /api/v1/reservations/{token}/decline
//! POST /api/v1/reservations/{token}/cancel
//! ```
//!
//! Reservations are addressed only by their public token.

use actix_web::{HttpResponse, get, post, web};

use crate::domain::{Caller, Error, UserId};
use crate::domain::ports::{CreateReservationRequest, PartyCounts};
use crate::inbound::http::ApiResult;
use crate::inbound::http::reservations_dto::{
    CancelReservationBody, CreateReservationBody, ReservationResponse,
    ReservationWithIntentResponse,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_date, parse_optional_email, parse_token, parse_unit_id, require,
};

const UNIT_ID: FieldName = FieldName::new("unitId");
const CHECK_IN: FieldName = FieldName::new("checkIn");
const CHECK_OUT: FieldName = FieldName::new("checkOut");
const GUEST_EMAIL: FieldName = FieldName::new("guestEmail");

fn parse_create_request(
    body: CreateReservationBody,
    user_id: Option<UserId>,
) -> Result<CreateReservationRequest, Error> {
    let unit_id = parse_unit_id(&require(body.unit_id, UNIT_ID)?, UNIT_ID)?;
    let check_in = parse_date(&require(body.check_in, CHECK_IN)?, CHECK_IN)?;
    let check_out = parse_date(&require(body.check_out, CHECK_OUT)?, CHECK_OUT)?;
    let guest_email = parse_optional_email(body.guest_email, GUEST_EMAIL)?;
    Ok(CreateReservationRequest {
        unit_id,
        check_in,
        check_out,
        party: PartyCounts {
            adults: body.adults.unwrap_or(0),
            children: body.children.unwrap_or(0),
            infants: body.infants.unwrap_or(0),
            pets: body.pets.unwrap_or(0),
        },
        caller: Caller::new(user_id, guest_email),
    })
}

/// Hold the requested nights and return the first payment intent.
#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    request_body = CreateReservationBody,
    responses(
        (status = 201, description = "Reservation held pending payment", body = ReservationWithIntentResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Unknown unit", body = Error),
        (status = 409, description = "Selected dates are not available", body = Error),
        (status = 503, description = "Reservation store unavailable", body = Error)
    ),
    tags = ["reservations"],
    operation_id = "createReservation"
)]
#[post("/reservations")]
pub async fn create_reservation(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateReservationBody>,
) -> ApiResult<HttpResponse> {
    let request = parse_create_request(payload.into_inner(), session.user_id()?)?;
    let created = state.bookings.create_reservation(request).await?;
    Ok(HttpResponse::Created().json(ReservationWithIntentResponse {
        reservation: created.reservation.into(),
        payment_intent: created.payment_intent.map(Into::into),
    }))
}

/// Look up a reservation by its public token.
#[utoipa::path(
    get,
    path = "/api/v1/reservations/{token}",
    params(("token" = String, Path, description = "Public reservation token")),
    responses(
        (status = 200, description = "Reservation", body = ReservationResponse),
        (status = 400, description = "Malformed token", body = Error),
        (status = 404, description = "Unknown reservation", body = Error)
    ),
    tags = ["reservations"],
    operation_id = "getReservation"
)]
#[get("/reservations/{token}")]
pub async fn get_reservation(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let token = parse_token(&path.into_inner())?;
    let view = state.reservations.get_reservation(&token).await?;
    Ok(HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-store"))
        .json(ReservationResponse::from(view)))
}

/// Open a new payment attempt for a reservation still awaiting payment.
#[utoipa::path(
    post,
    path = "/api/v1/reservations/{token}/payment-attempts",
    params(("token" = String, Path, description = "Public reservation token")),
    responses(
        (status = 201, description = "New attempt opened", body = ReservationWithIntentResponse),
        (status = 404, description = "Unknown reservation", body = Error),
        (status = 409, description = "Reservation is no longer pending", body = Error)
    ),
    tags = ["reservations"],
    operation_id = "openPaymentAttempt"
)]
#[post("/reservations/{token}/payment-attempts")]
pub async fn open_payment_attempt(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let token = parse_token(&path.into_inner())?;
    let opened = state.bookings.open_payment_attempt(&token).await?;
    Ok(HttpResponse::Created().json(ReservationWithIntentResponse {
        reservation: opened.reservation.into(),
        payment_intent: Some(opened.payment_intent.into()),
    }))
}

/// Confirm a reservation without a provider; only available in mock mode.
#[utoipa::path(
    post,
    path = "/api/v1/reservations/{token}/mock-confirm",
    params(("token" = String, Path, description = "Public reservation token")),
    responses(
        (status = 200, description = "Reservation confirmed", body = ReservationResponse),
        (status = 403, description = "An external provider is active", body = Error),
        (status = 404, description = "Unknown reservation", body = Error),
        (status = 409, description = "Reservation was cancelled", body = Error)
    ),
    tags = ["reservations"],
    operation_id = "confirmMockPayment"
)]
#[post("/reservations/{token}/mock-confirm")]
pub async fn confirm_mock_payment(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<ReservationResponse>> {
    let token = parse_token(&path.into_inner())?;
    let view = state.bookings.confirm_mock_payment(&token).await?;
    Ok(web::Json(view.into()))
}

/// Host declines a reservation still awaiting payment.
#[utoipa::path(
    post,
    path = "/api/v1/reservations/{token}/decline",
    params(("token" = String, Path, description = "Public reservation token")),
    responses(
        (status = 200, description = "Reservation declined", body = ReservationResponse),
        (status = 401, description = "Login required", body = Error),
        (status = 403, description = "Caller does not host this unit", body = Error),
        (status = 409, description = "Reservation is no longer pending", body = Error)
    ),
    tags = ["reservations"],
    operation_id = "declineReservation"
)]
#[post("/reservations/{token}/decline")]
pub async fn decline_reservation(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ReservationResponse>> {
    let token = parse_token(&path.into_inner())?;
    let caller = session.caller(None)?;
    let view = state.bookings.decline_reservation(&token, caller).await?;
    Ok(web::Json(view.into()))
}

/// Guest cancels before the free-cancellation deadline.
#[utoipa::path(
    post,
    path = "/api/v1/reservations/{token}/cancel",
    params(("token" = String, Path, description = "Public reservation token")),
    request_body(content = Option<CancelReservationBody>, description = "Guest e-mail for anonymous bookings"),
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationResponse),
        (status = 401, description = "Caller could not be identified", body = Error),
        (status = 403, description = "Caller did not make this booking", body = Error),
        (status = 409, description = "Not pending or past the deadline", body = Error)
    ),
    tags = ["reservations"],
    operation_id = "cancelReservation"
)]
#[post("/reservations/{token}/cancel")]
pub async fn cancel_reservation(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: Option<web::Json<CancelReservationBody>>,
) -> ApiResult<web::Json<ReservationResponse>> {
    let token = parse_token(&path.into_inner())?;
    let body = payload.map(web::Json::into_inner).unwrap_or_default();
    let guest_email = parse_optional_email(body.guest_email, GUEST_EMAIL)?;
    let caller = session.caller(guest_email)?;
    let view = state.bookings.cancel_reservation(&token, caller).await?;
    Ok(web::Json(view.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    fn body() -> CreateReservationBody {
        CreateReservationBody {
            unit_id: Some("U1".to_owned()),
            check_in: Some("2025-06-10".to_owned()),
            check_out: Some("2025-06-12".to_owned()),
            adults: Some(2),
            guest_email: Some("Guest@Example.com".to_owned()),
            ..CreateReservationBody::default()
        }
    }

    #[rstest]
    fn parses_complete_payload() {
        let request = parse_create_request(body(), None).expect("valid payload");

        assert_eq!(request.unit_id.as_ref(), "U1");
        assert_eq!(request.check_in.to_string(), "2025-06-10");
        assert_eq!(request.party.adults, 2);
        assert_eq!(request.party.pets, 0);
        assert_eq!(
            request.caller.email().map(ToString::to_string).as_deref(),
            Some("guest@example.com")
        );
    }

    #[rstest]
    fn session_user_is_carried_alongside_email() {
        let user = UserId::random();

        let request = parse_create_request(
            CreateReservationBody {
                guest_email: None,
                ..body()
            },
            Some(user.clone()),
        )
        .expect("valid payload");

        assert_eq!(request.caller.user_id(), Some(&user));
        assert!(request.caller.email().is_none());
    }

    #[rstest]
    #[case::unit(CreateReservationBody { unit_id: None, ..body() }, "unitId")]
    #[case::check_in(CreateReservationBody { check_in: None, ..body() }, "checkIn")]
    #[case::bad_check_out(CreateReservationBody { check_out: Some("soon".to_owned()), ..body() }, "checkOut")]
    #[case::bad_email(CreateReservationBody { guest_email: Some("nobody".to_owned()), ..body() }, "guestEmail")]
    fn rejects_incomplete_payloads(#[case] payload: CreateReservationBody, #[case] field: &str) {
        let err = parse_create_request(payload, None).expect_err("invalid payload");

        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.details().expect("details")["field"], field);
    }
}

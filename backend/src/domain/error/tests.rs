//! Construction, trace capture and wire shape of domain errors.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "8c1f4e2a-7d3b-4a96-b0e5-5f2c9d1a7e34";

#[fixture]
fn overlap() -> Error {
    Error::conflict("selected dates are not available")
}

#[rstest]
#[case(Error::invalid_request("checkOut must follow checkIn"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("webhook signature verification failed"), ErrorCode::Unauthorized)]
#[case(Error::forbidden("mock confirmation is disabled"), ErrorCode::Forbidden)]
#[case(Error::not_found("unit not found"), ErrorCode::NotFound)]
#[case(Error::conflict("reservation is no longer pending"), ErrorCode::Conflict)]
#[case(Error::service_unavailable("reservation store unavailable"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("row failed to map"), ErrorCode::InternalError)]
fn constructors_set_code(#[case] err: Error, #[case] expected: ErrorCode) {
    assert_eq!(err.code(), expected);
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
fn blank_messages_are_rejected(#[case] message: &str) {
    assert_eq!(
        Error::try_new(ErrorCode::Conflict, message),
        Err(ErrorValidationError::EmptyMessage)
    );
}

#[rstest]
fn errors_built_outside_a_request_have_no_trace_id(overlap: Error) {
    assert!(overlap.trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn errors_built_inside_a_request_capture_its_trace_id() {
    let trace_id: TraceId = TRACE_ID.parse().expect("uuid");

    let error = TraceId::scope(trace_id, async { Error::not_found("reservation not found") }).await;

    assert_eq!(error.trace_id(), Some(TRACE_ID));
}

#[rstest]
fn wire_shape_uses_camel_case_fields_and_snake_case_codes() {
    let error = Error::invalid_request("checkIn must be an ISO date")
        .with_trace_id(TRACE_ID)
        .with_details(json!({ "field": "checkIn" }));

    assert_eq!(
        serde_json::to_value(&error).expect("serialise"),
        json!({
            "code": "invalid_request",
            "message": "checkIn must be an ISO date",
            "traceId": TRACE_ID,
            "details": { "field": "checkIn" },
        })
    );
}

#[rstest]
fn optional_fields_are_omitted(overlap: Error) {
    let value = serde_json::to_value(&overlap).expect("serialise");

    assert!(value.get("traceId").is_none());
    assert!(value.get("details").is_none());
    assert_eq!(overlap.to_string(), "selected dates are not available");
}

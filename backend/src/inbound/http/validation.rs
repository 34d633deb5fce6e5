//! Shared validation helpers for inbound HTTP adapters.
//!
//! Request bodies arrive as loosely typed DTOs. These helpers turn raw strings
//! into domain values and report failures as `invalid_request` errors whose
//! details name the offending field.

use chrono::NaiveDate;
use serde_json::json;

use crate::domain::Error;
use crate::domain::identity::GuestEmail;
use crate::domain::payment::ProviderPaymentId;
use crate::domain::reservation::{PublicToken, UnitId};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidDate,
    InvalidIdentifier,
    InvalidEmail,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidDate => "invalid_date",
            ErrorCode::InvalidIdentifier => "invalid_identifier",
            ErrorCode::InvalidEmail => "invalid_email",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ErrorCode, value: Option<&str>) -> Error {
    let details = match value {
        Some(value) => json!({ "field": field.as_str(), "value": value, "code": code.as_str() }),
        None => json!({ "field": field.as_str(), "code": code.as_str() }),
    };
    Error::invalid_request(message).with_details(details)
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(
        field,
        format!("missing required field: {name}"),
        ErrorCode::MissingField,
        None,
    )
}

pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`).
pub(crate) fn parse_date(value: &str, field: FieldName) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        let name = field.as_str();
        field_error(
            field,
            format!("{name} must be a YYYY-MM-DD date"),
            ErrorCode::InvalidDate,
            Some(value),
        )
    })
}

fn invalid_identifier(field: FieldName, value: &str, reason: impl std::fmt::Display) -> Error {
    let name = field.as_str();
    field_error(
        field,
        format!("{name} is invalid: {reason}"),
        ErrorCode::InvalidIdentifier,
        Some(value),
    )
}

pub(crate) fn parse_unit_id(value: &str, field: FieldName) -> Result<UnitId, Error> {
    UnitId::new(value).map_err(|error| invalid_identifier(field, value, error))
}

/// Parse a public reservation token from a path segment.
///
/// Unknown but well-formed tokens are left for the service to report as
/// `not_found`.
pub(crate) fn parse_token(value: &str) -> Result<PublicToken, Error> {
    PublicToken::parse(value)
        .map_err(|error| invalid_identifier(FieldName::new("token"), value, error))
}

pub(crate) fn parse_payment_id(value: &str) -> Result<ProviderPaymentId, Error> {
    ProviderPaymentId::new(value)
        .map_err(|error| invalid_identifier(FieldName::new("paymentId"), value, error))
}

pub(crate) fn parse_optional_email(
    value: Option<String>,
    field: FieldName,
) -> Result<Option<GuestEmail>, Error> {
    value
        .map(|raw| {
            GuestEmail::new(&raw).map_err(|error| {
                let name = field.as_str();
                field_error(
                    field,
                    format!("{name} is invalid: {error}"),
                    ErrorCode::InvalidEmail,
                    Some(&raw),
                )
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode as DomainCode;
    use rstest::rstest;

    #[rstest]
    #[case("2025-06-10", Some(NaiveDate::from_ymd_opt(2025, 6, 10)))]
    #[case(" 2025-06-10 ", Some(NaiveDate::from_ymd_opt(2025, 6, 10)))]
    #[case("10/06/2025", None)]
    #[case("2025-02-30", None)]
    fn parses_calendar_dates(#[case] raw: &str, #[case] expected: Option<Option<NaiveDate>>) {
        let parsed = parse_date(raw, FieldName::new("checkIn")).ok();
        assert_eq!(parsed, expected.flatten());
    }

    #[rstest]
    fn bad_dates_name_the_field() {
        let err = parse_date("tomorrow", FieldName::new("checkOut")).expect_err("bad date");

        assert_eq!(err.code(), DomainCode::InvalidRequest);
        let details = err.details().expect("details");
        assert_eq!(details["field"], "checkOut");
        assert_eq!(details["code"], "invalid_date");
        assert_eq!(details["value"], "tomorrow");
    }

    #[rstest]
    fn missing_fields_are_reported() {
        let err = require::<String>(None, FieldName::new("unitId")).expect_err("missing");

        assert_eq!(err.message(), "missing required field: unitId");
        assert_eq!(err.details().expect("details")["code"], "missing_field");
    }

    #[rstest]
    fn malformed_emails_are_rejected() {
        let err = parse_optional_email(Some("not-an-email".to_owned()), FieldName::new("guestEmail"))
            .expect_err("bad email");

        assert_eq!(err.details().expect("details")["field"], "guestEmail");
        assert!(
            parse_optional_email(None, FieldName::new("guestEmail"))
                .expect("absent email")
                .is_none()
        );
    }
}

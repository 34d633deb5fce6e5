//! Unit availability HTTP handler.
//!
//! ```text
//! GET /api/v1/units/{unitId}/availability?checkIn=YYYY-MM-DD&checkOut=YYYY-MM-DD
//! ```
//!
//! The answer is advisory: nothing is held until a reservation is created.

use actix_web::{HttpResponse, get, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Error;
use crate::domain::ports::{AvailabilityQuote, AvailabilityRequest};
use crate::domain::reservation::PriceTotals;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_date, parse_unit_id, require};

const CHECK_IN: FieldName = FieldName::new("checkIn");
const CHECK_OUT: FieldName = FieldName::new("checkOut");

/// Query parameters for the availability probe.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AvailabilityParams {
    /// First night, `YYYY-MM-DD`.
    pub check_in: Option<String>,
    /// Departure day, `YYYY-MM-DD`; exclusive.
    pub check_out: Option<String>,
}

/// Availability and price for a prospective stay.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub unit_id: String,
    pub check_in: String,
    pub check_out: String,
    pub available: bool,
    pub nights: u32,
    pub totals: PriceTotals,
}

impl From<AvailabilityQuote> for AvailabilityResponse {
    fn from(value: AvailabilityQuote) -> Self {
        Self {
            unit_id: value.unit_id.to_string(),
            check_in: value.stay.check_in().to_string(),
            check_out: value.stay.check_out().to_string(),
            available: value.available,
            nights: value.nights,
            totals: value.totals,
        }
    }
}

fn parse_availability(unit_id: &str, params: AvailabilityParams) -> Result<AvailabilityRequest, Error> {
    Ok(AvailabilityRequest {
        unit_id: parse_unit_id(unit_id, FieldName::new("unitId"))?,
        check_in: parse_date(&require(params.check_in, CHECK_IN)?, CHECK_IN)?,
        check_out: parse_date(&require(params.check_out, CHECK_OUT)?, CHECK_OUT)?,
    })
}

/// Report whether a unit is free for the requested nights.
#[utoipa::path(
    get,
    path = "/api/v1/units/{unitId}/availability",
    params(
        ("unitId" = String, Path, description = "Catalogue unit identifier"),
        AvailabilityParams
    ),
    responses(
        (status = 200, description = "Availability quote", body = AvailabilityResponse),
        (status = 400, description = "Invalid dates", body = Error),
        (status = 404, description = "Unknown unit", body = Error)
    ),
    tags = ["units"],
    operation_id = "checkAvailability"
)]
#[get("/units/{unit_id}/availability")]
pub async fn check_availability(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    query: web::Query<AvailabilityParams>,
) -> ApiResult<HttpResponse> {
    let request = parse_availability(&path.into_inner(), query.into_inner())?;
    let quote = state.reservations.check_availability(request).await?;
    Ok(HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-store"))
        .json(AvailabilityResponse::from(quote)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn missing_check_out_is_reported() {
        let err = parse_availability(
            "U1",
            AvailabilityParams {
                check_in: Some("2025-06-10".to_owned()),
                check_out: None,
            },
        )
        .expect_err("missing checkOut");

        assert_eq!(err.details().expect("details")["field"], "checkOut");
    }

    #[rstest]
    fn parses_path_and_query() {
        let request = parse_availability(
            "U1",
            AvailabilityParams {
                check_in: Some("2025-06-10".to_owned()),
                check_out: Some("2025-06-12".to_owned()),
            },
        )
        .expect("valid query");

        assert_eq!(request.unit_id.as_ref(), "U1");
        assert_eq!(request.check_out.to_string(), "2025-06-12");
    }
}

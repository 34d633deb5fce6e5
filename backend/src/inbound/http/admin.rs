//! Operator-only HTTP handlers.
//!
//! ```text
//! POST /api/v1/admin/expire-pending?olderThanHours=24
//! ```
//!
//! Intended for an external scheduler. Callers present the shared secret in
//! `x-cron-secret`; without a configured secret the endpoint is disabled.

use actix_web::{HttpRequest, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

pub(crate) const CRON_SECRET_HEADER: &str = "x-cron-secret";

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ExpireParams {
    /// Age threshold in hours; defaults to the configured sweep threshold.
    pub older_than_hours: Option<u32>,
}

/// Summary of one sweep.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpireResponse {
    pub expired: u64,
    pub older_than_hours: u32,
}

fn authorise(state: &HttpState, request: &HttpRequest) -> Result<(), Error> {
    let Some(secret) = state.cron_secret.as_ref() else {
        return Err(Error::forbidden("cron trigger is disabled"));
    };
    let presented = request
        .headers()
        .get(CRON_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::unauthorized("missing cron secret"))?;
    if secret.matches(presented) {
        Ok(())
    } else {
        Err(Error::unauthorized("invalid cron secret"))
    }
}

/// Cancel stale `PENDING_PAYMENT` reservations.
#[utoipa::path(
    post,
    path = "/api/v1/admin/expire-pending",
    params(
        ExpireParams,
        ("x-cron-secret" = String, Header, description = "Shared cron secret")
    ),
    responses(
        (status = 200, description = "Sweep finished", body = ExpireResponse),
        (status = 400, description = "Threshold out of range", body = Error),
        (status = 401, description = "Secret missing or wrong", body = Error),
        (status = 403, description = "Cron trigger disabled", body = Error),
        (status = 503, description = "Reservation store unavailable", body = Error)
    ),
    tags = ["admin"],
    operation_id = "expirePending"
)]
#[post("/admin/expire-pending")]
pub async fn expire_pending(
    state: web::Data<HttpState>,
    request: HttpRequest,
    query: web::Query<ExpireParams>,
) -> ApiResult<web::Json<ExpireResponse>> {
    authorise(&state, &request)?;
    let older_than_hours = query
        .into_inner()
        .older_than_hours
        .unwrap_or(state.default_expiry_hours);
    let expired = state.expiry.expire_stale_pending(older_than_hours).await?;
    info!(expired, older_than_hours, "cron sweep triggered");
    Ok(web::Json(ExpireResponse {
        expired,
        older_than_hours,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::ports::{
        MockBookingCommand, MockPaymentReconciliation, MockPendingExpiry, MockReservationQuery,
    };
    use crate::inbound::http::state::{CronSecret, HttpStatePorts};
    use actix_web::{App, http::StatusCode, test as actix_test};
    use mockall::predicate::eq;
    use rstest::rstest;

    fn state(expiry: MockPendingExpiry, secret: Option<&str>) -> HttpState {
        HttpState::new(HttpStatePorts {
            bookings: Arc::new(MockBookingCommand::new()),
            reservations: Arc::new(MockReservationQuery::new()),
            payments: Arc::new(MockPaymentReconciliation::new()),
            expiry: Arc::new(expiry),
        })
        .with_cron_secret(secret.and_then(CronSecret::new))
        .with_default_expiry_hours(12)
    }

    async fn call(state: HttpState, uri: &str, secret: Option<&str>) -> (StatusCode, serde_json::Value) {
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(expire_pending),
        )
        .await;
        let mut request = actix_test::TestRequest::post().uri(uri);
        if let Some(secret) = secret {
            request = request.insert_header((CRON_SECRET_HEADER, secret));
        }
        let response = actix_test::call_service(&app, request.to_request()).await;
        let status = response.status();
        let body = actix_test::read_body(response).await;
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    #[actix_web::test]
    async fn uses_configured_default_threshold() {
        let mut expiry = MockPendingExpiry::new();
        expiry
            .expect_expire_stale_pending()
            .with(eq(12_u32))
            .times(1)
            .return_once(|_| Ok(2));

        let (status, body) = call(state(expiry, Some("s3cret")), "/admin/expire-pending", Some("s3cret")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "expired": 2, "olderThanHours": 12 }));
    }

    #[actix_web::test]
    async fn honours_explicit_threshold() {
        let mut expiry = MockPendingExpiry::new();
        expiry
            .expect_expire_stale_pending()
            .with(eq(0_u32))
            .times(1)
            .return_once(|_| Ok(0));

        let (status, body) = call(
            state(expiry, Some("s3cret")),
            "/admin/expire-pending?olderThanHours=0",
            Some("s3cret"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["olderThanHours"], 0);
    }

    #[rstest]
    #[case::disabled(None, Some("anything"), StatusCode::FORBIDDEN)]
    #[case::missing(Some("s3cret"), None, StatusCode::UNAUTHORIZED)]
    #[case::wrong(Some("s3cret"), Some("guess"), StatusCode::UNAUTHORIZED)]
    #[actix_web::test]
    async fn rejects_unauthorised_callers(
        #[case] configured: Option<&str>,
        #[case] presented: Option<&str>,
        #[case] expected: StatusCode,
    ) {
        let mut expiry = MockPendingExpiry::new();
        expiry.expect_expire_stale_pending().never();

        let (status, _) = call(state(expiry, configured), "/admin/expire-pending", presented).await;

        assert_eq!(status, expected);
    }
}

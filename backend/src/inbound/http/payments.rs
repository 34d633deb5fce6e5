//! Payment provider HTTP handlers.
//!
//! ```text
//! POST /api/v1/webhooks/payments
//! POST /api/v1/payments/{paymentId}/complete
//! ```
//!
//! The webhook handler reads the raw body so the signature can be checked
//! over the exact bytes the provider signed.

use actix_web::http::header::HeaderMap;
use actix_web::{HttpRequest, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, ReconciliationOutcome, WebhookDelivery, WebhookId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::reservations_dto::ReservationResponse;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_payment_id;

pub(crate) const WEBHOOK_ID_HEADER: &str = "webhook-id";
pub(crate) const WEBHOOK_TIMESTAMP_HEADER: &str = "webhook-timestamp";
pub(crate) const WEBHOOK_SIGNATURE_HEADER: &str = "webhook-signature";

/// Acknowledgement returned to the provider.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub outcome: ReconciliationOutcome,
}

/// Result of a client-initiated reconciliation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompletionResponse {
    pub outcome: ReconciliationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<ReservationResponse>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, Error> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::unauthorized(format!("missing {name} header")))
}

fn delivery_from(headers: &HeaderMap, body: &[u8]) -> Result<WebhookDelivery, Error> {
    let id = WebhookId::new(header(headers, WEBHOOK_ID_HEADER)?)
        .map_err(|error| Error::unauthorized(format!("invalid {WEBHOOK_ID_HEADER}: {error}")))?;
    Ok(WebhookDelivery {
        id,
        timestamp: header(headers, WEBHOOK_TIMESTAMP_HEADER)?.to_owned(),
        signature: header(headers, WEBHOOK_SIGNATURE_HEADER)?.to_owned(),
        body: body.to_vec(),
    })
}

/// Receive a signed payment event from the provider.
///
/// Redelivered ids are acknowledged with `ALREADY_PROCESSED` so the provider
/// stops retrying.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/payments",
    request_body(content = String, content_type = "application/json", description = "Provider event, signed"),
    params(
        ("webhook-id" = String, Header, description = "Delivery identifier"),
        ("webhook-timestamp" = String, Header, description = "Unix seconds"),
        ("webhook-signature" = String, Header, description = "Space-separated v1 signatures")
    ),
    responses(
        (status = 200, description = "Event applied or acknowledged", body = WebhookAck),
        (status = 401, description = "Signature rejected", body = Error),
        (status = 503, description = "Store or provider unavailable", body = Error)
    ),
    tags = ["payments"],
    operation_id = "receivePaymentWebhook"
)]
#[post("/webhooks/payments")]
pub async fn receive_payment_webhook(
    state: web::Data<HttpState>,
    request: HttpRequest,
    body: web::Bytes,
) -> ApiResult<web::Json<WebhookAck>> {
    let delivery = delivery_from(request.headers(), &body)?;
    let outcome = state.payments.apply_provider_event(delivery).await?;
    Ok(web::Json(WebhookAck { outcome }))
}

/// Reconcile a payment the client reports as finished.
///
/// The provider is asked for the authoritative status; the client's claim is
/// never trusted on its own.
#[utoipa::path(
    post,
    path = "/api/v1/payments/{paymentId}/complete",
    params(("paymentId" = String, Path, description = "Provider payment identifier")),
    responses(
        (status = 200, description = "Reconciliation result", body = CompletionResponse),
        (status = 404, description = "Provider does not know the payment", body = Error),
        (status = 503, description = "Provider unavailable", body = Error)
    ),
    tags = ["payments"],
    operation_id = "completePayment"
)]
#[post("/payments/{payment_id}/complete")]
pub async fn complete_payment(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<CompletionResponse>> {
    let payment_id = parse_payment_id(&path.into_inner())?;
    let completion = state.payments.complete_payment(&payment_id).await?;
    Ok(web::Json(CompletionResponse {
        outcome: completion.outcome,
        reservation: completion.reservation.map(Into::into),
    }))
}

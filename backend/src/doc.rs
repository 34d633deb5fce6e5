//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects every handler annotated with `#[utoipa::path]` together
//! with the payload schemas they reference. The document backs Swagger UI in
//! debug builds and is exported by the `openapi-dump` binary.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{
    Error, ErrorCode, PartyComposition, PaymentAttemptStatus, PaymentProvider, PriceTotals,
    ReconciliationOutcome, ReservationStatus,
};
use crate::inbound::http::admin::ExpireResponse;
use crate::inbound::http::payments::{CompletionResponse, WebhookAck};
use crate::inbound::http::reservations_dto::{
    CancelReservationBody, CreateReservationBody, PaymentAttemptResponse, PaymentIntentResponse,
    ReservationResponse, ReservationWithIntentResponse,
};
use crate::inbound::http::units::AvailabilityResponse;

/// Register the optional session cookie used to identify signed-in guests and hosts.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Private session cookie carrying the signed-in user id.",
            ))),
        );
    }
}

/// OpenAPI document for the reservation API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Lodging reservation API",
        description = "Reservations, payment reconciliation and operational endpoints.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::reservations::create_reservation,
        crate::inbound::http::reservations::get_reservation,
        crate::inbound::http::reservations::open_payment_attempt,
        crate::inbound::http::reservations::confirm_mock_payment,
        crate::inbound::http::reservations::decline_reservation,
        crate::inbound::http::reservations::cancel_reservation,
        crate::inbound::http::units::check_availability,
        crate::inbound::http::payments::receive_payment_webhook,
        crate::inbound::http::payments::complete_payment,
        crate::inbound::http::admin::expire_pending,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        CreateReservationBody,
        CancelReservationBody,
        ReservationResponse,
        ReservationWithIntentResponse,
        PaymentAttemptResponse,
        PaymentIntentResponse,
        PartyComposition,
        PriceTotals,
        ReservationStatus,
        PaymentProvider,
        PaymentAttemptStatus,
        ReconciliationOutcome,
        AvailabilityResponse,
        WebhookAck,
        CompletionResponse,
        ExpireResponse,
    )),
    tags(
        (name = "reservations", description = "Booking lifecycle"),
        (name = "units", description = "Availability and pricing"),
        (name = "payments", description = "Provider webhooks and reconciliation"),
        (name = "admin", description = "Operator endpoints"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn schema_named<'a>(doc: &'a utoipa::openapi::OpenApi, suffix: &str) -> &'a RefOr<Schema> {
        let schemas = &doc.components.as_ref().expect("components").schemas;
        schemas
            .iter()
            .find(|(name, _)| name.rsplit('.').next() == Some(suffix))
            .map(|(_, schema)| schema)
            .unwrap_or_else(|| panic!("schema {suffix} registered"))
    }

    #[rstest]
    #[case("/api/v1/reservations")]
    #[case("/api/v1/reservations/{token}/cancel")]
    #[case("/api/v1/webhooks/payments")]
    #[case("/api/v1/admin/expire-pending")]
    #[case("/health/ready")]
    fn documents_public_paths(#[case] path: &str) {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key(path), "missing {path}");
    }

    #[rstest]
    #[case("Error", "traceId")]
    #[case("ReservationResponse", "cancellationDeadline")]
    #[case("PriceTotals", "totalKrw")]
    fn schemas_use_camel_case_fields(#[case] schema: &str, #[case] field: &str) {
        let doc = ApiDoc::openapi();

        match schema_named(&doc, schema) {
            RefOr::T(Schema::Object(obj)) => {
                assert!(obj.properties.contains_key(field), "{schema} lacks {field}");
            }
            _ => panic!("expected object schema for {schema}"),
        }
    }
}

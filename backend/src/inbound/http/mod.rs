//! HTTP inbound adapter exposing REST endpoints.

pub mod admin;
pub mod error;
pub mod health;
pub mod payments;
pub mod reservations;
pub mod reservations_dto;
pub mod session;
pub mod state;
pub mod units;
pub mod validation;

use actix_web::{HttpRequest, error::JsonPayloadError, web};
use tracing::debug;

use crate::domain::Error;

pub use error::ApiResult;

/// JSON extractor configuration that reports malformed bodies as
/// `invalid_request` instead of actix's plain-text 400.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(json_error)
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, "rejected JSON body");
    Error::invalid_request(format!("malformed JSON body: {err}")).into()
}

/// Register every `/api/v1` handler on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(reservations::create_reservation)
        .service(reservations::get_reservation)
        .service(reservations::open_payment_attempt)
        .service(reservations::confirm_mock_payment)
        .service(reservations::decline_reservation)
        .service(reservations::cancel_reservation)
        .service(units::check_availability)
        .service(payments::receive_payment_webhook)
        .service(payments::complete_payment)
        .service(admin::expire_pending);
}

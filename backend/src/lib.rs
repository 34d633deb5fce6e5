//! Lodging reservation backend library.
//!
//! The domain layer owns the booking state machine and payment
//! reconciliation rules; inbound and outbound adapters connect it to HTTP,
//! PostgreSQL, and the payment provider.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;

//! Confirmation notification adapters.
//!
//! Both adapters return before delivery completes; the relay hands the HTTP
//! call to a spawned task and only logs its failures.

mod http_relay;
mod logging;

pub use http_relay::HttpRelayNotifier;
pub use logging::LoggingConfirmationNotifier;

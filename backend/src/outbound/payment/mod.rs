//! Payment provider outbound adapters.
//!
//! This module provides a thin HTTP implementation of the
//! `PaymentStatusSource` port used by client-initiated reconciliation.

mod dto;
mod http_status_source;

pub use http_status_source::{HttpPaymentStatusSource, HttpPaymentStatusSourceError};

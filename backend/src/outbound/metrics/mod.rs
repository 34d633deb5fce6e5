//! Outbound adapters for metrics exporting.
//!
//! This module provides the Prometheus-backed implementation of the booking
//! metrics port. It is feature-gated behind the `metrics` feature.

mod prometheus_booking;

pub use prometheus_booking::PrometheusBookingMetrics;

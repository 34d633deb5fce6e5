//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits:
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **memory**: in-process store, catalogue, and ledger for database-less runs
//! - **payment**: reqwest client for the payment provider's lookup API
//! - **webhook**: HMAC verification of provider webhook deliveries
//! - **notification**: confirmation sinks (log or HTTP relay)
//! - **metrics**: Prometheus-backed metrics exporters (feature-gated)
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod memory;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod notification;
pub mod payment;
pub mod persistence;
pub mod webhook;

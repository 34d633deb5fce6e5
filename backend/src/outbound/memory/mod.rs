//! In-process adapters for database-less runs and tests.
//!
//! These keep the same atomicity contract as the PostgreSQL adapters by doing
//! every check-and-write under one mutex guard. They are not durable.

mod reservation_store;
mod unit_catalogue;
mod webhook_ledger;

pub use reservation_store::InMemoryReservationStore;
pub use unit_catalogue::{CatalogueFileError, InMemoryUnitCatalogue};
pub use webhook_ledger::InMemoryWebhookLedger;
